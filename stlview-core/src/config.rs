//! Viewer configuration constants

use nalgebra::Vector3;

/// How fragments are colored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadingMode {
    /// Ambient + diffuse + specular with the light at the camera
    Lit,
    /// Face normal mapped to RGB, for checking STL normals
    Normals,
}

impl ShadingMode {
    pub fn toggled(self) -> Self {
        match self {
            ShadingMode::Lit => ShadingMode::Normals,
            ShadingMode::Normals => ShadingMode::Lit,
        }
    }
}

/// Fixed viewer parameters. Nothing here is changed after startup.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Vertical field of view in radians
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Radians of orbit per pixel of left-drag
    pub rotate_sensitivity: f32,
    /// Multiplier on the world size of one pixel when panning
    pub pan_factor: f32,
    /// Exponential zoom rate per scroll line
    pub zoom_rate: f32,
    /// Distance kept between the altitude and the poles
    pub altitude_epsilon: f32,
    /// World up axis used for the orbit sphere and `look_at`
    pub up: Vector3<f32>,
    /// Radius used when the mesh gives no usable framing
    pub default_radius: f32,
    pub window_width: u32,
    pub window_height: u32,
    pub title: String,
    pub shading: ShadingMode,
    /// Multisample count for the color and depth targets; 1 disables MSAA
    pub msaa_samples: u32,
    pub clear_color: [f64; 4],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fov: 45.0_f32.to_radians(),
            near: 0.1,
            far: 10_000.0,
            rotate_sensitivity: 0.01,
            pan_factor: 1.3,
            zoom_rate: 0.1,
            altitude_epsilon: 1e-5,
            up: Vector3::z(),
            default_radius: 5.0,
            window_width: 640,
            window_height: 480,
            title: "stlview".to_string(),
            shading: ShadingMode::Lit,
            msaa_samples: 4,
            clear_color: [0.1, 0.1, 0.12, 1.0],
        }
    }
}
