/// Orbit camera: spherical state, mouse-driven updates and view/projection
///
/// Convention: +Z is up. Azimuth is measured in the XY plane from +X towards
/// +Y, altitude from the XY plane towards +Z. Dragging right decreases the
/// azimuth, so the mesh appears to follow the cursor.
use nalgebra::{Matrix4, Point3, Vector3};
use std::f32::consts::FRAC_PI_2;

use crate::config::ViewerConfig;
use crate::geometry::BoundingBox;
use crate::input::InputSnapshot;

/// Spherical camera parameters around a look-at target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// Radians
    pub azimuth: f32,
    /// Radians, always strictly inside (-pi/2, pi/2)
    pub altitude: f32,
    /// Distance from the target, always positive
    pub radius: f32,
    /// Look-at target
    pub origin: Point3<f32>,
}

impl CameraState {
    pub fn new(radius: f32, origin: Point3<f32>) -> Self {
        Self {
            azimuth: 0.0,
            altitude: 0.0,
            radius,
            origin,
        }
    }
}

/// Matrices and basis derived from a camera state for one frame
#[derive(Debug, Clone, Copy)]
pub struct CameraFrame {
    pub eye: Point3<f32>,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    /// Screen-right direction in world space
    pub right: Vector3<f32>,
    /// Screen-up direction in world space
    pub up: Vector3<f32>,
}

/// Unit vector for the given spherical angles (Z-up)
pub fn spherical_to_cartesian(azimuth: f32, altitude: f32) -> Vector3<f32> {
    let (sin_az, cos_az) = azimuth.sin_cos();
    let (sin_alt, cos_alt) = altitude.sin_cos();
    Vector3::new(cos_alt * cos_az, cos_alt * sin_az, sin_alt)
}

/// Camera orbiting a target point, driven by per-frame input snapshots
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    state: CameraState,
    up_axis: Vector3<f32>,
    fov: f32,
    near: f32,
    far: f32,
    rotate_sensitivity: f32,
    pan_factor: f32,
    zoom_rate: f32,
    altitude_bound: f32,
}

impl OrbitCamera {
    pub fn new(state: CameraState, config: &ViewerConfig) -> Self {
        let altitude_bound = FRAC_PI_2 - config.altitude_epsilon;
        Self {
            state: CameraState {
                altitude: state.altitude.clamp(-altitude_bound, altitude_bound),
                ..state
            },
            up_axis: config.up,
            fov: config.fov,
            near: config.near,
            far: config.far,
            rotate_sensitivity: config.rotate_sensitivity,
            pan_factor: config.pan_factor,
            zoom_rate: config.zoom_rate,
            altitude_bound,
        }
    }

    /// Frame a bounding box: look at its center from far enough away that the
    /// whole diagonal fits in the vertical field of view.
    pub fn framing(bbox: &BoundingBox, config: &ViewerConfig) -> Self {
        let radius = framing_radius(bbox.diagonal(), config.fov);
        let radius = if radius.is_finite() && radius > f32::EPSILON {
            radius
        } else {
            config.default_radius
        };
        Self::new(CameraState::new(radius, bbox.center()), config)
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// Largest altitude magnitude the camera may reach
    pub fn altitude_bound(&self) -> f32 {
        self.altitude_bound
    }

    /// Eye position relative to the target
    pub fn offset(&self) -> Vector3<f32> {
        self.state.radius * spherical_to_cartesian(self.state.azimuth, self.state.altitude)
    }

    pub fn eye(&self) -> Point3<f32> {
        self.state.origin + self.offset()
    }

    /// Screen-right and screen-up directions for the current state
    pub fn basis(&self) -> (Vector3<f32>, Vector3<f32>) {
        let forward = -self.offset();
        let right = forward.cross(&self.up_axis).normalize();
        let up = right.cross(&forward).normalize();
        (right, up)
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.eye(), &self.state.origin, &self.up_axis)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Matrix4<f32> {
        Matrix4::new_perspective(aspect, self.fov, self.near, self.far)
    }

    pub fn frame(&self, aspect: f32) -> CameraFrame {
        let (right, up) = self.basis();
        CameraFrame {
            eye: self.eye(),
            view: self.view_matrix(),
            projection: self.projection_matrix(aspect),
            right,
            up,
        }
    }

    /// World-space height of one pixel at unit distance
    pub fn pixel_size(&self, viewport_height: u32) -> f32 {
        2.0 * (0.5 * self.fov).tan() / viewport_height as f32
    }

    /// Orbit by a drag delta in pixels
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.state.azimuth -= dx * self.rotate_sensitivity;
        self.state.altitude = (self.state.altitude + dy * self.rotate_sensitivity)
            .clamp(-self.altitude_bound, self.altitude_bound);
    }

    /// Move the target so it follows the cursor in screen space
    pub fn pan(
        &mut self,
        dx: f32,
        dy: f32,
        right: &Vector3<f32>,
        up: &Vector3<f32>,
        viewport_height: u32,
    ) {
        if viewport_height == 0 {
            return;
        }
        let scale = self.pan_factor * self.pixel_size(viewport_height) * self.state.radius;
        self.state.origin += -scale * dx * right + scale * dy * up;
    }

    /// Multiplicative zoom; positive scroll moves closer.
    ///
    /// The radius stays within `[near, far]` so it can neither underflow to
    /// zero nor overflow to infinity.
    pub fn zoom(&mut self, scroll: f32) {
        let radius = self.state.radius * (-self.zoom_rate * scroll).exp();
        if radius.is_nan() {
            return;
        }
        self.state.radius = radius.clamp(self.near, self.far);
    }

    /// Apply one frame of input. The pan basis is taken from the state as it
    /// was before this update.
    pub fn update(&mut self, input: &InputSnapshot, viewport_height: u32) {
        let (right, up) = self.basis();
        let delta = input.mouse.delta();

        if input.left {
            self.rotate(delta.x, delta.y);
        }
        if input.right {
            self.pan(delta.x, delta.y, &right, &up, viewport_height);
        }
        if input.scroll != 0.0 {
            self.zoom(input.scroll);
        }
    }
}

/// Distance at which a sphere of the given diameter spans the field of view
pub fn framing_radius(diagonal: f32, fov: f32) -> f32 {
    0.5 * diagonal / (0.5 * fov).tan()
}
