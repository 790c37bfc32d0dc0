//! Per-frame driver sitting between input, the orbit camera and a renderer.

use nalgebra::{Matrix4, Point3};
use tracing::{debug, info};

use crate::camera::{CameraState, OrbitCamera};
use crate::config::{ShadingMode, ViewerConfig};
use crate::geometry::{Mesh, Vertex};
use crate::input::InputSnapshot;
use crate::transform::{ModelMode, Transform};

/// Framebuffer size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Values handed to the renderer for one draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    /// projection * view * model, OpenGL clip conventions
    pub mvp: Matrix4<f32>,
    pub model: Matrix4<f32>,
    /// World-space light position (the camera eye)
    pub light_position: Point3<f32>,
    pub shading: ShadingMode,
}

/// What the frame driver needs from a graphics API
pub trait RenderBackend {
    type Error;

    /// Upload interleaved position/normal vertices. Called once.
    fn upload_mesh(&mut self, vertices: &[Vertex]) -> Result<(), Self::Error>;

    /// The framebuffer changed size
    fn resize(&mut self, viewport: Viewport);

    /// Clear, draw `vertex_count` non-indexed triangle vertices, present
    fn draw(&mut self, uniforms: &FrameUniforms, vertex_count: u32) -> Result<(), Self::Error>;
}

/// Owns the mesh, the camera and the renderer, and runs one frame at a time
pub struct FrameDriver<B: RenderBackend> {
    mesh: Mesh,
    pivot: Point3<f32>,
    camera: OrbitCamera,
    shading: ShadingMode,
    model_mode: ModelMode,
    viewport: Option<Viewport>,
    backend: B,
}

impl<B: RenderBackend> FrameDriver<B> {
    /// Upload the mesh and frame it with the camera
    pub fn new(mesh: Mesh, config: &ViewerConfig, mut backend: B) -> Result<Self, B::Error> {
        let camera = match mesh.bounding_box() {
            Some(bbox) => OrbitCamera::framing(&bbox, config),
            None => OrbitCamera::new(
                CameraState::new(config.default_radius, Point3::origin()),
                config,
            ),
        };
        let pivot = camera.state().origin;
        info!(
            vertices = mesh.vertex_count(),
            radius = camera.state().radius,
            "camera framed"
        );

        backend.upload_mesh(mesh.vertices())?;

        Ok(Self {
            mesh,
            pivot,
            camera,
            shading: config.shading,
            model_mode: ModelMode::default(),
            viewport: None,
            backend,
        })
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn shading(&self) -> ShadingMode {
        self.shading
    }

    pub fn model_mode(&self) -> ModelMode {
        self.model_mode
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run one iteration: apply input, update the camera, draw.
    ///
    /// A zero-sized viewport (minimized window) updates state but skips the draw.
    pub fn frame(
        &mut self,
        viewport: Viewport,
        input: &InputSnapshot,
        time: f32,
    ) -> Result<(), B::Error> {
        if input.toggle_shading {
            self.shading = self.shading.toggled();
            debug!(shading = ?self.shading, "shading toggled");
        }
        if input.toggle_spin {
            self.model_mode = self.model_mode.toggled();
            debug!(model = ?self.model_mode, "model mode toggled");
        }

        if self.viewport != Some(viewport) {
            debug!(width = viewport.width, height = viewport.height, "viewport changed");
            self.viewport = Some(viewport);
            if !viewport.is_empty() {
                self.backend.resize(viewport);
            }
        }

        self.camera.update(input, viewport.height);

        if viewport.is_empty() {
            return Ok(());
        }

        let camera = self.camera.frame(viewport.aspect());
        let model = self.model_mode.matrix(time, &self.pivot);
        let uniforms = FrameUniforms {
            mvp: Transform::mvp_matrix(&model, &camera.view, &camera.projection),
            model,
            light_position: camera.eye,
            shading: self.shading,
        };

        self.backend
            .draw(&uniforms, self.mesh.vertex_count() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MouseState;
    use nalgebra::Point2;

    #[derive(Default)]
    struct RecordingBackend {
        uploaded: usize,
        uploads: usize,
        resizes: Vec<Viewport>,
        draws: Vec<(FrameUniforms, u32)>,
        fail_draw: bool,
    }

    impl RenderBackend for RecordingBackend {
        type Error = &'static str;

        fn upload_mesh(&mut self, vertices: &[Vertex]) -> Result<(), Self::Error> {
            self.uploads += 1;
            self.uploaded = vertices.len();
            Ok(())
        }

        fn resize(&mut self, viewport: Viewport) {
            self.resizes.push(viewport);
        }

        fn draw(&mut self, uniforms: &FrameUniforms, vertex_count: u32) -> Result<(), Self::Error> {
            if self.fail_draw {
                return Err("device lost");
            }
            self.draws.push((*uniforms, vertex_count));
            Ok(())
        }
    }

    fn driver() -> FrameDriver<RecordingBackend> {
        FrameDriver::new(
            Mesh::cube(2.0),
            &ViewerConfig::default(),
            RecordingBackend::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_mesh_uploaded_once() {
        let mut driver = driver();
        let viewport = Viewport::new(640, 480);
        for _ in 0..3 {
            driver.frame(viewport, &InputSnapshot::default(), 0.0).unwrap();
        }
        assert_eq!(driver.backend().uploads, 1);
        assert_eq!(driver.backend().uploaded, 36);
        assert_eq!(driver.backend().draws.len(), 3);
        assert!(driver.backend().draws.iter().all(|(_, count)| *count == 36));
    }

    #[test]
    fn test_resize_only_on_change() {
        let mut driver = driver();
        let input = InputSnapshot::default();
        driver.frame(Viewport::new(640, 480), &input, 0.0).unwrap();
        driver.frame(Viewport::new(640, 480), &input, 0.0).unwrap();
        driver.frame(Viewport::new(800, 600), &input, 0.0).unwrap();
        assert_eq!(
            driver.backend().resizes,
            vec![Viewport::new(640, 480), Viewport::new(800, 600)]
        );
    }

    #[test]
    fn test_empty_viewport_skips_draw() {
        let mut driver = driver();
        driver
            .frame(Viewport::new(0, 0), &InputSnapshot::default(), 0.0)
            .unwrap();
        assert!(driver.backend().draws.is_empty());
        assert!(driver.backend().resizes.is_empty());
    }

    #[test]
    fn test_light_follows_eye() {
        let mut driver = driver();
        let input = InputSnapshot {
            mouse: MouseState {
                previous: Point2::origin(),
                current: Point2::new(25.0, 10.0),
            },
            left: true,
            ..Default::default()
        };
        driver.frame(Viewport::new(640, 480), &input, 0.0).unwrap();

        let (uniforms, _) = driver.backend().draws[0];
        assert_eq!(uniforms.light_position, driver.camera().eye());
        assert!(driver.camera().state().azimuth < 0.0);
    }

    #[test]
    fn test_toggles() {
        let mut driver = driver();
        let toggle = InputSnapshot {
            toggle_shading: true,
            toggle_spin: true,
            ..Default::default()
        };
        driver.frame(Viewport::new(640, 480), &toggle, 1.0).unwrap();
        assert_eq!(driver.shading(), ShadingMode::Normals);
        assert_eq!(driver.model_mode(), ModelMode::Spin);

        let (uniforms, _) = driver.backend().draws[0];
        assert_eq!(uniforms.shading, ShadingMode::Normals);
        assert!((uniforms.model - Matrix4::identity()).norm() > 1e-3);
    }

    #[test]
    fn test_backend_error_propagates() {
        let mut driver = driver();
        driver.backend.fail_draw = true;
        let result = driver.frame(Viewport::new(640, 480), &InputSnapshot::default(), 0.0);
        assert_eq!(result, Err("device lost"));
    }

    #[test]
    fn test_empty_mesh_uses_default_framing() {
        let config = ViewerConfig::default();
        let driver = FrameDriver::new(Mesh::new(), &config, RecordingBackend::default()).unwrap();
        assert_eq!(driver.camera().state().radius, config.default_radius);
        assert_eq!(driver.camera().state().origin, Point3::origin());
    }
}
