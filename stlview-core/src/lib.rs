/// stlview core library - mesh loading and orbit camera logic
///
/// This library holds everything the viewer does that does not need a window
/// or a GPU: binary STL parsing, bounding boxes, the orbit camera and the
/// per-frame driver that feeds a render backend.

pub mod camera;
pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod input;
pub mod stl;
pub mod transform;

// Re-export commonly used types
pub use camera::{CameraFrame, CameraState, OrbitCamera};
pub use config::{ShadingMode, ViewerConfig};
pub use error::{StlError, StlResult};
pub use frame::{FrameDriver, FrameUniforms, RenderBackend, Viewport};
pub use geometry::{BoundingBox, Mesh, Vertex};
pub use input::{DragButton, InputSnapshot, InputTracker, KeyAction, MouseState};
pub use transform::{ModelMode, Transform};
