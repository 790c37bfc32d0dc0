//! Error types for the windowed viewer

use std::path::PathBuf;
use stlview_core::StlError;
use thiserror::Error;

/// Result type for viewer operations
pub type ViewerResult<T> = Result<T, ViewerError>;

/// Everything that can stop the viewer.
///
/// Input-file errors happen before any window exists; startup errors come
/// from the windowing system or the GPU; render errors end the frame loop.
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("failed to read STL: {0}")]
    InputFile(#[from] StlError),

    #[error("{0:?} contains no triangles")]
    EmptyMesh(PathBuf),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("surface creation failed: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("surface reports no supported {0}")]
    IncompatibleSurface(&'static str),

    #[error("GPU device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("render error: {0}")]
    Render(#[from] wgpu::SurfaceError),
}

impl ViewerError {
    /// True for problems with the file the user passed in
    pub fn is_input_error(&self) -> bool {
        matches!(self, ViewerError::InputFile(_) | ViewerError::EmptyMesh(_))
    }
}
