/// Windowed STL viewer built on WGPU and winit
pub mod app;
pub mod cli;
pub mod error;
pub mod renderer;

pub use app::ViewerApp;
pub use cli::{Cli, CliExit};
pub use error::{ViewerError, ViewerResult};
pub use renderer::WgpuBackend;

use std::path::Path;
use stlview_core::{stl, Mesh};

/// Load the mesh to display, rejecting files with no triangles
pub fn load_mesh(path: &Path) -> ViewerResult<Mesh> {
    let mesh = stl::load_stl(path)?;
    if mesh.is_empty() {
        return Err(ViewerError::EmptyMesh(path.to_path_buf()));
    }
    Ok(mesh)
}
