use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Triangulation failed: {0}")]
    Triangulation(String),

    #[error("Document stream is closed")]
    StreamClosed,

    #[error("GPU initialisation failed: {0}")]
    GpuInit(String),

    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}
