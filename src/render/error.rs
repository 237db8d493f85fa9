use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("drawing backend failed: {0}")]
    Backend(String),
    #[error("PNG encoding failed: {0}")]
    Encoding(#[from] image::ImageError),
    #[error("font could not be loaded: {0}")]
    Font(String),
    #[error("invalid canvas size {width}x{height}")]
    InvalidCanvas { width: u32, height: u32 },
}

impl RenderError {
    pub(crate) fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}
