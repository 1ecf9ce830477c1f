use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Image encode error: {0}")]
    Encode(String),

    #[error("Tag write error: {0}")]
    TagWrite(String),

    #[error("Filesystem error: {0}")]
    Filesystem(String),

    #[error("No embedding handler for extension {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
