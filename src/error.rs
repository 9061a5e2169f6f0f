use thiserror::Error;

#[derive(Error, Debug)]
pub enum FramfsError {
    #[error("corrupt header: {0}")]
    CorruptHeader(String),

    #[error("inconsistent filesystem state: {0}")]
    InconsistentState(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("{0} full")]
    Full(&'static str),

    #[error("file already exists: {0}")]
    Exists(String),

    #[error("no active file")]
    NoActiveFile,

    #[error("size error: {0}")]
    SizeError(String),

    #[error("file is read-only: {0}")]
    ReadOnly(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FramfsError>;
