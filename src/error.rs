#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("{action}: invalid length {actual} (expected {wanted})")]
    LengthMismatch { action: &'static str, actual: usize, wanted: usize },

    #[error("invalid container header: {0}")]
    InvalidHeader(String),

    #[error("unexpected real sprite at line {line}")]
    UnexpectedSprite { line: u32 },

    #[error("file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
            _ => Error::Io(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}
