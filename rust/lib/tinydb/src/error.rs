use thiserror::Error;

#[derive(Error, Debug)]
pub enum TinyDbError {
    #[error("invalid key: {0}")]
    Validation(String),

    #[error("malformed line {line}: {content:?} has no '=' separator")]
    Parse { line: usize, content: String },

    #[error("key {key:?}: cannot parse {raw:?} as {kind}")]
    Format {
        key: String,
        raw: String,
        kind: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, TinyDbError>;
