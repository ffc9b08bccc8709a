use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("missing grid header field '{0}'")]
    MissingField(&'static str),

    #[error("unparseable grid header line '{0}'")]
    HeaderLine(String),

    #[error("unparseable elevation value '{0}'")]
    Value(String),

    #[error("grid holds {actual} samples, header promises {expected}")]
    SampleCount { expected: usize, actual: usize },

    #[error("grid resolution must be positive, got {0}")]
    Resolution(f64),

    #[error("grid must have at least one row and one column")]
    Empty,

    #[error("unsupported grid byte order '{0}'")]
    ByteOrder(String),
}
