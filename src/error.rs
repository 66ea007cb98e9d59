use std::fmt;

/// Errors surfaced by the hashing facade.
///
/// Both engine-side variants are fatal: the facade never retries them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The engine could not satisfy an allocation of `size` bytes.
    AllocationFailure { size: usize },
    /// The engine trapped, rejected its input, or broke the boundary contract.
    EngineFault(String),
    /// The platform random source is unavailable.
    Entropy(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AllocationFailure { size } => {
                write!(f, "engine failed to allocate {size} bytes")
            }
            Error::EngineFault(msg) => write!(f, "engine fault: {msg}"),
            Error::Entropy(msg) => write!(f, "random source unavailable: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// Errors from decoding an encoded hash on the host side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    MissingSegment(&'static str),
    TrailingSegment,
    UnknownAlgorithm(String),
    UnsupportedVersion(String),
    InvalidParameter(String),
    InvalidBase64(&'static str),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingSegment(s) => write!(f, "encoded hash is missing the {s} segment"),
            ParseError::TrailingSegment => write!(f, "encoded hash has trailing segments"),
            ParseError::UnknownAlgorithm(a) => write!(f, "unknown algorithm '{a}'"),
            ParseError::UnsupportedVersion(v) => write!(f, "unsupported version '{v}'"),
            ParseError::InvalidParameter(p) => write!(f, "invalid parameter '{p}'"),
            ParseError::InvalidBase64(s) => write!(f, "{s} is not valid unpadded base64"),
        }
    }
}

impl std::error::Error for ParseError {}
