/// Database-layer failure. Per the core's error-handling design, these are surfaced as `Fatal`
/// by callers: an operator must intervene, the core does not attempt to self-heal.
#[derive(Debug)]
pub enum Error {
    Io(String),
    NotFound(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Io(msg) => write!(f, "store io error: {}", msg),
            Error::NotFound(what) => write!(f, "store missing required value: {}", what),
        }
    }
}

impl std::error::Error for Error {}
