use thiserror::Error;

#[derive(Error, Debug)]
pub enum RotcolError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No orbit data: {0}")]
    MissingOrbitData(String),

    #[error("No leap second data: {0}")]
    NoLeapSecondData(String),

    #[error("Invalid leap second line: {0}")]
    InvalidLeapSecondLine(String),

    #[error("Invalid two-line element set: {0}")]
    InvalidTle(String),

    #[error("SGP4 propagation failed: {0}")]
    Propagation(String),

    #[error("Unable to read granule: {0}")]
    GranuleRead(String),

    #[error("Unable to read the system clock: {0}")]
    SystemClock(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),
}

impl PartialEq for RotcolError {
    fn eq(&self, other: &Self) -> bool {
        use RotcolError::*;
        match (self, other) {
            (InvalidArgument(a), InvalidArgument(b)) => a == b,
            (MissingOrbitData(a), MissingOrbitData(b)) => a == b,
            (NoLeapSecondData(a), NoLeapSecondData(b)) => a == b,
            (InvalidLeapSecondLine(a), InvalidLeapSecondLine(b)) => a == b,
            (InvalidTle(a), InvalidTle(b)) => a == b,
            (Propagation(a), Propagation(b)) => a == b,
            (GranuleRead(a), GranuleRead(b)) => a == b,
            (SystemClock(a), SystemClock(b)) => a == b,

            // io::Error carries no equality, same variant is enough
            (IoError(_), IoError(_)) => true,

            _ => false,
        }
    }
}
