use std::fmt;

/// Failure classification for every fallible operation in the crate.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Schema
    FieldExists,
    UnknownField,
    InvalidOptions,
    SchemaMismatch,
    // Query string parsing; byte offset into the input
    Parse { position: usize },
    // Query construction / execution
    FieldNotIndexed,
    PositionsNotStored,
    RangeTypeMismatch,
    FuzzyEditsOutOfRange,
    // Writing
    WriterLockHeld,
    Commit,
    StorageIo,
    // Reading
    SnapshotGone,
    // Aggregations
    UnsupportedAggregation,
    AggregationFieldRequired,
    AggregationLimitExceeded,
    NestingTooDeep,
    // Distributed
    ShardTimeout,
    ShardUnhealthy,
    AllShardsFailed,
    // Deadline exceeded; names the phase that ran out of time
    Timeout { phase: &'static str },
}

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error {
            kind,
            context: context.into(),
        }
    }

    pub fn schema_mismatch(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::SchemaMismatch, context)
    }

    pub fn unknown_field(name: &str) -> Self {
        Error::new(ErrorKind::UnknownField, format!("unknown field '{}'", name))
    }

    pub fn parse(position: usize, context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Parse { position }, context)
    }

    pub fn storage(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::StorageIo, context)
    }

    pub fn timeout(phase: &'static str) -> Self {
        Error::new(
            ErrorKind::Timeout { phase },
            format!("deadline exceeded during {}", phase),
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ErrorKind::Parse { position } => {
                write!(f, "parse error at byte {}: {}", position, self.context)
            }
            kind => write!(f, "{:?}: {}", kind, self.context),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::StorageIo, err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::new(ErrorKind::StorageIo, format!("codec error: {}", err))
    }
}

impl From<fst::Error> for Error {
    fn from(err: fst::Error) -> Self {
        Error::new(ErrorKind::StorageIo, format!("term dictionary error: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorKind::StorageIo, format!("json error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_carries_position() {
        let err = Error::parse(17, "expected TO");
        assert_eq!(err.kind, ErrorKind::Parse { position: 17 });
        assert!(err.to_string().contains("byte 17"));
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert_eq!(err.kind, ErrorKind::StorageIo);
    }
}
