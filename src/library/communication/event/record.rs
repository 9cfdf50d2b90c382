use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Ordered key/value pairs making up the content of a [`Record`]
pub type Fields = Vec<(String, String)>;

/// Errors that may occur while parsing a [`RecordId`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordIdError {
    /// Input does not consist of two parts separated by a dash
    #[error("record id {0:?} is not of the form <millis>-<sequence>")]
    Malformed(String),
    /// One of the two parts is not a valid unsigned integer
    #[error("record id {0:?} contains a non-numeric component")]
    NotNumeric(String),
}

/// Broker assigned identifier of a [`Record`]
///
/// Identifiers are composed of a millisecond timestamp and a sequence counter which disambiguates
/// records appended within the same millisecond. They are strictly increasing within a stream
/// and ordered by timestamp first, sequence second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RecordId {
    millis: u64,
    sequence: u64,
}

impl RecordId {
    /// Creates a new instance from raw parts
    pub fn new(millis: u64, sequence: u64) -> Self {
        Self { millis, sequence }
    }

    /// Smallest identifier that is strictly greater than this one and not older than `now_millis`
    pub fn successor(&self, now_millis: u64) -> Self {
        if now_millis > self.millis {
            Self::new(now_millis, 0)
        } else {
            Self::new(self.millis, self.sequence + 1)
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.sequence)
    }
}

impl FromStr for RecordId {
    type Err = RecordIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, '-');

        let (millis, sequence) = match (parts.next(), parts.next()) {
            (Some(millis), Some(sequence)) => (millis, sequence),
            _ => return Err(RecordIdError::Malformed(s.to_owned())),
        };

        let millis = millis
            .parse()
            .map_err(|_| RecordIdError::NotNumeric(s.to_owned()))?;
        let sequence = sequence
            .parse()
            .map_err(|_| RecordIdError::NotNumeric(s.to_owned()))?;

        Ok(Self { millis, sequence })
    }
}

/// Immutable entry of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Identifier assigned by the broker on append
    pub id: RecordId,
    /// Content of the record
    pub fields: Fields,
}

impl Record {
    /// Creates a new instance from raw parts
    pub fn new(id: RecordId, fields: Fields) -> Self {
        Self { id, fields }
    }
}

/// Records read from a single stream in one group read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamBatch {
    /// Name of the stream the records belong to
    pub stream: String,
    /// Records in stream order
    pub records: Vec<Record>,
}
