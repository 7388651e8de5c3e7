use thiserror::Error as ThisError;

/// Error type returned by fallible runtime operations.
///
/// Contract violations (null where non-null required, out of range
/// indices, misuse of a frozen partition, a reference count going
/// negative) are not represented here: they are asserted with
/// `debug_assert!`/`panic!` at the point of violation, matching the
/// "these abort the process" policy of the design this crate implements.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The underlying engine returned a non-OK status where one was not
    /// expected. Carries the engine's own error so callers can still match
    /// on e.g. constraint violations.
    #[cfg(feature = "engine")]
    #[error("engine returned an error executing '{function}': {source}")]
    Engine {
        /// Name of the runtime entry point that observed the failure.
        function: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    /// A cursor or key/value blob failed structural validation during
    /// decode: wrong magic, a core type mismatch on an overlapping column,
    /// a missing non-nullable column, or a truncated varint.
    #[error("failed to decode blob: {0}")]
    Decode(#[from] DecodeError),
}

/// Reasons a cursor blob or key/value blob can fail to decode.
///
/// These never abort the process: the caller gets `has_row = false` (for
/// cursor blobs) or a SQL `NULL` (for the scalar key/value functions).
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum DecodeError {
    /// The type-code preamble contained a byte that is not one of
    /// `IiLlDdFfSsBb` and is not the terminating zero.
    #[error("unrecognized column type byte {0:#04x} in cursor blob preamble")]
    UnknownTypeByte(u8),
    /// A column present in both producer and consumer shapes has
    /// different core types.
    #[error("column {index} core type mismatch: producer={producer:?} consumer={consumer:?}")]
    TypeMismatch {
        index: usize,
        producer: crate::cursor::CoreType,
        consumer: crate::cursor::CoreType,
    },
    /// The consumer declares a trailing column the producer didn't have,
    /// and that column is not nullable.
    #[error("missing trailing column {index} is not nullable")]
    MissingNotNullColumn { index: usize },
    /// Nullability was tightened across the wire (producer nullable,
    /// consumer not-null) which the format forbids.
    #[error("column {index} tightens nullability across producer/consumer")]
    NullabilityTightened { index: usize },
    /// Ran out of bytes decoding the presence bitvector, a varint, a
    /// string, or a blob.
    #[error("cursor blob truncated while decoding column {index}")]
    Truncated { index: usize },
    /// The blob magic word did not match `CQL_BLOB_MAGIC`.
    #[error("blob magic mismatch, not a well-formed key/value blob")]
    BadMagic,
    /// A blob-stream offset table was internally inconsistent.
    #[error("blob stream offset table is corrupt")]
    BadBlobStream,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Normalizes an engine status to a single error when a throw is required
/// but no genuine engine error is pending (e.g. stepping returned `DONE`
/// when a row was expected). Mirrors `cql_best_error`: anything that is
/// not already an error becomes a generic "not found" style failure, and a
/// trace line is emitted so the condition is visible in logs without
/// requiring an exception channel.
#[cfg(feature = "engine")]
pub fn throw_status(function: &'static str, source: rusqlite::Error) -> Error {
    log::trace!("cql-runtime: engine call '{function}' observed non-OK status: {source}");
    Error::Engine { function, source }
}
