use thiserror::Error;

/// Failures while reading, rewriting or writing a DOCX package.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Invalid DOCX package: {0}")]
    InvalidPackage(#[from] zip::result::ZipError),

    #[error("DOCX package is missing part '{0}'")]
    MissingPart(String),

    #[error("Part '{part}' is not valid UTF-8")]
    Encoding { part: String },

    #[error("XML parsing error in '{part}': {message}")]
    Xml { part: String, message: String },

    #[error("Failed to write DOCX package: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the job ledger collaborator.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Corrupt job record '{job_id}': {reason}")]
    CorruptRecord { job_id: String, reason: String },
}

/// Failures of the blob storage collaborator.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File not found at storage path: {0}")]
    NotFound(String),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("Storage I/O error for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the message queue collaborator.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue is closed")]
    Closed,

    #[error("Failed to encode queue message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Could not extract job_id from message: {0}")]
    Envelope(String),
}

/// Everything that can go wrong between picking a job up and completing it.
/// The rendered message is stored verbatim on the failed job.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Format(#[from] FormatError),

    #[error("{0}")]
    Ledger(#[from] LedgerError),

    #[error("Formatting task aborted: {0}")]
    Task(String),
}

/// Errors the worker consumer cannot record against a job.
#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error(transparent)]
    Envelope(#[from] QueueError),

    #[error("Failed to record failure for job {job_id}: {source}")]
    FailureNotRecorded {
        job_id: String,
        #[source]
        source: LedgerError,
    },
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Logging setup errors.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to create log directory '{path}': {source}")]
    LogDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Errors of the one-shot `format` command.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Format(#[from] FormatError),
}
