use thiserror::Error;

/// The error surface of the library. Validation errors come back from the
/// staging call that caused them, resolution errors from `run`/`commit`,
/// and security errors from `commit`; nothing is swallowed along the way.
#[derive(Debug, Error)]
pub enum Error {
    /// A filter was staged with an invalid keyname/comparison/value
    /// combination.
    #[error("bad query: {0}")]
    BadQuery(String),

    /// A selector is missing its name/provides/file axis or carries an
    /// unsupported comparison.
    #[error("bad selector: {0}")]
    BadSelector(String),

    /// The solver found no consistent assignment for the staged jobs.
    #[error("no solution possible")]
    NoSolution,

    /// The solution would remove a protected package.
    #[error("no solution, cannot remove protected package")]
    RemovalOfProtectedPkg,

    /// The architecture handed to the sack constructor is not recognised.
    #[error("unrecognized architecture '{0}'")]
    InvalidArchitecture(String),

    /// A file exists but cannot be used.
    #[error("invalid file: {0}")]
    FileInvalid(String),

    /// A file that should exist does not.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// No package matches the request.
    #[error("package not found: {0}")]
    PackageNotFound(String),

    /// A package signature could not be verified against the keyring.
    #[error("GPG signature invalid: {0}")]
    GpgSignatureInvalid(String),

    /// The filesystem holding the cache cannot fit the download.
    #[error("not enough free space in {cachedir}: needed {needed}, available {available}")]
    NoSpace {
        /// Directory the download would go to.
        cachedir: String,
        /// Bytes required, formatted.
        needed: String,
        /// Bytes available, formatted.
        available: String,
    },

    /// Required configuration could not be read.
    #[error("failed config parsing: {0}")]
    FailedConfigParsing(String),

    /// A programming error; never an expected runtime condition.
    #[error("internal error: {0}")]
    InternalError(String),
}

/// Shorthand used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
