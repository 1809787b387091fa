use std::ops::BitOr;
use std::path::Path;

use crate::errors::Result;

/// Header fields of a package as the rpm runtime reports them in
/// callbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderInfo {
    /// Package name.
    pub name: String,
    /// Epoch, when the header carries one.
    pub epoch: Option<u64>,
    /// Version.
    pub version: String,
    /// Release.
    pub release: String,
    /// Architecture.
    pub arch: String,
    /// SHA1 of the header region, rpm's package id.
    pub sha1header: Option<String>,
}

/// Progress events emitted by the rpm runtime while a transaction runs.
#[derive(Debug, Clone)]
pub enum RpmEvent {
    /// Transaction preparation begins; `total` elements follow.
    TransStart {
        /// Number of transaction elements.
        total: u64,
    },
    /// Preparation progress.
    TransProgress {
        /// Elements prepared so far.
        amount: u64,
        /// Total elements.
        total: u64,
    },
    /// Preparation finished.
    TransStop,
    /// An install starts writing.
    InstStart {
        /// The payload file being installed.
        key: String,
        /// Header of the package, when available.
        header: Option<HeaderInfo>,
        /// Payload size.
        total: u64,
    },
    /// Install progress.
    InstProgress {
        /// The payload file being installed.
        key: String,
        /// Header of the package, when available.
        header: Option<HeaderInfo>,
        /// Bytes written so far.
        amount: u64,
        /// Payload size.
        total: u64,
    },
    /// An install finished.
    InstStop {
        /// The payload file that was installed.
        key: String,
    },
    /// A removal starts.
    UninstStart {
        /// Header of the package being removed, when available.
        header: Option<HeaderInfo>,
        /// The callback key, when available.
        key: Option<String>,
    },
    /// Removal progress.
    UninstProgress {
        /// Header of the package being removed, when available.
        header: Option<HeaderInfo>,
        /// Work done so far.
        amount: u64,
        /// Total work.
        total: u64,
    },
    /// A removal finished.
    UninstStop,
    /// A scriptlet failed; non-fatal but worth logging.
    ScriptError {
        /// Description of the failure.
        message: String,
    },
}

/// The callback the driver hands to [`RpmRuntime::check`] and
/// [`RpmRuntime::run`].
pub type RpmCallback<'a> = &'a mut dyn FnMut(RpmEvent);

/// rpm problem classes the driver may ask the runtime to tolerate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProblemsFilter(u32);

impl ProblemsFilter {
    /// Reinstalling the same package version is fine.
    pub const REPLACEPKG: ProblemsFilter = ProblemsFilter(1 << 0);
    /// Replacing with an older version is fine.
    pub const OLDPACKAGE: ProblemsFilter = ProblemsFilter(1 << 1);
    /// Skip the disk space check.
    pub const DISKSPACE: ProblemsFilter = ProblemsFilter(1 << 2);

    /// True when every bit of `other` is set.
    pub fn contains(self, other: ProblemsFilter) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ProblemsFilter {
    type Output = ProblemsFilter;

    fn bitor(self, rhs: ProblemsFilter) -> ProblemsFilter {
        ProblemsFilter(self.0 | rhs.0)
    }
}

/// Behaviour flags for [`RpmRuntime::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RpmTransFlags(u32);

impl RpmTransFlags {
    /// Run the transaction without touching the system.
    pub const TEST: RpmTransFlags = RpmTransFlags(1 << 0);
    /// Skip documentation files.
    pub const NODOCS: RpmTransFlags = RpmTransFlags(1 << 1);

    /// True when every bit of `other` is set.
    pub fn contains(self, other: RpmTransFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for RpmTransFlags {
    type Output = RpmTransFlags;

    fn bitor(self, rhs: RpmTransFlags) -> RpmTransFlags {
        RpmTransFlags(self.0 | rhs.0)
    }
}

/// rpm log verbosity, set from configuration before a commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RpmVerbosity {
    /// Critical messages only.
    Critical,
    /// Emergencies only.
    #[default]
    Emergency,
    /// Errors.
    Error,
    /// Warnings.
    Warn,
    /// Informational.
    Info,
    /// Everything.
    Debug,
}

impl RpmVerbosity {
    /// Parses the configuration string form, falling back to emergency.
    pub fn from_config(value: &str) -> RpmVerbosity {
        match value {
            "critical" => RpmVerbosity::Critical,
            "emergency" => RpmVerbosity::Emergency,
            "error" => RpmVerbosity::Error,
            "warn" => RpmVerbosity::Warn,
            "info" => RpmVerbosity::Info,
            "debug" => RpmVerbosity::Debug,
            _ => RpmVerbosity::Emergency,
        }
    }
}

/// The slice of librpm the transaction driver needs: building a
/// transaction element by element, ordering it, and running the check,
/// test and commit phases with a progress callback.
pub trait RpmRuntime {
    /// Points the runtime at the installation root.
    fn set_root(&mut self, root: &Path) -> Result<()>;

    /// Sets rpm's log verbosity.
    fn set_verbosity(&mut self, verbosity: RpmVerbosity);

    /// Adds a package file to install.
    fn add_install_file(&mut self, path: &Path, allow_untrusted: bool, is_update: bool)
        -> Result<()>;

    /// Adds an installed package to remove.
    fn add_remove(&mut self, header: &HeaderInfo) -> Result<()>;

    /// Orders the transaction elements.
    fn order(&mut self);

    /// Runs the dependency check; returns the problems found.
    fn check(&mut self, callback: RpmCallback<'_>) -> Vec<String>;

    /// Runs the transaction. Problems that survive `filter` come back in
    /// the `Ok` list; an `Err` is an rpm-level failure.
    fn run(
        &mut self,
        filter: ProblemsFilter,
        flags: RpmTransFlags,
        callback: RpmCallback<'_>,
    ) -> Result<Vec<String>>;

    /// Empties the transaction so the runtime can be reused.
    fn clear(&mut self);
}
