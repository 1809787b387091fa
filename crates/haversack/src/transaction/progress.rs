/// What the driver is doing to one package; also written into the
/// reason-propagation logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageAction {
    /// Freshly installed.
    Install,
    /// Reinstalled at the same version.
    Reinstall,
    /// Replaced by an older version.
    Downgrade,
    /// Replaced by a newer version.
    Update,
    /// Removed on request.
    Remove,
    /// Removed because something obsoletes it.
    Obsolete,
    /// Removed as the leftover half of an update or obsoletion.
    Cleanup,
}

/// Where the commit state machine currently stands. Progress events are
/// only forwarded while writing; everything reported during preparation
/// (or during the test transaction) is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStep {
    /// Commit has begun, nothing reported yet.
    Started,
    /// rpm is preparing the transaction.
    Preparing,
    /// rpm is writing packages to disk.
    Writing,
    /// Events are deliberately ignored (test transaction).
    Ignore,
}

/// Receives commit progress. All methods default to no-ops so hosts
/// implement only what they display.
pub trait ProgressSink {
    /// A package action starts.
    fn action_start(&mut self, _action: PackageAction, _package_id: &str) {}

    /// The current package action finished.
    fn action_stop(&mut self) {}

    /// Overall progress percentage.
    fn set_percentage(&mut self, _percentage: u32) {}

    /// Progress of one package.
    fn package_progress(&mut self, _package_id: &str, _action: PackageAction, _percentage: u32) {}

    /// Current write speed in bytes per second.
    fn set_speed(&mut self, _bytes_per_second: u64) {}
}

/// A sink that discards everything.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {}
