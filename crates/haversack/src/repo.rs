use haversack_solve::{Advisory, RepoId, SolvableRecord};
use serde::{Deserialize, Serialize};

/// Name of the distinguished repository holding installed packages.
pub const SYSTEM_REPO_NAME: &str = "@System";

/// Name of the pseudo-repository for packages given as local files.
pub const CMDLINE_REPO_NAME: &str = "@commandline";

/// A named metadata source and its policy flags. Solvables belong to
/// exactly one repo.
#[derive(Debug, Clone)]
pub struct Repo {
    name: String,
    enabled: bool,
    gpgcheck: bool,
    cost: u32,
    pub(crate) pool_id: Option<RepoId>,
}

impl Repo {
    /// A new enabled repository with default cost and gpgcheck off.
    pub fn new(name: &str) -> Repo {
        Repo {
            name: name.to_owned(),
            enabled: true,
            gpgcheck: false,
            cost: 1000,
            pool_id: None,
        }
    }

    /// The repository name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the repository participates in queries and solving.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether packages from this repository must carry a valid
    /// signature.
    pub fn gpgcheck(&self) -> bool {
        self.gpgcheck
    }

    /// Requires (or stops requiring) valid signatures.
    pub fn set_gpgcheck(&mut self, gpgcheck: bool) {
        self.gpgcheck = gpgcheck;
    }

    /// The repository cost; lower wins when candidates tie.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Sets the repository cost.
    pub fn set_cost(&mut self, cost: u32) {
        self.cost = cost;
    }
}

/// Parsed metadata handed to [`crate::Sack::load_repo`]: the package
/// records plus any update advisories. How this was read off the wire is
/// the metadata loader's business, not ours.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoData {
    /// Package records.
    pub records: Vec<SolvableRecord>,
    /// Update advisories.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advisories: Vec<Advisory>,
}

/// Which optional metadata parts [`crate::Sack::load_repo`] should load.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadFlags {
    /// Write a cache snapshot of the loaded data under the sack's
    /// cachedir.
    pub build_cache: bool,
    /// Load per-package filelists.
    pub load_filelists: bool,
    /// Load delta-rpm metadata. Accepted for interface compatibility;
    /// delta handling happens outside this library.
    pub load_presto: bool,
    /// Load update advisories.
    pub load_updateinfo: bool,
}
