use haversack_types::CmpFlags;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{ReldepId, RepoId, StringId};

pub(crate) type DepVec = SmallVec<[ReldepId; 4]>;

/// An interned relational dependency: `(name, comparison, evr)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reldep {
    /// Interned capability name.
    pub name: StringId,
    /// Range operator; empty for unversioned dependencies.
    pub cmp: CmpFlags,
    /// Interned EVR, present iff `cmp` is non-empty.
    pub evr: Option<StringId>,
}

/// A single package candidate in the pool, fully interned.
#[derive(Debug, Clone)]
pub struct Solvable {
    /// Interned package name.
    pub name: StringId,
    /// Interned `[epoch:]version-release` string.
    pub evr: StringId,
    /// Interned architecture.
    pub arch: StringId,
    /// The repository this solvable belongs to.
    pub repo: RepoId,
    pub(crate) provides: DepVec,
    pub(crate) requires: DepVec,
    pub(crate) conflicts: DepVec,
    pub(crate) obsoletes: DepVec,
    pub(crate) recommends: DepVec,
    pub(crate) suggests: DepVec,
    pub(crate) enhances: DepVec,
    pub(crate) supplements: DepVec,
    pub(crate) files: Vec<String>,
    pub(crate) summary: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) url: Option<String>,
    pub(crate) location: Option<String>,
    pub(crate) sourcerpm: Option<String>,
    pub(crate) download_size: u64,
    pub(crate) checksum: Option<String>,
}

/// The dependency relations a solvable carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepKind {
    /// `Provides:`
    Provides,
    /// `Requires:`
    Requires,
    /// `Conflicts:`
    Conflicts,
    /// `Obsoletes:`
    Obsoletes,
    /// `Recommends:`
    Recommends,
    /// `Suggests:`
    Suggests,
    /// `Enhances:`
    Enhances,
    /// `Supplements:`
    Supplements,
}

impl Solvable {
    /// The id-array for one dependency relation.
    pub fn deps(&self, kind: DepKind) -> &[ReldepId] {
        match kind {
            DepKind::Provides => &self.provides,
            DepKind::Requires => &self.requires,
            DepKind::Conflicts => &self.conflicts,
            DepKind::Obsoletes => &self.obsoletes,
            DepKind::Recommends => &self.recommends,
            DepKind::Suggests => &self.suggests,
            DepKind::Enhances => &self.enhances,
            DepKind::Supplements => &self.supplements,
        }
    }

    /// Files owned by the package.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// One-line summary, if the metadata carried one.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Long description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Upstream URL.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Location of the payload relative to the repository root.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Filename of the source rpm this package was built from.
    pub fn sourcerpm(&self) -> Option<&str> {
        self.sourcerpm.as_deref()
    }

    /// Size of the payload to download, in bytes.
    pub fn download_size(&self) -> u64 {
        self.download_size
    }

    /// Checksum of the package header, when known up front.
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }
}

/// The wire-independent description of one package, as handed to
/// [`crate::Pool::add_solvable`] by whoever parsed the repository
/// metadata. Dependency entries are `name [op evr]` strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvableRecord {
    /// Package name.
    pub name: String,
    /// Epoch; `None` is distinct from `Some(0)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
    /// Version.
    pub version: String,
    /// Release.
    pub release: String,
    /// Architecture.
    pub arch: String,
    /// `Provides:` entries; the implicit `name = evr` self-provide is
    /// added by the pool and must not be listed here.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<String>,
    /// `Requires:` entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    /// `Conflicts:` entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
    /// `Obsoletes:` entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obsoletes: Vec<String>,
    /// `Recommends:` entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommends: Vec<String>,
    /// `Suggests:` entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggests: Vec<String>,
    /// `Enhances:` entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enhances: Vec<String>,
    /// `Supplements:` entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supplements: Vec<String>,
    /// Files owned by the package.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    /// One-line summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Long description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Upstream URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Payload location relative to the repository root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Source rpm filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sourcerpm: Option<String>,
    /// Payload size in bytes.
    #[serde(default)]
    pub download_size: u64,
    /// Header checksum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl SolvableRecord {
    /// A minimal record from a `name-[e:]version-release.arch` tuple,
    /// useful for tests and synthetic repositories.
    pub fn new(name: &str, evr: &str, arch: &str) -> SolvableRecord {
        let (epoch, version, release) = haversack_types::split_evr(evr);
        SolvableRecord {
            name: name.to_owned(),
            epoch: epoch.and_then(|e| e.parse().ok()),
            version: version.to_owned(),
            release: release.unwrap_or("0").to_owned(),
            arch: arch.to_owned(),
            ..SolvableRecord::default()
        }
    }

    /// The `[epoch:]version-release` rendering of the record.
    pub fn evr(&self) -> String {
        match self.epoch {
            Some(e) => format!("{}:{}-{}", e, self.version, self.release),
            None => format!("{}-{}", self.version, self.release),
        }
    }
}
