use std::fmt::{self, Display, Formatter};

use haversack_solve::{DepKind, ReldepId, SolvableId};
use haversack_types::{evr, evr_cmp};

use crate::sack::Sack;

/// A lightweight view of one solvable. Holds a non-owning reference to
/// the sack for id-to-string resolution; the sack outlives every package
/// handed out from it by construction.
#[derive(Clone, Copy)]
pub struct Package<'s> {
    sack: &'s Sack,
    id: SolvableId,
}

impl<'s> Package<'s> {
    pub(crate) fn new(sack: &'s Sack, id: SolvableId) -> Package<'s> {
        Package { sack, id }
    }

    /// The solvable id.
    pub fn id(&self) -> SolvableId {
        self.id
    }

    /// The owning sack.
    pub fn sack(&self) -> &'s Sack {
        self.sack
    }

    /// Package name.
    pub fn name(&self) -> &'s str {
        self.sack.pool().name_str(self.id)
    }

    /// `[epoch:]version-release`.
    pub fn evr(&self) -> &'s str {
        self.sack.pool().evr_str(self.id)
    }

    /// The numeric epoch; packages without an explicit epoch report 0.
    pub fn epoch(&self) -> u64 {
        self.sack.pool().epoch_opt(self.id).unwrap_or(0)
    }

    /// Version part of the EVR.
    pub fn version(&self) -> &'s str {
        evr::split_evr(self.evr()).1
    }

    /// Release part of the EVR.
    pub fn release(&self) -> &'s str {
        evr::split_evr(self.evr()).2.unwrap_or("")
    }

    /// Architecture.
    pub fn arch(&self) -> &'s str {
        self.sack.pool().arch_str(self.id)
    }

    /// Canonical `name-[epoch:]version-release.arch` rendering.
    pub fn nevra(&self) -> String {
        self.sack.pool().nevra(self.id)
    }

    /// Name of the repository the package belongs to.
    pub fn reponame(&self) -> &'s str {
        let pool = self.sack.pool();
        pool.repo_name(pool.solvable(self.id).repo)
    }

    /// True when the package comes from the installed-packages repo.
    pub fn installed(&self) -> bool {
        self.sack.pool().is_installed(self.id)
    }

    /// One-line summary.
    pub fn summary(&self) -> Option<&'s str> {
        self.sack.pool().solvable(self.id).summary()
    }

    /// Long description.
    pub fn description(&self) -> Option<&'s str> {
        self.sack.pool().solvable(self.id).description()
    }

    /// Upstream URL.
    pub fn url(&self) -> Option<&'s str> {
        self.sack.pool().solvable(self.id).url()
    }

    /// Payload location relative to the repository root.
    pub fn location(&self) -> Option<&'s str> {
        self.sack.pool().solvable(self.id).location()
    }

    /// The source rpm filename; synthesised from the EVR when the
    /// metadata did not carry one.
    pub fn sourcerpm(&self) -> String {
        match self.sack.pool().solvable(self.id).sourcerpm() {
            Some(s) => s.to_owned(),
            None => format!("{}-{}-{}.src.rpm", self.name(), self.version(), self.release()),
        }
    }

    /// Files owned by the package.
    pub fn files(&self) -> &'s [String] {
        self.sack.pool().solvable(self.id).files()
    }

    /// Payload size in bytes.
    pub fn download_size(&self) -> u64 {
        self.sack.pool().solvable(self.id).download_size()
    }

    /// Header checksum, when the metadata carried one.
    pub fn checksum(&self) -> Option<&'s str> {
        self.sack.pool().solvable(self.id).checksum()
    }

    /// The dependency ids of one relation.
    pub fn deps(&self, kind: DepKind) -> &'s [ReldepId] {
        self.sack.pool().solvable(self.id).deps(kind)
    }

    /// True when the package name is on the sack's install-only list.
    pub fn is_installonly(&self) -> bool {
        self.sack.installonly().iter().any(|n| n == self.name())
    }

    /// A stable identity string: `name;evr;arch;reponame`.
    pub fn package_id(&self) -> String {
        format!("{};{};{};{}", self.name(), self.evr(), self.arch(), self.reponame())
    }

    /// EVR comparison against another package.
    pub fn evr_cmp(&self, other: &Package<'_>) -> std::cmp::Ordering {
        evr_cmp(self.evr(), other.evr())
    }
}

impl PartialEq for Package<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && std::ptr::eq(self.sack, other.sack)
    }
}

impl Eq for Package<'_> {}

impl fmt::Debug for Package<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Package({})", self.nevra())
    }
}

impl Display for Package<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nevra())
    }
}
