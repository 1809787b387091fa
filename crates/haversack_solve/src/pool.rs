use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::hash_map::Entry;

use fxhash::FxHashMap;
use haversack_types::{evr, evr_cmp, evr_cmp_promote, CmpFlags, Nevra, ParseReldepError, ReldepSpec};
use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::id::{ReldepId, RepoId, SolvableId, StringId};
use crate::matcher::StrMatcher;
use crate::solvable::{DepKind, DepVec, Reldep, Solvable, SolvableRecord};

/// String-valued solvable attributes reachable through [`Pool::search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringAttr {
    /// Package name.
    Name,
    /// `[epoch:]version-release`.
    Evr,
    /// Architecture.
    Arch,
    /// One-line summary.
    Summary,
    /// Long description.
    Description,
    /// Upstream URL.
    Url,
    /// The complete filelist; a solvable matches when any file does.
    Filelist,
}

/// An update advisory attached to a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    /// Advisory id, e.g. `FEDORA-2026-123`.
    pub id: String,
    /// Advisory kind: `security`, `bugfix`, `enhancement`.
    pub kind: String,
    /// Severity, when the advisory carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    /// Referenced bug ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bugs: Vec<String>,
    /// Referenced CVE ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cves: Vec<String>,
    /// The update collection: NEVRAs the advisory ships.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<Nevra>,
}

enum InternalSolvable {
    /// Ids 0 ("none") and 1 (the system solvable) are reserved.
    Reserved,
    Package(Solvable),
}

#[derive(Default)]
struct ProvidesIndex {
    by_name: FxHashMap<StringId, Vec<SolvableId>>,
    by_file: FxHashMap<String, Vec<SolvableId>>,
}

/// The package universe: interned strings, dependency expressions,
/// repositories, solvables and advisories, plus a lazily maintained
/// provides index.
pub struct Pool {
    solvables: Arena<SolvableId, InternalSolvable>,
    strings: Arena<StringId, String>,
    string_ids: FxHashMap<String, StringId>,
    reldeps: Arena<ReldepId, Reldep>,
    reldep_ids: FxHashMap<Reldep, ReldepId>,
    repos: Arena<RepoId, String>,
    installed: Option<RepoId>,
    advisories: Vec<Advisory>,
    obsolete_uses_provides: bool,
    provides: RefCell<Option<ProvidesIndex>>,
}

impl Default for Pool {
    fn default() -> Self {
        let mut solvables = Arena::new();
        solvables.alloc(InternalSolvable::Reserved);
        solvables.alloc(InternalSolvable::Reserved);
        Pool {
            solvables,
            strings: Arena::new(),
            string_ids: FxHashMap::default(),
            reldeps: Arena::new(),
            reldep_ids: FxHashMap::default(),
            repos: Arena::new(),
            installed: None,
            advisories: Vec::new(),
            obsolete_uses_provides: false,
            provides: RefCell::new(None),
        }
    }
}

impl Pool {
    /// Creates an empty pool.
    pub fn new() -> Pool {
        Pool::default()
    }

    /// Registers a repository and returns its id.
    pub fn new_repo(&mut self, name: &str) -> RepoId {
        self.repos.alloc(name.to_owned())
    }

    /// The name a repository was registered under.
    pub fn repo_name(&self, repo: RepoId) -> &str {
        &self.repos[repo]
    }

    /// All registered repository ids.
    pub fn repos(&self) -> impl Iterator<Item = RepoId> {
        self.repos.ids()
    }

    /// Looks a repository up by name.
    pub fn repo_by_name(&self, name: &str) -> Option<RepoId> {
        self.repos.ids().find(|&r| self.repos[r] == name)
    }

    /// Marks `repo` as the installed-packages repository.
    pub fn set_installed_repo(&mut self, repo: RepoId) {
        self.installed = Some(repo);
    }

    /// The installed-packages repository, if one was loaded.
    pub fn installed_repo(&self) -> Option<RepoId> {
        self.installed
    }

    /// Whether obsoletes match against provides rather than package names.
    pub fn set_obsolete_uses_provides(&mut self, value: bool) {
        self.obsolete_uses_provides = value;
    }

    /// See [`Pool::set_obsolete_uses_provides`].
    pub fn obsolete_uses_provides(&self) -> bool {
        self.obsolete_uses_provides
    }

    /// Interns a string.
    pub fn intern_str(&mut self, s: &str) -> StringId {
        match self.string_ids.entry(s.to_owned()) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let id = self.strings.alloc(e.key().clone());
                e.insert(id);
                id
            }
        }
    }

    /// Looks a string up without interning it.
    pub fn str2id(&self, s: &str) -> Option<StringId> {
        self.string_ids.get(s).copied()
    }

    /// The string behind an id.
    pub fn id2str(&self, id: StringId) -> &str {
        &self.strings[id]
    }

    /// Interns a dependency expression.
    pub fn intern_reldep(&mut self, spec: &ReldepSpec) -> ReldepId {
        let name = self.intern_str(&spec.name);
        let evr = spec.evr.as_deref().map(|e| self.intern_str(e));
        let reldep = Reldep {
            name,
            cmp: spec.cmp,
            evr,
        };
        match self.reldep_ids.entry(reldep) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let id = self.reldeps.alloc(reldep);
                e.insert(id);
                id
            }
        }
    }

    /// The dependency behind an id.
    pub fn reldep(&self, id: ReldepId) -> Reldep {
        self.reldeps[id]
    }

    /// Reconstructs the owned spec form of an interned dependency.
    pub fn reldep_spec(&self, id: ReldepId) -> ReldepSpec {
        let dep = self.reldeps[id];
        ReldepSpec {
            name: self.id2str(dep.name).to_owned(),
            cmp: dep.cmp,
            evr: dep.evr.map(|e| self.id2str(e).to_owned()),
        }
    }

    /// Renders a dependency back into `name [op evr]` form.
    pub fn reldep_str(&self, id: ReldepId) -> String {
        let dep = self.reldeps[id];
        match dep.evr {
            Some(evr) => format!(
                "{} {} {}",
                self.id2str(dep.name),
                dep.cmp,
                self.id2str(evr)
            ),
            None => self.id2str(dep.name).to_owned(),
        }
    }

    /// Adds a package to a repository. Dependency strings are parsed and
    /// interned; the implicit `name = evr` self-provide is added.
    pub fn add_solvable(
        &mut self,
        repo: RepoId,
        record: &SolvableRecord,
    ) -> Result<SolvableId, ParseReldepError> {
        let name = self.intern_str(&record.name);
        let evr = self.intern_str(&record.evr());
        let arch = self.intern_str(&record.arch);

        let self_provide = ReldepSpec::versioned(&record.name, CmpFlags::EQ, record.evr());
        let mut provides = self.intern_deps(&record.provides)?;
        provides.push(self.intern_reldep(&self_provide));

        let solvable = Solvable {
            name,
            evr,
            arch,
            repo,
            provides,
            requires: self.intern_deps(&record.requires)?,
            conflicts: self.intern_deps(&record.conflicts)?,
            obsoletes: self.intern_deps(&record.obsoletes)?,
            recommends: self.intern_deps(&record.recommends)?,
            suggests: self.intern_deps(&record.suggests)?,
            enhances: self.intern_deps(&record.enhances)?,
            supplements: self.intern_deps(&record.supplements)?,
            files: record.files.clone(),
            summary: record.summary.clone(),
            description: record.description.clone(),
            url: record.url.clone(),
            location: record.location.clone(),
            sourcerpm: record.sourcerpm.clone(),
            download_size: record.download_size,
            checksum: record.checksum.clone(),
        };
        self.provides.replace(None);
        Ok(self.solvables.alloc(InternalSolvable::Package(solvable)))
    }

    fn intern_deps(&mut self, deps: &[String]) -> Result<DepVec, ParseReldepError> {
        deps.iter()
            .map(|d| Ok(self.intern_reldep(&d.parse()?)))
            .collect()
    }

    /// Attaches an advisory.
    pub fn add_advisory(&mut self, advisory: Advisory) {
        self.advisories.push(advisory);
    }

    /// All loaded advisories.
    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    /// The number of allocated solvable slots, reserved ids included.
    pub fn nsolvables(&self) -> usize {
        self.solvables.len()
    }

    /// Iterates over all package solvables.
    pub fn solvables(&self) -> impl Iterator<Item = SolvableId> + '_ {
        self.solvables
            .ids()
            .filter(|&id| matches!(self.solvables[id], InternalSolvable::Package(_)))
    }

    /// The solvable behind an id.
    ///
    /// Panics when `id` is a reserved id.
    pub fn solvable(&self, id: SolvableId) -> &Solvable {
        match &self.solvables[id] {
            InternalSolvable::Package(s) => s,
            InternalSolvable::Reserved => panic!("reserved solvable id {id:?}"),
        }
    }

    fn try_solvable(&self, id: SolvableId) -> Option<&Solvable> {
        match self.solvables.get(id)? {
            InternalSolvable::Package(s) => Some(s),
            InternalSolvable::Reserved => None,
        }
    }

    /// True when the solvable belongs to the installed repository.
    pub fn is_installed(&self, id: SolvableId) -> bool {
        match (self.try_solvable(id), self.installed) {
            (Some(s), Some(installed)) => s.repo == installed,
            _ => false,
        }
    }

    /// The package name as a string.
    pub fn name_str(&self, id: SolvableId) -> &str {
        self.id2str(self.solvable(id).name)
    }

    /// The EVR as a string.
    pub fn evr_str(&self, id: SolvableId) -> &str {
        self.id2str(self.solvable(id).evr)
    }

    /// The architecture as a string.
    pub fn arch_str(&self, id: SolvableId) -> &str {
        self.id2str(self.solvable(id).arch)
    }

    /// The canonical `name-[epoch:]version-release.arch` rendering.
    pub fn nevra(&self, id: SolvableId) -> String {
        let s = self.solvable(id);
        format!(
            "{}-{}.{}",
            self.id2str(s.name),
            self.id2str(s.evr),
            self.id2str(s.arch)
        )
    }

    /// The epoch, `None` when the EVR carries none.
    pub fn epoch_opt(&self, id: SolvableId) -> Option<u64> {
        evr::epoch_of(self.evr_str(id))
    }

    /// Compares the EVRs of two interned strings.
    pub fn evrcmp_ids(&self, a: StringId, b: StringId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        evr_cmp(self.id2str(a), self.id2str(b))
    }

    /// (Re)builds the provides index when it is stale. Idempotent.
    pub fn make_provides_ready(&self) {
        let mut slot = self.provides.borrow_mut();
        if slot.is_some() {
            return;
        }
        let mut index = ProvidesIndex::default();
        for id in self.solvables() {
            let s = self.solvable(id);
            for &dep in s.deps(DepKind::Provides) {
                index
                    .by_name
                    .entry(self.reldeps[dep].name)
                    .or_default()
                    .push(id);
            }
            for file in s.files() {
                index.by_file.entry(file.clone()).or_default().push(id);
            }
        }
        *slot = Some(index);
    }

    /// Every solvable whose provides (or filelist, for absolute paths)
    /// satisfy `spec`.
    pub fn providers(&self, spec: &ReldepSpec) -> Vec<SolvableId> {
        self.make_provides_ready();
        let index = self.provides.borrow();
        let index = index.as_ref().expect("provides index just built");

        let mut out = Vec::new();
        if let Some(name) = self.str2id(&spec.name) {
            if let Some(candidates) = index.by_name.get(&name) {
                for &p in candidates {
                    let matches = self
                        .solvable(p)
                        .deps(DepKind::Provides)
                        .iter()
                        .any(|&prov| self.dep_matches(spec, prov));
                    if matches {
                        out.push(p);
                    }
                }
            }
        }
        if spec.name.starts_with('/') {
            if let Some(candidates) = index.by_file.get(&spec.name) {
                for &p in candidates {
                    if !out.contains(&p) {
                        out.push(p);
                    }
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Solvables carrying `name` as their package name.
    pub fn solvables_by_name(&self, name: &str) -> Vec<SolvableId> {
        match self.str2id(name) {
            Some(id) => self.solvables().filter(|&p| self.solvable(p).name == id).collect(),
            None => Vec::new(),
        }
    }

    /// True when the ranges of `spec` and the interned dependency overlap.
    pub fn dep_matches(&self, spec: &ReldepSpec, dep: ReldepId) -> bool {
        let dep = self.reldeps[dep];
        if self.id2str(dep.name) != spec.name {
            return false;
        }
        let (spec_evr, dep_evr) = match (&spec.evr, dep.evr) {
            (Some(a), Some(b)) => (a.as_str(), self.id2str(b)),
            // either side unversioned matches any version
            _ => return true,
        };
        ranges_overlap(spec.cmp, spec_evr, dep.cmp, dep_evr)
    }

    /// True when the solvable's own name and EVR satisfy `spec` (the
    /// strict obsoletes predicate).
    pub fn match_nevr(&self, id: SolvableId, spec: &ReldepSpec) -> bool {
        let s = self.solvable(id);
        if self.id2str(s.name) != spec.name {
            return false;
        }
        match &spec.evr {
            None => true,
            Some(evr) => evr_satisfies(self.evr_str(id), spec.cmp, evr),
        }
    }

    /// The installed package that the available package `id` would
    /// upgrade, if any.
    pub fn what_upgrades(&self, id: SolvableId) -> Option<SolvableId> {
        self.what_updown(id, Ordering::Greater)
    }

    /// The installed package that the available package `id` would
    /// downgrade, if any.
    pub fn what_downgrades(&self, id: SolvableId) -> Option<SolvableId> {
        self.what_updown(id, Ordering::Less)
    }

    fn what_updown(&self, id: SolvableId, direction: Ordering) -> Option<SolvableId> {
        let installed = self.installed?;
        if self.is_installed(id) {
            return None;
        }
        let s = self.solvable(id);
        let candidates = self.solvables().filter(|&q| {
            let other = self.solvable(q);
            other.repo == installed
                && other.name == s.name
                && self.evrcmp_ids(s.evr, other.evr) == direction
        });
        // the adjacent installed version: the highest one an upgrade
        // steps over, the lowest one a downgrade steps under
        if direction == Ordering::Greater {
            candidates.max_by(|&a, &b| self.evrcmp_ids(self.solvable(a).evr, self.solvable(b).evr))
        } else {
            candidates.min_by(|&a, &b| self.evrcmp_ids(self.solvable(a).evr, self.solvable(b).evr))
        }
    }

    /// Iterates package solvables whose `attr` matches.
    pub fn search(&self, attr: StringAttr, matcher: &StrMatcher) -> Vec<SolvableId> {
        self.solvables()
            .filter(|&id| {
                let s = self.solvable(id);
                match attr {
                    StringAttr::Name => matcher.matches(self.id2str(s.name)),
                    StringAttr::Evr => matcher.matches(self.id2str(s.evr)),
                    StringAttr::Arch => matcher.matches(self.id2str(s.arch)),
                    StringAttr::Summary => s.summary().is_some_and(|v| matcher.matches(v)),
                    StringAttr::Description => s.description().is_some_and(|v| matcher.matches(v)),
                    StringAttr::Url => s.url().is_some_and(|v| matcher.matches(v)),
                    StringAttr::Filelist => s.files().iter().any(|f| matcher.matches(f)),
                }
            })
            .collect()
    }

    /// Distinct package names matching `matcher`, in id order.
    pub fn names_matching(&self, matcher: &StrMatcher) -> Vec<StringId> {
        let mut out: Vec<StringId> = self
            .solvables()
            .map(|id| self.solvable(id).name)
            .filter(|&n| matcher.matches(self.id2str(n)))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

fn evr_satisfies(candidate: &str, cmp: CmpFlags, wanted: &str) -> bool {
    let ord = evr_cmp_promote(candidate, wanted);
    (ord == Ordering::Equal && cmp.contains(CmpFlags::EQ))
        || (ord == Ordering::Greater && cmp.contains(CmpFlags::GT))
        || (ord == Ordering::Less && cmp.contains(CmpFlags::LT))
}

fn ranges_overlap(a_cmp: CmpFlags, a_evr: &str, b_cmp: CmpFlags, b_evr: &str) -> bool {
    match evr_cmp_promote(a_evr, b_evr) {
        Ordering::Less => a_cmp.contains(CmpFlags::GT) || b_cmp.contains(CmpFlags::LT),
        Ordering::Greater => a_cmp.contains(CmpFlags::LT) || b_cmp.contains(CmpFlags::GT),
        Ordering::Equal => {
            (a_cmp.contains(CmpFlags::EQ) && b_cmp.contains(CmpFlags::EQ))
                || (a_cmp.contains(CmpFlags::LT) && b_cmp.contains(CmpFlags::LT))
                || (a_cmp.contains(CmpFlags::GT) && b_cmp.contains(CmpFlags::GT))
        }
    }
}
