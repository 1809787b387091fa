use std::cell::RefCell;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use haversack_solve::{Map, Pool, SolvableId, StrMatcher, StringAttr};
use haversack_types::{evr, evr_cmp, CmpFlags, ReldepSpec};
use tracing::debug;

use crate::arch;
use crate::errors::{Error, Result};
use crate::package::Package;
use crate::packageset::PackageSet;
use crate::repo::{LoadFlags, Repo, RepoData, SYSTEM_REPO_NAME};

/// What [`Sack::knows`] found out about a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Knows {
    /// Nothing by that name.
    No,
    /// A package carries the name.
    Name,
    /// Something provides the name, but no package carries it.
    Provider,
}

/// Options for [`Sack::knows`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KnowsFlags {
    /// Only look at package names, not at provides.
    pub name_only: bool,
    /// Match case-insensitively.
    pub icase: bool,
    /// Treat the name as an fnmatch-style glob.
    pub glob: bool,
}

/// Builds a [`Sack`]. The architecture is validated and the cache
/// directory optionally created when [`SackBuilder::build`] runs.
#[derive(Debug, Default)]
pub struct SackBuilder {
    cachedir: Option<PathBuf>,
    arch: Option<String>,
    rootdir: Option<PathBuf>,
    make_cache_dir: bool,
    logfile: Option<PathBuf>,
    running_kernel_release: Option<String>,
}

impl SackBuilder {
    /// Directory for metadata caches and downloaded packages.
    pub fn cachedir(mut self, path: impl Into<PathBuf>) -> Self {
        self.cachedir = Some(path.into());
        self
    }

    /// Base architecture of the system the sack describes.
    pub fn arch(mut self, arch: &str) -> Self {
        self.arch = Some(arch.to_owned());
        self
    }

    /// Root of the installed system, `/` by default.
    pub fn rootdir(mut self, path: impl Into<PathBuf>) -> Self {
        self.rootdir = Some(path.into());
        self
    }

    /// Create the cache directory if it is missing.
    pub fn make_cache_dir(mut self, value: bool) -> Self {
        self.make_cache_dir = value;
        self
    }

    /// File that diagnostic events should be routed to. The library logs
    /// through `tracing`; the path is validated here and carried on the
    /// sack for the host's subscriber to pick up.
    pub fn logfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.logfile = Some(path.into());
        self
    }

    /// The `version-release` of the currently booted kernel, as the host
    /// detected it. Without it [`Sack::running_kernel`] finds nothing.
    pub fn running_kernel_release(mut self, release: &str) -> Self {
        self.running_kernel_release = Some(release.to_owned());
        self
    }

    /// Validates the options and constructs the sack.
    pub fn build(self) -> Result<Sack> {
        let arch = self.arch.unwrap_or_else(|| "noarch".to_owned());
        if !arch::is_valid(&arch) {
            return Err(Error::InvalidArchitecture(arch));
        }
        let cachedir = self.cachedir.unwrap_or_else(|| PathBuf::from("/var/cache/haversack"));
        if self.make_cache_dir && !cachedir.is_dir() {
            fs::create_dir_all(&cachedir)
                .map_err(|e| Error::FileInvalid(format!("{}: {e}", cachedir.display())))?;
        }
        if let Some(logfile) = &self.logfile {
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(logfile)
                .map_err(|e| Error::FileInvalid(format!("{}: {e}", logfile.display())))?;
        }
        Ok(Sack {
            pool: Pool::new(),
            repos: Vec::new(),
            excludes: None,
            includes: None,
            considered: RefCell::new(None),
            installonly: Vec::new(),
            installonly_limit: 0,
            arch,
            cachedir,
            rootdir: self.rootdir.unwrap_or_else(|| PathBuf::from("/")),
            logfile: self.logfile,
            running_kernel_release: self.running_kernel_release,
            running_kernel: RefCell::new(None),
        })
    }
}

/// The package universe plus its policy knobs: loaded repositories, the
/// excludes/includes sets and the considered bitmap derived from them,
/// the install-only policy and the running-kernel cache.
pub struct Sack {
    pool: Pool,
    repos: Vec<Repo>,
    excludes: Option<PackageSet>,
    includes: Option<PackageSet>,
    considered: RefCell<Option<Option<Map>>>,
    installonly: Vec<String>,
    installonly_limit: u32,
    arch: String,
    cachedir: PathBuf,
    rootdir: PathBuf,
    logfile: Option<PathBuf>,
    running_kernel_release: Option<String>,
    running_kernel: RefCell<Option<Option<SolvableId>>>,
}

impl Sack {
    /// Starts building a sack.
    pub fn builder() -> SackBuilder {
        SackBuilder::default()
    }

    /// The underlying pool.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// The base architecture the sack was built for.
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// The cache directory.
    pub fn cachedir(&self) -> &Path {
        &self.cachedir
    }

    /// The installation root.
    pub fn rootdir(&self) -> &Path {
        &self.rootdir
    }

    /// The log file path given at construction, if any.
    pub fn logfile(&self) -> Option<&Path> {
        self.logfile.as_deref()
    }

    /// Architectures installable on this sack's base arch, best first.
    pub fn list_arches(&self) -> Vec<&'static str> {
        arch::compatible(&self.arch)
    }

    /// Wraps a solvable id into a [`Package`] view.
    pub fn package(&self, id: SolvableId) -> Package<'_> {
        Package::new(self, id)
    }

    /// Names allowed to have multiple concurrently installed versions.
    pub fn installonly(&self) -> &[String] {
        &self.installonly
    }

    /// Replaces the install-only name list.
    pub fn set_installonly(&mut self, names: &[&str]) {
        self.installonly = names.iter().map(|s| s.to_string()).collect();
    }

    /// How many versions of an install-only name may coexist; `0`
    /// disables the policy.
    pub fn installonly_limit(&self) -> u32 {
        self.installonly_limit
    }

    /// Sets the install-only limit.
    pub fn set_installonly_limit(&mut self, limit: u32) {
        self.installonly_limit = limit;
    }

    /// Loads the installed-package state; the repository becomes the
    /// distinguished `@System` repo of the pool.
    pub fn load_system_repo(&mut self, data: RepoData) -> Result<()> {
        let mut repo = Repo::new(SYSTEM_REPO_NAME);
        let pool_id = self.pool.new_repo(SYSTEM_REPO_NAME);
        repo.pool_id = Some(pool_id);
        self.pool.set_installed_repo(pool_id);
        for record in &data.records {
            self.pool
                .add_solvable(pool_id, record)
                .map_err(|e| Error::FileInvalid(format!("system metadata: {e}")))?;
        }
        debug!(packages = data.records.len(), "loaded system repo");
        self.repos.push(repo);
        self.invalidate_considered();
        Ok(())
    }

    /// Loads remote repository metadata. May block on I/O when a cache
    /// snapshot is written.
    pub fn load_repo(&mut self, mut repo: Repo, data: RepoData, flags: LoadFlags) -> Result<()> {
        let pool_id = self.pool.new_repo(repo.name());
        repo.pool_id = Some(pool_id);
        for record in &data.records {
            let record = if flags.load_filelists {
                record.clone()
            } else {
                let mut r = record.clone();
                r.files.clear();
                r
            };
            self.pool
                .add_solvable(pool_id, &record)
                .map_err(|e| Error::FileInvalid(format!("repo {}: {e}", repo.name())))?;
        }
        if flags.load_updateinfo {
            for advisory in &data.advisories {
                self.pool.add_advisory(advisory.clone());
            }
        }
        if flags.build_cache {
            self.write_cache(repo.name(), &data)?;
        }
        debug!(repo = repo.name(), packages = data.records.len(), "loaded repo");
        self.repos.push(repo);
        self.invalidate_considered();
        Ok(())
    }

    fn write_cache(&self, reponame: &str, data: &RepoData) -> Result<()> {
        let dir = self.cachedir.join(reponame);
        fs::create_dir_all(&dir)
            .map_err(|e| Error::FileInvalid(format!("{}: {e}", dir.display())))?;
        let path = dir.join("metadata.json");
        let payload = serde_json::to_vec(data)
            .map_err(|e| Error::InternalError(format!("cache serialization: {e}")))?;
        fs::write(&path, payload)
            .map_err(|e| Error::FileInvalid(format!("{}: {e}", path.display())))?;
        Ok(())
    }

    /// The loaded repositories.
    pub fn repos(&self) -> &[Repo] {
        &self.repos
    }

    /// Looks a repository up by name.
    pub fn repo(&self, name: &str) -> Option<&Repo> {
        self.repos.iter().find(|r| r.name() == name)
    }

    /// Enables or disables a repository; disabled repositories drop out
    /// of the considered set.
    pub fn repo_enabled(&mut self, name: &str, enabled: bool) {
        if let Some(repo) = self.repos.iter_mut().find(|r| r.name() == name) {
            if repo.enabled() != enabled {
                repo.set_enabled(enabled);
                self.invalidate_considered();
            }
        }
    }

    /// Marks packages that queries and the solver must pretend do not
    /// exist. Accumulative.
    pub fn add_excludes(&mut self, set: &PackageSet) {
        match &mut self.excludes {
            Some(existing) => existing.union_with(set),
            None => self.excludes = Some(set.clone()),
        }
        self.invalidate_considered();
    }

    /// Restricts the universe to the given packages. Accumulative.
    pub fn add_includes(&mut self, set: &PackageSet) {
        match &mut self.includes {
            Some(existing) => existing.union_with(set),
            None => self.includes = Some(set.clone()),
        }
        self.invalidate_considered();
    }

    fn invalidate_considered(&mut self) {
        self.considered.replace(None);
        self.running_kernel.replace(None);
    }

    /// Recomputes the considered bitmap when it is stale. Idempotent and
    /// lazy; queries and goals call this before evaluating.
    pub fn recompute_considered(&self) {
        let mut slot = self.considered.borrow_mut();
        if slot.is_some() {
            return;
        }
        let any_disabled = self.repos.iter().any(|r| !r.enabled());
        if self.excludes.is_none() && self.includes.is_none() && !any_disabled {
            *slot = Some(None);
            return;
        }
        let mut map: Map = self.pool.solvables().collect();
        if let Some(excludes) = &self.excludes {
            map.subtract(excludes.as_map());
        }
        if let Some(includes) = &self.includes {
            map.intersect_with(includes.as_map());
        }
        for repo in self.repos.iter().filter(|r| !r.enabled()) {
            if let Some(pool_id) = repo.pool_id {
                let repo_pkgs: Map = self
                    .pool
                    .solvables()
                    .filter(|&p| self.pool.solvable(p).repo == pool_id)
                    .collect();
                map.subtract(&repo_pkgs);
            }
        }
        *slot = Some(Some(map));
    }

    /// The considered bitmap, or `None` when every package counts.
    pub(crate) fn considered_map(&self) -> Option<Map> {
        self.recompute_considered();
        self.considered.borrow().as_ref().and_then(|m| m.clone())
    }

    /// Total order over EVR strings per the rpm comparison rules,
    /// rendered as `-1`/`0`/`1`.
    pub fn evr_cmp(&self, a: &str, b: &str) -> i32 {
        match evr_cmp(a, b) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    /// Cheap existence probe for a name (and optionally a version).
    pub fn knows(&self, name: &str, version: Option<&str>, flags: KnowsFlags) -> Knows {
        if name.is_empty() {
            return Knows::No;
        }
        let mut cmp = CmpFlags::EQ;
        if flags.glob {
            cmp = CmpFlags::GLOB;
        }
        if flags.icase {
            cmp = cmp | CmpFlags::ICASE;
        }
        let matcher = StrMatcher::new(name, cmp);

        let name_hit = self.pool.search(StringAttr::Name, &matcher).into_iter().any(|id| {
            version.map_or(true, |v| {
                let (_, candidate, _) = evr::split_evr(self.pool.evr_str(id));
                candidate == v
            })
        });
        if name_hit {
            return Knows::Name;
        }
        if !flags.name_only && version.is_none() {
            self.pool.make_provides_ready();
            let provider_hit = self.pool.solvables().any(|id| {
                self.pool
                    .solvable(id)
                    .deps(haversack_solve::DepKind::Provides)
                    .iter()
                    .any(|&dep| {
                        let spec = self.pool.reldep_spec(dep);
                        matcher.matches(&spec.name)
                    })
            });
            if provider_hit {
                return Knows::Provider;
            }
        }
        Knows::No
    }

    /// Convenience wrapper: all providers of a dependency as packages.
    pub fn providers(&self, spec: &ReldepSpec) -> Vec<Package<'_>> {
        self.pool
            .providers(spec)
            .into_iter()
            .map(|id| self.package(id))
            .collect()
    }

    /// The currently booted kernel package, when the sack knows the
    /// running release and a matching installed package provides
    /// `kernel`.
    pub fn running_kernel(&self) -> Option<SolvableId> {
        if let Some(cached) = *self.running_kernel.borrow() {
            return cached;
        }
        let result = self.find_running_kernel();
        self.running_kernel.replace(Some(result));
        result
    }

    fn find_running_kernel(&self) -> Option<SolvableId> {
        let release = self.running_kernel_release.as_deref()?;
        let kernel_dep = ReldepSpec::unversioned("kernel");
        self.pool
            .providers(&kernel_dep)
            .into_iter()
            .find(|&id| {
                if !self.pool.is_installed(id) {
                    return false;
                }
                let evr_str = self.pool.evr_str(id);
                let (_, version, rel) = evr::split_evr(evr_str);
                let vr = match rel {
                    Some(rel) => format!("{version}-{rel}"),
                    None => version.to_owned(),
                };
                vr == release
            })
    }
}
