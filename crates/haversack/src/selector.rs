use haversack_solve::{Job, JobAction, JobTarget, StrMatcher, StringAttr};
use haversack_types::{CmpFlags, ReldepSpec};

use crate::arch;
use crate::errors::{Error, Result};
use crate::query::Keyname;
use crate::sack::Sack;

#[derive(Debug, Clone)]
struct AxisFilter {
    cmp: CmpFlags,
    value: String,
}

/// A narrow filter bundle addressing one logical package family for the
/// solver: at most one filter per axis among name, provides, file, arch,
/// evr and reponame. At least one of name/provides/file must be set for
/// the selector to translate into jobs.
#[derive(Clone)]
pub struct Selector<'s> {
    sack: &'s Sack,
    name: Option<AxisFilter>,
    provides: Option<AxisFilter>,
    file: Option<AxisFilter>,
    arch: Option<AxisFilter>,
    evr: Option<AxisFilter>,
    version_only: bool,
    reponame: Option<AxisFilter>,
}

impl<'s> Selector<'s> {
    /// An empty selector over `sack`.
    pub fn new(sack: &'s Sack) -> Selector<'s> {
        Selector {
            sack,
            name: None,
            provides: None,
            file: None,
            arch: None,
            evr: None,
            version_only: false,
            reponame: None,
        }
    }

    /// Sets one axis. Only `EQ` (everywhere) and `GLOB` (name, provides,
    /// file) comparisons are accepted; setting an axis twice replaces it.
    pub fn set(&mut self, keyname: Keyname, cmp: CmpFlags, value: &str) -> Result<()> {
        let plain = cmp.without_modifiers();
        let axis = AxisFilter {
            cmp,
            value: value.to_owned(),
        };
        match keyname {
            Keyname::Name if matches!(plain, CmpFlags::EQ | CmpFlags::GLOB) => {
                self.name = Some(axis);
            }
            Keyname::Provides if matches!(plain, CmpFlags::EQ | CmpFlags::GLOB) => {
                self.provides = Some(axis);
            }
            Keyname::File if matches!(plain, CmpFlags::EQ | CmpFlags::GLOB) => {
                self.file = Some(axis);
            }
            Keyname::Arch if plain == CmpFlags::EQ => self.arch = Some(axis),
            Keyname::Evr if plain == CmpFlags::EQ => {
                self.version_only = false;
                self.evr = Some(axis);
            }
            Keyname::Version if plain == CmpFlags::EQ => {
                self.version_only = true;
                self.evr = Some(axis);
            }
            Keyname::Reponame if plain == CmpFlags::EQ => self.reponame = Some(axis),
            _ => {
                return Err(Error::BadSelector(format!(
                    "axis {keyname:?} does not accept comparison {cmp:?}"
                )))
            }
        }
        Ok(())
    }

    pub(crate) fn has_evr(&self) -> bool {
        self.evr.is_some()
    }

    /// Translates the selector into solver jobs carrying `action`.
    ///
    /// The name (or provides, or file) axis produces the base selection;
    /// arch, evr and reponame narrow each produced job. A selector with
    /// only narrowing axes is invalid.
    pub fn to_jobs(&self, action: JobAction) -> Result<Vec<Job>> {
        let any_required = self.name.is_some() || self.provides.is_some() || self.file.is_some();
        if !any_required {
            if self.arch.is_some() || self.evr.is_some() || self.reponame.is_some() {
                return Err(Error::BadSelector(
                    "selector needs a name, provides or file axis".to_owned(),
                ));
            }
            return Ok(Vec::new());
        }

        self.sack.recompute_considered();
        let pool = self.sack.pool();
        pool.make_provides_ready();

        let mut jobs: Vec<Job> = Vec::new();

        if let Some(name) = &self.name {
            if name.cmp.without_modifiers() == CmpFlags::GLOB {
                let matcher = StrMatcher::new(&name.value, name.cmp.without_not());
                for id in pool.names_matching(&matcher) {
                    let target = JobTarget::Name(pool.id2str(id).to_owned());
                    if !jobs.iter().any(|j| j.target == target) {
                        jobs.push(Job::new(action, target));
                    }
                }
            } else if pool.str2id(&name.value).is_some() {
                jobs.push(Job::new(action, JobTarget::Name(name.value.clone())));
            }
        }

        if let Some(file) = &self.file {
            if file.cmp.without_modifiers() == CmpFlags::GLOB {
                let matcher = StrMatcher::new(&file.value, file.cmp.without_not());
                let mut paths: Vec<String> = pool
                    .search(StringAttr::Filelist, &matcher)
                    .into_iter()
                    .flat_map(|id| {
                        pool.solvable(id)
                            .files()
                            .iter()
                            .filter(|f| matcher.matches(f))
                            .cloned()
                            .collect::<Vec<_>>()
                    })
                    .collect();
                paths.sort();
                paths.dedup();
                for path in paths {
                    jobs.push(Job::new(
                        action,
                        JobTarget::Provides(ReldepSpec::unversioned(path)),
                    ));
                }
            } else {
                jobs.push(Job::new(
                    action,
                    JobTarget::Provides(ReldepSpec::unversioned(file.value.clone())),
                ));
            }
        }

        if let Some(provides) = &self.provides {
            if provides.cmp.without_modifiers() == CmpFlags::GLOB {
                let matcher = StrMatcher::new(&provides.value, provides.cmp.without_not());
                let mut names: Vec<String> = Vec::new();
                for id in pool.solvables() {
                    for &dep in pool.solvable(id).deps(haversack_solve::DepKind::Provides) {
                        let spec = pool.reldep_spec(dep);
                        if matcher.matches(&spec.name) {
                            names.push(spec.name);
                        }
                    }
                }
                names.sort();
                names.dedup();
                for name in names {
                    jobs.push(Job::new(
                        action,
                        JobTarget::Provides(ReldepSpec::unversioned(name)),
                    ));
                }
            } else {
                let spec: ReldepSpec = provides
                    .value
                    .parse()
                    .map_err(|e| Error::BadSelector(format!("provides axis: {e}")))?;
                jobs.push(Job::new(action, JobTarget::Provides(spec)));
            }
        }

        if let Some(axis) = &self.arch {
            if !arch::is_valid(&axis.value) {
                return Err(Error::InvalidArchitecture(axis.value.clone()));
            }
            for job in &mut jobs {
                job.arch = Some(axis.value.clone());
            }
        }

        if let Some(axis) = &self.evr {
            for job in &mut jobs {
                job.evr = Some(axis.value.clone());
                job.version_only = self.version_only;
            }
        }

        if let Some(axis) = &self.reponame {
            match pool.repo_by_name(&axis.value) {
                Some(repo) => {
                    for job in &mut jobs {
                        job.repo = Some(repo);
                    }
                }
                // an unknown repo narrows the selection to nothing
                None => jobs.clear(),
            }
        }

        Ok(jobs)
    }
}
