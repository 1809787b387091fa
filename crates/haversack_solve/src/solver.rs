use std::collections::VecDeque;
use std::fmt::{self, Display, Formatter};

use fxhash::{FxHashMap, FxHashSet};
use haversack_types::{evr_cmp, split_evr, vercmp};
use tracing::debug;

use crate::id::{SolvableId, StringId};
use crate::jobs::{Job, JobAction, JobQueue, JobTarget};
use crate::map::Map;
use crate::pool::Pool;
use crate::problem::Problem;
use crate::solvable::DepKind;
use crate::transaction::{StepData, Transaction};

/// Behaviour switches set on the solver before solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverFlag {
    /// Do not lock packages to their vendor.
    AllowVendorChange,
    /// Keep installed packages that no repository carries anymore.
    KeepOrphans,
    /// The best candidate may not change architecture.
    BestObeyPolicy,
    /// Support package splits through obsoletes.
    YumObsoletes,
    /// Reorder the solution the way urpm would.
    UrpmReorder,
    /// Ignore weak dependencies entirely.
    IgnoreRecommended,
    /// Installed packages may be removed to satisfy the jobs.
    AllowUninstall,
    /// Installed packages may be replaced by older candidates.
    AllowDowngrade,
}

/// Marker error: the job queue has no solution. The details stay on the
/// solver as [`Problem`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unsolvable;

impl Display for Unsolvable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("no solution possible")
    }
}

impl std::error::Error for Unsolvable {}

/// Why the solver decided a package in or out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionKind {
    /// Installed and left alone.
    Keep,
    /// Directly requested by a job.
    Job,
    /// Pulled in (or pushed out) to satisfy a hard dependency.
    Dep,
    /// Pulled in to satisfy a weak dependency.
    WeakDep,
    /// Chosen as the newer candidate of an update job.
    Update,
    /// Displaced by an incoming package.
    Displaced,
    /// Erased because nothing needs it anymore.
    CleandepsErase,
}

#[derive(Debug, Clone, Copy)]
struct Decision {
    level: i32,
    kind: DecisionKind,
}

/// Resolves a [`JobQueue`] against a [`Pool`].
///
/// The solver decides, package by package, what stays, what goes and what
/// comes in, walking job order first and dependency closure second. All
/// candidate choices are deterministic: highest EVR first, lowest id as
/// the tie break.
pub struct Solver<'pool> {
    pool: &'pool Pool,
    considered: Option<Map>,
    flags: FxHashSet<SolverFlag>,
    decisions: FxHashMap<SolvableId, Decision>,
    order: Vec<SolvableId>,
    replaces: FxHashMap<SolvableId, Vec<SolvableId>>,
    erased_by: FxHashMap<SolvableId, SolvableId>,
    userinstalled: FxHashSet<SolvableId>,
    problems: Vec<Problem>,
    next_level: i32,
}

impl<'pool> Solver<'pool> {
    /// Creates a solver over `pool`.
    pub fn new(pool: &'pool Pool) -> Solver<'pool> {
        Solver {
            pool,
            considered: None,
            flags: FxHashSet::default(),
            decisions: FxHashMap::default(),
            order: Vec::new(),
            replaces: FxHashMap::default(),
            erased_by: FxHashMap::default(),
            userinstalled: FxHashSet::default(),
            problems: Vec::new(),
            next_level: 1,
        }
    }

    /// Restricts available candidates to the given set. Installed
    /// packages are always considered.
    pub fn set_considered(&mut self, considered: Map) {
        self.considered = Some(considered);
    }

    /// Flips a behaviour switch.
    pub fn set_flag(&mut self, flag: SolverFlag, value: bool) {
        if value {
            self.flags.insert(flag);
        } else {
            self.flags.remove(&flag);
        }
    }

    fn has_flag(&self, flag: SolverFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// The number of recorded problems.
    pub fn problem_count(&self) -> usize {
        self.problems.len()
    }

    /// The problems of the last solve.
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Renders problem `i`, if it exists.
    pub fn describe_problem(&self, i: usize) -> Option<String> {
        self.problems.get(i).map(Problem::to_string)
    }

    /// The decision level of a solvable: positive when it is kept or
    /// installed, negative when it leaves the system, zero when the
    /// solver did not touch it.
    pub fn decision_level(&self, id: SolvableId) -> i32 {
        self.decisions.get(&id).map(|d| d.level).unwrap_or(0)
    }

    /// Why the solvable was decided, if it was.
    pub fn decision_kind(&self, id: SolvableId) -> Option<DecisionKind> {
        self.decisions.get(&id).map(|d| d.kind)
    }

    fn present(&self, id: SolvableId) -> bool {
        self.decision_level(id) > 0
    }

    fn considered_ok(&self, id: SolvableId) -> bool {
        self.pool.is_installed(id)
            || self
                .considered
                .as_ref()
                .map(|c| c.contains(id))
                .unwrap_or(true)
    }

    fn decide(&mut self, id: SolvableId, kind: DecisionKind, install: bool) {
        self.next_level += 1;
        let level = if install {
            self.next_level
        } else {
            -self.next_level
        };
        if self.decisions.insert(id, Decision { level, kind }).is_none() {
            self.order.push(id);
        } else if !self.order.contains(&id) {
            self.order.push(id);
        }
    }

    fn best_candidate(&self, mut candidates: Vec<SolvableId>) -> Option<SolvableId> {
        candidates.sort_by(|&a, &b| {
            self.pool
                .evrcmp_ids(self.pool.solvable(a).evr, self.pool.solvable(b).evr)
                .then_with(|| b.cmp(&a))
        });
        candidates.pop()
    }

    fn target_base(&self, job: &Job) -> Vec<SolvableId> {
        match &job.target {
            JobTarget::Solvable(id) => vec![*id],
            JobTarget::Name(name) => self.pool.solvables_by_name(name),
            JobTarget::Provides(spec) => self.pool.providers(spec),
            JobTarget::All => self.pool.solvables().collect(),
        }
    }

    fn constraints_ok(&self, job: &Job, p: SolvableId) -> bool {
        let s = self.pool.solvable(p);
        if let Some(arch) = &job.arch {
            if self.pool.id2str(s.arch) != arch {
                return false;
            }
        }
        if let Some(evr) = &job.evr {
            let candidate = self.pool.evr_str(p);
            if job.version_only {
                let (_, v, _) = split_evr(candidate);
                let (_, wanted, _) = split_evr(evr);
                if vercmp(v, wanted) != std::cmp::Ordering::Equal {
                    return false;
                }
            } else if evr_cmp(candidate, evr) != std::cmp::Ordering::Equal {
                return false;
            }
        }
        if let Some(repo) = job.repo {
            if s.repo != repo {
                return false;
            }
        }
        true
    }

    fn select(&self, job: &Job) -> Vec<SolvableId> {
        let explicit = matches!(job.target, JobTarget::Solvable(_));
        self.target_base(job)
            .into_iter()
            .filter(|&p| self.constraints_ok(job, p) && (explicit || self.considered_ok(p)))
            .collect()
    }

    fn describe_target(job: &Job) -> String {
        let mut out = match &job.target {
            JobTarget::Solvable(id) => format!("solvable #{}", id.as_u32()),
            JobTarget::Name(name) => name.clone(),
            JobTarget::Provides(spec) => spec.to_string(),
            JobTarget::All => "all packages".to_owned(),
        };
        if let Some(evr) = &job.evr {
            out.push_str(&format!(" = {evr}"));
        }
        if let Some(arch) = &job.arch {
            out.push_str(&format!(".{arch}"));
        }
        out
    }

    /// Resolves the job queue. On failure the solver keeps its problem
    /// list (and any partial decisions) for inspection.
    pub fn solve(&mut self, jobs: &JobQueue) -> Result<(), Unsolvable> {
        self.pool.make_provides_ready();
        self.decisions.clear();
        self.order.clear();
        self.replaces.clear();
        self.erased_by.clear();
        self.userinstalled.clear();
        self.problems.clear();
        self.next_level = 1;

        // bookkeeping jobs are gathered up front
        let mut multiversion: FxHashSet<StringId> = FxHashSet::default();
        let mut allow_uninstall_ids: FxHashSet<SolvableId> = FxHashSet::default();
        for job in jobs.iter() {
            if job.action.contains(JobAction::MULTIVERSION) {
                let name = match &job.target {
                    JobTarget::Name(name) => Some(name.as_str()),
                    JobTarget::Provides(spec) => Some(spec.name.as_str()),
                    _ => None,
                };
                if let Some(id) = name.and_then(|n| self.pool.str2id(n)) {
                    multiversion.insert(id);
                }
            }
            if job.action.contains(JobAction::ALLOW_UNINSTALL) {
                if let JobTarget::Solvable(id) = job.target {
                    allow_uninstall_ids.insert(id);
                }
            }
            if job.action.contains(JobAction::USER_INSTALLED) {
                if let JobTarget::Solvable(id) = job.target {
                    self.userinstalled.insert(id);
                }
            }
        }

        // everything installed starts out kept
        for p in self.pool.solvables() {
            if self.pool.is_installed(p) {
                self.decisions.insert(
                    p,
                    Decision {
                        level: 1,
                        kind: DecisionKind::Keep,
                    },
                );
            }
        }

        let mut worklist = VecDeque::new();
        let mut cleandeps = false;

        for job in jobs.iter() {
            let base = job.action.base();
            if base.contains(JobAction::INSTALL) {
                let candidates = self.select(job);
                if candidates.iter().any(|&p| self.pool.is_installed(p) && self.present(p)) {
                    continue;
                }
                let available: Vec<_> = candidates
                    .into_iter()
                    .filter(|&p| !self.pool.is_installed(p))
                    .collect();
                match self.best_candidate(available) {
                    Some(c) => self.install(c, DecisionKind::Job, &mut worklist),
                    None if job.action.contains(JobAction::WEAK) => {}
                    None => self.problems.push(Problem::NoMatch {
                        job: Self::describe_target(job),
                    }),
                }
            } else if base.contains(JobAction::ERASE) {
                let victims: Vec<_> = self
                    .select(job)
                    .into_iter()
                    .filter(|&p| self.pool.is_installed(p) && self.present(p))
                    .collect();
                for v in victims {
                    self.decide(v, DecisionKind::Job, false);
                    if job.action.contains(JobAction::CLEAN_DEPS) {
                        cleandeps = true;
                    }
                }
            } else if base.contains(JobAction::UPDATE) || base.contains(JobAction::DISTUPGRADE) {
                let any_direction = base.contains(JobAction::DISTUPGRADE);
                // the narrowing axes describe the update target, not the
                // installed package, so the scope comes from the bare
                // operand and the constraints gate the candidates
                let scope: Vec<_> = self
                    .target_base(job)
                    .into_iter()
                    .filter(|&p| self.pool.is_installed(p) && self.present(p))
                    .collect();
                for p in scope {
                    let name = self.pool.solvable(p).name;
                    let evr = self.pool.solvable(p).evr;
                    let candidates: Vec<_> = self
                        .pool
                        .solvables()
                        .filter(|&q| {
                            !self.pool.is_installed(q)
                                && self.considered_ok(q)
                                && self.constraints_ok(job, q)
                                && self.pool.solvable(q).name == name
                                && (any_direction
                                    || self.pool.evrcmp_ids(self.pool.solvable(q).evr, evr)
                                        == std::cmp::Ordering::Greater)
                        })
                        .collect();
                    if let Some(c) = self.best_candidate(candidates) {
                        if self.pool.solvable(c).evr != evr {
                            self.install(c, DecisionKind::Update, &mut worklist);
                        }
                    }
                }
            }
            // VERIFY and the bookkeeping actions change no state here
        }

        self.run_closure(&mut worklist, &multiversion, &allow_uninstall_ids);

        if cleandeps {
            self.erase_unneeded_deps(jobs);
        }

        if self.problems.is_empty() {
            Ok(())
        } else {
            debug!(problems = self.problems.len(), "solve failed");
            Err(Unsolvable)
        }
    }

    fn install(&mut self, id: SolvableId, kind: DecisionKind, worklist: &mut VecDeque<SolvableId>) {
        if self.present(id) {
            return;
        }
        self.decide(id, kind, true);
        self.replaces.entry(id).or_default();
        worklist.push_back(id);
    }

    fn displace(&mut self, old: SolvableId, new: SolvableId) {
        if !self.present(old) {
            return;
        }
        self.decide(old, DecisionKind::Displaced, false);
        self.replaces.entry(new).or_default().push(old);
        self.erased_by.insert(old, new);
    }

    fn satisfied_in_state(&self, dep: &haversack_types::ReldepSpec) -> bool {
        self.pool
            .providers(dep)
            .into_iter()
            .any(|q| self.present(q))
    }

    fn run_closure(
        &mut self,
        worklist: &mut VecDeque<SolvableId>,
        multiversion: &FxHashSet<StringId>,
        allow_uninstall_ids: &FxHashSet<SolvableId>,
    ) {
        while let Some(p) = worklist.pop_front() {
            let name = self.pool.solvable(p).name;

            // implicit same-name displacement, unless multiversion
            if !multiversion.contains(&name) {
                let displaced: Vec<_> = self
                    .pool
                    .solvables()
                    .filter(|&q| {
                        q != p
                            && self.pool.is_installed(q)
                            && self.present(q)
                            && self.pool.solvable(q).name == name
                    })
                    .collect();
                for q in displaced {
                    self.displace(q, p);
                }
            }

            // explicit obsoletes
            let obsoletes: Vec<_> = self.pool.solvable(p).deps(DepKind::Obsoletes).to_vec();
            for dep in obsoletes {
                let spec = self.pool.reldep_spec(dep);
                let victims: Vec<_> = self
                    .pool
                    .solvables()
                    .filter(|&q| {
                        q != p
                            && self.pool.is_installed(q)
                            && self.present(q)
                            && !multiversion.contains(&self.pool.solvable(q).name)
                            && if self.pool.obsolete_uses_provides() {
                                self.pool
                                    .solvable(q)
                                    .deps(DepKind::Provides)
                                    .iter()
                                    .any(|&prov| self.pool.dep_matches(&spec, prov))
                            } else {
                                self.pool.match_nevr(q, &spec)
                            }
                    })
                    .collect();
                for q in victims {
                    self.displace(q, p);
                }
            }

            // hard requirements
            let requires: Vec<_> = self.pool.solvable(p).deps(DepKind::Requires).to_vec();
            for dep in requires {
                let spec = self.pool.reldep_spec(dep);
                if spec.name.starts_with("rpmlib(") {
                    continue;
                }
                if self.satisfied_in_state(&spec) {
                    continue;
                }
                let candidates: Vec<_> = self
                    .pool
                    .providers(&spec)
                    .into_iter()
                    .filter(|&q| !self.pool.is_installed(q) && self.considered_ok(q) && !self.present(q))
                    .filter(|&q| self.decision_level(q) >= 0)
                    .collect();
                match self.best_candidate(candidates) {
                    Some(c) => self.install(c, DecisionKind::Dep, worklist),
                    None => self.problems.push(Problem::NothingProvides {
                        dep: spec.to_string(),
                        required_by: Some(self.pool.nevra(p)),
                    }),
                }
            }

            // weak requirements never produce problems
            if !self.has_flag(SolverFlag::IgnoreRecommended) {
                let recommends: Vec<_> = self.pool.solvable(p).deps(DepKind::Recommends).to_vec();
                for dep in recommends {
                    let spec = self.pool.reldep_spec(dep);
                    if self.satisfied_in_state(&spec) {
                        continue;
                    }
                    let candidates: Vec<_> = self
                        .pool
                        .providers(&spec)
                        .into_iter()
                        .filter(|&q| {
                            !self.pool.is_installed(q)
                                && self.considered_ok(q)
                                && self.decision_level(q) == 0
                        })
                        .collect();
                    if let Some(c) = self.best_candidate(candidates) {
                        self.install(c, DecisionKind::WeakDep, worklist);
                    }
                }
            }

            // conflicts in both directions
            let conflicts: Vec<_> = self.pool.solvable(p).deps(DepKind::Conflicts).to_vec();
            for dep in conflicts {
                let spec = self.pool.reldep_spec(dep);
                let others: Vec<_> = self
                    .pool
                    .providers(&spec)
                    .into_iter()
                    .filter(|&q| q != p && self.present(q))
                    .collect();
                for q in others {
                    self.resolve_conflict(p, q, &spec, allow_uninstall_ids);
                }
            }
            let reverse: Vec<_> = self
                .pool
                .solvables()
                .filter(|&q| q != p && self.present(q))
                .collect();
            for q in reverse {
                let deps: Vec<_> = self.pool.solvable(q).deps(DepKind::Conflicts).to_vec();
                for dep in deps {
                    let spec = self.pool.reldep_spec(dep);
                    let hits = self
                        .pool
                        .solvable(p)
                        .deps(DepKind::Provides)
                        .iter()
                        .any(|&prov| self.pool.dep_matches(&spec, prov));
                    if hits {
                        self.resolve_conflict(q, p, &spec, allow_uninstall_ids);
                    }
                }
            }
        }
    }

    fn resolve_conflict(
        &mut self,
        package: SolvableId,
        other: SolvableId,
        spec: &haversack_types::ReldepSpec,
        allow_uninstall_ids: &FxHashSet<SolvableId>,
    ) {
        let removable = self.pool.is_installed(other)
            && (self.has_flag(SolverFlag::AllowUninstall) || allow_uninstall_ids.contains(&other));
        if removable {
            self.decide(other, DecisionKind::Dep, false);
        } else {
            self.problems.push(Problem::Conflict {
                package: self.pool.nevra(package),
                dep: spec.to_string(),
                other: self.pool.nevra(other),
            });
        }
    }

    /// Erases installed packages that only the erased packages needed.
    fn erase_unneeded_deps(&mut self, jobs: &JobQueue) {
        let job_targets: FxHashSet<SolvableId> = jobs
            .iter()
            .filter_map(|j| match j.target {
                JobTarget::Solvable(id) => Some(id),
                _ => None,
            })
            .collect();
        loop {
            let mut doomed = Vec::new();
            for r in self.pool.solvables() {
                if !self.pool.is_installed(r) || !self.present(r) {
                    continue;
                }
                if self.userinstalled.contains(&r) || job_targets.contains(&r) {
                    continue;
                }
                let provides: Vec<_> = self.pool.solvable(r).deps(DepKind::Provides).to_vec();
                let required_by = |q: SolvableId| {
                    self.pool
                        .solvable(q)
                        .deps(DepKind::Requires)
                        .iter()
                        .any(|&req| {
                            let spec = self.pool.reldep_spec(req);
                            provides.iter().any(|&prov| self.pool.dep_matches(&spec, prov))
                        })
                };
                let was_dep_of_erased = self
                    .decisions
                    .iter()
                    .filter(|(_, d)| d.level < 0)
                    .any(|(&q, _)| required_by(q));
                if !was_dep_of_erased {
                    continue;
                }
                let still_needed = self
                    .pool
                    .solvables()
                    .filter(|&q| q != r && self.present(q))
                    .any(|q| required_by(q));
                if !still_needed {
                    doomed.push(r);
                }
            }
            if doomed.is_empty() {
                break;
            }
            for r in doomed {
                self.decide(r, DecisionKind::CleandepsErase, false);
            }
        }
    }

    /// Installed packages nothing else needs; candidates for autoremoval.
    pub fn unneeded(&self) -> Vec<SolvableId> {
        self.pool
            .solvables()
            .filter(|&r| {
                if !self.pool.is_installed(r) || !self.present(r) {
                    return false;
                }
                if self.userinstalled.contains(&r) {
                    return false;
                }
                let provides = self.pool.solvable(r).deps(DepKind::Provides);
                !self
                    .pool
                    .solvables()
                    .filter(|&q| q != r && self.present(q))
                    .any(|q| {
                        self.pool
                            .solvable(q)
                            .deps(DepKind::Requires)
                            .iter()
                            .any(|&req| {
                                let spec = self.pool.reldep_spec(req);
                                provides.iter().any(|&prov| self.pool.dep_matches(&spec, prov))
                            })
                    })
            })
            .collect()
    }

    /// Materialises the decisions into an ordered transaction.
    pub fn create_transaction(&self) -> Transaction {
        let mut transaction = Transaction::default();
        for &id in &self.order {
            let Some(decision) = self.decisions.get(&id) else {
                continue;
            };
            if decision.kind == DecisionKind::Keep {
                continue;
            }
            if decision.level > 0 {
                transaction.data.insert(
                    id,
                    StepData::Install {
                        replaces: self.replaces.get(&id).cloned().unwrap_or_default(),
                    },
                );
            } else {
                transaction.data.insert(
                    id,
                    StepData::Erase {
                        replaced_by: self.erased_by.get(&id).copied(),
                    },
                );
            }
            transaction.steps.push(id);
        }
        transaction
    }
}
