use std::ops::{BitOr, BitOrAssign};

use haversack_solve::{
    DecisionKind, DepKind, Job, JobAction, JobQueue, JobTarget, SolvableId, Solver, SolverFlag,
    StepType, Transaction, TransactionMode,
};
use haversack_types::ReldepSpec;
use itertools::Itertools;
use tracing::debug;

use crate::errors::{Error, Result};
use crate::package::Package;
use crate::packageset::PackageSet;
use crate::query::{Keyname, Query};
use crate::repo::SYSTEM_REPO_NAME;
use crate::sack::Sack;
use crate::selector::Selector;

/// Action bits recording what was staged on a goal, also used as run
/// flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoalActions(u32);

impl GoalActions {
    /// An install was staged.
    pub const INSTALL: GoalActions = GoalActions(1 << 0);
    /// An erase was staged.
    pub const ERASE: GoalActions = GoalActions(1 << 1);
    /// An upgrade of a specific package was staged.
    pub const UPGRADE: GoalActions = GoalActions(1 << 2);
    /// A whole-system upgrade was staged.
    pub const UPGRADE_ALL: GoalActions = GoalActions(1 << 3);
    /// A distupgrade of a specific package was staged.
    pub const DISTUPGRADE: GoalActions = GoalActions(1 << 4);
    /// A whole-system distupgrade was staged.
    pub const DISTUPGRADE_ALL: GoalActions = GoalActions(1 << 5);
    /// A downgrade was staged.
    pub const DOWNGRADE: GoalActions = GoalActions(1 << 6);
    /// Run flag: verify and repair the installed state.
    pub const VERIFY: GoalActions = GoalActions(1 << 7);
    /// Run flag: unprotected installed packages may be removed.
    pub const ALLOW_UNINSTALL: GoalActions = GoalActions(1 << 8);
    /// Run flag: insist on the best candidate for every job.
    pub const FORCE_BEST: GoalActions = GoalActions(1 << 9);
    /// Run flag: ignore weak dependencies.
    pub const IGNORE_WEAK_DEPS: GoalActions = GoalActions(1 << 10);

    /// True when every bit of `other` is set.
    pub fn contains(self, other: GoalActions) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when any bit of `other` is set.
    pub fn intersects(self, other: GoalActions) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for GoalActions {
    type Output = GoalActions;

    fn bitor(self, rhs: GoalActions) -> GoalActions {
        GoalActions(self.0 | rhs.0)
    }
}

impl BitOrAssign for GoalActions {
    fn bitor_assign(&mut self, rhs: GoalActions) {
        self.0 |= rhs.0;
    }
}

/// Flags for [`Goal::erase_flags`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EraseFlags {
    /// Also erase dependencies that become unneeded.
    pub clean_deps: bool,
}

/// Flags for [`Goal::upgrade_to_flags`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpgradeFlags {
    /// Fail with `PackageNotFound` unless the name is installed.
    pub check_installed: bool,
}

/// Why a package ended up in the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// Explicitly requested by the user.
    User,
    /// Erased as an unneeded dependency.
    Clean,
    /// Pulled in by a weak dependency.
    WeakDep,
    /// Pulled in (or pushed out) by a hard dependency.
    Dep,
}

fn common_mode() -> TransactionMode {
    TransactionMode::SHOW_OBSOLETES | TransactionMode::CHANGE_IS_REINSTALL
}

fn full_mode() -> TransactionMode {
    common_mode() | TransactionMode::SHOW_ACTIVE | TransactionMode::SHOW_ALL
}

/// The staging area for user wishes and the engine that turns them into
/// a transaction: jobs are collected in order, translated to the solver,
/// and the solution is checked against the protected set and the
/// install-only limit before it becomes visible.
pub struct Goal<'s> {
    sack: &'s Sack,
    staging: JobQueue,
    protected: PackageSet,
    solver: Option<Solver<'s>>,
    trans: Option<Transaction>,
    removal_of_protected: Vec<SolvableId>,
    actions: GoalActions,
}

impl<'s> Goal<'s> {
    /// A fresh goal over `sack`.
    pub fn new(sack: &'s Sack) -> Goal<'s> {
        Goal {
            sack,
            staging: JobQueue::new(),
            protected: PackageSet::new(sack),
            solver: None,
            trans: None,
            removal_of_protected: Vec::new(),
            actions: GoalActions::default(),
        }
    }

    /// The sack the goal runs over.
    pub fn sack(&self) -> &'s Sack {
        self.sack
    }

    /// A copy carrying the staged jobs, protected set and action bits,
    /// but none of the solver state.
    pub fn clone_staging(&self) -> Goal<'s> {
        Goal {
            sack: self.sack,
            staging: self.staging.clone(),
            protected: self.protected.clone(),
            solver: None,
            trans: None,
            removal_of_protected: Vec::new(),
            actions: self.actions,
        }
    }

    /// True when any of the given action kinds were staged.
    pub fn has_actions(&self, actions: GoalActions) -> bool {
        self.actions.intersects(actions)
    }

    /// The number of staged jobs.
    pub fn req_length(&self) -> usize {
        self.staging.len()
    }

    /// Additional packages that must never be erased. The running kernel
    /// is always protected, with or without this call.
    pub fn add_protected(&mut self, set: &PackageSet) {
        self.protected.union_with(set);
    }

    /// Stages an install of a specific package.
    pub fn install(&mut self, pkg: &Package<'_>) {
        self.actions |= GoalActions::INSTALL;
        self.staging
            .push2(JobAction::INSTALL, JobTarget::Solvable(pkg.id()));
    }

    /// Stages an install the solver may silently skip.
    pub fn install_optional(&mut self, pkg: &Package<'_>) {
        self.actions |= GoalActions::INSTALL;
        self.staging.push2(
            JobAction::INSTALL | JobAction::WEAK,
            JobTarget::Solvable(pkg.id()),
        );
    }

    /// Stages an install through a selector.
    pub fn install_selector(&mut self, sltr: &Selector<'_>) -> Result<()> {
        self.actions |= GoalActions::INSTALL;
        self.push_selector_jobs(sltr, JobAction::INSTALL)
    }

    /// Stages an optional install through a selector.
    pub fn install_selector_optional(&mut self, sltr: &Selector<'_>) -> Result<()> {
        self.actions |= GoalActions::INSTALL;
        self.push_selector_jobs(sltr, JobAction::INSTALL | JobAction::WEAK)
    }

    /// Stages an erase of an installed package.
    pub fn erase(&mut self, pkg: &Package<'_>) {
        self.erase_flags(pkg, EraseFlags::default());
    }

    /// Stages an erase with flags.
    pub fn erase_flags(&mut self, pkg: &Package<'_>, flags: EraseFlags) {
        self.actions |= GoalActions::ERASE;
        let mut action = JobAction::ERASE;
        if flags.clean_deps {
            action = action | JobAction::CLEAN_DEPS;
        }
        self.staging.push2(action, JobTarget::Solvable(pkg.id()));
    }

    /// Stages an erase through a selector.
    pub fn erase_selector_flags(&mut self, sltr: &Selector<'_>, flags: EraseFlags) -> Result<()> {
        self.actions |= GoalActions::ERASE;
        let mut action = JobAction::ERASE;
        if flags.clean_deps {
            action = action | JobAction::CLEAN_DEPS;
        }
        self.push_selector_jobs(sltr, action)
    }

    /// Stages an upgrade of everything installed.
    pub fn upgrade_all(&mut self) {
        self.actions |= GoalActions::UPGRADE_ALL;
        self.staging.push2(JobAction::UPDATE, JobTarget::All);
    }

    /// Stages an upgrade to a specific available package.
    pub fn upgrade_to(&mut self, pkg: &Package<'_>) {
        self.actions |= GoalActions::UPGRADE;
        self.actions |= GoalActions::INSTALL;
        self.staging
            .push2(JobAction::INSTALL, JobTarget::Solvable(pkg.id()));
    }

    /// Stages an upgrade to a specific package, optionally insisting the
    /// name is already installed.
    pub fn upgrade_to_flags(&mut self, pkg: &Package<'_>, flags: UpgradeFlags) -> Result<()> {
        if flags.check_installed {
            let mut q = Query::new(self.sack);
            q.filter(Keyname::Name, haversack_types::CmpFlags::EQ, pkg.name())?;
            q.filter(
                Keyname::Reponame,
                haversack_types::CmpFlags::EQ,
                SYSTEM_REPO_NAME,
            )?;
            if q.count() == 0 {
                return Err(Error::PackageNotFound(pkg.name().to_owned()));
            }
        }
        self.upgrade_to(pkg);
        Ok(())
    }

    /// Stages an upgrade through a selector. A selector with an EVR axis
    /// turns into an install so the exact version can win.
    pub fn upgrade_to_selector(&mut self, sltr: &Selector<'_>) -> Result<()> {
        self.actions |= GoalActions::UPGRADE;
        if sltr.has_evr() {
            self.push_selector_jobs(sltr, JobAction::INSTALL)
        } else {
            self.push_selector_jobs(sltr, JobAction::UPDATE)
        }
    }

    /// Stages a downgrade to a specific older package.
    pub fn downgrade_to(&mut self, pkg: &Package<'_>) {
        self.actions |= GoalActions::DOWNGRADE;
        self.actions |= GoalActions::INSTALL;
        self.staging
            .push2(JobAction::INSTALL, JobTarget::Solvable(pkg.id()));
    }

    /// Stages a distupgrade of everything installed.
    pub fn distupgrade_all(&mut self) {
        self.actions |= GoalActions::DISTUPGRADE_ALL;
        self.staging.push2(JobAction::DISTUPGRADE, JobTarget::All);
    }

    /// Stages a distupgrade of a specific package.
    pub fn distupgrade(&mut self, pkg: &Package<'_>) {
        self.actions |= GoalActions::DISTUPGRADE;
        self.staging
            .push2(JobAction::DISTUPGRADE, JobTarget::Solvable(pkg.id()));
    }

    /// Stages a distupgrade through a selector.
    pub fn distupgrade_selector(&mut self, sltr: &Selector<'_>) -> Result<()> {
        self.actions |= GoalActions::DISTUPGRADE;
        self.push_selector_jobs(sltr, JobAction::DISTUPGRADE)
    }

    /// Records that the user explicitly wants this installed package;
    /// cleandeps and unneeded computations leave it alone.
    pub fn userinstalled(&mut self, pkg: &Package<'_>) {
        self.staging
            .push2(JobAction::USER_INSTALLED, JobTarget::Solvable(pkg.id()));
    }

    fn push_selector_jobs(&mut self, sltr: &Selector<'_>, action: JobAction) -> Result<()> {
        for job in sltr.to_jobs(action)? {
            self.staging.push(job);
        }
        Ok(())
    }

    /// Solves the staged jobs with default flags.
    pub fn run(&mut self) -> Result<()> {
        self.run_flags(GoalActions::default())
    }

    /// Solves the staged jobs.
    ///
    /// On failure the goal keeps the solver so problems stay
    /// describable, but discards any transaction.
    pub fn run_flags(&mut self, flags: GoalActions) -> Result<()> {
        let mut job = self.construct_job(flags);
        self.actions |= flags;
        self.solve(&mut job, flags)
    }

    fn construct_job(&mut self, flags: GoalActions) -> JobQueue {
        let mut job = self.staging.clone();

        if flags.contains(GoalActions::FORCE_BEST) {
            for j in job.iter_mut() {
                j.action |= JobAction::FORCE_BEST;
            }
        }

        // implicit obsoletes stay off for install-only names
        for name in self.sack.installonly() {
            job.push(Job::new(
                JobAction::MULTIVERSION,
                JobTarget::Provides(ReldepSpec::unversioned(name.clone())),
            ));
        }

        self.allow_uninstall_all_but_protected(&mut job, flags);

        if flags.contains(GoalActions::VERIFY) {
            job.push2(JobAction::VERIFY, JobTarget::All);
        }

        job
    }

    fn allow_uninstall_all_but_protected(&mut self, job: &mut JobQueue, flags: GoalActions) {
        if let Some(kernel) = self.sack.running_kernel() {
            self.protected.add_id(kernel);
        }
        if flags.contains(GoalActions::ALLOW_UNINSTALL) {
            let pool = self.sack.pool();
            for id in pool.solvables() {
                if pool.is_installed(id) && !self.protected.contains_id(id) {
                    job.push2(JobAction::ALLOW_UNINSTALL, JobTarget::Solvable(id));
                }
            }
        }
    }

    /// Solves like [`Goal::run_flags`], handing the candidate solution to
    /// `callback` before it becomes final. A callback returning `false`
    /// rejects the solution and the run fails with
    /// [`Error::NoSolution`]. Solution callbacks and install-only
    /// limiting are mutually exclusive; the limit pass is skipped here.
    pub fn run_all(
        &mut self,
        callback: &mut dyn FnMut(&Goal<'s>) -> bool,
        flags: GoalActions,
    ) -> Result<()> {
        let job = self.construct_job(flags);
        self.actions |= flags;

        self.prepare_solve();
        let mut solver = self.new_solver(flags);
        if solver.solve(&job).is_err() {
            self.solver = Some(solver);
            return Err(Error::NoSolution);
        }
        let trans = solver.create_transaction();
        self.solver = Some(solver);
        if self.protected_in_removals(&trans) {
            return Err(Error::RemovalOfProtectedPkg);
        }
        self.trans = Some(trans);
        if !callback(self) {
            self.trans = None;
            return Err(Error::NoSolution);
        }
        Ok(())
    }

    fn prepare_solve(&mut self) {
        self.sack.recompute_considered();
        self.sack.pool().make_provides_ready();
        self.trans = None;
        self.removal_of_protected.clear();
    }

    fn new_solver(&self, flags: GoalActions) -> Solver<'s> {
        let mut solver = Solver::new(self.sack.pool());
        solver.set_flag(SolverFlag::AllowVendorChange, true);
        solver.set_flag(SolverFlag::KeepOrphans, true);
        solver.set_flag(SolverFlag::BestObeyPolicy, true);
        solver.set_flag(SolverFlag::YumObsoletes, true);
        solver.set_flag(SolverFlag::UrpmReorder, true);
        if flags.contains(GoalActions::IGNORE_WEAK_DEPS) {
            solver.set_flag(SolverFlag::IgnoreRecommended, true);
        }
        if let Some(considered) = self.sack.considered_map() {
            solver.set_considered(considered);
        }
        solver
    }

    fn solve(&mut self, job: &mut JobQueue, flags: GoalActions) -> Result<()> {
        self.prepare_solve();
        let mut solver = self.new_solver(flags);

        if solver.solve(job).is_err() {
            self.solver = Some(solver);
            return Err(Error::NoSolution);
        }

        if self.limit_installonly_packages(&solver, job) {
            // the re-solve may erase non-installonly packages that
            // depend on a kernel about to go away
            self.allow_uninstall_all_but_protected(job, GoalActions::ALLOW_UNINSTALL);
            if solver.solve(job).is_err() {
                self.solver = Some(solver);
                return Err(Error::NoSolution);
            }
        }

        let trans = solver.create_transaction();
        self.solver = Some(solver);

        if self.protected_in_removals(&trans) {
            debug!("solution would remove protected packages");
            return Err(Error::RemovalOfProtectedPkg);
        }
        self.trans = Some(trans);
        Ok(())
    }

    fn protected_in_removals(&mut self, trans: &Transaction) -> bool {
        let pool = self.sack.pool();
        let protected = &self.protected;
        let removals: Vec<SolvableId> = trans
            .steps()
            .iter()
            .copied()
            .filter(|&p| {
                let t = trans.step_type(pool, p, common_mode());
                matches!(t, StepType::Erase | StepType::Obsoleted)
            })
            .filter(|&p| protected.contains_id(p))
            .collect();
        self.removal_of_protected = removals;
        !self.removal_of_protected.is_empty()
    }

    /// After the first solve, enforces the install-only limit: for every
    /// install-only name whose kept-or-installed providers exceed the
    /// limit, the newest ones (the running kernel always among them) are
    /// pinned and the rest queued for erasure. Returns true when a
    /// re-solve is required.
    fn limit_installonly_packages(&self, solver: &Solver<'_>, job: &mut JobQueue) -> bool {
        let limit = self.sack.installonly_limit();
        if limit == 0 {
            return false;
        }
        let pool = self.sack.pool();
        let kernel = self.sack.running_kernel();
        let mut reresolve = false;

        for name in self.sack.installonly() {
            let dep = ReldepSpec::unversioned(name.clone());
            let decided: Vec<SolvableId> = pool
                .providers(&dep)
                .into_iter()
                .filter(|&p| solver.decision_level(p) > 0)
                .collect();
            if decided.len() <= limit as usize {
                continue;
            }

            let kernel_ish = |p: SolvableId| {
                kernel == Some(p) || kernel.map(|k| can_depend_on(self.sack, p, k)).unwrap_or(false)
            };

            // one subqueue per provider name: kernel first, then newest
            for (_, group) in &decided
                .into_iter()
                .sorted_by_key(|&p| pool.solvable(p).name)
                .chunk_by(|&p| pool.solvable(p).name)
            {
                let ordered: Vec<SolvableId> = group
                    .sorted_by(|&a, &b| {
                        kernel_ish(b)
                            .cmp(&kernel_ish(a))
                            .then_with(|| {
                                pool.evrcmp_ids(pool.solvable(b).evr, pool.solvable(a).evr)
                            })
                            .then_with(|| a.cmp(&b))
                    })
                    .collect();
                if ordered.len() <= limit as usize {
                    continue;
                }
                reresolve = true;
                for (i, id) in ordered.into_iter().enumerate() {
                    let action = if i < limit as usize {
                        JobAction::INSTALL
                    } else {
                        JobAction::ERASE
                    };
                    job.push2(action, JobTarget::Solvable(id));
                }
            }
        }
        reresolve
    }

    /// The number of problems of the last failed solve, the synthetic
    /// protected-removal problem included.
    pub fn count_problems(&self) -> usize {
        let solver_problems = self.solver.as_ref().map(Solver::problem_count).unwrap_or(0);
        solver_problems + usize::from(!self.removal_of_protected.is_empty())
    }

    /// A human-readable description of problem `i`. Indices below the
    /// solver's problem count come from the solver; one past it is the
    /// synthetic protected-removal report.
    pub fn describe_problem(&self, i: usize) -> Option<String> {
        let solver = self.solver.as_ref()?;
        if i < solver.problem_count() {
            return solver.describe_problem(i);
        }
        if i < self.count_problems() {
            let names = self
                .removal_of_protected
                .iter()
                .map(|&p| self.sack.pool().name_str(p))
                .join(", ");
            return Some(format!(
                "The operation would result in removing the following protected packages: {names}"
            ));
        }
        None
    }

    fn trans(&self) -> Result<&Transaction> {
        match &self.trans {
            Some(trans) => Ok(trans),
            None if self.solver.is_none() => {
                Err(Error::InternalError("no solver in the goal".to_owned()))
            }
            None if !self.removal_of_protected.is_empty() => Err(Error::RemovalOfProtectedPkg),
            None => Err(Error::NoSolution),
        }
    }

    fn list_results(&self, first: StepType, second: Option<StepType>) -> Result<Vec<Package<'s>>> {
        let trans = self.trans()?;
        let pool = self.sack.pool();
        let mut out = Vec::new();
        for &p in trans.steps() {
            let t = match first {
                StepType::Obsoleted => trans.step_type(pool, p, common_mode()),
                _ => trans.step_type(pool, p, full_mode()),
            };
            if t == first || second == Some(t) {
                out.push(self.sack.package(p));
            }
        }
        Ok(out)
    }

    /// Packages the transaction newly installs.
    pub fn list_installs(&self) -> Result<Vec<Package<'s>>> {
        self.list_results(StepType::Install, Some(StepType::Obsoletes))
    }

    /// Packages the transaction erases.
    pub fn list_erasures(&self) -> Result<Vec<Package<'s>>> {
        self.list_results(StepType::Erase, None)
    }

    /// Installed packages displaced by differently named incomers.
    pub fn list_obsoleted(&self) -> Result<Vec<Package<'s>>> {
        self.list_results(StepType::Obsoleted, None)
    }

    /// Packages reinstalled at the same EVR.
    pub fn list_reinstalls(&self) -> Result<Vec<Package<'s>>> {
        self.list_results(StepType::Reinstall, None)
    }

    /// Incoming packages that upgrade an installed one.
    pub fn list_upgrades(&self) -> Result<Vec<Package<'s>>> {
        self.list_results(StepType::Upgrade, None)
    }

    /// Incoming packages that downgrade an installed one.
    pub fn list_downgrades(&self) -> Result<Vec<Package<'s>>> {
        self.list_results(StepType::Downgrade, None)
    }

    /// Installed packages nothing needs anymore.
    pub fn list_unneeded(&self) -> Result<Vec<Package<'s>>> {
        let solver = self
            .solver
            .as_ref()
            .ok_or_else(|| Error::InternalError("no solver in the goal".to_owned()))?;
        Ok(solver.unneeded().into_iter().map(|id| self.sack.package(id)).collect())
    }

    /// The installed packages the incoming `pkg` displaces.
    pub fn list_obsoleted_by_package(&self, pkg: &Package<'_>) -> Vec<Package<'s>> {
        match &self.trans {
            Some(trans) => trans
                .obs_pkgs(pkg.id())
                .iter()
                .map(|&id| self.sack.package(id))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Why `pkg` ended up in the solution.
    pub fn reason(&self, pkg: &Package<'_>) -> Reason {
        let kind = self
            .solver
            .as_ref()
            .and_then(|s| s.decision_kind(pkg.id()));
        match kind {
            Some(DecisionKind::Job) => Reason::User,
            Some(DecisionKind::CleandepsErase) => Reason::Clean,
            Some(DecisionKind::WeakDep) => Reason::WeakDep,
            _ => Reason::Dep,
        }
    }
}

/// True when any of `a`'s requires can be satisfied by `b`.
fn can_depend_on(sack: &Sack, a: SolvableId, b: SolvableId) -> bool {
    let pool = sack.pool();
    pool.solvable(a)
        .deps(DepKind::Requires)
        .iter()
        .any(|&req| {
            let spec = pool.reldep_spec(req);
            pool.providers(&spec).contains(&b)
        })
}
