use std::ops::{BitAnd, BitOr, BitOrAssign};

use haversack_types::ReldepSpec;

use crate::id::{RepoId, SolvableId};

/// Action and modifier bits of one job queue element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct JobAction(u32);

impl JobAction {
    /// Install the best matching candidate.
    pub const INSTALL: JobAction = JobAction(1 << 0);
    /// Erase the matching installed packages.
    pub const ERASE: JobAction = JobAction(1 << 1);
    /// Bring matching installed packages to the best newer candidate.
    pub const UPDATE: JobAction = JobAction(1 << 2);
    /// Like update, but version direction is ignored.
    pub const DISTUPGRADE: JobAction = JobAction(1 << 3);
    /// Re-pin the current state; no package changes requested.
    pub const VERIFY: JobAction = JobAction(1 << 4);
    /// Allow multiple concurrently installed versions of the operand,
    /// turning off the implicit same-name obsoletion.
    pub const MULTIVERSION: JobAction = JobAction(1 << 5);
    /// Give the solver permission to remove the operand if needed.
    pub const ALLOW_UNINSTALL: JobAction = JobAction(1 << 6);
    /// Mark the operand as installed on explicit user request.
    pub const USER_INSTALLED: JobAction = JobAction(1 << 7);

    /// The job is a wish, not a requirement; it fails silently.
    pub const WEAK: JobAction = JobAction(1 << 8);
    /// On erase, also drop dependencies that become unneeded.
    pub const CLEAN_DEPS: JobAction = JobAction(1 << 9);
    /// Insist on the best candidate instead of failing over.
    pub const FORCE_BEST: JobAction = JobAction(1 << 10);

    /// True when every bit of `other` is set.
    pub fn contains(self, other: JobAction) -> bool {
        self.0 & other.0 == other.0
    }

    /// The action bit with all modifiers masked off.
    pub fn base(self) -> JobAction {
        JobAction(self.0 & 0xff)
    }
}

impl BitOr for JobAction {
    type Output = JobAction;

    fn bitor(self, rhs: JobAction) -> JobAction {
        JobAction(self.0 | rhs.0)
    }
}

impl BitOrAssign for JobAction {
    fn bitor_assign(&mut self, rhs: JobAction) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for JobAction {
    type Output = JobAction;

    fn bitand(self, rhs: JobAction) -> JobAction {
        JobAction(self.0 & rhs.0)
    }
}

/// What a job operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTarget {
    /// A single solvable.
    Solvable(SolvableId),
    /// Every solvable carrying this package name.
    Name(String),
    /// Every solvable providing this capability.
    Provides(ReldepSpec),
    /// Every package solvable.
    All,
}

/// One element of the job queue: an action, an operand, and the optional
/// arch/evr/repo narrowing set by the selector translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Action and modifier flags.
    pub action: JobAction,
    /// The operand.
    pub target: JobTarget,
    /// Restrict candidates to this architecture.
    pub arch: Option<String>,
    /// Restrict candidates to this EVR (or bare version, see
    /// [`Job::version_only`]).
    pub evr: Option<String>,
    /// When set, [`Job::evr`] compares against the version part only.
    pub version_only: bool,
    /// Restrict candidates to this repository.
    pub repo: Option<RepoId>,
}

impl Job {
    /// A job with no narrowing.
    pub fn new(action: JobAction, target: JobTarget) -> Job {
        Job {
            action,
            target,
            arch: None,
            evr: None,
            version_only: false,
            repo: None,
        }
    }
}

/// An ordered queue of jobs; insertion order is preserved when the queue
/// is handed to the solver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobQueue {
    jobs: Vec<Job>,
}

impl JobQueue {
    /// An empty queue.
    pub fn new() -> JobQueue {
        JobQueue::default()
    }

    /// Appends a job.
    pub fn push(&mut self, job: Job) {
        self.jobs.push(job);
    }

    /// Appends an un-narrowed `(action, target)` pair.
    pub fn push2(&mut self, action: JobAction, target: JobTarget) {
        self.push(Job::new(action, target));
    }

    /// The number of queued jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Iterates the queue in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    /// Mutable iteration, used to mix flags into staged jobs.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.iter_mut()
    }

    /// True when an equal `(action, target)` pair is already queued.
    pub fn has(&self, action: JobAction, target: &JobTarget) -> bool {
        self.jobs
            .iter()
            .any(|j| j.action == action && j.target == *target)
    }
}
