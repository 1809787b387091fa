#![deny(missing_docs)]

//! `haversack_solve` holds the package universe and resolves dependency
//! jobs against it.
//!
//! The [`Pool`] stores interned strings, dependency expressions and
//! solvables together with a lazily built provides index. A [`Solver`]
//! consumes a [`JobQueue`] of `(action, operand)` pairs and produces a
//! [`Transaction`]: an ordered list of solvable steps, each typed as an
//! install, erase, upgrade, downgrade, reinstall or obsoletion. When no
//! consistent assignment exists, the solver retains a list of
//! [`Problem`]s that render as human-readable strings.
//!
//! The resolution strategy is a deterministic policy walk (best candidate
//! first, dependency closure, explicit permission needed to remove
//! installed packages) rather than a full SAT search; the job-queue
//! contract is the same one a SAT-backed implementation would honour.

mod arena;
mod id;
mod jobs;
mod map;
mod matcher;
mod pool;
mod problem;
mod solvable;
mod solver;
mod transaction;

pub use id::{ReldepId, RepoId, SolvableId, StringId};
pub use jobs::{Job, JobAction, JobQueue, JobTarget};
pub use map::Map;
pub use matcher::StrMatcher;
pub use pool::{Advisory, Pool, StringAttr};
pub use problem::Problem;
pub use solvable::{DepKind, Reldep, Solvable, SolvableRecord};
pub use solver::{DecisionKind, Solver, SolverFlag, Unsolvable};
pub use transaction::{StepType, Transaction, TransactionMode};
