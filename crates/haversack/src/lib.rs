#![deny(missing_docs)]

//! `haversack` is a package management library for RPM-based systems.
//!
//! Host code builds a [`Sack`] (the package universe: the installed
//! system plus remote repository metadata), narrows it down with
//! [`Query`] pipelines, wraps what it found in [`Selector`]s or passes
//! [`Package`]s directly, stages wishes on a [`Goal`], and hands the
//! solved goal to a [`transaction::TransactionDriver`] to make it real.
//!
//! ```no_run
//! use haversack::{Goal, Keyname, Query, Sack};
//! use haversack_types::CmpFlags;
//!
//! # fn main() -> Result<(), haversack::Error> {
//! let sack = Sack::builder().arch("x86_64").build()?;
//! let mut query = Query::new(&sack);
//! query.filter(Keyname::Name, CmpFlags::EQ, "walrus")?;
//! query.filter_latest_per_arch(true);
//!
//! let mut goal = Goal::new(&sack);
//! for pkg in query.run() {
//!     goal.install(&pkg);
//! }
//! goal.run()?;
//! # Ok(())
//! # }
//! ```

mod arch;
mod errors;
mod goal;
mod package;
mod packageset;
mod query;
mod repo;
mod sack;
mod selector;
mod subject;
pub mod transaction;

pub use errors::{Error, Result};
pub use goal::{EraseFlags, Goal, GoalActions, Reason, UpgradeFlags};
pub use package::Package;
pub use packageset::PackageSet;
pub use query::{Keyname, Query, QueryFlags};
pub use repo::{LoadFlags, Repo, RepoData, CMDLINE_REPO_NAME, SYSTEM_REPO_NAME};
pub use sack::{Knows, KnowsFlags, Sack, SackBuilder};
pub use selector::Selector;
pub use subject::{Subject, SubjectFlags};
