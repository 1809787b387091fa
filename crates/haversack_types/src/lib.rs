#![deny(missing_docs)]

//! `haversack_types` contains the value types used throughout the haversack
//! workspace: EVR strings and their total order, NEVRA forms and the
//! free-form subject grammar, and relational dependency expressions.
//!
//! Everything in this crate is plain data; nothing here touches a pool,
//! a repository or the filesystem.

pub mod evr;
mod nevra;
mod reldep;

pub use evr::{evr_cmp, evr_cmp_promote, split_evr, vercmp};
pub use nevra::{Nevra, NevraForm, ParseNevraError};
pub use reldep::{CmpFlags, ParseReldepError, ReldepSpec};
