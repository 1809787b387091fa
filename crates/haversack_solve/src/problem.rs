use std::fmt::{self, Display, Formatter};

/// A single reason why the solver could not satisfy the job queue. The
/// `Display` rendering is the string handed back to callers asking for a
/// problem description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// A dependency has no remaining provider.
    NothingProvides {
        /// The unsatisfied dependency.
        dep: String,
        /// The package that required it, when the dependency came from a
        /// package rather than straight from a job.
        required_by: Option<String>,
    },
    /// An install job matched no candidate at all.
    NoMatch {
        /// The operand of the failed job.
        job: String,
    },
    /// Two packages cannot be installed together.
    Conflict {
        /// The package being brought in.
        package: String,
        /// The dependency expression it conflicts over.
        dep: String,
        /// The package already present.
        other: String,
    },
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Problem::NothingProvides {
                dep,
                required_by: Some(pkg),
            } => {
                write!(f, "nothing provides {dep} needed by {pkg}")
            }
            Problem::NothingProvides {
                dep,
                required_by: None,
            } => {
                write!(f, "nothing provides requested {dep}")
            }
            Problem::NoMatch { job } => write!(f, "no package matches {job}"),
            Problem::Conflict {
                package,
                dep,
                other,
            } => {
                write!(f, "package {package} conflicts with {dep} provided by {other}")
            }
        }
    }
}
