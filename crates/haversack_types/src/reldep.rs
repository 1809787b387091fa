use std::fmt::{self, Display, Formatter};
use std::ops::{BitAnd, BitOr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Comparison flags shared by dependency expressions and query filters.
///
/// `EQ`, `GT` and `LT` combine into ranges (`GT | EQ` is `>=`); the
/// remaining bits select a match style and only make sense on query
/// filters, never on a dependency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CmpFlags(u32);

impl CmpFlags {
    /// Equality.
    pub const EQ: CmpFlags = CmpFlags(1 << 0);
    /// Greater-than.
    pub const GT: CmpFlags = CmpFlags(1 << 1);
    /// Less-than.
    pub const LT: CmpFlags = CmpFlags(1 << 2);
    /// Substring match.
    pub const SUBSTR: CmpFlags = CmpFlags(1 << 3);
    /// fnmatch-style glob match.
    pub const GLOB: CmpFlags = CmpFlags(1 << 4);
    /// Case-insensitive matching; modifies the other bits.
    pub const ICASE: CmpFlags = CmpFlags(1 << 5);
    /// Negation; always applied at evaluation time.
    pub const NOT: CmpFlags = CmpFlags(1 << 6);
    /// Inequality, the negated form of [`CmpFlags::EQ`].
    pub const NEQ: CmpFlags = CmpFlags(1 << 6 | 1 << 0);

    /// `>=`.
    pub const GTE: CmpFlags = CmpFlags(1 << 1 | 1 << 0);
    /// `<=`.
    pub const LTE: CmpFlags = CmpFlags(1 << 2 | 1 << 0);

    const MODIFIERS: CmpFlags = CmpFlags(1 << 5 | 1 << 6);

    /// Returns true when every bit of `other` is set in `self`.
    pub fn contains(self, other: CmpFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true when any bit of `other` is set in `self`.
    pub fn intersects(self, other: CmpFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// The flags with the `ICASE`/`NOT` modifier bits cleared.
    pub fn without_modifiers(self) -> CmpFlags {
        CmpFlags(self.0 & !Self::MODIFIERS.0)
    }

    /// The flags with the `NOT` bit cleared.
    pub fn without_not(self) -> CmpFlags {
        CmpFlags(self.0 & !Self::NOT.0)
    }

    /// True when no bit is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CmpFlags {
    type Output = CmpFlags;

    fn bitor(self, rhs: CmpFlags) -> CmpFlags {
        CmpFlags(self.0 | rhs.0)
    }
}

impl BitAnd for CmpFlags {
    type Output = CmpFlags;

    fn bitand(self, rhs: CmpFlags) -> CmpFlags {
        CmpFlags(self.0 & rhs.0)
    }
}

impl Display for CmpFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let op = match self.without_modifiers() {
            CmpFlags::EQ => "=",
            CmpFlags::GT => ">",
            CmpFlags::LT => "<",
            CmpFlags::GTE => ">=",
            CmpFlags::LTE => "<=",
            _ => "?",
        };
        f.write_str(op)
    }
}

/// Error returned when a dependency string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid dependency expression '{0}'")]
pub struct ParseReldepError(pub String);

/// A parsed relational dependency: `name [op evr]`.
///
/// The operator and EVR are either both present or both absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReldepSpec {
    /// Name of the provided or required capability; may be a file path.
    pub name: String,
    /// Range operator, empty when the dependency is unversioned.
    pub cmp: CmpFlags,
    /// The EVR the operator compares against.
    pub evr: Option<String>,
}

impl ReldepSpec {
    /// An unversioned dependency on `name`.
    pub fn unversioned(name: impl Into<String>) -> ReldepSpec {
        ReldepSpec {
            name: name.into(),
            cmp: CmpFlags::default(),
            evr: None,
        }
    }

    /// A versioned dependency.
    pub fn versioned(name: impl Into<String>, cmp: CmpFlags, evr: impl Into<String>) -> ReldepSpec {
        ReldepSpec {
            name: name.into(),
            cmp,
            evr: Some(evr.into()),
        }
    }
}

impl FromStr for ReldepSpec {
    type Err = ParseReldepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let name = parts
            .next()
            .ok_or_else(|| ParseReldepError(s.to_owned()))?
            .to_owned();
        let Some(op) = parts.next() else {
            return Ok(ReldepSpec::unversioned(name));
        };
        let cmp = match op {
            "=" | "==" => CmpFlags::EQ,
            ">" => CmpFlags::GT,
            "<" => CmpFlags::LT,
            ">=" | "=>" => CmpFlags::GTE,
            "<=" | "=<" => CmpFlags::LTE,
            _ => return Err(ParseReldepError(s.to_owned())),
        };
        let evr = parts
            .next()
            .ok_or_else(|| ParseReldepError(s.to_owned()))?
            .to_owned();
        if parts.next().is_some() {
            return Err(ParseReldepError(s.to_owned()));
        }
        Ok(ReldepSpec::versioned(name, cmp, evr))
    }
}

impl Display for ReldepSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.evr {
            Some(evr) => write!(f, "{} {} {}", self.name, self.cmp, evr),
            None => f.write_str(&self.name),
        }
    }
}
