use haversack_solve::StrMatcher;
use haversack_types::{CmpFlags, Nevra, NevraForm, ReldepSpec};

use crate::sack::{Knows, KnowsFlags, Sack};

/// A free-form user-typed token, interpreted lazily as the NEVRA forms
/// and dependency expressions it could stand for. Ambiguous inputs yield
/// several possibilities; callers pick the first that exists in the sack.
#[derive(Debug, Clone)]
pub struct Subject {
    pattern: String,
}

/// Matching options for the sack-validated possibility iterators.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubjectFlags {
    /// Case-insensitive name matching.
    pub icase: bool,
    /// Treat name and arch as fnmatch-style globs.
    pub glob: bool,
}

impl Subject {
    /// Wraps a token.
    pub fn new(pattern: &str) -> Subject {
        Subject {
            pattern: pattern.to_owned(),
        }
    }

    /// The raw token.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Enumerates the NEVRA interpretations of the token, most specific
    /// first, with no reference to any sack.
    pub fn nevra_possibilities(
        &self,
        forms: Option<&[NevraForm]>,
    ) -> impl Iterator<Item = Nevra> + '_ {
        let forms: Vec<NevraForm> = forms.map(<[_]>::to_vec).unwrap_or_else(|| NevraForm::ALL.to_vec());
        forms
            .into_iter()
            .filter_map(|form| Nevra::parse(&self.pattern, form).ok())
    }

    /// Like [`Subject::nevra_possibilities`], but keeps only
    /// interpretations the sack can confirm: the name (and version, when
    /// bound) must be known, and an arch field must name an architecture
    /// installable on the sack.
    pub fn nevra_possibilities_real<'a>(
        &'a self,
        sack: &'a Sack,
        forms: Option<&[NevraForm]>,
        flags: SubjectFlags,
    ) -> impl Iterator<Item = Nevra> + 'a {
        let arches = sack.list_arches();
        self.nevra_possibilities(forms)
            .filter(move |nevra| {
                if let Some(arch) = &nevra.arch {
                    let known = if flags.glob {
                        let matcher = StrMatcher::new(arch, CmpFlags::GLOB);
                        arches.iter().any(|a| matcher.matches(a))
                    } else {
                        arches.contains(&arch.as_str())
                    };
                    if !known {
                        return false;
                    }
                }
                let knows = sack.knows(
                    &nevra.name,
                    nevra.version.as_deref(),
                    KnowsFlags {
                        name_only: true,
                        icase: flags.icase,
                        glob: flags.glob,
                    },
                );
                knows != Knows::No
            })
    }

    /// Interprets the token as a dependency expression when its name is
    /// known to the sack, as a package name or a provider.
    pub fn reldep_possibilities_real<'a>(
        &'a self,
        sack: &'a Sack,
        flags: SubjectFlags,
    ) -> impl Iterator<Item = ReldepSpec> + 'a {
        self.pattern
            .parse::<ReldepSpec>()
            .ok()
            .filter(move |spec| {
                sack.knows(
                    &spec.name,
                    None,
                    KnowsFlags {
                        name_only: false,
                        icase: flags.icase,
                        glob: flags.glob,
                    },
                ) != Knows::No
            })
            .into_iter()
    }
}
