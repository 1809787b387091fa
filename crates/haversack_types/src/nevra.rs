use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evr::vercmp;

/// The shapes a `name-epoch:version-release.arch` token can take, from the
/// most to the least specific. Parsing a free-form subject tries them in
/// this order, so the first possibilities returned are the ones that bind
/// the most fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NevraForm {
    /// `name-[epoch:]version-release.arch`
    Nevra,
    /// `name-[epoch:]version-release`
    Nevr,
    /// `name-[epoch:]version`
    Nev,
    /// `name.arch`
    Na,
    /// bare `name`
    Name,
}

impl NevraForm {
    /// All forms, in the order a subject is interpreted.
    pub const ALL: [NevraForm; 5] = [
        NevraForm::Nevra,
        NevraForm::Nevr,
        NevraForm::Nev,
        NevraForm::Na,
        NevraForm::Name,
    ];
}

// The name part may not contain a colon; the version part may contain
// neither a dash nor a colon, which is what makes the greedy name capture
// stop at the right dash.
static FORM_RE: Lazy<[Regex; 5]> = Lazy::new(|| {
    [
        Regex::new(r"^([^:]+)-(?:([0-9]+):)?([^-:]+)-(.+)\.([^.]+)$").unwrap(),
        Regex::new(r"^([^:]+)-(?:([0-9]+):)?([^-:]+)-(.+)$").unwrap(),
        Regex::new(r"^([^:]+)-(?:([0-9]+):)?([^-:]+)$").unwrap(),
        Regex::new(r"^([^:]+)\.([^.]+)$").unwrap(),
        Regex::new(r"^([^:]+)$").unwrap(),
    ]
});

/// Error returned when a token does not match the requested [`NevraForm`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{token}' does not take the form {form:?}")]
pub struct ParseNevraError {
    /// The token that failed to parse.
    pub token: String,
    /// The form it was parsed against.
    pub form: NevraForm,
}

/// A parsed `name-epoch:version-release.arch` value. Fields other than the
/// name are optional; an absent epoch is distinct from an explicit `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nevra {
    /// Package name.
    pub name: String,
    /// Numeric epoch, `None` when the token carried no epoch.
    pub epoch: Option<u64>,
    /// Version, `None` for the name-only forms.
    pub version: Option<String>,
    /// Release, `None` when the form has no release field.
    pub release: Option<String>,
    /// Architecture, `None` when the form has no arch field.
    pub arch: Option<String>,
}

impl Nevra {
    /// Parses `token` against a single form.
    pub fn parse(token: &str, form: NevraForm) -> Result<Nevra, ParseNevraError> {
        let re = match form {
            NevraForm::Nevra => &FORM_RE[0],
            NevraForm::Nevr => &FORM_RE[1],
            NevraForm::Nev => &FORM_RE[2],
            NevraForm::Na => &FORM_RE[3],
            NevraForm::Name => &FORM_RE[4],
        };
        let caps = re.captures(token).ok_or_else(|| ParseNevraError {
            token: token.to_owned(),
            form,
        })?;
        let group = |i: usize| caps.get(i).map(|m| m.as_str().to_owned());
        // the capture is digits-only, but it can still overflow
        let epoch = match caps.get(2) {
            Some(m) => Some(m.as_str().parse().map_err(|_| ParseNevraError {
                token: token.to_owned(),
                form,
            })?),
            None => None,
        };

        let nevra = match form {
            NevraForm::Nevra => Nevra {
                name: caps[1].to_owned(),
                epoch,
                version: group(3),
                release: group(4),
                arch: group(5),
            },
            NevraForm::Nevr | NevraForm::Nev => Nevra {
                name: caps[1].to_owned(),
                epoch,
                version: group(3),
                release: group(4),
                arch: None,
            },
            NevraForm::Na => Nevra {
                name: caps[1].to_owned(),
                arch: group(2),
                ..Nevra::default()
            },
            NevraForm::Name => Nevra {
                name: caps[1].to_owned(),
                ..Nevra::default()
            },
        };
        Ok(nevra)
    }

    /// Enumerates every interpretation of `token`, most specific first.
    pub fn possibilities(token: &str) -> impl Iterator<Item = Nevra> + '_ {
        NevraForm::ALL
            .into_iter()
            .filter_map(|form| Nevra::parse(token, form).ok())
    }

    /// Renders the `[epoch:]version[-release]` part, if any version is set.
    pub fn evr(&self) -> Option<String> {
        let version = self.version.as_deref()?;
        let mut out = String::new();
        if let Some(epoch) = self.epoch {
            out.push_str(&epoch.to_string());
            out.push(':');
        }
        out.push_str(version);
        if let Some(release) = &self.release {
            out.push('-');
            out.push_str(release);
        }
        Some(out)
    }
}

fn cmp_opt_ver(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => vercmp(a, b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

impl Ord for Nevra {
    fn cmp(&self, other: &Self) -> Ordering {
        // an absent epoch sorts below an explicit 0
        let epoch = |n: &Nevra| n.epoch.map_or(-1, |e| e as i64);
        self.name
            .cmp(&other.name)
            .then_with(|| epoch(self).cmp(&epoch(other)))
            .then_with(|| cmp_opt_ver(self.version.as_deref(), other.version.as_deref()))
            .then_with(|| cmp_opt_ver(self.release.as_deref(), other.release.as_deref()))
            .then_with(|| self.arch.cmp(&other.arch))
    }
}

impl PartialOrd for Nevra {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Nevra {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(evr) = self.evr() {
            write!(f, "-{evr}")?;
        }
        if let Some(arch) = &self.arch {
            write!(f, ".{arch}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;

    use super::*;

    const FOF: &str = "four-of-fish-8:3.6.9-11.fc100.x86_64";
    const FOF_NOEPOCH: &str = "four-of-fish-3.6.9-11.fc100.x86_64";

    fn nevra(
        name: &str,
        epoch: Option<u64>,
        version: Option<&str>,
        release: Option<&str>,
        arch: Option<&str>,
    ) -> Nevra {
        Nevra {
            name: name.to_owned(),
            epoch,
            version: version.map(str::to_owned),
            release: release.map(str::to_owned),
            arch: arch.map(str::to_owned),
        }
    }

    #[test]
    fn parse_nevra_form() {
        let parsed = Nevra::parse(FOF, NevraForm::Nevra).unwrap();
        assert_eq!(
            parsed,
            nevra("four-of-fish", Some(8), Some("3.6.9"), Some("11.fc100"), Some("x86_64"))
        );

        let parsed = Nevra::parse(FOF_NOEPOCH, NevraForm::Nevra).unwrap();
        assert_eq!(parsed.epoch, None);
        assert_eq!(parsed.arch.as_deref(), Some("x86_64"));
    }

    #[test]
    fn parse_nevr_absorbs_arch_into_release() {
        let parsed = Nevra::parse(FOF, NevraForm::Nevr).unwrap();
        assert_eq!(
            parsed,
            nevra("four-of-fish", Some(8), Some("3.6.9"), Some("11.fc100.x86_64"), None)
        );
        assert_matches!(Nevra::parse("four-of", NevraForm::Nevr), Err(_));
    }

    #[test]
    fn parse_nev_and_na() {
        let parsed = Nevra::parse("four-of-fish-8:3.6.9", NevraForm::Nev).unwrap();
        assert_eq!(parsed, nevra("four-of-fish", Some(8), Some("3.6.9"), None, None));

        let parsed = Nevra::parse("four-of-fish-3.6.9.i686", NevraForm::Na).unwrap();
        assert_eq!(parsed, nevra("four-of-fish-3.6.9", None, None, None, Some("i686")));
    }

    #[test]
    fn possibilities_with_epoch() {
        let all: Vec<_> = Nevra::possibilities(FOF).collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].release.as_deref(), Some("11.fc100"));
        assert_eq!(all[0].arch.as_deref(), Some("x86_64"));
        assert_eq!(all[1].release.as_deref(), Some("11.fc100.x86_64"));
        assert_eq!(all[1].arch, None);
    }

    #[test]
    fn possibilities_without_epoch() {
        let all: Vec<_> = Nevra::possibilities(FOF_NOEPOCH).collect();
        assert_eq!(all.len(), 5);
        assert_eq!(
            all[0],
            nevra("four-of-fish", None, Some("3.6.9"), Some("11.fc100"), Some("x86_64"))
        );
        assert_eq!(
            all[1],
            nevra("four-of-fish", None, Some("3.6.9"), Some("11.fc100.x86_64"), None)
        );
        assert_eq!(
            all[2],
            nevra("four-of-fish-3.6.9", None, Some("11.fc100.x86_64"), None, None)
        );
        assert_eq!(
            all[3],
            nevra("four-of-fish-3.6.9-11.fc100", None, None, None, Some("x86_64"))
        );
        assert_eq!(all[4], nevra("four-of-fish-3.6.9-11.fc100.x86_64", None, None, None, None));
    }

    #[test]
    fn ordering() {
        let base = nevra("four-of-fish", Some(8), Some("3.6.9"), Some("11.fc100"), Some("x86_64"));
        let mut other = base.clone();
        assert_eq!(base.cmp(&other), Ordering::Equal);

        other.epoch = Some(3);
        assert_eq!(base.cmp(&other), Ordering::Greater);
        other.epoch = Some(11);
        assert_eq!(base.cmp(&other), Ordering::Less);

        other.epoch = Some(8);
        other.version = Some("7.0".to_owned());
        assert_eq!(base.cmp(&other), Ordering::Less);

        other.version = None;
        assert_eq!(base.cmp(&other), Ordering::Greater);

        let mut base = base;
        base.version = None;
        base.release = None;
        other.release = None;
        assert_eq!(base.cmp(&other), Ordering::Equal);

        // no epoch sorts below an explicit zero
        other.epoch = None;
        base.epoch = Some(0);
        assert_eq!(base.cmp(&other), Ordering::Greater);
    }

    #[test]
    fn display_round_trip() {
        let n = nevra("pilchard", Some(1), Some("1.2.4"), Some("1"), Some("x86_64"));
        assert_eq!(n.to_string(), "pilchard-1:1.2.4-1.x86_64");
        assert_eq!(Nevra::parse(&n.to_string(), NevraForm::Nevra).unwrap(), n);
    }
}
