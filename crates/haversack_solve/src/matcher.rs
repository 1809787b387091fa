use haversack_types::CmpFlags;
use regex::{escape, Regex, RegexBuilder};

/// A compiled string matcher: exact, substring or fnmatch-style glob, each
/// optionally case-insensitive. This is the matching vocabulary of the
/// data iterator and of the query engine's string filters.
#[derive(Debug, Clone)]
pub enum StrMatcher {
    /// Byte-for-byte equality.
    Exact(String),
    /// Case-insensitive equality.
    ExactIcase(String),
    /// Substring containment.
    Substr(String),
    /// Case-insensitive substring containment.
    SubstrIcase(String),
    /// Glob match over the whole string.
    Glob(Regex),
}

impl StrMatcher {
    /// Builds a matcher from query comparison flags. Only the
    /// `EQ`/`SUBSTR`/`GLOB` + `ICASE` combinations are valid here; the
    /// caller is expected to have validated the flags already.
    pub fn new(pattern: &str, cmp: CmpFlags) -> StrMatcher {
        let icase = cmp.contains(CmpFlags::ICASE);
        match cmp.without_modifiers() {
            CmpFlags::SUBSTR if icase => StrMatcher::SubstrIcase(pattern.to_lowercase()),
            CmpFlags::SUBSTR => StrMatcher::Substr(pattern.to_owned()),
            CmpFlags::GLOB => StrMatcher::Glob(glob_regex(pattern, icase)),
            _ if icase => StrMatcher::ExactIcase(pattern.to_owned()),
            _ => StrMatcher::Exact(pattern.to_owned()),
        }
    }

    /// Tests `candidate` against the pattern.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            StrMatcher::Exact(p) => candidate == p,
            StrMatcher::ExactIcase(p) => candidate.eq_ignore_ascii_case(p),
            StrMatcher::Substr(p) => candidate.contains(p.as_str()),
            StrMatcher::SubstrIcase(p) => candidate.to_lowercase().contains(p.as_str()),
            StrMatcher::Glob(re) => re.is_match(candidate),
        }
    }
}

/// Compiles an fnmatch-style glob (`*`, `?`, `[...]`, `[!...]`) into an
/// anchored regex.
pub(crate) fn glob_regex(glob: &str, icase: bool) -> Regex {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let mut class = String::new();
                let negated = chars.peek() == Some(&'!');
                if negated {
                    chars.next();
                }
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' && !class.is_empty() {
                        closed = true;
                        break;
                    }
                    if matches!(c, '\\' | '^' | '[') {
                        class.push('\\');
                    }
                    class.push(c);
                }
                if closed {
                    out.push('[');
                    if negated {
                        out.push('^');
                    }
                    out.push_str(&class);
                    out.push(']');
                } else {
                    // unterminated class matches literally, like fnmatch
                    out.push_str(&escape("["));
                    if negated {
                        out.push_str(&escape("!"));
                    }
                    out.push_str(&escape(&class));
                }
            }
            other => out.push_str(&escape(&other.to_string())),
        }
    }
    out.push('$');
    RegexBuilder::new(&out)
        .case_insensitive(icase)
        .build()
        // the builder only sees escaped literals and well-formed classes
        .unwrap_or_else(|_| Regex::new("$^").expect("never-matching regex"))
}
