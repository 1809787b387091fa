//! Comparison of RPM `[epoch:]version[-release]` strings.
//!
//! The order implemented here is the classic rpm one: the epoch is compared
//! numerically (a missing epoch counts as `0`), then the version and the
//! release are compared segment-wise. Segments alternate between runs of
//! digits and runs of letters; digit runs compare numerically and beat
//! letter runs, `~` sorts before anything including the end of the string,
//! and `^` sorts after the end of the string but before any other suffix.

use std::cmp::Ordering;

/// Splits an EVR string into its `(epoch, version, release)` parts.
///
/// The epoch is everything before the first `:` when it is a non-empty run
/// of digits; the release is everything after the last `-`. Both are
/// optional and `None` when absent, which is distinct from being present
/// and `"0"`.
pub fn split_evr(evr: &str) -> (Option<&str>, &str, Option<&str>) {
    let (epoch, rest) = match evr.split_once(':') {
        Some((e, rest)) if !e.is_empty() && e.bytes().all(|b| b.is_ascii_digit()) => {
            (Some(e), rest)
        }
        _ => (None, evr),
    };
    match rest.rsplit_once('-') {
        Some((version, release)) => (epoch, version, Some(release)),
        None => (epoch, rest, None),
    }
}

/// Returns the numeric epoch of an EVR string, or `None` when the string
/// carries no epoch at all.
pub fn epoch_of(evr: &str) -> Option<u64> {
    split_evr(evr).0.and_then(|e| e.parse().ok())
}

/// Total order over two EVR strings.
pub fn evr_cmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let (ea, va, ra) = split_evr(a);
    let (eb, vb, rb) = split_evr(b);

    let ea: u64 = ea.and_then(|e| e.parse().ok()).unwrap_or(0);
    let eb: u64 = eb.and_then(|e| e.parse().ok()).unwrap_or(0);
    ea.cmp(&eb)
        .then_with(|| vercmp(va, vb))
        .then_with(|| vercmp(ra.unwrap_or(""), rb.unwrap_or("")))
}

/// Like [`evr_cmp`], but the release is only compared when both sides
/// carry one. Dependency matching works this way: `foo = 2` is satisfied
/// by any release of `foo-2`.
pub fn evr_cmp_promote(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let (ea, va, ra) = split_evr(a);
    let (eb, vb, rb) = split_evr(b);

    let ea: u64 = ea.and_then(|e| e.parse().ok()).unwrap_or(0);
    let eb: u64 = eb.and_then(|e| e.parse().ok()).unwrap_or(0);
    ea.cmp(&eb).then_with(|| vercmp(va, vb)).then_with(|| {
        match (ra, rb) {
            (Some(ra), Some(rb)) => vercmp(ra, rb),
            _ => Ordering::Equal,
        }
    })
}

fn take_run(s: &[u8], pos: usize, digits: bool) -> usize {
    let mut end = pos;
    while end < s.len()
        && (if digits {
            s[end].is_ascii_digit()
        } else {
            s[end].is_ascii_alphabetic()
        })
    {
        end += 1;
    }
    end
}

/// Compares two version (or release) fragments with the rpm segment rules.
pub fn vercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0, 0);

    loop {
        // skip separators, they carry no ordering weight
        while i < a.len() && !a[i].is_ascii_alphanumeric() && a[i] != b'~' && a[i] != b'^' {
            i += 1;
        }
        while j < b.len() && !b[j].is_ascii_alphanumeric() && b[j] != b'~' && b[j] != b'^' {
            j += 1;
        }

        // tilde sorts before everything, including the end of the string
        let a_tilde = i < a.len() && a[i] == b'~';
        let b_tilde = j < b.len() && b[j] == b'~';
        if a_tilde || b_tilde {
            if !a_tilde {
                return Ordering::Greater;
            }
            if !b_tilde {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        // caret sorts after the end of the string but before other suffixes
        let a_caret = i < a.len() && a[i] == b'^';
        let b_caret = j < b.len() && b[j] == b'^';
        if a_caret || b_caret {
            if !a_caret {
                return if i < a.len() {
                    Ordering::Greater
                } else {
                    Ordering::Less
                };
            }
            if !b_caret {
                return if j < b.len() {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
            }
            i += 1;
            j += 1;
            continue;
        }

        if i >= a.len() || j >= b.len() {
            break;
        }

        let (a_end, b_end, numeric) = if a[i].is_ascii_digit() {
            (take_run(a, i, true), take_run(b, j, true), true)
        } else {
            (take_run(a, i, false), take_run(b, j, false), false)
        };

        if b_end == j {
            // segments of different type: the numeric one is newer
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let sa = &a[i..a_end];
        let sb = &b[j..b_end];
        let cmp = if numeric {
            let sa = strip_zeros(sa);
            let sb = strip_zeros(sb);
            sa.len().cmp(&sb.len()).then_with(|| sa.cmp(sb))
        } else {
            sa.cmp(sb)
        };
        if cmp != Ordering::Equal {
            return cmp;
        }

        i = a_end;
        j = b_end;
    }

    // whichever string still has content is the newer one
    (a.len() - i).cmp(&(b.len() - j))
}

fn strip_zeros(s: &[u8]) -> &[u8] {
    let start = s.iter().take_while(|&&b| b == b'0').count();
    &s[start..]
}
