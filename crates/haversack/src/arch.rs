//! The recognised architecture table and per-basearch compatibility sets.

/// Architectures a sack can be constructed for.
const ARCHES: &[&str] = &[
    "x86_64", "i386", "i486", "i586", "i686", "athlon", "aarch64", "armv5tel", "armv6hl",
    "armv7hl", "armv7hnl", "ppc", "ppc64", "ppc64le", "riscv64", "s390", "s390x", "noarch",
];

/// Architectures whose packages install on the named base architecture,
/// best first. `noarch` is implicitly compatible everywhere.
const COMPAT: &[(&str, &[&str])] = &[
    ("x86_64", &["x86_64", "athlon", "i686", "i586", "i486", "i386"]),
    ("i686", &["i686", "i586", "i486", "i386"]),
    ("aarch64", &["aarch64"]),
    ("armv7hl", &["armv7hl", "armv6hl", "armv5tel"]),
    ("ppc64le", &["ppc64le"]),
    ("ppc64", &["ppc64", "ppc"]),
    ("riscv64", &["riscv64"]),
    ("s390x", &["s390x", "s390"]),
];

/// True when `arch` is a recognised architecture.
pub(crate) fn is_valid(arch: &str) -> bool {
    ARCHES.contains(&arch)
}

/// The architectures whose packages run on `base`, best first, ending
/// with `noarch`.
pub(crate) fn compatible(base: &str) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = COMPAT
        .iter()
        .find(|(b, _)| *b == base)
        .map(|(_, list)| list.to_vec())
        .unwrap_or_else(|| {
            ARCHES
                .iter()
                .copied()
                .filter(|&a| a == base)
                .collect()
        });
    out.push("noarch");
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validity() {
        assert!(is_valid("x86_64"));
        assert!(is_valid("noarch"));
        assert!(!is_valid("mips3000"));
        assert!(!is_valid(""));
    }

    #[test]
    fn compat_sets() {
        let x86 = compatible("x86_64");
        assert_eq!(x86.first(), Some(&"x86_64"));
        assert!(x86.contains(&"i686"));
        assert_eq!(x86.last(), Some(&"noarch"));

        assert_eq!(compatible("aarch64"), vec!["aarch64", "noarch"]);
    }
}
