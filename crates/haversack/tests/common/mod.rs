//! Shared fixture universe for the integration suites, loosely shaped
//! like a small distribution: an installed system plus one update repo.

#![allow(dead_code)]

use std::path::Path;

use haversack::{LoadFlags, Repo, RepoData, Sack};
use haversack_solve::{Advisory, SolvableRecord};
use haversack_types::Nevra;

pub fn record(name: &str, evr: &str, arch: &str) -> SolvableRecord {
    SolvableRecord::new(name, evr, arch)
}

pub fn with_deps(
    mut record: SolvableRecord,
    requires: &[&str],
    provides: &[&str],
    obsoletes: &[&str],
) -> SolvableRecord {
    record.requires = requires.iter().map(|s| s.to_string()).collect();
    record.provides = provides.iter().map(|s| s.to_string()).collect();
    record.obsoletes = obsoletes.iter().map(|s| s.to_string()).collect();
    record
}

pub fn system_records() -> Vec<SolvableRecord> {
    vec![
        record("penny", "4-1", "x86_64"),
        with_deps(
            record("penny-lib", "4-1", "x86_64"),
            &[],
            &["P-lib = 3"],
            &[],
        ),
        with_deps(record("flying", "2-9", "x86_64"), &["penny-lib"], &[], &[]),
        record("dog", "1-1", "x86_64"),
        record("baby", "6:5.0-11", "x86_64"),
        record("kernel", "1-1", "x86_64"),
        record("kernel", "2-1", "x86_64"),
    ]
}

pub fn main_records() -> Vec<SolvableRecord> {
    vec![
        record("penny", "5-1", "x86_64"),
        record("penny", "3-1", "x86_64"),
        record("flying", "3-0", "x86_64"),
        with_deps(record("walrus", "2-6", "x86_64"), &["semolina = 2"], &[], &[]),
        record("semolina", "2-0", "x86_64"),
        record("semolina", "1-1", "x86_64"),
        with_deps(
            record("dime", "1-1", "x86_64"),
            &[],
            &[],
            &["penny < 5"],
        ),
        record("kernel", "3-1", "x86_64"),
        record("foo", "1-1", "x86_64"),
        record("foo", "1-2", "x86_64"),
        record("foo", "2-1", "i686"),
        record("pilchard", "1.2.4-1", "x86_64"),
        record("pilchard", "1.2.4-2", "x86_64"),
    ]
}

pub fn main_advisories() -> Vec<Advisory> {
    vec![Advisory {
        id: "FEDORA-2026-1".to_owned(),
        kind: "security".to_owned(),
        severity: Some("critical".to_owned()),
        bugs: vec!["123456".to_owned()],
        cves: vec!["CVE-2026-0001".to_owned()],
        packages: vec![Nevra {
            name: "flying".to_owned(),
            epoch: None,
            version: Some("3".to_owned()),
            release: Some("0".to_owned()),
            arch: Some("x86_64".to_owned()),
        }],
    }]
}

pub fn fixture_sack() -> Sack {
    fixture_sack_at(None, None)
}

pub fn fixture_sack_at(cachedir: Option<&Path>, kernel_release: Option<&str>) -> Sack {
    let mut builder = Sack::builder().arch("x86_64");
    if let Some(dir) = cachedir {
        builder = builder.cachedir(dir).make_cache_dir(true);
    }
    if let Some(release) = kernel_release {
        builder = builder.running_kernel_release(release);
    }
    let mut sack = builder.build().expect("fixture sack");
    sack.load_system_repo(RepoData {
        records: system_records(),
        advisories: Vec::new(),
    })
    .expect("system repo");
    sack.load_repo(
        Repo::new("main"),
        RepoData {
            records: main_records(),
            advisories: main_advisories(),
        },
        LoadFlags {
            load_filelists: true,
            load_updateinfo: true,
            ..LoadFlags::default()
        },
    )
    .expect("main repo");
    sack
}

pub fn names(pkgs: &[haversack::Package<'_>]) -> Vec<String> {
    pkgs.iter().map(|p| p.name().to_owned()).collect()
}

pub fn nevras(pkgs: &[haversack::Package<'_>]) -> Vec<String> {
    let mut out: Vec<String> = pkgs.iter().map(|p| p.nevra()).collect();
    out.sort();
    out
}
