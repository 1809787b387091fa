//! The query engine against the fixture universe.

mod common;

use assert_matches::assert_matches;
use common::{fixture_sack, nevras};
use haversack::{Error, Keyname, Knows, KnowsFlags, PackageSet, Query, QueryFlags, Sack};
use haversack_types::{CmpFlags, ReldepSpec};

fn query(sack: &Sack) -> Query<'_> {
    Query::new(sack)
}

#[test]
fn name_eq() {
    let sack = fixture_sack();
    let mut q = query(&sack);
    q.filter(Keyname::Name, CmpFlags::EQ, "penny").unwrap();
    assert_eq!(
        nevras(&q.run()),
        vec!["penny-3-1.x86_64", "penny-4-1.x86_64", "penny-5-1.x86_64"]
    );
}

#[test]
fn name_glob_and_icase() {
    let sack = fixture_sack();
    let mut q = query(&sack);
    q.filter(Keyname::Name, CmpFlags::GLOB, "pen*").unwrap();
    assert_eq!(q.count(), 4);

    let mut q = query(&sack);
    q.filter(Keyname::Name, CmpFlags::EQ | CmpFlags::ICASE, "PENNY-LIB")
        .unwrap();
    assert_eq!(nevras(&q.run()), vec!["penny-lib-4-1.x86_64"]);
}

#[test]
fn name_not() {
    let sack = fixture_sack();
    let mut all = query(&sack);
    all.apply();
    let total = all.count();

    let mut q = query(&sack);
    q.filter(Keyname::Name, CmpFlags::NEQ, "penny").unwrap();
    assert_eq!(q.count(), total - 3);
}

#[test]
fn filter_empty_wins() {
    let sack = fixture_sack();
    let mut q = query(&sack);
    q.filter(Keyname::Name, CmpFlags::EQ, "penny").unwrap();
    q.filter_empty();
    assert_eq!(q.count(), 0);
}

#[test]
fn applied_resets_on_new_filter() {
    let sack = fixture_sack();
    let mut q = query(&sack);
    q.filter(Keyname::Name, CmpFlags::EQ, "penny").unwrap();
    q.apply();
    assert!(q.applied());
    q.filter(Keyname::Arch, CmpFlags::EQ, "x86_64").unwrap();
    assert!(!q.applied());
    assert_eq!(q.count(), 3);
}

#[test]
fn excludes_are_honoured() {
    let mut sack = fixture_sack();
    let excluded: PackageSet = {
        let mut q = query(&sack);
        q.filter(Keyname::Name, CmpFlags::EQ, "walrus").unwrap();
        q.run_set()
    };
    sack.add_excludes(&excluded);

    let mut q = query(&sack);
    q.filter(Keyname::Name, CmpFlags::EQ, "walrus").unwrap();
    assert_eq!(q.count(), 0);

    let mut q = Query::with_flags(
        &sack,
        QueryFlags {
            ignore_excludes: true,
        },
    );
    q.filter(Keyname::Name, CmpFlags::EQ, "walrus").unwrap();
    assert_eq!(q.count(), 1);
}

#[test]
fn latest_per_arch_keeps_one_per_name_arch() {
    let sack = fixture_sack();
    let mut q = query(&sack);
    q.filter(Keyname::Name, CmpFlags::EQ, "foo").unwrap();
    q.filter_latest_per_arch(true);
    assert_eq!(nevras(&q.run()), vec!["foo-1-2.x86_64", "foo-2-1.i686"]);

    let mut q = query(&sack);
    q.filter(Keyname::Name, CmpFlags::EQ, "foo").unwrap();
    q.filter_latest(true);
    assert_eq!(nevras(&q.run()), vec!["foo-2-1.i686"]);
}

#[test]
fn latest_ties_break_by_id() {
    let sack = fixture_sack();
    let mut q = query(&sack);
    q.filter(Keyname::Name, CmpFlags::EQ, "pilchard").unwrap();
    q.filter(Keyname::Version, CmpFlags::EQ, "1.2.4").unwrap();
    assert_eq!(q.count(), 2);

    let mut q = query(&sack);
    q.filter(Keyname::Name, CmpFlags::EQ, "pilchard").unwrap();
    q.filter_latest(true);
    assert_eq!(nevras(&q.run()), vec!["pilchard-1.2.4-2.x86_64"]);
}

#[test]
fn set_algebra_laws() {
    let sack = fixture_sack();

    let make = |name: &str| {
        let mut q = query(&sack);
        q.filter(Keyname::Name, CmpFlags::GLOB, name).unwrap();
        q
    };

    // a ∪ b commutative
    let mut ab = make("pen*");
    ab.union(&mut make("fly*"));
    let mut ba = make("fly*");
    ba.union(&mut make("pen*"));
    assert_eq!(nevras(&ab.run()), nevras(&ba.run()));

    // a ∩ b == a − (a − b)
    let mut lhs = make("pen*");
    lhs.intersection(&mut make("penny"));
    let mut a_minus_b = make("pen*");
    a_minus_b.difference(&mut make("penny"));
    let mut rhs = make("pen*");
    rhs.difference(&mut a_minus_b);
    assert_eq!(nevras(&lhs.run()), nevras(&rhs.run()));

    // a − a == ∅
    let mut empty = make("pen*");
    empty.difference(&mut make("pen*"));
    assert_eq!(empty.count(), 0);
}

#[test]
fn upgrades_and_downgrades() {
    let sack = fixture_sack();

    let mut q = query(&sack);
    q.filter_upgrades(true);
    assert_eq!(
        nevras(&q.run()),
        vec!["flying-3-0.x86_64", "kernel-3-1.x86_64", "penny-5-1.x86_64"]
    );

    let mut q = query(&sack);
    q.filter_downgrades(true);
    assert_eq!(nevras(&q.run()), vec!["penny-3-1.x86_64"]);

    let mut q = query(&sack);
    q.filter_upgradable(true);
    assert_eq!(
        nevras(&q.run()),
        vec!["flying-2-9.x86_64", "kernel-2-1.x86_64", "penny-4-1.x86_64"]
    );

    let mut q = query(&sack);
    q.filter_downgradable(true);
    assert_eq!(nevras(&q.run()), vec!["penny-4-1.x86_64"]);
}

#[test]
fn epoch_filters_distinguish_absent_from_zero() {
    let sack = fixture_sack();

    let mut q = query(&sack);
    q.filter_num(Keyname::Epoch, CmpFlags::EQ, 6).unwrap();
    assert_eq!(nevras(&q.run()), vec!["baby-6:5.0-11.x86_64"]);

    // no package carries an explicit epoch 0
    let mut q = query(&sack);
    q.filter_num(Keyname::Epoch, CmpFlags::EQ, 0).unwrap();
    assert_eq!(q.count(), 0);

    let mut q = query(&sack);
    q.filter_num(Keyname::Epoch, CmpFlags::GT, 0).unwrap();
    assert_eq!(nevras(&q.run()), vec!["baby-6:5.0-11.x86_64"]);
}

#[test]
fn evr_version_release_comparisons() {
    let sack = fixture_sack();

    let mut q = query(&sack);
    q.filter(Keyname::Name, CmpFlags::EQ, "penny").unwrap();
    q.filter(Keyname::Evr, CmpFlags::GT, "4-1").unwrap();
    assert_eq!(nevras(&q.run()), vec!["penny-5-1.x86_64"]);

    let mut q = query(&sack);
    q.filter(Keyname::Name, CmpFlags::EQ, "pilchard").unwrap();
    q.filter(Keyname::Release, CmpFlags::GT, "1").unwrap();
    assert_eq!(nevras(&q.run()), vec!["pilchard-1.2.4-2.x86_64"]);

    let mut q = query(&sack);
    q.filter(Keyname::Version, CmpFlags::GLOB, "1.2.*").unwrap();
    assert_eq!(q.count(), 2);
}

#[test]
fn nevra_filter() {
    let sack = fixture_sack();

    let mut q = query(&sack);
    q.filter(Keyname::Nevra, CmpFlags::EQ, "baby-6:5.0-11.x86_64")
        .unwrap();
    assert_eq!(q.count(), 1);

    let mut q = query(&sack);
    q.filter(Keyname::Nevra, CmpFlags::GLOB, "penny-?-1.x86_64")
        .unwrap();
    assert_eq!(q.count(), 3);
}

#[test]
fn reponame_filter() {
    let sack = fixture_sack();
    let mut q = query(&sack);
    q.filter(Keyname::Reponame, CmpFlags::EQ, "@System").unwrap();
    assert_eq!(q.count(), 7);
}

#[test]
fn provides_and_requires() {
    let sack = fixture_sack();

    let mut q = query(&sack);
    q.filter_reldep(Keyname::Provides, "P-lib >= 2".parse::<ReldepSpec>().unwrap())
        .unwrap();
    assert_eq!(nevras(&q.run()), vec!["penny-lib-4-1.x86_64"]);

    let mut q = query(&sack);
    q.filter_reldep(Keyname::Requires, ReldepSpec::unversioned("penny-lib"))
        .unwrap();
    assert_eq!(nevras(&q.run()), vec!["flying-2-9.x86_64"]);

    // requires with negation keeps everything else
    let mut q = query(&sack);
    q.filter_requires(CmpFlags::NEQ, "penny-lib", "4").unwrap();
    assert!(!nevras(&q.run()).contains(&"flying-2-9.x86_64".to_owned()));
}

#[test]
fn obsoletes_against_package_set() {
    let sack = fixture_sack();
    let installed_penny: PackageSet = {
        let mut q = query(&sack);
        q.filter(Keyname::Name, CmpFlags::EQ, "penny").unwrap();
        q.filter(Keyname::Reponame, CmpFlags::EQ, "@System").unwrap();
        q.run_set()
    };

    let mut q = query(&sack);
    q.filter_package_set(Keyname::Obsoletes, CmpFlags::EQ, &installed_penny)
        .unwrap();
    assert_eq!(nevras(&q.run()), vec!["dime-1-1.x86_64"]);
}

#[test]
fn advisory_filters() {
    let sack = fixture_sack();

    let mut q = query(&sack);
    q.filter(Keyname::Advisory, CmpFlags::EQ, "FEDORA-2026-1").unwrap();
    assert_eq!(nevras(&q.run()), vec!["flying-3-0.x86_64"]);

    let mut q = query(&sack);
    q.filter(Keyname::AdvisoryCve, CmpFlags::EQ, "CVE-2026-0001").unwrap();
    assert_eq!(nevras(&q.run()), vec!["flying-3-0.x86_64"]);

    let mut q = query(&sack);
    q.filter(Keyname::AdvisorySeverity, CmpFlags::EQ, "low").unwrap();
    assert_eq!(q.count(), 0);
}

#[test]
fn invalid_filters_are_rejected() {
    let sack = fixture_sack();
    let mut q = query(&sack);

    assert_matches!(
        q.filter(Keyname::Location, CmpFlags::GLOB, "*"),
        Err(Error::BadQuery(_))
    );
    assert_matches!(
        q.filter(Keyname::Name, CmpFlags::GT, "penny"),
        Err(Error::BadQuery(_))
    );
    assert_matches!(
        q.filter_num(Keyname::Epoch, CmpFlags::GLOB, 1),
        Err(Error::BadQuery(_))
    );
    assert_matches!(
        q.filter_package_set(Keyname::Name, CmpFlags::EQ, &PackageSet::new(&sack)),
        Err(Error::BadQuery(_))
    );

    // a failed stage leaves the query usable
    q.filter(Keyname::Name, CmpFlags::EQ, "penny").unwrap();
    assert_eq!(q.count(), 3);
}

#[test]
fn knows_probe() {
    let sack = fixture_sack();

    assert_eq!(
        sack.knows("penny", None, KnowsFlags::default()),
        Knows::Name
    );
    assert_eq!(
        sack.knows("P-lib", None, KnowsFlags::default()),
        Knows::Provider
    );
    assert_eq!(
        sack.knows(
            "P-lib",
            None,
            KnowsFlags {
                name_only: true,
                ..KnowsFlags::default()
            }
        ),
        Knows::No
    );
    assert_eq!(sack.knows("penny", Some("4"), KnowsFlags::default()), Knows::Name);
    assert_eq!(sack.knows("penny", Some("9"), KnowsFlags::default()), Knows::No);
    assert_eq!(sack.knows("", None, KnowsFlags::default()), Knows::No);
}

#[test]
fn evr_cmp_scenarios() {
    let sack = fixture_sack();
    assert_eq!(sack.evr_cmp("8:3.6.9-11.fc100", "8:3.6.9-11.fc100"), 0);
    assert!(sack.evr_cmp("3:3.6.9-1", "8:3.6.9-1") < 0);
    assert!(sack.evr_cmp("1:1.0-1", "1:1.0-2") < 0);
}

#[test]
fn clone_carries_pending_filters() {
    let sack = fixture_sack();
    let mut q = query(&sack);
    q.filter(Keyname::Name, CmpFlags::EQ, "penny").unwrap();
    let mut cloned = q.clone();
    assert_eq!(cloned.count(), 3);
    assert_eq!(q.count(), 3);
}
