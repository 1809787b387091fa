//! The goal engine against the fixture universe.

mod common;

use assert_matches::assert_matches;
use common::{fixture_sack, fixture_sack_at, nevras};
use haversack::{
    Error, Goal, GoalActions, Keyname, PackageSet, Query, Reason, Sack, Selector,
};
use haversack_types::CmpFlags;

fn find<'s>(sack: &'s Sack, nevra_glob: &str) -> haversack::Package<'s> {
    let mut q = Query::new(sack);
    q.filter(Keyname::Nevra, CmpFlags::GLOB, nevra_glob).unwrap();
    let pkgs = q.run();
    assert_eq!(pkgs.len(), 1, "expected a single match for {nevra_glob}");
    pkgs[0]
}

#[test]
fn install_lands_in_the_transaction() {
    let sack = fixture_sack();
    let walrus = find(&sack, "walrus-*");

    let mut goal = Goal::new(&sack);
    goal.install(&walrus);
    goal.run().unwrap();

    let installs = goal.list_installs().unwrap();
    assert_eq!(
        nevras(&installs),
        vec!["semolina-2-0.x86_64", "walrus-2-6.x86_64"]
    );
    assert!(goal.list_erasures().unwrap().is_empty());

    // the requested package reads as user intent, its dependency does not
    assert_eq!(goal.reason(&walrus), Reason::User);
    assert_eq!(goal.reason(&find(&sack, "semolina-2-0*")), Reason::Dep);
}

#[test]
fn install_failure_keeps_the_solver_for_problems() {
    let mut sack = fixture_sack();
    let excluded: PackageSet = {
        let mut q = Query::new(&sack);
        q.filter(Keyname::Name, CmpFlags::EQ, "semolina").unwrap();
        q.run_set()
    };
    sack.add_excludes(&excluded);

    let walrus = find(&sack, "walrus-*");
    let mut goal = Goal::new(&sack);
    goal.install(&walrus);

    assert_matches!(goal.run(), Err(Error::NoSolution));
    assert_eq!(goal.count_problems(), 1);
    let desc = goal.describe_problem(0).unwrap();
    assert!(desc.contains("semolina"), "{desc}");
    assert_matches!(goal.list_installs(), Err(Error::NoSolution));
}

#[test]
fn erase_with_clean_deps() {
    let sack = fixture_sack();
    let flying = find(&sack, "flying-2-9*");

    let mut goal = Goal::new(&sack);
    goal.erase_flags(
        &flying,
        haversack::EraseFlags { clean_deps: true },
    );
    goal.run().unwrap();

    let erased = nevras(&goal.list_erasures().unwrap());
    assert!(erased.contains(&"flying-2-9.x86_64".to_owned()));
    // penny-lib was only needed by flying
    assert!(erased.contains(&"penny-lib-4-1.x86_64".to_owned()));
    assert_eq!(goal.reason(&find(&sack, "penny-lib-*")), Reason::Clean);
}

#[test]
fn upgrade_all_picks_newer_candidates() {
    let sack = fixture_sack();
    let mut goal = Goal::new(&sack);
    goal.upgrade_all();
    goal.run().unwrap();

    let upgrades = nevras(&goal.list_upgrades().unwrap());
    assert!(upgrades.contains(&"flying-3-0.x86_64".to_owned()));
    assert!(upgrades.contains(&"penny-5-1.x86_64".to_owned()));
    assert!(goal.has_actions(GoalActions::UPGRADE_ALL));
}

#[test]
fn obsoleted_packages_are_listed() {
    let sack = fixture_sack();
    let dime = find(&sack, "dime-*");

    let mut goal = Goal::new(&sack);
    goal.install(&dime);
    goal.run().unwrap();

    assert_eq!(nevras(&goal.list_obsoleted().unwrap()), vec!["penny-4-1.x86_64"]);
    let obsoleted = goal.list_obsoleted_by_package(&dime);
    assert_eq!(nevras(&obsoleted), vec!["penny-4-1.x86_64"]);
}

#[test]
fn protected_removal_is_rejected() {
    let sack = fixture_sack();
    let dog = find(&sack, "dog-*");

    let mut goal = Goal::new(&sack);
    let mut protected = PackageSet::new(&sack);
    protected.add(&dog);
    goal.add_protected(&protected);
    goal.erase(&dog);

    assert_matches!(goal.run(), Err(Error::RemovalOfProtectedPkg));
    assert_matches!(goal.list_erasures(), Err(Error::RemovalOfProtectedPkg));
    assert_eq!(goal.count_problems(), 1);
    let desc = goal.describe_problem(goal.count_problems() - 1).unwrap();
    assert!(desc.contains("protected"), "{desc}");
    assert!(desc.contains("dog"), "{desc}");
}

#[test]
fn installonly_limit_erases_the_oldest_kernel() {
    let mut sack = fixture_sack();
    sack.set_installonly(&["kernel"]);
    sack.set_installonly_limit(2);

    let kernel3 = find(&sack, "kernel-3-1*");
    let mut goal = Goal::new(&sack);
    goal.install(&kernel3);
    goal.run().unwrap();

    assert_eq!(nevras(&goal.list_installs().unwrap()), vec!["kernel-3-1.x86_64"]);
    assert_eq!(nevras(&goal.list_erasures().unwrap()), vec!["kernel-1-1.x86_64"]);
}

#[test]
fn installonly_limit_never_erases_the_running_kernel() {
    let mut sack = fixture_sack_at(None, Some("1-1"));
    sack.set_installonly(&["kernel"]);
    sack.set_installonly_limit(2);

    let kernel3 = find(&sack, "kernel-3-1*");
    let mut goal = Goal::new(&sack);
    goal.install(&kernel3);
    goal.run().unwrap();

    // the booted kernel-1 survives; kernel-2 is the one to go
    assert_eq!(nevras(&goal.list_erasures().unwrap()), vec!["kernel-2-1.x86_64"]);
}

#[test]
fn installonly_names_keep_versions_side_by_side() {
    let mut sack = fixture_sack();
    sack.set_installonly(&["kernel"]);
    // limit 0 disables the policy entirely
    sack.set_installonly_limit(0);

    let kernel3 = find(&sack, "kernel-3-1*");
    let mut goal = Goal::new(&sack);
    goal.install(&kernel3);
    goal.run().unwrap();

    assert_eq!(nevras(&goal.list_installs().unwrap()), vec!["kernel-3-1.x86_64"]);
    assert!(goal.list_erasures().unwrap().is_empty());
}

#[test]
fn downgrade_to_lists_as_downgrade() {
    let sack = fixture_sack();
    let penny3 = find(&sack, "penny-3-1*");

    let mut goal = Goal::new(&sack);
    goal.downgrade_to(&penny3);
    goal.run().unwrap();

    assert_eq!(nevras(&goal.list_downgrades().unwrap()), vec!["penny-3-1.x86_64"]);
}

#[test]
fn selector_install_narrows_by_arch_and_evr() {
    let sack = fixture_sack();
    let mut sltr = Selector::new(&sack);
    sltr.set(Keyname::Name, CmpFlags::EQ, "foo").unwrap();
    sltr.set(Keyname::Arch, CmpFlags::EQ, "x86_64").unwrap();
    sltr.set(Keyname::Evr, CmpFlags::EQ, "1-1").unwrap();

    let mut goal = Goal::new(&sack);
    goal.install_selector(&sltr).unwrap();
    goal.run().unwrap();

    assert_eq!(nevras(&goal.list_installs().unwrap()), vec!["foo-1-1.x86_64"]);
}

#[test]
fn selector_without_required_axis_is_invalid() {
    let sack = fixture_sack();
    let mut sltr = Selector::new(&sack);
    sltr.set(Keyname::Arch, CmpFlags::EQ, "x86_64").unwrap();

    let mut goal = Goal::new(&sack);
    assert_matches!(goal.install_selector(&sltr), Err(Error::BadSelector(_)));

    let mut sltr = Selector::new(&sack);
    assert_matches!(
        sltr.set(Keyname::Name, CmpFlags::GT, "foo"),
        Err(Error::BadSelector(_))
    );
}

#[test]
fn selector_unknown_arch_is_invalid() {
    let sack = fixture_sack();
    let mut sltr = Selector::new(&sack);
    sltr.set(Keyname::Name, CmpFlags::EQ, "foo").unwrap();
    sltr.set(Keyname::Arch, CmpFlags::EQ, "mips3000").unwrap();

    let mut goal = Goal::new(&sack);
    assert_matches!(
        goal.install_selector(&sltr),
        Err(Error::InvalidArchitecture(_))
    );
}

#[test]
fn upgrade_to_flags_checks_installed() {
    let sack = fixture_sack();
    let walrus = find(&sack, "walrus-*");
    let flying3 = find(&sack, "flying-3-0*");

    let mut goal = Goal::new(&sack);
    assert_matches!(
        goal.upgrade_to_flags(&walrus, haversack::UpgradeFlags { check_installed: true }),
        Err(Error::PackageNotFound(_))
    );
    goal.upgrade_to_flags(&flying3, haversack::UpgradeFlags { check_installed: true })
        .unwrap();
    goal.run().unwrap();
    assert_eq!(nevras(&goal.list_upgrades().unwrap()), vec!["flying-3-0.x86_64"]);
}

#[test]
fn install_optional_of_excluded_package_is_silent() {
    let mut sack = fixture_sack();
    let excluded: PackageSet = {
        let mut q = Query::new(&sack);
        q.filter(Keyname::Name, CmpFlags::EQ, "walrus").unwrap();
        q.run_set()
    };
    sack.add_excludes(&excluded);

    let mut sltr = Selector::new(&sack);
    sltr.set(Keyname::Name, CmpFlags::EQ, "walrus").unwrap();

    let mut goal = Goal::new(&sack);
    goal.install_selector_optional(&sltr).unwrap();
    goal.run().unwrap();
    assert!(goal.list_installs().unwrap().is_empty());
}

#[test]
fn run_all_lets_the_callback_inspect_and_veto() {
    let sack = fixture_sack();
    let walrus = find(&sack, "walrus-*");

    let mut goal = Goal::new(&sack);
    goal.install(&walrus);
    let mut seen = 0;
    goal.run_all(
        &mut |g| {
            seen = g.list_installs().map(|v| v.len()).unwrap_or(0);
            true
        },
        GoalActions::default(),
    )
    .unwrap();
    assert_eq!(seen, 2);
    assert_eq!(goal.list_installs().unwrap().len(), 2);

    let mut goal = Goal::new(&sack);
    goal.install(&walrus);
    assert_matches!(
        goal.run_all(&mut |_| false, GoalActions::default()),
        Err(Error::NoSolution)
    );
}

#[test]
fn staging_is_preserved_across_clone() {
    let sack = fixture_sack();
    let walrus = find(&sack, "walrus-*");

    let mut goal = Goal::new(&sack);
    goal.install(&walrus);
    assert_eq!(goal.req_length(), 1);

    let mut copy = goal.clone_staging();
    assert_eq!(copy.req_length(), 1);
    copy.run().unwrap();
    assert_eq!(copy.list_installs().unwrap().len(), 2);
}
