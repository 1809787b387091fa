//! End-to-end exercises of the job-queue solver against a small in-memory
//! universe.

use haversack_solve::{
    Job, JobAction, JobQueue, JobTarget, Pool, RepoId, SolvableId, SolvableRecord, Solver,
    SolverFlag, StepType, TransactionMode,
};
use haversack_types::ReldepSpec;

fn record(name: &str, evr: &str, deps: &[(&str, &[&str])]) -> SolvableRecord {
    let mut r = SolvableRecord::new(name, evr, "x86_64");
    for (kind, entries) in deps {
        let list = entries.iter().map(|s| s.to_string()).collect();
        match *kind {
            "provides" => r.provides = list,
            "requires" => r.requires = list,
            "conflicts" => r.conflicts = list,
            "obsoletes" => r.obsoletes = list,
            "recommends" => r.recommends = list,
            other => panic!("unknown dep kind {other}"),
        }
    }
    r
}

struct Universe {
    pool: Pool,
    system: RepoId,
    main: RepoId,
}

impl Universe {
    fn new() -> Universe {
        let mut pool = Pool::new();
        let system = pool.new_repo("@System");
        let main = pool.new_repo("main");
        pool.set_installed_repo(system);
        Universe { pool, system, main }
    }

    fn installed(&mut self, r: SolvableRecord) -> SolvableId {
        self.pool.add_solvable(self.system, &r).unwrap()
    }

    fn available(&mut self, r: SolvableRecord) -> SolvableId {
        self.pool.add_solvable(self.main, &r).unwrap()
    }
}

fn full_mode() -> TransactionMode {
    TransactionMode::SHOW_OBSOLETES
        | TransactionMode::CHANGE_IS_REINSTALL
        | TransactionMode::SHOW_ACTIVE
        | TransactionMode::SHOW_ALL
}

#[test]
fn install_pulls_dependencies() {
    let mut u = Universe::new();
    let walrus = u.available(record("walrus", "2-6", &[("requires", &["semolina = 2"])]));
    let semolina = u.available(record("semolina", "2-0", &[]));
    u.available(record("semolina", "1-1", &[]));

    let mut jobs = JobQueue::new();
    jobs.push2(JobAction::INSTALL, JobTarget::Solvable(walrus));

    let mut solver = Solver::new(&u.pool);
    solver.solve(&jobs).unwrap();
    let trans = solver.create_transaction();

    let installs: Vec<_> = trans
        .steps()
        .iter()
        .filter(|&&p| trans.step_type(&u.pool, p, full_mode()) == StepType::Install)
        .copied()
        .collect();
    assert_eq!(installs, vec![walrus, semolina]);
}

#[test]
fn missing_dependency_is_a_problem() {
    let mut u = Universe::new();
    let walrus = u.available(record("walrus", "2-6", &[("requires", &["nonexistent"])]));

    let mut jobs = JobQueue::new();
    jobs.push2(JobAction::INSTALL, JobTarget::Solvable(walrus));

    let mut solver = Solver::new(&u.pool);
    assert!(solver.solve(&jobs).is_err());
    assert_eq!(solver.problem_count(), 1);
    let desc = solver.describe_problem(0).unwrap();
    assert!(desc.contains("nothing provides nonexistent"), "{desc}");
    assert!(desc.contains("walrus-2-6.x86_64"), "{desc}");
}

#[test]
fn upgrade_by_name_replaces_installed() {
    let mut u = Universe::new();
    let old = u.installed(record("flying", "2-9", &[]));
    let new = u.available(record("flying", "3-0", &[]));

    let mut jobs = JobQueue::new();
    jobs.push2(JobAction::UPDATE, JobTarget::Name("flying".into()));

    let mut solver = Solver::new(&u.pool);
    solver.solve(&jobs).unwrap();
    let trans = solver.create_transaction();

    assert_eq!(trans.step_type(&u.pool, new, full_mode()), StepType::Upgrade);
    assert_eq!(trans.step_type(&u.pool, old, full_mode()), StepType::Upgraded);
    assert_eq!(trans.obs_pkgs(new), &[old]);
}

#[test]
fn obsoletes_take_over_installed_packages() {
    let mut u = Universe::new();
    let old = u.installed(record("penny", "4-1", &[]));
    let new = u.available(record("dime", "1-1", &[("obsoletes", &["penny < 5"])]));

    let mut jobs = JobQueue::new();
    jobs.push2(JobAction::INSTALL, JobTarget::Solvable(new));

    let mut solver = Solver::new(&u.pool);
    solver.solve(&jobs).unwrap();
    let trans = solver.create_transaction();

    assert_eq!(trans.step_type(&u.pool, new, full_mode()), StepType::Obsoletes);
    assert_eq!(trans.step_type(&u.pool, old, full_mode()), StepType::Obsoleted);
    // without the obsoletes mode the erase side reads as a plain erase
    assert_eq!(
        trans.step_type(&u.pool, old, TransactionMode::default()),
        StepType::Erase
    );
}

#[test]
fn multiversion_names_install_side_by_side() {
    let mut u = Universe::new();
    let kept = u.installed(record("kernel", "1-1", &[]));
    let incoming = u.available(record("kernel", "2-1", &[]));

    let mut jobs = JobQueue::new();
    jobs.push(Job::new(
        JobAction::MULTIVERSION,
        JobTarget::Provides(ReldepSpec::unversioned("kernel")),
    ));
    jobs.push2(JobAction::INSTALL, JobTarget::Solvable(incoming));

    let mut solver = Solver::new(&u.pool);
    solver.solve(&jobs).unwrap();
    let trans = solver.create_transaction();

    assert_eq!(trans.step_type(&u.pool, incoming, full_mode()), StepType::Install);
    assert!(solver.decision_level(kept) > 0);
    assert_eq!(trans.steps().len(), 1);
}

#[test]
fn conflict_without_permission_is_a_problem() {
    let mut u = Universe::new();
    u.installed(record("goat", "1-1", &[]));
    let jay = u.available(record("jay", "5-0", &[("conflicts", &["goat"])]));

    let mut jobs = JobQueue::new();
    jobs.push2(JobAction::INSTALL, JobTarget::Solvable(jay));

    let mut solver = Solver::new(&u.pool);
    assert!(solver.solve(&jobs).is_err());
    let desc = solver.describe_problem(0).unwrap();
    assert!(desc.contains("conflicts"), "{desc}");

    // with blanket uninstall permission the conflicting package goes away
    let mut solver = Solver::new(&u.pool);
    solver.set_flag(SolverFlag::AllowUninstall, true);
    solver.solve(&jobs).unwrap();
}

#[test]
fn cleandeps_erase_drops_the_orphaned_dependency() {
    let mut u = Universe::new();
    let leaf = u.installed(record("mrkite", "2-0", &[("requires", &["mrkite-lib"])]));
    let lib = u.installed(record("mrkite-lib", "2-0", &[("provides", &["mrkite-lib"])]));
    let kept = u.installed(record("unrelated", "1-0", &[]));

    let mut jobs = JobQueue::new();
    jobs.push2(
        JobAction::ERASE | JobAction::CLEAN_DEPS,
        JobTarget::Solvable(leaf),
    );

    let mut solver = Solver::new(&u.pool);
    solver.solve(&jobs).unwrap();

    assert!(solver.decision_level(leaf) < 0);
    assert!(solver.decision_level(lib) < 0);
    assert!(solver.decision_level(kept) > 0);

    use haversack_solve::DecisionKind;
    assert_eq!(solver.decision_kind(lib), Some(DecisionKind::CleandepsErase));
}

#[test]
fn weak_install_of_nothing_is_not_an_error() {
    let u = Universe::new();
    let mut jobs = JobQueue::new();
    jobs.push2(
        JobAction::INSTALL | JobAction::WEAK,
        JobTarget::Name("missing".into()),
    );

    let mut solver = Solver::new(&u.pool);
    solver.solve(&jobs).unwrap();
    assert!(solver.create_transaction().is_empty());
}

#[test]
fn distupgrade_follows_the_repo_downward() {
    let mut u = Universe::new();
    let installed = u.installed(record("baby", "6:5.0-11", &[]));
    let older = u.available(record("baby", "6:4.9-3", &[]));

    let mut jobs = JobQueue::new();
    jobs.push2(JobAction::DISTUPGRADE, JobTarget::All);

    let mut solver = Solver::new(&u.pool);
    solver.solve(&jobs).unwrap();
    let trans = solver.create_transaction();

    assert_eq!(trans.step_type(&u.pool, older, full_mode()), StepType::Downgrade);
    assert_eq!(trans.step_type(&u.pool, installed, full_mode()), StepType::Downgraded);
}

#[test]
fn reinstall_is_reported_as_such() {
    let mut u = Universe::new();
    let installed = u.installed(record("dog", "1-1", &[]));
    let fresh = u.available(record("dog", "1-1", &[]));

    let mut jobs = JobQueue::new();
    jobs.push2(JobAction::INSTALL, JobTarget::Solvable(fresh));

    let mut solver = Solver::new(&u.pool);
    solver.solve(&jobs).unwrap();
    let trans = solver.create_transaction();

    assert_eq!(trans.step_type(&u.pool, fresh, full_mode()), StepType::Reinstall);
    assert_eq!(trans.step_type(&u.pool, installed, full_mode()), StepType::Reinstalled);
}

#[test]
fn recommends_are_honoured_but_optional() {
    let mut u = Universe::new();
    let main = u.available(record("toolbox", "1-1", &[("recommends", &["flashlight"])]));
    let extra = u.available(record("flashlight", "0.2-2", &[("provides", &["flashlight"])]));

    let mut jobs = JobQueue::new();
    jobs.push2(JobAction::INSTALL, JobTarget::Solvable(main));

    let mut solver = Solver::new(&u.pool);
    solver.solve(&jobs).unwrap();
    assert!(solver.decision_level(extra) > 0);

    // with weak deps ignored only the requested package arrives
    let mut solver = Solver::new(&u.pool);
    solver.set_flag(SolverFlag::IgnoreRecommended, true);
    solver.solve(&jobs).unwrap();
    assert_eq!(solver.decision_level(extra), 0);
}
