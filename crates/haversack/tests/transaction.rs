//! The depsolve → commit pipeline over a recording rpm runtime.

mod common;

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use assert_matches::assert_matches;
use common::fixture_sack_at;
use haversack::transaction::{
    FileReasonStore, HeaderInfo, Keyring, NullKeyring, NullProgress, ProblemsFilter,
    ReasonStore, RpmCallback, RpmEvent, RpmRuntime, RpmTransFlags, RpmVerbosity,
    TransactionDriver, TransactionFlags, KEY_FROM_REPO, KEY_REASON,
};
use haversack::{Error, Goal, Keyname, Query, Sack};
use haversack_types::CmpFlags;
use tempfile::TempDir;

#[derive(Debug, Default)]
struct MockState {
    installs: Vec<(PathBuf, bool, bool)>,
    removes: Vec<HeaderInfo>,
    ordered: bool,
    checked: bool,
    ran_flags: Option<RpmTransFlags>,
    ran_filter: Option<ProblemsFilter>,
    cleared: bool,
    fail_run: bool,
}

#[derive(Debug, Default)]
struct MockRpm {
    state: Rc<RefCell<MockState>>,
}

impl MockRpm {
    fn new() -> (MockRpm, Rc<RefCell<MockState>>) {
        let state = Rc::new(RefCell::new(MockState::default()));
        (
            MockRpm {
                state: Rc::clone(&state),
            },
            state,
        )
    }

    fn emit_run(&self, callback: RpmCallback<'_>) {
        let state = self.state.borrow();
        let total = (state.installs.len() + state.removes.len()) as u64;
        callback(RpmEvent::TransStart { total });
        callback(RpmEvent::TransProgress { amount: 0, total });
        callback(RpmEvent::TransStop);
        for (path, _, _) in &state.installs {
            let key = path.display().to_string();
            let header = HeaderInfo {
                sha1header: Some(format!("sha1:{key}")),
                ..HeaderInfo::default()
            };
            callback(RpmEvent::InstStart {
                key: key.clone(),
                header: Some(header.clone()),
                total: 100,
            });
            callback(RpmEvent::InstProgress {
                key: key.clone(),
                header: Some(header),
                amount: 100,
                total: 100,
            });
            callback(RpmEvent::InstStop { key });
        }
        for header in &state.removes {
            callback(RpmEvent::UninstStart {
                header: Some(header.clone()),
                key: None,
            });
            callback(RpmEvent::UninstProgress {
                header: Some(header.clone()),
                amount: 1,
                total: 1,
            });
            callback(RpmEvent::UninstStop);
        }
    }
}

impl RpmRuntime for MockRpm {
    fn set_root(&mut self, _root: &Path) -> haversack::Result<()> {
        Ok(())
    }

    fn set_verbosity(&mut self, _verbosity: RpmVerbosity) {}

    fn add_install_file(
        &mut self,
        path: &Path,
        allow_untrusted: bool,
        is_update: bool,
    ) -> haversack::Result<()> {
        self.state
            .borrow_mut()
            .installs
            .push((path.to_owned(), allow_untrusted, is_update));
        Ok(())
    }

    fn add_remove(&mut self, header: &HeaderInfo) -> haversack::Result<()> {
        self.state.borrow_mut().removes.push(header.clone());
        Ok(())
    }

    fn order(&mut self) {
        self.state.borrow_mut().ordered = true;
    }

    fn check(&mut self, _callback: RpmCallback<'_>) -> Vec<String> {
        self.state.borrow_mut().checked = true;
        Vec::new()
    }

    fn run(
        &mut self,
        filter: ProblemsFilter,
        flags: RpmTransFlags,
        callback: RpmCallback<'_>,
    ) -> haversack::Result<Vec<String>> {
        if self.state.borrow().fail_run {
            return Err(Error::InternalError("rpm exploded".to_owned()));
        }
        {
            let mut state = self.state.borrow_mut();
            state.ran_flags = Some(flags);
            state.ran_filter = Some(filter);
        }
        self.emit_run(callback);
        Ok(Vec::new())
    }

    fn clear(&mut self) {
        let mut state = self.state.borrow_mut();
        state.cleared = true;
        state.installs.clear();
        state.removes.clear();
    }
}

struct RejectingKeyring;

impl Keyring for RejectingKeyring {
    fn add_public_keys(&mut self) -> haversack::Result<()> {
        Ok(())
    }

    fn check_untrusted_file(&self, path: &Path) -> haversack::Result<()> {
        Err(Error::GpgSignatureInvalid(format!(
            "no signature on {}",
            path.display()
        )))
    }
}

fn find<'s>(sack: &'s Sack, nevra_glob: &str) -> haversack::Package<'s> {
    let mut q = Query::new(sack);
    q.filter(Keyname::Nevra, CmpFlags::GLOB, nevra_glob).unwrap();
    let pkgs = q.run();
    assert_eq!(pkgs.len(), 1, "expected a single match for {nevra_glob}");
    pkgs[0]
}

/// Creates the payload files a depsolved goal expects in the cache.
fn seed_payloads(sack: &Sack, goal: &Goal<'_>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut pkgs = goal.list_installs().unwrap();
    pkgs.extend(goal.list_upgrades().unwrap());
    pkgs.extend(goal.list_downgrades().unwrap());
    pkgs.extend(goal.list_reinstalls().unwrap());
    for pkg in pkgs {
        let dir = sack.cachedir().join(pkg.reponame());
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.rpm", pkg.nevra()));
        fs::write(&path, b"not really an rpm").unwrap();
        paths.push(path);
    }
    paths
}

fn driver_with<'s>(
    sack: &'s Sack,
    db_root: &Path,
) -> (TransactionDriver<'s>, Rc<RefCell<MockState>>) {
    let (rpm, state) = MockRpm::new();
    let driver = TransactionDriver::new(
        sack,
        Box::new(rpm),
        Box::new(NullKeyring),
        Box::new(FileReasonStore::new(db_root)),
    );
    (driver, state)
}

#[test]
fn commit_installs_and_writes_reasons() {
    let cache = TempDir::new().unwrap();
    let db_root = TempDir::new().unwrap();
    let sack = fixture_sack_at(Some(cache.path()), None);

    let walrus = find(&sack, "walrus-*");
    let mut goal = Goal::new(&sack);
    goal.install(&walrus);

    let (mut driver, state) = driver_with(&sack, db_root.path());
    driver.set_uid(1000);
    driver.set_releasever("100");

    driver.depsolve(&mut goal).unwrap();
    assert_eq!(driver.remote_pkgs().len(), 2);

    let payloads = seed_payloads(&sack, &goal);
    // a second depsolve sees the payloads and has nothing left to fetch
    driver.depsolve(&mut goal).unwrap();
    assert!(driver.remote_pkgs().is_empty());

    driver.commit(&goal, &mut NullProgress).unwrap();

    {
        let state = state.borrow();
        assert!(state.ordered);
        assert!(state.checked);
        assert_eq!(state.ran_flags, Some(RpmTransFlags::default()));
    }

    let db = FileReasonStore::new(db_root.path());
    let walrus_id = walrus.package_id();
    let semolina_id = find(&sack, "semolina-2-0*").package_id();
    assert_eq!(
        db.get_string(&walrus_id, KEY_REASON).unwrap().as_deref(),
        Some("user")
    );
    assert_eq!(
        db.get_string(&semolina_id, KEY_REASON).unwrap().as_deref(),
        Some("dep")
    );
    assert_eq!(
        db.get_string(&walrus_id, KEY_FROM_REPO).unwrap().as_deref(),
        Some("main")
    );

    // downloaded payloads were cleaned out of the cache
    for path in payloads {
        assert!(!path.exists(), "{} should be gone", path.display());
    }
}

#[test]
fn test_flag_commits_nothing() {
    let cache = TempDir::new().unwrap();
    let db_root = TempDir::new().unwrap();
    let sack = fixture_sack_at(Some(cache.path()), None);

    let walrus = find(&sack, "walrus-*");
    let mut goal = Goal::new(&sack);
    goal.install(&walrus);

    let (mut driver, state) = driver_with(&sack, db_root.path());
    driver.set_flags(TransactionFlags::TEST);

    driver.depsolve(&mut goal).unwrap();
    let payloads = seed_payloads(&sack, &goal);
    driver.commit(&goal, &mut NullProgress).unwrap();

    {
        let state = state.borrow();
        let flags = state.ran_flags.expect("test run happened");
        assert!(flags.contains(RpmTransFlags::TEST));
    }

    // no reason rows, no cache cleanup
    let db = FileReasonStore::new(db_root.path());
    assert_eq!(db.get_string(&walrus.package_id(), KEY_REASON).unwrap(), None);
    for path in payloads {
        assert!(path.exists());
    }
}

#[test]
fn upgrade_propagates_the_stored_reason() {
    let cache = TempDir::new().unwrap();
    let db_root = TempDir::new().unwrap();
    let sack = fixture_sack_at(Some(cache.path()), None);

    let old = find(&sack, "flying-2-9*");
    let new = find(&sack, "flying-3-0*");

    // the previous install was explicitly user-requested
    let mut db = FileReasonStore::new(db_root.path());
    db.set_string(&old.package_id(), KEY_REASON, "user").unwrap();

    let mut goal = Goal::new(&sack);
    goal.upgrade_to(&new);

    let (mut driver, state) = driver_with(&sack, db_root.path());
    driver.depsolve(&mut goal).unwrap();
    seed_payloads(&sack, &goal);
    driver.commit(&goal, &mut NullProgress).unwrap();

    let db = FileReasonStore::new(db_root.path());
    assert_eq!(
        db.get_string(&new.package_id(), KEY_REASON).unwrap().as_deref(),
        Some("user")
    );
    // the displaced package's row is gone
    assert_eq!(db.get_string(&old.package_id(), KEY_REASON).unwrap(), None);

    // rpm saw the incoming package as an update, not a fresh install
    let state = state.borrow();
    assert!(state.installs.iter().any(|(path, _, is_update)| {
        *is_update && path.display().to_string().contains("flying-3-0")
    }));
}

#[test]
fn only_trusted_rejects_unsigned_packages() {
    let cache = TempDir::new().unwrap();
    let db_root = TempDir::new().unwrap();
    let sack = fixture_sack_at(Some(cache.path()), None);

    let walrus = find(&sack, "walrus-*");
    let mut goal = Goal::new(&sack);
    goal.install(&walrus);

    let (rpm, _state) = MockRpm::new();
    let mut driver = TransactionDriver::new(
        &sack,
        Box::new(rpm),
        Box::new(RejectingKeyring),
        Box::new(FileReasonStore::new(db_root.path())),
    );
    driver.set_flags(TransactionFlags::ONLY_TRUSTED);

    driver.depsolve(&mut goal).unwrap();
    seed_payloads(&sack, &goal);
    assert_matches!(
        driver.commit(&goal, &mut NullProgress),
        Err(Error::GpgSignatureInvalid(_))
    );

    // without the flag the failure is logged and ignored
    let (rpm, _state) = MockRpm::new();
    let mut driver = TransactionDriver::new(
        &sack,
        Box::new(rpm),
        Box::new(RejectingKeyring),
        Box::new(FileReasonStore::new(db_root.path())),
    );
    driver.depsolve(&mut goal).unwrap();
    driver.commit(&goal, &mut NullProgress).unwrap();
}

#[test]
fn missing_payload_is_file_not_found() {
    let cache = TempDir::new().unwrap();
    let db_root = TempDir::new().unwrap();
    let sack = fixture_sack_at(Some(cache.path()), None);

    let walrus = find(&sack, "walrus-*");
    let mut goal = Goal::new(&sack);
    goal.install(&walrus);

    let (mut driver, _state) = driver_with(&sack, db_root.path());
    driver.depsolve(&mut goal).unwrap();
    assert_matches!(
        driver.commit(&goal, &mut NullProgress),
        Err(Error::FileNotFound(_))
    );
}

#[test]
fn failed_commit_resets_the_driver() {
    let cache = TempDir::new().unwrap();
    let db_root = TempDir::new().unwrap();
    let sack = fixture_sack_at(Some(cache.path()), None);

    let walrus = find(&sack, "walrus-*");
    let mut goal = Goal::new(&sack);
    goal.install(&walrus);

    let (mut driver, state) = driver_with(&sack, db_root.path());
    driver.depsolve(&mut goal).unwrap();
    seed_payloads(&sack, &goal);

    state.borrow_mut().fail_run = true;
    assert_matches!(
        driver.commit(&goal, &mut NullProgress),
        Err(Error::InternalError(_))
    );
    assert!(state.borrow().cleared);

    // the driver can go again after the caller fixes things up
    state.borrow_mut().fail_run = false;
    driver.depsolve(&mut goal).unwrap();
    driver.commit(&goal, &mut NullProgress).unwrap();
}

#[test]
fn erase_goes_through_the_remove_path() {
    let cache = TempDir::new().unwrap();
    let db_root = TempDir::new().unwrap();
    let sack = fixture_sack_at(Some(cache.path()), None);

    let dog = find(&sack, "dog-*");
    let mut db = FileReasonStore::new(db_root.path());
    db.set_string(&dog.package_id(), KEY_REASON, "user").unwrap();

    let mut goal = Goal::new(&sack);
    goal.erase(&dog);

    let (mut driver, state) = driver_with(&sack, db_root.path());
    driver.depsolve(&mut goal).unwrap();
    driver.commit(&goal, &mut NullProgress).unwrap();

    {
        let state = state.borrow();
        assert_eq!(state.removes.len(), 1);
        assert_eq!(state.removes[0].name, "dog");
    }
    let db = FileReasonStore::new(db_root.path());
    assert_eq!(db.get_string(&dog.package_id(), KEY_REASON).unwrap(), None);
}
