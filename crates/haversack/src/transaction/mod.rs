//! The depsolve → download → commit pipeline over the rpm runtime.

mod db;
mod keyring;
mod progress;
mod rpm;

use std::fs;
use std::ops::BitOr;
use std::path::{Path, PathBuf};
use std::time::Instant;

use fxhash::{FxHashMap, FxHashSet};
use haversack_solve::SolvableId;
use tracing::{debug, warn};

pub use db::{
    FileReasonStore, ReasonStore, KEY_FROM_REPO, KEY_INSTALLED_BY, KEY_REASON, KEY_RELEASEVER,
};
pub use keyring::{Keyring, NullKeyring};
pub use progress::{NullProgress, PackageAction, ProgressSink, TransactionStep};
pub use rpm::{
    HeaderInfo, ProblemsFilter, RpmCallback, RpmEvent, RpmRuntime, RpmTransFlags, RpmVerbosity,
};

use crate::errors::{Error, Result};
use crate::goal::{Goal, GoalActions, Reason};
use crate::package::Package;
use crate::repo::CMDLINE_REPO_NAME;
use crate::sack::Sack;

/// Behaviour flags of one transaction driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionFlags(u32);

impl TransactionFlags {
    /// Refuse to install anything with an unverifiable signature.
    pub const ONLY_TRUSTED: TransactionFlags = TransactionFlags(1 << 0);
    /// Let rpm replace a package with the same version.
    pub const ALLOW_REINSTALL: TransactionFlags = TransactionFlags(1 << 1);
    /// Let rpm replace a package with an older version.
    pub const ALLOW_DOWNGRADE: TransactionFlags = TransactionFlags(1 << 2);
    /// Skip documentation files.
    pub const NODOCS: TransactionFlags = TransactionFlags(1 << 3);
    /// Run the whole commit in test mode; no on-disk change.
    pub const TEST: TransactionFlags = TransactionFlags(1 << 4);

    /// True when every bit of `other` is set.
    pub fn contains(self, other: TransactionFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TransactionFlags {
    type Output = TransactionFlags;

    fn bitor(self, rhs: TransactionFlags) -> TransactionFlags {
        TransactionFlags(self.0 | rhs.0)
    }
}

/// Fetches missing payloads into the cache directory; network policy,
/// mirrors and checksumming live behind this trait.
pub trait Downloader {
    /// Downloads every listed package into `cachedir/<reponame>/`.
    fn download(&mut self, packages: &[Package<'_>], cachedir: &Path) -> Result<()>;
}

#[derive(Debug)]
struct TransItem {
    id: SolvableId,
    action: PackageAction,
    package_id: String,
    header: HeaderInfo,
    filename: Option<PathBuf>,
    pkgid: Option<String>,
}

impl TransItem {
    fn new(pkg: &Package<'_>, action: PackageAction, filename: Option<PathBuf>) -> TransItem {
        TransItem {
            id: pkg.id(),
            action,
            package_id: pkg.package_id(),
            header: HeaderInfo {
                name: pkg.name().to_owned(),
                epoch: pkg.sack().pool().epoch_opt(pkg.id()),
                version: pkg.version().to_owned(),
                release: pkg.release().to_owned(),
                arch: pkg.arch().to_owned(),
                sha1header: pkg.checksum().map(str::to_owned),
            },
            filename,
            pkgid: pkg.checksum().map(str::to_owned),
        }
    }
}

/// Runs a solved goal against the system: resolves payloads, verifies
/// signatures, drives the rpm runtime through its ordering, test and
/// commit phases, and propagates install reasons into the reason store.
///
/// After a commit, successful or not, the driver is reset to a clean
/// state; a failed commit can be retried with a fresh depsolve.
pub struct TransactionDriver<'s> {
    sack: &'s Sack,
    ts: Box<dyn RpmRuntime>,
    keyring: Box<dyn Keyring>,
    db: Box<dyn ReasonStore>,
    uid: u32,
    flags: TransactionFlags,
    releasever: Option<String>,
    rpm_verbosity: RpmVerbosity,
    check_transaction: bool,
    check_disk_space: bool,
    keep_cache: bool,
    pkgs_to_download: Vec<SolvableId>,
}

impl<'s> TransactionDriver<'s> {
    /// A driver over `sack` and the given collaborators.
    pub fn new(
        sack: &'s Sack,
        ts: Box<dyn RpmRuntime>,
        keyring: Box<dyn Keyring>,
        db: Box<dyn ReasonStore>,
    ) -> TransactionDriver<'s> {
        TransactionDriver {
            sack,
            ts,
            keyring,
            db,
            uid: 0,
            flags: TransactionFlags::default(),
            releasever: None,
            rpm_verbosity: RpmVerbosity::default(),
            check_transaction: true,
            check_disk_space: true,
            keep_cache: false,
            pkgs_to_download: Vec::new(),
        }
    }

    /// Records who started the transaction.
    pub fn set_uid(&mut self, uid: u32) {
        self.uid = uid;
    }

    /// Sets the behaviour flags.
    pub fn set_flags(&mut self, flags: TransactionFlags) {
        self.flags = flags;
    }

    /// The behaviour flags.
    pub fn flags(&self) -> TransactionFlags {
        self.flags
    }

    /// The release version written to the reason store per install.
    pub fn set_releasever(&mut self, releasever: &str) {
        self.releasever = Some(releasever.to_owned());
    }

    /// Sets the rpm log verbosity used during commits.
    pub fn set_rpm_verbosity(&mut self, verbosity: RpmVerbosity) {
        self.rpm_verbosity = verbosity;
    }

    /// Whether a test transaction runs before the real one.
    pub fn set_check_transaction(&mut self, check: bool) {
        self.check_transaction = check;
    }

    /// Whether rpm's disk space check stays enabled.
    pub fn set_check_disk_space(&mut self, check: bool) {
        self.check_disk_space = check;
    }

    /// Whether downloaded payloads survive a successful commit.
    pub fn set_keep_cache(&mut self, keep: bool) {
        self.keep_cache = keep;
    }

    /// The reason store in use.
    pub fn db(&self) -> &dyn ReasonStore {
        self.db.as_ref()
    }

    /// Depsolves the goal and works out which payloads are missing from
    /// the cache.
    pub fn depsolve(&mut self, goal: &mut Goal<'s>) -> Result<()> {
        goal.run_flags(GoalActions::ALLOW_UNINSTALL)?;
        self.pkgs_to_download.clear();

        let packages = gather_installs(goal)?;
        debug!(packages = packages.len(), "goal depsolved");
        for (pkg, _) in &packages {
            self.ensure_repo(pkg)?;
            if pkg.reponame() == CMDLINE_REPO_NAME {
                continue;
            }
            let path = self.local_path(pkg)?;
            if !cached_file_valid(&path, pkg) {
                self.pkgs_to_download.push(pkg.id());
            }
        }
        Ok(())
    }

    /// The packages [`TransactionDriver::download`] would fetch.
    pub fn remote_pkgs(&self) -> Vec<Package<'s>> {
        self.pkgs_to_download
            .iter()
            .map(|&id| self.sack.package(id))
            .collect()
    }

    /// Downloads the missing payloads through the host's downloader.
    pub fn download(&mut self, downloader: &mut dyn Downloader) -> Result<()> {
        self.check_free_space()?;
        let packages = self.remote_pkgs();
        downloader.download(&packages, self.sack.cachedir())
    }

    /// Commits the solved goal: the install and remove phases, ordering,
    /// the optional test transaction, the real run, the reason store
    /// write-back and the cache cleanup. The driver is reset on every
    /// exit path.
    pub fn commit(&mut self, goal: &Goal<'s>, progress: &mut dyn ProgressSink) -> Result<()> {
        let lock = self.take_lock();
        let result = match lock {
            Ok(lock_path) => {
                let result = self.commit_inner(goal, progress);
                let _ = fs::remove_file(lock_path);
                result
            }
            Err(e) => Err(e),
        };
        self.reset();
        result
    }

    fn take_lock(&self) -> Result<PathBuf> {
        db::ensure_dir(self.sack.cachedir())?;
        let path = self.sack.cachedir().join("rpmdb.lock");
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| Error::InternalError(format!("cannot take rpmdb lock: {e}")))?;
        Ok(path)
    }

    fn commit_inner(&mut self, goal: &Goal<'s>, progress: &mut dyn ProgressSink) -> Result<()> {
        self.keyring.add_public_keys()?;
        self.check_untrusted(goal)?;
        self.check_free_space()?;

        self.ts.set_verbosity(self.rpm_verbosity);
        self.ts.set_root(self.sack.rootdir())?;

        // phase 1: everything that gets written
        let mut install: Vec<TransItem> = Vec::new();
        for (pkg, action) in gather_installs(goal)? {
            self.ensure_repo(&pkg)?;
            let path = self.local_path(&pkg)?;
            let allow_untrusted = !self.flags.contains(TransactionFlags::ONLY_TRUSTED);
            let is_update = matches!(action, PackageAction::Update | PackageAction::Downgrade);
            self.ts.add_install_file(&path, allow_untrusted, is_update)?;
            install.push(TransItem::new(&pkg, action, Some(path)));
        }

        // phase 2: everything that gets removed; the pkgid is read now
        // because the sack is stale once the commit ran
        let mut remove: Vec<TransItem> = Vec::new();
        let removals = gather_removes(goal)?;
        for (pkg, action) in removals {
            let mut item = TransItem::new(&pkg, action, None);
            self.ts.add_remove(&item.header)?;
            if item.pkgid.is_none() {
                warn!(package = %item.package_id, "failed to pre-read pkgid");
            }
            if install.iter().any(|i| i.header.name == item.header.name) {
                item.action = PackageAction::Cleanup;
            }
            remove.push(item);
        }

        // phase 3: rpm auto-removes the displaced halves of updates; the
        // helper list maps them back to packages
        let mut remove_helper: Vec<TransItem> = Vec::new();
        for item in &install {
            if !matches!(item.action, PackageAction::Update | PackageAction::Downgrade) {
                continue;
            }
            let pkg = self.sack.package(item.id);
            for obsoleted in goal.list_obsoleted_by_package(&pkg) {
                remove_helper.push(TransItem::new(&obsoleted, PackageAction::Cleanup, None));
            }
        }

        // phase 4: map updated packages to their displaced predecessors
        let all_obsoleted: FxHashSet<SolvableId> = goal
            .list_obsoleted()?
            .into_iter()
            .map(|p| p.id())
            .collect();
        let mut erased_by: FxHashMap<String, SolvableId> = FxHashMap::default();
        for item in &install {
            if !matches!(
                item.action,
                PackageAction::Update | PackageAction::Downgrade | PackageAction::Reinstall
            ) {
                continue;
            }
            let pkg = self.sack.package(item.id);
            for obsoleted in goal.list_obsoleted_by_package(&pkg) {
                if !all_obsoleted.contains(&obsoleted.id()) {
                    erased_by.insert(item.package_id.clone(), obsoleted.id());
                }
            }
        }

        // phase 5: ordering and the optional test transaction
        self.ts.order();

        let mut state = CallbackState {
            install,
            remove,
            remove_helper,
            step: TransactionStep::Started,
            last_progress: 0,
            timer: Instant::now(),
        };

        if self.check_transaction {
            debug!("running test transaction");
            state.step = TransactionStep::Ignore;
            let problems = self.ts.check(&mut |event| state.handle(event, &mut *progress));
            if !problems.is_empty() {
                return Err(Error::FileInvalid(format!(
                    "transaction check problems: {}",
                    problems.join("; ")
                )));
            }
        }

        // phase 6: the real (or test-mode) run
        let mut filter = ProblemsFilter::default();
        if !self.check_disk_space {
            filter = filter | ProblemsFilter::DISKSPACE;
        }
        if self.flags.contains(TransactionFlags::ALLOW_REINSTALL) {
            filter = filter | ProblemsFilter::REPLACEPKG;
        }
        if self.flags.contains(TransactionFlags::ALLOW_DOWNGRADE) {
            filter = filter | ProblemsFilter::OLDPACKAGE;
        }
        let mut rpm_flags = RpmTransFlags::default();
        if self.flags.contains(TransactionFlags::NODOCS) {
            rpm_flags = rpm_flags | RpmTransFlags::NODOCS;
        }

        if self.flags.contains(TransactionFlags::TEST) {
            rpm_flags = rpm_flags | RpmTransFlags::TEST;
            state.step = TransactionStep::Ignore;
            debug!("running transaction in test mode");
            let problems = self
                .ts
                .run(filter, rpm_flags, &mut |event| state.handle(event, &mut *progress))?;
            if !problems.is_empty() {
                return Err(Error::FileInvalid(format!(
                    "transaction test problems: {}",
                    problems.join("; ")
                )));
            }
            return Ok(());
        }

        state.step = TransactionStep::Started;
        debug!("running actual transaction");
        let problems = self
            .ts
            .run(filter, rpm_flags, &mut |event| state.handle(event, &mut *progress))?;
        if !problems.is_empty() {
            return Err(Error::FileInvalid(format!(
                "transaction problems: {}",
                problems.join("; ")
            )));
        }
        if state.step != TransactionStep::Writing {
            return Err(Error::InternalError(format!(
                "transaction did not reach the writing phase, but returned no error ({:?})",
                state.step
            )));
        }

        // phase 7: reason store write-back, then cache cleanup
        self.write_reason_db(goal, &state.install, &state.remove, &state.remove_helper, &erased_by)?;
        if !self.keep_cache {
            self.delete_cached(&state.install)?;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.pkgs_to_download.clear();
        self.ts.clear();
    }

    fn ensure_repo(&self, pkg: &Package<'_>) -> Result<()> {
        if pkg.installed() || pkg.reponame() == CMDLINE_REPO_NAME {
            return Ok(());
        }
        if self.sack.repo(pkg.reponame()).is_none() {
            return Err(Error::InternalError(format!(
                "failed to ensure {} as repo {} not found ({} repos loaded)",
                pkg.name(),
                pkg.reponame(),
                self.sack.repos().len()
            )));
        }
        Ok(())
    }

    fn local_path(&self, pkg: &Package<'_>) -> Result<PathBuf> {
        if pkg.reponame() == CMDLINE_REPO_NAME {
            return pkg
                .location()
                .map(PathBuf::from)
                .ok_or_else(|| Error::FileNotFound(format!("no local file for {}", pkg.nevra())));
        }
        let file_name = pkg
            .location()
            .and_then(|l| Path::new(l).file_name().map(|f| f.to_owned()))
            .unwrap_or_else(|| format!("{}.rpm", pkg.nevra()).into());
        Ok(self
            .sack
            .cachedir()
            .join(pkg.reponame())
            .join(file_name))
    }

    fn check_untrusted(&mut self, goal: &Goal<'s>) -> Result<()> {
        let packages = gather_installs(goal)?;
        if packages.is_empty() {
            return Ok(());
        }
        for (pkg, _) in &packages {
            self.ensure_repo(pkg)?;
            let path = self.local_path(pkg)?;
            if !path.exists() {
                return Err(Error::FileNotFound(format!(
                    "downloaded file for {} not found",
                    pkg.name()
                )));
            }
            match self.keyring.check_untrusted_file(&path) {
                Ok(()) => {}
                Err(Error::GpgSignatureInvalid(message)) => {
                    let repo = self.sack.repo(pkg.reponame());
                    if repo.map(|r| r.gpgcheck()).unwrap_or(false) {
                        return Err(Error::FileInvalid(format!(
                            "package {} cannot be verified and repo {} is GPG enabled: {message}",
                            pkg.nevra(),
                            pkg.reponame()
                        )));
                    }
                    if self.flags.contains(TransactionFlags::ONLY_TRUSTED) {
                        return Err(Error::GpgSignatureInvalid(message));
                    }
                    debug!(package = %pkg.nevra(), "ignoring as allow-untrusted: {message}");
                }
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    fn check_free_space(&self) -> Result<()> {
        let download_size: u64 = self
            .pkgs_to_download
            .iter()
            .map(|&id| self.sack.package(id).download_size())
            .sum();
        if download_size == 0 {
            return Ok(());
        }
        let free = free_space_at(self.sack.cachedir())?;
        if free < download_size {
            return Err(Error::NoSpace {
                cachedir: self.sack.cachedir().display().to_string(),
                needed: format_size(download_size),
                available: format_size(free),
            });
        }
        Ok(())
    }

    fn write_reason_db(
        &mut self,
        goal: &Goal<'s>,
        install: &[TransItem],
        remove: &[TransItem],
        remove_helper: &[TransItem],
        erased_by: &FxHashMap<String, SolvableId>,
    ) -> Result<()> {
        for item in install {
            if item.pkgid.is_none() {
                return Err(Error::InternalError(format!(
                    "no reason store entry for {} as no pkgid",
                    item.package_id
                )));
            }
            let pkg = self.sack.package(item.id);
            self.db
                .set_string(&item.package_id, KEY_FROM_REPO, pkg.reponame())?;
            self.db
                .set_string(&item.package_id, KEY_INSTALLED_BY, &self.uid.to_string())?;
            let reason = self.propagated_reason(goal, item, erased_by)?;
            self.db.set_string(&item.package_id, KEY_REASON, &reason)?;
            if let Some(releasever) = self.releasever.clone() {
                self.db
                    .set_string(&item.package_id, KEY_RELEASEVER, &releasever)?;
            }
        }
        for item in remove.iter().chain(remove_helper) {
            self.db.remove_all(&item.package_id)?;
        }
        Ok(())
    }

    fn propagated_reason(
        &self,
        goal: &Goal<'s>,
        item: &TransItem,
        erased_by: &FxHashMap<String, SolvableId>,
    ) -> Result<String> {
        let pkg = self.sack.package(item.id);

        // install-only packages (the kernel) always read as user intent
        if pkg.is_installonly() {
            return Ok("user".to_owned());
        }

        if matches!(
            item.action,
            PackageAction::Update | PackageAction::Downgrade | PackageAction::Reinstall
        ) {
            if let Some(&old) = erased_by.get(&item.package_id) {
                let old_id = self.sack.package(old).package_id();
                if let Some(reason) = self.db.get_string(&old_id, KEY_REASON)? {
                    debug!(
                        from = %old_id,
                        to = %item.package_id,
                        reason,
                        "propagating stored reason"
                    );
                    return Ok(reason);
                }
            }
            return Ok("dep".to_owned());
        }

        if goal.reason(&pkg) == Reason::User {
            Ok("user".to_owned())
        } else {
            Ok("dep".to_owned())
        }
    }

    fn delete_cached(&self, install: &[TransItem]) -> Result<()> {
        let cachedir = self.sack.cachedir();
        for item in install {
            let Some(filename) = &item.filename else {
                continue;
            };
            // only payloads inside the cache are ours to delete
            if !filename.starts_with(cachedir) {
                continue;
            }
            fs::remove_file(filename)
                .map_err(|e| Error::FileInvalid(format!("{}: {e}", filename.display())))?;
        }
        Ok(())
    }
}

struct CallbackState {
    install: Vec<TransItem>,
    remove: Vec<TransItem>,
    remove_helper: Vec<TransItem>,
    step: TransactionStep,
    last_progress: u64,
    timer: Instant,
}

impl CallbackState {
    fn handle(&mut self, event: RpmEvent, progress: &mut dyn ProgressSink) {
        match event {
            RpmEvent::InstStart { key, header, .. } => {
                self.step = TransactionStep::Writing;
                let Some(idx) = position_by_filename(&self.install, &key) else {
                    warn!(key, "cannot find package in inst-start");
                    return;
                };
                let item = &mut self.install[idx];
                if item.pkgid.is_none() {
                    item.pkgid = header.and_then(|h| h.sha1header);
                }
                progress.action_start(item.action, &item.package_id);
                debug!(package = %item.package_id, "install start");
            }
            RpmEvent::UninstStart { header, key } => {
                self.step = TransactionStep::Writing;
                match self.find_remove(header.as_ref(), key.as_deref()) {
                    Some((helper, idx)) => {
                        let item = if helper {
                            &self.remove_helper[idx]
                        } else {
                            &self.remove[idx]
                        };
                        progress.action_start(item.action, &item.package_id);
                        debug!(package = %item.package_id, "remove start");
                    }
                    None => warn!("cannot find package in uninst-start"),
                }
            }
            RpmEvent::TransStart { total } => {
                debug!(total, "preparing transaction");
                if self.step != TransactionStep::Ignore {
                    self.step = TransactionStep::Preparing;
                }
            }
            RpmEvent::TransStop => {}
            RpmEvent::TransProgress { amount, total } => {
                if self.preparing(amount, total) {
                    return;
                }
                self.tick(amount, progress);
                progress.set_percentage(percentage(amount, total));
            }
            RpmEvent::InstProgress {
                key,
                header,
                amount,
                total,
            } => {
                if self.preparing(amount, total) {
                    return;
                }
                self.tick(amount, progress);
                let pct = percentage(amount, total);
                progress.set_percentage(pct);
                let idx = header
                    .as_ref()
                    .and_then(|h| position_by_header(&self.install, h))
                    .or_else(|| position_by_filename(&self.install, &key));
                match idx {
                    Some(idx) => {
                        let item = &self.install[idx];
                        progress.package_progress(&item.package_id, item.action, pct);
                    }
                    None => debug!(key, "cannot find package for install progress"),
                }
            }
            RpmEvent::UninstProgress {
                header,
                amount,
                total,
            } => {
                if self.preparing(amount, total) {
                    return;
                }
                let pct = percentage(amount, total);
                progress.set_percentage(pct);
                if let Some((helper, idx)) = self.find_remove(header.as_ref(), None) {
                    let item = if helper {
                        &self.remove_helper[idx]
                    } else {
                        &self.remove[idx]
                    };
                    progress.package_progress(&item.package_id, item.action, pct);
                }
            }
            RpmEvent::InstStop { .. } | RpmEvent::UninstStop => progress.action_stop(),
            RpmEvent::ScriptError { message } => warn!(message, "scriptlet error"),
        }
    }

    fn preparing(&self, amount: u64, total: u64) -> bool {
        if matches!(self.step, TransactionStep::Preparing | TransactionStep::Ignore) {
            debug!(amount, total, "ignoring preparation progress");
            true
        } else {
            false
        }
    }

    fn tick(&mut self, amount: u64, progress: &mut dyn ProgressSink) {
        let elapsed = self.timer.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let speed = (amount.saturating_sub(self.last_progress) as f64 / elapsed) as u64;
            progress.set_speed(speed);
        }
        self.last_progress = amount;
        self.timer = Instant::now();
    }

    /// Locates a removal: by full header, then by callback key, then by
    /// bare name, falling back to the helper list for the removals rpm
    /// added on its own. Returns `(in_helper_list, index)`.
    fn find_remove(&self, header: Option<&HeaderInfo>, key: Option<&str>) -> Option<(bool, usize)> {
        if let Some(h) = header {
            if let Some(idx) = position_by_header(&self.remove, h) {
                return Some((false, idx));
            }
        }
        if let Some(key) = key {
            if let Some(idx) = position_by_filename(&self.remove, key) {
                return Some((false, idx));
            }
        }
        let name = header.map(|h| h.name.as_str())?;
        if let Some(idx) = self.remove.iter().position(|i| i.header.name == name) {
            return Some((false, idx));
        }
        self.remove_helper
            .iter()
            .position(|i| i.header.name == name)
            .map(|idx| (true, idx))
    }
}

fn percentage(amount: u64, total: u64) -> u32 {
    ((amount as f64 / total.max(1) as f64) * 100.0) as u32
}

fn position_by_filename(items: &[TransItem], key: &str) -> Option<usize> {
    items.iter().position(|i| {
        i.filename
            .as_ref()
            .map(|f| {
                let name = f.to_string_lossy();
                name.ends_with(key) || key.ends_with(&*name)
            })
            .unwrap_or(false)
    })
}

fn position_by_header(items: &[TransItem], header: &HeaderInfo) -> Option<usize> {
    items.iter().position(|i| {
        i.header.name == header.name
            && i.header.version == header.version
            && i.header.release == header.release
            && i.header.arch == header.arch
            && i.header.epoch.unwrap_or(0) == header.epoch.unwrap_or(0)
    })
}

fn gather_installs<'s>(goal: &Goal<'s>) -> Result<Vec<(Package<'s>, PackageAction)>> {
    let mut out = Vec::new();
    for pkg in goal.list_installs()? {
        out.push((pkg, PackageAction::Install));
    }
    for pkg in goal.list_reinstalls()? {
        out.push((pkg, PackageAction::Reinstall));
    }
    for pkg in goal.list_downgrades()? {
        out.push((pkg, PackageAction::Downgrade));
    }
    for pkg in goal.list_upgrades()? {
        out.push((pkg, PackageAction::Update));
    }
    Ok(out)
}

fn gather_removes<'s>(goal: &Goal<'s>) -> Result<Vec<(Package<'s>, PackageAction)>> {
    let mut out = Vec::new();
    for pkg in goal.list_obsoleted()? {
        out.push((pkg, PackageAction::Obsolete));
    }
    for pkg in goal.list_erasures()? {
        out.push((pkg, PackageAction::Remove));
    }
    Ok(out)
}

fn cached_file_valid(path: &Path, pkg: &Package<'_>) -> bool {
    match fs::metadata(path) {
        Ok(metadata) => pkg.download_size() == 0 || metadata.len() == pkg.download_size(),
        Err(_) => false,
    }
}

fn free_space_at(path: &Path) -> Result<u64> {
    let stat = nix::sys::statvfs::statvfs(path)
        .map_err(|e| Error::FileInvalid(format!("{}: {e}", path.display())))?;
    Ok(stat.blocks_available() as u64 * stat.fragment_size() as u64)
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
