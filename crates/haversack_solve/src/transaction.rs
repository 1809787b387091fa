use std::cmp::Ordering;
use std::ops::BitOr;

use fxhash::FxHashMap;

use crate::id::SolvableId;
use crate::pool::Pool;

/// Rendering-mode bits for [`Transaction::step_type`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionMode(u32);

impl TransactionMode {
    /// Report the incoming side of replacements instead of hiding it.
    pub const SHOW_ACTIVE: TransactionMode = TransactionMode(1 << 0);
    /// Report every step, including no-op sides.
    pub const SHOW_ALL: TransactionMode = TransactionMode(1 << 1);
    /// Distinguish obsoletions from plain erases and installs.
    pub const SHOW_OBSOLETES: TransactionMode = TransactionMode(1 << 2);
    /// Report a same-EVR replacement as a reinstall.
    pub const CHANGE_IS_REINSTALL: TransactionMode = TransactionMode(1 << 3);

    /// True when every bit of `other` is set.
    pub fn contains(self, other: TransactionMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TransactionMode {
    type Output = TransactionMode;

    fn bitor(self, rhs: TransactionMode) -> TransactionMode {
        TransactionMode(self.0 | rhs.0)
    }
}

/// The classified role of one step under a given rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepType {
    /// Hidden under the current mode.
    Ignore,
    /// A fresh install.
    Install,
    /// The incoming side of a same-EVR replacement.
    Reinstall,
    /// The incoming side of an upgrade.
    Upgrade,
    /// The incoming side of a downgrade.
    Downgrade,
    /// An install that displaces differently named packages.
    Obsoletes,
    /// A plain removal.
    Erase,
    /// The outgoing side of a same-EVR replacement.
    Reinstalled,
    /// The outgoing side of an upgrade.
    Upgraded,
    /// The outgoing side of a downgrade.
    Downgraded,
    /// Displaced by a differently named package.
    Obsoleted,
}

#[derive(Debug, Clone)]
pub(crate) enum StepData {
    Install { replaces: Vec<SolvableId> },
    Erase { replaced_by: Option<SolvableId> },
}

/// The ordered outcome of a successful solve: one step per solvable that
/// enters or leaves the system, classified on demand via
/// [`Transaction::step_type`].
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    pub(crate) steps: Vec<SolvableId>,
    pub(crate) data: FxHashMap<SolvableId, StepData>,
}

impl Transaction {
    /// The steps in decision order.
    pub fn steps(&self) -> &[SolvableId] {
        &self.steps
    }

    /// True when the transaction changes nothing.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The packages displaced by the incoming package `id`: its upgraded,
    /// downgraded, reinstalled or obsoleted predecessors.
    pub fn obs_pkgs(&self, id: SolvableId) -> &[SolvableId] {
        match self.data.get(&id) {
            Some(StepData::Install { replaces }) => replaces,
            _ => &[],
        }
    }

    /// Classifies one step under `mode`.
    pub fn step_type(&self, pool: &Pool, id: SolvableId, mode: TransactionMode) -> StepType {
        match self.data.get(&id) {
            None => StepType::Ignore,
            Some(StepData::Install { replaces }) => {
                if replaces.is_empty() {
                    return StepType::Install;
                }
                if !mode.contains(TransactionMode::SHOW_ACTIVE) {
                    return StepType::Ignore;
                }
                let name = pool.solvable(id).name;
                match replaces.iter().find(|&&q| pool.solvable(q).name == name) {
                    Some(&q) => {
                        match pool.evrcmp_ids(pool.solvable(id).evr, pool.solvable(q).evr) {
                            Ordering::Greater => StepType::Upgrade,
                            Ordering::Less => StepType::Downgrade,
                            Ordering::Equal => StepType::Reinstall,
                        }
                    }
                    None if mode.contains(TransactionMode::SHOW_OBSOLETES) => StepType::Obsoletes,
                    None => StepType::Install,
                }
            }
            Some(StepData::Erase { replaced_by: None }) => StepType::Erase,
            Some(StepData::Erase {
                replaced_by: Some(p),
            }) => {
                let name = pool.solvable(id).name;
                if pool.solvable(*p).name == name {
                    match pool.evrcmp_ids(pool.solvable(*p).evr, pool.solvable(id).evr) {
                        Ordering::Greater => StepType::Upgraded,
                        Ordering::Less => StepType::Downgraded,
                        Ordering::Equal => StepType::Reinstalled,
                    }
                } else if mode.contains(TransactionMode::SHOW_OBSOLETES) {
                    StepType::Obsoleted
                } else {
                    StepType::Erase
                }
            }
        }
    }
}
