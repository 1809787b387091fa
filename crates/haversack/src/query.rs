use std::cmp::Ordering;

use fxhash::FxHashMap;
use haversack_solve::{DepKind, Map, SolvableId, StrMatcher, StringAttr};
use haversack_types::{evr, evr_cmp, CmpFlags, ReldepSpec};

use crate::errors::{Error, Result};
use crate::package::Package;
use crate::packageset::PackageSet;
use crate::sack::Sack;

/// The attributes a query filter can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Keyname {
    Pkg,
    All,
    Name,
    Arch,
    Epoch,
    Evr,
    Version,
    Release,
    Nevra,
    Summary,
    Description,
    Url,
    File,
    Location,
    Sourcerpm,
    Reponame,
    Provides,
    Requires,
    Conflicts,
    Obsoletes,
    Recommends,
    Suggests,
    Enhances,
    Supplements,
    Advisory,
    AdvisoryBug,
    AdvisoryCve,
    AdvisorySeverity,
    AdvisoryType,
}

impl Keyname {
    fn is_reldep(self) -> bool {
        matches!(
            self,
            Keyname::Provides
                | Keyname::Requires
                | Keyname::Conflicts
                | Keyname::Obsoletes
                | Keyname::Recommends
                | Keyname::Suggests
                | Keyname::Enhances
                | Keyname::Supplements
        )
    }

    fn is_advisory(self) -> bool {
        matches!(
            self,
            Keyname::Advisory
                | Keyname::AdvisoryBug
                | Keyname::AdvisoryCve
                | Keyname::AdvisorySeverity
                | Keyname::AdvisoryType
        )
    }

    fn dep_kind(self) -> Option<DepKind> {
        match self {
            Keyname::Provides => Some(DepKind::Provides),
            Keyname::Requires => Some(DepKind::Requires),
            Keyname::Conflicts => Some(DepKind::Conflicts),
            Keyname::Obsoletes => Some(DepKind::Obsoletes),
            Keyname::Recommends => Some(DepKind::Recommends),
            Keyname::Suggests => Some(DepKind::Suggests),
            Keyname::Enhances => Some(DepKind::Enhances),
            Keyname::Supplements => Some(DepKind::Supplements),
            _ => None,
        }
    }

    fn data_attr(self) -> Option<StringAttr> {
        match self {
            Keyname::Name => Some(StringAttr::Name),
            Keyname::Arch => Some(StringAttr::Arch),
            Keyname::Summary => Some(StringAttr::Summary),
            Keyname::Description => Some(StringAttr::Description),
            Keyname::Url => Some(StringAttr::Url),
            Keyname::File => Some(StringAttr::Filelist),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum MatchValue {
    Str(String),
    Num(i64),
    Reldep(ReldepSpec),
    Pkgs(PackageSet),
}

#[derive(Debug, Clone)]
struct Filter {
    keyname: Keyname,
    cmp: CmpFlags,
    matches: Vec<MatchValue>,
}

/// Construction flags for [`Query::with_flags`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryFlags {
    /// Evaluate against the whole pool, ignoring the sack's excludes,
    /// includes and disabled repositories.
    pub ignore_excludes: bool,
}

/// A composable, lazily evaluated filter pipeline over the sack.
///
/// Filters are staged with the `filter_*` family and only run when
/// [`Query::apply`] (or anything that materialises results) is called.
/// Staged filters are applied in insertion order; matches within one
/// filter are OR-combined.
#[derive(Clone)]
pub struct Query<'s> {
    sack: &'s Sack,
    flags: QueryFlags,
    filters: Vec<Filter>,
    result: Option<Map>,
    applied: bool,
    latest: bool,
    latest_per_arch: bool,
    downgradable: bool,
    downgrades: bool,
    updatable: bool,
    updates: bool,
}

impl<'s> Query<'s> {
    /// A query over everything the sack considers.
    pub fn new(sack: &'s Sack) -> Query<'s> {
        Query::with_flags(sack, QueryFlags::default())
    }

    /// A query with construction flags.
    pub fn with_flags(sack: &'s Sack, flags: QueryFlags) -> Query<'s> {
        Query {
            sack,
            flags,
            filters: Vec::new(),
            result: None,
            applied: false,
            latest: false,
            latest_per_arch: false,
            downgradable: false,
            downgrades: false,
            updatable: false,
            updates: false,
        }
    }

    /// The sack the query runs over.
    pub fn sack(&self) -> &'s Sack {
        self.sack
    }

    /// True when the staged filters have been evaluated and no new
    /// filter has been staged since.
    pub fn applied(&self) -> bool {
        self.applied
    }

    fn stage(&mut self, filter: Filter) {
        self.applied = false;
        self.filters.push(filter);
    }

    /// Stages a single-string filter.
    pub fn filter(&mut self, keyname: Keyname, cmp: CmpFlags, m: &str) -> Result<()> {
        self.filter_in(keyname, cmp, &[m])
    }

    /// Stages a string filter with several OR-combined matches.
    pub fn filter_in(&mut self, keyname: Keyname, cmp: CmpFlags, matches: &[&str]) -> Result<()> {
        valid_filter_str(keyname, cmp)?;
        if keyname.is_reldep() {
            return self.filter_reldep_strs(keyname, cmp, matches);
        }
        self.stage(Filter {
            keyname,
            cmp,
            matches: matches.iter().map(|m| MatchValue::Str(m.to_string())).collect(),
        });
        Ok(())
    }

    fn filter_reldep_strs(
        &mut self,
        keyname: Keyname,
        cmp: CmpFlags,
        matches: &[&str],
    ) -> Result<()> {
        if cmp.without_not() == CmpFlags::GLOB {
            // expand the globs over all capability names known to the pool
            let pool = self.sack.pool();
            let mut specs = Vec::new();
            for pattern in matches {
                let matcher = StrMatcher::new(pattern, CmpFlags::GLOB);
                for id in pool.solvables() {
                    for &dep in pool.solvable(id).deps(DepKind::Provides) {
                        let spec = pool.reldep_spec(dep);
                        if matcher.matches(&spec.name) {
                            specs.push(ReldepSpec::unversioned(spec.name));
                        }
                    }
                }
            }
            specs.sort_by(|a, b| a.name.cmp(&b.name));
            specs.dedup_by(|a, b| a.name == b.name);
            return self.filter_reldeps(keyname, specs);
        }
        let mut specs = Vec::new();
        for m in matches {
            match m.parse::<ReldepSpec>() {
                Ok(spec) => specs.push(spec),
                Err(_) => {
                    self.filter_empty();
                    return Ok(());
                }
            }
        }
        let mut filter = Filter {
            keyname,
            cmp: CmpFlags::EQ,
            matches: specs.into_iter().map(MatchValue::Reldep).collect(),
        };
        // negation stays on the filter; it resolves at evaluation time
        if cmp.contains(CmpFlags::NOT) {
            filter.cmp = CmpFlags::NEQ;
        }
        self.stage(filter);
        Ok(())
    }

    /// Stages a numeric filter.
    pub fn filter_num(&mut self, keyname: Keyname, cmp: CmpFlags, m: i64) -> Result<()> {
        self.filter_num_in(keyname, cmp, &[m])
    }

    /// Stages a numeric filter with several OR-combined matches.
    pub fn filter_num_in(&mut self, keyname: Keyname, cmp: CmpFlags, matches: &[i64]) -> Result<()> {
        valid_filter_num(keyname, cmp)?;
        self.stage(Filter {
            keyname,
            cmp,
            matches: matches.iter().map(|&m| MatchValue::Num(m)).collect(),
        });
        Ok(())
    }

    /// Stages a packageset filter.
    pub fn filter_package_set(
        &mut self,
        keyname: Keyname,
        cmp: CmpFlags,
        set: &PackageSet,
    ) -> Result<()> {
        valid_filter_pkg(keyname, cmp)?;
        self.stage(Filter {
            keyname,
            cmp,
            matches: vec![MatchValue::Pkgs(set.clone())],
        });
        Ok(())
    }

    /// Stages a dependency filter.
    pub fn filter_reldep(&mut self, keyname: Keyname, spec: ReldepSpec) -> Result<()> {
        self.filter_reldeps(keyname, vec![spec])
    }

    /// Stages a dependency filter with several OR-combined matches.
    pub fn filter_reldeps(&mut self, keyname: Keyname, specs: Vec<ReldepSpec>) -> Result<()> {
        if !keyname.is_reldep() {
            return Err(Error::BadQuery(format!(
                "{keyname:?} does not accept dependency matches"
            )));
        }
        self.stage(Filter {
            keyname,
            cmp: CmpFlags::EQ,
            matches: specs.into_iter().map(MatchValue::Reldep).collect(),
        });
        Ok(())
    }

    /// Stages a provides filter from name, comparison and EVR.
    pub fn filter_provides(&mut self, cmp: CmpFlags, name: &str, evr: &str) -> Result<()> {
        self.filter_reldep(Keyname::Provides, ReldepSpec::versioned(name, cmp, evr))
    }

    /// Stages a requires filter; negation is preserved on the filter.
    pub fn filter_requires(&mut self, cmp: CmpFlags, name: &str, evr: &str) -> Result<()> {
        let spec = ReldepSpec::versioned(name, cmp.without_not(), evr);
        self.filter_reldep(Keyname::Requires, spec)?;
        if cmp.contains(CmpFlags::NOT) {
            if let Some(last) = self.filters.last_mut() {
                last.cmp = CmpFlags::NEQ;
            }
        }
        Ok(())
    }

    /// Forces the result to be empty, whatever else is staged.
    pub fn filter_empty(&mut self) {
        self.stage(Filter {
            keyname: Keyname::All,
            cmp: CmpFlags::EQ,
            matches: vec![MatchValue::Num(-1)],
        });
    }

    /// Narrows to installed packages for which a downgrade exists.
    pub fn filter_downgradable(&mut self, value: bool) {
        self.applied = false;
        self.downgradable = value;
    }

    /// Narrows to packages that downgrade an installed package.
    pub fn filter_downgrades(&mut self, value: bool) {
        self.applied = false;
        self.downgrades = value;
    }

    /// Narrows to installed packages for which an upgrade exists.
    pub fn filter_upgradable(&mut self, value: bool) {
        self.applied = false;
        self.updatable = value;
    }

    /// Narrows to packages that upgrade an installed package.
    pub fn filter_upgrades(&mut self, value: bool) {
        self.applied = false;
        self.updates = value;
    }

    /// Keeps only the highest-EVR package per name.
    pub fn filter_latest(&mut self, value: bool) {
        self.applied = false;
        self.latest_per_arch = false;
        self.latest = value;
    }

    /// Keeps only the highest-EVR package per `(name, arch)`.
    pub fn filter_latest_per_arch(&mut self, value: bool) {
        self.applied = false;
        self.latest_per_arch = true;
        self.latest = value;
    }

    fn init_result(&self) -> Map {
        let pool = self.sack.pool();
        let mut result: Map = pool.solvables().collect();
        if !self.flags.ignore_excludes {
            if let Some(considered) = self.sack.considered_map() {
                result.intersect_with(&considered);
            }
        }
        result
    }

    /// Evaluates all staged filters into the result bitmap. Idempotent;
    /// the staged filter list is consumed.
    pub fn apply(&mut self) {
        if self.applied {
            return;
        }
        let mut result = match self.result.take() {
            Some(result) => result,
            None => self.init_result(),
        };

        let filters = std::mem::take(&mut self.filters);
        for f in &filters {
            let m = self.filter_map(f, &result);
            if f.cmp.contains(CmpFlags::NOT) {
                result.subtract(&m);
            } else {
                result.intersect_with(&m);
            }
        }

        if self.downgradable {
            self.filter_updown_able(&mut result, true);
        }
        if self.downgrades {
            self.filter_updown(&mut result, true);
        }
        if self.updatable {
            self.filter_updown_able(&mut result, false);
        }
        if self.updates {
            self.filter_updown(&mut result, false);
        }
        if self.latest {
            self.filter_latest_map(&mut result);
        }

        self.result = Some(result);
        self.applied = true;
    }

    /// Materialises the query as packages.
    pub fn run(&mut self) -> Vec<Package<'s>> {
        self.apply();
        let sack = self.sack;
        self.result
            .as_ref()
            .map(|r| r.iter().map(|id| sack.package(id)).collect())
            .unwrap_or_default()
    }

    /// Materialises the query as a packageset.
    pub fn run_set(&mut self) -> PackageSet {
        self.apply();
        PackageSet::from_map(self.result.clone().unwrap_or_default())
    }

    /// The number of matching packages.
    pub fn count(&mut self) -> usize {
        self.apply();
        self.result.as_ref().map(Map::len).unwrap_or(0)
    }

    /// Unites with `other` (logical or). Both sides are applied first.
    pub fn union(&mut self, other: &mut Query<'_>) {
        self.apply();
        other.apply();
        if let (Some(a), Some(b)) = (self.result.as_mut(), other.result.as_ref()) {
            a.union_with(b);
        }
    }

    /// Intersects with `other` (logical and).
    pub fn intersection(&mut self, other: &mut Query<'_>) {
        self.apply();
        other.apply();
        if let (Some(a), Some(b)) = (self.result.as_mut(), other.result.as_ref()) {
            a.intersect_with(b);
        }
    }

    /// Subtracts `other` (self and not other).
    pub fn difference(&mut self, other: &mut Query<'_>) {
        self.apply();
        other.apply();
        if let (Some(a), Some(b)) = (self.result.as_mut(), other.result.as_ref()) {
            a.subtract(b);
        }
    }

    fn filter_map(&self, f: &Filter, result: &Map) -> Map {
        let pool = self.sack.pool();
        let mut m = Map::with_capacity(pool.nsolvables());
        match f.keyname {
            Keyname::Pkg => {
                for v in &f.matches {
                    if let MatchValue::Pkgs(set) = v {
                        m.union_with(set.as_map());
                    }
                }
            }
            Keyname::All => {
                // the sentinel filter leaves the map empty
            }
            Keyname::Epoch => self.filter_epoch(f, result, &mut m),
            Keyname::Evr => self.filter_evr(f, result, &mut m),
            Keyname::Version => self.filter_version_release(f, result, &mut m, true),
            Keyname::Release => self.filter_version_release(f, result, &mut m, false),
            Keyname::Nevra => self.filter_nevra(f, result, &mut m),
            Keyname::Location => self.filter_location(f, result, &mut m),
            Keyname::Sourcerpm => self.filter_sourcerpm(f, result, &mut m),
            Keyname::Reponame => self.filter_reponame(f, result, &mut m),
            Keyname::Obsoletes if matches!(f.matches.first(), Some(MatchValue::Pkgs(_))) => {
                self.filter_obsoletes_set(f, result, &mut m);
            }
            Keyname::Provides => self.filter_provides_reldep(f, &mut m),
            _ if f.keyname.is_reldep() => self.filter_rco_reldep(f, result, &mut m),
            _ if f.keyname.is_advisory() => self.filter_advisory(f, result, &mut m),
            _ => self.filter_dataiterator(f, &mut m),
        }
        m
    }

    fn filter_dataiterator(&self, f: &Filter, m: &mut Map) {
        let pool = self.sack.pool();
        let attr = f
            .keyname
            .data_attr()
            .expect("string filters address a data attribute");
        for v in &f.matches {
            if let MatchValue::Str(pattern) = v {
                let matcher = StrMatcher::new(pattern, f.cmp.without_not());
                for id in pool.search(attr, &matcher) {
                    m.set(id);
                }
            }
        }
    }

    fn filter_epoch(&self, f: &Filter, result: &Map, m: &mut Map) {
        let pool = self.sack.pool();
        for v in &f.matches {
            let MatchValue::Num(wanted) = v else { continue };
            for id in result.iter() {
                // an absent epoch is the sentinel -1, distinct from 0
                let pkg_epoch = pool.epoch_opt(id).map(|e| e as i64).unwrap_or(-1);
                let hit = match pkg_epoch.cmp(wanted) {
                    Ordering::Greater => f.cmp.contains(CmpFlags::GT),
                    Ordering::Less => f.cmp.contains(CmpFlags::LT),
                    Ordering::Equal => f.cmp.contains(CmpFlags::EQ),
                };
                if hit {
                    m.set(id);
                }
            }
        }
    }

    fn filter_evr(&self, f: &Filter, result: &Map, m: &mut Map) {
        let pool = self.sack.pool();
        for v in &f.matches {
            let MatchValue::Str(wanted) = v else { continue };
            for id in result.iter() {
                let hit = match evr_cmp(pool.evr_str(id), wanted) {
                    Ordering::Greater => f.cmp.contains(CmpFlags::GT),
                    Ordering::Less => f.cmp.contains(CmpFlags::LT),
                    Ordering::Equal => f.cmp.contains(CmpFlags::EQ),
                };
                if hit {
                    m.set(id);
                }
            }
        }
    }

    fn filter_version_release(&self, f: &Filter, result: &Map, m: &mut Map, version: bool) {
        let pool = self.sack.pool();
        for v in &f.matches {
            let MatchValue::Str(wanted) = v else { continue };
            // anchoring the other field with 0 keeps it out of the compare
            let anchored_want = if version {
                format!("{wanted}-0")
            } else {
                format!("0-{wanted}")
            };
            let glob = f.cmp.without_modifiers() == CmpFlags::GLOB;
            let matcher = glob.then(|| StrMatcher::new(wanted, f.cmp.without_not()));
            for id in result.iter() {
                let evr_str = pool.evr_str(id);
                let (_, ver, rel) = evr::split_evr(evr_str);
                let field = if version { ver } else { rel.unwrap_or("") };
                if let Some(matcher) = &matcher {
                    if matcher.matches(field) {
                        m.set(id);
                    }
                    continue;
                }
                let anchored = if version {
                    format!("{field}-0")
                } else {
                    format!("0-{field}")
                };
                let hit = match evr_cmp(&anchored, &anchored_want) {
                    Ordering::Greater => f.cmp.contains(CmpFlags::GT),
                    Ordering::Less => f.cmp.contains(CmpFlags::LT),
                    Ordering::Equal => f.cmp.contains(CmpFlags::EQ),
                };
                if hit {
                    m.set(id);
                }
            }
        }
    }

    fn filter_nevra(&self, f: &Filter, result: &Map, m: &mut Map) {
        let pool = self.sack.pool();
        let matchers: Vec<StrMatcher> = f
            .matches
            .iter()
            .filter_map(|v| match v {
                MatchValue::Str(s) => Some(StrMatcher::new(s, f.cmp.without_not())),
                _ => None,
            })
            .collect();
        for id in result.iter() {
            let nevra = pool.nevra(id);
            if matchers.iter().any(|matcher| matcher.matches(&nevra)) {
                m.set(id);
            }
        }
    }

    fn filter_location(&self, f: &Filter, result: &Map, m: &mut Map) {
        let pool = self.sack.pool();
        for v in &f.matches {
            let MatchValue::Str(wanted) = v else { continue };
            for id in result.iter() {
                if pool.solvable(id).location() == Some(wanted.as_str()) {
                    m.set(id);
                }
            }
        }
    }

    fn filter_sourcerpm(&self, f: &Filter, result: &Map, m: &mut Map) {
        for v in &f.matches {
            let MatchValue::Str(wanted) = v else { continue };
            for id in result.iter() {
                if self.sack.package(id).sourcerpm() == *wanted {
                    m.set(id);
                }
            }
        }
    }

    fn filter_reponame(&self, f: &Filter, result: &Map, m: &mut Map) {
        let pool = self.sack.pool();
        let mut wanted: FxHashMap<_, bool> = pool.repos().map(|r| (r, false)).collect();
        for v in &f.matches {
            let MatchValue::Str(name) = v else { continue };
            for repo in pool.repos() {
                if pool.repo_name(repo) == name {
                    wanted.insert(repo, true);
                }
            }
        }
        for id in result.iter() {
            if wanted.get(&pool.solvable(id).repo).copied().unwrap_or(false) {
                m.set(id);
            }
        }
    }

    fn filter_obsoletes_set(&self, f: &Filter, result: &Map, m: &mut Map) {
        let pool = self.sack.pool();
        let Some(MatchValue::Pkgs(target)) = f.matches.first() else {
            return;
        };
        pool.make_provides_ready();
        let strict = !pool.obsolete_uses_provides();
        for p in result.iter() {
            'deps: for &dep in pool.solvable(p).deps(DepKind::Obsoletes) {
                let spec = pool.reldep_spec(dep);
                for provider in pool.providers(&spec) {
                    if !target.contains_id(provider) {
                        continue;
                    }
                    if strict && !pool.match_nevr(provider, &spec) {
                        continue;
                    }
                    m.set(p);
                    break 'deps;
                }
            }
        }
    }

    fn filter_provides_reldep(&self, f: &Filter, m: &mut Map) {
        let pool = self.sack.pool();
        pool.make_provides_ready();
        for v in &f.matches {
            let MatchValue::Reldep(spec) = v else { continue };
            for id in pool.providers(spec) {
                m.set(id);
            }
        }
    }

    fn filter_rco_reldep(&self, f: &Filter, result: &Map, m: &mut Map) {
        let pool = self.sack.pool();
        let kind = f.keyname.dep_kind().expect("reldep keyname");
        for v in &f.matches {
            let MatchValue::Reldep(spec) = v else { continue };
            for id in result.iter() {
                let hit = pool
                    .solvable(id)
                    .deps(kind)
                    .iter()
                    .any(|&dep| pool.dep_matches(spec, dep));
                if hit {
                    m.set(id);
                }
            }
        }
    }

    fn filter_advisory(&self, f: &Filter, result: &Map, m: &mut Map) {
        let pool = self.sack.pool();
        // collect the NEVRAs shipped by every matched advisory, deduped
        let mut wanted: Vec<haversack_types::Nevra> = Vec::new();
        for advisory in pool.advisories() {
            for v in &f.matches {
                let MatchValue::Str(pattern) = v else { continue };
                let hit = match f.keyname {
                    Keyname::Advisory => advisory.id == *pattern,
                    Keyname::AdvisoryBug => advisory.bugs.iter().any(|b| b == pattern),
                    Keyname::AdvisoryCve => advisory.cves.iter().any(|c| c == pattern),
                    Keyname::AdvisoryType => advisory.kind == *pattern,
                    Keyname::AdvisorySeverity => advisory.severity.as_deref() == Some(pattern),
                    _ => false,
                };
                if hit {
                    for pkg in &advisory.packages {
                        if !wanted.contains(pkg) {
                            wanted.push(pkg.clone());
                        }
                    }
                }
            }
        }
        for id in result.iter() {
            if wanted.is_empty() {
                break;
            }
            let name = pool.name_str(id);
            let arch = pool.arch_str(id);
            let evr_str = pool.evr_str(id);
            let hit = wanted.iter().any(|w| {
                w.name == name
                    && w.arch.as_deref().map(|a| a == arch).unwrap_or(true)
                    && w.evr()
                        .map(|wevr| evr_cmp(&wevr, evr_str) == Ordering::Equal)
                        .unwrap_or(true)
            });
            if hit {
                m.set(id);
            }
        }
    }

    fn filter_updown(&self, result: &mut Map, downgrade: bool) {
        let pool = self.sack.pool();
        pool.make_provides_ready();
        let mut m = Map::with_capacity(pool.nsolvables());
        for id in result.iter() {
            if pool.is_installed(id) {
                continue;
            }
            let hit = if downgrade {
                pool.what_downgrades(id).is_some()
            } else {
                pool.what_upgrades(id).is_some()
            };
            if hit {
                m.set(id);
            }
        }
        result.intersect_with(&m);
    }

    fn filter_updown_able(&self, result: &mut Map, downgradable: bool) {
        let pool = self.sack.pool();
        pool.make_provides_ready();
        let mut m = Map::with_capacity(pool.nsolvables());
        for p in pool.solvables() {
            if pool.is_installed(p) {
                continue;
            }
            let what = if downgradable {
                pool.what_downgrades(p)
            } else {
                pool.what_upgrades(p)
            };
            if let Some(target) = what {
                if result.contains(target) {
                    m.set(target);
                }
            }
        }
        result.intersect_with(&m);
    }

    fn filter_latest_map(&self, result: &mut Map) {
        let pool = self.sack.pool();
        let per_arch = self.latest_per_arch;
        let mut best: FxHashMap<(haversack_solve::StringId, Option<haversack_solve::StringId>), SolvableId> =
            FxHashMap::default();
        for id in result.iter() {
            let s = pool.solvable(id);
            let key = (s.name, per_arch.then_some(s.arch));
            match best.entry(key) {
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(id);
                }
                std::collections::hash_map::Entry::Occupied(mut e) => {
                    let current = *e.get();
                    let ord = pool
                        .evrcmp_ids(pool.solvable(id).evr, pool.solvable(current).evr)
                        .then_with(|| id.cmp(&current));
                    if ord == Ordering::Greater {
                        e.insert(id);
                    }
                }
            }
        }
        let keep: Map = best.values().copied().collect();
        result.intersect_with(&keep);
    }
}

fn bad_query(keyname: Keyname, cmp: CmpFlags) -> Error {
    Error::BadQuery(format!("keyname {keyname:?} does not support comparison {cmp:?}"))
}

fn valid_filter_str(keyname: Keyname, cmp: CmpFlags) -> Result<()> {
    let base = cmp.without_not();
    let plain = base.without_modifiers();
    let ok = match keyname {
        Keyname::Location | Keyname::Sourcerpm | Keyname::Reponame => base == CmpFlags::EQ,
        Keyname::Nevra => matches!(plain, CmpFlags::EQ | CmpFlags::GLOB),
        Keyname::Evr => matches!(plain, CmpFlags::EQ | CmpFlags::GT | CmpFlags::LT),
        Keyname::Version | Keyname::Release => {
            matches!(plain, CmpFlags::EQ | CmpFlags::GT | CmpFlags::LT | CmpFlags::GLOB)
        }
        Keyname::Name
        | Keyname::Arch
        | Keyname::Summary
        | Keyname::Description
        | Keyname::Url
        | Keyname::File => matches!(plain, CmpFlags::EQ | CmpFlags::SUBSTR | CmpFlags::GLOB),
        _ if keyname.is_advisory() => base == CmpFlags::EQ,
        _ if keyname.is_reldep() => matches!(plain, CmpFlags::EQ | CmpFlags::GLOB),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(bad_query(keyname, cmp))
    }
}

fn valid_filter_num(keyname: Keyname, cmp: CmpFlags) -> Result<()> {
    let base = cmp.without_not();
    if base.intersects(CmpFlags::ICASE | CmpFlags::SUBSTR | CmpFlags::GLOB) {
        return Err(bad_query(keyname, cmp));
    }
    let ok = match keyname {
        Keyname::Epoch => matches!(base, CmpFlags::EQ | CmpFlags::GT | CmpFlags::LT),
        Keyname::All => base == CmpFlags::EQ,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(bad_query(keyname, cmp))
    }
}

fn valid_filter_pkg(keyname: Keyname, cmp: CmpFlags) -> Result<()> {
    let ok = matches!(keyname, Keyname::Pkg | Keyname::Obsoletes)
        && matches!(cmp, CmpFlags::EQ | CmpFlags::NEQ);
    if ok {
        Ok(())
    } else {
        Err(bad_query(keyname, cmp))
    }
}
