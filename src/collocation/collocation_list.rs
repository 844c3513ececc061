use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use log::info;
use serde::{Deserialize, Serialize};

use crate::collocation::{Collocation, CollocationStatus};
use crate::report::{Advisory, AdvisoryKind};
use crate::rotcol_errors::RotcolError;
use crate::time::time_system::{TimeStandard, TimeSystem};

/// Orderings of [`CollocationList::sorted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Occultation identifier.
    OccId,
    /// UTC time of the RO sounding.
    OccTime,
    /// UTC time of the nadir-scanner footprint.
    SounderTime,
}

impl FromStr for SortOrder {
    type Err = RotcolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "occid" => Ok(SortOrder::OccId),
            "occtime" => Ok(SortOrder::OccTime),
            "soundertime" => Ok(SortOrder::SounderTime),
            _ => Err(RotcolError::InvalidArgument(format!(
                "unrecognized sort order {s}"
            ))),
        }
    }
}

/// Suffix appended to the `k`-th repetition of a sort key: `a`..`z`, `za`..`zz`,
/// `zza`.. so that suffixed keys keep insertion order.
fn tie_suffix(k: usize) -> String {
    let mut suffix = "z".repeat(k / 26);
    suffix.push(char::from(b'a' + (k % 26) as u8));
    suffix
}

/// Ordered collocations, one per occultation identifier.
#[derive(Debug, Clone, Default)]
pub struct CollocationList {
    items: Vec<Collocation>,
}

impl CollocationList {
    pub fn new(items: Vec<Collocation>) -> Self {
        CollocationList { items }
    }

    pub fn push(&mut self, collocation: Collocation) {
        self.items.push(collocation);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Collocation> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Collocation> {
        self.items.iter_mut()
    }

    /// Collocation of an occultation, if any.
    pub fn get(&self, occid: &str) -> Option<&Collocation> {
        self.items.iter().find(|c| c.occid() == occid)
    }

    /// Occultation identifiers, in list order.
    pub fn occids(&self) -> Vec<&str> {
        self.items.iter().map(Collocation::occid).collect()
    }

    /// Set of occultation identifiers.
    pub fn key_set(&self) -> BTreeSet<&str> {
        self.items.iter().map(Collocation::occid).collect()
    }

    pub fn into_vec(self) -> Vec<Collocation> {
        self.items
    }

    /// Keyed view; on a duplicated identifier the first collocation is kept.
    fn keyed(&self) -> BTreeMap<&str, &Collocation> {
        let mut map = BTreeMap::new();
        for c in &self.items {
            map.entry(c.occid()).or_insert(c);
        }
        map
    }

    /// Collocations of either list, sorted by identifier. `self` wins on collisions.
    pub fn union(&self, other: &CollocationList) -> CollocationList {
        let mut merged = other.keyed();
        merged.extend(self.keyed());
        merged.into_values().cloned().collect()
    }

    /// Collocations of `self` whose identifier is also in `other`, sorted by identifier.
    pub fn intersection(&self, other: &CollocationList) -> CollocationList {
        let theirs = other.key_set();
        self.keyed()
            .into_iter()
            .filter(|(k, _)| theirs.contains(k))
            .map(|(_, c)| c.clone())
            .collect()
    }

    fn sort_key(
        collocation: &Collocation,
        order: SortOrder,
        time_system: &TimeSystem,
    ) -> Result<String, RotcolError> {
        match order {
            SortOrder::OccId => Ok(collocation.occid().to_string()),
            SortOrder::OccTime => Ok(time_system
                .calendar(collocation.occultation().time, TimeStandard::Utc)
                .isoformat()),
            SortOrder::SounderTime => {
                let time = collocation.time().ok_or_else(|| {
                    RotcolError::InvalidArgument(format!(
                        "collocation {} has no sounder time to sort on",
                        collocation.occid()
                    ))
                })?;
                Ok(time_system.calendar(time, TimeStandard::Utc).isoformat())
            }
        }
    }

    /// Copy of the list in the requested order.
    ///
    /// Equal keys get a cycling suffix so that every collocation keeps its own slot;
    /// entries with equal keys stay in list order.
    pub fn sorted(
        &self,
        order: SortOrder,
        time_system: &TimeSystem,
    ) -> Result<CollocationList, RotcolError> {
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        let mut slots: BTreeMap<String, &Collocation> = BTreeMap::new();

        for c in &self.items {
            let key = Self::sort_key(c, order, time_system)?;
            let repeat = seen.entry(key.clone()).or_insert(0);
            slots.insert(format!("{key}{}", tie_suffix(*repeat)), c);
            *repeat += 1;
        }

        Ok(slots.into_values().cloned().collect())
    }

    /// Refine every collocation in place.
    ///
    /// Return
    /// ----------
    /// * One [`AdvisoryKind::NoSounderData`] advisory per collocation whose
    ///   refinement found no footprint. Errors abort at the first failure.
    pub fn refine_all(&mut self) -> Result<Vec<Advisory>, RotcolError> {
        let mut advisories = Vec::new();
        for c in self.items.iter_mut() {
            c.refine()?;
            if c.status() == CollocationStatus::NoSounderData {
                advisories.push(Advisory::new(
                    AdvisoryKind::NoSounderData,
                    format!("no sounder data around collocation {}", c.occid()),
                ));
            }
        }
        info!(
            "{} collocation(s) refined, {} without sounder data",
            self.items.len(),
            advisories.len()
        );
        Ok(advisories)
    }
}

impl FromIterator<Collocation> for CollocationList {
    fn from_iter<I: IntoIterator<Item = Collocation>>(iter: I) -> Self {
        CollocationList::new(iter.into_iter().collect())
    }
}

impl IntoIterator for CollocationList {
    type Item = Collocation;
    type IntoIter = std::vec::IntoIter<Collocation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a CollocationList {
    type Item = &'a Collocation;
    type IntoIter = std::slice::Iter<'a, Collocation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Agreement between a reference search and a tested one over the same soundings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_negative: usize,
}

impl ConfusionMatrix {
    /// Compare the collocations of a reference search with those of a tested one.
    ///
    /// Arguments
    /// ---------
    /// * `reference`: collocations taken as truth (usually brute force).
    /// * `tested`: collocations under evaluation.
    /// * `total`: number of soundings both searches were given.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidArgument)` if `total` is smaller than the union of
    ///   both key sets.
    pub fn compare(
        reference: &CollocationList,
        tested: &CollocationList,
        total: usize,
    ) -> Result<Self, RotcolError> {
        let a = reference.key_set();
        let b = tested.key_set();
        let both = a.intersection(&b).count();
        let either = a.len() + b.len() - both;

        if either > total {
            return Err(RotcolError::InvalidArgument(format!(
                "{either} collocated soundings out of only {total}"
            )));
        }

        Ok(ConfusionMatrix {
            true_positive: both,
            false_negative: a.len() - both,
            false_positive: b.len() - both,
            true_negative: total - either,
        })
    }
}
