//! Migration plans: the output of every solver.

use crate::model::{IdAllocator, RegionId, StoreId};

/// One region's reassignment. `dsts` always sums to `1.0` across its
/// fractions; a non-split region has exactly one `(dst, 1.0)` entry. A
/// region fractionally split across several destinations (only possible out
/// of the LP adapter) lists one entry per destination store.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntry {
    pub region_id: RegionId,
    pub src: StoreId,
    pub dsts: Vec<(StoreId, f64)>,
}

impl PlanEntry {
    pub fn single(region_id: impl Into<RegionId>, src: impl Into<StoreId>, dst: impl Into<StoreId>) -> Self {
        PlanEntry {
            region_id: region_id.into(),
            src: src.into(),
            dsts: vec![(dst.into(), 1.0)],
        }
    }

    pub fn is_split(&self) -> bool {
        self.dsts.len() > 1
    }
}

pub type Plan = Vec<PlanEntry>;

/// Materialize a concrete split child per fractional destination, returning
/// a plan of ordinary single-destination `(region_id, src, dst)` triples.
/// Callers that cannot act on fractional moves should post-process LP plans
/// through this before applying them (see SPEC_FULL.md §4.6).
pub fn into_concrete_splits(plan: Plan, id_alloc: &mut IdAllocator) -> Plan {
    let mut out = Vec::with_capacity(plan.len());
    for entry in plan {
        if entry.dsts.len() <= 1 {
            if let Some((dst, _)) = entry.dsts.into_iter().next() {
                out.push(PlanEntry::single(entry.region_id, entry.src, dst));
            }
            continue;
        }
        for (dst, _fraction) in entry.dsts {
            let child_id = id_alloc.next_id();
            out.push(PlanEntry::single(child_id, entry.src.clone(), dst));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_destination_entries_pass_through_unchanged() {
        let mut alloc = IdAllocator::starting_at(1000);
        let plan = vec![PlanEntry::single("r1", "s1", "s2")];
        let out = into_concrete_splits(plan.clone(), &mut alloc);
        assert_eq!(out, plan);
    }

    #[test]
    fn split_entries_become_one_entry_per_destination() {
        let mut alloc = IdAllocator::starting_at(1000);
        let plan = vec![PlanEntry {
            region_id: "r1".to_string(),
            src: "s1".to_string(),
            dsts: vec![("s2".to_string(), 0.4), ("s3".to_string(), 0.6)],
        }];
        let out = into_concrete_splits(plan, &mut alloc);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|e| e.dsts.len() == 1));
        assert_ne!(out[0].region_id, out[1].region_id);
        assert!(out.iter().all(|e| e.src == "s1"));
    }
}
