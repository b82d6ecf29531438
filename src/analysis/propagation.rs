//! Propagation analysis: level-bounded breadth-first accumulation of
//! dependency weight (or occurrence count) reachable from a start item.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::core::Uid;
use crate::matrix::Matrix;

/// Parameters for one propagation run.
#[derive(Debug, Clone)]
pub struct PropagationParams {
    /// The item propagation starts from. It never appears in the results.
    pub start: Uid,
    /// How many levels to expand. The loop runs exactly this many times
    /// whether or not the frontier empties earlier.
    pub levels: u32,
    /// Items that terminate propagation: they still accumulate credit at the
    /// level they are reached, but never join the frontier.
    pub exclusions: HashSet<Uid>,
    /// Connections below this weight are skipped entirely.
    pub min_weight: f64,
    /// Accumulate connection weights when true, raw occurrence counts when
    /// false.
    pub count_by_weight: bool,
}

/// Per-level, per-target accumulated totals. Levels are numbered from 1.
///
/// The scanned side alternates each level, so odd levels key results by the
/// UIDs of items on the opposite axis from the start item and even levels by
/// the start item's own axis; callers resolve either through the item arena.
pub type PropagationResult = BTreeMap<u32, HashMap<Uid, f64>>;

/// Run propagation analysis over the matrix's connections.
///
/// Level 1 scans from the start item's native side; each subsequent level
/// flips side. Items reachable by multiple paths at the same level accumulate
/// every contribution. The start item (and its alias partner) is implicitly
/// excluded from the results and from further propagation back into itself.
pub fn propagate(matrix: &Matrix, params: &PropagationParams) -> PropagationResult {
    let start_is_row = matrix.is_row(params.start);
    assert!(
        start_is_row || matrix.item(params.start).is_some(),
        "propagation start uid does not resolve to an item"
    );

    // the start item never re-enters the results, on either axis
    let mut suppressed: HashSet<Uid> = HashSet::new();
    suppressed.insert(params.start);
    if let Some(alias) = matrix.item(params.start).and_then(|i| i.alias) {
        suppressed.insert(alias);
    }

    let mut results = PropagationResult::new();
    let mut seen: HashSet<Uid> = suppressed.clone();
    let mut frontier: Vec<Uid> = vec![params.start];

    for level in 1..=params.levels {
        let scan_rows = if start_is_row {
            level % 2 == 1
        } else {
            level % 2 == 0
        };
        let mut totals: HashMap<Uid, f64> = HashMap::new();

        for &uid in &frontier {
            for conn in matrix.connections() {
                let target = if scan_rows {
                    if conn.row_uid != uid {
                        continue;
                    }
                    conn.col_uid
                } else {
                    if conn.col_uid != uid {
                        continue;
                    }
                    conn.row_uid
                };
                if conn.weight < params.min_weight || suppressed.contains(&target) {
                    continue;
                }
                let credit = if params.count_by_weight {
                    conn.weight
                } else {
                    1.0
                };
                *totals.entry(target).or_insert(0.0) += credit;
            }
        }

        frontier = totals
            .keys()
            .filter(|uid| !seen.contains(uid) && !params.exclusions.contains(uid))
            .copied()
            .collect();
        seen.extend(totals.keys().copied());
        results.insert(level, totals);
    }
    results
}
