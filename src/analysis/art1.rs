//! ART1 clustering of a symmetric matrix's boolean adjacency pattern.
//!
//! Each row item becomes a binary feature vector over the matrix columns. A
//! prototype vector summarizes each cluster as the fuzzy AND of its members.
//! Items join the first prototype that is both close enough (proximity
//! against a floor derived from the item itself) and similar enough (the
//! vigilance test); otherwise a new prototype is opened, until `max_groups`
//! is reached and stragglers are forced into the last cluster. Passes repeat
//! until membership stabilizes.

use log::debug;

use crate::analysis::palette::ColorSequence;
use crate::core::Grouping;
use crate::matrix::Matrix;

const MAX_PASSES: u32 = 10_000;

/// Tuning parameters for an ART1 run.
#[derive(Debug, Clone)]
pub struct Art1Params {
    /// Hard cap on the number of clusters.
    pub max_groups: usize,
    /// Similarity threshold an item must clear against a prototype, in
    /// `(0, 1]`. Higher values make tighter clusters.
    pub vigilance: f64,
    /// Denominator cushion in the proximity score. Small positive values
    /// favor larger prototypes.
    pub beta: f64,
}

impl Default for Art1Params {
    fn default() -> Self {
        Art1Params {
            max_groups: 5,
            vigilance: 0.3,
            beta: 1.0,
        }
    }
}

/// Cluster the matrix's rows by connection pattern. Returns a detached copy
/// with one grouping per cluster; the input is not modified.
pub fn art1_cluster(matrix: &Matrix, params: &Art1Params, colors: &mut ColorSequence) -> Matrix {
    assert!(
        matrix.kind().is_alias_paired(),
        "clustering requires a symmetric matrix"
    );
    assert!(params.max_groups > 0, "max_groups must be positive");

    let rows: Vec<_> = matrix.sorted_rows().into_iter().cloned().collect();
    let n = rows.len();

    // Boolean adjacency: features[i][j] is 1.0 when row i connects to the
    // column paired with row j.
    let mut features: Vec<Vec<f64>> = vec![vec![0.0; n]; n];
    for (i, row) in rows.iter().enumerate() {
        for (j, other) in rows.iter().enumerate() {
            let col = other.alias.expect("row item missing alias");
            if matrix.get_connection(row.uid, col).is_some() {
                features[i][j] = 1.0;
            }
        }
    }

    let mut prototypes: Vec<Vec<f64>> = Vec::new();
    let mut membership: Vec<isize> = vec![-1; n];

    for pass in 0..MAX_PASSES {
        let mut changed = false;
        for i in 0..n {
            let item = &features[i];
            let chosen = match find_resonant(&prototypes, item, params) {
                Some(p) => p,
                None if prototypes.len() < params.max_groups => {
                    prototypes.push(item.clone());
                    prototypes.len() - 1
                }
                None => prototypes.len() - 1,
            };
            if membership[i] != chosen as isize {
                membership[i] = chosen as isize;
                changed = true;
            }
            recompute_prototype(&mut prototypes, chosen, &membership, &features);
        }
        if !changed {
            debug!("art1 converged after {} passes", pass + 1);
            break;
        }
    }

    let mut result = matrix.isolated_copy();
    result.clear_groupings();
    let groupings: Vec<Grouping> = (0..prototypes.len())
        .map(|p| Grouping::new(format!("cluster {}", p + 1), colors.next_color()))
        .collect();
    for (i, row) in rows.iter().enumerate() {
        result.set_item_group(row.uid, &groupings[membership[i] as usize]);
    }
    result.isolated_copy()
}

/// Index of the first prototype the item resonates with, scanning in
/// creation order.
fn find_resonant(prototypes: &[Vec<f64>], item: &[f64], params: &Art1Params) -> Option<usize> {
    let item_norm = norm(item);
    let min_proximity = item_norm / (params.beta + item.len() as f64);

    for (p, proto) in prototypes.iter().enumerate() {
        let and_norm = norm(&fuzzy_and(proto, item));
        let proximity = and_norm / (params.beta + norm(proto));
        if proximity <= min_proximity {
            continue;
        }
        if item_norm > 0.0 && and_norm / item_norm > params.vigilance {
            return Some(p);
        }
    }
    None
}

/// Rebuild a prototype from scratch as the fuzzy AND of its members. A
/// memberless prototype keeps all features set.
fn recompute_prototype(
    prototypes: &mut [Vec<f64>],
    index: usize,
    membership: &[isize],
    features: &[Vec<f64>],
) {
    let mut proto = vec![1.0; prototypes[index].len()];
    for (i, &m) in membership.iter().enumerate() {
        if m == index as isize {
            proto = fuzzy_and(&proto, &features[i]);
        }
    }
    prototypes[index] = proto;
}

fn fuzzy_and(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x.min(*y)).collect()
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}
