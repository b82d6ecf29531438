//! Thebeau coordination-score cost model: the objective the clustering
//! search minimizes.
//!
//! A connection inside a cluster costs `|optimal − clusterSize|^powcc`; one
//! crossing clusters costs `matrixSize^powcc`. Both optionally scale by the
//! connection weight. Small, well-sized clusters are cheap; stray
//! cross-cluster connections are expensive in proportion to the whole matrix.

use std::collections::HashMap;

use crate::core::Uid;
use crate::matrix::Matrix;

/// Parameters for one cost evaluation.
#[derive(Debug, Clone)]
pub struct CoordinationParams {
    /// The cluster size the cost curve bottoms out at.
    pub optimal_size_cluster: f64,
    /// Power-law exponent applied to both cost terms.
    pub powcc: f64,
    /// Scale each contribution by connection weight instead of counting
    /// occurrences.
    pub calculate_by_weight: bool,
}

impl Default for CoordinationParams {
    fn default() -> Self {
        CoordinationParams {
            optimal_size_cluster: 4.5,
            powcc: 1.0,
            calculate_by_weight: true,
        }
    }
}

/// Total intra- and extra-cluster cost with a per-grouping breakdown of the
/// intra term.
#[derive(Debug, Clone)]
pub struct CoordinationScore {
    /// Intra-cluster cost per grouping UID.
    pub intra_breakdown: HashMap<Uid, f64>,
    pub intra_cost: f64,
    pub extra_cost: f64,
    pub total_cost: f64,
}

/// Evaluate the coordination score of a symmetric matrix's current group
/// assignment.
pub fn coordination_score(matrix: &Matrix, params: &CoordinationParams) -> CoordinationScore {
    assert!(
        matrix.kind().is_alias_paired(),
        "coordination score requires an alias-paired matrix"
    );
    let matrix_size = matrix.row_count() as f64;

    // row-item count per grouping
    let mut cluster_sizes: HashMap<Uid, f64> = HashMap::new();
    for item in matrix.rows() {
        *cluster_sizes.entry(item.group1).or_insert(0.0) += 1.0;
    }

    let mut intra_breakdown: HashMap<Uid, f64> = HashMap::new();
    let mut intra_cost = 0.0;
    let mut extra_cost = 0.0;

    for conn in matrix.connections() {
        let row_group = matrix
            .item(conn.row_uid)
            .expect("connection row item missing")
            .group1;
        let col_group = matrix
            .item(conn.col_uid)
            .expect("connection column item missing")
            .group1;
        let scale = if params.calculate_by_weight {
            conn.weight
        } else {
            1.0
        };

        if row_group == col_group {
            let cluster_size = cluster_sizes.get(&row_group).copied().unwrap_or(0.0);
            let cost = (params.optimal_size_cluster - cluster_size)
                .abs()
                .powf(params.powcc)
                * scale;
            intra_cost += cost;
            *intra_breakdown.entry(row_group).or_insert(0.0) += cost;
        } else {
            extra_cost += matrix_size.powf(params.powcc) * scale;
        }
    }

    CoordinationScore {
        intra_breakdown,
        intra_cost,
        extra_cost,
        total_cost: intra_cost + extra_cost,
    }
}
