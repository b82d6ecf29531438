//! End-to-end clustering runs.
//!
//! The Thebeau search gets a matrix with two planted fully connected blocks
//! and should find the zero-cost assignment. ART1 gets items with repeated
//! connection patterns and should put pattern-identical items in the same
//! cluster.

use std::collections::BTreeSet;

use dsmkit::{
    art1_cluster, thebeau_cluster, Art1Params, ColorSequence, Matrix, ThebeauParams, Uid,
};
use pretty_assertions::assert_eq;

fn mirrored(matrix: &mut Matrix, uids: &[Uid], i: usize, j: usize, weight: f64) {
    let col_j = matrix.item(uids[j]).unwrap().alias.unwrap();
    let col_i = matrix.item(uids[i]).unwrap().alias.unwrap();
    matrix.create_connection(uids[i], col_j, "", weight);
    matrix.create_connection(uids[j], col_i, "", weight);
}

/// Two fully connected blocks of three, plus a trailing unconnected item.
fn planted_blocks() -> (Matrix, Vec<Uid>) {
    let mut matrix = Matrix::symmetric();
    let uids: Vec<Uid> = ["a", "b", "c", "x", "y", "z", "pad"]
        .iter()
        .map(|name| matrix.create_item(name, true))
        .collect();
    for block in [[0, 1, 2], [3, 4, 5]] {
        for &i in &block {
            for &j in &block {
                if i < j {
                    mirrored(&mut matrix, &uids, i, j, 2.0);
                }
            }
        }
    }
    matrix.set_checkpoint();
    (matrix, uids)
}

fn group_of(matrix: &Matrix, uid: Uid) -> Uid {
    matrix.item(uid).unwrap().group1
}

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn block_params() -> ThebeauParams {
    ThebeauParams {
        optimal_size_cluster: 3.0,
        levels: 2000,
        seed: 11,
        ..ThebeauParams::default()
    }
}

#[test]
fn test_thebeau_recovers_planted_blocks() {
    init_logs();
    let (matrix, uids) = planted_blocks();
    let result = thebeau_cluster(&matrix, &block_params(), &mut ColorSequence::seeded(11));

    let first = group_of(&result.matrix, uids[0]);
    let second = group_of(&result.matrix, uids[3]);
    for &uid in &uids[0..3] {
        assert_eq!(group_of(&result.matrix, uid), first);
    }
    for &uid in &uids[3..6] {
        assert_eq!(group_of(&result.matrix, uid), second);
    }
    assert_ne!(first, second);

    // both blocks at the optimal size, nothing crossing clusters
    assert_eq!(result.best_cost, 0.0);
}

#[test]
fn test_thebeau_can_absorb_unconnected_item() {
    init_logs();
    let mut matrix = Matrix::symmetric();
    let uids: Vec<Uid> = ["loner", "a", "b", "c"]
        .iter()
        .map(|name| matrix.create_item(name, true))
        .collect();
    for (i, j) in [(1, 2), (1, 3), (2, 3)] {
        mirrored(&mut matrix, &uids, i, j, 1.0);
    }

    // rand_accept of 0 makes every lottery draw accept, so the only way the
    // unconnected item stays put is if no cluster ever bids for it.
    let params = ThebeauParams {
        rand_accept: 0,
        levels: 5000,
        seed: 7,
        ..ThebeauParams::default()
    };
    let result = thebeau_cluster(&matrix, &params, &mut ColorSequence::seeded(7));

    let loner_group = group_of(&result.matrix, uids[0]);
    let companions = result
        .matrix
        .rows()
        .filter(|item| item.group1 == loner_group)
        .count();
    assert!(
        companions > 1,
        "unconnected item stayed alone in its singleton cluster"
    );
}

#[test]
fn test_thebeau_deterministic_across_runs() {
    let (matrix, _) = planted_blocks();
    let params = ThebeauParams {
        levels: 500,
        seed: 99,
        ..block_params()
    };
    let first = thebeau_cluster(&matrix, &params, &mut ColorSequence::seeded(99));
    let second = thebeau_cluster(&matrix, &params, &mut ColorSequence::seeded(99));
    assert_eq!(first.best_cost, second.best_cost);
    assert_eq!(first.cost_history, second.cost_history);
}

#[test]
fn test_thebeau_cost_history_tracks_best() {
    let (matrix, _) = planted_blocks();
    let params = block_params();
    let result = thebeau_cluster(&matrix, &params, &mut ColorSequence::seeded(11));

    assert_eq!(result.cost_history.len(), params.levels as usize);
    for pair in result.cost_history.windows(2) {
        assert!(pair[1] <= pair[0]);
    }
    assert_eq!(*result.cost_history.last().unwrap(), result.best_cost);
}

/// Two hub-and-spoke stars: the spokes of each hub share an identical
/// connection pattern and must land in one cluster.
#[test]
fn test_art1_groups_identical_patterns() {
    init_logs();
    let mut matrix = Matrix::symmetric();
    let uids: Vec<Uid> = ["a", "b", "hub1", "x", "y", "hub2"]
        .iter()
        .map(|name| matrix.create_item(name, true))
        .collect();
    mirrored(&mut matrix, &uids, 0, 2, 1.0); // a - hub1
    mirrored(&mut matrix, &uids, 1, 2, 1.0); // b - hub1
    mirrored(&mut matrix, &uids, 3, 5, 1.0); // x - hub2
    mirrored(&mut matrix, &uids, 4, 5, 1.0); // y - hub2

    let result = art1_cluster(
        &matrix,
        &Art1Params::default(),
        &mut ColorSequence::seeded(0),
    );

    assert_eq!(group_of(&result, uids[0]), group_of(&result, uids[1]));
    assert_eq!(group_of(&result, uids[3]), group_of(&result, uids[4]));
    assert_ne!(group_of(&result, uids[0]), group_of(&result, uids[3]));
    assert_ne!(group_of(&result, uids[2]), group_of(&result, uids[0]));
    assert_ne!(group_of(&result, uids[5]), group_of(&result, uids[3]));
}

#[test]
fn test_art1_max_groups_is_a_hard_cap() {
    let (matrix, _) = planted_blocks();
    let result = art1_cluster(
        &matrix,
        &Art1Params {
            max_groups: 1,
            ..Art1Params::default()
        },
        &mut ColorSequence::seeded(0),
    );
    let used: BTreeSet<Uid> = result.rows().map(|item| item.group1).collect();
    assert_eq!(used.len(), 1);
}

#[test]
fn test_clustering_leaves_input_untouched() {
    let (matrix, _) = planted_blocks();
    let before = matrix.isolated_copy();
    let params = ThebeauParams {
        levels: 100,
        seed: 3,
        ..block_params()
    };
    let result = thebeau_cluster(&matrix, &params, &mut ColorSequence::seeded(3));
    let clustered = art1_cluster(
        &matrix,
        &Art1Params::default(),
        &mut ColorSequence::seeded(3),
    );

    assert!(matrix.data_eq(&before));
    // the clustered copies carry no history of their own
    assert!(matrix.can_undo());
    assert!(!result.matrix.can_undo());
    assert!(!clustered.can_undo());
    assert!(!result.matrix.was_modified());
}
