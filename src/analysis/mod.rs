//! Analyses over built matrices: reachability propagation, the coordination
//! cost model, and the two clustering algorithms.

pub mod art1;
pub mod coordination;
pub mod palette;
pub mod propagation;
pub mod thebeau;

pub use art1::{art1_cluster, Art1Params};
pub use coordination::{coordination_score, CoordinationParams, CoordinationScore};
pub use palette::ColorSequence;
pub use propagation::{propagate, PropagationParams, PropagationResult};
pub use thebeau::{thebeau_cluster, ThebeauParams, ThebeauResult};
