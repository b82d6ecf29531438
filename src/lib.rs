// Export modules for library usage
pub mod analysis;
pub mod core;
pub mod history;
pub mod matrix;

// Re-export commonly used types
pub use crate::core::{
    Color, DsmConnection, DsmError, DsmItem, Grouping, InterfaceType, MatrixKind, MatrixMetadata,
    MetadataField, Uid, DELETE_CONNECTION_WEIGHT, UNSET_PRIORITY,
};

pub use crate::history::{Change, ChangeStack, ChangeUnit, ConnectionFields, Side};

pub use crate::matrix::{builder::MatrixBuilder, grid::Cell, Matrix};

pub use crate::analysis::{
    art1::{art1_cluster, Art1Params},
    coordination::{coordination_score, CoordinationParams, CoordinationScore},
    palette::ColorSequence,
    propagation::{propagate, PropagationParams, PropagationResult},
    thebeau::{thebeau_cluster, ThebeauParams, ThebeauResult},
};
