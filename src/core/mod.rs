pub mod entities;
pub mod errors;
pub mod types;

pub use entities::{
    DsmConnection, DsmItem, Grouping, InterfaceType, DELETE_CONNECTION_WEIGHT, UNSET_PRIORITY,
};
pub use errors::DsmError;
pub use types::{Color, MatrixKind, MatrixMetadata, MetadataField, Uid};
