//! Shared error types for the library
//!
//! Only external-input failures (the I/O boundary reconstructing a matrix
//! from field values) surface as `DsmError`. Invariant violations inside the
//! core (symmetry mismatches, alias lookups that fail, connecting an item to
//! its own mirror) are programming-contract violations and panic instead;
//! they are never silently repaired.

use thiserror::Error;

use super::types::{MatrixKind, Uid};

/// Errors reported to the I/O layer when a matrix cannot be reconstructed
/// from loaded field values.
#[derive(Debug, Error)]
pub enum DsmError {
    /// An item references a grouping that was never registered.
    #[error("item \"{item}\" references unknown grouping {group}")]
    UnknownGrouping { item: String, group: Uid },

    /// An item references a domain that was never registered.
    #[error("item \"{item}\" references unknown domain {domain}")]
    UnknownDomain { item: String, domain: Uid },

    /// A connection endpoint does not resolve to a loaded item.
    #[error("connection ({row}, {col}) references an unknown item")]
    UnknownItem { row: Uid, col: Uid },

    /// Two connections were supplied for the same ordered pair.
    #[error("duplicate connection for pair ({row}, {col})")]
    DuplicateConnection { row: Uid, col: Uid },

    /// The same UID was supplied for two items.
    #[error("duplicate item uid {uid}")]
    DuplicateUid { uid: Uid },

    /// An alias-paired matrix was loaded with an item that has no mirror.
    #[error("item {uid} has no alias partner in a {kind} matrix")]
    MissingAlias { uid: Uid, kind: MatrixKind },

    /// Alias pairing is not mutual between the two items.
    #[error("alias pairing between {row} and {col} is not mutual")]
    BrokenAlias { row: Uid, col: Uid },

    /// A connection interface reference does not resolve to a loaded
    /// interface type.
    #[error("connection ({row}, {col}) references unknown interface {interface}")]
    UnknownInterface { row: Uid, col: Uid, interface: Uid },
}
