//! Entity layer: the plain value/identity records a matrix is built from.
//!
//! Items, connections, groupings, and interface types carry no behavior beyond
//! construction and small predicates. All mutation happens through the matrix
//! mutators so the change stack stays consistent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::types::{Color, Uid};

/// Weight of the conventional "pending deletion" marker used by batch UI
/// edits: a connection with an empty name at this weight means "no
/// connection". The core stores it like any other connection; consumers must
/// honor the convention.
pub const DELETE_CONNECTION_WEIGHT: f64 = f64::MAX;

/// Priority value meaning "unset" on a grouping.
pub const UNSET_PRIORITY: i32 = -1;

/// A row or column element of the matrix.
///
/// In symmetric and multi-domain matrices every row item has a mirror column
/// item reachable through `alias` (and vice versa); name, sort index, and
/// primary group are kept in lockstep across the pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DsmItem {
    pub uid: Uid,
    /// UID of the mirror item on the other axis, when alias-paired.
    pub alias: Option<Uid>,
    pub name: String,
    /// Determines display/processing order. Not required to be an integer or
    /// unique.
    pub sort_index: f64,
    /// Primary grouping, used for clustering and coloring.
    pub group1: Uid,
    /// Secondary grouping (the domain) in multi-domain matrices.
    pub group2: Option<Uid>,
}

impl DsmItem {
    /// Create a fresh item with a random UID, assigned to the default
    /// grouping.
    pub fn new(name: impl Into<String>, sort_index: f64) -> Self {
        DsmItem {
            uid: Uid::random(),
            alias: None,
            name: name.into(),
            sort_index,
            group1: Grouping::DEFAULT_UID,
            group2: None,
        }
    }

    pub fn with_alias(mut self, alias: Uid) -> Self {
        self.alias = Some(alias);
        self
    }
}

/// A directed edge from a row item to a column item.
///
/// The `(row_uid, col_uid)` pair is the connection's identity and never
/// changes; at most one connection exists per ordered pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DsmConnection {
    pub row_uid: Uid,
    pub col_uid: Uid,
    pub name: String,
    pub weight: f64,
    /// Interface-type references, unique by interface UID.
    pub interfaces: BTreeSet<Uid>,
}

impl DsmConnection {
    pub fn new(row_uid: Uid, col_uid: Uid, name: impl Into<String>, weight: f64) -> Self {
        DsmConnection {
            row_uid,
            col_uid,
            name: name.into(),
            weight,
            interfaces: BTreeSet::new(),
        }
    }

    /// The ordered identity pair.
    pub fn key(&self) -> (Uid, Uid) {
        (self.row_uid, self.col_uid)
    }

    /// Whether this connection is the conventional pending-deletion marker.
    pub fn is_delete_marker(&self) -> bool {
        self.name.is_empty() && self.weight == DELETE_CONNECTION_WEIGHT
    }
}

/// A named, colored category assigned to items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    pub uid: Uid,
    pub name: String,
    /// Sort/tie-break hint; `UNSET_PRIORITY` when not set.
    pub priority: i32,
    pub color: Color,
    pub font_color: Color,
}

impl Grouping {
    /// Reserved UID of every matrix's default grouping ("no explicit group").
    pub const DEFAULT_UID: Uid = Uid(u64::MAX);
    /// Reserved UID of the multi-domain default domain.
    pub const DEFAULT_DOMAIN_UID: Uid = Uid(u64::MAX - 1);

    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Grouping {
            uid: Uid::random(),
            name: name.into(),
            priority: UNSET_PRIORITY,
            color,
            font_color: color.contrasting_font_color(),
        }
    }

    /// The default grouping present in every matrix. It cannot be deleted.
    pub fn default_group() -> Self {
        Grouping {
            uid: Self::DEFAULT_UID,
            name: "(none)".to_string(),
            priority: UNSET_PRIORITY,
            color: Color::WHITE,
            font_color: Color::BLACK,
        }
    }

    /// The default domain of a multi-domain matrix.
    pub fn default_domain() -> Self {
        Grouping {
            uid: Self::DEFAULT_DOMAIN_UID,
            name: "default".to_string(),
            priority: UNSET_PRIORITY,
            color: Color::GRAY,
            font_color: Color::WHITE,
        }
    }

    pub fn is_default(&self) -> bool {
        self.uid == Self::DEFAULT_UID || self.uid == Self::DEFAULT_DOMAIN_UID
    }
}

/// A named, abbreviated tag attachable to connections. Interface types are
/// organized into named groupings for presentation; they take no part in the
/// clustering math but round-trip through serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceType {
    pub uid: Uid,
    pub name: String,
    pub abbreviation: String,
}

impl InterfaceType {
    pub fn new(name: impl Into<String>, abbreviation: impl Into<String>) -> Self {
        InterfaceType {
            uid: Uid::random(),
            name: name.into(),
            abbreviation: abbreviation.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_starts_in_default_group() {
        let item = DsmItem::new("Engine", 1.0);
        assert_eq!(item.group1, Grouping::DEFAULT_UID);
        assert!(item.alias.is_none());
        assert!(item.group2.is_none());
    }

    #[test]
    fn test_delete_marker_convention() {
        let a = Uid::random();
        let b = Uid::random();
        let marker = DsmConnection::new(a, b, "", DELETE_CONNECTION_WEIGHT);
        assert!(marker.is_delete_marker());

        let named = DsmConnection::new(a, b, "flow", DELETE_CONNECTION_WEIGHT);
        assert!(!named.is_delete_marker());
        let weighted = DsmConnection::new(a, b, "", 1.0);
        assert!(!weighted.is_delete_marker());
    }

    #[test]
    fn test_default_groupings_are_reserved() {
        assert!(Grouping::default_group().is_default());
        assert!(Grouping::default_domain().is_default());
        assert_ne!(
            Grouping::default_group().uid,
            Grouping::default_domain().uid
        );
        assert!(!Grouping::new("cluster", Color::GRAY).is_default());
    }

    #[test]
    fn test_entities_round_trip_through_json() {
        let mut conn = DsmConnection::new(Uid(1), Uid(2), "signal", 2.5);
        conn.interfaces.insert(Uid(9));
        let json = serde_json::to_string(&conn).unwrap();
        let back: DsmConnection = serde_json::from_str(&json).unwrap();
        assert_eq!(conn, back);

        let grouping = Grouping::new("drivetrain", Color::new(10, 20, 30));
        let json = serde_json::to_string(&grouping).unwrap();
        let back: Grouping = serde_json::from_str(&json).unwrap();
        assert_eq!(grouping, back);
    }
}
