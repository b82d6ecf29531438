//! Reconstruction of a matrix from discrete field values.
//!
//! The I/O layer parses whatever representation it owns (XML, CSV, legacy
//! text) and feeds UIDs, names, and tuples through this builder in dependency
//! order: groupings and domains before the items that reference them, items
//! before connections. Anything unresolvable is an external-input error, a
//! typed [`DsmError`], never a partially constructed matrix. Duplicate-UID
//! detection across a whole file is also the I/O layer's job; the builder
//! rejects the duplicates it can see.

use crate::core::{
    DsmConnection, DsmError, DsmItem, Grouping, InterfaceType, MatrixKind, MatrixMetadata,
};
use crate::history::Side;

use super::{Matrix, MatrixState};

/// Accumulates loaded field values and validates them into a [`Matrix`].
#[derive(Debug)]
pub struct MatrixBuilder {
    kind: MatrixKind,
    state: MatrixState,
}

impl MatrixBuilder {
    pub fn new(kind: MatrixKind) -> Self {
        MatrixBuilder {
            kind,
            state: MatrixState::new(),
        }
    }

    pub fn set_metadata(&mut self, metadata: MatrixMetadata) {
        self.state.metadata = metadata;
    }

    pub fn add_grouping(&mut self, grouping: Grouping) -> Result<(), DsmError> {
        if grouping.uid == self.state.default_grouping.uid {
            // a persisted default grouping overrides the built-in one
            self.state.default_grouping = grouping;
            return Ok(());
        }
        if self.state.groupings.iter().any(|g| g.uid == grouping.uid) {
            return Err(DsmError::DuplicateUid { uid: grouping.uid });
        }
        self.state.groupings.push_back(grouping);
        Ok(())
    }

    pub fn add_domain(&mut self, domain: Grouping) -> Result<(), DsmError> {
        if domain.uid == self.state.default_domain.uid {
            self.state.default_domain = domain;
            return Ok(());
        }
        if self.state.domains.iter().any(|d| d.uid == domain.uid) {
            return Err(DsmError::DuplicateUid { uid: domain.uid });
        }
        self.state.domains.push_back(domain);
        Ok(())
    }

    pub fn add_interface_grouping(&mut self, name: &str) {
        if self.state.interface_groupings.iter().any(|(n, _)| n == name) {
            return;
        }
        self.state
            .interface_groupings
            .push_back((name.to_string(), im::Vector::new()));
    }

    pub fn add_interface(&mut self, grouping: &str, interface: InterfaceType) {
        self.add_interface_grouping(grouping);
        let i = self
            .state
            .interface_groupings
            .iter()
            .position(|(n, _)| n == grouping)
            .unwrap();
        self.state
            .interface_groupings
            .get_mut(i)
            .unwrap()
            .1
            .push_back(interface);
    }

    /// Add a loaded item. Its group references must already be registered.
    pub fn add_item(&mut self, item: DsmItem, is_row: bool) -> Result<(), DsmError> {
        if self.state.rows.contains_key(&item.uid) || self.state.cols.contains_key(&item.uid) {
            return Err(DsmError::DuplicateUid { uid: item.uid });
        }
        if item.group1 != self.state.default_grouping.uid
            && !self.state.groupings.iter().any(|g| g.uid == item.group1)
        {
            return Err(DsmError::UnknownGrouping {
                item: item.name.clone(),
                group: item.group1,
            });
        }
        if let Some(domain) = item.group2 {
            if domain != self.state.default_domain.uid
                && !self.state.domains.iter().any(|d| d.uid == domain)
            {
                return Err(DsmError::UnknownDomain {
                    item: item.name.clone(),
                    domain,
                });
            }
        }
        let arena = if is_row {
            &mut self.state.rows
        } else {
            &mut self.state.cols
        };
        arena.insert(item.uid, item);
        Ok(())
    }

    /// Add a loaded connection. Both endpoints and all interface references
    /// must already be registered, and the ordered pair must be new.
    pub fn add_connection(&mut self, connection: DsmConnection) -> Result<(), DsmError> {
        if !self.state.rows.contains_key(&connection.row_uid)
            || !self.state.cols.contains_key(&connection.col_uid)
        {
            return Err(DsmError::UnknownItem {
                row: connection.row_uid,
                col: connection.col_uid,
            });
        }
        if self
            .state
            .connections
            .iter()
            .any(|c| c.row_uid == connection.row_uid && c.col_uid == connection.col_uid)
        {
            return Err(DsmError::DuplicateConnection {
                row: connection.row_uid,
                col: connection.col_uid,
            });
        }
        for &interface in &connection.interfaces {
            let known = self
                .state
                .interface_groupings
                .iter()
                .flat_map(|(_, types)| types.iter())
                .any(|t| t.uid == interface);
            if !known {
                return Err(DsmError::UnknownInterface {
                    row: connection.row_uid,
                    col: connection.col_uid,
                    interface,
                });
            }
        }
        self.state.connections.push_back(connection);
        Ok(())
    }

    /// Validate cross-item invariants and produce the matrix. The result has
    /// empty change stacks and no modifications pending.
    pub fn build(self) -> Result<Matrix, DsmError> {
        if self.kind.is_alias_paired() {
            for (side, arena) in [(Side::Row, &self.state.rows), (Side::Col, &self.state.cols)] {
                for item in arena.values() {
                    let alias = item.alias.ok_or(DsmError::MissingAlias {
                        uid: item.uid,
                        kind: self.kind,
                    })?;
                    let partner = self
                        .state
                        .arena(side.opposite())
                        .get(&alias)
                        .ok_or(DsmError::MissingAlias {
                            uid: item.uid,
                            kind: self.kind,
                        })?;
                    if partner.alias != Some(item.uid) {
                        return Err(DsmError::BrokenAlias {
                            row: item.uid,
                            col: alias,
                        });
                    }
                }
            }
        }
        Ok(Matrix::from_state(self.kind, self.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Color, Uid};

    fn paired_items(name: &str, sort: f64) -> (DsmItem, DsmItem) {
        let mut row = DsmItem::new(name, sort);
        let mut col = DsmItem::new(name, sort);
        row.alias = Some(col.uid);
        col.alias = Some(row.uid);
        (row, col)
    }

    #[test]
    fn test_load_round_trip_is_unmodified() {
        let mut builder = MatrixBuilder::new(MatrixKind::Symmetric);
        let cluster = Grouping::new("cluster", Color::GRAY);
        builder.add_grouping(cluster.clone()).unwrap();

        let (mut ra, ca) = paired_items("a", 1.0);
        let (rb, cb) = paired_items("b", 2.0);
        ra.group1 = cluster.uid;
        let mut ca = ca;
        ca.group1 = cluster.uid;
        builder.add_item(ra.clone(), true).unwrap();
        builder.add_item(ca, false).unwrap();
        builder.add_item(rb.clone(), true).unwrap();
        builder.add_item(cb.clone(), false).unwrap();
        builder
            .add_connection(DsmConnection::new(ra.uid, cb.uid, "x", 2.0))
            .unwrap();

        let matrix = builder.build().unwrap();
        assert!(!matrix.was_modified());
        assert!(!matrix.can_undo());
        assert_eq!(matrix.kind(), MatrixKind::Symmetric);
        assert_eq!(matrix.row_count(), 2);
        assert!(matrix.get_connection(ra.uid, cb.uid).is_some());
    }

    #[test]
    fn test_unknown_grouping_is_rejected() {
        let mut builder = MatrixBuilder::new(MatrixKind::Symmetric);
        let (mut row, _) = paired_items("a", 1.0);
        row.group1 = Uid(42);
        let err = builder.add_item(row, true).unwrap_err();
        assert!(matches!(err, DsmError::UnknownGrouping { .. }));
    }

    #[test]
    fn test_duplicate_connection_is_rejected() {
        let mut builder = MatrixBuilder::new(MatrixKind::Asymmetric);
        let row = DsmItem::new("r", 1.0);
        let col = DsmItem::new("c", 1.0);
        builder.add_item(row.clone(), true).unwrap();
        builder.add_item(col.clone(), false).unwrap();
        builder
            .add_connection(DsmConnection::new(row.uid, col.uid, "x", 1.0))
            .unwrap();
        let err = builder
            .add_connection(DsmConnection::new(row.uid, col.uid, "y", 2.0))
            .unwrap_err();
        assert!(matches!(err, DsmError::DuplicateConnection { .. }));
    }

    #[test]
    fn test_missing_alias_fails_build() {
        let mut builder = MatrixBuilder::new(MatrixKind::Symmetric);
        builder.add_item(DsmItem::new("a", 1.0), true).unwrap();
        let err = builder.build().unwrap_err();
        assert!(matches!(err, DsmError::MissingAlias { .. }));
    }

    #[test]
    fn test_broken_alias_fails_build() {
        let mut builder = MatrixBuilder::new(MatrixKind::Symmetric);
        let (row, col) = paired_items("a", 1.0);
        let mut col = col;
        col.alias = Some(Uid(7)); // not mutual
        builder.add_item(row, true).unwrap();
        builder.add_item(col, false).unwrap();
        let err = builder.build().unwrap_err();
        assert!(matches!(
            err,
            DsmError::BrokenAlias { .. } | DsmError::MissingAlias { .. }
        ));
    }

    #[test]
    fn test_unknown_connection_endpoint_is_rejected() {
        let mut builder = MatrixBuilder::new(MatrixKind::Asymmetric);
        let err = builder
            .add_connection(DsmConnection::new(Uid(1), Uid(2), "x", 1.0))
            .unwrap_err();
        assert!(matches!(err, DsmError::UnknownItem { .. }));
    }
}
