//! Mirror-connection operations for alias-paired matrices.
//!
//! A symmetric matrix stores directed connections like any other kind; what
//! makes it symmetric is the alias pairing of items plus the mirror edit
//! below, which keeps `(row, col)` and its reflection in step when the user
//! asks for a symmetric edit.

use crate::core::Uid;
use crate::history::Change;

use super::Matrix;

impl Matrix {
    /// The reflected ordered pair of `(row_uid, col_uid)`: the row aliased to
    /// the column item, against the column aliased to the row item.
    ///
    /// Panics when either endpoint does not resolve or the pairing is broken;
    /// both are contract violations.
    pub fn mirror_connection_key(&self, row_uid: Uid, col_uid: Uid) -> (Uid, Uid) {
        assert!(
            self.kind().is_alias_paired(),
            "mirror connections require an alias-paired matrix"
        );
        let row = self
            .rows()
            .find(|i| i.uid == row_uid)
            .unwrap_or_else(|| panic!("uid {row_uid} does not resolve to a row item"));
        let col = self
            .cols()
            .find(|i| i.uid == col_uid)
            .unwrap_or_else(|| panic!("uid {col_uid} does not resolve to a column item"));
        let mirror_row = col.alias.expect("alias lookup failed for column item");
        let mirror_col = row.alias.expect("alias lookup failed for row item");
        (mirror_row, mirror_col)
    }

    /// Apply the same name and weight to the connection for `(row_uid,
    /// col_uid)` and to its mirror, creating whichever side is missing.
    /// Both edits land in one change unit.
    pub fn modify_connection_symmetric(
        &mut self,
        row_uid: Uid,
        col_uid: Uid,
        name: &str,
        weight: f64,
    ) {
        let (mirror_row, mirror_col) = self.mirror_connection_key(row_uid, col_uid);
        let mut changes: Vec<Change> =
            self.connection_upsert_changes(row_uid, col_uid, name, weight);
        changes.extend(self.connection_upsert_changes(mirror_row, mirror_col, name, weight));
        self.record(changes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_modify_touches_both_directions() {
        let mut matrix = Matrix::symmetric();
        let a = matrix.create_item("a", true);
        let b = matrix.create_item("b", true);
        let a_alias = matrix.item(a).unwrap().alias.unwrap();
        let b_alias = matrix.item(b).unwrap().alias.unwrap();

        matrix.modify_connection_symmetric(a, b_alias, "link", 2.0);
        assert_eq!(matrix.connections().count(), 2);
        assert_eq!(matrix.get_connection(a, b_alias).unwrap().weight, 2.0);
        assert_eq!(matrix.get_connection(b, a_alias).unwrap().weight, 2.0);
    }

    #[test]
    fn test_symmetric_modify_is_one_undo_unit() {
        let mut matrix = Matrix::symmetric();
        let a = matrix.create_item("a", true);
        let b = matrix.create_item("b", true);
        let b_alias = matrix.item(b).unwrap().alias.unwrap();
        matrix.set_checkpoint();

        matrix.modify_connection_symmetric(a, b_alias, "link", 2.0);
        matrix.set_checkpoint();
        matrix.undo_to_checkpoint();
        assert_eq!(matrix.connections().count(), 0);
    }

    #[test]
    fn test_mirror_key_reflects_pair() {
        let mut matrix = Matrix::symmetric();
        let a = matrix.create_item("a", true);
        let b = matrix.create_item("b", true);
        let a_alias = matrix.item(a).unwrap().alias.unwrap();
        let b_alias = matrix.item(b).unwrap().alias.unwrap();

        assert_eq!(matrix.mirror_connection_key(a, b_alias), (b, a_alias));
    }

    #[test]
    fn test_symmetric_modify_updates_existing_mirror() {
        let mut matrix = Matrix::symmetric();
        let a = matrix.create_item("a", true);
        let b = matrix.create_item("b", true);
        let b_alias = matrix.item(b).unwrap().alias.unwrap();

        matrix.create_connection(a, b_alias, "old", 1.0);
        matrix.modify_connection_symmetric(a, b_alias, "new", 5.0);
        assert_eq!(matrix.connections().count(), 2);
        for conn in matrix.connections() {
            assert_eq!(conn.name, "new");
            assert_eq!(conn.weight, 5.0);
        }
    }
}
