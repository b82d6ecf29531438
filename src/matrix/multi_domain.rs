//! Multi-domain matrices: a secondary grouping (the domain) per item, plus
//! the zoom projection that lifts two domains out into a standalone matrix
//! and merges edits back.

use im::HashMap;

use crate::core::{DsmItem, Grouping, MatrixKind, Uid};
use crate::history::{Change, Side};

use super::{Matrix, MatrixState};

impl Matrix {
    // ---- domain set -------------------------------------------------------

    pub fn domains(&self) -> impl Iterator<Item = &Grouping> {
        self.state.domains.iter()
    }

    pub fn default_domain(&self) -> &Grouping {
        &self.state.default_domain
    }

    pub fn add_domain(&mut self, domain: Grouping) {
        assert_eq!(
            self.kind,
            MatrixKind::MultiDomain,
            "domains require a multi-domain matrix"
        );
        if domain.uid == self.state.default_domain.uid
            || self.state.domains.iter().any(|d| d.uid == domain.uid)
        {
            return;
        }
        self.record(vec![Change::AddDomain { grouping: domain }]);
    }

    /// Remove a domain, re-pointing its members at the default domain in the
    /// same unit. The default domain cannot be removed.
    pub fn remove_domain(&mut self, uid: Uid) {
        assert_eq!(
            self.kind,
            MatrixKind::MultiDomain,
            "domains require a multi-domain matrix"
        );
        assert!(
            uid != self.state.default_domain.uid,
            "the default domain cannot be removed"
        );
        let domain = match self.state.domains.iter().find(|d| d.uid == uid) {
            Some(d) => d.clone(),
            None => return,
        };
        let default = self.state.default_domain.uid;
        let mut changes = Vec::new();
        for side in [Side::Row, Side::Col] {
            for item in self.state.arena(side).values() {
                if item.group2 == Some(uid) {
                    changes.push(Change::SetItemDomain {
                        side,
                        uid: item.uid,
                        old: item.group2,
                        new: Some(default),
                    });
                }
            }
        }
        changes.push(Change::RemoveDomain { grouping: domain });
        self.record(changes);
    }

    /// Move an item (and its alias partner in lockstep) to `domain`,
    /// registering an unknown domain inside the same change unit.
    pub fn set_item_domain(&mut self, uid: Uid, domain: &Grouping) {
        assert_eq!(
            self.kind,
            MatrixKind::MultiDomain,
            "domains require a multi-domain matrix"
        );
        let mut changes = Vec::new();
        if domain.uid != self.state.default_domain.uid
            && !self.state.domains.iter().any(|d| d.uid == domain.uid)
        {
            changes.push(Change::AddDomain {
                grouping: domain.clone(),
            });
        }
        let (side, item) = self.expect_item(uid);
        let item = item.clone();
        changes.push(Change::SetItemDomain {
            side,
            uid,
            old: item.group2,
            new: Some(domain.uid),
        });
        let alias = item.alias.expect("alias-paired item has no alias");
        let partner = self
            .state
            .arena(side.opposite())
            .get(&alias)
            .expect("alias lookup failed")
            .clone();
        assert_eq!(
            partner.group2, item.group2,
            "domain mismatch between item and alias"
        );
        changes.push(Change::SetItemDomain {
            side: side.opposite(),
            uid: partner.uid,
            old: partner.group2,
            new: Some(domain.uid),
        });
        self.record(changes);
    }

    // ---- zoom / un-zoom ---------------------------------------------------

    /// Extract the sub-matrix of items in domains `d1` (rows) and `d2`
    /// (columns) as a standalone matrix: symmetric when `d1 == d2`, otherwise
    /// asymmetric with alias links dropped (rows and columns are then
    /// different item populations). UIDs are preserved so the projection can
    /// be merged back with [`Matrix::unzoom`].
    pub fn zoom(&self, d1: Uid, d2: Uid) -> Matrix {
        assert_eq!(
            self.kind,
            MatrixKind::MultiDomain,
            "zoom requires a multi-domain matrix"
        );
        let symmetric = d1 == d2;
        let mut state = MatrixState::new();
        state.metadata = self.state.metadata.clone();

        let mut rows: HashMap<Uid, DsmItem> = HashMap::new();
        for item in self.state.rows.values() {
            if item.group2 == Some(d1) {
                let mut copy = item.clone();
                copy.group2 = None;
                if !symmetric {
                    copy.alias = None;
                }
                rows.insert(copy.uid, copy);
            }
        }
        let mut cols: HashMap<Uid, DsmItem> = HashMap::new();
        for item in self.state.cols.values() {
            if item.group2 == Some(d2) {
                let mut copy = item.clone();
                copy.group2 = None;
                if !symmetric {
                    copy.alias = None;
                }
                cols.insert(copy.uid, copy);
            }
        }

        // carry over the groupings in use
        for item in rows.values().chain(cols.values()) {
            if item.group1 == self.state.default_grouping.uid {
                continue;
            }
            if state.groupings.iter().any(|g| g.uid == item.group1) {
                continue;
            }
            if let Some(grouping) = self.grouping(item.group1) {
                state.groupings.push_back(grouping.clone());
            }
        }

        for conn in &self.state.connections {
            if rows.contains_key(&conn.row_uid) && cols.contains_key(&conn.col_uid) {
                state.connections.push_back(conn.clone());
            }
        }

        state.rows = rows;
        state.cols = cols;
        let kind = if symmetric {
            MatrixKind::Symmetric
        } else {
            MatrixKind::Asymmetric
        };
        Matrix::from_state(kind, state)
    }

    /// Merge an edited zoom projection back into this matrix: sync surviving
    /// items, create items added in the projection (under the zoomed domain),
    /// delete items removed from it, and reconcile connections between the
    /// zoomed item sets. Everything goes through the normal mutators and is
    /// closed with one checkpoint.
    pub fn unzoom(&mut self, sub: &Matrix, d1: Uid, d2: Uid) {
        assert_eq!(
            self.kind,
            MatrixKind::MultiDomain,
            "unzoom requires a multi-domain matrix"
        );
        let symmetric = d1 == d2;
        assert_eq!(
            sub.kind(),
            if symmetric {
                MatrixKind::Symmetric
            } else {
                MatrixKind::Asymmetric
            },
            "zoom projection kind does not match the zoomed domains"
        );

        // items removed in the projection go first, so their connections
        // cannot collide with the reconciliation below
        let doomed_rows: Vec<Uid> = self
            .state
            .rows
            .values()
            .filter(|i| i.group2 == Some(d1) && sub.item(i.uid).is_none())
            .map(|i| i.uid)
            .collect();
        for uid in doomed_rows {
            self.delete_item(uid);
        }
        if !symmetric {
            let doomed_cols: Vec<Uid> = self
                .state
                .cols
                .values()
                .filter(|i| i.group2 == Some(d2) && sub.item(i.uid).is_none())
                .map(|i| i.uid)
                .collect();
            for uid in doomed_cols {
                self.delete_item(uid);
            }
        }

        // surviving and added items
        let sub_rows: Vec<DsmItem> = sub.sorted_rows().into_iter().cloned().collect();
        for item in &sub_rows {
            self.sync_zoomed_item(sub, item, d1, symmetric);
        }
        if !symmetric {
            let sub_cols: Vec<DsmItem> = sub.sorted_cols().into_iter().cloned().collect();
            for item in &sub_cols {
                self.sync_zoomed_item(sub, item, d2, symmetric);
            }
        }

        // reconcile connections between the zoomed sets
        let row_uids: Vec<Uid> = self
            .state
            .rows
            .values()
            .filter(|i| i.group2 == Some(d1))
            .map(|i| i.uid)
            .collect();
        let col_uids: Vec<Uid> = self
            .state
            .cols
            .values()
            .filter(|i| i.group2 == Some(d2))
            .map(|i| i.uid)
            .collect();
        for &r in &row_uids {
            for &c in &col_uids {
                if self
                    .item(r)
                    .and_then(|i| i.alias)
                    .is_some_and(|alias| alias == c)
                {
                    continue;
                }
                match (sub.get_connection(r, c), self.get_connection(r, c)) {
                    (Some(want), have) => {
                        let differs = have
                            .map(|h| h.name != want.name || h.weight != want.weight)
                            .unwrap_or(true);
                        if differs {
                            let (name, weight) = (want.name.clone(), want.weight);
                            self.create_connection(r, c, &name, weight);
                        }
                    }
                    (None, Some(_)) => self.delete_connection(r, c),
                    (None, None) => {}
                }
            }
        }
        self.set_checkpoint();
    }

    /// Sync one projection item back into the parent, creating it (and a
    /// mirror partner) when the projection introduced it.
    fn sync_zoomed_item(&mut self, sub: &Matrix, item: &DsmItem, domain: Uid, symmetric: bool) {
        if let Some(current) = self.item(item.uid).cloned() {
            if current.name != item.name {
                self.set_item_name(item.uid, &item.name);
            }
            if current.sort_index != item.sort_index {
                self.set_item_sort_index(item.uid, item.sort_index);
            }
            if current.group1 != item.group1 {
                let grouping = if item.group1 == Grouping::DEFAULT_UID {
                    self.state.default_grouping.clone()
                } else {
                    sub.grouping(item.group1)
                        .expect("projection grouping lookup failed")
                        .clone()
                };
                self.set_item_group(item.uid, &grouping);
            }
            return;
        }

        // added in the projection: adopt it with its UID and pair it with a
        // fresh mirror partner
        let mut adopted = item.clone();
        adopted.group2 = Some(domain);
        let mut partner = adopted.clone();
        partner.uid = if symmetric {
            item.alias.expect("symmetric projection item has no alias")
        } else {
            Uid::random()
        };
        adopted.alias = Some(partner.uid);
        partner.alias = Some(adopted.uid);

        let item_is_row = sub.is_row(item.uid);
        let (item_side, partner_side) = if item_is_row {
            (Side::Row, Side::Col)
        } else {
            (Side::Col, Side::Row)
        };

        let mut changes = Vec::new();
        if adopted.group1 != Grouping::DEFAULT_UID
            && !self.state.groupings.iter().any(|g| g.uid == adopted.group1)
        {
            let grouping = sub
                .grouping(adopted.group1)
                .expect("projection grouping lookup failed")
                .clone();
            changes.push(Change::AddGrouping { grouping });
        }
        changes.push(Change::AddItem {
            side: item_side,
            item: adopted,
        });
        changes.push(Change::AddItem {
            side: partner_side,
            item: partner,
        });
        self.record(changes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Color;

    fn two_domain_matrix() -> (Matrix, Grouping, Grouping) {
        let mut matrix = Matrix::multi_domain();
        let mech = Grouping::new("mechanical", Color::new(200, 60, 60));
        let elec = Grouping::new("electrical", Color::new(60, 60, 200));
        matrix.add_domain(mech.clone());
        matrix.add_domain(elec.clone());
        let engine = matrix.create_item("Engine", true);
        let pump = matrix.create_item("Pump", true);
        let ecu = matrix.create_item("ECU", true);
        matrix.set_item_domain(engine, &mech);
        matrix.set_item_domain(pump, &mech);
        matrix.set_item_domain(ecu, &elec);
        (matrix, mech, elec)
    }

    #[test]
    fn test_created_items_start_in_default_domain() {
        let mut matrix = Matrix::multi_domain();
        let uid = matrix.create_item("a", true);
        let item = matrix.item(uid).unwrap();
        assert_eq!(item.group2, Some(Grouping::DEFAULT_DOMAIN_UID));
    }

    #[test]
    fn test_domain_lockstep_with_alias() {
        let (matrix, mech, _) = two_domain_matrix();
        for item in matrix.rows() {
            if item.group2 == Some(mech.uid) {
                let alias = item.alias.unwrap();
                assert_eq!(matrix.item(alias).unwrap().group2, Some(mech.uid));
            }
        }
    }

    #[test]
    fn test_remove_domain_repoints_members() {
        let (mut matrix, mech, _) = two_domain_matrix();
        matrix.remove_domain(mech.uid);
        for item in matrix.rows() {
            assert_ne!(item.group2, Some(mech.uid));
        }
        assert!(matrix.domains().all(|d| d.uid != mech.uid));
    }

    #[test]
    fn test_zoom_single_domain_is_symmetric() {
        let (matrix, mech, _) = two_domain_matrix();
        let sub = matrix.zoom(mech.uid, mech.uid);
        assert_eq!(sub.kind(), MatrixKind::Symmetric);
        assert_eq!(sub.row_count(), 2);
        assert_eq!(sub.col_count(), 2);
        let names: Vec<&str> = sub.sorted_rows().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Engine", "Pump"]);
        // alias pairing survives a single-domain zoom
        for row in sub.rows() {
            let alias = row.alias.unwrap();
            assert_eq!(sub.item(alias).unwrap().name, row.name);
        }
    }

    #[test]
    fn test_zoom_two_domains_is_asymmetric() {
        let (mut matrix, mech, elec) = two_domain_matrix();
        let engine = matrix.sorted_rows()[0].uid;
        let ecu_col = matrix
            .sorted_cols()
            .iter()
            .find(|i| i.name == "ECU")
            .unwrap()
            .uid;
        matrix.create_connection(engine, ecu_col, "control", 3.0);

        let sub = matrix.zoom(mech.uid, elec.uid);
        assert_eq!(sub.kind(), MatrixKind::Asymmetric);
        assert_eq!(sub.row_count(), 2);
        assert_eq!(sub.col_count(), 1);
        assert!(sub.get_connection(engine, ecu_col).is_some());
        assert!(sub.rows().all(|i| i.alias.is_none()));
    }

    #[test]
    fn test_unzoom_syncs_edits_back() {
        let (mut matrix, mech, _) = two_domain_matrix();
        let mut sub = matrix.zoom(mech.uid, mech.uid);

        let engine = sub
            .sorted_rows()
            .iter()
            .find(|i| i.name == "Engine")
            .unwrap()
            .uid;
        let pump_col = sub
            .sorted_cols()
            .iter()
            .find(|i| i.name == "Pump")
            .unwrap()
            .uid;
        sub.set_item_name(engine, "Engine V2");
        sub.create_connection(engine, pump_col, "oil", 2.0);

        matrix.unzoom(&sub, mech.uid, mech.uid);
        assert_eq!(matrix.item(engine).unwrap().name, "Engine V2");
        assert_eq!(matrix.get_connection(engine, pump_col).unwrap().weight, 2.0);
    }

    #[test]
    fn test_unzoom_adopts_new_items_and_deletes_removed() {
        let (mut matrix, mech, _) = two_domain_matrix();
        let mut sub = matrix.zoom(mech.uid, mech.uid);

        let pump = sub
            .sorted_rows()
            .iter()
            .find(|i| i.name == "Pump")
            .unwrap()
            .uid;
        sub.delete_item(pump);
        let shaft = sub.create_item("Shaft", true);

        matrix.unzoom(&sub, mech.uid, mech.uid);
        assert!(matrix.item(pump).is_none());
        let adopted = matrix.item(shaft).unwrap();
        assert_eq!(adopted.name, "Shaft");
        assert_eq!(adopted.group2, Some(mech.uid));
        // ECU was outside the zoom and is untouched
        assert!(matrix.rows().any(|i| i.name == "ECU"));
    }
}
