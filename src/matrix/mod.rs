//! DSM data core
//!
//! [`Matrix`] is a closed tagged variant over [`MatrixKind`]: one shared
//! representation (item arenas keyed by UID, a connection list, grouping and
//! domain sets, metadata) with kind-specific invariants enforced at the
//! mutation entry points. Items reference their mirror partner by alias UID
//! rather than by live reference, so deletes and undo replays cannot leave
//! dangling links.
//!
//! Every mutator funnels through the change stack: it builds the primitive
//! [`Change`]s, applies them, and records them as one atomic unit. The view
//! layer marks a checkpoint after each logical edit; `undo_to_checkpoint` and
//! `redo_to_checkpoint` unwind whole checkpoint-delimited groups.

pub mod builder;
pub mod grid;
mod multi_domain;
mod symmetric;

pub use builder::MatrixBuilder;
pub use grid::Cell;

use im::{HashMap, Vector};
use serde::{Deserialize, Serialize};

use crate::core::{
    DsmConnection, DsmItem, Grouping, InterfaceType, MatrixKind, MatrixMetadata, MetadataField,
    Uid, UNSET_PRIORITY,
};
use crate::history::{Change, ChangeStack, ChangeUnit, ConnectionFields, Side};

/// The data portion of a matrix. Structural equality on this struct is the
/// equality the undo round-trip property is stated over; the change stacks
/// and modified flag live outside it.
///
/// Persistent (`im`) collections keep deep copies cheap: the clustering
/// search clones the whole matrix once per iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct MatrixState {
    pub rows: HashMap<Uid, DsmItem>,
    pub cols: HashMap<Uid, DsmItem>,
    pub connections: Vector<DsmConnection>,
    /// User groupings in insertion order; the default grouping is held apart
    /// and cannot be removed.
    pub groupings: Vector<Grouping>,
    pub default_grouping: Grouping,
    /// Secondary-dimension categories for multi-domain matrices.
    pub domains: Vector<Grouping>,
    pub default_domain: Grouping,
    /// Interface-type categories in insertion order.
    pub interface_groupings: Vector<(String, Vector<InterfaceType>)>,
    pub metadata: MatrixMetadata,
}

impl MatrixState {
    fn new() -> Self {
        MatrixState {
            rows: HashMap::new(),
            cols: HashMap::new(),
            connections: Vector::new(),
            groupings: Vector::new(),
            default_grouping: Grouping::default_group(),
            domains: Vector::new(),
            default_domain: Grouping::default_domain(),
            interface_groupings: Vector::new(),
            metadata: MatrixMetadata::default(),
        }
    }

    pub(crate) fn arena(&self, side: Side) -> &HashMap<Uid, DsmItem> {
        match side {
            Side::Row => &self.rows,
            Side::Col => &self.cols,
        }
    }

    fn arena_mut(&mut self, side: Side) -> &mut HashMap<Uid, DsmItem> {
        match side {
            Side::Row => &mut self.rows,
            Side::Col => &mut self.cols,
        }
    }

    fn item_mut(&mut self, side: Side, uid: Uid) -> &mut DsmItem {
        self.arena_mut(side)
            .get_mut(&uid)
            .expect("item missing during change replay")
    }

    fn connection_index(&self, row_uid: Uid, col_uid: Uid) -> Option<usize> {
        self.connections
            .iter()
            .position(|c| c.row_uid == row_uid && c.col_uid == col_uid)
    }

    fn grouping_mut(&mut self, uid: Uid) -> &mut Grouping {
        if self.default_grouping.uid == uid {
            return &mut self.default_grouping;
        }
        if self.default_domain.uid == uid {
            return &mut self.default_domain;
        }
        if let Some(i) = self.groupings.iter().position(|g| g.uid == uid) {
            return self.groupings.get_mut(i).unwrap();
        }
        if let Some(i) = self.domains.iter().position(|g| g.uid == uid) {
            return self.domains.get_mut(i).unwrap();
        }
        panic!("grouping {uid} missing during change replay");
    }

    /// Apply one primitive change. Replay-time lookups that fail are contract
    /// violations: the change was recorded against a state that no longer
    /// matches.
    fn apply(&mut self, change: &Change) {
        match change {
            Change::AddItem { side, item } => {
                self.arena_mut(*side).insert(item.uid, item.clone());
            }
            Change::RemoveItem { side, item } => {
                self.arena_mut(*side).remove(&item.uid);
            }
            Change::SetItemName { side, uid, new, .. } => {
                self.item_mut(*side, *uid).name = new.clone();
            }
            Change::SetItemSortIndex { side, uid, new, .. } => {
                self.item_mut(*side, *uid).sort_index = *new;
            }
            Change::SetItemGroup { side, uid, new, .. } => {
                self.item_mut(*side, *uid).group1 = *new;
            }
            Change::SetItemDomain { side, uid, new, .. } => {
                self.item_mut(*side, *uid).group2 = *new;
            }
            Change::AddConnection { connection } => {
                self.connections.push_back(connection.clone());
            }
            Change::RemoveConnection { connection } => {
                if let Some(i) = self.connection_index(connection.row_uid, connection.col_uid) {
                    self.connections.remove(i);
                }
            }
            Change::SetConnection {
                row_uid,
                col_uid,
                new,
                ..
            } => {
                let i = self
                    .connection_index(*row_uid, *col_uid)
                    .expect("connection missing during change replay");
                let conn = self.connections.get_mut(i).unwrap();
                conn.name = new.name.clone();
                conn.weight = new.weight;
                conn.interfaces = new.interfaces.clone();
            }
            Change::AddGrouping { grouping } => {
                self.groupings.push_back(grouping.clone());
            }
            Change::RemoveGrouping { grouping } => {
                self.groupings.retain(|g| g.uid != grouping.uid);
            }
            Change::RenameGrouping { uid, new, .. } => {
                self.grouping_mut(*uid).name = new.clone();
            }
            Change::SetGroupingColor { uid, new, .. } => {
                self.grouping_mut(*uid).color = *new;
            }
            Change::SetGroupingFontColor { uid, new, .. } => {
                self.grouping_mut(*uid).font_color = *new;
            }
            Change::SetGroupingPriority { uid, new, .. } => {
                self.grouping_mut(*uid).priority = *new;
            }
            Change::AddDomain { grouping } => {
                self.domains.push_back(grouping.clone());
            }
            Change::RemoveDomain { grouping } => {
                self.domains.retain(|g| g.uid != grouping.uid);
            }
            Change::AddInterfaceGrouping { name, interfaces } => {
                self.interface_groupings
                    .push_back((name.clone(), interfaces.iter().cloned().collect()));
            }
            Change::RemoveInterfaceGrouping { name, .. } => {
                self.interface_groupings.retain(|(n, _)| n != name);
            }
            Change::AddInterface {
                grouping,
                interface,
            } => {
                let i = self
                    .interface_groupings
                    .iter()
                    .position(|(n, _)| n == grouping)
                    .expect("interface grouping missing during change replay");
                self.interface_groupings
                    .get_mut(i)
                    .unwrap()
                    .1
                    .push_back(interface.clone());
            }
            Change::RemoveInterface {
                grouping,
                interface,
            } => {
                let i = self
                    .interface_groupings
                    .iter()
                    .position(|(n, _)| n == grouping)
                    .expect("interface grouping missing during change replay");
                self.interface_groupings
                    .get_mut(i)
                    .unwrap()
                    .1
                    .retain(|t| t.uid != interface.uid);
            }
            Change::RenameInterface { uid, new, .. } => {
                self.interface_mut(*uid).name = new.clone();
            }
            Change::SetInterfaceAbbreviation { uid, new, .. } => {
                self.interface_mut(*uid).abbreviation = new.clone();
            }
            Change::SetMetadata { field, new, .. } => {
                let slot = match field {
                    MetadataField::Title => &mut self.metadata.title,
                    MetadataField::ProjectName => &mut self.metadata.project_name,
                    MetadataField::Customer => &mut self.metadata.customer,
                    MetadataField::VersionNumber => &mut self.metadata.version_number,
                };
                *slot = new.clone();
            }
        }
    }

    fn interface_mut(&mut self, uid: Uid) -> &mut InterfaceType {
        for gi in 0..self.interface_groupings.len() {
            let (_, types) = self.interface_groupings.get(gi).unwrap();
            if let Some(ti) = types.iter().position(|t| t.uid == uid) {
                return self
                    .interface_groupings
                    .get_mut(gi)
                    .unwrap()
                    .1
                    .get_mut(ti)
                    .unwrap();
            }
        }
        panic!("interface type {uid} missing during change replay");
    }
}

/// A Design Structure Matrix: items, connections, groupings, and the change
/// stack that makes every mutation undoable.
#[derive(Debug)]
pub struct Matrix {
    kind: MatrixKind,
    state: MatrixState,
    stack: ChangeStack,
    was_modified: bool,
}

impl Matrix {
    pub fn new(kind: MatrixKind) -> Self {
        Matrix {
            kind,
            state: MatrixState::new(),
            stack: ChangeStack::new(),
            was_modified: false,
        }
    }

    pub fn symmetric() -> Self {
        Self::new(MatrixKind::Symmetric)
    }

    pub fn asymmetric() -> Self {
        Self::new(MatrixKind::Asymmetric)
    }

    pub fn multi_domain() -> Self {
        Self::new(MatrixKind::MultiDomain)
    }

    pub(crate) fn from_state(kind: MatrixKind, state: MatrixState) -> Self {
        Matrix {
            kind,
            state,
            stack: ChangeStack::new(),
            was_modified: false,
        }
    }

    pub fn kind(&self) -> MatrixKind {
        self.kind
    }

    /// Apply and record one atomic unit of primitive changes.
    pub(crate) fn record(&mut self, changes: Vec<Change>) {
        if changes.is_empty() {
            return;
        }
        for change in &changes {
            self.state.apply(change);
        }
        self.stack.push(ChangeUnit::new(changes));
        self.was_modified = true;
    }

    // ---- items ------------------------------------------------------------

    /// Create a new item named `name`. Alias-paired kinds create the
    /// row/column pair atomically, sharing name, sort index, the default
    /// grouping, and mutual aliases; `is_row` is ignored for them. Returns
    /// the UID of the created item on the requested side.
    pub fn create_item(&mut self, name: &str, is_row: bool) -> Uid {
        if self.kind.is_alias_paired() {
            let sort_index = self.next_sort_index(Side::Row);
            let mut row = DsmItem::new(name, sort_index);
            let mut col = DsmItem::new(name, sort_index);
            row.alias = Some(col.uid);
            col.alias = Some(row.uid);
            if self.kind == MatrixKind::MultiDomain {
                row.group2 = Some(self.state.default_domain.uid);
                col.group2 = Some(self.state.default_domain.uid);
            }
            let row_uid = row.uid;
            let col_uid = col.uid;
            self.record(vec![
                Change::AddItem {
                    side: Side::Row,
                    item: row,
                },
                Change::AddItem {
                    side: Side::Col,
                    item: col,
                },
            ]);
            if is_row {
                row_uid
            } else {
                col_uid
            }
        } else {
            let side = if is_row { Side::Row } else { Side::Col };
            let item = DsmItem::new(name, self.next_sort_index(side));
            let uid = item.uid;
            self.record(vec![Change::AddItem { side, item }]);
            uid
        }
    }

    /// One greater than the current maximum sort index on `side`, truncated
    /// toward a whole number. 1 for an empty side.
    fn next_sort_index(&self, side: Side) -> f64 {
        match self
            .state
            .arena(side)
            .values()
            .map(|i| i.sort_index)
            .reduce(f64::max)
        {
            Some(max) => (max.trunc() as i64 + 1) as f64,
            None => 1.0,
        }
    }

    /// Delete an item. Alias-paired kinds remove the item, its partner, and
    /// every connection touching either, as one undoable unit.
    pub fn delete_item(&mut self, uid: Uid) {
        let (side, item) = self.expect_item(uid);
        let item = item.clone();
        let mut doomed_uids = vec![item.uid];
        let mut changes = Vec::new();

        if self.kind.is_alias_paired() {
            let partner_uid = item.alias.expect("alias-paired item has no alias");
            let partner = self
                .state
                .arena(side.opposite())
                .get(&partner_uid)
                .expect("alias lookup failed")
                .clone();
            doomed_uids.push(partner.uid);
            for conn in &self.state.connections {
                if doomed_uids.contains(&conn.row_uid) || doomed_uids.contains(&conn.col_uid) {
                    changes.push(Change::RemoveConnection {
                        connection: conn.clone(),
                    });
                }
            }
            changes.push(Change::RemoveItem {
                side: side.opposite(),
                item: partner,
            });
        } else {
            for conn in &self.state.connections {
                if conn.row_uid == uid || conn.col_uid == uid {
                    changes.push(Change::RemoveConnection {
                        connection: conn.clone(),
                    });
                }
            }
        }
        changes.push(Change::RemoveItem { side, item });
        self.record(changes);
    }

    /// Rename an item (and its alias partner in lockstep for alias-paired
    /// kinds) in one change unit.
    pub fn set_item_name(&mut self, uid: Uid, name: &str) {
        let (side, item) = self.expect_item(uid);
        let item = item.clone();
        let mut changes = vec![Change::SetItemName {
            side,
            uid,
            old: item.name.clone(),
            new: name.to_string(),
        }];
        if let Some(partner) = self.alias_partner(side, &item) {
            assert_eq!(
                partner.name, item.name,
                "symmetric name mismatch between item and alias before rename"
            );
            changes.push(Change::SetItemName {
                side: side.opposite(),
                uid: partner.uid,
                old: partner.name.clone(),
                new: name.to_string(),
            });
        }
        self.record(changes);
    }

    /// Re-index an item (and its alias partner in lockstep) in one change
    /// unit.
    pub fn set_item_sort_index(&mut self, uid: Uid, sort_index: f64) {
        let (side, item) = self.expect_item(uid);
        let item = item.clone();
        let mut changes = vec![Change::SetItemSortIndex {
            side,
            uid,
            old: item.sort_index,
            new: sort_index,
        }];
        if let Some(partner) = self.alias_partner(side, &item) {
            assert_eq!(
                partner.sort_index, item.sort_index,
                "symmetric sort index mismatch between item and alias"
            );
            changes.push(Change::SetItemSortIndex {
                side: side.opposite(),
                uid: partner.uid,
                old: partner.sort_index,
                new: sort_index,
            });
        }
        self.record(changes);
    }

    /// Assign an item (and its alias partner in lockstep) to `grouping`. A
    /// grouping the matrix has not seen before is registered inside the same
    /// change unit, so undo unregisters it again.
    pub fn set_item_group(&mut self, uid: Uid, grouping: &Grouping) {
        let mut changes = Vec::new();
        if grouping.uid != self.state.default_grouping.uid
            && !self.state.groupings.iter().any(|g| g.uid == grouping.uid)
        {
            changes.push(Change::AddGrouping {
                grouping: grouping.clone(),
            });
        }
        let (side, item) = self.expect_item(uid);
        let item = item.clone();
        changes.push(Change::SetItemGroup {
            side,
            uid,
            old: item.group1,
            new: grouping.uid,
        });
        if let Some(partner) = self.alias_partner(side, &item) {
            assert_eq!(
                partner.group1, item.group1,
                "symmetric group mismatch between item and alias"
            );
            changes.push(Change::SetItemGroup {
                side: side.opposite(),
                uid: partner.uid,
                old: partner.group1,
                new: grouping.uid,
            });
        }
        self.record(changes);
    }

    /// The alias partner of `item`, when this kind pairs aliases. Panics on a
    /// broken pairing; that is a contract violation, not a recoverable state.
    fn alias_partner(&self, side: Side, item: &DsmItem) -> Option<DsmItem> {
        if !self.kind.is_alias_paired() {
            return None;
        }
        let alias = item.alias.expect("alias-paired item has no alias");
        let partner = self
            .state
            .arena(side.opposite())
            .get(&alias)
            .expect("alias lookup failed");
        Some(partner.clone())
    }

    pub(crate) fn expect_item(&self, uid: Uid) -> (Side, &DsmItem) {
        if let Some(item) = self.state.rows.get(&uid) {
            return (Side::Row, item);
        }
        if let Some(item) = self.state.cols.get(&uid) {
            return (Side::Col, item);
        }
        panic!("uid {uid} does not resolve to an item");
    }

    // ---- connections ------------------------------------------------------

    /// Create (or modify, when the ordered pair already has one) the
    /// connection from `row_uid` to `col_uid`.
    ///
    /// Panics when the endpoints are alias partners in an alias-paired
    /// matrix: an item can never connect to its own mirror.
    pub fn create_connection(&mut self, row_uid: Uid, col_uid: Uid, name: &str, weight: f64) {
        let changes = self.connection_upsert_changes(row_uid, col_uid, name, weight);
        self.record(changes);
    }

    /// The primitive changes for one connection upsert, shared with the
    /// symmetric mirror path.
    pub(crate) fn connection_upsert_changes(
        &self,
        row_uid: Uid,
        col_uid: Uid,
        name: &str,
        weight: f64,
    ) -> Vec<Change> {
        let row = self
            .state
            .rows
            .get(&row_uid)
            .unwrap_or_else(|| panic!("uid {row_uid} does not resolve to a row item"));
        assert!(
            self.state.cols.contains_key(&col_uid),
            "uid {col_uid} does not resolve to a column item"
        );
        if self.kind.is_alias_paired() {
            assert!(
                row.alias != Some(col_uid),
                "cannot connect a symmetric item to its own alias"
            );
        }
        match self.get_connection(row_uid, col_uid) {
            Some(existing) => {
                let mut new = ConnectionFields::of(existing);
                new.name = name.to_string();
                new.weight = weight;
                vec![Change::SetConnection {
                    row_uid,
                    col_uid,
                    old: ConnectionFields::of(existing),
                    new,
                }]
            }
            None => vec![Change::AddConnection {
                connection: DsmConnection::new(row_uid, col_uid, name, weight),
            }],
        }
    }

    /// Remove the connection for the ordered pair, if present.
    pub fn delete_connection(&mut self, row_uid: Uid, col_uid: Uid) {
        if let Some(conn) = self.get_connection(row_uid, col_uid) {
            let connection = conn.clone();
            self.record(vec![Change::RemoveConnection { connection }]);
        }
    }

    /// Tag a connection with an interface type.
    pub fn add_connection_interface(&mut self, row_uid: Uid, col_uid: Uid, interface: Uid) {
        let conn = self
            .get_connection(row_uid, col_uid)
            .expect("no connection for pair");
        let old = ConnectionFields::of(conn);
        let mut new = old.clone();
        if !new.interfaces.insert(interface) {
            return;
        }
        self.record(vec![Change::SetConnection {
            row_uid,
            col_uid,
            old,
            new,
        }]);
    }

    pub fn remove_connection_interface(&mut self, row_uid: Uid, col_uid: Uid, interface: Uid) {
        let conn = self
            .get_connection(row_uid, col_uid)
            .expect("no connection for pair");
        let old = ConnectionFields::of(conn);
        let mut new = old.clone();
        if !new.interfaces.remove(&interface) {
            return;
        }
        self.record(vec![Change::SetConnection {
            row_uid,
            col_uid,
            old,
            new,
        }]);
    }

    /// Exact ordered-pair lookup. Linear scan; matrices this tool targets are
    /// small enough that indexing by pair buys nothing observable.
    pub fn get_connection(&self, row_uid: Uid, col_uid: Uid) -> Option<&DsmConnection> {
        self.state
            .connections
            .iter()
            .find(|c| c.row_uid == row_uid && c.col_uid == col_uid)
    }

    pub fn connections(&self) -> impl Iterator<Item = &DsmConnection> {
        self.state.connections.iter()
    }

    // ---- groupings --------------------------------------------------------

    pub fn add_grouping(&mut self, grouping: Grouping) {
        if grouping.uid == self.state.default_grouping.uid
            || self.state.groupings.iter().any(|g| g.uid == grouping.uid)
        {
            return;
        }
        self.record(vec![Change::AddGrouping { grouping }]);
    }

    /// Remove a grouping, re-pointing its members at the default grouping in
    /// the same unit. The default grouping cannot be removed.
    pub fn remove_grouping(&mut self, uid: Uid) {
        assert!(
            uid != self.state.default_grouping.uid,
            "the default grouping cannot be removed"
        );
        let grouping = match self.state.groupings.iter().find(|g| g.uid == uid) {
            Some(g) => g.clone(),
            None => return,
        };
        let default = self.state.default_grouping.uid;
        let mut changes = Vec::new();
        for side in [Side::Row, Side::Col] {
            for item in self.state.arena(side).values() {
                if item.group1 == uid {
                    changes.push(Change::SetItemGroup {
                        side,
                        uid: item.uid,
                        old: item.group1,
                        new: default,
                    });
                }
            }
        }
        changes.push(Change::RemoveGrouping { grouping });
        self.record(changes);
    }

    /// Drop every user grouping and re-point all items at the default, as one
    /// unit. The clustering algorithms start from this state.
    pub fn clear_groupings(&mut self) {
        let default = self.state.default_grouping.uid;
        let mut changes = Vec::new();
        for side in [Side::Row, Side::Col] {
            for item in self.state.arena(side).values() {
                if item.group1 != default {
                    changes.push(Change::SetItemGroup {
                        side,
                        uid: item.uid,
                        old: item.group1,
                        new: default,
                    });
                }
            }
        }
        // reverse order so undo re-adds them in their original order
        for grouping in self.state.groupings.iter().rev() {
            changes.push(Change::RemoveGrouping {
                grouping: grouping.clone(),
            });
        }
        self.record(changes);
    }

    pub fn rename_grouping(&mut self, uid: Uid, name: &str) {
        let old = self.expect_grouping(uid).name.clone();
        self.record(vec![Change::RenameGrouping {
            uid,
            old,
            new: name.to_string(),
        }]);
    }

    pub fn set_grouping_color(&mut self, uid: Uid, color: crate::core::Color) {
        let old = self.expect_grouping(uid).color;
        self.record(vec![Change::SetGroupingColor {
            uid,
            old,
            new: color,
        }]);
    }

    pub fn set_grouping_font_color(&mut self, uid: Uid, color: crate::core::Color) {
        let old = self.expect_grouping(uid).font_color;
        self.record(vec![Change::SetGroupingFontColor {
            uid,
            old,
            new: color,
        }]);
    }

    pub fn set_grouping_priority(&mut self, uid: Uid, priority: i32) {
        let old = self.expect_grouping(uid).priority;
        self.record(vec![Change::SetGroupingPriority {
            uid,
            old,
            new: priority,
        }]);
    }

    fn expect_grouping(&self, uid: Uid) -> &Grouping {
        self.grouping(uid)
            .unwrap_or_else(|| panic!("uid {uid} does not resolve to a grouping"))
    }

    /// Look up a grouping or domain by UID, including the defaults.
    pub fn grouping(&self, uid: Uid) -> Option<&Grouping> {
        if self.state.default_grouping.uid == uid {
            return Some(&self.state.default_grouping);
        }
        if self.state.default_domain.uid == uid {
            return Some(&self.state.default_domain);
        }
        self.state
            .groupings
            .iter()
            .find(|g| g.uid == uid)
            .or_else(|| self.state.domains.iter().find(|g| g.uid == uid))
    }

    pub fn default_grouping(&self) -> &Grouping {
        &self.state.default_grouping
    }

    /// User groupings in insertion order (the order clustering bids iterate
    /// in).
    pub fn groupings(&self) -> impl Iterator<Item = &Grouping> {
        self.state.groupings.iter()
    }

    /// Groupings sorted for presentation: ascending priority (unset last),
    /// then name.
    pub fn sorted_groupings(&self) -> Vec<&Grouping> {
        let mut groupings: Vec<&Grouping> = self.state.groupings.iter().collect();
        groupings.sort_by(|a, b| {
            let pa = if a.priority == UNSET_PRIORITY {
                i32::MAX
            } else {
                a.priority
            };
            let pb = if b.priority == UNSET_PRIORITY {
                i32::MAX
            } else {
                b.priority
            };
            pa.cmp(&pb).then_with(|| a.name.cmp(&b.name))
        });
        groupings
    }

    // ---- interface types --------------------------------------------------

    pub fn add_interface_grouping(&mut self, name: &str) {
        if self.state.interface_groupings.iter().any(|(n, _)| n == name) {
            return;
        }
        self.record(vec![Change::AddInterfaceGrouping {
            name: name.to_string(),
            interfaces: Vec::new(),
        }]);
    }

    /// Remove an interface category and everything in it as one unit; undo
    /// restores the contents.
    pub fn remove_interface_grouping(&mut self, name: &str) {
        let Some((_, types)) = self
            .state
            .interface_groupings
            .iter()
            .find(|(n, _)| n == name)
        else {
            return;
        };
        let interfaces: Vec<InterfaceType> = types.iter().cloned().collect();
        self.record(vec![Change::RemoveInterfaceGrouping {
            name: name.to_string(),
            interfaces,
        }]);
    }

    pub fn add_interface(&mut self, grouping: &str, interface: InterfaceType) {
        assert!(
            self.state
                .interface_groupings
                .iter()
                .any(|(n, _)| n == grouping),
            "unknown interface grouping \"{grouping}\""
        );
        self.record(vec![Change::AddInterface {
            grouping: grouping.to_string(),
            interface,
        }]);
    }

    pub fn remove_interface(&mut self, grouping: &str, interface_uid: Uid) {
        let Some((name, types)) = self
            .state
            .interface_groupings
            .iter()
            .find(|(n, _)| n == grouping)
        else {
            return;
        };
        let Some(interface) = types.iter().find(|t| t.uid == interface_uid) else {
            return;
        };
        let change = Change::RemoveInterface {
            grouping: name.clone(),
            interface: interface.clone(),
        };
        self.record(vec![change]);
    }

    pub fn rename_interface(&mut self, uid: Uid, name: &str) {
        let old = self.expect_interface(uid).name.clone();
        self.record(vec![Change::RenameInterface {
            uid,
            old,
            new: name.to_string(),
        }]);
    }

    pub fn set_interface_abbreviation(&mut self, uid: Uid, abbreviation: &str) {
        let old = self.expect_interface(uid).abbreviation.clone();
        self.record(vec![Change::SetInterfaceAbbreviation {
            uid,
            old,
            new: abbreviation.to_string(),
        }]);
    }

    pub fn interface_type(&self, uid: Uid) -> Option<&InterfaceType> {
        self.state
            .interface_groupings
            .iter()
            .flat_map(|(_, types)| types.iter())
            .find(|t| t.uid == uid)
    }

    fn expect_interface(&self, uid: Uid) -> &InterfaceType {
        self.interface_type(uid)
            .unwrap_or_else(|| panic!("uid {uid} does not resolve to an interface type"))
    }

    pub fn interface_groupings(&self) -> impl Iterator<Item = (&String, Vec<&InterfaceType>)> {
        self.state
            .interface_groupings
            .iter()
            .map(|(name, types)| (name, types.iter().collect()))
    }

    // ---- metadata ---------------------------------------------------------

    pub fn metadata(&self) -> &MatrixMetadata {
        &self.state.metadata
    }

    pub fn set_title(&mut self, title: &str) {
        self.set_metadata(MetadataField::Title, title);
    }

    pub fn set_project_name(&mut self, project: &str) {
        self.set_metadata(MetadataField::ProjectName, project);
    }

    pub fn set_customer(&mut self, customer: &str) {
        self.set_metadata(MetadataField::Customer, customer);
    }

    pub fn set_version_number(&mut self, version: &str) {
        self.set_metadata(MetadataField::VersionNumber, version);
    }

    fn set_metadata(&mut self, field: MetadataField, new: &str) {
        let old = match field {
            MetadataField::Title => &self.state.metadata.title,
            MetadataField::ProjectName => &self.state.metadata.project_name,
            MetadataField::Customer => &self.state.metadata.customer,
            MetadataField::VersionNumber => &self.state.metadata.version_number,
        }
        .clone();
        self.record(vec![Change::SetMetadata {
            field,
            old,
            new: new.to_string(),
        }]);
    }

    // ---- sort index redistribution ----------------------------------------

    /// Renumber items 1..N in current sort order. Every index assignment is
    /// its own change unit, mirroring the fine-grained undo the editor
    /// exposes.
    pub fn redistribute_sort_indices(&mut self) {
        let rows: Vec<Uid> = self.sorted_rows().iter().map(|i| i.uid).collect();
        for (i, uid) in rows.iter().enumerate() {
            self.set_item_sort_index(*uid, (i + 1) as f64);
        }
        if !self.kind.is_alias_paired() {
            let cols: Vec<Uid> = self.sorted_cols().iter().map(|i| i.uid).collect();
            for (i, uid) in cols.iter().enumerate() {
                self.set_item_sort_index(*uid, (i + 1) as f64);
            }
        }
    }

    /// Renumber rows 1..N sorted by (group name, item name); alias lockstep
    /// carries the mirrored column order for paired kinds, and unpaired kinds
    /// renumber columns the same way. One change unit per assignment.
    pub fn redistribute_sort_indices_by_group(&mut self) {
        let order = self.group_sorted_uids(Side::Row);
        for (i, uid) in order.iter().enumerate() {
            self.set_item_sort_index(*uid, (i + 1) as f64);
        }
        if !self.kind.is_alias_paired() {
            let order = self.group_sorted_uids(Side::Col);
            for (i, uid) in order.iter().enumerate() {
                self.set_item_sort_index(*uid, (i + 1) as f64);
            }
        }
    }

    fn group_sorted_uids(&self, side: Side) -> Vec<Uid> {
        let mut keyed: Vec<(String, String, Uid)> = self
            .state
            .arena(side)
            .values()
            .map(|item| {
                let group = self
                    .grouping(item.group1)
                    .map(|g| g.name.clone())
                    .unwrap_or_default();
                (group, item.name.clone(), item.uid)
            })
            .collect();
        keyed.sort();
        keyed.into_iter().map(|(_, _, uid)| uid).collect()
    }

    // ---- read accessors ---------------------------------------------------

    pub fn rows(&self) -> impl Iterator<Item = &DsmItem> {
        self.state.rows.values()
    }

    pub fn cols(&self) -> impl Iterator<Item = &DsmItem> {
        self.state.cols.values()
    }

    pub fn row_count(&self) -> usize {
        self.state.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.state.cols.len()
    }

    /// Row items sorted by sort index (UID as a stable tie-break).
    pub fn sorted_rows(&self) -> Vec<&DsmItem> {
        let mut rows: Vec<&DsmItem> = self.state.rows.values().collect();
        rows.sort_by(|a, b| {
            a.sort_index
                .partial_cmp(&b.sort_index)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.uid.cmp(&b.uid))
        });
        rows
    }

    pub fn sorted_cols(&self) -> Vec<&DsmItem> {
        let mut cols: Vec<&DsmItem> = self.state.cols.values().collect();
        cols.sort_by(|a, b| {
            a.sort_index
                .partial_cmp(&b.sort_index)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.uid.cmp(&b.uid))
        });
        cols
    }

    pub fn item(&self, uid: Uid) -> Option<&DsmItem> {
        self.state.rows.get(&uid).or_else(|| self.state.cols.get(&uid))
    }

    pub fn is_row(&self, uid: Uid) -> bool {
        self.state.rows.contains_key(&uid)
    }

    // ---- undo / redo ------------------------------------------------------

    /// Flag the most recent change unit as a user-visible undo boundary.
    /// Callers mark this once after a logical edit completes.
    pub fn set_checkpoint(&mut self) {
        self.stack.set_checkpoint();
    }

    pub fn can_undo(&self) -> bool {
        self.stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.stack.can_redo()
    }

    /// Reverse-apply change units back past the most recent checkpoint
    /// boundary. Replays at least one unit when any exist; with no
    /// checkpoints recorded the whole history unwinds.
    pub fn undo_to_checkpoint(&mut self) {
        let group = self.stack.pop_undo_group();
        if group.is_empty() {
            return;
        }
        for unit in group {
            for change in unit.changes.iter().rev() {
                self.state.apply(&change.inverted());
            }
            self.stack.push_redo(unit);
        }
        self.was_modified = true;
    }

    /// Re-apply undone units forward through the next checkpoint boundary.
    pub fn redo_to_checkpoint(&mut self) {
        let group = self.stack.pop_redo_group();
        if group.is_empty() {
            return;
        }
        for unit in group {
            for change in &unit.changes {
                self.state.apply(change);
            }
            self.stack.push_replayed(unit);
        }
        self.was_modified = true;
    }

    /// The recorded undo units, oldest first. Exposed for tests.
    pub fn undo_units(&self) -> &[ChangeUnit] {
        self.stack.undo_units()
    }

    // ---- modification flag / copies ---------------------------------------

    pub fn was_modified(&self) -> bool {
        self.was_modified
    }

    /// Flagged by the I/O layer after a successful save or load.
    pub fn clear_was_modified(&mut self) {
        self.was_modified = false;
    }

    pub fn set_was_modified(&mut self) {
        self.was_modified = true;
    }

    /// A data-equal copy with empty change stacks and a clear modified flag.
    /// The analysis algorithms copy-then-mutate through this.
    pub fn isolated_copy(&self) -> Matrix {
        Matrix {
            kind: self.kind,
            state: self.state.clone(),
            stack: ChangeStack::new(),
            was_modified: false,
        }
    }

    /// Structural equality over items, connections, groupings, domains,
    /// interface types, and metadata. Change stacks and the modified flag are
    /// not part of it.
    pub fn data_eq(&self, other: &Matrix) -> bool {
        self.kind == other.kind && self.state == other.state
    }
}
