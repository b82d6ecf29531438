//! Change-stack (undo/redo) engine
//!
//! Every matrix mutation is recorded as data: a [`Change`] holds the before
//! and after payloads of one primitive mutation, and every variant has an
//! exact inverse. Undo is therefore replay-driven and the stack contents can
//! be inspected and compared in tests, rather than hiding state inside
//! closures.
//!
//! A [`ChangeUnit`] batches the primitives that must stay atomic (a symmetric
//! rename touches the item and its alias in one unit; a symmetric delete
//! removes the pair and every touching connection in one unit). A checkpoint
//! flag on a unit marks the end of a user-visible edit: callers mark it once
//! after a logical edit completes, and undo/redo unwind whole
//! checkpoint-delimited groups.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::{Color, DsmConnection, DsmItem, Grouping, InterfaceType, MetadataField, Uid};

/// Which axis an item-level change targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Row,
    Col,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Row => Side::Col,
            Side::Col => Side::Row,
        }
    }
}

/// The mutable fields of a connection, captured before and after an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionFields {
    pub name: String,
    pub weight: f64,
    pub interfaces: BTreeSet<Uid>,
}

impl ConnectionFields {
    pub fn of(conn: &DsmConnection) -> Self {
        ConnectionFields {
            name: conn.name.clone(),
            weight: conn.weight,
            interfaces: conn.interfaces.clone(),
        }
    }
}

/// One primitive reversible mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Change {
    AddItem {
        side: Side,
        item: DsmItem,
    },
    RemoveItem {
        side: Side,
        item: DsmItem,
    },
    SetItemName {
        side: Side,
        uid: Uid,
        old: String,
        new: String,
    },
    SetItemSortIndex {
        side: Side,
        uid: Uid,
        old: f64,
        new: f64,
    },
    SetItemGroup {
        side: Side,
        uid: Uid,
        old: Uid,
        new: Uid,
    },
    SetItemDomain {
        side: Side,
        uid: Uid,
        old: Option<Uid>,
        new: Option<Uid>,
    },
    AddConnection {
        connection: DsmConnection,
    },
    RemoveConnection {
        connection: DsmConnection,
    },
    SetConnection {
        row_uid: Uid,
        col_uid: Uid,
        old: ConnectionFields,
        new: ConnectionFields,
    },
    AddGrouping {
        grouping: Grouping,
    },
    RemoveGrouping {
        grouping: Grouping,
    },
    RenameGrouping {
        uid: Uid,
        old: String,
        new: String,
    },
    SetGroupingColor {
        uid: Uid,
        old: Color,
        new: Color,
    },
    SetGroupingFontColor {
        uid: Uid,
        old: Color,
        new: Color,
    },
    SetGroupingPriority {
        uid: Uid,
        old: i32,
        new: i32,
    },
    AddDomain {
        grouping: Grouping,
    },
    RemoveDomain {
        grouping: Grouping,
    },
    AddInterfaceGrouping {
        name: String,
        /// Empty for a fresh grouping; carries the restored contents when the
        /// change is the inverse of a removal.
        interfaces: Vec<InterfaceType>,
    },
    RemoveInterfaceGrouping {
        name: String,
        interfaces: Vec<InterfaceType>,
    },
    AddInterface {
        grouping: String,
        interface: InterfaceType,
    },
    RemoveInterface {
        grouping: String,
        interface: InterfaceType,
    },
    RenameInterface {
        uid: Uid,
        old: String,
        new: String,
    },
    SetInterfaceAbbreviation {
        uid: Uid,
        old: String,
        new: String,
    },
    SetMetadata {
        field: MetadataField,
        old: String,
        new: String,
    },
}

impl Change {
    /// The exact inverse mutation: applying a change and then its inversion
    /// is a no-op.
    pub fn inverted(&self) -> Change {
        use Change::*;
        match self.clone() {
            AddItem { side, item } => RemoveItem { side, item },
            RemoveItem { side, item } => AddItem { side, item },
            SetItemName {
                side,
                uid,
                old,
                new,
            } => SetItemName {
                side,
                uid,
                old: new,
                new: old,
            },
            SetItemSortIndex {
                side,
                uid,
                old,
                new,
            } => SetItemSortIndex {
                side,
                uid,
                old: new,
                new: old,
            },
            SetItemGroup {
                side,
                uid,
                old,
                new,
            } => SetItemGroup {
                side,
                uid,
                old: new,
                new: old,
            },
            SetItemDomain {
                side,
                uid,
                old,
                new,
            } => SetItemDomain {
                side,
                uid,
                old: new,
                new: old,
            },
            AddConnection { connection } => RemoveConnection { connection },
            RemoveConnection { connection } => AddConnection { connection },
            SetConnection {
                row_uid,
                col_uid,
                old,
                new,
            } => SetConnection {
                row_uid,
                col_uid,
                old: new,
                new: old,
            },
            AddGrouping { grouping } => RemoveGrouping { grouping },
            RemoveGrouping { grouping } => AddGrouping { grouping },
            RenameGrouping { uid, old, new } => RenameGrouping {
                uid,
                old: new,
                new: old,
            },
            SetGroupingColor { uid, old, new } => SetGroupingColor {
                uid,
                old: new,
                new: old,
            },
            SetGroupingFontColor { uid, old, new } => SetGroupingFontColor {
                uid,
                old: new,
                new: old,
            },
            SetGroupingPriority { uid, old, new } => SetGroupingPriority {
                uid,
                old: new,
                new: old,
            },
            AddDomain { grouping } => RemoveDomain { grouping },
            RemoveDomain { grouping } => AddDomain { grouping },
            AddInterfaceGrouping { name, interfaces } => {
                RemoveInterfaceGrouping { name, interfaces }
            }
            RemoveInterfaceGrouping { name, interfaces } => {
                AddInterfaceGrouping { name, interfaces }
            }
            AddInterface {
                grouping,
                interface,
            } => RemoveInterface {
                grouping,
                interface,
            },
            RemoveInterface {
                grouping,
                interface,
            } => AddInterface {
                grouping,
                interface,
            },
            RenameInterface { uid, old, new } => RenameInterface {
                uid,
                old: new,
                new: old,
            },
            SetInterfaceAbbreviation { uid, old, new } => SetInterfaceAbbreviation {
                uid,
                old: new,
                new: old,
            },
            SetMetadata { field, old, new } => SetMetadata {
                field,
                old: new,
                new: old,
            },
        }
    }
}

/// One atomic, undoable batch of primitive changes plus the checkpoint flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeUnit {
    pub changes: Vec<Change>,
    pub checkpoint: bool,
}

impl ChangeUnit {
    pub fn new(changes: Vec<Change>) -> Self {
        ChangeUnit {
            changes,
            checkpoint: false,
        }
    }
}

/// The two stacks backing undo/redo. Application of changes to matrix state
/// lives with the matrix; the stack only owns ordering and checkpoint
/// bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct ChangeStack {
    undo: Vec<ChangeUnit>,
    redo: Vec<ChangeUnit>,
}

impl ChangeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly applied unit. Any redo history is invalidated.
    pub fn push(&mut self, unit: ChangeUnit) {
        self.undo.push(unit);
        self.redo.clear();
    }

    /// Flag the most recent unit as a user-visible undo boundary.
    pub fn set_checkpoint(&mut self) {
        if let Some(top) = self.undo.last_mut() {
            top.checkpoint = true;
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Units to unwind for one undo step: pops at least one unit, then keeps
    /// popping until the next unit on top is a checkpoint boundary (the end
    /// of the previous edit). With no checkpoints recorded the whole stack
    /// unwinds.
    pub fn pop_undo_group(&mut self) -> Vec<ChangeUnit> {
        let mut group = Vec::new();
        while let Some(top) = self.undo.last() {
            if !group.is_empty() && top.checkpoint {
                break;
            }
            group.push(self.undo.pop().unwrap());
        }
        group
    }

    /// Units to replay for one redo step: pops until a checkpoint-flagged
    /// unit has been included (or the redo stack empties).
    pub fn pop_redo_group(&mut self) -> Vec<ChangeUnit> {
        let mut group = Vec::new();
        while let Some(unit) = self.redo.pop() {
            let checkpoint = unit.checkpoint;
            group.push(unit);
            if checkpoint {
                break;
            }
        }
        group
    }

    /// Park an undone unit so it can be redone.
    pub fn push_redo(&mut self, unit: ChangeUnit) {
        self.redo.push(unit);
    }

    /// Re-park a redone unit without invalidating remaining redo history.
    pub fn push_replayed(&mut self, unit: ChangeUnit) {
        self.undo.push(unit);
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// The recorded undo units, oldest first. Exposed for tests.
    pub fn undo_units(&self) -> &[ChangeUnit] {
        &self.undo
    }
}
