//! Tagged-cell grid projection: the single contract the view layer renders
//! from. Cells carry tags plus the UIDs the view needs to wire editors back
//! to mutator calls; no widget construction happens here.

use serde::{Deserialize, Serialize};

use crate::core::{MatrixKind, Uid};

use super::Matrix;

/// One cell of the render template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    /// Static text (headers, spacers).
    Plain(String),
    /// An item's name; the view renders it read-only or as a rename editor.
    ItemName(Uid),
    /// A grouping picker for the item. `secondary` marks the domain column of
    /// multi-domain matrices.
    GroupingSelector { uid: Uid, secondary: bool },
    /// A numeric editor over the item's sort index.
    SortIndexEditor(Uid),
    /// An editable connection cell for the ordered pair.
    EditableConnection { row_uid: Uid, col_uid: Uid },
    /// The cell facing an item's own alias; never editable.
    UneditableConnection,
}

impl Matrix {
    /// Produce the 2-D render template, row-major, rows and columns sorted by
    /// current sort index.
    pub fn get_grid_array(&self) -> Vec<Vec<Cell>> {
        match self.kind() {
            MatrixKind::Symmetric => self.grid_alias_paired(false),
            MatrixKind::MultiDomain => self.grid_alias_paired(true),
            MatrixKind::Asymmetric => self.grid_asymmetric(),
        }
    }

    fn grid_alias_paired(&self, with_domain: bool) -> Vec<Vec<Cell>> {
        let rows = self.sorted_rows();
        let cols = self.sorted_cols();
        let mut grid = Vec::with_capacity(rows.len() + 1);

        let mut header = Vec::with_capacity(cols.len() + 4);
        if with_domain {
            header.push(Cell::Plain("Domain".to_string()));
        }
        header.push(Cell::Plain("Grouping".to_string()));
        header.push(Cell::Plain("Sort".to_string()));
        header.push(Cell::Plain("Row Items".to_string()));
        for col in &cols {
            header.push(Cell::ItemName(col.uid));
        }
        grid.push(header);

        for row in &rows {
            let mut cells = Vec::with_capacity(cols.len() + 4);
            if with_domain {
                cells.push(Cell::GroupingSelector {
                    uid: row.uid,
                    secondary: true,
                });
            }
            cells.push(Cell::GroupingSelector {
                uid: row.uid,
                secondary: false,
            });
            cells.push(Cell::SortIndexEditor(row.uid));
            cells.push(Cell::ItemName(row.uid));
            for col in &cols {
                if row.alias == Some(col.uid) {
                    cells.push(Cell::UneditableConnection);
                } else {
                    cells.push(Cell::EditableConnection {
                        row_uid: row.uid,
                        col_uid: col.uid,
                    });
                }
            }
            grid.push(cells);
        }
        grid
    }

    fn grid_asymmetric(&self) -> Vec<Vec<Cell>> {
        let rows = self.sorted_rows();
        let cols = self.sorted_cols();
        let mut grid = Vec::with_capacity(rows.len() + 2);

        let mut group_header = vec![
            Cell::Plain(String::new()),
            Cell::Plain(String::new()),
            Cell::Plain("Column Grouping".to_string()),
        ];
        for col in &cols {
            group_header.push(Cell::GroupingSelector {
                uid: col.uid,
                secondary: false,
            });
        }
        grid.push(group_header);

        let mut name_header = vec![
            Cell::Plain("Grouping".to_string()),
            Cell::Plain("Sort".to_string()),
            Cell::Plain("Row Items".to_string()),
        ];
        for col in &cols {
            name_header.push(Cell::ItemName(col.uid));
        }
        grid.push(name_header);

        for row in &rows {
            let mut cells = Vec::with_capacity(cols.len() + 3);
            cells.push(Cell::GroupingSelector {
                uid: row.uid,
                secondary: false,
            });
            cells.push(Cell::SortIndexEditor(row.uid));
            cells.push(Cell::ItemName(row.uid));
            for col in &cols {
                cells.push(Cell::EditableConnection {
                    row_uid: row.uid,
                    col_uid: col.uid,
                });
            }
            grid.push(cells);
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_grid_shape_and_diagonal() {
        let mut matrix = Matrix::symmetric();
        matrix.create_item("a", true);
        matrix.create_item("b", true);
        matrix.create_item("c", true);

        let grid = matrix.get_grid_array();
        assert_eq!(grid.len(), 4); // header + 3 item rows
        assert!(grid.iter().all(|r| r.len() == 6)); // 3 labels + 3 columns

        // exactly one uneditable cell per item row, on the alias diagonal
        for (i, row) in grid.iter().enumerate().skip(1) {
            let uneditable = row
                .iter()
                .filter(|c| **c == Cell::UneditableConnection)
                .count();
            assert_eq!(uneditable, 1);
            assert_eq!(row[3 + (i - 1)], Cell::UneditableConnection);
        }
    }

    #[test]
    fn test_grid_follows_sort_order() {
        let mut matrix = Matrix::symmetric();
        let a = matrix.create_item("a", true);
        let b = matrix.create_item("b", true);
        matrix.set_item_sort_index(a, 10.0);

        let grid = matrix.get_grid_array();
        // b (index 2) now renders before a (index 10)
        assert_eq!(grid[1][1], Cell::SortIndexEditor(b));
        assert_eq!(grid[2][1], Cell::SortIndexEditor(a));
    }

    #[test]
    fn test_asymmetric_grid_has_two_header_rows() {
        let mut matrix = Matrix::asymmetric();
        matrix.create_item("r1", true);
        matrix.create_item("r2", true);
        matrix.create_item("c1", false);

        let grid = matrix.get_grid_array();
        assert_eq!(grid.len(), 4); // 2 headers + 2 item rows
        assert!(grid.iter().all(|r| r.len() == 4)); // 3 labels + 1 column
        assert!(matches!(
            grid[0][3],
            Cell::GroupingSelector {
                secondary: false,
                ..
            }
        ));
        assert!(matches!(grid[1][3], Cell::ItemName(_)));
        assert!(matches!(grid[2][3], Cell::EditableConnection { .. }));
    }

    #[test]
    fn test_multi_domain_grid_has_domain_column() {
        let mut matrix = Matrix::multi_domain();
        matrix.create_item("a", true);

        let grid = matrix.get_grid_array();
        assert_eq!(grid[0][0], Cell::Plain("Domain".to_string()));
        assert!(matches!(
            grid[1][0],
            Cell::GroupingSelector {
                secondary: true,
                ..
            }
        ));
        assert!(matches!(
            grid[1][1],
            Cell::GroupingSelector {
                secondary: false,
                ..
            }
        ));
    }
}
