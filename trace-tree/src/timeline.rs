//  Copyright 2017 Palantir Technologies, Inc.
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! Timeline tree decoration.
//!
//! A trace timeline renders one row per span, indented by tree depth, with
//! connector glyphs joining each parent to its children: a vertical line down
//! the parent's column and a horizontal stub into each child's row. This
//! module computes those segments from the depth-ordered row list produced by
//! [`SpanTree::flatten`](crate::SpanTree::flatten); coordinates are row and
//! column indices, left for the renderer to scale into pixels.
use crate::node::SpanTree;

/// A horizontal connector under a span's row.
///
/// The segment starts at the parent's column and extends through the rest of
/// the row; every row except the root's has exactly one.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Horizontal {
    row: usize,
    from_col: usize,
}

impl Horizontal {
    /// The row the segment underlines.
    #[inline]
    pub fn row(&self) -> usize {
        self.row
    }

    /// The column the segment starts at: the depth of the row's parent.
    #[inline]
    pub fn from_col(&self) -> usize {
        self.from_col
    }
}

/// A vertical connector at a parent's column.
///
/// The segment runs from the parent's row down to the row of its last child,
/// passing through every child row in between.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Vertical {
    col: usize,
    from_row: usize,
    to_row: usize,
}

impl Vertical {
    /// The column the segment is drawn at: the depth of the parent.
    #[inline]
    pub fn col(&self) -> usize {
        self.col
    }

    /// The parent's row.
    #[inline]
    pub fn from_row(&self) -> usize {
        self.from_row
    }

    /// The last child's row.
    #[inline]
    pub fn to_row(&self) -> usize {
        self.to_row
    }
}

/// The tree-edge glyphs decorating a rendered trace timeline.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TimelineLayout {
    horizontals: Vec<Horizontal>,
    verticals: Vec<Vertical>,
}

impl TimelineLayout {
    /// Computes the layout for a pre-order `(index, depth)` row sequence.
    ///
    /// Rows must arrive in pre-order: each row's parent is the nearest
    /// earlier row with a smaller depth. The pass is single-scan over a stack
    /// of open frames; a frame closes when a later row at its depth or above
    /// proves it has seen its last descendant.
    pub fn build<I>(rows: I) -> TimelineLayout
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut layout = TimelineLayout::default();
        let mut stack: Vec<(usize, usize)> = vec![];

        for (index, depth) in rows {
            let top_depth = match stack.last() {
                Some(&(_, top_depth)) => top_depth,
                None => {
                    stack.push((index, depth));
                    continue;
                }
            };

            if top_depth < depth {
                // descent: the previous row is this row's parent
                layout.horizontal(index, top_depth);
            } else if top_depth == depth {
                // sibling: replace the top frame, which is necessarily a leaf
                stack.pop();
                layout.horizontal(index, stack.last().map_or(0, |&(_, d)| d));
            } else {
                // ascent: close every frame at this depth or deeper, joining
                // each closed parent to the last child it will ever see
                while let Some(&(child_index, child_depth)) = stack.last() {
                    if child_depth < depth {
                        break;
                    }
                    stack.pop();
                    if let Some(&(parent_index, parent_depth)) = stack.last() {
                        if parent_depth >= depth {
                            layout.vertical(parent_depth, parent_index, child_index);
                        }
                    }
                }
                layout.horizontal(index, stack.last().map_or(0, |&(_, d)| d));
            }
            stack.push((index, depth));
        }

        // drain: the rightmost path of the tree is still open
        while let Some((child_index, _)) = stack.pop() {
            if let Some(&(parent_index, parent_depth)) = stack.last() {
                layout.vertical(parent_depth, parent_index, child_index);
            }
        }

        layout
    }

    /// Computes the layout for a built trace tree.
    pub fn from_tree(tree: &SpanTree) -> TimelineLayout {
        TimelineLayout::build(
            tree.flatten()
                .enumerate()
                .map(|(index, (_, depth))| (index, depth)),
        )
    }

    /// The horizontal segments, one per non-root row, in row order.
    #[inline]
    pub fn horizontals(&self) -> &[Horizontal] {
        &self.horizontals
    }

    /// The vertical segments, one per parent with children.
    #[inline]
    pub fn verticals(&self) -> &[Vertical] {
        &self.verticals
    }

    fn horizontal(&mut self, row: usize, from_col: usize) {
        self.horizontals.push(Horizontal { row, from_col });
    }

    fn vertical(&mut self, col: usize, from_row: usize, to_row: usize) {
        self.verticals.push(Vertical {
            col,
            from_row,
            to_row,
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn horizontals(layout: &TimelineLayout) -> Vec<(usize, usize)> {
        layout
            .horizontals()
            .iter()
            .map(|h| (h.row(), h.from_col()))
            .collect()
    }

    fn verticals(layout: &TimelineLayout) -> Vec<(usize, usize, usize)> {
        layout
            .verticals()
            .iter()
            .map(|v| (v.col(), v.from_row(), v.to_row()))
            .collect()
    }

    #[test]
    fn empty_and_single_row() {
        assert_eq!(TimelineLayout::build(vec![]), TimelineLayout::default());

        let layout = TimelineLayout::build(vec![(0, 0)]);
        assert!(layout.horizontals().is_empty());
        assert!(layout.verticals().is_empty());
    }

    #[test]
    fn linear_chain_drains_one_vertical_per_parent() {
        let layout = TimelineLayout::build(vec![(0, 0), (1, 1), (2, 2)]);

        assert_eq!(horizontals(&layout), vec![(1, 0), (2, 1)]);
        assert_eq!(verticals(&layout), vec![(1, 1, 2), (0, 0, 1)]);
    }

    #[test]
    fn siblings_share_the_parent_column() {
        let layout = TimelineLayout::build(vec![(0, 0), (1, 1), (2, 1), (3, 1)]);

        assert_eq!(horizontals(&layout), vec![(1, 0), (2, 0), (3, 0)]);
        // one vertical at the root's column reaching its last child
        assert_eq!(verticals(&layout), vec![(0, 0, 3)]);
    }

    #[test]
    fn ascent_closes_interior_parents() {
        // 0
        // +- 1
        // |  +- 2
        // +- 3
        let layout = TimelineLayout::build(vec![(0, 0), (1, 1), (2, 2), (3, 1)]);

        assert_eq!(horizontals(&layout), vec![(1, 0), (2, 1), (3, 0)]);
        assert_eq!(verticals(&layout), vec![(1, 1, 2), (0, 0, 3)]);
    }

    #[test]
    fn ascent_over_multiple_levels() {
        // 0
        // +- 1
        //    +- 2
        //       +- 3
        // ...then a new child of 0 at row 4
        let layout = TimelineLayout::build(vec![(0, 0), (1, 1), (2, 2), (3, 3), (4, 1)]);

        assert_eq!(horizontals(&layout), vec![(1, 0), (2, 1), (3, 2), (4, 0)]);
        assert_eq!(
            verticals(&layout),
            vec![(2, 2, 3), (1, 1, 2), (0, 0, 4)]
        );
    }

    #[test]
    fn every_non_root_row_gets_one_horizontal() {
        let rows = vec![(0, 0), (1, 1), (2, 2), (3, 2), (4, 1), (5, 2)];
        let layout = TimelineLayout::build(rows.clone());

        let mut decorated: Vec<_> = layout.horizontals().iter().map(|h| h.row()).collect();
        decorated.sort_unstable();
        assert_eq!(decorated, vec![1, 2, 3, 4, 5]);

        // each horizontal starts at the depth of the row's parent
        for h in layout.horizontals() {
            let depth = rows[h.row()].1;
            assert_eq!(h.from_col(), depth - 1);
        }
    }

    #[test]
    fn verticals_join_first_to_last_child_rows() {
        // 0
        // +- 1
        // |  +- 2
        // |  +- 3
        // +- 4
        //    +- 5
        let rows = vec![(0, 0), (1, 1), (2, 2), (3, 2), (4, 1), (5, 2)];
        let layout = TimelineLayout::build(rows);

        let vs = verticals(&layout);
        // parent 1 (col 1) spans child rows 2..=3, parent 4 its child row 5,
        // and the root reaches its last child at row 4
        assert!(vs.contains(&(1, 1, 3)));
        assert!(vs.contains(&(1, 4, 5)));
        assert!(vs.contains(&(0, 0, 4)));
        assert_eq!(vs.len(), 3);
    }
}
