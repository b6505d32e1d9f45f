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

//! Span trees.
//!
//! A [`SpanTree`] owns every node of an assembled trace in an arena; nodes
//! address each other by [`NodeId`] index, so parent back-references carry no
//! ownership and the tree as a whole is freely shareable for reads.
use std::collections::VecDeque;
use trace_tree_types::Span;

/// The index of a node within its owning [`SpanTree`].
///
/// IDs are only meaningful against the tree that produced them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct RawNode {
    span: Option<Span>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A rooted tree of spans assembled from one trace.
///
/// The root is either the first root-like span encountered during assembly or
/// a synthetic node carrying no span when the trace arrived headless. Apart
/// from [`SpanTree::set_span`], a built tree is immutable.
#[derive(Debug)]
pub struct SpanTree {
    nodes: Vec<RawNode>,
    root: NodeId,
}

impl SpanTree {
    pub(crate) fn new() -> SpanTree {
        SpanTree {
            nodes: vec![],
            root: NodeId(0),
        }
    }

    pub(crate) fn push(&mut self, span: Option<Span>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(RawNode {
            span,
            parent: None,
            children: vec![],
        });
        id
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    /// Attaches `child` under `parent`, recording the back-reference.
    ///
    /// Re-adding an existing child is a no-op. Panics if `parent == child`;
    /// that is always a caller bug, never bad trace data.
    pub(crate) fn add_child(&mut self, parent: NodeId, child: NodeId) {
        assert_ne!(parent, child, "cannot add a node as a child of itself");
        if self.nodes[parent.0].children.contains(&child) {
            return;
        }
        debug_assert!(self.nodes[child.0].parent.is_none());
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Returns the root node of the tree.
    #[inline]
    pub fn root(&self) -> SpanNode<'_> {
        SpanNode {
            tree: self,
            id: self.root,
        }
    }

    /// Replaces the span carried by a node, e.g. after clock skew correction.
    ///
    /// This is the only mutation supported on a built tree; the structure of
    /// the tree never changes.
    pub fn set_span(&mut self, id: NodeId, span: Span) {
        self.nodes[id.0].span = Some(span);
    }

    /// Returns the nodes of the tree in pre-order, paired with their depth.
    ///
    /// Enumerating this sequence yields the `(index, depth)` rows consumed by
    /// [`TimelineLayout::build`](crate::TimelineLayout::build).
    pub fn flatten(&self) -> Flatten<'_> {
        Flatten {
            tree: self,
            stack: vec![(self.root, 0)],
        }
    }
}

/// A node of a [`SpanTree`].
///
/// This is a cheap copyable handle borrowing the tree; obtain one from
/// [`SpanTree::root`] and navigate with [`parent`](SpanNode::parent),
/// [`children`](SpanNode::children), and [`traverse`](SpanNode::traverse).
#[derive(Copy, Clone, Debug)]
pub struct SpanNode<'a> {
    tree: &'a SpanTree,
    id: NodeId,
}

impl<'a> PartialEq for SpanNode<'a> {
    fn eq(&self, other: &SpanNode<'a>) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl<'a> Eq for SpanNode<'a> {}

impl<'a> SpanNode<'a> {
    fn raw(&self) -> &'a RawNode {
        &self.tree.nodes[self.id.0]
    }

    /// Returns the index of this node in its owning tree.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the span carried by this node.
    ///
    /// `None` only for the synthetic root of a headless trace.
    #[inline]
    pub fn span(&self) -> Option<&'a Span> {
        self.raw().span.as_ref()
    }

    /// Returns the parent of this node, or `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<SpanNode<'a>> {
        self.raw().parent.map(|id| SpanNode {
            tree: self.tree,
            id,
        })
    }

    /// Returns the children of this node, in the order they were attached.
    #[inline]
    pub fn children(&self) -> Children<'a> {
        Children {
            tree: self.tree,
            ids: self.raw().children.iter(),
        }
    }

    /// Returns an iterator over the subtree rooted at this node in
    /// breadth-first order.
    ///
    /// The sequence is finite and visits each node exactly once; each call
    /// constructs a fresh traversal.
    pub fn traverse(&self) -> Traverse<'a> {
        let mut queue = VecDeque::new();
        queue.push_back(self.id);
        Traverse {
            tree: self.tree,
            queue,
        }
    }
}

/// An iterator over the children of a node.
pub struct Children<'a> {
    tree: &'a SpanTree,
    ids: std::slice::Iter<'a, NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = SpanNode<'a>;

    fn next(&mut self) -> Option<SpanNode<'a>> {
        self.ids.next().map(|&id| SpanNode {
            tree: self.tree,
            id,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl<'a> ExactSizeIterator for Children<'a> {}

/// A breadth-first iterator over a subtree.
pub struct Traverse<'a> {
    tree: &'a SpanTree,
    queue: VecDeque<NodeId>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = SpanNode<'a>;

    fn next(&mut self) -> Option<SpanNode<'a>> {
        let id = self.queue.pop_front()?;
        self.queue.extend(&self.tree.nodes[id.0].children);
        Some(SpanNode {
            tree: self.tree,
            id,
        })
    }
}

/// A pre-order iterator over a tree, yielding each node with its depth.
pub struct Flatten<'a> {
    tree: &'a SpanTree,
    stack: Vec<(NodeId, usize)>,
}

impl<'a> Iterator for Flatten<'a> {
    type Item = (SpanNode<'a>, usize);

    fn next(&mut self) -> Option<(SpanNode<'a>, usize)> {
        let (id, depth) = self.stack.pop()?;
        for &child in self.tree.nodes[id.0].children.iter().rev() {
            self.stack.push((child, depth + 1));
        }
        Some((
            SpanNode {
                tree: self.tree,
                id,
            },
            depth,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use trace_tree_types::{SpanId, TraceId};

    fn span(id: u64) -> Span {
        Span::builder()
            .trace_id(TraceId::from(1u64))
            .id(SpanId::from(id))
            .build()
    }

    fn ids<'a>(nodes: impl Iterator<Item = SpanNode<'a>>) -> Vec<SpanId> {
        nodes.map(|n| n.span().unwrap().id()).collect()
    }

    #[test]
    fn add_child_is_idempotent() {
        let mut tree = SpanTree::new();
        let a = tree.push(Some(span(1)));
        let b = tree.push(Some(span(2)));
        tree.set_root(a);

        tree.add_child(a, b);
        tree.add_child(a, b);

        assert_eq!(tree.root().children().len(), 1);
    }

    #[test]
    #[should_panic(expected = "child of itself")]
    fn add_child_rejects_self() {
        let mut tree = SpanTree::new();
        let a = tree.push(Some(span(1)));
        tree.set_root(a);
        tree.add_child(a, a);
    }

    #[test]
    fn traverse_is_breadth_first() {
        // 1 -> {2 -> {4, 5}, 3 -> {6}}
        let mut tree = SpanTree::new();
        let n: Vec<_> = (1..=6).map(|i| tree.push(Some(span(i)))).collect();
        tree.set_root(n[0]);
        tree.add_child(n[0], n[1]);
        tree.add_child(n[0], n[2]);
        tree.add_child(n[1], n[3]);
        tree.add_child(n[1], n[4]);
        tree.add_child(n[2], n[5]);

        let order = ids(tree.root().traverse());
        let expected: Vec<_> = (1..=6).map(SpanId::from).collect();
        assert_eq!(order, expected);

        // a fresh traversal starts over
        assert_eq!(ids(tree.root().traverse()), expected);
    }

    #[test]
    fn parent_links_match_children() {
        let mut tree = SpanTree::new();
        let a = tree.push(Some(span(1)));
        let b = tree.push(Some(span(2)));
        tree.set_root(a);
        tree.add_child(a, b);

        let root = tree.root();
        assert!(root.parent().is_none());
        let child = root.children().next().unwrap();
        assert_eq!(child.parent(), Some(root));
    }

    #[test]
    fn flatten_is_preorder_with_depths() {
        // 1 -> {2 -> {3}, 4}
        let mut tree = SpanTree::new();
        let n: Vec<_> = (1..=4).map(|i| tree.push(Some(span(i)))).collect();
        tree.set_root(n[0]);
        tree.add_child(n[0], n[1]);
        tree.add_child(n[1], n[2]);
        tree.add_child(n[0], n[3]);

        let rows: Vec<_> = tree
            .flatten()
            .map(|(node, depth)| (node.span().unwrap().id(), depth))
            .collect();
        assert_eq!(
            rows,
            vec![
                (SpanId::from(1), 0),
                (SpanId::from(2), 1),
                (SpanId::from(3), 2),
                (SpanId::from(4), 1),
            ]
        );
    }

    #[test]
    fn set_span_replaces_value() {
        let mut tree = SpanTree::new();
        let a = tree.push(Some(span(1)));
        tree.set_root(a);

        let id = tree.root().id();
        tree.set_span(id, span(7));
        assert_eq!(tree.root().span().unwrap().id(), SpanId::from(7));
    }
}
