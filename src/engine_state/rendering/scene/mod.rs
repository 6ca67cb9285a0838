//! Scene tree of drawable nodes.
//!
//! Nodes live in a [`Slab`] arena and refer to each other by [`NodeId`].
//! Every node knows its direct children and its full descendant set, so
//! showing, hiding or removing a subtree never walks the arena.
//!
//! The scene is owned by the thread that draws. Workers hand frames over
//! through the event bridge, never by touching nodes.

pub mod node;
pub mod skin;

use std::fmt;

use slab::Slab;

pub use node::DrawableNode;
pub use skin::{Frame, Skin};

use super::geometry::Rect;
use crate::error::{PreviewError, Result};

/// Handle to a node of a [`Scene`].
///
/// Ids of removed nodes may be reused by later insertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    nodes: Slab<DrawableNode>,
    next_order: u64,
    /// Screen areas of removed nodes that still need repainting.
    erased: Vec<Rect>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a visible, dirty node under `parent` (or at the root) and
    /// registers it with every ancestor.
    ///
    /// # Errors
    /// `UnknownNode` if `parent` is not in the scene.
    pub fn add_node(&mut self, parent: Option<NodeId>, layer: i32) -> Result<NodeId> {
        if let Some(parent) = parent {
            self.node(parent)?;
        }

        let order = self.next_order;
        self.next_order += 1;
        let id = NodeId(self.nodes.insert(DrawableNode::new(parent, layer, order)));

        if let Some(parent) = parent {
            self.node_mut(parent)?.children.push(id);
        }
        let mut ancestor = parent;
        while let Some(current) = ancestor {
            let node = self.node_mut(current)?;
            node.descendants.push(id);
            ancestor = node.parent;
        }

        log::trace!("Added {id} on layer {layer}");
        Ok(id)
    }

    /// Removes a node with its whole subtree. Areas they were painted on are
    /// repainted by the next composite.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        let (parent, mut removed) = {
            let node = self.node(id)?;
            (node.parent, node.descendants.clone())
        };
        removed.push(id);

        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|child| *child != id);
        }
        let mut ancestor = parent;
        while let Some(current) = ancestor {
            let node = self.node_mut(current)?;
            node.descendants.retain(|d| !removed.contains(d));
            ancestor = node.parent;
        }

        for NodeId(key) in removed {
            if let Some(rect) = self.nodes.try_remove(key).and_then(|n| n.painted_rect()) {
                self.erased.push(rect);
            }
        }
        log::trace!("Removed {id}");
        Ok(())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id.0)
    }

    pub fn node(&self, id: NodeId) -> Result<&DrawableNode> {
        self.nodes.get(id.0).ok_or(PreviewError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut DrawableNode> {
        self.nodes.get_mut(id.0).ok_or(PreviewError::UnknownNode(id))
    }

    /// Makes a node and all of its descendants visible.
    ///
    /// Showing an already visible node does nothing.
    pub fn show(&mut self, id: NodeId) -> Result<()> {
        self.set_visible(id, true)
    }

    /// Hides a node and all of its descendants.
    pub fn hide(&mut self, id: NodeId) -> Result<()> {
        self.set_visible(id, false)
    }

    fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<()> {
        let node = self.node_mut(id)?;
        if !node.set_visible(visible) {
            return Ok(());
        }
        let descendants = node.descendants().to_vec();
        for descendant in descendants {
            self.node_mut(descendant)?.set_visible(visible);
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &DrawableNode)> {
        self.nodes.iter().map(|(key, node)| (NodeId(key), node))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut DrawableNode)> {
        self.nodes.iter_mut().map(|(key, node)| (NodeId(key), node))
    }

    /// Visible nodes from bottom to top: by layer, then insertion order.
    pub fn paint_order(&self) -> Vec<NodeId> {
        let mut visible: Vec<_> = self
            .iter()
            .filter(|(_, node)| node.is_visible())
            .map(|(id, node)| (node.layer(), node.order, id))
            .collect();
        visible.sort_unstable();
        visible.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Areas of removed nodes not yet repainted.
    pub(crate) fn erased(&self) -> &[Rect] {
        &self.erased
    }

    pub(crate) fn clear_erased(&mut self) {
        self.erased.clear();
    }
}
