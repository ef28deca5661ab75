//! Image collector.
//!
//! Flattens the heterogeneous tracking input (one node, a list of images
//! and containers, or nothing) into the ordered set of image handles a
//! session watches.

use std::collections::HashSet;

use tracing::trace;

use crate::domain::{NodeId, NodeKind};
use crate::ports::Document;

/// Input accepted by [`collect_images`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Collection {
    /// No input at all.
    #[default]
    Absent,
    /// A single image or container.
    Single(NodeId),
    /// An ordered list of images and containers.
    List(Vec<NodeId>),
}

impl Collection {
    fn nodes(&self) -> &[NodeId] {
        match self {
            Self::Absent => &[],
            Self::Single(node) => std::slice::from_ref(node),
            Self::List(nodes) => nodes,
        }
    }
}

impl From<NodeId> for Collection {
    fn from(node: NodeId) -> Self {
        Self::Single(node)
    }
}

impl From<Option<NodeId>> for Collection {
    fn from(node: Option<NodeId>) -> Self {
        node.map_or(Self::Absent, Self::Single)
    }
}

impl From<Vec<NodeId>> for Collection {
    fn from(nodes: Vec<NodeId>) -> Self {
        Self::List(nodes)
    }
}

impl From<&[NodeId]> for Collection {
    fn from(nodes: &[NodeId]) -> Self {
        Self::List(nodes.to_vec())
    }
}

/// Collects the images referenced by `collection`, in order.
///
/// Images are appended directly; traversable containers contribute their
/// descendant images in document order; anything else is skipped. An image
/// reached more than once keeps only its first position.
#[must_use]
pub fn collect_images(document: &dyn Document, collection: &Collection) -> Vec<NodeId> {
    let mut images = Vec::new();
    let mut seen = HashSet::new();

    for &node in collection.nodes() {
        match document.kind(node) {
            Some(NodeKind::Image) => {
                if seen.insert(node) {
                    images.push(node);
                }
            }
            Some(kind) if kind.is_traversable() => {
                for image in document.descendant_images(node) {
                    if seen.insert(image) {
                        images.push(image);
                    }
                }
            }
            kind => trace!(%node, ?kind, "skipping non-image input"),
        }
    }

    images
}
