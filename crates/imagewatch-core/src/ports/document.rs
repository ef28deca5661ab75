//! Document port for node traversal and image attributes.

use crate::domain::{NodeId, NodeKind, Readiness};

/// Port onto the host document tree.
///
/// Every method must be cheap and side-effect free; the tracker calls them
/// from inside event handlers.
pub trait Document {
    /// Classifies a node, or returns `None` when the host does not know it.
    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Returns all image descendants of `node`, in document order.
    fn descendant_images(&self, node: NodeId) -> Vec<NodeId>;

    /// Returns the current resource identifier of an image, empty when unset.
    fn src(&self, image: NodeId) -> String;

    /// Returns the synchronous readiness of an image.
    fn readiness(&self, image: NodeId) -> Readiness;
}
