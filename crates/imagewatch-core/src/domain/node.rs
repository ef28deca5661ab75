//! Host document node identity and classification.

use serde::{Deserialize, Serialize};

/// Opaque identity of a node in the host document.
///
/// The host hands these out and must not reuse one for a different node
/// while the tracker may still hold a cache record for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Wraps a raw host identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw host identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Classification of a host node.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// An image element.
    Image,
    /// Any other element.
    Element,
    /// A document root.
    Document,
    /// A detached document fragment.
    Fragment,
    /// A text node.
    Text,
    /// A comment node.
    Comment,
    /// Anything the host cannot classify further.
    Other,
}

impl NodeKind {
    /// Whether descendant images of this node should be collected.
    #[must_use]
    pub const fn is_traversable(self) -> bool {
        matches!(self, Self::Element | Self::Document | Self::Fragment)
    }
}

/// Synchronous readiness reported by an image handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    /// The host exposes no synchronous completion signal.
    #[default]
    Unsupported,
    /// The image is still loading.
    Incomplete,
    /// Loading finished. A zero natural width means the image is broken.
    Complete {
        /// Intrinsic width of the decoded image, in pixels.
        natural_width: u32,
    },
}

impl Readiness {
    /// Classifies the handle when readiness alone is conclusive.
    #[must_use]
    pub const fn outcome(self) -> Option<super::ImageOutcome> {
        match self {
            Self::Complete { natural_width: 0 } => Some(super::ImageOutcome::Broken),
            Self::Complete { .. } => Some(super::ImageOutcome::Proper),
            Self::Unsupported | Self::Incomplete => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImageOutcome;

    #[test]
    fn test_traversable_kinds() {
        assert!(NodeKind::Element.is_traversable());
        assert!(NodeKind::Document.is_traversable());
        assert!(NodeKind::Fragment.is_traversable());
        assert!(!NodeKind::Image.is_traversable());
        assert!(!NodeKind::Text.is_traversable());
        assert!(!NodeKind::Comment.is_traversable());
    }

    #[test]
    fn test_readiness_outcome() {
        assert_eq!(Readiness::Unsupported.outcome(), None);
        assert_eq!(Readiness::Incomplete.outcome(), None);
        assert_eq!(
            Readiness::Complete { natural_width: 0 }.outcome(),
            Some(ImageOutcome::Broken)
        );
        assert_eq!(
            Readiness::Complete { natural_width: 64 }.outcome(),
            Some(ImageOutcome::Proper)
        );
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::new(7).to_string(), "#7");
        assert_eq!(NodeId::new(7).get(), 7);
    }
}
