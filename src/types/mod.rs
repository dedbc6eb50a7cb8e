//! Core data types.
//!
//! - [`snapshot`] - the capture result ([`Snapshot`], [`AccessibilityNode`], [`InteractiveElement`])
//! - [`dom`] - the document arena the scanner walks ([`DomTree`], [`DomElement`])

pub mod dom;
pub mod snapshot;

pub use dom::{BoundingBox, DomElement, DomTree, DomTreeError};
pub use snapshot::{
    AccessibilityNode, ElementBounds, InteractiveElement, Snapshot, SnapshotShapeError,
    SnapshotSummary,
};
