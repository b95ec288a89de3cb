//! # Core Error Types
//!
//! Errors raised by the scene graph and the entity registry.

use crate::ecs::EntityId;
use crate::scene::NodeId;
use thiserror::Error;

/// Errors that can occur while mutating the scene or a system's entities.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// The node handle refers to a despawned node or a reused slot.
    #[error("stale scene node: {0}")]
    StaleNode(NodeId),

    /// Attaching would make a node its own ancestor.
    #[error("cannot attach {child} under {parent}: would create a cycle")]
    CyclicAttach {
        /// Requested parent.
        parent: NodeId,
        /// Node being attached.
        child: NodeId,
    },

    /// The root node cannot be attached, detached or despawned.
    #[error("the scene root cannot be moved or despawned")]
    RootImmutable,

    /// No entity with this id is registered.
    #[error("entity not found: {0}")]
    MissingEntity(EntityId),

    /// An entity with this id is already registered.
    #[error("entity already registered: {0}")]
    DuplicateEntity(EntityId),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
