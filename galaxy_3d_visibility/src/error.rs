//! Error types for the Galaxy3D visibility subsystem
//!
//! This module defines the error types used by the camera, the partitions
//! and the engine. None of them are fatal: every operation that returns one
//! leaves the index in a consistent state.

use std::fmt;
use crate::entity::EntityId;

/// Result type for Galaxy3D visibility operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D visibility errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Degenerate camera or partition parameters (z_near >= z_far, bad cell sizes, ...)
    InvalidConfiguration(String),

    /// Remove of an entity that has no partition membership
    EntityNotIndexed(EntityId),

    /// A partition node scheduled for release still holds entities
    NodeNotEmpty(String),

    /// Indexing would exceed the configured top-level partition budget
    CapacityExceeded(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::EntityNotIndexed(id) => write!(f, "Entity not indexed: {}", id),
            Error::NodeNotEmpty(msg) => write!(f, "Partition node not empty: {}", msg),
            Error::CapacityExceeded(msg) => write!(f, "Capacity exceeded: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
