/*!
# Galaxy 3D Visibility

Visibility and proximity queries for the Galaxy 3D engine.

This crate decides, every frame, which entities of a scene intersect the
camera's view volume, and answers "what is near this point / volume"
queries. It does not render anything: the renderer receives the list of
visible entity ids and a `ViewState` with the matrices of the frame.

## Architecture

- **Camera**: projection, view and viewport matrices, refreshed by `update()`
- **Frustum**: six planes extracted from the view-projection matrix
- **Partition**: spatial index trait (`PartitionOctree`, `PartitionNone`)
- **Entity**: the id + world bounding box contract the partitions consume
- **Engine**: owns a camera, a partition and the entity registry, and keeps them in sync
*/

// Internal modules
mod error;
mod engine;
pub mod log;
mod primitives;
mod camera;
mod entity;
mod partition;
mod utils;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine and its configuration
    pub use crate::engine::{Engine, EngineConfig};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }

    // Camera, frustum and per-frame view state
    pub mod camera {
        pub use crate::camera::*;
    }

    // Geometric primitives
    pub mod primitives {
        pub use crate::primitives::*;
    }

    // Spatial partitions
    pub mod partition {
        pub use crate::partition::*;
    }

    // Entity contract
    pub mod entity {
        pub use crate::entity::*;
    }
}

// Re-export math library at crate root
pub use glam;
