//! Camera module: camera, frustum, and per-frame view state.
//!
//! The camera derives its projection and view matrices from a look-from /
//! look-at pair and refreshes its frustum on every `update()`. Matrices are
//! handed to the renderer through `ViewState` instead of shared globals.

mod camera;
mod frustum;
mod view_state;

pub use camera::{Camera, FOV_Y_DEGREES};
pub use frustum::{
    Frustum,
    FrustumTest,
    PLANE_RIGHT, PLANE_LEFT, PLANE_BOTTOM, PLANE_TOP, PLANE_FAR, PLANE_NEAR,
};
pub use view_state::{ViewState, ViewUniform};
