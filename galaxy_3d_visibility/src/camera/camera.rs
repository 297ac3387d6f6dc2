/// Camera: look-from / look-at eye driving the projection, view and frustum.
///
/// `update()` is called once per rendered frame (and again after an
/// off-screen pass to restore the primary view). It recomputes the
/// projection and view matrices unconditionally and refreshes the frustum
/// planes in place. Calling it twice with the same arguments and no state
/// change yields identical matrices and planes.

use glam::{Mat4, Vec3, Vec4};
use crate::error::{Error, Result};
use super::frustum::Frustum;
use super::view_state::ViewState;

/// Vertical field of view, in degrees
pub const FOV_Y_DEGREES: f32 = 45.0;

/// Tolerance for the degenerate look-direction checks
const EPSILON: f32 = 0.00001;

const DEFAULT_Z_NEAR: f32 = 10.0;
const DEFAULT_Z_FAR: f32 = 4000.0;

/// Perspective camera.
///
/// Invariant: `0 < z_near < z_far`, both finite.
#[derive(Debug, Clone)]
pub struct Camera {
    z_near: f32,
    z_far: f32,
    up_vector: Vec3,
    look_from: Vec3,
    look_at: Vec3,

    width: u32,
    height: u32,
    aspect: f32,

    projection_matrix: Mat4,
    view_matrix: Mat4,
    viewport_matrix: Mat4,
    frustum: Frustum,

    /// Set while the configured up vector is parallel to the look direction
    up_fallback: bool,
}

impl Camera {
    /// Camera at (0, 50, 400) looking at (0, 50, 0), clip planes 10 / 4000.
    ///
    /// Matrices stay at identity until the first `update()`.
    pub fn new() -> Self {
        Self {
            z_near: DEFAULT_Z_NEAR,
            z_far: DEFAULT_Z_FAR,
            up_vector: Vec3::Y,
            look_from: Vec3::new(0.0, 50.0, 400.0),
            look_at: Vec3::new(0.0, 50.0, 0.0),
            width: 0,
            height: 0,
            aspect: 1.0,
            projection_matrix: Mat4::IDENTITY,
            view_matrix: Mat4::IDENTITY,
            viewport_matrix: Mat4::IDENTITY,
            frustum: Frustum::new(),
            up_fallback: false,
        }
    }

    /// Camera with custom clip planes.
    pub fn with_clip_planes(z_near: f32, z_far: f32) -> Result<Self> {
        validate_clip_planes(z_near, z_far)?;
        let mut camera = Self::new();
        camera.z_near = z_near;
        camera.z_far = z_far;
        Ok(camera)
    }

    // ===== GETTERS =====

    pub fn z_near(&self) -> f32 {
        self.z_near
    }

    pub fn z_far(&self) -> f32 {
        self.z_far
    }

    pub fn up_vector(&self) -> Vec3 {
        self.up_vector
    }

    pub fn look_from(&self) -> Vec3 {
        self.look_from
    }

    pub fn look_at(&self) -> Vec3 {
        self.look_at
    }

    /// Viewport width from the last `update()`
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Viewport height from the last `update()` (>= 1 once updated)
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width / height ratio from the last `update()`
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// NDC to pixel transform (bottom-left origin)
    pub fn viewport_matrix(&self) -> &Mat4 {
        &self.viewport_matrix
    }

    /// Frustum planes from the last `update()`
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Snapshot of the matrices for the renderer and picking.
    pub fn view_state(&self) -> ViewState {
        ViewState {
            projection_matrix: self.projection_matrix,
            view_matrix: self.view_matrix,
            viewport_matrix: self.viewport_matrix,
            width: self.width,
            height: self.height,
        }
    }

    // ===== SETTERS =====

    /// Set the near clip distance. Must stay in `(0, z_far)`.
    pub fn set_z_near(&mut self, z_near: f32) -> Result<()> {
        validate_clip_planes(z_near, self.z_far)?;
        self.z_near = z_near;
        Ok(())
    }

    /// Set the far clip distance. Must stay above `z_near`.
    pub fn set_z_far(&mut self, z_far: f32) -> Result<()> {
        validate_clip_planes(self.z_near, z_far)?;
        self.z_far = z_far;
        Ok(())
    }

    pub fn set_up_vector(&mut self, up_vector: Vec3) {
        self.up_vector = up_vector;
    }

    pub fn set_look_from(&mut self, look_from: Vec3) {
        self.look_from = look_from;
    }

    pub fn set_look_at(&mut self, look_at: Vec3) {
        self.look_at = look_at;
    }

    // ===== PER-FRAME UPDATE =====

    /// Recompute projection, view and frustum for a viewport.
    ///
    /// Width and height are clamped to at least 1. The viewport matrix is
    /// only rebuilt when the (clamped) size changed.
    pub fn update(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);

        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.viewport_matrix = compute_viewport_matrix(width as f32, height as f32);
        }
        self.aspect = width as f32 / height as f32;

        self.projection_matrix = compute_projection_matrix(FOV_Y_DEGREES, self.aspect, self.z_near, self.z_far);

        let forward = self.look_at - self.look_from;
        if forward.length_squared() <= EPSILON * EPSILON {
            crate::engine_warn!(
                "galaxy3d::Camera",
                "look_from and look_at coincide at {:?}, keeping previous view",
                self.look_from
            );
        } else {
            let up = self.effective_up_vector(forward.normalize());
            self.view_matrix = compute_view_matrix(self.look_from, self.look_at, up);
        }

        self.frustum.update_frustum(&self.projection_matrix, &self.view_matrix);
    }

    /// Up vector for a look direction, usable when the default Y axis is
    /// parallel to it.
    ///
    /// A (near-)vertical look direction yields `(0, 0, forward.y)` normalized,
    /// otherwise the Y axis is re-orthogonalized against the look direction.
    pub fn compute_up_vector(look_from: Vec3, look_at: Vec3) -> Vec3 {
        let forward = (look_at - look_from).normalize();
        if forward.x.abs() < EPSILON && forward.z.abs() < EPSILON {
            return Vec3::new(0.0, 0.0, forward.y).normalize();
        }
        let side = forward.cross(Vec3::Y).normalize();
        side.cross(forward).normalize()
    }

    fn effective_up_vector(&mut self, forward: Vec3) -> Vec3 {
        let degenerate = forward.cross(self.up_vector).length_squared() <= EPSILON * EPSILON;
        if degenerate && !self.up_fallback {
            crate::engine_warn!(
                "galaxy3d::Camera",
                "Up vector {:?} is parallel to the look direction, using computed up vector",
                self.up_vector
            );
        }
        self.up_fallback = degenerate;

        if degenerate {
            Self::compute_up_vector(self.look_from, self.look_at)
        } else {
            self.up_vector
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_clip_planes(z_near: f32, z_far: f32) -> Result<()> {
    if !z_near.is_finite() || !z_far.is_finite() {
        return Err(crate::engine_err!(
            Error::InvalidConfiguration,
            "galaxy3d::Camera",
            "Clip planes must be finite (z_near {}, z_far {})",
            z_near,
            z_far
        ));
    }
    if z_near <= 0.0 {
        return Err(crate::engine_err!(
            Error::InvalidConfiguration,
            "galaxy3d::Camera",
            "z_near must be > 0 (got {})",
            z_near
        ));
    }
    if z_near >= z_far {
        return Err(crate::engine_err!(
            Error::InvalidConfiguration,
            "galaxy3d::Camera",
            "z_near {} must be < z_far {}",
            z_near,
            z_far
        ));
    }
    Ok(())
}

/// Symmetric perspective frustum, OpenGL clip depth `[-1, 1]`.
fn compute_projection_matrix(fov_y_degrees: f32, aspect: f32, z_near: f32, z_far: f32) -> Mat4 {
    let tangent = (fov_y_degrees.to_radians() * 0.5).tan();
    let top = z_near * tangent;
    let right = top * aspect;
    compute_frustum_matrix(-right, right, -top, top, z_near, z_far)
}

fn compute_frustum_matrix(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    Mat4::from_cols(
        Vec4::new(2.0 * near / (right - left), 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 * near / (top - bottom), 0.0, 0.0),
        Vec4::new(
            (right + left) / (right - left),
            (top + bottom) / (top - bottom),
            -(far + near) / (far - near),
            -1.0,
        ),
        Vec4::new(0.0, 0.0, -(2.0 * far * near) / (far - near), 0.0),
    )
}

/// Orthonormal look-at basis composed with the translation by `-look_from`.
fn compute_view_matrix(look_from: Vec3, look_at: Vec3, up: Vec3) -> Mat4 {
    let forward = (look_at - look_from).normalize();
    let side = forward.cross(up).normalize();
    let up = side.cross(forward);

    Mat4::from_cols(
        Vec4::new(side.x, up.x, -forward.x, 0.0),
        Vec4::new(side.y, up.y, -forward.y, 0.0),
        Vec4::new(side.z, up.z, -forward.z, 0.0),
        Vec4::new(-side.dot(look_from), -up.dot(look_from), forward.dot(look_from), 1.0),
    )
}

fn compute_viewport_matrix(width: f32, height: f32) -> Mat4 {
    Mat4::from_cols(
        Vec4::new(width / 2.0, 0.0, 0.0, 0.0),
        Vec4::new(0.0, height / 2.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(width / 2.0, height / 2.0, 0.0, 1.0),
    )
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
