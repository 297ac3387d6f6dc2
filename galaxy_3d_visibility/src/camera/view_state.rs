/// ViewState: snapshot of the camera matrices for one frame.
///
/// Produced by `Camera::view_state()` after `Camera::update()`. The
/// renderer reads the matrices from here instead of from a global, and
/// picking code uses it to convert between world and screen coordinates.
///
/// Screen coordinates have their origin at the top-left corner, x to the
/// right and y down, in pixels.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Camera matrices and viewport size for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// Projection matrix (OpenGL clip depth)
    pub projection_matrix: Mat4,
    /// World to view matrix
    pub view_matrix: Mat4,
    /// NDC to pixel matrix
    pub viewport_matrix: Mat4,
    /// Viewport width in pixels
    pub width: u32,
    /// Viewport height in pixels (>= 1)
    pub height: u32,
}

/// GPU layout of the per-frame camera data (std140 compatible)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ViewUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_projection: [[f32; 4]; 4],
    /// width, height, 1 / width, 1 / height
    pub viewport: [f32; 4],
}

impl ViewState {
    /// Combined matrix (projection * view).
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }

    /// Project a world position to screen pixels.
    ///
    /// Returns `None` for points at or behind the eye plane, which have no
    /// meaningful projection.
    pub fn compute_screen_coordinate(&self, world: Vec3) -> Option<Vec2> {
        let clip = self.view_projection_matrix() * world.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }

        let ndc = clip.truncate() / clip.w;
        let width = self.width as f32;
        let height = self.height as f32;
        Some(Vec2::new(
            (ndc.x + 1.0) * width * 0.5,
            height - (ndc.y + 1.0) * height * 0.5,
        ))
    }

    /// Unproject a screen position back into the world.
    ///
    /// `depth` is the window-space depth in `[0, 1]` as read back from the
    /// depth buffer (0 = near plane, 1 = far plane).
    /// Returns `None` if the view-projection matrix cannot be inverted or
    /// the viewport is empty.
    pub fn compute_world_coordinate(&self, mouse_x: f32, mouse_y: f32, depth: f32) -> Option<Vec3> {
        if self.width == 0 || self.height == 0 {
            return None;
        }

        let view_projection = self.view_projection_matrix();
        if view_projection.determinant().abs() <= f32::EPSILON * f32::EPSILON {
            return None;
        }

        let ndc = Vec4::new(
            2.0 * mouse_x / self.width as f32 - 1.0,
            1.0 - 2.0 * mouse_y / self.height as f32,
            2.0 * depth - 1.0,
            1.0,
        );
        let world = view_projection.inverse() * ndc;
        if world.w.abs() <= f32::EPSILON {
            return None;
        }

        Some(world.truncate() / world.w)
    }

    /// Pixel position of a normalized device coordinate, through the viewport matrix.
    ///
    /// The viewport matrix has a bottom-left origin.
    pub fn ndc_to_viewport(&self, ndc: Vec3) -> Vec3 {
        self.viewport_matrix.transform_point3(ndc)
    }

    /// GPU upload view of this state
    pub fn uniform(&self) -> ViewUniform {
        let (width, height) = (self.width as f32, self.height.max(1) as f32);
        ViewUniform {
            view: self.view_matrix.to_cols_array_2d(),
            projection: self.projection_matrix.to_cols_array_2d(),
            view_projection: self.view_projection_matrix().to_cols_array_2d(),
            viewport: [width, height, if width > 0.0 { 1.0 / width } else { 0.0 }, 1.0 / height],
        }
    }
}

#[cfg(test)]
#[path = "view_state_tests.rs"]
mod tests;
