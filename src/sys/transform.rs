//! Window surface transforms and the matrices derived from them.
//!
//! Pivots are relative to the window rect (0..1), translations are in device pixels and
//! rotations in degrees. Matrices use glam's column vector convention.

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::geometry::{IsWithin, NearZero, Rect};

/// Z position of the virtual camera the compositor projects through.
pub const CAMERA_Z: f32 = -576.0;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Transform {
    pub pivot_x: f32,
    pub pivot_y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub scale_z: f32,
    pub translate_x: f32,
    pub translate_y: f32,
    pub translate_z: f32,
    pub rotation_x: f32,
    pub rotation_y: f32,
    pub rotation_z: f32,
}

impl Default for Transform {
    fn default() -> Self { Self::IDENTITY }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        pivot_x: 0.5,
        pivot_y: 0.5,
        scale_x: 1.0,
        scale_y: 1.0,
        scale_z: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
        translate_z: 0.0,
        rotation_x: 0.0,
        rotation_y: 0.0,
        rotation_z: 0.0,
    };

    pub fn is_identity(&self) -> bool { *self == Self::IDENTITY }

    pub fn approx_eq(&self, other: &Transform, eps: f32) -> bool {
        let a = self.as_array();
        let b = other.as_array();
        a.iter().zip(b.iter()).all(|(x, y)| x.is_within(eps, *y))
    }

    fn as_array(&self) -> [f32; 11] {
        [
            self.pivot_x,
            self.pivot_y,
            self.scale_x,
            self.scale_y,
            self.scale_z,
            self.translate_x,
            self.translate_y,
            self.translate_z,
            self.rotation_x,
            self.rotation_y,
            self.rotation_z,
        ]
    }

    /// Scale, then rotate about x, y and z, then translate.
    pub fn world_matrix(&self) -> Mat4 {
        let mut mat = Mat4::IDENTITY;
        if self.scale_x != 1.0 || self.scale_y != 1.0 || self.scale_z != 1.0 {
            mat = Mat4::from_scale(Vec3::new(self.scale_x, self.scale_y, self.scale_z));
        }
        if self.rotation_x != 0.0 {
            mat = Mat4::from_rotation_x((-self.rotation_x).to_radians()) * mat;
        }
        if self.rotation_y != 0.0 {
            mat = Mat4::from_rotation_y((-self.rotation_y).to_radians()) * mat;
        }
        if self.rotation_z != 0.0 {
            mat = Mat4::from_rotation_z(self.rotation_z.to_radians()) * mat;
        }
        if self.translate_x != 0.0 || self.translate_y != 0.0 || self.translate_z != 0.0 {
            mat = Mat4::from_translation(Vec3::new(
                self.translate_x,
                self.translate_y,
                self.translate_z,
            )) * mat;
        }
        mat
    }

    /// Absolute pivot position of this transform over `rect`.
    pub fn pivot_position(&self, rect: &Rect) -> Vec3 {
        Vec3::new(
            rect.x as f32 + self.pivot_x * rect.width as f32,
            rect.y as f32 + self.pivot_y * rect.height as f32,
            0.0,
        )
    }

    /// World matrix applied about an absolute pivot.
    pub fn world_matrix_about(&self, pivot: Vec3) -> Mat4 {
        Mat4::from_translation(pivot) * self.world_matrix() * Mat4::from_translation(-pivot)
    }

    /// World matrix about the pivot followed by the camera view and perspective projection.
    pub fn full_matrix(&self, rect: &Rect) -> Mat4 {
        let pivot = self.pivot_position(rect);
        let world = self.world_matrix_about(pivot);
        let camera = Vec3::new(pivot.x + self.translate_x, pivot.y + self.translate_y, CAMERA_Z);
        let view = look_at(camera, Vec3::new(camera.x, camera.y, 0.0), Vec3::Y);
        perspective(camera) * view * world
    }

    /// Replaces the z translation by an equivalent uniform scale over `rect`.
    pub fn clear_z_axis_offset(&mut self, rect: &Rect) {
        let with_z = transform_rect(&self.full_matrix(rect), rect);
        let translate_z = self.translate_z;
        self.translate_z = 0.0;
        let without_z = transform_rect(&self.full_matrix(rect), rect);
        if without_z.width == 0 {
            self.translate_z = translate_z;
            return;
        }
        let scale = with_z.width as f32 / without_z.width as f32;
        self.scale_x *= scale;
        self.scale_y *= scale;
    }
}

pub fn matrix_scale(mat: &Mat4) -> Vec3 {
    Vec3::new(
        mat.x_axis.truncate().length(),
        mat.y_axis.truncate().length(),
        mat.z_axis.truncate().length(),
    )
}

pub fn matrix_translation(mat: &Mat4) -> Vec3 { mat.w_axis.truncate() }

fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    let z_axis = (target - eye).normalize();
    let x_axis = up.cross(z_axis).normalize();
    let y_axis = z_axis.cross(x_axis).normalize();
    Mat4::from_cols(
        Vec4::new(x_axis.x, y_axis.x, z_axis.x, 0.0),
        Vec4::new(x_axis.y, y_axis.y, z_axis.y, 0.0),
        Vec4::new(x_axis.z, y_axis.z, z_axis.z, 0.0),
        Vec4::new(-x_axis.dot(eye), -y_axis.dot(eye), -z_axis.dot(eye), 1.0),
    )
}

fn perspective(camera: Vec3) -> Mat4 {
    let z = camera.z.abs();
    Mat4::from_cols_array_2d(&[
        [z, 0.0, 0.0, 0.0],
        [0.0, z, 0.0, 0.0],
        [camera.x, camera.y, 0.0, 1.0],
        [0.0, 0.0, 1.0, 0.0],
    ])
}

/// Applies `mat` to a point and divides by the resulting w unless it is near zero.
pub fn transform_with_persp_div(point: Vec3, mat: &Mat4) -> Vec3 {
    let out = *mat * point.extend(1.0);
    if out.w.near_zero() { out.truncate() } else { out.truncate() / out.w }
}

/// Bounding rect of the four transformed corners.
pub fn transform_rect(mat: &Mat4, rect: &Rect) -> Rect {
    let left = rect.x as f32;
    let top = rect.y as f32;
    let right = left + rect.width as f32;
    let bottom = top + rect.height as f32;
    let corners = [
        transform_with_persp_div(Vec3::new(left, top, 0.0), mat),
        transform_with_persp_div(Vec3::new(right, top, 0.0), mat),
        transform_with_persp_div(Vec3::new(left, bottom, 0.0), mat),
        transform_with_persp_div(Vec3::new(right, bottom, 0.0), mat),
    ];
    let xmin = corners.iter().map(|c| c.x).fold(f32::INFINITY, f32::min) as i32;
    let ymin = corners.iter().map(|c| c.y).fold(f32::INFINITY, f32::min) as i32;
    let xmax = corners.iter().map(|c| c.x).fold(f32::NEG_INFINITY, f32::max) as i32;
    let ymax = corners.iter().map(|c| c.y).fold(f32::NEG_INFINITY, f32::max) as i32;
    Rect::new(xmin, ymin, (xmax - xmin).max(0) as u32, (ymax - ymin).max(0) as u32)
}

/// How much a unit step in window space grows on screen, per axis. Degenerate matrices
/// report no scaling.
pub fn hot_zone_scale(mat: &Mat4) -> Vec2 {
    let a = transform_with_persp_div(Vec3::ZERO, mat).truncate();
    let b = transform_with_persp_div(Vec3::X, mat).truncate();
    let c = transform_with_persp_div(Vec3::Y, mat).truncate();
    let scale = Vec2::new((a - b).length(), (a - c).length());
    if scale.x.is_nan() || scale.y.is_nan() || scale.x.near_zero() || scale.y.near_zero() {
        Vec2::ONE
    } else {
        scale
    }
}
