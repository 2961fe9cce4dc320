use crate::common::GeometryError;
use nalgebra::{Matrix3, Matrix4, Point3, Rotation3, Translation3, UnitQuaternion};
use serde::{Deserialize, Serialize};
use std::ops::Mul;

pub type Vector3 = nalgebra::Vector3<f64>;
pub type Quaternion = UnitQuaternion<f64>;
pub type Mat4 = Matrix4<f64>;

/// `location` and `rotation` grouped as a pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub location: Vector3,
    pub rotation: Quaternion,
}

impl Pose {
    pub fn new(location: Vector3, rotation: Quaternion) -> Self {
        Self { location, rotation }
    }

    pub fn to_transform(&self) -> Transform {
        Transform::new(self.location, self.rotation, Vector3::new(1.0, 1.0, 1.0))
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Vector3::zeros(), Quaternion::identity())
    }
}

/// Spatial transform with location, rotation and per-axis scale, aligned with
/// Unreal Engine's transform. Applied to a point as scale, then rotate, then
/// translate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub location: Vector3,
    pub rotation: Quaternion,
    pub scale: Vector3,
}

impl Transform {
    pub fn new(location: Vector3, rotation: Quaternion, scale: Vector3) -> Self {
        Self {
            location,
            rotation,
            scale,
        }
    }

    pub fn from_location(location: Vector3) -> Self {
        Self {
            location,
            ..Self::default()
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Translation3::from(self.location).to_homogeneous()
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// `self * other`: applies `other` first, then `self`.
    pub fn compose(&self, other: &Transform) -> Transform {
        let m = self.to_matrix() * other.to_matrix();

        let location = Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
        let linear: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
        let scale = Vector3::new(
            linear.column(0).norm(),
            linear.column(1).norm(),
            linear.column(2).norm(),
        );

        let mut rot = linear;
        for (i, s) in scale.iter().enumerate() {
            if *s != 0.0 {
                rot.column_mut(i).unscale_mut(*s);
            }
        }
        let rotation = Quaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rot));

        Transform::new(location, rotation, scale)
    }

    pub fn transform_point(&self, point: &Vector3) -> Vector3 {
        self.to_matrix().transform_point(&Point3::from(*point)).coords
    }

    /// Inverse transform: scale is inverted first, then rotation, then translation.
    pub fn inverse(&self) -> Result<Transform, GeometryError> {
        if self.scale.iter().any(|c| *c == 0.0) {
            return Err(GeometryError::ZeroScale {
                x: self.scale.x,
                y: self.scale.y,
                z: self.scale.z,
            });
        }
        let inv_scale = self.scale.map(|c| 1.0 / c);
        let inv_rot = self.rotation.inverse();
        let inv_loc = -(inv_rot * inv_scale.component_mul(&self.location));
        Ok(Transform::new(inv_loc, inv_rot, inv_scale))
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Vector3::zeros(), Quaternion::identity(), Vector3::new(1.0, 1.0, 1.0))
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        self.compose(&rhs)
    }
}

impl From<Pose> for Transform {
    fn from(pose: Pose) -> Self {
        pose.to_transform()
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vector3,
    pub max: Vector3,
}

impl Aabb {
    pub fn new(min: Vector3, max: Vector3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vector3 {
        (self.min + self.max) * 0.5
    }

    /// Size along each axis.
    pub fn extent(&self) -> Vector3 {
        self.max - self.min
    }

    pub fn contains_point(&self, point: &Vector3) -> bool {
        (0..3).all(|i| self.min[i] <= point[i] && point[i] <= self.max[i])
    }
}
