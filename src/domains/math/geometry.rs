use super::types::{Quaternion, Vector3};
use nalgebra::Rotation3;

/// Scalar or per-component angle unit conversion.
pub trait AngleUnits: Sized {
    fn degrees_to_radians(self) -> Self;
    fn radians_to_degrees(self) -> Self;
}

impl AngleUnits for f64 {
    fn degrees_to_radians(self) -> Self {
        self.to_radians()
    }

    fn radians_to_degrees(self) -> Self {
        self.to_degrees()
    }
}

impl AngleUnits for Vector3 {
    fn degrees_to_radians(self) -> Self {
        self.map(f64::to_radians)
    }

    fn radians_to_degrees(self) -> Self {
        self.map(f64::to_degrees)
    }
}

pub fn degrees_to_radians<T: AngleUnits>(value: T) -> T {
    value.degrees_to_radians()
}

pub fn radians_to_degrees<T: AngleUnits>(value: T) -> T {
    value.radians_to_degrees()
}

/// Euler angles `(roll, pitch, yaw)` to a quaternion, Unreal's ZYX order:
/// roll about X, pitch about Y, yaw about Z.
pub fn euler_to_quaternion(euler: &Vector3, is_degree: bool) -> Quaternion {
    let euler = if is_degree { (*euler).degrees_to_radians() } else { *euler };
    Quaternion::from_euler_angles(euler.x, euler.y, euler.z)
}

/// Inverse of [`euler_to_quaternion`]; pitch is clamped to ±90° at the poles.
pub fn quaternion_to_euler(q: &Quaternion, is_degree: bool) -> Vector3 {
    let (roll, pitch, yaw) = q.euler_angles();
    let euler = Vector3::new(roll, pitch, yaw);
    if is_degree {
        euler.radians_to_degrees()
    } else {
        euler
    }
}

/// Rotation that points a camera at `pos` towards `target`.
///
/// The camera looks along local +X with world up +Z. When looking straight up
/// or down, +Y is used as the right axis. Coincident points give identity.
pub fn look_at_rotation(pos: &Vector3, target: &Vector3) -> Quaternion {
    let delta = target - pos;
    if delta.norm() < 1e-9 {
        return Quaternion::identity();
    }
    let forward = delta.normalize();
    let world_up = Vector3::z();

    let right = world_up.cross(&forward);
    let right = if right.norm() < 1e-6 {
        Vector3::y()
    } else {
        right.normalize()
    };
    let up = forward.cross(&right);

    let basis = Rotation3::from_basis_unchecked(&[forward, right, up]);
    Quaternion::from_rotation_matrix(&basis)
}

pub fn lerp(a: &Vector3, b: &Vector3, t: f64) -> Vector3 {
    a.lerp(b, t)
}
