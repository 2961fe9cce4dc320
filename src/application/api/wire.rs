//! JSON shapes for math types on the wire.
//!
//! Vectors are `{x, y, z}`. Rotations travel as Unreal rotators in degrees,
//! `{roll_deg, pitch_deg, yaw_deg}`, and a transform is
//! `{location, rotation, scale}`.

use crate::domains::math::{euler_to_quaternion, quaternion_to_euler, Quaternion, Transform, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WireVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<&Vector3> for WireVector {
    fn from(v: &Vector3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Vector3> for WireVector {
    fn from(v: Vector3) -> Self {
        Self::from(&v)
    }
}

impl From<WireVector> for Vector3 {
    fn from(v: WireVector) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WireRotator {
    pub roll_deg: f64,
    pub pitch_deg: f64,
    pub yaw_deg: f64,
}

impl From<&Quaternion> for WireRotator {
    fn from(q: &Quaternion) -> Self {
        let euler = quaternion_to_euler(q, true);
        Self {
            roll_deg: euler.x,
            pitch_deg: euler.y,
            yaw_deg: euler.z,
        }
    }
}

impl From<WireRotator> for Quaternion {
    fn from(r: WireRotator) -> Self {
        euler_to_quaternion(&Vector3::new(r.roll_deg, r.pitch_deg, r.yaw_deg), true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireTransform {
    #[serde(default)]
    pub location: WireVector,
    #[serde(default)]
    pub rotation: WireRotator,
    #[serde(default = "unit_scale")]
    pub scale: WireVector,
}

fn unit_scale() -> WireVector {
    WireVector { x: 1.0, y: 1.0, z: 1.0 }
}

impl Default for WireTransform {
    fn default() -> Self {
        Self {
            location: WireVector::default(),
            rotation: WireRotator::default(),
            scale: unit_scale(),
        }
    }
}

impl From<&Transform> for WireTransform {
    fn from(t: &Transform) -> Self {
        Self {
            location: t.location.into(),
            rotation: (&t.rotation).into(),
            scale: t.scale.into(),
        }
    }
}

impl From<WireTransform> for Transform {
    fn from(t: WireTransform) -> Self {
        Transform::new(t.location.into(), t.rotation.into(), t.scale.into())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
struct WireBox {
    min: WireVector,
    max: WireVector,
}

/// `#[serde(with = "wire::vector")]` for `Vector3` fields.
pub mod vector {
    use super::WireVector;
    use crate::domains::math::Vector3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Vector3, s: S) -> Result<S::Ok, S::Error> {
        WireVector::from(v).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vector3, D::Error> {
        WireVector::deserialize(d).map(Vector3::from)
    }
}

pub mod vector_list {
    use super::WireVector;
    use crate::domains::math::Vector3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(points: &[Vector3], s: S) -> Result<S::Ok, S::Error> {
        let wire: Vec<WireVector> = points.iter().map(WireVector::from).collect();
        wire.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vector3>, D::Error> {
        let wire = Vec::<WireVector>::deserialize(d)?;
        Ok(wire.into_iter().map(Vector3::from).collect())
    }
}

pub mod transform {
    use super::WireTransform;
    use crate::domains::math::Transform;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(t: &Transform, s: S) -> Result<S::Ok, S::Error> {
        WireTransform::from(t).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Transform, D::Error> {
        WireTransform::deserialize(d).map(Transform::from)
    }
}

pub mod aabb {
    use super::{WireBox, WireVector};
    use crate::domains::math::{Aabb, Vector3};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(b: &Aabb, s: S) -> Result<S::Ok, S::Error> {
        WireBox {
            min: WireVector::from(&b.min),
            max: WireVector::from(&b.max),
        }
        .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Aabb, D::Error> {
        let b = WireBox::deserialize(d)?;
        Ok(Aabb::new(Vector3::from(b.min), Vector3::from(b.max)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transform_travels_as_rotator_degrees() {
        let t = Transform::new(
            Vector3::new(1.0, 2.0, 3.0),
            euler_to_quaternion(&Vector3::new(0.0, 0.0, 90.0), true),
            Vector3::new(1.0, 1.0, 2.0),
        );
        let value = serde_json::to_value(WireTransform::from(&t)).unwrap();
        assert_eq!(value["location"], json!({"x": 1.0, "y": 2.0, "z": 3.0}));
        assert!((value["rotation"]["yaw_deg"].as_f64().unwrap() - 90.0).abs() < 1e-9);
        assert_eq!(value["scale"]["z"], json!(2.0));
    }

    #[test]
    fn missing_scale_reads_as_unit() {
        let wire: WireTransform = serde_json::from_value(json!({"location": {"x": 5.0}})).unwrap();
        let t = Transform::from(wire);
        assert_eq!(t.location, Vector3::new(5.0, 0.0, 0.0));
        assert_eq!(t.scale, Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(t.rotation, Quaternion::identity());
    }
}
