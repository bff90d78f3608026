//! Room plan value objects.
//!
//! A room plan is an externally authored document: zones, spawn points, and a
//! heterogeneous list of room objects. Authoring tools are not trusted to
//! produce well-typed numbers, so all numeric parsing here is permissive —
//! missing or malformed fields become `0.0` instead of failing the document
//! (the intentional leniency policy of the geometry boundary).

use serde::{Deserialize, Deserializer, Serialize};

/// A point or direction in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub x: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub y: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The default agent orientation: facing +Z.
    pub fn forward() -> Self {
        Self { x: 0.0, y: 0.0, z: 1.0 }
    }

    /// 3D Euclidean distance.
    pub fn distance(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Horizontal-plane (XZ) distance — the floor metric used for spacing.
    pub fn distance_xz(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    /// Read a Vec3 out of loose JSON, accepting `position` objects with any
    /// subset of `x`/`y`/`z` and defaulting everything else to zero.
    pub fn from_value(value: &serde_json::Value) -> Self {
        Self {
            x: lenient_num(value.get("x")),
            y: lenient_num(value.get("y")),
            z: lenient_num(value.get("z")),
        }
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Extract a number from loose JSON: numbers pass through, numeric strings
/// are parsed, anything else is 0.0.
pub fn lenient_num(value: Option<&serde_json::Value>) -> f64 {
    match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(lenient_num(Some(&value)))
}

/// A named, tagged region of the room, referenced by spawn points.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Zone {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// An authored candidate position/orientation where an agent may be placed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnPoint {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "Vec3::forward")]
    pub forward: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// An externally authored room description.
///
/// `room_objects` stays schema-less JSON: the entries come from many authoring
/// tools with synonymous field names and are normalized into obstacle records
/// once, at placement time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomPlan {
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub spawn_points: Vec<SpawnPoint>,
    #[serde(default)]
    pub room_objects: Vec<serde_json::Value>,
}

impl RoomPlan {
    /// Look up a zone by id.
    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vec3_distance() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 0.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn xz_distance_ignores_height() {
        let a = Vec3::new(0.0, 10.0, 0.0);
        let b = Vec3::new(3.0, -7.0, 4.0);
        assert!((a.distance_xz(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn vec3_tolerates_malformed_fields() {
        let v: Vec3 = serde_json::from_value(json!({"x": "1.5", "y": "oops", "z": null})).unwrap();
        assert_eq!(v, Vec3::new(1.5, 0.0, 0.0));
    }

    #[test]
    fn vec3_from_partial_object() {
        let v = Vec3::from_value(&json!({"x": 2}));
        assert_eq!(v, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn spawn_point_forward_defaults_to_plus_z() {
        let sp: SpawnPoint =
            serde_json::from_value(json!({"id": "sp1", "position": {"x": 1.0}})).unwrap();
        assert_eq!(sp.forward, Vec3::forward());
        assert!(sp.zone_id.is_none());
    }

    #[test]
    fn room_plan_accepts_empty_document() {
        let plan: RoomPlan = serde_json::from_value(json!({})).unwrap();
        assert!(plan.zones.is_empty());
        assert!(plan.spawn_points.is_empty());
        assert!(plan.room_objects.is_empty());
    }

    #[test]
    fn room_plan_keeps_objects_schemaless() {
        let plan: RoomPlan = serde_json::from_value(json!({
            "room_objects": [{"position": {"x": 1}, "size": {"x": 2, "y": 1, "z": 2}}]
        }))
        .unwrap();
        assert_eq!(plan.room_objects.len(), 1);
    }
}
