//! Geometry utilities: obstacle extraction and point-in-box tests.
//!
//! Room objects arrive as schema-less JSON from many authoring tools, with
//! synonymous field names (`position`/`pos`, `size`/`dimensions`/`scale`,
//! explicit `bounds.min`/`bounds.max`). They are normalized into canonical
//! [`Obstacle`] records exactly once, here; nothing deeper in the pipeline
//! branches on shape. Malformed numeric fields read as 0.0 — authoring tools
//! are not trusted to produce well-typed documents.

use serde_json::Value;
use showroom_core::Vec3;
use showroom_core::room::lenient_num;

/// Default padding margin around an obstacle when testing points.
pub const OBSTACLE_PADDING: f64 = 0.2;

/// Objects whose vertical extent misses this band around the floor do not
/// block agents (wall clocks, ceiling lights).
const FLOOR_SLICE_MIN: f64 = 0.0;
const FLOOR_SLICE_MAX: f64 = 2.0;

/// An axis-aligned rectangle in the horizontal plane. Derived, ephemeral:
/// computed once per placement call, no persistent identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub min_x: f64,
    pub max_x: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl Obstacle {
    /// Point-in-box test with a padding margin.
    pub fn contains(&self, p: &Vec3, padding: f64) -> bool {
        p.x >= self.min_x - padding
            && p.x <= self.max_x + padding
            && p.z >= self.min_z - padding
            && p.z <= self.max_z + padding
    }

    /// Center of the footprint in the horizontal plane.
    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.min_x + self.max_x) / 2.0,
            0.0,
            (self.min_z + self.max_z) / 2.0,
        )
    }

    /// Radius of the circle circumscribing the footprint's larger side.
    pub fn radius(&self) -> f64 {
        ((self.max_x - self.min_x).max(self.max_z - self.min_z)) / 2.0
    }
}

/// Whether `p` lies inside any obstacle, with the default padding.
pub fn blocked(p: &Vec3, obstacles: &[Obstacle]) -> bool {
    obstacles.iter().any(|o| o.contains(p, OBSTACLE_PADDING))
}

/// Normalize a heterogeneous room-object list into obstacle records.
///
/// Objects with no recognizable footprint, or whose vertical extent misses
/// the floor slice, are skipped.
pub fn extract_obstacles(room_objects: &[Value]) -> Vec<Obstacle> {
    room_objects.iter().filter_map(obstacle_from_object).collect()
}

/// Extract one obstacle from one object description, if it has a footprint
/// at walkable level.
pub fn obstacle_from_object(object: &Value) -> Option<Obstacle> {
    // Explicit bounds win over position + size.
    if let Some(bounds) = object.get("bounds") {
        let min = bounds.get("min").map(Vec3::from_value)?;
        let max = bounds.get("max").map(Vec3::from_value)?;
        if !floor_level(min.y, max.y) {
            return None;
        }
        return Some(Obstacle {
            min_x: min.x.min(max.x),
            max_x: min.x.max(max.x),
            min_z: min.z.min(max.z),
            max_z: min.z.max(max.z),
        });
    }

    let position = object
        .get("position")
        .or_else(|| object.get("pos"))
        .map(Vec3::from_value)
        .unwrap_or_default();

    let size = object
        .get("size")
        .or_else(|| object.get("dimensions"))
        .or_else(|| object.get("scale"))?;

    let sx = lenient_num(size.get("x")).abs();
    let sy = lenient_num(size.get("y")).abs();
    let sz = lenient_num(size.get("z")).abs();
    if sx == 0.0 && sz == 0.0 {
        return None;
    }
    if !floor_level(position.y - sy / 2.0, position.y + sy / 2.0) {
        return None;
    }

    Some(Obstacle {
        min_x: position.x - sx / 2.0,
        max_x: position.x + sx / 2.0,
        min_z: position.z - sz / 2.0,
        max_z: position.z + sz / 2.0,
    })
}

fn floor_level(min_y: f64, max_y: f64) -> bool {
    min_y < FLOOR_SLICE_MAX && max_y >= FLOOR_SLICE_MIN
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_from_position_and_size() {
        let obstacle =
            obstacle_from_object(&json!({"position": {"x": 2, "z": 2}, "size": {"x": 2, "y": 1, "z": 4}}))
                .unwrap();
        assert_eq!(obstacle.min_x, 1.0);
        assert_eq!(obstacle.max_x, 3.0);
        assert_eq!(obstacle.min_z, 0.0);
        assert_eq!(obstacle.max_z, 4.0);
    }

    #[test]
    fn size_synonyms_accepted() {
        for key in ["size", "dimensions", "scale"] {
            let obj = json!({"position": {}, key: {"x": 1, "y": 1, "z": 1}});
            assert!(obstacle_from_object(&obj).is_some(), "field {key}");
        }
    }

    #[test]
    fn pos_synonym_accepted() {
        let obstacle =
            obstacle_from_object(&json!({"pos": {"x": 5}, "size": {"x": 2, "y": 1, "z": 2}}))
                .unwrap();
        assert_eq!(obstacle.min_x, 4.0);
    }

    #[test]
    fn explicit_bounds_win() {
        let obstacle = obstacle_from_object(&json!({
            "bounds": {"min": {"x": -1, "z": -1}, "max": {"x": 1, "z": 1}},
            "position": {"x": 50},
        }))
        .unwrap();
        assert_eq!(obstacle.min_x, -1.0);
        assert_eq!(obstacle.max_x, 1.0);
    }

    #[test]
    fn swapped_bounds_are_normalized() {
        let obstacle = obstacle_from_object(&json!({
            "bounds": {"min": {"x": 1, "z": 1}, "max": {"x": -1, "z": -1}},
        }))
        .unwrap();
        assert!(obstacle.min_x < obstacle.max_x);
        assert!(obstacle.min_z < obstacle.max_z);
    }

    #[test]
    fn ceiling_objects_skipped() {
        let lamp = json!({"position": {"y": 3.0}, "size": {"x": 1, "y": 0.5, "z": 1}});
        assert!(obstacle_from_object(&lamp).is_none());
    }

    #[test]
    fn footprintless_objects_skipped() {
        assert!(obstacle_from_object(&json!({"position": {"x": 1}})).is_none());
        assert!(obstacle_from_object(&json!({"position": {}, "size": {"y": 2}})).is_none());
    }

    #[test]
    fn malformed_numbers_default_to_zero() {
        let obj = json!({"position": {"x": "abc"}, "size": {"x": "2", "y": 1, "z": 2}});
        let obstacle = obstacle_from_object(&obj).unwrap();
        assert_eq!(obstacle.min_x, -1.0);
        assert_eq!(obstacle.max_x, 1.0);
    }

    #[test]
    fn contains_respects_padding() {
        let obstacle = Obstacle { min_x: 0.0, max_x: 1.0, min_z: 0.0, max_z: 1.0 };
        let p = Vec3::new(1.1, 0.0, 0.5);
        assert!(obstacle.contains(&p, OBSTACLE_PADDING));
        assert!(!obstacle.contains(&p, 0.0));
    }

    #[test]
    fn blocked_over_set() {
        let obstacles = extract_obstacles(&[
            json!({"position": {"x": 0, "z": 0}, "size": {"x": 1, "y": 1, "z": 1}}),
            json!({"position": {"x": 5, "z": 5}, "size": {"x": 1, "y": 1, "z": 1}}),
        ]);
        assert_eq!(obstacles.len(), 2);
        assert!(blocked(&Vec3::new(5.0, 0.0, 5.0), &obstacles));
        assert!(!blocked(&Vec3::new(2.5, 0.0, 2.5), &obstacles));
    }
}
