//! The placement engine: `assign_spawn_points` and the preview ring search.

use std::collections::HashMap;

use serde_json::Value;
use showroom_core::{AgentSpec, Placement, RoomPlan, SpawnPoint, Vec3};
use tracing::debug;

use crate::geometry::{self, Obstacle, extract_obstacles};

/// Initial radius of the generated circular layout.
const CIRCLE_RADIUS: f64 = 2.0;
/// Radius growth per retry when a circle slot is blocked or crowded.
const CIRCLE_GROWTH: f64 = 0.4;
/// Minimum XZ spacing between fallback-placed agents.
const MIN_SPACING: f64 = 0.6;
/// Retries per agent before accepting the last-tried circle position.
const MAX_CIRCLE_ATTEMPTS: usize = 12;

/// Ring search step for the preview flow.
const RING_STEP: f64 = 0.35;
/// Ring search radius cap.
const RING_MAX_RADIUS: f64 = 6.0;
/// Samples per ring.
const RING_SAMPLES: usize = 16;
/// Clearance added to an object's footprint radius in the preview search.
const PREVIEW_OBJECT_PADDING: f64 = 0.4;
/// Minimum distance from previously placed preview positions.
const PREVIEW_MIN_SPACING: f64 = 0.7;

/// Scoring weight: spawn point's zone is one of the agent's preferred zones.
const ZONE_MATCH_SCORE: f64 = 10.0;
/// Scoring weight: per tag shared between spawn point and agent.
const TAG_MATCH_SCORE: f64 = 3.0;
/// Scoring bonus: preference-free agent meeting an `entrance` point.
const ENTRANCE_DEFAULT_SCORE: f64 = 0.5;
/// Mild centrality bias: penalty per meter from the origin.
const ORIGIN_DISTANCE_PENALTY: f64 = 0.05;

/// Resolve every agent to a placement.
///
/// Multi-stage: authored pre-assignments first, then greedy preference-scored
/// assignment over the unused spawn points, then a generated circular layout
/// for whatever is left (or for everything, when the room has no spawn points
/// at all). Total over agents: every input id gets exactly one placement.
pub fn assign_spawn_points(
    room_plan: &RoomPlan,
    agents: &[AgentSpec],
) -> HashMap<String, Placement> {
    let obstacles = extract_obstacles(&room_plan.room_objects);
    let mut placements: HashMap<String, Placement> = HashMap::new();
    let mut unused: Vec<&SpawnPoint> = room_plan.spawn_points.iter().collect();

    // Stage 1: honor authored pre-assignments, in input order. An agent whose
    // wish cannot be honored is demoted to normal assignment, never dropped.
    let mut remaining: Vec<&AgentSpec> = Vec::new();
    for agent in agents {
        if agent.position.is_none() && agent.spawn_point_id.is_none() {
            remaining.push(agent);
            continue;
        }
        if let Some(wanted) = agent.spawn_point_id.as_deref()
            && let Some(idx) = unused
                .iter()
                .position(|sp| sp.id == wanted && !geometry::blocked(&sp.position, &obstacles))
        {
            let sp = unused.remove(idx);
            debug!(agent = %agent.id, spawn_point = %sp.id, "Pre-assigned spawn point");
            placements.insert(agent.id.clone(), Placement::at_spawn_point(sp));
            continue;
        }
        if let Some(pos) = agent.position
            && !geometry::blocked(&pos, &obstacles)
        {
            debug!(agent = %agent.id, "Pre-assigned explicit position");
            placements.insert(agent.id.clone(), Placement::free(pos));
            continue;
        }
        remaining.push(agent);
    }

    // Stage 2: no spawn points authored, or all already booked — generate a
    // circular layout for everyone left.
    if room_plan.spawn_points.is_empty() || unused.is_empty() {
        place_on_circle(&remaining, &obstacles, &mut placements);
        return placements;
    }

    // Stage 3: greedy preference assignment. More specific agents choose
    // first; within equal specificity, input order holds (stable sort).
    let mut ordered = remaining;
    ordered.sort_by_key(|a| std::cmp::Reverse(a.specificity()));

    let mut overflow: Vec<&AgentSpec> = Vec::new();
    for agent in ordered {
        match pick_best_spawn_point(agent, &unused, &obstacles) {
            Some(idx) => {
                let sp = unused.remove(idx);
                placements.insert(agent.id.clone(), Placement::at_spawn_point(sp));
            }
            None => overflow.push(agent),
        }
    }

    // Agents beyond the supply of usable spawn points share the circle.
    if !overflow.is_empty() {
        place_on_circle(&overflow, &obstacles, &mut placements);
    }

    placements
}

/// Score every unused, unblocked spawn point for this agent and return the
/// index of the best one. Ties keep the first occurrence.
fn pick_best_spawn_point(
    agent: &AgentSpec,
    unused: &[&SpawnPoint],
    obstacles: &[Obstacle],
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (idx, sp) in unused.iter().enumerate() {
        if geometry::blocked(&sp.position, obstacles) {
            continue;
        }
        let mut score = 0.0;

        if let Some(zone_id) = sp.zone_id.as_deref()
            && agent.preferred_zone_ids.iter().any(|z| z == zone_id)
        {
            score += ZONE_MATCH_SCORE;
        }

        let tag_matches = sp
            .tags
            .iter()
            .filter(|t| agent.preferred_spawn_tags.contains(t))
            .count();
        score += TAG_MATCH_SCORE * tag_matches as f64;

        // Preference-free agents gravitate to the entrance by default.
        if agent.preferred_zone_ids.is_empty()
            && agent.preferred_spawn_tags.is_empty()
            && sp.zone_id.as_deref() == Some("entrance")
        {
            score += ENTRANCE_DEFAULT_SCORE;
        }

        score -= ORIGIN_DISTANCE_PENALTY * sp.position.distance(&Vec3::ZERO);

        if best.is_none_or(|(_, s)| score > s) {
            best = Some((idx, score));
        }
    }

    best.map(|(idx, _)| idx)
}

/// Place agents on a circle around the origin, one slot each at equal angular
/// spacing, growing the radius when a slot is obstacle-blocked or crowded.
fn place_on_circle(
    agents: &[&AgentSpec],
    obstacles: &[Obstacle],
    placements: &mut HashMap<String, Placement>,
) {
    let n = agents.len().max(1);
    for (i, agent) in agents.iter().enumerate() {
        let angle = (2.0 * std::f64::consts::PI * i as f64) / n as f64;
        let mut radius = CIRCLE_RADIUS;
        let mut candidate = circle_position(radius, angle);

        for _ in 0..MAX_CIRCLE_ATTEMPTS {
            let crowded = placements
                .values()
                .any(|p| p.position.distance_xz(&candidate) < MIN_SPACING);
            if !crowded && !geometry::blocked(&candidate, obstacles) {
                break;
            }
            radius += CIRCLE_GROWTH;
            candidate = circle_position(radius, angle);
        }
        // After the attempt cap the last-tried position stands: every agent
        // always receives some placement.
        placements.insert(agent.id.clone(), Placement::free(candidate));
    }
}

fn circle_position(radius: f64, angle: f64) -> Vec3 {
    Vec3::new(
        round3(radius * angle.cos()),
        0.0,
        round3(radius * angle.sin()),
    )
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Outward ring search used by the placement preview flow.
///
/// Walks rings of growing radius around `start` until it finds a position
/// clear of floor-level room objects and not too close to previously placed
/// preview positions; falls back to the unmodified start when the search
/// exhausts the radius cap.
pub fn find_open_position(start: Vec3, room_objects: &[Value], already_placed: &[Vec3]) -> Vec3 {
    let obstacles = extract_obstacles(room_objects);

    if preview_clear(&start, &obstacles, already_placed) {
        return start;
    }

    let mut radius = RING_STEP;
    while radius <= RING_MAX_RADIUS {
        for i in 0..RING_SAMPLES {
            let angle = (2.0 * std::f64::consts::PI * i as f64) / RING_SAMPLES as f64;
            let candidate = Vec3::new(
                start.x + radius * angle.cos(),
                0.0,
                start.z + radius * angle.sin(),
            );
            if preview_clear(&candidate, &obstacles, already_placed) {
                return candidate;
            }
        }
        radius += RING_STEP;
    }

    start
}

fn preview_clear(p: &Vec3, obstacles: &[Obstacle], already_placed: &[Vec3]) -> bool {
    let clear_of_objects = obstacles
        .iter()
        .all(|o| p.distance_xz(&o.center()) > o.radius() + PREVIEW_OBJECT_PADDING);
    let clear_of_agents = already_placed
        .iter()
        .all(|q| p.distance_xz(q) >= PREVIEW_MIN_SPACING);
    clear_of_objects && clear_of_agents
}
