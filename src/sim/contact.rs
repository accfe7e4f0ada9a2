//! Contact queries for round tiles in a walled field
//!
//! The core runs these every tick instead of waiting on physics callbacks, so
//! contact order is stable: pairs come out sorted by tile id.

use glam::Vec2;

use super::tile::Tile;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Surface normal at collision (pointing toward the tile being pushed)
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check overlap between two circles.
///
/// The normal points from `a` to `b`. Coincident centers get an upward normal
/// so callers always have a direction to separate along.
pub fn circle_circle_collision(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> CollisionResult {
    let delta = b_pos - a_pos;
    let dist = delta.length();
    let penetration = a_radius + b_radius - dist;
    if penetration <= 0.0 {
        return CollisionResult::miss();
    }

    let normal = if dist > f32::EPSILON { delta / dist } else { Vec2::Y };
    CollisionResult {
        hit: true,
        normal,
        penetration,
    }
}

/// Whether two circles are within `margin` of touching
#[inline]
pub fn circles_touch(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32, margin: f32) -> bool {
    a_pos.distance(b_pos) <= a_radius + b_radius + margin
}

/// Check a tile against the side walls and floor.
///
/// Returns the deepest violation; the normal points back into the field.
pub fn tile_bounds_collision(pos: Vec2, radius: f32, left: f32, right: f32, floor: f32) -> CollisionResult {
    let candidates = [
        (left + radius - pos.x, Vec2::X),
        (pos.x + radius - right, Vec2::NEG_X),
        (floor + radius - pos.y, Vec2::Y),
    ];

    candidates
        .into_iter()
        .filter(|(penetration, _)| *penetration > 0.0)
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(penetration, normal)| CollisionResult {
            hit: true,
            normal,
            penetration,
        })
        .unwrap_or_else(CollisionResult::miss)
}

/// Whether a tile overlaps the horizontal game-over line
#[inline]
pub fn touches_line(pos: Vec2, radius: f32, line_y: f32) -> bool {
    (pos.y - line_y).abs() <= radius
}

/// Touching pairs of simulated tiles, as index pairs `(i, j)` with `i < j`.
///
/// `tiles` must be sorted by id; the lower id of each pair is the tile that
/// registers the contact first.
pub fn find_contacts(tiles: &[Tile], margin: f32) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (i, a) in tiles.iter().enumerate() {
        if a.is_held() {
            continue;
        }
        for (j, b) in tiles.iter().enumerate().skip(i + 1) {
            if b.is_held() {
                continue;
            }
            if circles_touch(a.pos, a.radius, b.pos, b.radius, margin) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// Borrow two distinct tiles mutably (`i < j`)
pub fn pair_mut(tiles: &mut [Tile], i: usize, j: usize) -> (&mut Tile, &mut Tile) {
    debug_assert!(i < j, "pair_mut requires i < j");
    let (head, tail) = tiles.split_at_mut(j);
    (&mut head[i], &mut tail[0])
}

/// Reflect velocity off a surface, keeping `restitution` of the normal component
pub fn reflect_velocity(velocity: Vec2, normal: Vec2, restitution: f32) -> Vec2 {
    let vn = velocity.dot(normal);
    if vn >= 0.0 {
        return velocity;
    }
    velocity - (1.0 + restitution) * vn * normal
}
