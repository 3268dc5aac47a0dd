use crate::constants::NOMINAL_FRAME_MS;
use crate::field::Field;
use crate::types::{Intent, Vec2};

/// Distance covered at `speed` (units per nominal frame) over `dt_ms`.
pub(crate) fn frame_scaled(speed: f32, dt_ms: u64) -> f32 {
    speed * dt_ms as f32 / NOMINAL_FRAME_MS
}

/// Applies held directions independently per axis, then clamps to the field.
pub(crate) fn resolve_intent(
    pos: Vec2,
    intent: Intent,
    speed: f32,
    dt_ms: u64,
    radius: f32,
    field: &Field,
) -> Vec2 {
    let step = frame_scaled(speed, dt_ms);
    let mut next = pos;
    if intent.up {
        next.y -= step;
    }
    if intent.down {
        next.y += step;
    }
    if intent.left {
        next.x -= step;
    }
    if intent.right {
        next.x += step;
    }
    field.clamp(next, radius)
}

/// Moves along the unit vector toward `target`. Returns `None` when the
/// target coincides with `pos`.
pub(crate) fn resolve_toward(
    pos: Vec2,
    target: Vec2,
    speed: f32,
    dt_ms: u64,
    radius: f32,
    field: &Field,
) -> Option<Vec2> {
    let dx = target.x - pos.x;
    let dy = target.y - pos.y;
    let distance = (dx * dx + dy * dy).sqrt();
    if distance <= 0.0 {
        return None;
    }
    let step = frame_scaled(speed, dt_ms);
    let next = Vec2::new(pos.x + dx / distance * step, pos.y + dy / distance * step);
    Some(field.clamp(next, radius))
}

/// Moves directly away from `threat`. Returns `None` on zero distance.
pub(crate) fn resolve_away(
    pos: Vec2,
    threat: Vec2,
    speed: f32,
    dt_ms: u64,
    radius: f32,
    field: &Field,
) -> Option<Vec2> {
    let mirrored = Vec2::new(2.0 * pos.x - threat.x, 2.0 * pos.y - threat.y);
    resolve_toward(pos, mirrored, speed, dt_ms, radius, field)
}
