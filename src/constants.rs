use crate::types::MatchMode;

pub const AGENT_COUNT: usize = 8;
pub const HUMAN_INDEX: usize = AGENT_COUNT - 1;

pub const TICK_RATE: u32 = 60;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;
/// Speeds are expressed in units per nominal 60 Hz frame.
pub const NOMINAL_FRAME_MS: f32 = 16.67;

pub const FIELD_WIDTH: f32 = 800.0;
pub const FIELD_HEIGHT: f32 = 600.0;
pub const SPAWN_MARGIN: f32 = 50.0;

pub const AGENT_RADIUS: f32 = 20.0;
pub const AGENT_BASE_SPEED: f32 = 3.0;
pub const SPEED_BOOST_MULTIPLIER: f32 = 1.5;

pub const TAG_COOLDOWN_MS: u64 = 1_000;
pub const TAG_BACK_GUARD_MS: u64 = 1_500;
pub const FREEZE_DURATION_MS: u64 = 2_000;

/// Runtime events kept for the next draining snapshot.
pub const MAX_PENDING_EVENTS: usize = 256;

pub const SAFE_ZONE_COUNT: usize = 4;
pub const SAFE_ZONE_SIZE: f32 = 80.0;
pub const SAFE_ZONE_INSET: f32 = 100.0;
pub const SAFE_ZONE_FAR_MARGIN: f32 = 250.0;
pub const SAFE_ZONE_MAX_DWELL_MS: u64 = 3_000;

pub const POWER_UP_RADIUS: f32 = 10.0;
pub const POWER_UP_MAX_ACTIVE: usize = 2;
pub const POWER_UP_SPAWN_MIN_MS: u64 = 10_000;
pub const POWER_UP_SPAWN_MAX_MS: u64 = 25_000;
pub const POWER_UP_SPAWN_MARGIN: f32 = 50.0;
pub const SPEED_BOOST_DURATION_MS: u64 = 5_000;
pub const INVINCIBLE_DURATION_MS: u64 = 3_000;

pub const AI_DECISION_MIN_MS: u64 = 500;
pub const AI_DECISION_MAX_MS: u64 = 1_500;
pub const AI_FLEE_RADIUS: f32 = 150.0;
pub const AI_WAYPOINT_REACHED: f32 = 20.0;
pub const AI_WANDER_SPEED_FACTOR: f32 = 0.5;

pub const SINGLE_MATCH_SECS: u64 = 180;
pub const MULTI_MATCH_SECS: u64 = 300;

pub fn get_match_duration_secs(mode: MatchMode) -> u64 {
    match mode {
        MatchMode::Single => SINGLE_MATCH_SECS,
        MatchMode::Multi => MULTI_MATCH_SECS,
    }
}
