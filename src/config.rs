use std::path::Path;

use serde::Deserialize;

use crate::constants::{
    get_match_duration_secs, AGENT_BASE_SPEED, AGENT_COUNT, AGENT_RADIUS, AI_DECISION_MAX_MS,
    AI_DECISION_MIN_MS, AI_FLEE_RADIUS, AI_WANDER_SPEED_FACTOR, AI_WAYPOINT_REACHED,
    FIELD_HEIGHT, FIELD_WIDTH, FREEZE_DURATION_MS, INVINCIBLE_DURATION_MS, POWER_UP_MAX_ACTIVE,
    POWER_UP_RADIUS, POWER_UP_SPAWN_MARGIN, POWER_UP_SPAWN_MAX_MS, POWER_UP_SPAWN_MIN_MS,
    SAFE_ZONE_COUNT, SAFE_ZONE_FAR_MARGIN, SAFE_ZONE_INSET, SAFE_ZONE_MAX_DWELL_MS,
    SAFE_ZONE_SIZE, SPAWN_MARGIN, SPEED_BOOST_DURATION_MS, SPEED_BOOST_MULTIPLIER,
    TAG_BACK_GUARD_MS, TAG_COOLDOWN_MS,
};
use crate::error::ConfigError;
use crate::field::build_safe_zones;
use crate::types::{MatchMode, PowerUpKind};

/// Tunables for one match. Every field falls back to the stock game value.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub field_width: f32,
    pub field_height: f32,
    pub spawn_margin: f32,
    pub agent_count: usize,
    pub agent_radius: f32,
    pub agent_base_speed: f32,
    pub speed_boost_multiplier: f32,
    pub tag_cooldown_ms: u64,
    pub tag_back_guard_ms: u64,
    pub freeze_duration_ms: u64,
    pub safe_zones: SafeZoneConfig,
    pub power_ups: PowerUpConfig,
    pub ai: AiConfig,
    pub single_duration_secs: u64,
    pub multi_duration_secs: u64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            field_width: FIELD_WIDTH,
            field_height: FIELD_HEIGHT,
            spawn_margin: SPAWN_MARGIN,
            agent_count: AGENT_COUNT,
            agent_radius: AGENT_RADIUS,
            agent_base_speed: AGENT_BASE_SPEED,
            speed_boost_multiplier: SPEED_BOOST_MULTIPLIER,
            tag_cooldown_ms: TAG_COOLDOWN_MS,
            tag_back_guard_ms: TAG_BACK_GUARD_MS,
            freeze_duration_ms: FREEZE_DURATION_MS,
            safe_zones: SafeZoneConfig::default(),
            power_ups: PowerUpConfig::default(),
            ai: AiConfig::default(),
            single_duration_secs: get_match_duration_secs(MatchMode::Single),
            multi_duration_secs: get_match_duration_secs(MatchMode::Multi),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SafeZoneConfig {
    pub count: usize,
    pub size: f32,
    pub inset: f32,
    pub far_margin: f32,
    pub max_dwell_ms: u64,
}

impl Default for SafeZoneConfig {
    fn default() -> Self {
        Self {
            count: SAFE_ZONE_COUNT,
            size: SAFE_ZONE_SIZE,
            inset: SAFE_ZONE_INSET,
            far_margin: SAFE_ZONE_FAR_MARGIN,
            max_dwell_ms: SAFE_ZONE_MAX_DWELL_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PowerUpConfig {
    pub radius: f32,
    pub max_active: usize,
    pub spawn_min_ms: u64,
    pub spawn_max_ms: u64,
    pub spawn_margin: f32,
    pub speed_duration_ms: u64,
    pub invincible_duration_ms: u64,
}

impl Default for PowerUpConfig {
    fn default() -> Self {
        Self {
            radius: POWER_UP_RADIUS,
            max_active: POWER_UP_MAX_ACTIVE,
            spawn_min_ms: POWER_UP_SPAWN_MIN_MS,
            spawn_max_ms: POWER_UP_SPAWN_MAX_MS,
            spawn_margin: POWER_UP_SPAWN_MARGIN,
            speed_duration_ms: SPEED_BOOST_DURATION_MS,
            invincible_duration_ms: INVINCIBLE_DURATION_MS,
        }
    }
}

impl PowerUpConfig {
    pub fn duration_ms(&self, kind: PowerUpKind) -> u64 {
        match kind {
            PowerUpKind::Speed => self.speed_duration_ms,
            PowerUpKind::Invincible => self.invincible_duration_ms,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub decision_min_ms: u64,
    pub decision_max_ms: u64,
    pub flee_radius: f32,
    pub waypoint_reached: f32,
    pub wander_speed_factor: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            decision_min_ms: AI_DECISION_MIN_MS,
            decision_max_ms: AI_DECISION_MAX_MS,
            flee_radius: AI_FLEE_RADIUS,
            waypoint_reached: AI_WAYPOINT_REACHED,
            wander_speed_factor: AI_WANDER_SPEED_FACTOR,
        }
    }
}

impl MatchConfig {
    pub fn duration_secs(&self, mode: MatchMode) -> u64 {
        match mode {
            MatchMode::Single => self.single_duration_secs,
            MatchMode::Multi => self.multi_duration_secs,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.field_width > 0.0 && self.field_height > 0.0) {
            return Err(invalid("field dimensions must be > 0"));
        }
        if self.agent_count < 2 {
            return Err(invalid("agent_count must be >= 2"));
        }
        if !(self.agent_radius > 0.0) || !(self.agent_base_speed >= 0.0) {
            return Err(invalid("agent_radius must be > 0 and agent_base_speed >= 0"));
        }
        if self.spawn_margin < self.agent_radius
            || self.field_width <= 2.0 * self.spawn_margin
            || self.field_height <= 2.0 * self.spawn_margin
        {
            return Err(invalid("spawn_margin must cover the agent radius and fit the field"));
        }
        if self.power_ups.spawn_max_ms < self.power_ups.spawn_min_ms {
            return Err(invalid("power_ups.spawn_max_ms must be >= spawn_min_ms"));
        }
        if self.power_ups.max_active == 0 {
            return Err(invalid("power_ups.max_active must be > 0"));
        }
        if self.ai.decision_max_ms < self.ai.decision_min_ms {
            return Err(invalid("ai.decision_max_ms must be >= decision_min_ms"));
        }
        if self.single_duration_secs == 0 || self.multi_duration_secs == 0 {
            return Err(invalid("match durations must be > 0"));
        }

        // An ejected agent lands one radius past the zone edge. That point must
        // stay inside the field and outside every other zone.
        let clearance = 2.0 * self.agent_radius;
        let zones = build_safe_zones(self);
        for (index, zone) in zones.iter().enumerate() {
            if zone.x < clearance
                || zone.y < clearance
                || zone.x + zone.width + clearance > self.field_width
                || zone.y + zone.height + clearance > self.field_height
            {
                return Err(invalid(&format!(
                    "safe zone {index} leaves no room to eject an agent inside the field"
                )));
            }
        }
        for (a_index, a) in zones.iter().enumerate() {
            for (b_index, b) in zones.iter().enumerate().skip(a_index + 1) {
                let apart = a.x + a.width + clearance < b.x
                    || b.x + b.width + clearance < a.x
                    || a.y + a.height + clearance < b.y
                    || b.y + b.height + clearance < a.y;
                if !apart {
                    return Err(invalid(&format!(
                        "safe zones {a_index} and {b_index} are too close to eject between"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

/// Host configuration for the live server, loaded from `tag-arena.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub static_dir: Option<String>,
    #[serde(rename = "match")]
    pub match_config: MatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            static_dir: None,
            match_config: MatchConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str::<ServerConfig>(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Loads `TAG_ARENA_CONFIG` (default `tag-arena.toml`) if present, then
    /// applies `PORT` and `STATIC_DIR` overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("TAG_ARENA_CONFIG").unwrap_or_else(|_| "tag-arena.toml".into());
        let path = Path::new(&path);
        let mut config = if path.is_file() {
            let config = Self::from_file(path)?;
            tracing::info!(path = %path.display(), "loaded configuration");
            config
        } else {
            tracing::info!(path = %path.display(), "no config file found, using defaults");
            Self::default()
        };

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.listen_addr = format!("0.0.0.0:{port}");
            }
        }
        if let Ok(dir) = std::env::var("STATIC_DIR") {
            if !dir.is_empty() {
                config.static_dir = Some(dir);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(invalid("listen_addr is not a valid socket address"));
        }
        self.match_config.validate()
    }
}
