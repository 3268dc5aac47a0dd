use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Single,
    Multi,
}

impl MatchMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "single" => Some(Self::Single),
            "multi" => Some(Self::Multi),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Single => "Single Chaser",
            Self::Multi => "Multi-Chaser",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesiredRole {
    Chaser,
    Runner,
    Random,
}

impl DesiredRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "chaser" => Some(Self::Chaser),
            "runner" => Some(Self::Runner),
            "random" => Some(Self::Random),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Chaser,
    Runner,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    Setup,
    Running,
    Paused,
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    TimeUp,
    AllTagged,
    Quit,
    Failure,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    Speed,
    Invincible,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RankStatus {
    Winner,
    Tagged,
}

/// Held-state directional intent for the human agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Intent {
    pub fn is_idle(&self) -> bool {
        !(self.up || self.down || self.left || self.right)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AgentView {
    pub index: usize,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub human: bool,
    #[serde(rename = "isChaser")]
    pub is_chaser: bool,
    #[serde(rename = "inSafeZone")]
    pub in_safe_zone: bool,
    #[serde(rename = "safeZoneEnteredAt")]
    pub safe_zone_entered_at: Option<u64>,
    #[serde(rename = "hasSpeedBoost")]
    pub has_speed_boost: bool,
    #[serde(rename = "isInvincible")]
    pub is_invincible: bool,
    pub frozen: bool,
    #[serde(rename = "tagBackGuard")]
    pub tag_back_guard: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct SafeZoneView {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub occupants: Vec<usize>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PowerUpView {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    #[serde(rename = "type")]
    pub kind: PowerUpKind,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub collected: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TagRecord {
    #[serde(rename = "taggedIndex")]
    pub tagged_index: usize,
    #[serde(rename = "atMs")]
    pub at_ms: u64,
    #[serde(rename = "taggerIndex")]
    pub tagger_index: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct FieldInit {
    pub width: f32,
    pub height: f32,
    #[serde(rename = "humanIndex")]
    pub human_index: usize,
    #[serde(rename = "safeZones")]
    pub safe_zones: Vec<SafeZoneView>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    Tagged {
        tagger: usize,
        tagged: usize,
        #[serde(rename = "atMs")]
        at_ms: u64,
    },
    PowerUpSpawned {
        id: u64,
        kind: PowerUpKind,
    },
    PowerUpTaken {
        id: u64,
        kind: PowerUpKind,
        by: Vec<usize>,
    },
    Ejected {
        agent: usize,
        zone: usize,
    },
    Frozen {
        #[serde(rename = "untilMs")]
        until_ms: u64,
    },
    Paused,
    Resumed,
    MatchEnded {
        reason: EndReason,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    #[serde(rename = "timeLeftSecs")]
    pub time_left_secs: u64,
    pub mode: MatchMode,
    pub phase: MatchPhase,
    pub paused: bool,
    #[serde(rename = "humanRole")]
    pub human_role: Role,
    #[serde(rename = "runnersLeft")]
    pub runners_left: usize,
    #[serde(rename = "humanSafeSecsLeft")]
    pub human_safe_secs_left: Option<u64>,
    pub agents: Vec<AgentView>,
    #[serde(rename = "safeZones")]
    pub safe_zones: Vec<SafeZoneView>,
    #[serde(rename = "powerUps")]
    pub power_ups: Vec<PowerUpView>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankingEntry {
    pub rank: usize,
    #[serde(rename = "agentIndex")]
    pub agent_index: usize,
    pub name: String,
    pub status: RankStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HumanOutcome {
    FinalChaser,
    Survived,
    Placed { rank: usize, ordinal: String },
    Quit,
    Failed,
    Undecided,
}

#[derive(Clone, Debug, Serialize)]
pub struct MatchSummary {
    pub mode: MatchMode,
    pub reason: EndReason,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    #[serde(rename = "tagCount")]
    pub tag_count: usize,
    pub tags: Vec<TagRecord>,
    pub rankings: Option<Vec<RankingEntry>>,
    #[serde(rename = "humanOutcome")]
    pub human_outcome: HumanOutcome,
}
