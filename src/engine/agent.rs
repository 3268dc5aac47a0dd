use std::collections::BTreeMap;

use crate::types::{AgentView, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum EffectKind {
    SpeedBoost,
    Invincible,
    Frozen,
    /// Set on a demoted single-mode chaser; blocks being tagged straight back.
    TagBackGuard,
}

#[derive(Clone, Debug)]
pub struct Agent {
    pub index: usize,
    pub pos: Vec2,
    pub radius: f32,
    pub base_speed: f32,
    pub human: bool,
    pub is_chaser: bool,
    pub safe_zone: Option<usize>,
    pub safe_zone_entered_at: Option<u64>,
    pub waypoint: Option<Vec2>,
    pub last_decision_at: u64,
    pub next_decision_at: u64,
    effects: BTreeMap<EffectKind, u64>,
}

impl Agent {
    pub fn new(index: usize, pos: Vec2, radius: f32, base_speed: f32, human: bool) -> Self {
        Self {
            index,
            pos,
            radius,
            base_speed,
            human,
            is_chaser: false,
            safe_zone: None,
            safe_zone_entered_at: None,
            waypoint: None,
            last_decision_at: 0,
            next_decision_at: 0,
            effects: BTreeMap::new(),
        }
    }

    /// Starts (or restarts) an effect lasting `duration_ms` from `now_ms`.
    pub fn apply_effect(&mut self, kind: EffectKind, now_ms: u64, duration_ms: u64) {
        self.effects.insert(kind, now_ms.saturating_add(duration_ms));
    }

    pub fn has_effect(&self, kind: EffectKind, now_ms: u64) -> bool {
        self.effects
            .get(&kind)
            .is_some_and(|expires_at| now_ms < *expires_at)
    }

    pub fn clear_effect(&mut self, kind: EffectKind) {
        self.effects.remove(&kind);
    }

    pub fn prune_effects(&mut self, now_ms: u64) {
        self.effects.retain(|_, expires_at| now_ms < *expires_at);
    }

    pub fn in_safe_zone(&self) -> bool {
        self.safe_zone.is_some()
    }

    pub fn leave_safe_zone(&mut self) {
        self.safe_zone = None;
        self.safe_zone_entered_at = None;
    }

    pub fn effective_speed(&self, now_ms: u64, boost_multiplier: f32) -> f32 {
        if self.has_effect(EffectKind::SpeedBoost, now_ms) {
            self.base_speed * boost_multiplier
        } else {
            self.base_speed
        }
    }

    /// Whether a chaser touching this agent may tag it right now.
    pub fn is_taggable(&self, now_ms: u64) -> bool {
        !self.is_chaser
            && !self.in_safe_zone()
            && !self.has_effect(EffectKind::Invincible, now_ms)
            && !self.has_effect(EffectKind::TagBackGuard, now_ms)
    }

    pub fn display_name(&self) -> String {
        if self.human {
            "You".to_string()
        } else {
            format!("Player {}", self.index + 1)
        }
    }

    pub fn to_view(&self, now_ms: u64) -> AgentView {
        AgentView {
            index: self.index,
            name: self.display_name(),
            x: self.pos.x,
            y: self.pos.y,
            radius: self.radius,
            human: self.human,
            is_chaser: self.is_chaser,
            in_safe_zone: self.in_safe_zone(),
            safe_zone_entered_at: self.safe_zone_entered_at,
            has_speed_boost: self.has_effect(EffectKind::SpeedBoost, now_ms),
            is_invincible: self.has_effect(EffectKind::Invincible, now_ms),
            frozen: self.has_effect(EffectKind::Frozen, now_ms),
            tag_back_guard: self.has_effect(EffectKind::TagBackGuard, now_ms),
        }
    }
}
