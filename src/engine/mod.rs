use std::collections::VecDeque;

use crate::config::MatchConfig;
use crate::constants::MAX_PENDING_EVENTS;
use crate::error::{ConfigError, MatchError};
use crate::field::{build_safe_zones, Field, SafeZone};
use crate::rng::Rng;
use crate::types::{
    AgentView, DesiredRole, EndReason, FieldInit, Intent, MatchMode, MatchPhase, MatchSummary,
    PowerUpKind, PowerUpView, RankingEntry, Role, RuntimeEvent, Snapshot, TagRecord, Vec2,
};

mod agent;
mod ai;
mod interaction;
mod movement;
mod roles;

pub use self::agent::{Agent, EffectKind};
pub use self::roles::{compute_rankings, ordinal};

use self::movement::resolve_intent;

#[derive(Clone, Debug)]
pub(crate) struct PowerUp {
    id: u64,
    pos: Vec2,
    kind: PowerUpKind,
    radius: f32,
    duration_ms: u64,
    collected: bool,
}

impl PowerUp {
    fn to_view(&self) -> PowerUpView {
        PowerUpView {
            id: self.id,
            x: self.pos.x,
            y: self.pos.y,
            radius: self.radius,
            kind: self.kind,
            duration_ms: self.duration_ms,
            collected: self.collected,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MatchOptions {
    /// Steer the human agent with the AI policy instead of intent.
    pub human_autopilot: bool,
}

/// One tag match. Owns every piece of mutable game state; advanced by
/// [`MatchEngine::step`] from a single logical thread.
#[derive(Clone, Debug)]
pub struct MatchEngine {
    pub config: MatchConfig,
    field: Field,
    options: MatchOptions,
    seed: u32,

    rng: Rng,
    mode: MatchMode,
    phase: MatchPhase,
    human_index: usize,
    agents: Vec<Agent>,
    safe_zones: Vec<SafeZone>,
    power_ups: Vec<PowerUp>,
    tag_log: Vec<TagRecord>,
    events: VecDeque<RuntimeEvent>,
    intent: Intent,

    duration_secs: u64,
    time_left_secs: u64,
    clock_carry_ms: u64,
    elapsed_ms: u64,
    tick_counter: u64,
    last_tag_at: Option<u64>,
    tag_count: usize,
    next_power_up_at: u64,
    next_id_counter: u64,
    chaser_floor: usize,

    end_reason: Option<EndReason>,
    rankings: Option<Vec<RankingEntry>>,
}

impl MatchEngine {
    pub fn new(config: MatchConfig, seed: u32, options: MatchOptions) -> Result<Self, ConfigError> {
        config.validate()?;
        let field = Field::new(config.field_width, config.field_height);
        let human_index = config.agent_count.saturating_sub(1);
        Ok(Self {
            field,
            options,
            seed,
            rng: Rng::new(seed),
            mode: MatchMode::Single,
            phase: MatchPhase::Setup,
            human_index,
            agents: Vec::new(),
            safe_zones: Vec::new(),
            power_ups: Vec::new(),
            tag_log: Vec::new(),
            events: VecDeque::new(),
            intent: Intent::default(),
            duration_secs: config.single_duration_secs,
            time_left_secs: config.single_duration_secs,
            clock_carry_ms: 0,
            elapsed_ms: 0,
            tick_counter: 0,
            last_tag_at: None,
            tag_count: 0,
            next_power_up_at: 0,
            next_id_counter: 1,
            chaser_floor: 0,
            end_reason: None,
            rankings: None,
            config,
        })
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn is_ended(&self) -> bool {
        self.phase == MatchPhase::Ended
    }

    pub fn is_paused(&self) -> bool {
        self.phase == MatchPhase::Paused
    }

    pub fn human_index(&self) -> usize {
        self.human_index
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn time_left_secs(&self) -> u64 {
        self.time_left_secs
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn tag_log(&self) -> &[TagRecord] {
        &self.tag_log
    }

    pub fn rankings(&self) -> Option<&[RankingEntry]> {
        self.rankings.as_deref()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn chaser_count(&self) -> usize {
        self.agents.iter().filter(|agent| agent.is_chaser).count()
    }

    pub fn runner_count(&self) -> usize {
        self.agents.len() - self.chaser_count()
    }

    /// Sets up a fresh match and enters `Running`. Any previous match state
    /// is discarded.
    pub fn start_match(&mut self, mode: MatchMode, desired_role: DesiredRole) {
        self.mode = mode;
        self.phase = MatchPhase::Setup;
        self.agents.clear();
        self.power_ups.clear();
        self.tag_log.clear();
        self.safe_zones.clear();
        self.events.clear();
        self.intent = Intent::default();
        self.elapsed_ms = 0;
        self.tick_counter = 0;
        self.clock_carry_ms = 0;
        self.last_tag_at = None;
        self.tag_count = 0;
        self.end_reason = None;
        self.rankings = None;

        let count = self.config.agent_count;
        self.human_index = count.saturating_sub(1);
        for index in 0..count {
            let pos = self
                .field
                .random_position(&mut self.rng, self.config.spawn_margin);
            let mut agent = Agent::new(
                index,
                pos,
                self.config.agent_radius,
                self.config.agent_base_speed,
                index == self.human_index,
            );
            if !agent.human {
                agent.next_decision_at = self.next_decision_delay();
            }
            self.agents.push(agent);
        }

        let chaser_index = match self.assign_initial_chaser(desired_role) {
            Ok(index) => index,
            Err(error) => {
                tracing::error!(%error, seed = self.seed, "match setup failed");
                self.end_match(EndReason::Failure);
                return;
            }
        };
        self.chaser_floor = 1;

        self.safe_zones = build_safe_zones(&self.config);
        self.spawn_power_up();
        self.schedule_next_power_up();

        self.duration_secs = self.config.duration_secs(mode);
        self.time_left_secs = self.duration_secs;
        self.phase = MatchPhase::Running;

        tracing::info!(
            seed = self.seed,
            mode = ?mode,
            desired_role = ?desired_role,
            chaser = chaser_index,
            duration_secs = self.duration_secs,
            "match started"
        );
    }

    fn assign_initial_chaser(&mut self, desired_role: DesiredRole) -> Result<usize, MatchError> {
        let index = match desired_role {
            DesiredRole::Chaser => self.human_index,
            DesiredRole::Runner => {
                let ai_indices: Vec<usize> = (0..self.agents.len())
                    .filter(|index| *index != self.human_index)
                    .collect();
                let pick = self.rng.pick_index(ai_indices.len());
                *ai_indices.get(pick).ok_or(MatchError::NoChaserCandidate)?
            }
            DesiredRole::Random => self.rng.pick_index(self.agents.len()),
        };
        self.agent_mut(index)?.is_chaser = true;
        Ok(index)
    }

    pub fn set_intent(&mut self, intent: Intent) {
        self.intent = intent;
    }

    pub fn set_autopilot(&mut self, enabled: bool) {
        self.options.human_autopilot = enabled;
    }

    pub fn pause(&mut self) {
        if self.phase == MatchPhase::Running {
            self.phase = MatchPhase::Paused;
            self.push_event(RuntimeEvent::Paused);
        }
    }

    pub fn resume(&mut self) {
        if self.phase == MatchPhase::Paused {
            self.phase = MatchPhase::Running;
            self.push_event(RuntimeEvent::Resumed);
        }
    }

    pub fn quit(&mut self) {
        if matches!(self.phase, MatchPhase::Running | MatchPhase::Paused) {
            self.end_match(EndReason::Quit);
        }
    }

    /// Freezes every agent for the configured duration.
    pub fn freeze_all(&mut self) {
        if !matches!(self.phase, MatchPhase::Running | MatchPhase::Paused) {
            return;
        }
        let now_ms = self.elapsed_ms;
        let duration_ms = self.config.freeze_duration_ms;
        for agent in &mut self.agents {
            agent.apply_effect(EffectKind::Frozen, now_ms, duration_ms);
        }
        self.push_event(RuntimeEvent::Frozen {
            until_ms: now_ms + duration_ms,
        });
        tracing::debug!(until_ms = now_ms + duration_ms, "all agents frozen");
    }

    /// Advances the match by `dt_ms` of running time. A no-op unless running.
    pub fn step(&mut self, dt_ms: u64) {
        if self.phase != MatchPhase::Running {
            return;
        }
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        let now_ms = self.elapsed_ms;

        if let Err(error) = self.run_tick(dt_ms, now_ms) {
            tracing::error!(%error, tick = self.tick_counter, "match aborted");
            self.end_match(EndReason::Failure);
            return;
        }
        if self.phase == MatchPhase::Ended {
            return;
        }
        self.advance_clock(dt_ms);
    }

    fn run_tick(&mut self, dt_ms: u64, now_ms: u64) -> Result<(), MatchError> {
        for agent in &mut self.agents {
            agent.prune_effects(now_ms);
        }
        self.update_power_up_timer(now_ms);
        self.update_agents(dt_ms, now_ms)?;
        self.update_safe_zones(now_ms);
        self.resolve_collisions(now_ms)?;
        self.collect_power_ups(now_ms);
        self.check_invariants()?;
        self.check_win_condition();
        Ok(())
    }

    fn update_agents(&mut self, dt_ms: u64, now_ms: u64) -> Result<(), MatchError> {
        for idx in 0..self.agents.len() {
            if !self.agents[idx].human {
                self.update_decision_cadence(idx, now_ms);
            }
            if self.agents[idx].has_effect(EffectKind::Frozen, now_ms) {
                continue;
            }
            if self.agents[idx].human && !self.options.human_autopilot {
                self.move_human(idx, dt_ms, now_ms)?;
            } else {
                self.steer_ai(idx, dt_ms, now_ms)?;
            }
        }
        Ok(())
    }

    fn move_human(&mut self, idx: usize, dt_ms: u64, now_ms: u64) -> Result<(), MatchError> {
        let boost = self.config.speed_boost_multiplier;
        let field = self.field;
        let intent = self.intent;
        if intent.is_idle() {
            return Ok(());
        }
        let agent = self.agent_mut(idx)?;
        let speed = agent.effective_speed(now_ms, boost);
        agent.pos = resolve_intent(agent.pos, intent, speed, dt_ms, agent.radius, &field);
        Ok(())
    }

    fn check_invariants(&self) -> Result<(), MatchError> {
        let found = self.chaser_count();
        match self.mode {
            MatchMode::Single if found != 1 => Err(MatchError::ChaserCount { found }),
            MatchMode::Multi if found < self.chaser_floor => Err(MatchError::ChaserCountDecreased {
                before: self.chaser_floor,
                after: found,
            }),
            _ => Ok(()),
        }
    }

    fn advance_clock(&mut self, dt_ms: u64) {
        self.clock_carry_ms += dt_ms;
        while self.clock_carry_ms >= 1_000 && self.time_left_secs > 0 {
            self.clock_carry_ms -= 1_000;
            self.time_left_secs -= 1;
        }
        if self.time_left_secs == 0 {
            self.end_match(EndReason::TimeUp);
        }
    }

    /// Stops the match and freezes the final standings. Idempotent.
    pub fn end_match(&mut self, reason: EndReason) {
        if self.phase == MatchPhase::Ended {
            return;
        }
        self.phase = MatchPhase::Ended;
        self.end_reason = Some(reason);
        self.rankings = match self.mode {
            MatchMode::Multi => Some(compute_rankings(&self.agents, &self.tag_log)),
            MatchMode::Single => None,
        };
        self.push_event(RuntimeEvent::MatchEnded { reason });
        tracing::info!(
            reason = ?reason,
            elapsed_ms = self.elapsed_ms,
            tags = self.tag_count,
            "match ended"
        );
    }

    /// Queues an event for the next draining snapshot, dropping the oldest
    /// once `MAX_PENDING_EVENTS` are waiting.
    pub(crate) fn push_event(&mut self, event: RuntimeEvent) {
        if self.events.len() >= MAX_PENDING_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub(crate) fn agent_mut(&mut self, index: usize) -> Result<&mut Agent, MatchError> {
        let count = self.agents.len();
        self.agents
            .get_mut(index)
            .ok_or(MatchError::AgentOutOfRange { index, count })
    }

    fn make_id(&mut self) -> u64 {
        let id = self.next_id_counter;
        self.next_id_counter += 1;
        id
    }

    fn human_role(&self) -> Role {
        match self.agents.get(self.human_index) {
            Some(agent) if agent.is_chaser => Role::Chaser,
            _ => Role::Runner,
        }
    }

    /// Whole seconds the human may still stay in its current safe zone.
    fn human_safe_secs_left(&self) -> Option<u64> {
        let human = self.agents.get(self.human_index)?;
        let entered_at = human.safe_zone_entered_at?;
        let dwell_ms = self.elapsed_ms.saturating_sub(entered_at);
        let limit_secs = self.config.safe_zones.max_dwell_ms / 1_000;
        Some(limit_secs.saturating_sub(dwell_ms / 1_000))
    }

    pub fn field_init(&self) -> FieldInit {
        FieldInit {
            width: self.field.width,
            height: self.field.height,
            human_index: self.human_index,
            safe_zones: self.safe_zones.iter().map(SafeZone::to_view).collect(),
        }
    }

    pub fn agent_views(&self) -> Vec<AgentView> {
        self.agents
            .iter()
            .map(|agent| agent.to_view(self.elapsed_ms))
            .collect()
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let snapshot = Snapshot {
            tick: self.tick_counter,
            elapsed_ms: self.elapsed_ms,
            time_left_secs: self.time_left_secs,
            mode: self.mode,
            phase: self.phase,
            paused: self.is_paused(),
            human_role: self.human_role(),
            runners_left: self.runner_count(),
            human_safe_secs_left: self.human_safe_secs_left(),
            agents: self.agent_views(),
            safe_zones: self.safe_zones.iter().map(SafeZone::to_view).collect(),
            power_ups: self.power_ups.iter().map(PowerUp::to_view).collect(),
            events: if include_events {
                self.events.drain(..).collect()
            } else {
                Vec::new()
            },
        };
        snapshot
    }

    /// Final report, available once the match has ended.
    pub fn build_summary(&self) -> Option<MatchSummary> {
        let reason = self.end_reason?;
        Some(MatchSummary {
            mode: self.mode,
            reason,
            elapsed_ms: self.elapsed_ms,
            tag_count: self.tag_count,
            tags: self.tag_log.clone(),
            rankings: self.rankings.clone(),
            human_outcome: self.human_outcome(),
        })
    }
}
