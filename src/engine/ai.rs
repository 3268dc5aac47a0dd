use super::*;

use super::movement::{resolve_away, resolve_toward};

impl MatchEngine {
    pub(super) fn next_decision_delay(&mut self) -> u64 {
        self.rng
            .range_ms(self.config.ai.decision_min_ms, self.config.ai.decision_max_ms)
    }

    /// Decision timestamps are bookkeeping only; steering runs every tick.
    pub(super) fn update_decision_cadence(&mut self, idx: usize, now_ms: u64) {
        if now_ms < self.agents[idx].next_decision_at {
            return;
        }
        let delay = self.next_decision_delay();
        let agent = &mut self.agents[idx];
        agent.last_decision_at = now_ms;
        agent.next_decision_at = now_ms.saturating_add(delay);
    }

    pub(super) fn steer_ai(&mut self, idx: usize, dt_ms: u64, now_ms: u64) -> Result<(), MatchError> {
        let is_chaser = self.agent_mut(idx)?.is_chaser;
        let next = if is_chaser {
            self.chase_step(idx, dt_ms, now_ms)
        } else {
            self.runner_step(idx, dt_ms, now_ms)
        };
        if let Some(pos) = next {
            self.agent_mut(idx)?.pos = pos;
        }
        Ok(())
    }

    /// Nearest agent a chaser may pursue. Ties go to the lowest index.
    pub(super) fn find_chase_target(&self, idx: usize, now_ms: u64) -> Option<usize> {
        let from = self.agents[idx].pos;
        let mut best: Option<(usize, f32)> = None;
        for (other_idx, other) in self.agents.iter().enumerate() {
            if other_idx == idx
                || other.is_chaser
                || other.in_safe_zone()
                || other.has_effect(EffectKind::Invincible, now_ms)
            {
                continue;
            }
            let distance = from.distance(other.pos);
            if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                best = Some((other_idx, distance));
            }
        }
        best.map(|(other_idx, _)| other_idx)
    }

    pub(super) fn find_nearest_chaser(&self, idx: usize) -> Option<(usize, f32)> {
        let from = self.agents[idx].pos;
        let mut best: Option<(usize, f32)> = None;
        for (other_idx, other) in self.agents.iter().enumerate() {
            if other_idx == idx || !other.is_chaser {
                continue;
            }
            let distance = from.distance(other.pos);
            if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                best = Some((other_idx, distance));
            }
        }
        best
    }

    fn chase_step(&mut self, idx: usize, dt_ms: u64, now_ms: u64) -> Option<Vec2> {
        let target_idx = self.find_chase_target(idx, now_ms)?;
        let target = self.agents[target_idx].pos;
        let agent = &self.agents[idx];
        let speed = agent.effective_speed(now_ms, self.config.speed_boost_multiplier);
        resolve_toward(agent.pos, target, speed, dt_ms, agent.radius, &self.field)
    }

    fn runner_step(&mut self, idx: usize, dt_ms: u64, now_ms: u64) -> Option<Vec2> {
        let (chaser_idx, distance) = self.find_nearest_chaser(idx)?;
        let speed = self.agents[idx].effective_speed(now_ms, self.config.speed_boost_multiplier);
        let radius = self.agents[idx].radius;
        let pos = self.agents[idx].pos;

        if distance < self.config.ai.flee_radius {
            let threat = self.agents[chaser_idx].pos;
            return resolve_away(pos, threat, speed, dt_ms, radius, &self.field);
        }

        let reached = self.config.ai.waypoint_reached;
        let waypoint = match self.agents[idx].waypoint {
            Some(waypoint) if pos.distance(waypoint) >= reached => waypoint,
            _ => {
                let waypoint = self
                    .field
                    .random_position(&mut self.rng, self.config.spawn_margin);
                self.agents[idx].waypoint = Some(waypoint);
                waypoint
            }
        };
        let wander_speed = speed * self.config.ai.wander_speed_factor;
        resolve_toward(pos, waypoint, wander_speed, dt_ms, radius, &self.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TICK_MS;
    use crate::engine::movement::frame_scaled;
    use crate::engine::tests::{park_agents, started};

    /// Human is the only chaser; AI agents are placed explicitly.
    fn arena() -> MatchEngine {
        let mut engine = started(MatchMode::Single, DesiredRole::Chaser, 51);
        park_agents(&mut engine);
        engine
    }

    #[test]
    fn chaser_targets_nearest_eligible_runner() {
        let mut engine = arena();
        engine.agents[7].pos = Vec2::new(400.0, 300.0);
        engine.agents[0].pos = Vec2::new(400.0, 330.0);
        engine.agents[1].pos = Vec2::new(400.0, 270.0);
        engine.agents[2].pos = Vec2::new(700.0, 500.0);
        assert_eq!(engine.find_chase_target(7, 0), Some(0));

        engine.agents[0].apply_effect(EffectKind::Invincible, 0, 3_000);
        assert_eq!(engine.find_chase_target(7, 0), Some(1));

        engine.agents[1].safe_zone = Some(0);
        let target = engine.find_chase_target(7, 0);
        assert_ne!(target, Some(0));
        assert_ne!(target, Some(1));
    }

    #[test]
    fn chaser_without_targets_stays_put() {
        let mut engine = arena();
        engine.agents[7].is_chaser = false;
        engine.agents[0].is_chaser = true;
        for agent in &mut engine.agents {
            if agent.index != 0 {
                agent.apply_effect(EffectKind::Invincible, 0, 10_000);
            }
        }
        let before = engine.agents[0].pos;
        engine.steer_ai(0, TICK_MS, 0).expect("valid index");
        assert_eq!(engine.agents[0].pos, before);
    }

    #[test]
    fn ai_chaser_closes_distance() {
        let mut engine = arena();
        engine.agents[7].is_chaser = false;
        engine.agents[3].is_chaser = true;
        engine.agents[3].pos = Vec2::new(100.0, 300.0);
        engine.agents[0].pos = Vec2::new(200.0, 300.0);
        engine.steer_ai(3, TICK_MS, 0).expect("valid index");
        let expected = 100.0 + frame_scaled(3.0, TICK_MS);
        assert!((engine.agents[3].pos.x - expected).abs() < 1e-3);
        assert!((engine.agents[3].pos.y - 300.0).abs() < 1e-3);
    }

    #[test]
    fn runner_flees_a_close_chaser() {
        let mut engine = arena();
        engine.agents[7].pos = Vec2::new(400.0, 300.0);
        engine.agents[0].pos = Vec2::new(500.0, 300.0);
        assert_eq!(engine.find_nearest_chaser(0), Some((7, 100.0)));
        engine.steer_ai(0, TICK_MS, 0).expect("valid index");
        let expected = 500.0 + frame_scaled(3.0, TICK_MS);
        assert!((engine.agents[0].pos.x - expected).abs() < 1e-3);
        assert!(engine.agents[0].waypoint.is_none());
    }

    #[test]
    fn runner_on_top_of_chaser_does_not_move() {
        let mut engine = arena();
        engine.agents[7].pos = Vec2::new(400.0, 300.0);
        engine.agents[0].pos = Vec2::new(400.0, 300.0);
        engine.steer_ai(0, TICK_MS, 0).expect("valid index");
        assert_eq!(engine.agents[0].pos, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn distant_runner_wanders_at_half_speed() {
        let mut engine = arena();
        engine.agents[7].pos = Vec2::new(700.0, 500.0);
        engine.agents[0].pos = Vec2::new(100.0, 100.0);
        engine.steer_ai(0, TICK_MS, 0).expect("valid index");

        let waypoint = engine.agents[0].waypoint.expect("waypoint chosen");
        assert!((50.0..750.0).contains(&waypoint.x));
        assert!((50.0..550.0).contains(&waypoint.y));
        let moved = engine.agents[0].pos.distance(Vec2::new(100.0, 100.0));
        assert!(moved <= frame_scaled(1.5, TICK_MS) + 1e-3);

        // Kept until reached.
        engine.agents[0].waypoint = Some(Vec2::new(400.0, 400.0));
        engine.steer_ai(0, TICK_MS, 0).expect("valid index");
        assert_eq!(engine.agents[0].waypoint, Some(Vec2::new(400.0, 400.0)));
    }

    #[test]
    fn runner_replaces_a_reached_waypoint() {
        let mut engine = arena();
        engine.agents[7].pos = Vec2::new(700.0, 500.0);
        engine.agents[0].pos = Vec2::new(100.0, 100.0);
        engine.agents[0].waypoint = Some(Vec2::new(110.0, 100.0));
        engine.steer_ai(0, TICK_MS, 0).expect("valid index");
        assert_ne!(engine.agents[0].waypoint, Some(Vec2::new(110.0, 100.0)));
    }

    #[test]
    fn runner_without_any_chaser_stands_still() {
        let mut engine = arena();
        engine.agents[7].is_chaser = false;
        let before = engine.agents[0].pos;
        engine.steer_ai(0, TICK_MS, 0).expect("valid index");
        assert_eq!(engine.agents[0].pos, before);
    }

    #[test]
    fn decision_cadence_reschedules_within_range() {
        let mut engine = arena();
        engine.agents[0].next_decision_at = 0;
        engine.update_decision_cadence(0, 2_000);
        assert_eq!(engine.agents[0].last_decision_at, 2_000);
        let next = engine.agents[0].next_decision_at;
        assert!((2_500..=3_500).contains(&next));

        engine.update_decision_cadence(0, 2_100);
        assert_eq!(engine.agents[0].last_decision_at, 2_000);
    }

    #[test]
    fn autopilot_human_uses_ai_steering() {
        let mut engine = MatchEngine::new(
            MatchConfig::default(),
            52,
            MatchOptions {
                human_autopilot: true,
            },
        )
        .expect("default config is valid");
        engine.start_match(MatchMode::Single, DesiredRole::Chaser);
        park_agents(&mut engine);
        let before = engine.agents[7].pos;
        engine.step(TICK_MS);
        assert_ne!(engine.agents[7].pos, before);
    }
}
