use super::*;

const POWER_UP_KINDS: [PowerUpKind; 2] = [PowerUpKind::Speed, PowerUpKind::Invincible];

fn effect_for(kind: PowerUpKind) -> EffectKind {
    match kind {
        PowerUpKind::Speed => EffectKind::SpeedBoost,
        PowerUpKind::Invincible => EffectKind::Invincible,
    }
}

impl MatchEngine {
    pub(super) fn update_safe_zones(&mut self, now_ms: u64) {
        let max_dwell_ms = self.config.safe_zones.max_dwell_ms;
        let field = self.field;
        for zone in &mut self.safe_zones {
            zone.occupants.clear();
        }

        for idx in 0..self.agents.len() {
            let pos = self.agents[idx].pos;
            let Some(zone_idx) = self.safe_zones.iter().position(|zone| zone.contains(pos)) else {
                self.agents[idx].leave_safe_zone();
                continue;
            };

            let agent = &mut self.agents[idx];
            if agent.safe_zone != Some(zone_idx) || agent.safe_zone_entered_at.is_none() {
                agent.safe_zone = Some(zone_idx);
                agent.safe_zone_entered_at = Some(now_ms);
            }

            let dwell_ms = agent
                .safe_zone_entered_at
                .map_or(0, |entered_at| now_ms.saturating_sub(entered_at));
            if dwell_ms > max_dwell_ms {
                let ejected = self.safe_zones[zone_idx].eject(agent.pos, agent.radius);
                agent.pos = field.clamp(ejected, agent.radius);
                agent.leave_safe_zone();
                self.push_event(RuntimeEvent::Ejected {
                    agent: idx,
                    zone: zone_idx,
                });
                tracing::debug!(agent = idx, zone = zone_idx, dwell_ms, "ejected from safe zone");
                continue;
            }

            self.safe_zones[zone_idx].occupants.push(idx);
        }
    }

    fn tag_on_cooldown(&self, now_ms: u64) -> bool {
        self.last_tag_at
            .is_some_and(|last| now_ms.saturating_sub(last) < self.config.tag_cooldown_ms)
    }

    pub(super) fn resolve_collisions(&mut self, now_ms: u64) -> Result<(), MatchError> {
        let count = self.agents.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let (a, b) = (&self.agents[i], &self.agents[j]);
                if a.is_chaser == b.is_chaser {
                    continue;
                }
                if a.pos.distance(b.pos) >= a.radius + b.radius {
                    continue;
                }
                if self.tag_on_cooldown(now_ms) {
                    return Ok(());
                }
                let (tagger, tagged) = if a.is_chaser { (i, j) } else { (j, i) };
                if !self.agents[tagged].is_taggable(now_ms) {
                    continue;
                }
                self.apply_tag(tagger, tagged, now_ms)?;
            }
        }
        Ok(())
    }

    pub(super) fn update_power_up_timer(&mut self, now_ms: u64) {
        if now_ms < self.next_power_up_at {
            return;
        }
        let active = self.power_ups.iter().filter(|p| !p.collected).count();
        if active < self.config.power_ups.max_active {
            self.spawn_power_up();
        }
        self.schedule_next_power_up();
    }

    pub(super) fn schedule_next_power_up(&mut self) {
        let delay = self
            .rng
            .range_ms(self.config.power_ups.spawn_min_ms, self.config.power_ups.spawn_max_ms);
        self.next_power_up_at = self.elapsed_ms.saturating_add(delay);
    }

    pub(super) fn spawn_power_up(&mut self) {
        let kind = POWER_UP_KINDS[self.rng.pick_index(POWER_UP_KINDS.len())];
        let pos = self
            .field
            .random_position(&mut self.rng, self.config.power_ups.spawn_margin);
        let id = self.make_id();
        self.power_ups.push(PowerUp {
            id,
            pos,
            kind,
            radius: self.config.power_ups.radius,
            duration_ms: self.config.power_ups.duration_ms(kind),
            collected: false,
        });
        self.push_event(RuntimeEvent::PowerUpSpawned { id, kind });
        tracing::debug!(id, kind = ?kind, x = pos.x, y = pos.y, "power-up spawned");
    }

    /// Every agent overlapping a power-up this tick receives its effect.
    pub(super) fn collect_power_ups(&mut self, now_ms: u64) {
        let mut taken = Vec::new();
        for power_up in &mut self.power_ups {
            if power_up.collected {
                continue;
            }
            let takers: Vec<usize> = self
                .agents
                .iter()
                .filter(|agent| agent.pos.distance(power_up.pos) < agent.radius + power_up.radius)
                .map(|agent| agent.index)
                .collect();
            if takers.is_empty() {
                continue;
            }

            let effect = effect_for(power_up.kind);
            for &idx in &takers {
                self.agents[idx].apply_effect(effect, now_ms, power_up.duration_ms);
            }
            power_up.collected = true;
            tracing::debug!(id = power_up.id, kind = ?power_up.kind, takers = ?takers, "power-up taken");
            taken.push(RuntimeEvent::PowerUpTaken {
                id: power_up.id,
                kind: power_up.kind,
                by: takers,
            });
        }
        self.power_ups.retain(|power_up| !power_up.collected);
        for event in taken {
            self.push_event(event);
        }
    }
}
