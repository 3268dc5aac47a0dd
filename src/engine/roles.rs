use super::*;

use crate::types::{HumanOutcome, RankStatus};

impl MatchEngine {
    /// Applies one tag. Returns `Ok(false)` when the target turned out to be
    /// protected by a safe zone.
    pub(super) fn apply_tag(
        &mut self,
        tagger_idx: usize,
        tagged_idx: usize,
        now_ms: u64,
    ) -> Result<bool, MatchError> {
        let guard_ms = self.config.tag_back_guard_ms;
        if self.agent_mut(tagged_idx)?.in_safe_zone() {
            return Ok(false);
        }
        self.agent_mut(tagger_idx)?;

        self.last_tag_at = Some(now_ms);
        self.tag_count += 1;

        match self.mode {
            MatchMode::Single => {
                let tagger = self.agent_mut(tagger_idx)?;
                tagger.is_chaser = false;
                tagger.apply_effect(EffectKind::TagBackGuard, now_ms, guard_ms);
                let tagged = self.agent_mut(tagged_idx)?;
                tagged.is_chaser = true;
                tagged.clear_effect(EffectKind::TagBackGuard);
            }
            MatchMode::Multi => {
                self.agent_mut(tagged_idx)?.is_chaser = true;
                self.tag_log.push(TagRecord {
                    tagged_index: tagged_idx,
                    at_ms: now_ms,
                    tagger_index: tagger_idx,
                });
                self.chaser_floor = self.chaser_count();
            }
        }

        self.push_event(RuntimeEvent::Tagged {
            tagger: tagger_idx,
            tagged: tagged_idx,
            at_ms: now_ms,
        });
        tracing::debug!(
            tagger = tagger_idx,
            tagged = tagged_idx,
            at_ms = now_ms,
            "tag"
        );
        Ok(true)
    }

    pub(super) fn check_win_condition(&mut self) {
        if self.mode == MatchMode::Multi && self.runner_count() == 0 {
            self.end_match(EndReason::AllTagged);
        }
    }

    pub(super) fn human_outcome(&self) -> HumanOutcome {
        let Some(reason) = self.end_reason else {
            return HumanOutcome::Undecided;
        };
        match reason {
            EndReason::Quit => HumanOutcome::Quit,
            EndReason::Failure => HumanOutcome::Failed,
            EndReason::TimeUp if self.mode == MatchMode::Single => {
                if self.human_role() == Role::Chaser {
                    HumanOutcome::FinalChaser
                } else {
                    HumanOutcome::Survived
                }
            }
            EndReason::TimeUp => HumanOutcome::Undecided,
            EndReason::AllTagged => self
                .rankings
                .as_deref()
                .and_then(|rankings| {
                    rankings
                        .iter()
                        .find(|entry| entry.agent_index == self.human_index)
                })
                .map(|entry| HumanOutcome::Placed {
                    rank: entry.rank,
                    ordinal: ordinal(entry.rank),
                })
                .unwrap_or(HumanOutcome::Undecided),
        }
    }
}

/// Final standings for a multi-chaser match: agents still running win in
/// index order, then tagged agents from the last tagged to the first.
pub fn compute_rankings(agents: &[Agent], tags: &[TagRecord]) -> Vec<RankingEntry> {
    let name_of = |index: usize| {
        agents
            .get(index)
            .map(Agent::display_name)
            .unwrap_or_else(|| format!("Player {}", index + 1))
    };

    let winners = agents
        .iter()
        .filter(|agent| !agent.is_chaser)
        .map(|agent| (agent.index, RankStatus::Winner));
    let tagged = tags
        .iter()
        .rev()
        .map(|record| (record.tagged_index, RankStatus::Tagged));

    winners
        .chain(tagged)
        .enumerate()
        .map(|(position, (agent_index, status))| RankingEntry {
            rank: position + 1,
            agent_index,
            name: name_of(agent_index),
            status,
        })
        .collect()
}

/// English ordinal text: 1st, 2nd, 3rd, 4th, 11th, 21st, 112th.
pub fn ordinal(n: usize) -> String {
    let v = n % 100;
    let suffix = if v >= 20 {
        match (v - 20) % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        }
    } else {
        match v {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        }
    };
    format!("{n}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TICK_MS;
    use crate::engine::tests::{park_agents, started};

    fn ranking_agents(chasers: &[usize]) -> Vec<Agent> {
        (0..8)
            .map(|index| {
                let mut agent = Agent::new(index, Vec2::new(0.0, 0.0), 20.0, 3.0, index == 7);
                agent.is_chaser = chasers.contains(&index);
                agent
            })
            .collect()
    }

    fn record(tagged_index: usize, at_ms: u64) -> TagRecord {
        TagRecord {
            tagged_index,
            at_ms,
            tagger_index: 0,
        }
    }

    #[test]
    fn rankings_list_winners_then_reverse_tag_order() {
        let agents = ranking_agents(&[1, 3, 6]);
        let tags = vec![record(3, 1_000), record(1, 2_500), record(6, 4_000)];
        let rankings = compute_rankings(&agents, &tags);

        let order: Vec<(usize, usize, RankStatus)> = rankings
            .iter()
            .map(|entry| (entry.rank, entry.agent_index, entry.status))
            .collect();
        assert_eq!(
            order,
            vec![
                (1, 0, RankStatus::Winner),
                (2, 2, RankStatus::Winner),
                (3, 4, RankStatus::Winner),
                (4, 5, RankStatus::Winner),
                (5, 7, RankStatus::Winner),
                (6, 6, RankStatus::Tagged),
                (7, 1, RankStatus::Tagged),
                (8, 3, RankStatus::Tagged),
            ]
        );
        assert_eq!(rankings[4].name, "You");
        assert_eq!(rankings[5].name, "Player 7");
    }

    #[test]
    fn ordinals_follow_english_suffix_rules() {
        let cases = [
            (1, "1st"),
            (2, "2nd"),
            (3, "3rd"),
            (4, "4th"),
            (11, "11th"),
            (12, "12th"),
            (13, "13th"),
            (21, "21st"),
            (22, "22nd"),
            (30, "30th"),
            (101, "101st"),
            (111, "111th"),
        ];
        for (n, expected) in cases {
            assert_eq!(ordinal(n), expected);
        }
    }

    #[test]
    fn single_mode_tag_swaps_roles_and_guards_the_old_chaser() {
        let mut engine = started(MatchMode::Single, DesiredRole::Chaser, 21);
        park_agents(&mut engine);
        assert!(engine.agents[7].is_chaser);

        // Human sits on agent 2; both held still so only the tag happens.
        for agent in &mut engine.agents {
            agent.base_speed = 0.0;
        }
        engine.agents[7].pos = Vec2::new(engine.agents[2].pos.x, engine.agents[2].pos.y + 30.0);
        engine.step(TICK_MS);

        let now = engine.elapsed_ms();
        assert!(!engine.agents[7].is_chaser);
        assert!(engine.agents[2].is_chaser);
        assert_eq!(engine.chaser_count(), 1);
        assert_eq!(engine.last_tag_at, Some(now));
        assert_eq!(engine.tag_count, 1);
        assert!(engine.agents[7].has_effect(EffectKind::TagBackGuard, now));
        assert!(!engine.agents[2].has_effect(EffectKind::TagBackGuard, now));
        assert!(engine.tag_log().is_empty());

        let events = engine.build_snapshot(true).events;
        assert!(events.iter().any(|event| matches!(
            event,
            RuntimeEvent::Tagged {
                tagger: 7,
                tagged: 2,
                ..
            }
        )));
        assert_eq!(engine.build_snapshot(false).human_role, Role::Runner);
    }

    #[test]
    fn guarded_agent_cannot_be_tagged_back() {
        let mut engine = started(MatchMode::Single, DesiredRole::Chaser, 22);
        park_agents(&mut engine);
        for agent in &mut engine.agents {
            agent.base_speed = 0.0;
        }
        engine.agents[7].pos = Vec2::new(engine.agents[2].pos.x, engine.agents[2].pos.y + 30.0);
        engine.step(TICK_MS);
        assert!(engine.agents[2].is_chaser);

        // Still touching, cooldown over, guard still up.
        for _ in 0..70 {
            engine.step(TICK_MS);
        }
        assert!(engine.elapsed_ms() > 1_000 && engine.elapsed_ms() < 1_500);
        assert!(engine.agents[2].is_chaser);
        assert_eq!(engine.tag_count, 1);

        // Guard lapses at 1516 ms; the next touch tags back.
        for _ in 0..30 {
            engine.step(TICK_MS);
        }
        assert!(engine.agents[7].is_chaser);
        assert_eq!(engine.tag_count, 2);
    }

    #[test]
    fn multi_mode_tag_recruits_and_records() {
        let mut engine = started(MatchMode::Multi, DesiredRole::Chaser, 23);
        park_agents(&mut engine);
        for agent in &mut engine.agents {
            agent.base_speed = 0.0;
        }
        engine.agents[7].pos = Vec2::new(engine.agents[2].pos.x, engine.agents[2].pos.y + 30.0);
        engine.step(TICK_MS);

        assert!(engine.agents[7].is_chaser);
        assert!(engine.agents[2].is_chaser);
        assert_eq!(engine.chaser_count(), 2);
        assert_eq!(engine.tag_log().len(), 1);
        assert_eq!(engine.tag_log()[0].tagged_index, 2);
        assert_eq!(engine.tag_log()[0].tagger_index, 7);
        assert!(!engine.agents[7].has_effect(EffectKind::TagBackGuard, engine.elapsed_ms()));
    }

    #[test]
    fn tag_inside_safe_zone_is_refused() {
        let mut engine = started(MatchMode::Single, DesiredRole::Chaser, 24);
        park_agents(&mut engine);
        engine.agents[2].safe_zone = Some(0);
        let tagged = engine.apply_tag(7, 2, 100).expect("valid indices");
        assert!(!tagged);
        assert!(engine.agents[7].is_chaser);
        assert_eq!(engine.last_tag_at, None);
    }

    #[test]
    fn tag_with_unknown_agent_is_an_error() {
        let mut engine = started(MatchMode::Single, DesiredRole::Chaser, 25);
        let err = engine.apply_tag(7, 42, 100).expect_err("index out of range");
        assert_eq!(err, MatchError::AgentOutOfRange { index: 42, count: 8 });
    }

    #[test]
    fn last_runner_tagged_ends_multi_match_with_placement() {
        let mut engine = started(MatchMode::Multi, DesiredRole::Runner, 26);
        park_agents(&mut engine);
        for agent in &mut engine.agents {
            agent.is_chaser = agent.index != 7 && agent.index != 0;
            agent.base_speed = 0.0;
        }
        engine.chaser_floor = engine.chaser_count();
        engine.tag_log.push(record(0, 10));

        // Agent 1 (a chaser) lands on the human, the last runner.
        engine.agents[1].pos = Vec2::new(engine.agents[7].pos.x - 30.0, engine.agents[7].pos.y);
        engine.agents[0].is_chaser = true;
        engine.chaser_floor = engine.chaser_count();
        engine.step(TICK_MS);

        assert!(engine.is_ended());
        assert_eq!(engine.end_reason(), Some(EndReason::AllTagged));
        let summary = engine.build_summary().expect("ended match has a summary");
        assert_eq!(
            summary.human_outcome,
            HumanOutcome::Placed {
                rank: 1,
                ordinal: "1st".to_string()
            }
        );
        let rankings = summary.rankings.expect("multi mode ranks");
        assert_eq!(rankings.len(), 2);
        assert_eq!(rankings[0].agent_index, 7);
        assert_eq!(rankings[1].agent_index, 0);
    }

    #[test]
    fn single_mode_time_up_reports_final_chaser_or_survivor() {
        let mut engine = started(MatchMode::Single, DesiredRole::Chaser, 27);
        park_agents(&mut engine);
        engine.end_match(EndReason::TimeUp);
        let summary = engine.build_summary().expect("ended match has a summary");
        assert_eq!(summary.human_outcome, HumanOutcome::FinalChaser);
        assert!(summary.rankings.is_none());

        let mut engine = started(MatchMode::Single, DesiredRole::Runner, 27);
        engine.end_match(EndReason::TimeUp);
        assert_eq!(
            engine.build_summary().map(|summary| summary.human_outcome),
            Some(HumanOutcome::Survived)
        );
    }
}
