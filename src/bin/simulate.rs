use chrono::{SecondsFormat, Utc};
use clap::Parser;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tag_arena::config::MatchConfig;
use tag_arena::constants::TICK_MS;
use tag_arena::engine::{MatchEngine, MatchOptions};
use tag_arena::types::{
    DesiredRole, EndReason, HumanOutcome, MatchMode, RuntimeEvent, Snapshot,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run headless seeded tag matches and check invariants")]
struct Cli {
    /// single | multi; both modes run when omitted
    #[arg(long)]
    mode: Option<String>,
    /// chaser | runner | random
    #[arg(long)]
    role: Option<String>,
    #[arg(long)]
    seed: Option<u64>,
    /// Matches per mode
    #[arg(long, default_value_t = 1)]
    matches: u32,
    /// Simulated milliseconds per step
    #[arg(long, default_value_t = TICK_MS)]
    dt: u64,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    mode: MatchMode,
    role: DesiredRole,
    seed: u32,
    #[serde(rename = "dtMs")]
    dt_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    mode: MatchMode,
    role: DesiredRole,
    reason: EndReason,
    #[serde(rename = "elapsedMs")]
    elapsed_ms: u64,
    #[serde(rename = "tagCount")]
    tag_count: usize,
    #[serde(rename = "powerUpsSpawned")]
    power_ups_spawned: usize,
    #[serde(rename = "powerUpsTaken")]
    power_ups_taken: usize,
    ejections: usize,
    #[serde(rename = "finalChasers")]
    final_chasers: usize,
    #[serde(rename = "humanOutcome")]
    human_outcome: HumanOutcome,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "finishedAt")]
    finished_at: String,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageElapsedMs")]
    average_elapsed_ms: u64,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

/// Rolling state for the per-snapshot invariant checks.
#[derive(Debug, Default)]
struct InvariantTracker {
    prev_chasers: Option<usize>,
    last_tag_at: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = MatchConfig::default();
    let scenarios = match resolve_scenarios(&cli) {
        Ok(scenarios) => scenarios,
        Err(message) => {
            tracing::error!(%message, "invalid arguments");
            std::process::exit(2);
        }
    };

    let started_at = Utc::now();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, started_at.timestamp_millis()));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_elapsed_ms = 0u64;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        tracing::info!(
            match_id = %match_id,
            scenario = %scenario.name,
            seed = scenario.seed,
            mode = scenario.mode.label(),
            role = ?scenario.role,
            "scenario_started"
        );
        let scenario_run = match run_scenario(&config, &scenario) {
            Ok(scenario_run) => scenario_run,
            Err(message) => {
                tracing::error!(
                    match_id = %match_id,
                    scenario = %scenario.name,
                    %message,
                    "scenario_failed"
                );
                std::process::exit(2);
            }
        };

        for anomaly in &scenario_run.anomaly_records {
            tracing::warn!(
                match_id = %match_id,
                scenario = %scenario.name,
                seed = scenario.seed,
                tick = anomaly.tick,
                message = %anomaly.message,
                "anomaly_detected"
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        total_elapsed_ms += scenario_run.result.elapsed_ms;
        *reason_counts
            .entry(end_reason_key(scenario_run.result.reason))
            .or_insert(0) += 1;

        tracing::info!(
            match_id = %match_id,
            scenario = %scenario.name,
            seed = scenario.seed,
            tick = scenario_run.finished_tick,
            reason = %end_reason_key(scenario_run.result.reason),
            elapsed_ms = scenario_run.result.elapsed_ms,
            tags = scenario_run.result.tag_count,
            anomaly_count = scenario_run.anomaly_records.len(),
            "scenario_finished"
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => tracing::error!(%error, "failed to serialize scenario result"),
        }
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        scenario_results,
        reason_counts,
        total_anomalies,
        total_elapsed_ms,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            tracing::error!(
                match_id = %match_id,
                path = %path.display(),
                %error,
                "summary_write_failed"
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    tracing::info!(
        match_id = %match_id,
        scenario_count = summary.scenario_count,
        anomaly_count = summary.anomaly_count,
        average_elapsed_ms = summary.average_elapsed_ms,
        reason_counts = ?summary.reason_counts,
        summary_out = ?summary_out_written,
        "run_finished"
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(config: &MatchConfig, scenario: &Scenario) -> Result<ScenarioRunResult, String> {
    let mut engine = MatchEngine::new(
        config.clone(),
        scenario.seed,
        MatchOptions {
            human_autopilot: true,
        },
    )
    .map_err(|error| error.to_string())?;
    engine.start_match(scenario.mode, scenario.role);

    let dt_ms = scenario.dt_ms.max(1);
    let tick_limit = config.duration_secs(scenario.mode) * 1_000 / dt_ms + 60;
    let mut tracker = InvariantTracker::default();
    let mut power_ups_spawned = 0;
    let mut power_ups_taken = 0;
    let mut ejections = 0;
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut last_tick = 0u64;

    while !engine.is_ended() {
        engine.step(dt_ms);
        let snapshot = engine.build_snapshot(true);
        last_tick = snapshot.tick;
        for message in collect_snapshot_anomalies(config, &snapshot, &mut tracker) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        if snapshot.tick > tick_limit {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                "tick safety limit exceeded".to_string(),
            );
            break;
        }

        for event in &snapshot.events {
            match event {
                RuntimeEvent::PowerUpSpawned { .. } => power_ups_spawned += 1,
                RuntimeEvent::PowerUpTaken { .. } => power_ups_taken += 1,
                RuntimeEvent::Ejected { .. } => ejections += 1,
                _ => {}
            }
        }
    }

    // A match cut off by the tick limit is reported as a failure.
    engine.end_match(EndReason::Failure);
    let summary = engine
        .build_summary()
        .ok_or_else(|| "match ended without a summary".to_string())?;
    if summary.reason == EndReason::Failure {
        push_anomaly(
            &mut anomalies,
            &mut anomaly_records,
            &mut anomaly_seen,
            last_tick,
            "match aborted on an internal invariant failure".to_string(),
        );
    }

    Ok(ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            mode: scenario.mode,
            role: scenario.role,
            reason: summary.reason,
            elapsed_ms: summary.elapsed_ms,
            tag_count: summary.tag_count,
            power_ups_spawned,
            power_ups_taken,
            ejections,
            final_chasers: engine.chaser_count(),
            human_outcome: summary.human_outcome,
            anomalies,
        },
        anomaly_records,
        finished_tick: last_tick,
    })
}

fn collect_snapshot_anomalies(
    config: &MatchConfig,
    snapshot: &Snapshot,
    tracker: &mut InvariantTracker,
) -> Vec<String> {
    let mut anomalies = Vec::new();

    for agent in &snapshot.agents {
        let in_x = agent.x >= agent.radius && agent.x <= config.field_width - agent.radius;
        let in_y = agent.y >= agent.radius && agent.y <= config.field_height - agent.radius;
        if !(in_x && in_y) {
            anomalies.push(format!(
                "agent {} out of bounds: ({:.1}, {:.1})",
                agent.index, agent.x, agent.y
            ));
        }
    }

    let chasers = snapshot.agents.iter().filter(|agent| agent.is_chaser).count();
    match snapshot.mode {
        MatchMode::Single if chasers != 1 => {
            anomalies.push(format!("single mode has {chasers} chasers"));
        }
        MatchMode::Multi => {
            if let Some(prev) = tracker.prev_chasers {
                if chasers < prev {
                    anomalies.push(format!("chaser count decreased: {prev} -> {chasers}"));
                }
            }
        }
        _ => {}
    }
    tracker.prev_chasers = Some(chasers);

    for event in &snapshot.events {
        let RuntimeEvent::Tagged { at_ms, .. } = event else {
            continue;
        };
        if let Some(last) = tracker.last_tag_at {
            if at_ms.saturating_sub(last) < config.tag_cooldown_ms {
                anomalies.push(format!(
                    "tags {} ms apart, cooldown is {} ms",
                    at_ms.saturating_sub(last),
                    config.tag_cooldown_ms
                ));
            }
        }
        tracker.last_tag_at = Some(*at_ms);
    }

    if snapshot.runners_left + chasers != snapshot.agents.len() {
        anomalies.push("runner count does not match agents".to_string());
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Result<Vec<Scenario>, String> {
    let seed = normalize_seed(
        cli.seed
            .unwrap_or_else(|| Utc::now().timestamp_millis().unsigned_abs()),
    );
    let role = match cli.role.as_deref() {
        None => DesiredRole::Random,
        Some(raw) => DesiredRole::parse(raw).ok_or_else(|| format!("unknown role: {raw}"))?,
    };
    let modes = match cli.mode.as_deref() {
        None => vec![MatchMode::Single, MatchMode::Multi],
        Some(raw) => vec![MatchMode::parse(raw).ok_or_else(|| format!("unknown mode: {raw}"))?],
    };

    let matches = cli.matches.max(1);
    let mut scenarios = Vec::new();
    let mut offset = 0u64;
    for mode in modes {
        for round in 0..matches {
            let mode_key = match mode {
                MatchMode::Single => "single",
                MatchMode::Multi => "multi",
            };
            scenarios.push(Scenario {
                name: format!("{mode_key}-{}", round + 1),
                mode,
                role,
                seed: normalize_seed(seed as u64 + offset),
                dt_ms: cli.dt,
            });
            offset += 1;
        }
    }
    Ok(scenarios)
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: i64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    match_id: String,
    started_at: String,
    finished_at: String,
    scenarios: Vec<ScenarioResultLine>,
    reason_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_elapsed_ms: u64,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let average_elapsed_ms = if scenario_count == 0 {
        0
    } else {
        total_elapsed_ms / scenario_count as u64
    };
    RunSummary {
        match_id,
        started_at,
        finished_at,
        scenario_count,
        anomaly_count,
        average_elapsed_ms,
        reason_counts,
        scenarios,
    }
}

fn end_reason_key(reason: EndReason) -> String {
    match reason {
        EndReason::TimeUp => "time_up",
        EndReason::AllTagged => "all_tagged",
        EndReason::Quit => "quit",
        EndReason::Failure => "failure",
    }
    .to_string()
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, summary_text)
}
