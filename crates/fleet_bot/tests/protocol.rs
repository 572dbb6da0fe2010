//! Full sessions through the JSON-lines runner.

use std::io::Cursor;
use std::time::Duration;

use serde_json::Value;

use fleet_bot::{BotError, BotRunner, Input, RunnerOptions, SessionSummary};
use fleet_core::config::EngineConfig;
use fleet_core::error::EngineError;
use fleet_core::grid::Position;
use fleet_core::plan::{ShipMove, TurnPlan};
use fleet_core::replay::Replay;
use fleet_core::snapshot::{GameSetup, TurnSnapshot};
use fleet_test_utils::determinism::record_replay;
use fleet_test_utils::fixtures::{patterned_setup, ship, uniform_setup};

fn options() -> RunnerOptions {
    RunnerOptions {
        budget: Duration::from_secs(60),
        ..RunnerOptions::default()
    }
}

fn script(setup: &GameSetup, turns: &[TurnSnapshot], quit: bool) -> String {
    let mut lines = vec![serde_json::to_string(&Input::Init(setup.clone())).unwrap()];
    lines.extend(
        turns
            .iter()
            .map(|t| serde_json::to_string(&Input::Turn(t.clone())).unwrap()),
    );
    if quit {
        lines.push(serde_json::to_string(&Input::Quit).unwrap());
    }
    lines.join("\n") + "\n"
}

/// Runs a session, returning its result and every output line as JSON.
fn session(input: String, options: RunnerOptions) -> (Result<SessionSummary, BotError>, Vec<Value>) {
    let mut output = Vec::new();
    let result = BotRunner::new(Cursor::new(input), &mut output, options).run();
    let messages = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    (result, messages)
}

fn kind(message: &Value) -> &str {
    message["type"].as_str().unwrap()
}

fn plans(messages: &[Value]) -> Vec<TurnPlan> {
    messages
        .iter()
        .filter(|m| kind(m) == "commands")
        .map(|m| TurnPlan {
            turn: serde_json::from_value(m["turn"].clone()).unwrap(),
            moves: serde_json::from_value::<Vec<ShipMove>>(m["commands"].clone()).unwrap(),
            timed_out: m["timed_out"].as_bool().unwrap(),
            stats: serde_json::from_value(m["stats"].clone()).unwrap(),
        })
        .collect()
}

#[test]
fn test_session_answers_every_turn_like_the_engine() {
    let setup = patterned_setup(16, 16, 21);
    let recorded = record_replay(&setup, EngineConfig::default(), 25, 3);
    let (result, messages) = session(script(&setup, &recorded.snapshots, true), options());

    let summary = result.unwrap();
    assert_eq!(summary.turns, 25);
    assert_eq!(summary.timed_out, 0);
    assert!(summary.quit);
    assert_eq!(kind(&messages[0]), "ready");
    assert_eq!(messages[0]["version"], "1.0");

    let hashes: Vec<u64> = plans(&messages).iter().map(TurnPlan::plan_hash).collect();
    assert_eq!(hashes, recorded.plan_hashes);
}

#[test]
fn test_fields_follow_commands() {
    let setup = uniform_setup(6, 6, 40);
    let turns = vec![TurnSnapshot {
        turn: 1,
        ships: vec![ship(0, 0, 0, 0)],
        spawned: vec![0],
        dropoffs: vec![Position::new(0, 0)],
        ..TurnSnapshot::default()
    }];
    let (result, messages) = session(
        script(&setup, &turns, false),
        RunnerOptions {
            emit_fields: true,
            ..options()
        },
    );

    assert!(!result.unwrap().quit);
    let kinds: Vec<&str> = messages.iter().map(kind).collect();
    assert_eq!(kinds, ["ready", "commands", "fields"]);
    assert_eq!(messages[2]["turn"], 1);
    let returns = messages[2]["returns"]["values"].as_array().unwrap();
    assert_eq!(returns.len(), 36);
    assert_eq!(returns[0].as_f64(), Some(0.0));
}

#[test]
fn test_recorded_session_verifies() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.replay");
    let setup = patterned_setup(12, 12, 2);
    let recorded = record_replay(&setup, EngineConfig::default(), 15, 2);

    let (result, _) = session(
        script(&setup, &recorded.snapshots, true),
        RunnerOptions {
            record: Some(path.clone()),
            ..options()
        },
    );
    result.unwrap();

    let replay = Replay::load(&path).unwrap();
    assert_eq!(replay.turn_count(), 15);
    assert_eq!(replay.plan_hashes, recorded.plan_hashes);
    assert!(replay.verify().unwrap().is_match());
}

#[test]
fn test_misplaced_ship_ends_session_with_error() {
    let setup = uniform_setup(8, 8, 0);
    let turns = vec![
        TurnSnapshot {
            turn: 1,
            ships: vec![ship(3, 0, 0, 0)],
            spawned: vec![3],
            dropoffs: vec![Position::new(0, 0)],
            ..TurnSnapshot::default()
        },
        TurnSnapshot {
            turn: 2,
            ships: vec![ship(3, 4, 4, 0)],
            dropoffs: vec![Position::new(0, 0)],
            ..TurnSnapshot::default()
        },
    ];
    let (result, messages) = session(script(&setup, &turns, true), options());

    assert!(matches!(
        result,
        Err(BotError::Engine(EngineError::PositionMismatch { ship: 3, .. }))
    ));
    assert_eq!(plans(&messages).len(), 1);
    let last = messages.last().unwrap();
    assert_eq!(kind(last), "error");
    assert!(last["message"].as_str().unwrap().contains("Ship 3"));
}

#[test]
fn test_second_init_is_rejected() {
    let init = serde_json::to_string(&Input::Init(uniform_setup(4, 4, 0))).unwrap();
    let (result, messages) = session(format!("{init}\n{init}\n"), options());
    assert!(matches!(result, Err(BotError::Protocol(_))));
    let kinds: Vec<&str> = messages.iter().map(kind).collect();
    assert_eq!(kinds, ["ready", "error"]);
}

#[test]
fn test_zero_budget_still_answers_every_ship() {
    let setup = uniform_setup(8, 8, 100);
    let turns = vec![TurnSnapshot {
        turn: 1,
        ships: vec![ship(0, 0, 0, 0)],
        spawned: vec![0],
        dropoffs: vec![Position::new(0, 0)],
        ..TurnSnapshot::default()
    }];
    let (result, messages) = session(
        script(&setup, &turns, true),
        RunnerOptions {
            budget: Duration::ZERO,
            ..options()
        },
    );

    assert_eq!(result.unwrap().timed_out, 1);
    let plans = plans(&messages);
    assert_eq!(plans.len(), 1);
    assert!(plans[0].timed_out);
    assert_eq!(plans[0].moves.len(), 1);
    assert_eq!(plans[0].moves[0].to, Position::new(0, 0));
}
