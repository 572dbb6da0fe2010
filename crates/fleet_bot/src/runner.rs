//! Session loop: read messages, plan turns, write commands.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use fleet_core::config::EngineConfig;
use fleet_core::engine::Engine;
use fleet_core::plan::Deadline;
use fleet_core::replay::Replay;

use crate::error::{BotError, Result};
use crate::protocol::{Input, Output};

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Engine tuning constants.
    pub config: EngineConfig,
    /// Wall-clock budget per turn, measured from the moment the turn
    /// message is parsed.
    pub budget: Duration,
    /// Emit a `fields` message after every `commands` message.
    pub emit_fields: bool,
    /// Save every snapshot and plan hash to this file when the session ends.
    pub record: Option<PathBuf>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            budget: Duration::from_millis(config.turn_budget_ms),
            config,
            emit_fields: false,
            record: None,
        }
    }
}

impl RunnerOptions {
    /// Options using `config` and its default turn budget.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            budget: Duration::from_millis(config.turn_budget_ms),
            config,
            ..Self::default()
        }
    }
}

/// How a session went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Turns answered.
    pub turns: u32,
    /// Turns cut short by the budget.
    pub timed_out: u32,
    /// Whether the session ended with a `quit` message rather than end of
    /// input.
    pub quit: bool,
}

/// Bot session over any line reader and writer.
pub struct BotRunner<R: BufRead, W: Write> {
    input: R,
    output: W,
    options: RunnerOptions,
    engine: Option<Engine>,
    replay: Option<Replay>,
    summary: SessionSummary,
}

impl<R: BufRead, W: Write> BotRunner<R, W> {
    /// Create a runner.
    pub fn new(input: R, output: W, options: RunnerOptions) -> Self {
        Self {
            input,
            output,
            options,
            engine: None,
            replay: None,
            summary: SessionSummary::default(),
        }
    }

    /// Run the session to completion.
    ///
    /// A fatal error is written as an `error` message before being returned.
    pub fn run(mut self) -> Result<SessionSummary> {
        let result = self.session();
        if let Err(e) = &result {
            tracing::error!(error = %e, turns = self.summary.turns, "Session failed");
            self.send(&Output::error(e.to_string())).ok();
        }
        let saved = self.save_replay();
        let summary = result?;
        saved?;
        Ok(summary)
    }

    fn session(&mut self) -> Result<SessionSummary> {
        self.send(&Output::ready())?;

        let mut line = String::new();
        loop {
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                tracing::info!("Input closed");
                break;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let message = Input::from_json(trimmed)?;
            tracing::debug!(message = message.name(), "Received");
            match message {
                Input::Init(setup) => {
                    if self.engine.is_some() {
                        return Err(BotError::Protocol("second init message".into()));
                    }
                    self.engine = Some(Engine::new(&setup, self.options.config.clone())?);
                    if self.options.record.is_some() {
                        self.replay = Some(Replay::new(setup, self.options.config.clone()));
                    }
                }
                Input::Turn(snapshot) => {
                    let deadline = Deadline::after(self.options.budget);
                    let engine = self
                        .engine
                        .as_mut()
                        .ok_or_else(|| BotError::Protocol("turn before init".into()))?;
                    let plan = engine.play_turn(&snapshot, &deadline)?;
                    let fields = self
                        .options
                        .emit_fields
                        .then(|| engine.field_snapshot());

                    self.summary.turns += 1;
                    if plan.timed_out {
                        self.summary.timed_out += 1;
                    }
                    if let Some(replay) = self.replay.as_mut() {
                        replay.record(snapshot, &plan);
                    }
                    let turn = plan.turn;
                    self.send(&Output::commands(plan))?;
                    if let Some(fields) = fields {
                        self.send(&Output::Fields { turn, fields })?;
                    }
                }
                Input::Quit => {
                    self.summary.quit = true;
                    break;
                }
            }
        }

        tracing::info!(
            turns = self.summary.turns,
            timed_out = self.summary.timed_out,
            "Session finished"
        );
        Ok(self.summary)
    }

    fn send(&mut self, message: &Output) -> Result<()> {
        self.output.write_all(message.to_json_line().as_bytes())?;
        self.output.flush()?;
        Ok(())
    }

    fn save_replay(&mut self) -> Result<()> {
        let (Some(path), Some(replay)) = (self.options.record.as_ref(), self.replay.take()) else {
            return Ok(());
        };
        replay.save(path)?;
        tracing::info!(path = %path.display(), turns = replay.turn_count(), "Replay saved");
        Ok(())
    }
}
