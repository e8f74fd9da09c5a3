//! The four mini-game engines.
//!
//! Each engine is a self-contained state machine driven by two kinds of input:
//! player actions (game-specific methods) and the host clock (`Engine::tick`).
//! Engines never touch storage or the network. They queue `GameLog` entries in
//! the order things happen and surface a `RunResult` once a run ends; the
//! controller turns both into telemetry and ledger updates.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod math;
pub mod memory;
pub mod schedule;
pub mod simon;
pub mod verbal;

pub use math::MathGame;
pub use memory::MemoryGame;
pub use schedule::Schedule;
pub use simon::SimonGame;
pub use verbal::VerbalGame;

/// Countdown shared by Simon and Math Race: three numbered ticks then "GO!".
pub const COUNTDOWN_FROM: u8 = 3;
pub const COUNTDOWN_STEP_MS: f64 = 900.0;
pub const COUNTDOWN_GO_MS: f64 = 250.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameId {
    Simon,
    Memory,
    Verbal,
    Math,
}

impl GameId {
    pub fn as_str(self) -> &'static str {
        match self {
            GameId::Simon => "simon",
            GameId::Memory => "memory",
            GameId::Verbal => "verbal",
            GameId::Math => "math",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            GameId::Simon => "Simon Says",
            GameId::Memory => "Memory Match",
            GameId::Verbal => "Verbal Memory",
            GameId::Math => "Math Race",
        }
    }
}

/// An event the engine wants recorded, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct GameLog {
    pub event_type: &'static str,
    pub payload: Value,
}

impl GameLog {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Final figure of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    Simon { level: u32 },
    Memory { time_ms: u64 },
    Verbal { score: u32 },
    Math { score: u32 },
}

impl RunResult {
    pub fn game(self) -> GameId {
        match self {
            RunResult::Simon { .. } => GameId::Simon,
            RunResult::Memory { .. } => GameId::Memory,
            RunResult::Verbal { .. } => GameId::Verbal,
            RunResult::Math { .. } => GameId::Math,
        }
    }

    pub fn summary(self) -> String {
        match self {
            RunResult::Simon { level } => format!("Final level: {level}"),
            RunResult::Memory { time_ms } => format!("Time: {}", format_seconds(time_ms)),
            RunResult::Verbal { score } | RunResult::Math { score } => format!("Score: {score}"),
        }
    }
}

pub fn format_seconds(ms: u64) -> String {
    format!("{:.2}s", ms as f64 / 1000.0)
}

/// Behaviour every engine shares with the host.
pub trait Engine {
    /// Fire every scheduled step due at `now`.
    fn tick(&mut self, now: f64);

    /// Start a fresh run (the "Try again" path).
    fn retry(&mut self, now: f64);

    /// Cancel all pending timers. Called before the engine is dropped.
    fn teardown(&mut self);

    fn drain_log(&mut self) -> Vec<GameLog>;

    fn take_result(&mut self) -> Option<RunResult>;
}

/// The engine mounted for the current game stage.
#[derive(Debug)]
pub enum ActiveGame {
    Simon(SimonGame),
    Memory(MemoryGame),
    Verbal(VerbalGame),
    Math(MathGame),
}

impl ActiveGame {
    pub fn id(&self) -> GameId {
        match self {
            ActiveGame::Simon(_) => GameId::Simon,
            ActiveGame::Memory(_) => GameId::Memory,
            ActiveGame::Verbal(_) => GameId::Verbal,
            ActiveGame::Math(_) => GameId::Math,
        }
    }

    pub fn engine_mut(&mut self) -> &mut dyn Engine {
        match self {
            ActiveGame::Simon(g) => g,
            ActiveGame::Memory(g) => g,
            ActiveGame::Verbal(g) => g,
            ActiveGame::Math(g) => g,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_summaries_read_like_the_game_over_dialog() {
        assert_eq!(RunResult::Simon { level: 4 }.summary(), "Final level: 4");
        assert_eq!(RunResult::Memory { time_ms: 12_340 }.summary(), "Time: 12.34s");
        assert_eq!(RunResult::Math { score: 7 }.summary(), "Score: 7");
        assert_eq!(RunResult::Verbal { score: 2 }.game(), GameId::Verbal);
    }
}
