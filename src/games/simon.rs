//! Simon Says: watch a growing sequence of coloured pads, then repeat it.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde_json::json;

use super::{COUNTDOWN_FROM, COUNTDOWN_GO_MS, COUNTDOWN_STEP_MS, Engine, GameLog, RunResult, Schedule};

/// How long a pad stays lit during playback.
pub const FLASH_MS: f64 = 420.0;
/// Dark gap after each playback flash.
pub const GAP_MS: f64 = 140.0;
/// Feedback flash on a player press.
pub const PRESS_FLASH_MS: f64 = 170.0;
/// Pause between a completed round and the next playback.
pub const ROUND_PAUSE_MS: f64 = 280.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pad {
    Red,
    Blue,
    Green,
    Yellow,
}

impl Pad {
    pub const ALL: [Pad; 4] = [Pad::Red, Pad::Blue, Pad::Green, Pad::Yellow];

    pub fn as_str(self) -> &'static str {
        match self {
            Pad::Red => "red",
            Pad::Blue => "blue",
            Pad::Green => "green",
            Pad::Yellow => "yellow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimonPhase {
    Idle,
    Countdown(u8),
    Go,
    Playback,
    Input,
    RoundComplete,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Countdown(u8),
    Go,
    NextRound,
    Light(usize),
    Dark(usize),
    OpenInput,
    Unlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    Ignored,
    Hit,
    RoundComplete,
    Miss,
}

#[derive(Debug)]
pub struct SimonGame {
    rng: SmallRng,
    sequence: Vec<Pad>,
    level: u32,
    input_idx: usize,
    phase: SimonPhase,
    lit: Option<Pad>,
    timers: Schedule<Step>,
    log: Vec<GameLog>,
    result: Option<RunResult>,
}

impl SimonGame {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            rng,
            sequence: Vec::new(),
            level: 0,
            input_idx: 0,
            phase: SimonPhase::Idle,
            lit: None,
            timers: Schedule::new(),
            log: Vec::new(),
            result: None,
        }
    }

    pub fn phase(&self) -> SimonPhase {
        self.phase
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn sequence(&self) -> &[Pad] {
        &self.sequence
    }

    pub fn lit(&self) -> Option<Pad> {
        self.lit
    }

    pub fn accepting_input(&self) -> bool {
        self.phase == SimonPhase::Input
    }

    pub fn status_text(&self) -> String {
        match self.phase {
            SimonPhase::Idle => "Press Start".to_string(),
            SimonPhase::Countdown(n) => format!("Starting in {n}..."),
            SimonPhase::Go => "GO!".to_string(),
            SimonPhase::Playback => "Watch".to_string(),
            SimonPhase::Input => "Your turn".to_string(),
            SimonPhase::RoundComplete => "Correct".to_string(),
            SimonPhase::GameOver => "Game over".to_string(),
        }
    }

    /// Reset the run and begin the pre-round countdown.
    pub fn start(&mut self, now: f64) {
        self.timers.cancel_all();
        self.sequence.clear();
        self.level = 0;
        self.input_idx = 0;
        self.lit = None;
        self.result = None;
        self.phase = SimonPhase::Countdown(COUNTDOWN_FROM);
        self.timers.at(now + COUNTDOWN_STEP_MS, Step::Countdown(COUNTDOWN_FROM - 1));
    }

    pub fn press(&mut self, pad: Pad, now: f64) -> PressOutcome {
        if self.phase != SimonPhase::Input {
            return PressOutcome::Ignored;
        }
        let Some(&expected) = self.sequence.get(self.input_idx) else {
            return PressOutcome::Ignored;
        };

        self.lit = Some(pad);
        self.timers.cancel_where(|s| *s == Step::Unlight);
        self.timers.at(now + PRESS_FLASH_MS, Step::Unlight);

        if pad != expected {
            self.log.push(GameLog::new(
                "simon_miss",
                json!({
                    "level": self.level,
                    "expected": expected.as_str(),
                    "got": pad.as_str(),
                    "idx": self.input_idx,
                }),
            ));
            self.game_over();
            return PressOutcome::Miss;
        }

        self.input_idx += 1;
        self.log.push(GameLog::new(
            "simon_hit",
            json!({ "level": self.level, "idx": self.input_idx }),
        ));

        if self.input_idx == self.sequence.len() {
            self.phase = SimonPhase::RoundComplete;
            self.timers.at(now + ROUND_PAUSE_MS, Step::NextRound);
            PressOutcome::RoundComplete
        } else {
            PressOutcome::Hit
        }
    }

    fn game_over(&mut self) {
        self.timers.cancel_where(|s| *s != Step::Unlight);
        self.phase = SimonPhase::GameOver;
        self.result = Some(RunResult::Simon { level: self.level });
    }

    fn next_round(&mut self, at: f64) {
        self.level += 1;
        let pick = *Pad::ALL.choose(&mut self.rng).unwrap_or(&Pad::Red);
        self.sequence.push(pick);
        self.log.push(GameLog::new(
            "simon_round_start",
            json!({ "level": self.level, "seqLen": self.sequence.len() }),
        ));
        self.phase = SimonPhase::Playback;
        self.input_idx = 0;
        self.lit = None;
        self.timers.at(at, Step::Light(0));
    }

    fn apply(&mut self, step: Step, at: f64) {
        match step {
            Step::Countdown(0) => {
                self.phase = SimonPhase::Go;
                self.timers.at(at + COUNTDOWN_GO_MS, Step::Go);
            }
            Step::Countdown(n) => {
                self.phase = SimonPhase::Countdown(n);
                self.timers.at(at + COUNTDOWN_STEP_MS, Step::Countdown(n - 1));
            }
            Step::Go | Step::NextRound => self.next_round(at),
            Step::Light(i) => {
                self.lit = self.sequence.get(i).copied();
                self.timers.at(at + FLASH_MS, Step::Dark(i));
            }
            Step::Dark(i) => {
                self.lit = None;
                let next = if i + 1 < self.sequence.len() {
                    Step::Light(i + 1)
                } else {
                    Step::OpenInput
                };
                self.timers.at(at + GAP_MS, next);
            }
            Step::OpenInput => {
                self.phase = SimonPhase::Input;
                self.input_idx = 0;
            }
            Step::Unlight => {
                if self.phase != SimonPhase::Playback {
                    self.lit = None;
                }
            }
        }
    }
}

impl Default for SimonGame {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for SimonGame {
    fn tick(&mut self, now: f64) {
        while let Some((at, step)) = self.timers.pop_due(now) {
            self.apply(step, at);
        }
    }

    fn retry(&mut self, now: f64) {
        self.start(now);
    }

    fn teardown(&mut self) {
        self.timers.cancel_all();
        self.lit = None;
    }

    fn drain_log(&mut self) -> Vec<GameLog> {
        std::mem::take(&mut self.log)
    }

    fn take_result(&mut self) -> Option<RunResult> {
        self.result.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Advance the clock in small steps until `done` holds.
    fn run_until(g: &mut SimonGame, now: &mut f64, done: impl Fn(&SimonGame) -> bool) {
        for _ in 0..10_000 {
            if done(g) {
                return;
            }
            *now += 10.0;
            g.tick(*now);
        }
        panic!("simon never reached the expected phase: {:?}", g.phase());
    }

    fn wrong_pad(p: Pad) -> Pad {
        if p == Pad::Red { Pad::Blue } else { Pad::Red }
    }

    #[test]
    fn countdown_blocks_input_then_round_one_plays() {
        let mut g = SimonGame::with_seed(7);
        let mut now = 0.0;
        g.start(now);
        assert_eq!(g.phase(), SimonPhase::Countdown(3));
        assert_eq!(g.press(Pad::Red, now), PressOutcome::Ignored);

        now = 900.0;
        g.tick(now);
        assert_eq!(g.phase(), SimonPhase::Countdown(2));
        now = 2_700.0;
        g.tick(now);
        assert_eq!(g.phase(), SimonPhase::Go);
        now = 2_950.0;
        g.tick(now);
        assert_eq!(g.phase(), SimonPhase::Playback);
        assert_eq!(g.level(), 1);
        assert_eq!(g.lit(), Some(g.sequence()[0]));
        assert_eq!(g.press(g.sequence()[0], now), PressOutcome::Ignored);

        run_until(&mut g, &mut now, |g| g.accepting_input());
        assert_eq!(g.lit(), None);
    }

    #[test]
    fn correct_rounds_raise_level_by_one_and_sequence_tracks_level() {
        let mut g = SimonGame::with_seed(42);
        let mut now = 0.0;
        g.start(now);
        for expected_level in 1..=6u32 {
            run_until(&mut g, &mut now, |g| g.accepting_input());
            assert_eq!(g.level(), expected_level);
            assert_eq!(g.sequence().len() as u32, g.level());
            let seq = g.sequence().to_vec();
            for (i, pad) in seq.iter().enumerate() {
                let outcome = g.press(*pad, now);
                if i + 1 == seq.len() {
                    assert_eq!(outcome, PressOutcome::RoundComplete);
                } else {
                    assert_eq!(outcome, PressOutcome::Hit);
                }
            }
            assert!(g.take_result().is_none());
        }
    }

    #[test]
    fn mismatch_ends_run_and_logs_expected_and_actual() {
        let mut g = SimonGame::with_seed(3);
        let mut now = 0.0;
        g.start(now);
        run_until(&mut g, &mut now, |g| g.accepting_input());
        let first = g.sequence()[0];
        g.drain_log();

        assert_eq!(g.press(wrong_pad(first), now), PressOutcome::Miss);
        assert_eq!(g.phase(), SimonPhase::GameOver);
        assert_eq!(g.take_result(), Some(RunResult::Simon { level: 1 }));
        assert_eq!(g.take_result(), None);

        let log = g.drain_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].event_type, "simon_miss");
        assert_eq!(log[0].payload["expected"], first.as_str());
        assert_eq!(log[0].payload["got"], wrong_pad(first).as_str());
        assert_eq!(log[0].payload["idx"], 0);

        // Nothing left to fire after game over except the press flash.
        now += 10_000.0;
        g.tick(now);
        assert_eq!(g.phase(), SimonPhase::GameOver);
        assert_eq!(g.level(), 1);
    }

    #[test]
    fn retry_resets_to_level_zero_and_replays_countdown() {
        let mut g = SimonGame::with_seed(11);
        let mut now = 0.0;
        g.start(now);
        run_until(&mut g, &mut now, |g| g.accepting_input());
        let first = g.sequence()[0];
        g.press(wrong_pad(first), now);

        g.retry(now);
        assert_eq!(g.level(), 0);
        assert!(g.sequence().is_empty());
        assert_eq!(g.phase(), SimonPhase::Countdown(3));
    }

    #[test]
    fn teardown_cancels_pending_playback() {
        let mut g = SimonGame::with_seed(5);
        g.start(0.0);
        g.teardown();
        g.tick(1e9);
        assert_eq!(g.phase(), SimonPhase::Countdown(3));
        assert_eq!(g.level(), 0);
    }
}
