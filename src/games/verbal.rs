//! Verbal memory: is this word one you've already been shown?

use std::collections::HashSet;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;

use super::{Engine, GameLog, RunResult};

pub const LIVES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judgment {
    Seen,
    New,
}

impl Judgment {
    pub fn as_str(self) -> &'static str {
        match self {
            Judgment::Seen => "seen",
            Judgment::New => "new",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeOutcome {
    Ignored,
    Correct,
    Wrong,
    GameOver,
}

#[derive(Debug)]
pub struct VerbalGame {
    rng: SmallRng,
    repeat_probability: f64,
    pool: Vec<&'static str>,
    seen: HashSet<&'static str>,
    current: Option<&'static str>,
    last: Option<&'static str>,
    score: u32,
    lives: u32,
    over: bool,
    log: Vec<GameLog>,
    result: Option<RunResult>,
}

impl VerbalGame {
    pub fn new(repeat_probability: f64) -> Self {
        Self::with_rng(repeat_probability, SmallRng::from_entropy())
    }

    pub fn with_seed(repeat_probability: f64, seed: u64) -> Self {
        Self::with_rng(repeat_probability, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(repeat_probability: f64, rng: SmallRng) -> Self {
        let mut g = Self {
            rng,
            repeat_probability: repeat_probability.clamp(0.0, 1.0),
            pool: Vec::new(),
            seen: HashSet::new(),
            current: None,
            last: None,
            score: 0,
            lives: LIVES,
            over: false,
            log: Vec::new(),
            result: None,
        };
        g.reset();
        g
    }

    fn reset(&mut self) {
        self.pool = crate::VERBAL_WORDS.to_vec();
        self.pool.shuffle(&mut self.rng);
        self.seen.clear();
        self.current = None;
        self.last = None;
        self.score = 0;
        self.lives = LIVES;
        self.over = false;
        self.result = None;
        self.next_word();
    }

    pub fn current_word(&self) -> Option<&'static str> {
        self.current
    }

    pub fn has_seen(&self, word: &str) -> bool {
        self.seen.contains(word)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    /// Pick the next word: a repeat with `repeat_probability` when one exists,
    /// otherwise a fresh draw. Never the word just shown unless nothing else is
    /// left.
    fn next_word(&mut self) {
        let mut repeat = !self.seen.is_empty() && self.rng.gen_bool(self.repeat_probability);
        if self.pool.is_empty() {
            repeat = true;
        }

        let mut chosen = None;
        if repeat {
            let mut candidates: Vec<&'static str> = self
                .seen
                .iter()
                .copied()
                .filter(|w| Some(*w) != self.last)
                .collect();
            if candidates.is_empty() && !self.pool.is_empty() {
                repeat = false;
            } else {
                if candidates.is_empty() {
                    candidates = self.seen.iter().copied().collect();
                }
                // HashSet order is arbitrary; sort so seeded runs replay exactly.
                candidates.sort_unstable();
                chosen = candidates.choose(&mut self.rng).copied();
            }
        }
        if !repeat {
            let mut tries = 0;
            loop {
                chosen = self.pool.pop();
                tries += 1;
                if chosen != self.last || self.pool.is_empty() || tries >= 5 {
                    break;
                }
            }
        }

        self.current = chosen;
        self.last = chosen;
    }

    pub fn judge(&mut self, choice: Judgment) -> JudgeOutcome {
        if self.over {
            return JudgeOutcome::Ignored;
        }
        let Some(word) = self.current else {
            return JudgeOutcome::Ignored;
        };
        let is_seen = self.seen.contains(word);
        let correct = match choice {
            Judgment::Seen => is_seen,
            Judgment::New => !is_seen,
        };
        self.log.push(GameLog::new(
            "verbal_pick",
            json!({
                "word": word,
                "choice": choice.as_str(),
                "isSeen": is_seen,
                "correct": correct,
            }),
        ));
        self.seen.insert(word);

        if correct {
            self.score += 1;
            self.next_word();
            return JudgeOutcome::Correct;
        }

        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.over = true;
            self.result = Some(RunResult::Verbal { score: self.score });
            return JudgeOutcome::GameOver;
        }
        self.next_word();
        JudgeOutcome::Wrong
    }
}

impl Engine for VerbalGame {
    fn tick(&mut self, _now: f64) {}

    fn retry(&mut self, _now: f64) {
        self.reset();
    }

    fn teardown(&mut self) {}

    fn drain_log(&mut self) -> Vec<GameLog> {
        std::mem::take(&mut self.log)
    }

    fn take_result(&mut self) -> Option<RunResult> {
        self.result.take()
    }
}
