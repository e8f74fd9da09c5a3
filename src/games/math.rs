//! Math Race: answer arithmetic problems against a per-question clock.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;

use super::{COUNTDOWN_FROM, COUNTDOWN_GO_MS, COUNTDOWN_STEP_MS, Engine, GameLog, RunResult, Schedule};

pub const LIVES: u32 = 3;
pub const QUESTION_MS: f64 = 5_000.0;
/// Correct answers needed per tier step.
pub const ANSWERS_PER_TIER: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
        }
    }

    /// Operators unlocked at `tier`. Division joins from tier 3.
    pub fn for_tier(tier: u32) -> &'static [Op] {
        if tier <= 2 {
            &[Op::Add, Op::Sub, Op::Mul]
        } else {
            &[Op::Add, Op::Sub, Op::Mul, Op::Div]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub lhs: i64,
    pub rhs: i64,
    pub op: Op,
    pub answer: i64,
}

impl Problem {
    pub fn text(&self) -> String {
        format!("{} {} {}", self.lhs, self.op.symbol(), self.rhs)
    }

    /// Build a problem for `tier`. Division is assembled from its quotient so
    /// it always divides exactly.
    pub fn generate(rng: &mut impl Rng, tier: u32) -> Self {
        let op = *Op::for_tier(tier).choose(rng).unwrap_or(&Op::Add);
        if op == Op::Div {
            let (max_divisor, max_quotient) = if tier <= 3 { (9, 12) } else { (12, 20) };
            let divisor = rng.gen_range(2..=max_divisor);
            let quotient = rng.gen_range(2..=max_quotient);
            return Self {
                lhs: quotient * divisor,
                rhs: divisor,
                op,
                answer: quotient,
            };
        }
        let (a, b) = match tier {
            0 | 1 => (rng.gen_range(1..=9), rng.gen_range(1..=9)),
            2 => (rng.gen_range(5..=20), rng.gen_range(5..=20)),
            3 => (rng.gen_range(8..=35), rng.gen_range(2..=12)),
            4 => (rng.gen_range(20..=70), rng.gen_range(10..=50)),
            _ => (rng.gen_range(30..=120), rng.gen_range(2..=25)),
        };
        let answer = match op {
            Op::Add => a + b,
            Op::Sub => a - b,
            _ => a * b,
        };
        Self {
            lhs: a,
            rhs: b,
            op,
            answer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathPhase {
    Countdown(u8),
    Go,
    Question,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Countdown(u8),
    Go,
    Deadline(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Countdown running, game over, or empty input.
    Ignored,
    Correct,
    Wrong,
    GameOver,
}

#[derive(Debug)]
pub struct MathGame {
    rng: SmallRng,
    phase: MathPhase,
    score: u32,
    lives: u32,
    tier: u32,
    problem: Option<Problem>,
    serial: u64,
    deadline: Option<f64>,
    timers: Schedule<Step>,
    log: Vec<GameLog>,
    result: Option<RunResult>,
}

impl MathGame {
    /// A new race; the countdown starts immediately at `now`.
    pub fn new(now: f64) -> Self {
        Self::with_rng(SmallRng::from_entropy(), now)
    }

    pub fn with_seed(seed: u64, now: f64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed), now)
    }

    fn with_rng(rng: SmallRng, now: f64) -> Self {
        let mut g = Self {
            rng,
            phase: MathPhase::Countdown(COUNTDOWN_FROM),
            score: 0,
            lives: LIVES,
            tier: 1,
            problem: None,
            serial: 0,
            deadline: None,
            timers: Schedule::new(),
            log: Vec::new(),
            result: None,
        };
        g.start(now);
        g
    }

    fn start(&mut self, now: f64) {
        self.timers.cancel_all();
        self.score = 0;
        self.lives = LIVES;
        self.tier = 1;
        self.problem = None;
        self.deadline = None;
        self.result = None;
        self.phase = MathPhase::Countdown(COUNTDOWN_FROM);
        self.timers.at(now + COUNTDOWN_STEP_MS, Step::Countdown(COUNTDOWN_FROM - 1));
    }

    pub fn phase(&self) -> MathPhase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn tier(&self) -> u32 {
        self.tier
    }

    pub fn problem(&self) -> Option<&Problem> {
        self.problem.as_ref()
    }

    pub fn accepting_input(&self) -> bool {
        self.phase == MathPhase::Question
    }

    /// Seconds left on the current question, for the HUD.
    pub fn time_left_ms(&self, now: f64) -> f64 {
        match (self.phase, self.deadline) {
            (MathPhase::Question, Some(d)) => (d - now).max(0.0),
            (MathPhase::GameOver, _) => 0.0,
            _ => QUESTION_MS,
        }
    }

    /// Bumped every time a new problem is shown.
    pub fn problem_serial(&self) -> u64 {
        self.serial
    }

    pub fn prompt_text(&self) -> String {
        match self.phase {
            MathPhase::Countdown(n) => format!("Starting in {n}…"),
            MathPhase::Go => "GO!".to_string(),
            MathPhase::Question => self.problem.as_ref().map(Problem::text).unwrap_or_default(),
            MathPhase::GameOver => "Game over".to_string(),
        }
    }

    fn show_problem(&mut self, at: f64) {
        let problem = Problem::generate(&mut self.rng, self.tier);
        self.problem = Some(problem);
        self.serial += 1;
        self.timers.cancel_where(|s| matches!(s, Step::Deadline(_)));
        self.deadline = Some(at + QUESTION_MS);
        self.timers.at(at + QUESTION_MS, Step::Deadline(self.serial));
        self.phase = MathPhase::Question;
    }

    fn lose_life(&mut self, at: f64) -> SubmitOutcome {
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.timers.cancel_all();
            self.deadline = None;
            self.phase = MathPhase::GameOver;
            self.result = Some(RunResult::Math { score: self.score });
            return SubmitOutcome::GameOver;
        }
        self.show_problem(at);
        SubmitOutcome::Wrong
    }

    /// Submit the typed answer. Blank input is ignored without penalty.
    pub fn submit(&mut self, input: &str, now: f64) -> SubmitOutcome {
        if self.phase != MathPhase::Question {
            return SubmitOutcome::Ignored;
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return SubmitOutcome::Ignored;
        }
        let Some(problem) = self.problem.clone() else {
            return SubmitOutcome::Ignored;
        };
        let correct = trimmed
            .parse::<f64>()
            .is_ok_and(|n| n.is_finite() && n == problem.answer as f64);
        self.log.push(GameLog::new(
            "math_submit",
            json!({
                "problem": problem.text(),
                "input": trimmed,
                "correct": correct,
                "answer": problem.answer,
                "difficulty": self.tier,
            }),
        ));

        if !correct {
            return self.lose_life(now);
        }
        self.score += 1;
        if self.score % ANSWERS_PER_TIER == 0 {
            self.tier += 1;
        }
        self.show_problem(now);
        SubmitOutcome::Correct
    }

    fn apply(&mut self, step: Step, at: f64) {
        match step {
            Step::Countdown(0) => {
                self.phase = MathPhase::Go;
                self.timers.at(at + COUNTDOWN_GO_MS, Step::Go);
            }
            Step::Countdown(n) => {
                self.phase = MathPhase::Countdown(n);
                self.timers.at(at + COUNTDOWN_STEP_MS, Step::Countdown(n - 1));
            }
            Step::Go => self.show_problem(at),
            Step::Deadline(serial) if serial == self.serial && self.phase == MathPhase::Question => {
                if let Some(problem) = &self.problem {
                    self.log.push(GameLog::new(
                        "math_timeout",
                        json!({
                            "problem": problem.text(),
                            "answer": problem.answer,
                            "difficulty": self.tier,
                        }),
                    ));
                }
                self.lose_life(at);
            }
            Step::Deadline(_) => {}
        }
    }
}

impl Engine for MathGame {
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
        self.deadline = None;
    }

    fn drain_log(&mut self) -> Vec<GameLog> {
        std::mem::take(&mut self.log)
    }

    fn take_result(&mut self) -> Option<RunResult> {
        self.result.take()
    }
}
