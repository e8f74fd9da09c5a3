//! Timed pair matching over a grid of concealed word cards.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde_json::json;

use super::{Engine, GameLog, RunResult, Schedule};

/// How long a mismatched pair stays face up.
pub const MISMATCH_REVEAL_MS: f64 = 650.0;
/// Sampling interval of the running clock shown in the HUD.
pub const CLOCK_SAMPLE_MS: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub value: &'static str,
    pub revealed: bool,
    pub matched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Conceal(usize, usize),
    Sample,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipOutcome {
    /// Locked, out of range, already face up, or run finished.
    Ignored,
    First,
    Match,
    Mismatch,
    Complete,
}

#[derive(Debug)]
pub struct MemoryGame {
    rng: SmallRng,
    pairs: usize,
    cards: Vec<Card>,
    first: Option<usize>,
    locked: bool,
    matches: usize,
    started_at: Option<f64>,
    elapsed_ms: f64,
    finished_ms: Option<u64>,
    timers: Schedule<Step>,
    log: Vec<GameLog>,
    result: Option<RunResult>,
}

impl MemoryGame {
    pub fn new(pairs: usize) -> Self {
        Self::with_rng(pairs, SmallRng::from_entropy())
    }

    pub fn with_seed(pairs: usize, seed: u64) -> Self {
        Self::with_rng(pairs, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(pairs: usize, rng: SmallRng) -> Self {
        let mut g = Self {
            rng,
            pairs: pairs.clamp(1, crate::MEMORY_WORDS.len()),
            cards: Vec::new(),
            first: None,
            locked: false,
            matches: 0,
            started_at: None,
            elapsed_ms: 0.0,
            finished_ms: None,
            timers: Schedule::new(),
            log: Vec::new(),
            result: None,
        };
        g.deal();
        g
    }

    /// Draw `pairs` unique words, duplicate each and shuffle into a fresh grid.
    fn deal(&mut self) {
        self.timers.cancel_all();
        let mut pool: Vec<&'static str> = crate::MEMORY_WORDS.to_vec();
        pool.shuffle(&mut self.rng);
        pool.truncate(self.pairs);
        let mut values: Vec<&'static str> = pool.iter().flat_map(|w| [*w, *w]).collect();
        values.shuffle(&mut self.rng);
        self.cards = values
            .into_iter()
            .map(|value| Card {
                value,
                revealed: false,
                matched: false,
            })
            .collect();
        self.first = None;
        self.locked = false;
        self.matches = 0;
        self.started_at = None;
        self.elapsed_ms = 0.0;
        self.finished_ms = None;
        self.result = None;
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn pairs(&self) -> usize {
        self.pairs
    }

    pub fn matches(&self) -> usize {
        self.matches
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.finished_ms.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.finished_ms.is_some()
    }

    /// Last sampled clock value, or the final time once complete.
    pub fn elapsed_ms(&self) -> f64 {
        match self.finished_ms {
            Some(ms) => ms as f64,
            None => self.elapsed_ms,
        }
    }

    pub fn flip(&mut self, idx: usize, now: f64) -> FlipOutcome {
        if self.locked || self.finished_ms.is_some() || idx >= self.cards.len() {
            return FlipOutcome::Ignored;
        }
        if self.started_at.is_none() {
            self.started_at = Some(now);
            self.elapsed_ms = 0.0;
            self.timers.at(now + CLOCK_SAMPLE_MS, Step::Sample);
            self.log.push(GameLog::new("memory_timer_start", json!({})));
        }
        let card = &mut self.cards[idx];
        if card.matched || card.revealed {
            return FlipOutcome::Ignored;
        }
        card.revealed = true;
        let value = card.value;

        let Some(first) = self.first else {
            self.first = Some(idx);
            self.log.push(GameLog::new(
                "memory_pick",
                json!({ "idx": idx, "value": value, "which": "first" }),
            ));
            return FlipOutcome::First;
        };

        self.locked = true;
        self.log.push(GameLog::new(
            "memory_pick",
            json!({ "idx": idx, "value": value, "which": "second" }),
        ));

        let first_value = self.cards[first].value;
        if first_value != value {
            self.log.push(GameLog::new(
                "memory_miss",
                json!({ "a": first_value, "b": value }),
            ));
            self.timers.at(now + MISMATCH_REVEAL_MS, Step::Conceal(first, idx));
            return FlipOutcome::Mismatch;
        }

        self.cards[first].matched = true;
        self.cards[idx].matched = true;
        self.matches += 1;
        self.first = None;
        self.locked = false;
        self.log.push(GameLog::new(
            "memory_match",
            json!({ "value": value, "matches": self.matches }),
        ));

        if self.matches == self.pairs {
            let started = self.started_at.unwrap_or(now);
            let time_ms = (now - started).max(0.0).round() as u64;
            self.finished_ms = Some(time_ms);
            self.timers.cancel_all();
            self.result = Some(RunResult::Memory { time_ms });
            return FlipOutcome::Complete;
        }
        FlipOutcome::Match
    }

    /// Re-deal without finishing the run (the panel "Restart" button).
    pub fn restart(&mut self) {
        self.deal();
        self.log.push(GameLog::new("memory_restart", json!({})));
    }

    fn apply(&mut self, step: Step, at: f64, now: f64) {
        match step {
            Step::Conceal(a, b) => {
                for i in [a, b] {
                    if let Some(card) = self.cards.get_mut(i) {
                        card.revealed = false;
                    }
                }
                self.first = None;
                self.locked = false;
            }
            Step::Sample => {
                if let Some(start) = self.started_at {
                    self.elapsed_ms = (now - start).max(0.0);
                    if self.finished_ms.is_none() {
                        self.timers.at(at + CLOCK_SAMPLE_MS, Step::Sample);
                    }
                }
            }
        }
    }
}

impl Engine for MemoryGame {
    fn tick(&mut self, now: f64) {
        while let Some((at, step)) = self.timers.pop_due(now) {
            // Catch-up samples collapse into one; only the latest reading matters.
            if step == Step::Sample {
                self.timers.cancel_where(|s| *s == Step::Sample);
                let next = at + CLOCK_SAMPLE_MS * ((now - at) / CLOCK_SAMPLE_MS).floor();
                self.apply(step, next, now);
            } else {
                self.apply(step, at, now);
            }
        }
    }

    fn retry(&mut self, _now: f64) {
        self.deal();
    }

    fn teardown(&mut self) {
        self.timers.cancel_all();
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
    use std::collections::HashMap;

    fn pair_indices(g: &MemoryGame) -> Vec<(usize, usize)> {
        let mut by_value: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, c) in g.cards().iter().enumerate() {
            by_value.entry(c.value).or_default().push(i);
        }
        let mut pairs: Vec<(usize, usize)> = by_value.values().map(|v| (v[0], v[1])).collect();
        pairs.sort();
        pairs
    }

    fn mismatched(g: &MemoryGame) -> (usize, usize) {
        let first = g.cards()[0].value;
        let other = g.cards().iter().position(|c| c.value != first).unwrap();
        (0, other)
    }

    #[test]
    fn deal_draws_unique_words_each_twice() {
        let g = MemoryGame::with_seed(8, 1);
        assert_eq!(g.cards().len(), 16);
        let pairs = pair_indices(&g);
        assert_eq!(pairs.len(), 8);
        assert!(g.cards().iter().all(|c| !c.revealed && !c.matched));
    }

    #[test]
    fn timer_starts_on_first_flip_not_on_deal() {
        let mut g = MemoryGame::with_seed(8, 2);
        g.tick(5_000.0);
        assert!(!g.is_running());
        assert_eq!(g.flip(0, 5_000.0), FlipOutcome::First);
        assert!(g.is_running());
        g.tick(5_520.0);
        assert!((g.elapsed_ms() - 520.0).abs() < 1e-9);
        let log = g.drain_log();
        assert_eq!(log[0].event_type, "memory_timer_start");
        assert_eq!(log[1].event_type, "memory_pick");
    }

    #[test]
    fn mismatch_locks_until_conceal() {
        let mut g = MemoryGame::with_seed(8, 3);
        let (a, b) = mismatched(&g);
        let third = (0..g.cards().len()).find(|i| *i != a && *i != b).unwrap();

        g.flip(a, 0.0);
        assert_eq!(g.flip(b, 100.0), FlipOutcome::Mismatch);
        assert!(g.is_locked());
        assert_eq!(g.flip(third, 200.0), FlipOutcome::Ignored);
        assert!(!g.cards()[third].revealed);

        g.tick(100.0 + MISMATCH_REVEAL_MS);
        assert!(!g.is_locked());
        assert!(!g.cards()[a].revealed);
        assert!(!g.cards()[b].revealed);
        assert_eq!(g.matches(), 0);
    }

    #[test]
    fn matching_every_pair_completes_with_elapsed_time() {
        let mut g = MemoryGame::with_seed(4, 9);
        let pairs = pair_indices(&g);
        let mut now = 1_000.0;
        for (i, (a, b)) in pairs.iter().enumerate() {
            g.flip(*a, now);
            now += 100.0;
            let outcome = g.flip(*b, now);
            if i + 1 == pairs.len() {
                assert_eq!(outcome, FlipOutcome::Complete);
            } else {
                assert_eq!(outcome, FlipOutcome::Match);
            }
            now += 100.0;
        }
        assert!(g.is_complete());
        assert_eq!(g.take_result(), Some(RunResult::Memory { time_ms: 700 }));
        assert_eq!(g.flip(0, now), FlipOutcome::Ignored);
    }

    #[test]
    fn matched_cards_cannot_be_reflipped() {
        let mut g = MemoryGame::with_seed(8, 4);
        let (a, b) = pair_indices(&g)[0];
        g.flip(a, 0.0);
        g.flip(b, 10.0);
        assert_eq!(g.flip(a, 20.0), FlipOutcome::Ignored);
        assert_eq!(g.matches(), 1);
    }

    #[test]
    fn retry_deals_a_fresh_grid_and_stops_clock() {
        let mut g = MemoryGame::with_seed(8, 5);
        g.flip(0, 0.0);
        g.retry(10.0);
        assert!(!g.is_running());
        assert_eq!(g.elapsed_ms(), 0.0);
        assert!(g.cards().iter().all(|c| !c.revealed));
        g.restart();
        assert_eq!(g.drain_log().last().unwrap().event_type, "memory_restart");
    }
}
