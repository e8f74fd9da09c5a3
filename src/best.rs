//! Best-score ledger. Values only ever move in the "better" direction.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::error::StorageError;
use crate::games::{RunResult, format_seconds};
use crate::storage::{self, KeyValueStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimonBest {
    pub best_level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryBest {
    /// Lower is better; `None` until the first completed run.
    pub best_time_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBest {
    pub best_score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BestScores {
    pub simon: SimonBest,
    pub memory: MemoryBest,
    pub verbal: ScoreBest,
    pub math: ScoreBest,
}

/// True iff `new_ms` beats the stored time. An empty best always loses.
pub fn better_time(new_ms: u64, old_ms: Option<u64>) -> bool {
    match old_ms {
        None => true,
        Some(old) => new_ms < old,
    }
}

/// Strictly-higher comparator for level and score based games.
pub fn better_score(new: u32, old: u32) -> bool {
    new > old
}

/// Outcome of recording one finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerUpdate {
    pub improved: bool,
    /// Ledger as re-read from storage after any write.
    pub best: BestScores,
    pub run_stats: Value,
    pub best_stats: Value,
}

impl BestScores {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        storage::load_or(store, storage::KEY_BEST, BestScores::default())
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        storage::save(store, storage::KEY_BEST, self)
    }

    /// Apply the game's comparator and write back only on strict improvement.
    pub fn record(store: &dyn KeyValueStore, run: RunResult) -> Result<LedgerUpdate, StorageError> {
        let mut best = Self::load(store);
        let improved = match run {
            RunResult::Simon { level } => {
                let better = better_score(level, best.simon.best_level);
                if better {
                    best.simon.best_level = level;
                }
                better
            }
            RunResult::Memory { time_ms } => {
                let better = better_time(time_ms, best.memory.best_time_ms);
                if better {
                    best.memory.best_time_ms = Some(time_ms);
                }
                better
            }
            RunResult::Verbal { score } => {
                let better = better_score(score, best.verbal.best_score);
                if better {
                    best.verbal.best_score = score;
                }
                better
            }
            RunResult::Math { score } => {
                let better = better_score(score, best.math.best_score);
                if better {
                    best.math.best_score = score;
                }
                better
            }
        };
        if improved {
            best.save(store)?;
            info!(game = run.game().as_str(), "new best");
        }

        let best = Self::load(store);
        let (run_stats, best_stats) = match run {
            RunResult::Simon { level } => (
                json!({ "level": level, "improved": improved }),
                json!({ "bestLevel": best.simon.best_level }),
            ),
            RunResult::Memory { time_ms } => (
                json!({ "timeMs": time_ms, "improved": improved }),
                json!({ "bestTimeMs": best.memory.best_time_ms }),
            ),
            RunResult::Verbal { score } => (
                json!({ "score": score, "improved": improved }),
                json!({ "bestScore": best.verbal.best_score }),
            ),
            RunResult::Math { score } => (
                json!({ "score": score, "improved": improved }),
                json!({ "bestScore": best.math.best_score }),
            ),
        };
        Ok(LedgerUpdate {
            improved,
            best,
            run_stats,
            best_stats,
        })
    }

    pub fn memory_label(&self) -> String {
        self.memory
            .best_time_ms
            .map(format_seconds)
            .unwrap_or_else(|| "—".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn better_time_treats_empty_best_as_beatable() {
        assert!(better_time(90_000, None));
        assert!(better_time(10, Some(11)));
        assert!(!better_time(11, Some(11)));
        assert!(!better_time(12, Some(11)));
    }

    #[test]
    fn memory_best_never_regresses() {
        let store = MemoryStore::new();
        let times = [30_000u64, 25_000, 40_000, 25_000, 12_000, 90_000];
        let mut last: Option<u64> = None;
        for t in times {
            let update = BestScores::record(&store, RunResult::Memory { time_ms: t }).unwrap();
            let now = update.best.memory.best_time_ms;
            if let (Some(prev), Some(cur)) = (last, now) {
                assert!(cur <= prev);
            }
            assert_eq!(update.improved, better_time(t, last));
            last = now;
        }
        assert_eq!(last, Some(12_000));
    }

    #[test]
    fn ties_do_not_count_as_improvement() {
        let store = MemoryStore::new();
        assert!(BestScores::record(&store, RunResult::Math { score: 4 }).unwrap().improved);
        let again = BestScores::record(&store, RunResult::Math { score: 4 }).unwrap();
        assert!(!again.improved);
        assert_eq!(again.best.math.best_score, 4);
    }

    #[test]
    fn stats_payloads_use_wire_names() {
        let store = MemoryStore::new();
        let up = BestScores::record(&store, RunResult::Simon { level: 3 }).unwrap();
        assert_eq!(up.run_stats, json!({ "level": 3, "improved": true }));
        assert_eq!(up.best_stats, json!({ "bestLevel": 3 }));

        let raw = store.get_item(storage::KEY_BEST).unwrap();
        let v: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["simon"]["bestLevel"], 3);
        assert!(v["memory"]["bestTimeMs"].is_null());
    }

    #[test]
    fn corrupted_ledger_reads_as_defaults() {
        let store = MemoryStore::new();
        store.set_item(storage::KEY_BEST, "[]").unwrap();
        assert_eq!(BestScores::load(&store), BestScores::default());
    }
}
