// Dataset invariants for the word pools.
// These tests are native-friendly and avoid wasm/browser APIs.

use std::collections::HashSet;

use escape_lab::config::DEFAULT_MEMORY_PAIRS;

#[test]
fn memory_words_are_unique_and_non_empty() {
    let mut seen = HashSet::new();
    for w in escape_lab::MEMORY_WORDS {
        assert!(!w.trim().is_empty(), "blank word in MEMORY_WORDS");
        assert_eq!(w.trim(), *w, "word '{}' has surrounding whitespace", w);
        assert!(seen.insert(*w), "duplicate word '{}' in MEMORY_WORDS", w);
    }
}

#[test]
fn verbal_words_are_unique_and_non_empty() {
    let mut seen = HashSet::new();
    for w in escape_lab::VERBAL_WORDS {
        assert!(!w.trim().is_empty(), "blank word in VERBAL_WORDS");
        assert!(seen.insert(*w), "duplicate word '{}' in VERBAL_WORDS", w);
    }
}

#[test]
fn pools_are_large_enough_for_default_runs() {
    assert_eq!(escape_lab::MEMORY_WORDS.len(), 24);
    assert_eq!(escape_lab::VERBAL_WORDS.len(), 45);
    assert!(escape_lab::MEMORY_WORDS.len() >= DEFAULT_MEMORY_PAIRS);
}
