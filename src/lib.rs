//! Escape the Lab core crate.
//!
//! Four mini-games (Simon Says, timed Memory Match, Verbal Memory, Math Race)
//! interleaved with survey blocks, a persisted best-score ledger and buffered
//! telemetry that is uploaded in one batch on the recap screen or page exit.
//! Everything except the `web` module is plain Rust and runs natively; the
//! browser host is exposed through `start_app()`.

use wasm_bindgen::prelude::*;

pub mod best;
pub mod config;
pub mod controller;
pub mod error;
pub mod games;
pub mod logging;
pub mod session;
pub mod storage;
pub mod survey;
pub mod telemetry;
pub mod view;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::AppConfig;
pub use controller::{Controller, Effect};
pub use error::AppError;

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

// -----------------------------------------------------------------------------
// Word pools
// -----------------------------------------------------------------------------

/// Card faces for Memory Match; each run draws `memory_pairs` of these.
pub const MEMORY_WORDS: &[&str] = &[
    "disc", "handler", "cutter", "huck", "layout", "mark",
    "stack", "zone", "pull", "flick", "backhand", "forehand",
    "dump", "swing", "break", "bid", "stall", "sideline",
    "reset", "poach", "clapcatch", "endzone", "upline", "pivot",
];

/// Word pool for Verbal Memory.
pub const VERBAL_WORDS: &[&str] = &[
    "disc", "handler", "cutter", "huck", "layout", "mark", "stack", "zone", "pull", "flick", "backhand", "forehand",
    "dump", "swing", "break", "bid", "stall", "sideline", "reset", "poach", "upline", "pivot", "cup", "force",
    "deep", "under", "sidestack", "vert", "iso", "brick", "turnover", "callahan", "hammer", "scoober", "blade",
    "sky", "clapcatch", "pancake", "toe-drag", "endzone", "line", "D-line", "O-line", "pull-play", "handler-set",
];

// -----------------------------------------------------------------------------
// Unified entrypoint
// -----------------------------------------------------------------------------

/// Boot the browser app. `config_json` is an optional `AppConfig` JSON object.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn start_app(config_json: Option<String>) -> Result<(), JsValue> {
    web::start_app(config_json)
}
