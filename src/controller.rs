//! Stage controller: owns the session, the mounted engine or survey form, and
//! turns player actions and clock ticks into state changes, telemetry and a
//! fresh `View`.

use std::fmt;
use std::rc::Rc;

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::best::BestScores;
use crate::config::AppConfig;
use crate::error::{AppError, StorageError};
use crate::games::math::LIVES as MATH_LIVES;
use crate::games::verbal::LIVES as VERBAL_LIVES;
use crate::games::{ActiveGame, GameId, MathGame, MemoryGame, RunResult, SimonGame, VerbalGame};
use crate::session::{Mode, Session, StageId};
use crate::storage::{self, KeyValueStore};
use crate::survey::{self, SurveyError, SurveyForm};
use crate::telemetry::{FlushOutcome, Telemetry, Transport, UPLOAD_FAILED_STATUS};
use crate::view::{
    Action, ActionButton, ButtonStyle, CardFace, HudPill, InfoCard, Modal, Panel, Screen, SurveyField, View,
    Widget,
};

/// Work the host must perform outside the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Upload the telemetry buffer, then report back through `note_flush`.
    Flush,
    /// Reload the page after a reset.
    Reload,
}

#[derive(Debug, Clone, PartialEq)]
enum Dialog {
    GameOver { run: RunResult, improved: bool },
    Notice {
        title: &'static str,
        message: String,
        ok_label: &'static str,
    },
}

pub struct Controller {
    config: AppConfig,
    store: Rc<dyn KeyValueStore>,
    session: Session,
    telemetry: Rc<Telemetry>,
    active: Option<ActiveGame>,
    form: Option<SurveyForm>,
    dialog: Option<Dialog>,
    name_input: String,
    answer_input: String,
    status: String,
    effects: Vec<Effect>,
    generation: u64,
    seed: Option<u64>,
    /// Problem serial the typed answer belongs to.
    math_serial: u64,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("session", &self.session)
            .field("active", &self.active.as_ref().map(ActiveGame::id))
            .field("dialog", &self.dialog)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl Controller {
    pub fn new(
        config: AppConfig,
        store: Rc<dyn KeyValueStore>,
        transport: Box<dyn Transport>,
    ) -> Result<Self, AppError> {
        let telemetry = Telemetry::new(store.clone(), transport, config.endpoint().map(str::to_string));
        Self::with_telemetry(config, store, telemetry)
    }

    pub fn with_telemetry(
        config: AppConfig,
        store: Rc<dyn KeyValueStore>,
        telemetry: Telemetry,
    ) -> Result<Self, AppError> {
        config.validate()?;
        let session = Session::load(store.as_ref())?;
        Ok(Self {
            config,
            store,
            session,
            telemetry: Rc::new(telemetry),
            active: None,
            form: None,
            dialog: None,
            name_input: String::new(),
            answer_input: String::new(),
            status: String::new(),
            effects: Vec::new(),
            generation: 0,
            seed: None,
            math_serial: 0,
        })
    }

    /// Seed every engine this controller mounts, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Mount whatever the restored stage needs. Call once after construction.
    pub fn boot(&mut self, now: f64) {
        self.status = "Loaded.".to_string();
        info!(
            stage = self.session.stage().as_str(),
            mode = self.session.mode().as_str(),
            "session restored"
        );
        self.mount(now);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn telemetry(&self) -> Rc<Telemetry> {
        self.telemetry.clone()
    }

    pub fn active_game(&self) -> Option<&ActiveGame> {
        self.active.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Bumped whenever the screen is remounted. Listeners bound for an older
    /// generation must not dispatch.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn set_name_input(&mut self, value: &str) {
        self.name_input = value.to_string();
    }

    pub fn set_answer_input(&mut self, value: &str) {
        self.answer_input = value.to_string();
    }

    pub fn answer_survey(&mut self, question_id: &str, value: &str) -> Result<(), SurveyError> {
        match self.form.as_mut() {
            Some(form) => form.answer(question_id, value),
            None => Err(SurveyError::UnknownQuestion {
                question_id: question_id.to_string(),
            }),
        }
    }

    /// Persist the new stage and remount. The only way the stage changes.
    pub fn transition(&mut self, stage: StageId, now: f64) -> Result<(), StorageError> {
        let from = self.session.stage();
        let saved = self.session.set_stage(self.store.as_ref(), stage);
        info!(from = from.as_str(), to = stage.as_str(), "stage transition");
        self.mount(now);
        saved
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), StorageError> {
        self.session.set_mode(self.store.as_ref(), mode)
    }

    /// Record the result of a flush the host ran for an `Effect::Flush`.
    pub fn note_flush(&mut self, outcome: &FlushOutcome) {
        match outcome {
            FlushOutcome::Sent { count } => {
                debug!(count, "flush acknowledged");
                self.status = "Responses uploaded.".to_string();
            }
            FlushOutcome::Failed(_) => self.status = UPLOAD_FAILED_STATUS.to_string(),
            FlushOutcome::Skipped | FlushOutcome::Empty | FlushOutcome::AlreadyFlushing => {}
        }
    }

    /// Page-exit hook.
    pub fn flush_on_exit(&self) {
        self.telemetry.flush_on_exit(&self.session);
    }

    /// "Submit Another Response": drop the session keys and ask for a reload.
    /// Unsent telemetry stays buffered.
    pub fn reset(&mut self) {
        if let Some(game) = self.active.as_mut() {
            game.engine_mut().teardown();
        }
        storage::clear(self.store.as_ref(), storage::RESET_KEYS);
        info!("session reset");
        self.effects.push(Effect::Reload);
    }

    fn mount(&mut self, now: f64) {
        if let Some(mut old) = self.active.take() {
            old.engine_mut().teardown();
        }
        self.generation += 1;
        self.dialog = None;
        self.answer_input.clear();
        self.math_serial = 0;

        let stage = self.session.stage();
        let seed = self.seed.map(|s| s.wrapping_add(self.generation));
        self.active = stage.game().map(|game| match game {
            GameId::Simon => ActiveGame::Simon(match seed {
                Some(s) => SimonGame::with_seed(s),
                None => SimonGame::new(),
            }),
            GameId::Memory => ActiveGame::Memory(match seed {
                Some(s) => MemoryGame::with_seed(self.config.memory_pairs, s),
                None => MemoryGame::new(self.config.memory_pairs),
            }),
            GameId::Verbal => ActiveGame::Verbal(match seed {
                Some(s) => VerbalGame::with_seed(self.config.verbal_repeat_probability, s),
                None => VerbalGame::new(self.config.verbal_repeat_probability),
            }),
            GameId::Math => ActiveGame::Math(match seed {
                Some(s) => MathGame::with_seed(s, now),
                None => MathGame::new(now),
            }),
        });
        self.form = survey::block(stage).map(SurveyForm::new);

        if stage == StageId::End && self.session.participant_id().is_some() {
            self.effects.push(Effect::Flush);
        }
    }

    fn warn_failure(&mut self, what: &str, err: &dyn fmt::Display) {
        warn!(%err, "{what}");
        self.status = format!("{what}: {err}");
    }

    fn log_event(&mut self, event_type: &str, payload: Value) {
        if let Err(err) = self.telemetry.log_event(&self.session, event_type, payload) {
            self.warn_failure("Could not save log", &err);
        }
    }

    fn go(&mut self, stage: StageId, now: f64) {
        if let Err(err) = self.transition(stage, now) {
            self.warn_failure("Could not save progress", &err);
        }
    }

    /// Where a game screen leads once the player is done with it.
    fn after_game(&self) -> StageId {
        match self.session.mode() {
            Mode::Freeplay => StageId::End,
            Mode::Normal => self.session.stage().next(),
        }
    }

    fn exit_label(&self) -> &'static str {
        match self.session.mode() {
            Mode::Freeplay => "Back to recap",
            Mode::Normal => "Continue to Questions",
        }
    }

    /// Advance the mounted engine's timers.
    pub fn tick(&mut self, now: f64) {
        if let Some(game) = self.active.as_mut() {
            game.engine_mut().tick(now);
        }
        self.collect_engine_output();
    }

    /// Apply an action if the current view offers it. Anything else is a stale
    /// click from an older frame and is dropped.
    ///
    /// Due timers land first, except for a typed math answer: that is judged
    /// against the problem on screen even if its deadline has just passed.
    pub fn dispatch(&mut self, action: Action, now: f64) {
        let judge_first = action == Action::MathSubmit;
        if !judge_first {
            self.tick(now);
        }
        if !self.view(now).offers(action) {
            debug!(?action, "ignoring action not offered by current view");
            return;
        }

        match action {
            Action::StartSession => self.start_session(now),
            Action::BeginFirstGame => {
                if let Err(err) = self.set_mode(Mode::Normal) {
                    self.warn_failure("Could not save progress", &err);
                }
                self.log_event("enter_game", json!({ "game": GameId::Simon.as_str() }));
                self.go(StageId::G1, now);
            }
            Action::SimonStart => {
                if let Some(ActiveGame::Simon(g)) = self.active.as_mut() {
                    g.start(now);
                }
            }
            Action::SimonPress(pad) => {
                if let Some(ActiveGame::Simon(g)) = self.active.as_mut() {
                    g.press(pad, now);
                }
            }
            Action::MemoryFlip(idx) => {
                if let Some(ActiveGame::Memory(g)) = self.active.as_mut() {
                    g.flip(idx, now);
                }
            }
            Action::MemoryRestart => {
                if let Some(ActiveGame::Memory(g)) = self.active.as_mut() {
                    g.restart();
                }
            }
            Action::VerbalJudge(choice) => {
                if let Some(ActiveGame::Verbal(g)) = self.active.as_mut() {
                    g.judge(choice);
                }
            }
            Action::MathSubmit => {
                if let Some(ActiveGame::Math(g)) = self.active.as_mut() {
                    let outcome = g.submit(&self.answer_input, now);
                    if outcome != crate::games::math::SubmitOutcome::Ignored {
                        self.answer_input.clear();
                    }
                }
            }
            Action::SubmitSurvey => self.submit_survey(now),
            Action::ExitGame => {
                let next = self.after_game();
                self.go(next, now);
            }
            Action::Retry => {
                self.dialog = None;
                self.answer_input.clear();
                if let Some(game) = self.active.as_mut() {
                    game.engine_mut().retry(now);
                }
            }
            Action::DismissModal => self.dialog = None,
            Action::PlayGame(game) => {
                if let Err(err) = self.set_mode(Mode::Freeplay) {
                    self.warn_failure("Could not save progress", &err);
                }
                self.go(stage_for(game), now);
            }
            Action::SubmitAnother => self.reset(),
        }
        self.collect_engine_output();
        if judge_first {
            self.tick(now);
        }
    }

    fn start_session(&mut self, now: f64) {
        let name = self.name_input.trim().to_string();
        if name.is_empty() && self.config.require_participant_code {
            self.dialog = Some(Dialog::Notice {
                title: "Nope",
                message: "Enter your name.".to_string(),
                ok_label: "Fine",
            });
            return;
        }
        let participant = if name.is_empty() {
            self.session.anonymous_id()
        } else {
            name
        };
        let store = self.store.clone();
        let saved = self
            .session
            .set_participant(store.as_ref(), participant)
            .and_then(|_| self.session.set_mode(store.as_ref(), Mode::Normal));
        if let Err(err) = saved {
            self.warn_failure("Could not save progress", &err);
        }
        info!(participant = self.session.participant_id(), "session started");
        let started_at = self
            .session
            .started_at()
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        self.log_event("session_start", json!({ "startedAt": started_at }));
        self.log_event("enter_game", json!({ "game": GameId::Simon.as_str() }));
        self.status = "Ready.".to_string();
        self.go(StageId::G1, now);
    }

    fn submit_survey(&mut self, now: f64) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        let answers = match form.submit() {
            Ok(answers) => answers,
            Err(err) => {
                form.clear();
                debug!(%err, "survey block incomplete");
                self.dialog = Some(Dialog::Notice {
                    title: "Terminal Error",
                    message: err.to_string(),
                    ok_label: "Try again",
                });
                return;
            }
        };
        let block_id = form.block().id;
        let question_ids = form.block().question_ids();

        for (question_id, response) in answers {
            if let Err(err) = self.telemetry.log_response(&self.session, question_id, response) {
                self.warn_failure("Could not save log", &err);
            }
        }
        self.log_event(
            "survey_block_complete",
            json!({ "blockId": block_id, "questions": question_ids }),
        );
        let stage = self.session.stage();
        if stage == StageId::Q4 {
            let finished_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            self.log_event("session_complete", json!({ "finishedAt": finished_at }));
        }
        self.go(stage.next(), now);
    }

    /// Move engine logs into telemetry and settle a finished run.
    fn collect_engine_output(&mut self) {
        if let Some(ActiveGame::Math(g)) = self.active.as_ref() {
            if g.problem_serial() != self.math_serial {
                self.math_serial = g.problem_serial();
                self.answer_input.clear();
            }
        }
        let Some(game) = self.active.as_mut() else {
            return;
        };
        let engine = game.engine_mut();
        let logs = engine.drain_log();
        let result = engine.take_result();
        for entry in logs {
            self.log_event(entry.event_type, entry.payload);
        }
        if let Some(run) = result {
            self.game_over(run);
        }
    }

    fn game_over(&mut self, run: RunResult) {
        let game = run.game();
        let improved = match BestScores::record(self.store.as_ref(), run) {
            Ok(update) => {
                if let Err(err) =
                    self.telemetry
                        .log_score(&self.session, game, update.run_stats, update.best_stats)
                {
                    self.warn_failure("Could not save log", &err);
                }
                update.improved
            }
            Err(err) => {
                self.warn_failure("Could not save best score", &err);
                false
            }
        };
        match run {
            RunResult::Simon { level } => {
                self.log_event("game_over", json!({ "game": game.as_str(), "level": level }))
            }
            RunResult::Verbal { score } | RunResult::Math { score } => {
                self.log_event("game_over", json!({ "game": game.as_str(), "score": score }))
            }
            RunResult::Memory { .. } => {}
        }
        info!(game = game.as_str(), improved, "game over");
        self.dialog = Some(Dialog::GameOver { run, improved });
    }

    /// Describe the current frame.
    pub fn view(&self, now: f64) -> View {
        let (screen, panel) = if self.session.participant_id().is_none() {
            self.start_view()
        } else {
            match self.session.stage() {
                StageId::G1 | StageId::G2 | StageId::G3 | StageId::G4 => self.game_view(now),
                StageId::Q1 | StageId::Q2 | StageId::Q3 | StageId::Q4 => self.survey_view(),
                StageId::End => self.recap_view(),
                StageId::Start => self.hub_view(),
            }
        };
        View {
            player_badge: self.session.player_badge(),
            stage_badge: self.session.stage_badge(),
            status: format!("Status: {}", self.status),
            screen,
            panel,
            modal: self.dialog.as_ref().map(|d| self.modal_view(d)),
        }
    }

    fn start_view(&self) -> (Screen, Panel) {
        (
            Screen {
                cards: vec![
                    InfoCard::new("Escape the Lab", "With some fun ;)."),
                    InfoCard::new(
                        "Your Name",
                        "Type your name so your scores and answers are labeled correctly.",
                    ),
                ],
                hud: Vec::new(),
                widget: Some(Widget::NameInput {
                    value: self.name_input.clone(),
                }),
            },
            Panel {
                title: "Start".into(),
                body: "Enter name, then begin.".into(),
                actions: vec![ActionButton::new("Start", Action::StartSession, ButtonStyle::Ok)],
            },
        )
    }

    fn hub_view(&self) -> (Screen, Panel) {
        (
            Screen {
                cards: vec![
                    InfoCard::new(
                        "Lab Corridor",
                        "There are 4 games and 4 question sections. After each game, you'll answer questions, then move on to the next game.",
                    ),
                    InfoCard::new(
                        "How this works",
                        "Each game ends when you fail (or finish). You can retry any game to improve your score/time. New high scores are saved automatically.",
                    )
                    .with_hint("Tip: Try each game multiple times. The lab respects effort. Kind of."),
                ],
                hud: Vec::new(),
                widget: None,
            },
            Panel {
                title: "Begin".into(),
                body: "Start Game 1 when ready.".into(),
                actions: vec![ActionButton::new(
                    "Begin Game 1: Simon Says",
                    Action::BeginFirstGame,
                    ButtonStyle::Ok,
                )],
            },
        )
    }

    fn game_view(&self, now: f64) -> (Screen, Panel) {
        let best = BestScores::load(self.store.as_ref());
        let exit = ActionButton::new(self.exit_label(), Action::ExitGame, ButtonStyle::Ok);
        let Some(game) = self.active.as_ref() else {
            return self.hub_view();
        };
        match game {
            ActiveGame::Simon(g) => (
                Screen {
                    cards: vec![InfoCard::new(
                        "Game 1: Simon Says",
                        "Repeat the sequence. Lose when you click wrong.",
                    )],
                    hud: vec![
                        HudPill::new("Level", g.level().to_string()),
                        HudPill::new("Best", best.simon.best_level.to_string()),
                        HudPill::new("Status", g.status_text()),
                    ],
                    widget: Some(Widget::SimonPads {
                        lit: g.lit(),
                        enabled: g.accepting_input(),
                    }),
                },
                Panel {
                    title: "Simon".into(),
                    body: "Press Start, repeat the sequence.".into(),
                    actions: vec![
                        ActionButton::new("Start", Action::SimonStart, ButtonStyle::Ok),
                        ActionButton::new(
                            match self.session.mode() {
                                Mode::Freeplay => "Back to recap",
                                Mode::Normal => "Continue",
                            },
                            Action::ExitGame,
                            ButtonStyle::Secondary,
                        ),
                    ],
                },
            ),
            ActiveGame::Memory(g) => (
                Screen {
                    cards: vec![InfoCard::new(
                        "Game 2: Memory Match (Timed)",
                        "Match all pairs as fast as possible. Beat your best time.",
                    )],
                    hud: vec![
                        HudPill::new("Time", format!("{:.2}s", g.elapsed_ms() / 1000.0)),
                        HudPill::new("Matches", format!("{}/{}", g.matches(), g.pairs())),
                        HudPill::new("Best", best.memory_label()),
                    ],
                    widget: Some(Widget::CardGrid {
                        cards: g
                            .cards()
                            .iter()
                            .map(|c| CardFace {
                                label: if c.revealed || c.matched {
                                    c.value.to_string()
                                } else {
                                    "???".to_string()
                                },
                                revealed: c.revealed,
                                matched: c.matched,
                            })
                            .collect(),
                        locked: g.is_locked() || g.is_complete(),
                    }),
                },
                Panel {
                    title: "Memory Match".into(),
                    body: "Timer starts on first flip.".into(),
                    actions: vec![
                        ActionButton::new("Restart", Action::MemoryRestart, ButtonStyle::Secondary),
                        exit,
                    ],
                },
            ),
            ActiveGame::Verbal(g) => (
                Screen {
                    cards: vec![InfoCard::new(
                        "Game 3: Verbal Memory",
                        format!("Seen or New. {VERBAL_LIVES} lives. No back-to-back repeats."),
                    )],
                    hud: vec![
                        HudPill::new("Score", g.score().to_string()),
                        HudPill::new("Lives", g.lives().to_string()),
                        HudPill::new("Best", best.verbal.best_score.to_string()),
                    ],
                    widget: Some(Widget::WordPrompt {
                        word: g.current_word().unwrap_or_default().to_string(),
                        enabled: !g.is_over() && g.current_word().is_some(),
                    }),
                },
                Panel {
                    title: "Verbal Memory".into(),
                    body: "Lock in".into(),
                    actions: vec![exit],
                },
            ),
            ActiveGame::Math(g) => (
                Screen {
                    cards: vec![InfoCard::new("Game 4: Math Race", "5 seconds per question.")],
                    hud: vec![
                        HudPill::new("Score", g.score().to_string()),
                        HudPill::new("Lives", format!("{}/{MATH_LIVES}", g.lives())),
                        HudPill::new("Time", format!("{:.2}s", g.time_left_ms(now) / 1000.0)),
                        HudPill::new("Best", best.math.best_score.to_string()),
                    ],
                    widget: Some(Widget::AnswerInput {
                        prompt: g.prompt_text(),
                        value: self.answer_input.clone(),
                        enabled: g.accepting_input(),
                    }),
                },
                Panel {
                    title: "Math Race".into(),
                    body: "5 seconds each. Countdown included.".into(),
                    actions: vec![exit],
                },
            ),
        }
    }

    fn survey_view(&self) -> (Screen, Panel) {
        let Some(form) = self.form.as_ref() else {
            return self.hub_view();
        };
        let block = form.block();
        let number = block.id.trim_start_matches('Q');
        let fields = block
            .questions
            .iter()
            .map(|q| SurveyField {
                id: q.id,
                prompt: q.prompt,
                kind: q.kind.clone(),
                required: q.required,
                answer: form.answer_for(q.id).map(str::to_string),
            })
            .collect();
        (
            Screen {
                cards: vec![InfoCard::new(block.title, block.blurb).with_hint("Answer to proceed.")],
                hud: Vec::new(),
                widget: Some(Widget::Survey {
                    block_id: block.id,
                    fields,
                }),
            },
            Panel {
                title: format!("Questions {number}"),
                body: format!("Survey block {number}."),
                actions: vec![ActionButton::new("Submit", Action::SubmitSurvey, ButtonStyle::Ok)],
            },
        )
    }

    fn recap_view(&self) -> (Screen, Panel) {
        let best = BestScores::load(self.store.as_ref());
        let scores = InfoCard {
            title: "Best Scores".into(),
            lines: vec![
                format!("Simon best level: {}", best.simon.best_level),
                format!("Memory best time: {}", best.memory_label()),
                format!("Verbal best score: {}", best.verbal.best_score),
                format!("Math best score: {}", best.math.best_score),
            ],
            hint: Some(
                "Every time you set a new high score, it's saved and updated too. Replay the games on the right panel to improve your scores."
                    .into(),
            ),
        };
        let mut actions: Vec<ActionButton> = [GameId::Simon, GameId::Memory, GameId::Verbal, GameId::Math]
            .into_iter()
            .map(|g| {
                let label = match g {
                    GameId::Simon => "Play Simon".to_string(),
                    other => format!("Play {}", other.title()),
                };
                ActionButton::new(label, Action::PlayGame(g), ButtonStyle::Ok)
            })
            .collect();
        actions.push(ActionButton::new(
            "Submit Another Response",
            Action::SubmitAnother,
            ButtonStyle::Danger,
        ));
        (
            Screen {
                cards: vec![
                    InfoCard::new(
                        "You Escaped",
                        "Your responses have been saved and submitted. Now go get a high score.",
                    ),
                    scores,
                ],
                hud: Vec::new(),
                widget: None,
            },
            Panel {
                title: "Freeplay".into(),
                body: "Pick a game to replay. Bests still save and log.".into(),
                actions,
            },
        )
    }

    fn modal_view(&self, dialog: &Dialog) -> Modal {
        match dialog {
            Dialog::Notice {
                title,
                message,
                ok_label,
            } => Modal {
                title: title.to_string(),
                lines: vec![message.clone()],
                good_news: false,
                buttons: vec![ActionButton::new(*ok_label, Action::DismissModal, ButtonStyle::Ok)],
            },
            Dialog::GameOver { run, improved } => {
                let (title, praise, nudge) = match run.game() {
                    GameId::Simon => ("Simon Says", "New best!", "Try again if you want."),
                    GameId::Memory => ("Memory Match Complete", "New best time!", "Try again to beat it."),
                    GameId::Verbal => ("Verbal Memory", "New best!", "Try again."),
                    GameId::Math => ("Math Race", "New best!", "Retry if you want."),
                };
                Modal {
                    title: title.to_string(),
                    lines: vec![
                        run.summary(),
                        (if *improved { praise } else { nudge }).to_string(),
                    ],
                    good_news: *improved,
                    buttons: vec![
                        ActionButton::new("Try again", Action::Retry, ButtonStyle::Ok),
                        ActionButton::new(self.exit_label(), Action::ExitGame, ButtonStyle::Secondary),
                    ],
                }
            }
        }
    }
}

fn stage_for(game: GameId) -> StageId {
    match game {
        GameId::Simon => StageId::G1,
        GameId::Memory => StageId::G2,
        GameId::Verbal => StageId::G3,
        GameId::Math => StageId::G4,
    }
}
