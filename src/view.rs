//! Declarative description of one frame of UI.
//!
//! The controller produces a `View` for the current stage; the browser layer
//! turns it into DOM and routes clicks back as `Action`s. Nothing here touches
//! the DOM, so screens are testable natively.

use crate::games::GameId;
use crate::games::simon::Pad;
use crate::games::verbal::Judgment;
use crate::survey::QuestionKind;

/// Everything the player can do. Input text (name, answer, survey fields) is
/// pushed into the controller separately; actions only carry what was clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StartSession,
    BeginFirstGame,
    SimonStart,
    SimonPress(Pad),
    MemoryFlip(usize),
    MemoryRestart,
    VerbalJudge(Judgment),
    MathSubmit,
    SubmitSurvey,
    /// "Continue to Questions" or "Back to recap" on a game screen.
    ExitGame,
    Retry,
    DismissModal,
    PlayGame(GameId),
    SubmitAnother,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Ok,
    Secondary,
    Danger,
}

impl ButtonStyle {
    pub fn class(self) -> &'static str {
        match self {
            ButtonStyle::Primary => "btn primary",
            ButtonStyle::Ok => "btn ok",
            ButtonStyle::Secondary => "btn secondary",
            ButtonStyle::Danger => "btn danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionButton {
    pub label: String,
    pub action: Action,
    pub style: ButtonStyle,
}

impl ActionButton {
    pub fn new(label: impl Into<String>, action: Action, style: ButtonStyle) -> Self {
        Self {
            label: label.into(),
            action,
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfoCard {
    pub title: String,
    pub lines: Vec<String>,
    pub hint: Option<String>,
}

impl InfoCard {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: vec![body.into()],
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HudPill {
    pub label: &'static str,
    pub value: String,
}

impl HudPill {
    pub fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFace {
    pub label: String,
    pub revealed: bool,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurveyField {
    pub id: &'static str,
    pub prompt: &'static str,
    pub kind: QuestionKind,
    pub required: bool,
    pub answer: Option<String>,
}

/// Interactive element owned by the current screen.
#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    NameInput {
        value: String,
    },
    SimonPads {
        lit: Option<Pad>,
        enabled: bool,
    },
    CardGrid {
        cards: Vec<CardFace>,
        locked: bool,
    },
    WordPrompt {
        word: String,
        enabled: bool,
    },
    AnswerInput {
        prompt: String,
        value: String,
        enabled: bool,
    },
    Survey {
        block_id: &'static str,
        fields: Vec<SurveyField>,
    },
}

impl Widget {
    /// The widget with player-entered text blanked out.
    pub fn shape(&self) -> Widget {
        let mut w = self.clone();
        match &mut w {
            Widget::NameInput { value } | Widget::AnswerInput { value, .. } => value.clear(),
            Widget::Survey { fields, .. } => fields.iter_mut().for_each(|f| f.answer = None),
            _ => {}
        }
        w
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub cards: Vec<InfoCard>,
    pub hud: Vec<HudPill>,
    pub widget: Option<Widget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub body: String,
    pub actions: Vec<ActionButton>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Modal {
    pub title: String,
    pub lines: Vec<String>,
    pub good_news: bool,
    pub buttons: Vec<ActionButton>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub player_badge: String,
    pub stage_badge: String,
    pub status: String,
    pub screen: Screen,
    pub panel: Panel,
    pub modal: Option<Modal>,
}

impl View {
    /// Whether `action` is reachable from this frame. An open modal hides
    /// everything behind it.
    pub fn offers(&self, action: Action) -> bool {
        if let Some(modal) = &self.modal {
            return modal.buttons.iter().any(|b| b.action == action);
        }
        if self.panel.actions.iter().any(|b| b.action == action) {
            return true;
        }
        match (&self.screen.widget, action) {
            (Some(Widget::SimonPads { enabled, .. }), Action::SimonPress(_)) => *enabled,
            (Some(Widget::CardGrid { cards, locked }), Action::MemoryFlip(idx)) => {
                !*locked && cards.get(idx).is_some_and(|c| !c.revealed && !c.matched)
            }
            (Some(Widget::WordPrompt { enabled, .. }), Action::VerbalJudge(_)) => *enabled,
            (Some(Widget::AnswerInput { enabled, .. }), Action::MathSubmit) => *enabled,
            _ => false,
        }
    }

    /// True when `other` differs from `self` only in HUD values, the status line
    /// or text the player is typing, so the host can patch in place instead of
    /// rebuilding (which would steal focus from the input).
    pub fn same_layout(&self, other: &View) -> bool {
        self.player_badge == other.player_badge
            && self.stage_badge == other.stage_badge
            && self.screen.cards == other.screen.cards
            && self.screen.widget.as_ref().map(Widget::shape) == other.screen.widget.as_ref().map(Widget::shape)
            && self.panel == other.panel
            && self.modal == other.modal
            && self.screen.hud.len() == other.screen.hud.len()
            && self
                .screen
                .hud
                .iter()
                .zip(&other.screen.hud)
                .all(|(a, b)| a.label == b.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(widget: Option<Widget>, modal: Option<Modal>) -> View {
        View {
            player_badge: "Player: Ada".into(),
            stage_badge: "Stage: g2".into(),
            status: "Status: Ready.".into(),
            screen: Screen {
                cards: vec![InfoCard::new("Game 2", "Match")],
                hud: vec![HudPill::new("Time", "0.00s")],
                widget,
            },
            panel: Panel {
                title: "Memory Match".into(),
                body: String::new(),
                actions: vec![ActionButton::new("Restart", Action::MemoryRestart, ButtonStyle::Secondary)],
            },
            modal,
        }
    }

    fn grid() -> Widget {
        Widget::CardGrid {
            cards: vec![
                CardFace { label: "???".into(), revealed: false, matched: false },
                CardFace { label: "huck".into(), revealed: true, matched: false },
            ],
            locked: false,
        }
    }

    #[test]
    fn widget_actions_follow_widget_state() {
        let v = view(Some(grid()), None);
        assert!(v.offers(Action::MemoryFlip(0)));
        assert!(!v.offers(Action::MemoryFlip(1)));
        assert!(!v.offers(Action::MemoryFlip(7)));
        assert!(v.offers(Action::MemoryRestart));
        assert!(!v.offers(Action::SimonPress(Pad::Red)));
    }

    #[test]
    fn modal_blocks_underlying_controls() {
        let modal = Modal {
            title: "Memory Match Complete".into(),
            lines: vec![],
            good_news: true,
            buttons: vec![ActionButton::new("Try again", Action::Retry, ButtonStyle::Ok)],
        };
        let v = view(Some(grid()), Some(modal));
        assert!(v.offers(Action::Retry));
        assert!(!v.offers(Action::MemoryFlip(0)));
        assert!(!v.offers(Action::MemoryRestart));
    }

    #[test]
    fn hud_only_changes_keep_layout() {
        let a = view(Some(grid()), None);
        let mut b = a.clone();
        b.screen.hud[0].value = "1.25s".into();
        b.status = "Status: Loaded.".into();
        assert!(a.same_layout(&b));
        b.screen.widget = None;
        assert!(!a.same_layout(&b));
    }

    #[test]
    fn typing_does_not_change_layout() {
        let input = |value: &str| Widget::AnswerInput {
            prompt: "7 × 8".into(),
            value: value.into(),
            enabled: true,
        };
        let a = view(Some(input("")), None);
        let b = view(Some(input("56")), None);
        assert!(a.same_layout(&b));
        let c = view(
            Some(Widget::AnswerInput {
                prompt: "9 + 4".into(),
                value: String::new(),
                enabled: true,
            }),
            None,
        );
        assert!(!a.same_layout(&c));
    }
}
