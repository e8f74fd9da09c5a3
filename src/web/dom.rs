//! Turns a `View` into DOM under `#etl-app`.
//!
//! Listeners are owned by the renderer and dropped on every rebuild together
//! with the elements they were bound to. Handlers only forward to the sinks;
//! redrawing happens on the next animation frame.

use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, Event, EventTarget, HtmlButtonElement, HtmlInputElement, HtmlTextAreaElement};

use crate::games::simon::Pad;
use crate::games::verbal::Judgment;
use crate::survey::QuestionKind;
use crate::view::{Action, ActionButton, InfoCard, Modal, View, Widget};

const ROOT_ID: &str = "etl-app";
const ANSWER_ID: &str = "etl-answer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Name,
    Answer,
    Survey(&'static str),
}

pub type ActionSink = Rc<dyn Fn(u64, Action)>;
pub type InputSink = Rc<dyn Fn(InputField, String)>;

pub struct Renderer {
    doc: Document,
    root: Element,
    on_action: ActionSink,
    on_input: InputSink,
    listeners: Vec<Closure<dyn FnMut(Event)>>,
    last: Option<(u64, View)>,
}

impl Renderer {
    pub fn mount(on_action: ActionSink, on_input: InputSink) -> Result<Self, JsValue> {
        let doc = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let root = match doc.get_element_by_id(ROOT_ID) {
            Some(el) => el,
            None => {
                let el = doc.create_element("div")?;
                el.set_id(ROOT_ID);
                doc.body()
                    .ok_or_else(|| JsValue::from_str("no body"))?
                    .append_child(&el)?;
                el
            }
        };
        Ok(Self {
            doc,
            root,
            on_action,
            on_input,
            listeners: Vec::new(),
            last: None,
        })
    }

    /// Bring the DOM in line with `view`: patch text when only the HUD or
    /// status moved, rebuild otherwise.
    pub fn draw(&mut self, view: &View, generation: u64) -> Result<(), JsValue> {
        let patchable = matches!(&self.last, Some((g, prev)) if *g == generation && prev.same_layout(view));
        if !patchable {
            self.rebuild(view, generation)?;
        } else if self.last.as_ref().is_some_and(|(_, prev)| prev != view) {
            self.patch(view);
        }
        self.last = Some((generation, view.clone()));
        Ok(())
    }

    fn patch(&self, view: &View) {
        for (i, pill) in view.screen.hud.iter().enumerate() {
            if let Some(el) = self.doc.get_element_by_id(&format!("etl-hud-{i}")) {
                el.set_text_content(Some(&pill.value));
            }
        }
        if let Some(el) = self.doc.get_element_by_id("etl-status") {
            el.set_text_content(Some(&view.status));
        }
    }

    fn rebuild(&mut self, view: &View, generation: u64) -> Result<(), JsValue> {
        self.root.set_inner_html("");
        self.listeners.clear();

        let top = self.el("div", "topbar")?;
        top.append_child(&self.text("span", "badge", &view.player_badge)?)?;
        top.append_child(&self.text("span", "badge", &view.stage_badge)?)?;
        self.root.append_child(&top)?;

        let layout = self.el("div", "layout")?;
        let screen = self.el("div", "screen")?;
        for card in &view.screen.cards {
            screen.append_child(&self.info_card(card)?)?;
        }
        if !view.screen.hud.is_empty() {
            let hud = self.el("div", "game-hud")?;
            for (i, pill) in view.screen.hud.iter().enumerate() {
                let p = self.text("div", "hud-pill", &format!("{}: ", pill.label))?;
                let value = self.text("span", "", &pill.value)?;
                value.set_id(&format!("etl-hud-{i}"));
                p.append_child(&value)?;
                hud.append_child(&p)?;
            }
            screen.append_child(&hud)?;
        }
        if let Some(widget) = &view.screen.widget {
            self.widget(&screen, widget, generation)?;
        }
        layout.append_child(&screen)?;

        let panel = self.el("aside", "panel")?;
        panel.append_child(&self.text("div", "panel-title", &view.panel.title)?)?;
        panel.append_child(&self.text("div", "panel-body", &view.panel.body)?)?;
        let actions = self.el("div", "panel-actions")?;
        for b in &view.panel.actions {
            let btn = self.action_button(b, generation)?;
            actions.append_child(&btn)?;
        }
        panel.append_child(&actions)?;
        layout.append_child(&panel)?;
        self.root.append_child(&layout)?;

        let status = self.text("div", "status", &view.status)?;
        status.set_id("etl-status");
        self.root.append_child(&status)?;

        if let Some(modal) = &view.modal {
            let m = self.modal(modal, generation)?;
            self.root.append_child(&m)?;
        } else if matches!(view.screen.widget, Some(Widget::AnswerInput { enabled: true, .. })) {
            if let Some(input) = self.doc.get_element_by_id(ANSWER_ID) {
                let _ = input.unchecked_into::<web_sys::HtmlElement>().focus();
            }
        }
        Ok(())
    }

    fn el(&self, tag: &str, class: &str) -> Result<Element, JsValue> {
        let el = self.doc.create_element(tag)?;
        if !class.is_empty() {
            el.set_class_name(class);
        }
        Ok(el)
    }

    fn text(&self, tag: &str, class: &str, text: &str) -> Result<Element, JsValue> {
        let el = self.el(tag, class)?;
        el.set_text_content(Some(text));
        Ok(el)
    }

    fn listen(
        &mut self,
        target: &EventTarget,
        event: &str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<(), JsValue> {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        self.listeners.push(closure);
        Ok(())
    }

    fn on_click(&mut self, target: &EventTarget, generation: u64, action: Action) -> Result<(), JsValue> {
        let sink = self.on_action.clone();
        self.listen(target, "click", move |_| sink(generation, action))
    }

    fn button(&mut self, label: &str, class: &str, enabled: bool, generation: u64, action: Action) -> Result<Element, JsValue> {
        let btn: HtmlButtonElement = self.text("button", class, label)?.dyn_into()?;
        btn.set_disabled(!enabled);
        self.on_click(&btn, generation, action)?;
        Ok(btn.into())
    }

    fn action_button(&mut self, b: &ActionButton, generation: u64) -> Result<Element, JsValue> {
        self.button(&b.label, b.style.class(), true, generation, b.action)
    }

    fn info_card(&self, card: &InfoCard) -> Result<Element, JsValue> {
        let c = self.el("div", "card")?;
        c.append_child(&self.text("div", "h1", &card.title)?)?;
        for line in &card.lines {
            c.append_child(&self.text("div", "p", line)?)?;
        }
        if let Some(hint) = &card.hint {
            c.append_child(&self.text("div", "puzzle-hint", hint)?)?;
        }
        Ok(c)
    }

    fn modal(&mut self, modal: &Modal, generation: u64) -> Result<Element, JsValue> {
        let backdrop = self.el("div", "modal-backdrop")?;
        let dialog = self.el("div", "modal")?;
        dialog.append_child(&self.text("div", "h1", &modal.title)?)?;
        for (i, line) in modal.lines.iter().enumerate() {
            let class = match (i, modal.good_news) {
                (0, _) => "p",
                (_, true) => "success",
                (_, false) => "puzzle-hint",
            };
            dialog.append_child(&self.text("div", class, line)?)?;
        }
        let actions = self.el("div", "modal-actions")?;
        for b in &modal.buttons {
            let btn = self.action_button(b, generation)?;
            actions.append_child(&btn)?;
        }
        dialog.append_child(&actions)?;
        backdrop.append_child(&dialog)?;
        Ok(backdrop)
    }

    fn widget(&mut self, parent: &Element, widget: &Widget, generation: u64) -> Result<(), JsValue> {
        match widget {
            Widget::NameInput { value } => {
                let input = self.input("etl-name", "Enter your name here", value, true)?;
                let sink = self.on_input.clone();
                let field = input.clone();
                self.listen(&input, "input", move |_| sink(InputField::Name, field.value()))?;
                self.on_enter(&input, generation, Action::StartSession)?;
                parent.append_child(&input)?;
            }
            Widget::SimonPads { lit, enabled } => {
                let grid = self.el("div", "simon-grid")?;
                for pad in Pad::ALL {
                    let mut class = format!("simon-btn simon-{}", pad.as_str());
                    if *lit == Some(pad) {
                        class.push_str(" lit");
                    }
                    let b = self.button("", &class, *enabled, generation, Action::SimonPress(pad))?;
                    grid.append_child(&b)?;
                }
                parent.append_child(&grid)?;
            }
            Widget::CardGrid { cards, locked } => {
                let grid = self.el("div", "memory-grid")?;
                for (idx, card) in cards.iter().enumerate() {
                    let mut class = String::from("mem-card");
                    if card.matched {
                        class.push_str(" matched");
                    } else if card.revealed {
                        class.push_str(" revealed");
                    }
                    let enabled = !*locked && !card.revealed && !card.matched;
                    let b = self.button(&card.label, &class, enabled, generation, Action::MemoryFlip(idx))?;
                    grid.append_child(&b)?;
                }
                parent.append_child(&grid)?;
            }
            Widget::WordPrompt { word, enabled } => {
                parent.append_child(&self.text("div", "word-box", word)?)?;
                let row = self.el("div", "row")?;
                for (label, choice) in [("Seen", Judgment::Seen), ("New", Judgment::New)] {
                    let b = self.button(label, "btn primary", *enabled, generation, Action::VerbalJudge(choice))?;
                    row.append_child(&b)?;
                }
                parent.append_child(&row)?;
            }
            Widget::AnswerInput { prompt, value, enabled } => {
                parent.append_child(&self.text("div", "equation", prompt)?)?;
                let input = self.input(ANSWER_ID, "Type answer and press Enter", value, *enabled)?;
                let sink = self.on_input.clone();
                let field = input.clone();
                self.listen(&input, "input", move |_| sink(InputField::Answer, field.value()))?;
                self.on_enter(&input, generation, Action::MathSubmit)?;
                parent.append_child(&input)?;
            }
            Widget::Survey { block_id, fields } => {
                let terminal = self.el("div", "terminal")?;
                terminal.append_child(&self.text("div", "kbd", &format!("Survey block {block_id}"))?)?;
                for f in fields {
                    let card = self.el("div", "card")?;
                    card.append_child(&self.text("div", "h2", f.prompt)?)?;
                    match &f.kind {
                        QuestionKind::Choice { options } => {
                            let opts = self.el("div", "grid two")?;
                            for opt in options.iter().copied() {
                                let label = self.el("label", "choice")?;
                                let radio: HtmlInputElement = self.doc.create_element("input")?.dyn_into()?;
                                radio.set_type("radio");
                                radio.set_name(f.id);
                                radio.set_value(opt);
                                radio.set_checked(f.answer.as_deref() == Some(opt));
                                let sink = self.on_input.clone();
                                let id = f.id;
                                self.listen(&radio, "change", move |_| sink(InputField::Survey(id), opt.to_string()))?;
                                label.append_child(&radio)?;
                                label.append_child(&self.text("span", "", opt)?)?;
                                opts.append_child(&label)?;
                            }
                            card.append_child(&opts)?;
                        }
                        QuestionKind::Text { placeholder } => {
                            let area: HtmlTextAreaElement = self.doc.create_element("textarea")?.dyn_into()?;
                            area.set_placeholder(placeholder);
                            area.set_value(f.answer.as_deref().unwrap_or_default());
                            let sink = self.on_input.clone();
                            let id = f.id;
                            let field = area.clone();
                            self.listen(&area, "input", move |_| sink(InputField::Survey(id), field.value()))?;
                            card.append_child(&area)?;
                        }
                    }
                    let req = if f.required { "Required" } else { "Optional" };
                    card.append_child(&self.text("div", "puzzle-hint", req)?)?;
                    terminal.append_child(&card)?;
                }
                parent.append_child(&terminal)?;
            }
        }
        Ok(())
    }

    fn input(&self, id: &str, placeholder: &str, value: &str, enabled: bool) -> Result<HtmlInputElement, JsValue> {
        let input: HtmlInputElement = self.el("input", "input")?.dyn_into()?;
        input.set_id(id);
        input.set_placeholder(placeholder);
        input.set_value(value);
        input.set_disabled(!enabled);
        Ok(input)
    }

    fn on_enter(&mut self, target: &EventTarget, generation: u64, action: Action) -> Result<(), JsValue> {
        let sink = self.on_action.clone();
        self.listen(target, "keydown", move |evt: Event| {
            if let Some(key) = evt.dyn_ref::<web_sys::KeyboardEvent>() {
                if key.key() == "Enter" {
                    sink(generation, action);
                }
            }
        })
    }
}
