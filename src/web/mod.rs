//! Browser host: local storage, fetch/beacon transport, DOM renderer and the
//! animation-frame loop that drives the controller clock.

mod dom;
mod storage;
mod transport;

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::config::AppConfig;
use crate::controller::{Controller, Effect};
use crate::error::AppError;
use crate::logging;
use crate::storage::KeyValueStore;
use crate::telemetry::Telemetry;
use crate::view::Action;

pub use dom::{InputField, Renderer};
pub use storage::LocalStorage;
pub use transport::FetchTransport;

struct App {
    controller: Controller,
    renderer: Renderer,
}

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

fn to_js(err: impl Into<AppError>) -> JsValue {
    JsValue::from_str(&err.into().to_string())
}

fn performance_now() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

/// Boot the app into `#etl-app`. `config_json` may be omitted for defaults.
pub fn start_app(config_json: Option<String>) -> Result<(), JsValue> {
    let config = match config_json.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => AppConfig::from_json(raw).map_err(to_js)?,
        None => AppConfig::default(),
    };
    logging::init(config.level_filter().map_err(to_js)?);

    let window = web_sys::window().ok_or_else(|| to_js(AppError::Browser("no window".into())))?;
    let user_agent = window.navigator().user_agent().ok();
    let store: Rc<dyn KeyValueStore> = Rc::new(LocalStorage);
    let telemetry = Telemetry::new(
        store.clone(),
        Box::new(FetchTransport),
        config.endpoint().map(str::to_string),
    )
    .with_user_agent(user_agent);

    let mut controller = Controller::with_telemetry(config, store, telemetry).map_err(to_js)?;
    controller.boot(performance_now());
    let renderer = Renderer::mount(Rc::new(on_action), Rc::new(on_input))?;
    APP.with(|cell| cell.replace(Some(App { controller, renderer })));

    install_exit_hooks(&window)?;
    run_effects();
    start_loop();
    Ok(())
}

fn on_action(generation: u64, action: Action) {
    APP.with(|cell| {
        let Ok(mut guard) = cell.try_borrow_mut() else {
            return;
        };
        let Some(app) = guard.as_mut() else {
            return;
        };
        if app.controller.generation() != generation {
            debug!(?action, "dropping click from a previous screen");
            return;
        }
        app.controller.dispatch(action, performance_now());
    });
    run_effects();
}

fn on_input(field: InputField, value: String) {
    APP.with(|cell| {
        let Ok(mut guard) = cell.try_borrow_mut() else {
            return;
        };
        let Some(app) = guard.as_mut() else {
            return;
        };
        match field {
            InputField::Name => app.controller.set_name_input(&value),
            InputField::Answer => app.controller.set_answer_input(&value),
            InputField::Survey(id) => {
                if let Err(err) = app.controller.answer_survey(id, &value) {
                    debug!(%err, "survey input ignored");
                }
            }
        }
    });
}

fn run_effects() {
    let pending = APP.with(|cell| {
        cell.try_borrow_mut().ok().and_then(|mut guard| {
            guard.as_mut().map(|app| {
                let effects = app.controller.take_effects();
                (effects, app.controller.telemetry(), app.controller.session().clone())
            })
        })
    });
    let Some((effects, telemetry, session)) = pending else {
        return;
    };
    for effect in effects {
        match effect {
            Effect::Flush => {
                let telemetry = telemetry.clone();
                let session = session.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    let outcome = telemetry.flush(&session).await;
                    APP.with(|cell| {
                        if let Ok(mut guard) = cell.try_borrow_mut() {
                            if let Some(app) = guard.as_mut() {
                                app.controller.note_flush(&outcome);
                            }
                        }
                    });
                });
            }
            Effect::Reload => {
                if let Some(w) = web_sys::window() {
                    if let Err(err) = w.location().reload() {
                        warn!(?err, "reload failed");
                    }
                }
            }
        }
    }
}

fn install_exit_hooks(window: &web_sys::Window) -> Result<(), JsValue> {
    for event in ["pagehide", "beforeunload"] {
        let closure = Closure::wrap(Box::new(move |_evt: web_sys::Event| {
            APP.with(|cell| {
                if let Ok(guard) = cell.try_borrow() {
                    if let Some(app) = guard.as_ref() {
                        app.controller.flush_on_exit();
                    }
                }
            });
        }) as Box<dyn FnMut(_)>);
        window.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    Ok(())
}

fn frame(now: f64) {
    APP.with(|cell| {
        let Ok(mut guard) = cell.try_borrow_mut() else {
            return;
        };
        let Some(app) = guard.as_mut() else {
            return;
        };
        app.controller.tick(now);
        let view = app.controller.view(now);
        let generation = app.controller.generation();
        if let Err(err) = app.renderer.draw(&view, generation) {
            warn!(?err, "render failed");
        }
    });
    run_effects();
}

fn request_frame(cb: &FrameCallback) {
    if let (Some(w), Some(closure)) = (web_sys::window(), cb.borrow().as_ref()) {
        let _ = w.request_animation_frame(closure.as_ref().unchecked_ref());
    }
}

fn start_loop() {
    let f: FrameCallback = Rc::new(RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        frame(ts);
        request_frame(&f);
    }) as Box<dyn FnMut(f64)>));
    request_frame(&g);
}
