//! Browser upload paths: `fetch` while the page is alive, `sendBeacon` on exit.

use async_trait::async_trait;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, RequestInit, RequestMode};

use crate::error::TelemetryError;
use crate::telemetry::Transport;

const CONTENT_TYPE: &str = "text/plain;charset=utf-8";

fn js_err(e: JsValue) -> TelemetryError {
    TelemetryError::Transport(e.as_string().unwrap_or_else(|| format!("{e:?}")))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FetchTransport;

#[async_trait(?Send)]
impl Transport for FetchTransport {
    /// `no-cors` POST with a plain-text body, so the collector needs no
    /// preflight. The opaque response is not inspected; a resolved promise is
    /// the acknowledgment.
    async fn send(&self, endpoint: &str, body: String) -> Result<(), TelemetryError> {
        let window = web_sys::window().ok_or_else(|| TelemetryError::Transport("no window".into()))?;
        let init = RequestInit::new();
        init.set_method("POST");
        init.set_mode(RequestMode::NoCors);
        init.set_body(&JsValue::from_str(&body));
        let request = web_sys::Request::new_with_str_and_init(endpoint, &init).map_err(js_err)?;
        request
            .headers()
            .set("Content-Type", CONTENT_TYPE)
            .map_err(js_err)?;
        let response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_err)?;
        let _: web_sys::Response = response.dyn_into().map_err(js_err)?;
        Ok(())
    }

    fn send_best_effort(&self, endpoint: &str, body: String) -> bool {
        let Some(window) = web_sys::window() else {
            return false;
        };
        let parts = js_sys::Array::of1(&JsValue::from_str(&body));
        let opts = BlobPropertyBag::new();
        opts.set_type(CONTENT_TYPE);
        let Ok(blob) = Blob::new_with_str_sequence_and_options(&parts, &opts) else {
            return false;
        };
        window
            .navigator()
            .send_beacon_with_opt_blob(endpoint, Some(&blob))
            .unwrap_or(false)
    }
}
