//! Browser `fetch` implementation of the info resolver's sources.

use std::cell::Cell;
use std::rc::Rc;

use catalog::encyclopedia::{extract_from_response, summary_url};
use catalog::store::parse_store;
use catalog::{InfoSources, StoreError, StoreRecord, SummaryError, SummaryWrite};
use futures_util::FutureExt as _;
use futures_util::future::LocalBoxFuture;
use gloo_net::http::Request;
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::config::ViewConfig;

#[derive(Debug, Clone)]
pub struct HttpSources {
    store_url: String,
    write_url: String,
    summary_endpoint: String,
    summary_timeout_ms: u32,
}

impl HttpSources {
    pub fn from_config(config: &ViewConfig) -> Self {
        Self {
            store_url: config.store_url.clone(),
            write_url: config.write_url.clone(),
            summary_endpoint: config.encyclopedia_url.clone(),
            summary_timeout_ms: config.summary_timeout_ms,
        }
    }

    async fn store(&self) -> Result<Vec<StoreRecord>, StoreError> {
        let resp = Request::get(&self.store_url)
            .send()
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        if resp.status() == 404 {
            return Ok(Vec::new());
        }
        if !resp.ok() {
            return Err(StoreError::Io(format!("HTTP {}", resp.status())));
        }
        let text = resp.text().await.map_err(|e| StoreError::Io(e.to_string()))?;
        parse_store(&text)
    }

    async fn summary(&self, title: &str) -> Result<String, SummaryError> {
        let url = summary_url(&self.summary_endpoint, title)?;
        let controller =
            web_sys::AbortController::new().map_err(|e| SummaryError::Network(js_error(&e)))?;
        let timer = AbortTimer::start(&controller, self.summary_timeout_ms)?;

        let sent = Request::get(url.as_str())
            .abort_signal(Some(&controller.signal()))
            .send()
            .await;
        let resp = match sent {
            Ok(resp) => resp,
            Err(_) if timer.fired() => return Err(SummaryError::Timeout),
            Err(e) => return Err(SummaryError::Network(e.to_string())),
        };
        if !resp.ok() {
            return Err(SummaryError::Http(resp.status()));
        }
        let body: Value = match resp.json().await {
            Ok(body) => body,
            Err(_) if timer.fired() => return Err(SummaryError::Timeout),
            Err(e) => return Err(SummaryError::Malformed(e.to_string())),
        };
        extract_from_response(&body)
    }

    async fn persist(&self, write: &SummaryWrite) -> Result<(), StoreError> {
        let resp = Request::post(&self.write_url)
            .json(write)
            .map_err(|e| StoreError::Json(e.to_string()))?
            .send()
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        if !resp.ok() {
            return Err(StoreError::Io(format!("HTTP {}", resp.status())));
        }
        Ok(())
    }
}

impl InfoSources for HttpSources {
    fn fetch_store(&self) -> LocalBoxFuture<'_, Result<Vec<StoreRecord>, StoreError>> {
        self.store().boxed_local()
    }

    fn fetch_summary<'a>(&'a self, title: &'a str) -> LocalBoxFuture<'a, Result<String, SummaryError>> {
        self.summary(title).boxed_local()
    }

    fn persist_summary<'a>(&'a self, write: &'a SummaryWrite) -> LocalBoxFuture<'a, Result<(), StoreError>> {
        self.persist(write).boxed_local()
    }
}

/// Aborts a fetch after a delay. Dropping the timer clears it.
struct AbortTimer {
    handle: i32,
    fired: Rc<Cell<bool>>,
    _callback: Closure<dyn FnMut()>,
}

impl AbortTimer {
    fn start(controller: &web_sys::AbortController, timeout_ms: u32) -> Result<Self, SummaryError> {
        let window = web_sys::window().ok_or_else(|| SummaryError::Network("no window".into()))?;
        let fired = Rc::new(Cell::new(false));
        let callback = {
            let controller = controller.clone();
            let fired = fired.clone();
            Closure::<dyn FnMut()>::new(move || {
                fired.set(true);
                controller.abort();
            })
        };
        let handle = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                i32::try_from(timeout_ms).unwrap_or(i32::MAX),
            )
            .map_err(|e| SummaryError::Network(js_error(&e)))?;
        Ok(Self {
            handle,
            fired,
            _callback: callback,
        })
    }

    fn fired(&self) -> bool {
        self.fired.get()
    }
}

impl Drop for AbortTimer {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_timeout_with_handle(self.handle);
        }
    }
}

pub(crate) fn js_error(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{value:?}"))
}
