//! Telemetry buffering and batch upload.
//!
//! Records are appended to two stored lists: an archive that is never pruned
//! and a pending-upload buffer. Nothing goes over the network during play; the
//! buffer is flushed as one batch when the recap screen is reached or, best
//! effort, when the page is torn down. Sent records are removed from the buffer
//! only after the transport acknowledges them, so a failed flush loses nothing.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::TelemetryError;
use crate::games::GameId;
use crate::session::{Mode, Session, StageId};
use crate::storage::{self, KeyValueStore};

pub const UPLOAD_FAILED_STATUS: &str = "Upload failed, saved locally (will retry on recap/exit).";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecordBody {
    #[serde(rename_all = "camelCase")]
    Event { event_type: String, payload: Value },
    #[serde(rename_all = "camelCase")]
    Response {
        question_id: String,
        response: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Score {
        game_id: GameId,
        run_stats: Value,
        best_stats: Value,
    },
}

/// One telemetry item, stamped with the session context at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub participant_id: Option<String>,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub stage: StageId,
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(flatten)]
    pub body: RecordBody,
}

/// Upload envelope wrapping every pending record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch<'a> {
    pub kind: &'static str,
    pub participant_id: Option<&'a str>,
    pub session_id: &'a str,
    pub timestamp: DateTime<Utc>,
    pub stage: StageId,
    pub mode: Mode,
    pub items: &'a [Record],
}

impl<'a> Batch<'a> {
    pub fn new(session: &'a Session, items: &'a [Record]) -> Self {
        Self {
            kind: "batch",
            participant_id: session.participant_id(),
            session_id: session.session_id(),
            timestamp: Utc::now(),
            stage: session.stage(),
            mode: session.mode(),
            items,
        }
    }
}

/// Network side of the uploader.
#[async_trait(?Send)]
pub trait Transport {
    /// Deliver `body` while the page is alive. `Ok` is taken as acknowledgment.
    async fn send(&self, endpoint: &str, body: String) -> Result<(), TelemetryError>;

    /// Queue `body` during page teardown. The return value only says whether the
    /// platform accepted the request, not whether it arrived.
    fn send_best_effort(&self, endpoint: &str, body: String) -> bool;
}

#[derive(Debug)]
pub enum FlushOutcome {
    Sent { count: usize },
    /// No endpoint configured.
    Skipped,
    Empty,
    AlreadyFlushing,
    Failed(TelemetryError),
}

impl FlushOutcome {
    pub fn is_ok(&self) -> bool {
        !matches!(self, FlushOutcome::Failed(_))
    }
}

/// Clears the in-flight flag even if the flush future is dropped mid-await.
struct InFlight<'a>(&'a Cell<bool>);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub struct Telemetry {
    store: Rc<dyn KeyValueStore>,
    transport: Box<dyn Transport>,
    endpoint: Option<String>,
    user_agent: Option<String>,
    flushing: Cell<bool>,
    /// Count of accepted page-exit sends; each one empties the buffer.
    exit_sends: Cell<u64>,
}

impl Telemetry {
    pub fn new(
        store: Rc<dyn KeyValueStore>,
        transport: Box<dyn Transport>,
        endpoint: Option<String>,
    ) -> Self {
        Self {
            store,
            transport,
            endpoint,
            user_agent: None,
            flushing: Cell::new(false),
            exit_sends: Cell::new(0),
        }
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing.get()
    }

    pub fn pending(&self) -> Vec<Record> {
        storage::load_or(self.store.as_ref(), storage::KEY_LOG_BUFFER, Vec::new())
    }

    pub fn archive(&self) -> Vec<Record> {
        storage::load_or(self.store.as_ref(), storage::KEY_LOCAL_LOG, Vec::new())
    }

    fn record(&self, session: &Session, body: RecordBody) -> Record {
        Record {
            participant_id: session.participant_id().map(str::to_string),
            session_id: session.session_id().to_string(),
            timestamp: Utc::now(),
            stage: session.stage(),
            mode: session.mode(),
            user_agent: self.user_agent.clone(),
            body,
        }
    }

    /// Append to the archive and the pending buffer. Returns once both writes
    /// are done, so successive calls keep their order.
    fn append(&self, record: Record) -> Result<(), TelemetryError> {
        let store = self.store.as_ref();
        let mut archive = self.archive();
        archive.push(record.clone());
        if let Err(err) = storage::save(store, storage::KEY_LOCAL_LOG, &archive) {
            // The archive is diagnostic only; the buffer is what must survive.
            debug!(%err, "archive write skipped");
        }
        let mut pending = self.pending();
        pending.push(record);
        storage::save(store, storage::KEY_LOG_BUFFER, &pending)?;
        Ok(())
    }

    pub fn log_event(&self, session: &Session, event_type: &str, payload: Value) -> Result<(), TelemetryError> {
        debug!(event_type, "event");
        self.append(self.record(
            session,
            RecordBody::Event {
                event_type: event_type.to_string(),
                payload,
            },
        ))
    }

    pub fn log_response(
        &self,
        session: &Session,
        question_id: &str,
        response: Option<String>,
    ) -> Result<(), TelemetryError> {
        self.append(self.record(
            session,
            RecordBody::Response {
                question_id: question_id.to_string(),
                response,
            },
        ))
    }

    pub fn log_score(
        &self,
        session: &Session,
        game_id: GameId,
        run_stats: Value,
        best_stats: Value,
    ) -> Result<(), TelemetryError> {
        self.append(self.record(
            session,
            RecordBody::Score {
                game_id,
                run_stats,
                best_stats,
            },
        ))
    }

    /// Drop the first `count` pending records, keeping anything appended after
    /// the batch was taken.
    fn acknowledge(&self, count: usize) -> Result<(), TelemetryError> {
        let mut pending = self.pending();
        pending.drain(..count.min(pending.len()));
        storage::save(self.store.as_ref(), storage::KEY_LOG_BUFFER, &pending)?;
        Ok(())
    }

    /// Upload every pending record as one batch. Overlapping calls collapse into
    /// `AlreadyFlushing`; an empty buffer never reaches the network.
    pub async fn flush(&self, session: &Session) -> FlushOutcome {
        let Some(endpoint) = self.endpoint.clone() else {
            return FlushOutcome::Skipped;
        };
        let Some(_guard) = InFlight::acquire(&self.flushing) else {
            debug!("flush already in flight");
            return FlushOutcome::AlreadyFlushing;
        };
        let items = self.pending();
        if items.is_empty() {
            return FlushOutcome::Empty;
        }
        let body = match serde_json::to_string(&Batch::new(session, &items)) {
            Ok(body) => body,
            Err(err) => return FlushOutcome::Failed(err.into()),
        };

        let exit_sends = self.exit_sends.get();
        match self.transport.send(&endpoint, body).await {
            Ok(()) => {
                let count = items.len();
                if self.exit_sends.get() != exit_sends {
                    // An exit send already took this batch off the buffer;
                    // whatever is pending now was never part of it.
                    debug!(count, "batch already cleared by exit send");
                } else if let Err(err) = self.acknowledge(count) {
                    warn!(%err, "sent batch but could not clear buffer");
                }
                info!(count, "telemetry flushed");
                FlushOutcome::Sent { count }
            }
            Err(err) => {
                warn!(%err, pending = items.len(), "telemetry flush failed; keeping buffer");
                FlushOutcome::Failed(err)
            }
        }
    }

    /// Page-exit path. Never fails; the buffer is cleared only if the platform
    /// accepted the best-effort request.
    pub fn flush_on_exit(&self, session: &Session) {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return;
        };
        let items = self.pending();
        if items.is_empty() {
            return;
        }
        let Ok(body) = serde_json::to_string(&Batch::new(session, &items)) else {
            return;
        };
        if self.transport.send_best_effort(endpoint, body) && self.acknowledge(items.len()).is_ok() {
            self.exit_sends.set(self.exit_sends.get() + 1);
        }
    }
}

/// Transport that keeps every body it is given. Used by native builds and
/// tests; `fail_sends` and `refuse_best_effort` simulate network trouble.
#[derive(Debug, Default, Clone)]
pub struct RecordingTransport {
    inner: Rc<RecordingInner>,
}

#[derive(Debug, Default)]
struct RecordingInner {
    sent: RefCell<Vec<(String, String)>>,
    beacons: RefCell<Vec<(String, String)>>,
    fail_sends: Cell<bool>,
    refuse_best_effort: Cell<bool>,
    yield_once: Cell<bool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.inner.fail_sends.set(fail);
    }

    pub fn refuse_best_effort(&self, refuse: bool) {
        self.inner.refuse_best_effort.set(refuse);
    }

    /// Make each `send` suspend once before completing, so concurrent flushes
    /// genuinely overlap.
    pub fn yield_before_completing(&self, yield_once: bool) {
        self.inner.yield_once.set(yield_once);
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.inner.sent.borrow().clone()
    }

    pub fn beacons(&self) -> Vec<(String, String)> {
        self.inner.beacons.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Transport for RecordingTransport {
    async fn send(&self, endpoint: &str, body: String) -> Result<(), TelemetryError> {
        self.inner
            .sent
            .borrow_mut()
            .push((endpoint.to_string(), body));
        if self.inner.yield_once.get() {
            YieldOnce::default().await;
        }
        if self.inner.fail_sends.get() {
            return Err(TelemetryError::Transport("network unreachable".into()));
        }
        Ok(())
    }

    fn send_best_effort(&self, endpoint: &str, body: String) -> bool {
        if self.inner.refuse_best_effort.get() {
            return false;
        }
        self.inner
            .beacons
            .borrow_mut()
            .push((endpoint.to_string(), body));
        true
    }
}

#[derive(Default)]
struct YieldOnce(bool);

impl std::future::Future for YieldOnce {
    type Output = ();

    fn poll(mut self: std::pin::Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> std::task::Poll<()> {
        if self.0 {
            std::task::Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            std::task::Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use futures::executor::block_on;
    use serde_json::json;

    const ENDPOINT: &str = "https://collect.example/exec";

    fn fixture(endpoint: Option<&str>) -> (Rc<MemoryStore>, RecordingTransport, Telemetry, Session) {
        let store = Rc::new(MemoryStore::new());
        let transport = RecordingTransport::new();
        let tel = Telemetry::new(
            store.clone(),
            Box::new(transport.clone()),
            endpoint.map(str::to_string),
        );
        let session = Session::load(store.as_ref()).unwrap();
        (store, transport, tel, session)
    }

    #[test]
    fn records_serialize_with_kind_tag_and_camel_case() {
        let (_, _, tel, session) = fixture(None);
        tel.log_response(&session, "Q1_mood", Some("Somewhat".into())).unwrap();
        tel.log_score(&session, GameId::Simon, json!({"level": 2}), json!({"bestLevel": 2}))
            .unwrap();
        let v = serde_json::to_value(tel.pending()).unwrap();
        assert_eq!(v[0]["kind"], "response");
        assert_eq!(v[0]["questionId"], "Q1_mood");
        assert_eq!(v[0]["stage"], "start");
        assert_eq!(v[0]["mode"], "normal");
        assert_eq!(v[1]["kind"], "score");
        assert_eq!(v[1]["gameId"], "simon");
        assert_eq!(v[1]["runStats"]["level"], 2);
        assert!(v[1].get("userAgent").is_none());
    }

    #[test]
    fn append_keeps_order_in_archive_and_buffer() {
        let (_, _, tel, session) = fixture(None);
        for i in 0..5 {
            tel.log_event(&session, "tick", json!({ "i": i })).unwrap();
        }
        let pending = tel.pending();
        assert_eq!(pending.len(), 5);
        assert_eq!(tel.archive(), pending);
        for (i, r) in pending.iter().enumerate() {
            match &r.body {
                RecordBody::Event { payload, .. } => assert_eq!(payload["i"], i),
                other => panic!("unexpected record {other:?}"),
            }
        }
    }

    #[test]
    fn flush_of_empty_buffer_never_hits_network() {
        let (_, transport, tel, session) = fixture(Some(ENDPOINT));
        assert!(matches!(block_on(tel.flush(&session)), FlushOutcome::Empty));
        assert!(transport.sent().is_empty());
        assert!(!tel.is_flushing());
    }

    #[test]
    fn flush_without_endpoint_is_skipped_and_keeps_buffer() {
        let (_, transport, tel, session) = fixture(None);
        tel.log_event(&session, "x", json!({})).unwrap();
        assert!(matches!(block_on(tel.flush(&session)), FlushOutcome::Skipped));
        assert!(transport.sent().is_empty());
        assert_eq!(tel.pending().len(), 1);
    }

    #[test]
    fn successful_flush_sends_one_batch_and_clears_buffer_only() {
        let (_, transport, tel, session) = fixture(Some(ENDPOINT));
        tel.log_event(&session, "a", json!({})).unwrap();
        tel.log_event(&session, "b", json!({})).unwrap();

        let out = block_on(tel.flush(&session));
        assert!(matches!(out, FlushOutcome::Sent { count: 2 }));
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ENDPOINT);
        let batch: Value = serde_json::from_str(&sent[0].1).unwrap();
        assert_eq!(batch["kind"], "batch");
        assert_eq!(batch["sessionId"], session.session_id());
        assert_eq!(batch["items"].as_array().unwrap().len(), 2);
        assert_eq!(batch["items"][1]["eventType"], "b");

        assert!(tel.pending().is_empty());
        assert_eq!(tel.archive().len(), 2);

        // A second flush has nothing to replay.
        assert!(matches!(block_on(tel.flush(&session)), FlushOutcome::Empty));
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn failed_flush_retains_records_for_retry() {
        let (_, transport, tel, session) = fixture(Some(ENDPOINT));
        tel.log_event(&session, "a", json!({})).unwrap();
        transport.fail_sends(true);
        let out = block_on(tel.flush(&session));
        assert!(!out.is_ok());
        assert_eq!(tel.pending().len(), 1);
        assert!(!tel.is_flushing());

        transport.fail_sends(false);
        assert!(matches!(block_on(tel.flush(&session)), FlushOutcome::Sent { count: 1 }));
        assert!(tel.pending().is_empty());
    }

    #[test]
    fn overlapping_flushes_send_at_most_once() {
        let (_, transport, tel, session) = fixture(Some(ENDPOINT));
        transport.yield_before_completing(true);
        tel.log_event(&session, "a", json!({})).unwrap();

        let (first, second) = block_on(async { futures::join!(tel.flush(&session), tel.flush(&session)) });
        assert!(matches!(first, FlushOutcome::Sent { count: 1 }));
        assert!(matches!(second, FlushOutcome::AlreadyFlushing));
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn records_added_mid_flush_survive_acknowledgment() {
        let (_, transport, tel, session) = fixture(Some(ENDPOINT));
        transport.yield_before_completing(true);
        tel.log_event(&session, "before", json!({})).unwrap();

        block_on(async {
            let flush = tel.flush(&session);
            let late = async {
                tel.log_event(&session, "during", json!({})).unwrap();
            };
            futures::join!(flush, late)
        });

        let pending = tel.pending();
        assert_eq!(pending.len(), 1);
        assert!(matches!(&pending[0].body, RecordBody::Event { event_type, .. } if event_type == "during"));
    }

    #[test]
    fn exit_send_during_upload_keeps_later_records() {
        let (_, transport, tel, session) = fixture(Some(ENDPOINT));
        transport.yield_before_completing(true);
        tel.log_event(&session, "a", json!({})).unwrap();

        let (outcome, _) = block_on(async {
            let flush = tel.flush(&session);
            let leaving = async {
                tel.flush_on_exit(&session);
                tel.log_event(&session, "d", json!({})).unwrap();
            };
            futures::join!(flush, leaving)
        });

        assert!(matches!(outcome, FlushOutcome::Sent { count: 1 }));
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(transport.beacons().len(), 1);
        let pending = tel.pending();
        assert_eq!(pending.len(), 1);
        assert!(matches!(&pending[0].body, RecordBody::Event { event_type, .. } if event_type == "d"));
    }

    #[test]
    fn exit_flush_clears_only_when_beacon_accepted() {
        let (_, transport, tel, session) = fixture(Some(ENDPOINT));
        tel.log_event(&session, "a", json!({})).unwrap();

        transport.refuse_best_effort(true);
        tel.flush_on_exit(&session);
        assert_eq!(tel.pending().len(), 1);
        assert!(transport.beacons().is_empty());

        transport.refuse_best_effort(false);
        tel.flush_on_exit(&session);
        assert!(tel.pending().is_empty());
        assert_eq!(transport.beacons().len(), 1);

        tel.flush_on_exit(&session);
        assert_eq!(transport.beacons().len(), 1);
    }

    #[test]
    fn corrupted_buffer_is_treated_as_empty() {
        let (store, transport, tel, session) = fixture(Some(ENDPOINT));
        store.set_item(storage::KEY_LOG_BUFFER, "{{{").unwrap();
        assert!(matches!(block_on(tel.flush(&session)), FlushOutcome::Empty));
        tel.log_event(&session, "a", json!({})).unwrap();
        assert_eq!(tel.pending().len(), 1);
        assert!(transport.sent().is_empty());
    }
}
