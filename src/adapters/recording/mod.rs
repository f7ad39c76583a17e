//! Recording adapters that capture tracker interactions to a cassette.

pub mod downstream;
pub mod upstream;

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::cassette::CassetteRecorder;
use crate::ports::TrackerFuture;

pub use downstream::RecordingDownstream;
pub use upstream::RecordingUpstream;

/// Shared handle to the recorder used by every recording adapter of a run.
pub type SharedRecorder = Arc<Mutex<CassetteRecorder>>;

fn to_json<T: Serialize>(value: &T, what: &str) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(error = %e, "failed to serialize recorded {what}");
        Value::Null
    })
}

/// Output recorded for a call that was dropped before it completed.
pub(crate) const ABANDONED_CALL: &str = "call abandoned before completion";

/// One tracker call on its way into the cassette.
///
/// Uses the Ok/Err JSON convention mirrored by `replaying::replay_result`:
/// `Ok(v)` is stored as `{"Ok": v}` and `Err(e)` as `{"Err": e.to_string()}`.
/// A call dropped before [`PendingCall::finish`] (timed out or cancelled by
/// the caller) is stored as an [`ABANDONED_CALL`] error, so the calls after it
/// replay in their recorded positions.
pub(crate) struct PendingCall {
    recorder: SharedRecorder,
    port: &'static str,
    method: &'static str,
    input: Option<Value>,
}

impl PendingCall {
    pub(crate) fn start<I: Serialize>(
        recorder: &SharedRecorder,
        port: &'static str,
        method: &'static str,
        input: &I,
    ) -> Self {
        Self {
            recorder: Arc::clone(recorder),
            port,
            method,
            input: Some(to_json(input, "input")),
        }
    }

    pub(crate) fn finish<T, E>(mut self, result: &Result<T, E>)
    where
        T: Serialize,
        E: std::fmt::Display,
    {
        let output = match result {
            Ok(v) => serde_json::json!({ "Ok": to_json(v, "output") }),
            Err(e) => serde_json::json!({ "Err": e.to_string() }),
        };
        self.record(output);
    }

    fn record(&mut self, output: Value) {
        let Some(input) = self.input.take() else {
            return;
        };
        let mut guard = self.recorder.lock().unwrap_or_else(PoisonError::into_inner);
        guard.record(self.port, self.method, input, output);
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        if self.input.is_some() {
            warn!(port = self.port, method = self.method, "recording abandoned call");
            self.record(serde_json::json!({ "Err": ABANDONED_CALL }));
        }
    }
}

/// Wraps `call` so its outcome is recorded as one interaction.
pub(crate) fn recorded<'a, T, I>(
    recorder: &SharedRecorder,
    port: &'static str,
    method: &'static str,
    input: &I,
    call: TrackerFuture<'a, T>,
) -> TrackerFuture<'a, T>
where
    T: Serialize + Send + 'a,
    I: Serialize,
{
    let pending = PendingCall::start(recorder, port, method, input);
    Box::pin(async move {
        let result = call.await;
        pending.finish(&result);
        result
    })
}
