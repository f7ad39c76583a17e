//! Replaying adapters that serve tracker calls from a cassette.
//!
//! Outputs are served in recorded order per port and method. Each call's
//! arguments are built the way the recording adapters build them and must
//! agree with the recorded input.

pub mod downstream;
pub mod upstream;

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cassette::{CassetteReplayer, ReplayError};
use crate::ports::PortError;

pub use downstream::ReplayingDownstream;
pub use upstream::ReplayingUpstream;

/// Shared handle to the replayer used by every replaying adapter of a run.
pub type SharedReplayer = Arc<Mutex<CassetteReplayer>>;

/// Takes the next recorded output for `port::method` called with `input`.
pub(crate) fn next_output(
    replayer: &SharedReplayer,
    port: &str,
    method: &str,
    input: &Value,
) -> Result<(u64, Value), ReplayError> {
    let mut guard = replayer.lock().unwrap_or_else(PoisonError::into_inner);
    let interaction = guard.next_matching(port, method, input)?;
    Ok((interaction.seq, interaction.output.clone()))
}

/// Decodes a recorded `{"Ok": v}` / `{"Err": message}` output.
///
/// Mirror of `recording::PendingCall`. Replay failures surface as port
/// errors.
pub(crate) fn replay_result<T: DeserializeOwned>(
    output: Result<(u64, Value), ReplayError>,
) -> Result<T, PortError> {
    let (seq, output) = output?;
    let undecodable = |reason: String| -> PortError { ReplayError::Decode { seq, reason }.into() };
    let Value::Object(mut map) = output else {
        return Err(undecodable("expected Ok or Err".to_string()));
    };
    if let Some(ok) = map.remove("Ok") {
        return serde_json::from_value(ok).map_err(|e| undecodable(e.to_string()));
    }
    match map.remove("Err") {
        Some(Value::String(message)) => Err(message.into()),
        _ => Err(undecodable("expected Ok or Err".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_ok_values() {
        let value: Vec<u32> = replay_result(Ok((0, json!({"Ok": [1, 2]})))).unwrap();
        assert_eq!(value, vec![1, 2]);
    }

    #[test]
    fn recorded_errors_become_port_errors() {
        let err = replay_result::<u32>(Ok((3, json!({"Err": "404 Not Found"})))).unwrap_err();
        assert_eq!(err.to_string(), "404 Not Found");
    }

    #[test]
    fn malformed_outputs_are_decode_errors() {
        let err = replay_result::<u32>(Ok((5, json!({"text": "x"})))).unwrap_err();
        assert!(err.to_string().contains("seq=5"));
        let err = replay_result::<u32>(Ok((6, json!({"Ok": "not a number"})))).unwrap_err();
        assert!(err.to_string().contains("seq=6"));
    }
}
