//! Replays recorded interactions from a cassette.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use super::format::{Cassette, Interaction};

/// Failure to load a cassette or to serve an interaction from it.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The cassette file could not be read.
    #[error("failed to read cassette {}: {source}", path.display())]
    Read {
        /// Cassette path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The cassette file is not a valid cassette.
    #[error("failed to parse cassette {}: {source}", path.display())]
    Parse {
        /// Cassette path.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
    /// Nothing was recorded for the requested call.
    #[error("cassette has no interactions for {port}::{method} (recorded: [{available}])")]
    NotRecorded {
        /// Requested port.
        port: String,
        /// Requested method.
        method: String,
        /// Recorded `port::method` pairs.
        available: String,
    },
    /// Every recorded interaction for the call has been served.
    #[error("cassette exhausted: all {count} interactions for {port}::{method} were consumed")]
    Exhausted {
        /// Requested port.
        port: String,
        /// Requested method.
        method: String,
        /// Number of interactions recorded for the call.
        count: usize,
    },
    /// A recorded output does not have the expected shape.
    #[error("cassette interaction seq={seq} has an undecodable output: {reason}")]
    Decode {
        /// Sequence number of the interaction.
        seq: u64,
        /// What was wrong with it.
        reason: String,
    },
    /// The call's arguments differ from the ones that were recorded.
    #[error(
        "cassette interaction seq={seq} for {port}::{method} was recorded with {recorded}, \
         replayed with {requested}"
    )]
    InputMismatch {
        /// Sequence number of the interaction.
        seq: u64,
        /// Requested port.
        port: String,
        /// Requested method.
        method: String,
        /// Recorded input.
        recorded: Value,
        /// Input of the replayed call.
        requested: Value,
    },
}

/// Key for indexing interactions by port and method.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct PortMethodKey {
    port: String,
    method: String,
}

/// Replays interactions from a loaded cassette, serving them sequentially
/// per port/method pair.
#[derive(Debug)]
pub struct CassetteReplayer {
    queues: HashMap<PortMethodKey, Vec<Interaction>>,
    cursors: HashMap<PortMethodKey, usize>,
}

impl CassetteReplayer {
    /// Create a new replayer from a loaded cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<PortMethodKey, Vec<Interaction>> = HashMap::new();
        for interaction in &cassette.interactions {
            let key = PortMethodKey {
                port: interaction.port.clone(),
                method: interaction.method.clone(),
            };
            queues.entry(key).or_default().push(interaction.clone());
        }
        let cursors = queues.keys().map(|k| (k.clone(), 0)).collect();
        Self { queues, cursors }
    }

    /// Reads a cassette file and creates a replayer for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|source| ReplayError::Read { path: path.to_path_buf(), source })?;
        let cassette: Cassette = serde_yaml::from_str(&yaml)
            .map_err(|source| ReplayError::Parse { path: path.to_path_buf(), source })?;
        Ok(Self::new(&cassette))
    }

    /// Return the next interaction for the given port and method.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing was recorded for the call or every
    /// recorded interaction has already been served.
    pub fn next_interaction(
        &mut self,
        port: &str,
        method: &str,
    ) -> Result<&Interaction, ReplayError> {
        let key = PortMethodKey { port: port.to_string(), method: method.to_string() };

        let (Some(queue), Some(cursor)) = (self.queues.get(&key), self.cursors.get_mut(&key)) else {
            let mut available: Vec<String> =
                self.queues.keys().map(|k| format!("{}::{}", k.port, k.method)).collect();
            available.sort();
            return Err(ReplayError::NotRecorded {
                port: key.port,
                method: key.method,
                available: available.join(", "),
            });
        };

        let Some(interaction) = queue.get(*cursor) else {
            return Err(ReplayError::Exhausted {
                port: key.port,
                method: key.method,
                count: queue.len(),
            });
        };
        *cursor += 1;
        Ok(interaction)
    }

    /// Return the next interaction for the call, checking it was recorded
    /// with the same arguments.
    ///
    /// Every field of the recorded input must be present in `input` with an
    /// equal value. Fields absent from the recording are not compared.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`CassetteReplayer::next_interaction`], or
    /// [`ReplayError::InputMismatch`] if the arguments differ.
    pub fn next_matching(
        &mut self,
        port: &str,
        method: &str,
        input: &Value,
    ) -> Result<&Interaction, ReplayError> {
        let interaction = self.next_interaction(port, method)?;
        if !input_matches(&interaction.input, input) {
            return Err(ReplayError::InputMismatch {
                seq: interaction.seq,
                port: port.to_string(),
                method: method.to_string(),
                recorded: interaction.input.clone(),
                requested: input.clone(),
            });
        }
        Ok(interaction)
    }

    /// Number of interactions not yet served.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queues
            .iter()
            .map(|(key, queue)| queue.len() - self.cursors.get(key).copied().unwrap_or(0))
            .sum()
    }
}

fn input_matches(recorded: &Value, requested: &Value) -> bool {
    match (recorded, requested) {
        (Value::Object(recorded), Value::Object(requested)) => {
            recorded.iter().all(|(field, value)| requested.get(field) == Some(value))
        }
        _ => recorded == requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn interaction(seq: u64, port: &str, method: &str, output: serde_json::Value) -> Interaction {
        Interaction { seq, port: port.into(), method: method.into(), input: json!({}), output }
    }

    fn make_cassette(interactions: Vec<Interaction>) -> Cassette {
        Cassette { name: "test".into(), recorded_at: Utc::now(), interactions }
    }

    #[test]
    fn replays_each_method_in_order() {
        let cassette = make_cassette(vec![
            interaction(0, "downstream", "remote_links", json!({"Ok": []})),
            interaction(1, "upstream", "get_issue", json!({"Ok": {"number": 7}})),
            interaction(2, "downstream", "remote_links", json!({"Err": "boom"})),
        ]);

        let mut replayer = CassetteReplayer::new(&cassette);
        assert_eq!(replayer.remaining(), 3);

        assert_eq!(replayer.next_interaction("upstream", "get_issue").unwrap().seq, 1);
        assert_eq!(replayer.next_interaction("downstream", "remote_links").unwrap().seq, 0);
        let third = replayer.next_interaction("downstream", "remote_links").unwrap();
        assert_eq!(third.output, json!({"Err": "boom"}));
        assert_eq!(replayer.remaining(), 0);
    }

    #[test]
    fn exhausted_queue_is_an_error() {
        let cassette =
            make_cassette(vec![interaction(0, "upstream", "get_issue", json!({"Ok": null}))]);
        let mut replayer = CassetteReplayer::new(&cassette);
        replayer.next_interaction("upstream", "get_issue").unwrap();

        let err = replayer.next_interaction("upstream", "get_issue").unwrap_err();
        assert!(matches!(err, ReplayError::Exhausted { count: 1, .. }));
        assert!(err.to_string().contains("exhausted"));
    }

    #[test]
    fn unrecorded_call_lists_what_is_available() {
        let cassette =
            make_cassette(vec![interaction(0, "upstream", "get_issue", json!({"Ok": null}))]);
        let mut replayer = CassetteReplayer::new(&cassette);

        let err = replayer.next_interaction("downstream", "create_issue").unwrap_err();
        assert!(err.to_string().contains("upstream::get_issue"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = CassetteReplayer::load(Path::new("/nonexistent/run.cassette.yaml")).unwrap_err();
        assert!(matches!(err, ReplayError::Read { .. }));
    }

    #[test]
    fn arguments_are_checked_against_the_recording() {
        let mut recorded = interaction(0, "downstream", "remote_links", json!({"Ok": []}));
        recorded.input = json!({"key": "A-1"});
        let mut second = recorded.clone();
        second.seq = 1;
        let cassette = make_cassette(vec![recorded, second]);
        let mut replayer = CassetteReplayer::new(&cassette);

        let served = replayer.next_matching("downstream", "remote_links", &json!({"key": "A-1"}));
        assert_eq!(served.unwrap().seq, 0);

        let err = replayer
            .next_matching("downstream", "remote_links", &json!({"key": "A-2"}))
            .unwrap_err();
        assert!(matches!(err, ReplayError::InputMismatch { seq: 1, .. }));
        assert!(err.to_string().contains("A-2"));
    }

    #[test]
    fn unrecorded_fields_are_not_compared() {
        let cassette =
            make_cassette(vec![interaction(0, "upstream", "get_issue", json!({"Ok": null}))]);
        let mut replayer = CassetteReplayer::new(&cassette);

        let input = json!({"project": "acme/widgets", "number": 7});
        assert!(replayer.next_matching("upstream", "get_issue", &input).is_ok());
    }
}
