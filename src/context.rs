//! Tracker context bundling the port objects used by a command.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::adapters::live::{LiveDownstream, LiveUpstream};
use crate::adapters::recording::{RecordingDownstream, RecordingUpstream, SharedRecorder};
use crate::adapters::replaying::{ReplayingDownstream, ReplayingUpstream};
use crate::cassette::{CassetteRecorder, CassetteReplayer, ReplayError};
use crate::config::Settings;
use crate::ports::{DownstreamTracker, UpstreamTracker};

/// Environment variable naming a cassette to record the run into.
pub const RECORD_VAR: &str = "ISSUE_BRIDGE_RECORD";

/// Environment variable naming a cassette to serve the run from.
pub const REPLAY_VAR: &str = "ISSUE_BRIDGE_REPLAY";

/// Bundles the downstream and upstream trackers of a run.
///
/// A tracker that could not be configured is kept as the reason it is
/// unavailable; commands that need it report that reason.
pub struct TrackerContext {
    downstream: Result<Box<dyn DownstreamTracker>, String>,
    upstream: Result<Box<dyn UpstreamTracker>, String>,
    recorder: Option<(PathBuf, SharedRecorder)>,
}

impl TrackerContext {
    /// Creates a context from ready-made trackers.
    #[must_use]
    pub fn new(downstream: Box<dyn DownstreamTracker>, upstream: Box<dyn UpstreamTracker>) -> Self {
        Self { downstream: Ok(downstream), upstream: Ok(upstream), recorder: None }
    }

    /// Creates a context talking to the configured Jira and GitHub instances.
    #[must_use]
    pub fn live(settings: &Settings) -> Self {
        let downstream = settings
            .jira_client_config()
            .map_err(|e| e.to_string())
            .and_then(|config| LiveDownstream::new(&config))
            .map(|tracker| Box::new(tracker) as Box<dyn DownstreamTracker>);
        let upstream = settings
            .github_client_config()
            .map_err(|e| e.to_string())
            .and_then(|config| LiveUpstream::new(&config))
            .map(|tracker| Box::new(tracker) as Box<dyn UpstreamTracker>);
        if let Err(reason) = &downstream {
            debug!(%reason, "downstream tracker unavailable");
        }
        if let Err(reason) = &upstream {
            debug!(%reason, "upstream tracker unavailable");
        }
        Self { downstream, upstream, recorder: None }
    }

    /// Creates a context serving every call from a cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, ReplayError> {
        let replayer = Arc::new(Mutex::new(CassetteReplayer::load(path)?));
        info!(cassette = %path.display(), "replaying tracker interactions");
        Ok(Self::new(
            Box::new(ReplayingDownstream::new(Arc::clone(&replayer))),
            Box::new(ReplayingUpstream::new(replayer)),
        ))
    }

    /// Wraps the available trackers so every call is recorded to `path`.
    ///
    /// The cassette is written by [`TrackerContext::finish`].
    #[must_use]
    pub fn recording(self, path: &Path) -> Self {
        let name = path
            .file_stem()
            .map_or_else(|| "session".to_string(), |s| s.to_string_lossy().into_owned());
        let recorder: SharedRecorder = Arc::new(Mutex::new(CassetteRecorder::new(path, name)));
        Self {
            downstream: self.downstream.map(|inner| {
                Box::new(RecordingDownstream::new(inner, Arc::clone(&recorder)))
                    as Box<dyn DownstreamTracker>
            }),
            upstream: self.upstream.map(|inner| {
                Box::new(RecordingUpstream::new(inner, Arc::clone(&recorder)))
                    as Box<dyn UpstreamTracker>
            }),
            recorder: Some((path.to_path_buf(), recorder)),
        }
    }

    /// Builds the context for a command run.
    ///
    /// `ISSUE_BRIDGE_REPLAY=<file>` serves the run from a cassette; otherwise
    /// live trackers are used, recorded to `ISSUE_BRIDGE_RECORD=<file>` when set.
    ///
    /// # Errors
    ///
    /// Returns an error if the replay cassette cannot be loaded.
    pub fn from_env(settings: &Settings) -> Result<Self, String> {
        if let Some(path) = std::env::var_os(REPLAY_VAR).filter(|p| !p.is_empty()) {
            return Self::replaying(Path::new(&path)).map_err(|e| e.to_string());
        }
        let ctx = Self::live(settings);
        match std::env::var_os(RECORD_VAR).filter(|p| !p.is_empty()) {
            Some(path) => Ok(ctx.recording(Path::new(&path))),
            None => Ok(ctx),
        }
    }

    /// The downstream tracker.
    ///
    /// # Errors
    ///
    /// Returns why the tracker could not be configured.
    pub fn downstream(&self) -> Result<&dyn DownstreamTracker, String> {
        self.downstream.as_deref().map_err(Clone::clone)
    }

    /// The upstream tracker.
    ///
    /// # Errors
    ///
    /// Returns why the tracker could not be configured.
    pub fn upstream(&self) -> Result<&dyn UpstreamTracker, String> {
        self.upstream.as_deref().map_err(Clone::clone)
    }

    /// Ends the run, writing the cassette if recording.
    ///
    /// Returns the cassette path when one was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette cannot be written.
    pub fn finish(self) -> Result<Option<PathBuf>, String> {
        let Self { downstream, upstream, recorder } = self;
        drop(downstream);
        drop(upstream);
        let Some((path, recorder)) = recorder else {
            return Ok(None);
        };
        let recorder = Arc::try_unwrap(recorder)
            .map_err(|_| format!("cassette recorder for {} is still in use", path.display()))?
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let written = recorder
            .finish()
            .map_err(|e| format!("failed to write cassette {}: {e}", path.display()))?;
        Ok(Some(written))
    }
}
