//! Host-side collaborator: one engine per subject session, persisted as it
//! runs.

use std::collections::HashMap;

use psylab_core::{
    EngineError, Feedback, InstructionScreen, Options, ResponseRecord, TrialSpec,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::contract::Experiment;
use crate::registry::{self, ExperimentKind};
use crate::results::ExperimentResults;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Sink(#[from] anyhow::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Where issued trials, scored responses and final results go.
pub trait PersistenceSink {
    fn store_trial(&mut self, session_id: &str, trial: &TrialSpec) -> anyhow::Result<()>;

    fn store_response(
        &mut self,
        session_id: &str,
        response: &ResponseRecord,
        feedback: &Feedback,
    ) -> anyhow::Result<()>;

    fn store_results(
        &mut self,
        session_id: &str,
        results: &ExperimentResults,
    ) -> anyhow::Result<()>;
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub trials: Vec<(String, TrialSpec)>,
    pub responses: Vec<(String, ResponseRecord, Feedback)>,
    pub results: Vec<(String, ExperimentResults)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceSink for MemorySink {
    fn store_trial(&mut self, session_id: &str, trial: &TrialSpec) -> anyhow::Result<()> {
        self.trials.push((session_id.to_string(), trial.clone()));
        Ok(())
    }

    fn store_response(
        &mut self,
        session_id: &str,
        response: &ResponseRecord,
        feedback: &Feedback,
    ) -> anyhow::Result<()> {
        self.responses
            .push((session_id.to_string(), response.clone(), feedback.clone()));
        Ok(())
    }

    fn store_results(
        &mut self,
        session_id: &str,
        results: &ExperimentResults,
    ) -> anyhow::Result<()> {
        self.results.push((session_id.to_string(), results.clone()));
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartedSession {
    pub session_id: String,
    pub experiment_type: ExperimentKind,
    pub subject_id: Option<String>,
    pub instructions: Vec<InstructionScreen>,
}

/// What the host shows next.
#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    Trial(TrialSpec),
    Complete(ExperimentResults),
}

struct Session {
    engine: Box<dyn Experiment>,
    subject_id: Option<String>,
    /// The pending trial was issued but the sink rejected it.
    trial_unstored: bool,
    /// A scored response the sink rejected, kept until it is stored.
    unstored_response: Option<(ResponseRecord, Feedback)>,
    results_stored: bool,
}

impl Session {
    /// Store the held-back response, if any. Returns its trial number and
    /// feedback once stored.
    fn flush_response<S: PersistenceSink>(
        &mut self,
        sink: &mut S,
        session_id: &str,
    ) -> anyhow::Result<Option<(u32, Feedback)>> {
        let Some((scored, feedback)) = self.unstored_response.take() else {
            return Ok(None);
        };
        if let Err(err) = sink.store_response(session_id, &scored, &feedback) {
            tracing::warn!(
                session = %session_id,
                trial = scored.trial_number,
                "response not stored"
            );
            self.unstored_response = Some((scored, feedback));
            return Err(err);
        }
        Ok(Some((scored.trial_number, feedback)))
    }
}

/// Live sessions keyed by generated id.
pub struct SessionRegistry<S> {
    sessions: HashMap<String, Session>,
    sink: S,
}

impl<S: PersistenceSink> SessionRegistry<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sessions: HashMap::new(),
            sink,
        }
    }

    /// Start a session with an OS-seeded generator.
    pub fn start(
        &mut self,
        kind: ExperimentKind,
        subject_id: Option<&str>,
        options: &Options,
    ) -> SessionResult<StartedSession> {
        let engine = registry::create(kind, options, StdRng::from_os_rng())?;
        Ok(self.insert(kind, subject_id, engine))
    }

    /// Start a reproducible session.
    pub fn start_seeded(
        &mut self,
        kind: ExperimentKind,
        subject_id: Option<&str>,
        options: &Options,
        seed: u64,
    ) -> SessionResult<StartedSession> {
        let engine = registry::create(kind, options, StdRng::seed_from_u64(seed))?;
        Ok(self.insert(kind, subject_id, engine))
    }

    fn insert(
        &mut self,
        kind: ExperimentKind,
        subject_id: Option<&str>,
        engine: Box<dyn Experiment>,
    ) -> StartedSession {
        let session_id = format!("{}-{}", kind.name(), Uuid::new_v4().simple());
        let subject_id = subject_id.map(str::to_string);
        let instructions = engine.instructions();
        tracing::info!(
            session = %session_id,
            subject = subject_id.as_deref().unwrap_or("-"),
            "session started"
        );
        self.sessions.insert(
            session_id.clone(),
            Session {
                engine,
                subject_id: subject_id.clone(),
                trial_unstored: false,
                unstored_response: None,
                results_stored: false,
            },
        );
        StartedSession {
            session_id,
            experiment_type: kind,
            subject_id,
            instructions,
        }
    }

    pub fn get(&self, session_id: &str) -> Option<&dyn Experiment> {
        self.sessions.get(session_id).map(|s| s.engine.as_ref())
    }

    pub fn get_mut(&mut self, session_id: &str) -> Option<&mut (dyn Experiment + 'static)> {
        self.sessions
            .get_mut(session_id)
            .map(|s| s.engine.as_mut())
    }

    pub fn subject_id(&self, session_id: &str) -> Option<&str> {
        self.sessions
            .get(session_id)
            .and_then(|s| s.subject_id.as_deref())
    }

    /// Issue the next trial, or finish the session.
    ///
    /// Every trial and response reaches the sink exactly once. Anything the
    /// sink rejected is stored again on the next call. Results are stored the
    /// first time completion is observed.
    pub fn next_trial(&mut self, session_id: &str) -> SessionResult<NextStep> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
        session.flush_response(&mut self.sink, session_id)?;

        let already_pending = session.engine.state().pending().is_some();
        match session.engine.next_trial() {
            Some(trial) => {
                if !already_pending {
                    session.trial_unstored = true;
                }
                if session.trial_unstored {
                    if let Err(err) = self.sink.store_trial(session_id, &trial) {
                        tracing::warn!(
                            session = %session_id,
                            trial = trial.trial_number,
                            "trial not stored"
                        );
                        return Err(err.into());
                    }
                    session.trial_unstored = false;
                }
                Ok(NextStep::Trial(trial))
            }
            None => {
                let results = session.engine.results();
                if !session.results_stored {
                    self.sink.store_results(session_id, &results)?;
                    session.results_stored = true;
                    tracing::info!(session = %session_id, "session complete");
                }
                Ok(NextStep::Complete(results))
            }
        }
    }

    /// Score a response to the pending trial and persist it.
    ///
    /// When storing fails the response stays scored. Submitting it again
    /// retries the store and returns the original feedback.
    pub fn record_response(
        &mut self,
        session_id: &str,
        response: ResponseRecord,
    ) -> SessionResult<Feedback> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
        let flushed = session.flush_response(&mut self.sink, session_id)?;
        if let Some((trial_number, feedback)) = flushed {
            if trial_number == response.trial_number {
                return Ok(feedback);
            }
        }

        let feedback = session.engine.record_response(response)?;
        if let Some(scored) = session.engine.history().last().cloned() {
            session.unstored_response = Some((scored, feedback.clone()));
            session.flush_response(&mut self.sink, session_id)?;
        }
        Ok(feedback)
    }

    /// Drop a session; returns its final results if it was live.
    pub fn evict(&mut self, session_id: &str) -> Option<ExperimentResults> {
        let session = self.sessions.remove(session_id)?;
        tracing::debug!(session = %session_id, "session evicted");
        Some(session.engine.results())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
