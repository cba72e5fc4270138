//! Persistence sink writing one JSON object per line.

use std::io::Write;

use anyhow::{Context, Result};
use psylab_core::{Feedback, ResponseRecord, TrialSpec};
use psylab_engine::{ExperimentResults, PersistenceSink};
use serde::Serialize;
use serde_json::json;

pub struct JsonLinesSink<W> {
    out: W,
    lines: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, lines: 0 }
    }

    /// Write `{"event": event, "session_id": ..., key: payload}`.
    pub fn write_event<T: Serialize>(
        &mut self,
        event: &str,
        session_id: &str,
        key: &str,
        payload: &T,
    ) -> Result<()> {
        let mut line = json!({ "event": event, "session_id": session_id });
        line[key] = serde_json::to_value(payload)
            .with_context(|| format!("failed to serialize {event} record"))?;
        serde_json::to_writer(&mut self.out, &line)?;
        self.out
            .write_all(b"\n")
            .with_context(|| format!("failed to write {event} record"))?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PersistenceSink for JsonLinesSink<W> {
    fn store_trial(&mut self, session_id: &str, trial: &TrialSpec) -> Result<()> {
        self.write_event("trial", session_id, "trial", trial)
    }

    fn store_response(
        &mut self,
        session_id: &str,
        response: &ResponseRecord,
        feedback: &Feedback,
    ) -> Result<()> {
        self.write_event(
            "response",
            session_id,
            "response",
            &json!({ "record": response, "feedback": feedback }),
        )
    }

    fn store_results(&mut self, session_id: &str, results: &ExperimentResults) -> Result<()> {
        self.write_event("results", session_id, "results", results)?;
        self.out.flush().context("failed to flush results")
    }
}
