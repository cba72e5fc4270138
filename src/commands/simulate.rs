//! The `psylab simulate` command.

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use psylab_core::options::options_from_json;
use psylab_core::Options;
use psylab_engine::{ExperimentKind, NextStep, SessionRegistry};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::sink::JsonLinesSink;
use crate::subject::SimulatedSubject;

pub struct SimulateArgs {
    pub kind: String,
    pub config: Option<PathBuf>,
    pub options: Option<String>,
    pub seed: Option<u64>,
    pub accuracy: f64,
    pub mean_rt: f64,
    pub subject: Option<String>,
    pub practice: bool,
}

/// Options from the config file, with inline options merged over them.
fn load_options(config: Option<&PathBuf>, inline: Option<&str>) -> Result<Options> {
    let mut options = match config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            options_from_json(&raw).with_context(|| format!("invalid options in {}", path.display()))?
        }
        None => Options::new(),
    };
    if let Some(raw) = inline {
        options.extend(options_from_json(raw).context("invalid --options")?);
    }
    Ok(options)
}

pub fn execute(args: SimulateArgs) -> Result<()> {
    let kind: ExperimentKind = args.kind.parse()?;
    if !(0.0..=1.0).contains(&args.accuracy) {
        bail!("--accuracy must be between 0 and 1, got {}", args.accuracy);
    }
    let options = load_options(args.config.as_ref(), args.options.as_deref())?;

    let mut sessions = SessionRegistry::new(JsonLinesSink::new(io::stdout()));
    let started = match args.seed {
        Some(seed) => sessions.start_seeded(kind, args.subject.as_deref(), &options, seed)?,
        None => sessions.start(kind, args.subject.as_deref(), &options)?,
    };
    let id = started.session_id.clone();

    let subject_rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_os_rng(),
    };
    let mut subject = SimulatedSubject::new(subject_rng, args.accuracy, args.mean_rt);

    {
        let engine = sessions
            .get(&id)
            .with_context(|| format!("session {id} vanished"))?;
        let configuration = engine.configuration();
        if let Some(keymap) = configuration.get("keymap").and_then(|k| k.as_object()) {
            let keys = keymap
                .values()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            subject = subject.with_keys(keys);
        }
    }

    sessions
        .sink_mut()
        .write_event("session", &id, "session", &started)?;

    if args.practice {
        let engine = sessions
            .get_mut(&id)
            .with_context(|| format!("session {id} vanished"))?;
        let mut scored = Vec::new();
        if let Some(trials) = engine.practice_trials() {
            for trial in &trials {
                let response = subject.respond(trial);
                let feedback = engine.score_practice(trial, &response)?;
                scored.push((response, feedback));
            }
            engine.end_practice();
        }
        let correct = scored.iter().filter(|(_, f)| f.correct).count();
        tracing::info!(trials = scored.len(), correct, "practice finished");
        for (response, feedback) in &scored {
            sessions.sink_mut().write_event(
                "practice",
                &id,
                "practice",
                &serde_json::json!({ "record": response, "feedback": feedback }),
            )?;
        }
    }

    while let NextStep::Trial(trial) = sessions.next_trial(&id)? {
        let response = subject.respond(&trial);
        sessions.record_response(&id, response)?;
    }

    let progress = sessions
        .get(&id)
        .map(|engine| engine.progress())
        .with_context(|| format!("session {id} vanished"))?;
    tracing::info!(
        session = %id,
        trials = progress.trial_number,
        lines = sessions.sink().lines(),
        "simulation finished"
    );
    sessions.evict(&id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn inline_options_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"total_trials": 50, "congruent_ratio": 0.25}}"#).unwrap();
        let options = load_options(
            Some(&file.path().to_path_buf()),
            Some(r#"{"total_trials": 12}"#),
        )
        .unwrap();
        assert_eq!(options["total_trials"], 12);
        assert_eq!(options["congruent_ratio"], 0.25);
    }

    #[test]
    fn non_object_options_rejected() {
        assert!(load_options(None, Some("[1, 2]")).is_err());
    }
}
