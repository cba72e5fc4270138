use psylab_core::options::options_from_json;
use psylab_core::{ExpectedResponse, GoAction, Options, Phase, ResponseRecord, TrialSpec};
use psylab_engine::{
    DigitSpanResults, Experiment, ExperimentKind, ExperimentResults, MemorySink, NextStep,
    SessionRegistry, create,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// The response a perfect subject gives.
fn perfect(trial: &TrialSpec) -> Option<String> {
    match trial.expected_response.as_ref()? {
        ExpectedResponse::Digits(digits) => Some(digits.clone()),
        ExpectedResponse::Action(GoAction::Respond) => Some("space".into()),
        ExpectedResponse::Action(GoAction::Withhold) => None,
        ExpectedResponse::Key(key) => Some(key.clone()),
    }
}

fn small_options(kind: ExperimentKind) -> Options {
    let json = match kind {
        ExperimentKind::DigitSpan => r#"{"starting_length": 3, "max_length": 6}"#,
        ExperimentKind::Sart => r#"{"total_trials": 30, "target_frequency": 0.2}"#,
        ExperimentKind::Stroop => r#"{"total_trials": 12}"#,
    };
    options_from_json(json).unwrap()
}

/// Runs `engine` to completion and returns every trial it issued.
fn run(engine: &mut dyn Experiment) -> Vec<TrialSpec> {
    let mut issued = Vec::new();
    while let Some(trial) = engine.next_trial() {
        assert!(!engine.is_complete());
        let response = ResponseRecord::for_trial(&trial, perfect(&trial), 420.0);
        let feedback = engine.record_response(response).unwrap();
        assert!(feedback.correct, "trial {} scored wrong", trial.trial_number);
        assert_eq!(feedback.continue_session, !engine.is_complete());
        issued.push(trial);
    }
    issued
}

#[test]
fn every_engine_runs_to_completion() {
    for kind in ExperimentKind::ALL {
        let mut engine = create(kind, &small_options(kind), StdRng::seed_from_u64(9)).unwrap();
        let issued = run(engine.as_mut());

        assert!(engine.is_complete());
        assert!(engine.next_trial().is_none());
        assert_eq!(engine.progress().phase, Phase::Complete);
        assert_eq!(engine.history().len(), issued.len());

        let numbers: Vec<u32> = issued.iter().map(|t| t.trial_number).collect();
        let expected: Vec<u32> = (1..=issued.len() as u32).collect();
        assert_eq!(numbers, expected, "{kind}");
    }
}

#[test]
fn results_are_idempotent() {
    for kind in ExperimentKind::ALL {
        let mut engine = create(kind, &small_options(kind), StdRng::seed_from_u64(3)).unwrap();
        run(engine.as_mut());
        assert_eq!(engine.results(), engine.results());
    }
}

#[test]
fn same_seed_same_trials() {
    for kind in ExperimentKind::ALL {
        let mut a = create(kind, &small_options(kind), StdRng::seed_from_u64(77)).unwrap();
        let mut b = create(kind, &small_options(kind), StdRng::seed_from_u64(77)).unwrap();
        assert_eq!(run(a.as_mut()), run(b.as_mut()), "{kind}");
    }
}

#[test]
fn stale_response_leaves_history_untouched() {
    for kind in ExperimentKind::ALL {
        let mut engine = create(kind, &small_options(kind), StdRng::seed_from_u64(5)).unwrap();
        let first = engine.next_trial().unwrap();
        engine
            .record_response(ResponseRecord::for_trial(&first, perfect(&first), 300.0))
            .unwrap();

        // answering the first trial again
        let err = engine
            .record_response(ResponseRecord::for_trial(&first, perfect(&first), 300.0))
            .unwrap_err();
        assert!(err.is_invalid_response());
        assert_eq!(engine.history().len(), 1);

        let second = engine.next_trial().unwrap();
        assert_eq!(second.trial_number, 2);
        assert_eq!(engine.next_trial().unwrap(), second);
    }
}

#[test]
fn negative_response_time_is_rejected() {
    let mut engine = create(
        ExperimentKind::Stroop,
        &small_options(ExperimentKind::Stroop),
        StdRng::seed_from_u64(1),
    )
    .unwrap();
    let trial = engine.next_trial().unwrap();
    let err = engine
        .record_response(ResponseRecord::for_trial(&trial, perfect(&trial), -4.0))
        .unwrap_err();
    assert!(err.is_invalid_response());
    assert!(engine.history().is_empty());
    assert_eq!(engine.next_trial().unwrap(), trial);
}

#[test]
fn digit_span_both_directions_keep_numbering() {
    let options = options_from_json(r#"{"direction": "both", "max_length": 5}"#).unwrap();
    let mut engine = create(ExperimentKind::DigitSpan, &options, StdRng::seed_from_u64(12)).unwrap();
    let issued = run(engine.as_mut());

    // lengths 3..=5 forward, then again backward
    assert_eq!(issued.len(), 6);
    assert_eq!(issued.last().unwrap().trial_number, 6);

    let ExperimentResults::DigitSpan(DigitSpanResults {
        forward_span,
        backward_span,
        total_span,
        max_span_achieved,
        ..
    }) = engine.results()
    else {
        panic!("digit span results expected");
    };
    assert_eq!(forward_span, Some(5));
    assert_eq!(backward_span, Some(5));
    assert_eq!(total_span, Some(10));
    assert_eq!(max_span_achieved, 5);
}

#[test]
fn practice_does_not_touch_history() {
    let mut engine = create(
        ExperimentKind::DigitSpan,
        &Options::new(),
        StdRng::seed_from_u64(2),
    )
    .unwrap();
    let practice = engine.practice_trials().unwrap();
    assert_eq!(practice.len(), 2);
    for trial in &practice {
        let response = ResponseRecord::for_trial(trial, Some("0"), 900.0);
        let feedback = engine.score_practice(trial, &response).unwrap();
        assert!(!feedback.correct);
        assert!(feedback.continue_session);
    }
    assert!(engine.history().is_empty());

    engine.end_practice();
    assert!(engine.practice_trials().is_none());
    assert_eq!(engine.next_trial().unwrap().trial_number, 1);
}

#[test]
fn snapshot_serializes_state() {
    let mut engine = create(
        ExperimentKind::Sart,
        &small_options(ExperimentKind::Sart),
        StdRng::seed_from_u64(6),
    )
    .unwrap();
    let trial = engine.next_trial().unwrap();
    engine
        .record_response(ResponseRecord::for_trial(&trial, perfect(&trial), 380.0))
        .unwrap();

    let json = serde_json::to_value(engine.snapshot()).unwrap();
    assert_eq!(json["experiment_type"], "sart");
    assert_eq!(json["phase"], "test");
    assert_eq!(json["trial_number"], 1);
    assert_eq!(json["history"].as_array().unwrap().len(), 1);
    assert_eq!(json["configuration"]["total_trials"], 30);
}

#[test]
fn session_registry_drives_a_sink() {
    let mut sessions = SessionRegistry::new(MemorySink::new());
    let started = sessions
        .start_seeded(
            ExperimentKind::Sart,
            Some("S-001"),
            &small_options(ExperimentKind::Sart),
            21,
        )
        .unwrap();
    assert_eq!(started.instructions.len(), 5);

    let id = started.session_id;
    let results = loop {
        match sessions.next_trial(&id).unwrap() {
            NextStep::Trial(trial) => {
                let response = ResponseRecord::for_trial(&trial, perfect(&trial), 350.0);
                sessions.record_response(&id, response).unwrap();
            }
            NextStep::Complete(results) => break results,
        }
    };

    let ExperimentResults::Sart(sart) = &results else {
        panic!("SART results expected");
    };
    assert_eq!(sart.total_trials, 30);
    assert_eq!(sart.commission_errors, 0);
    assert_eq!(sart.omission_errors, 0);

    let sink = sessions.sink();
    assert_eq!(sink.trials.len(), 30);
    assert_eq!(sink.responses.len(), 30);
    assert_eq!(sink.results, vec![(id.clone(), results)]);
}
