use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use cogex_core::{
    AssetRequest, Input, KeySource, LoadError, LogRecord, PresentError, Presenter, StimulusLoader,
    StimulusRef,
};
use cogex_experiment::{
    DispatchConfig, DispatchOutcome, Session, SessionConfig, SessionError, SetupError,
    parse_event_script,
};
use cogex_timing::{Clock, HighPrecisionTimer, ManualClock};

/// Stands in for the window: loads by echoing the key, records what was
/// shown, and releases scripted input once the clock reaches it
struct FakeScreen {
    clock: Option<ManualClock>,
    inputs: VecDeque<(u64, Input)>,
    shown: Vec<String>,
    fail_on: Option<String>,
}

impl FakeScreen {
    fn manual(clock: &ManualClock, inputs: Vec<(u64, Input)>) -> Self {
        Self {
            clock: Some(clock.clone()),
            inputs: inputs.into(),
            shown: Vec::new(),
            fail_on: None,
        }
    }

    fn realtime(inputs: Vec<(u64, Input)>) -> Self {
        Self {
            clock: None,
            inputs: inputs.into(),
            shown: Vec::new(),
            fail_on: None,
        }
    }
}

impl StimulusLoader for FakeScreen {
    type Handle = Arc<str>;

    fn load(&mut self, request: &AssetRequest) -> Result<Arc<str>, LoadError> {
        if request.key.contains("missing") {
            return Err(LoadError::NotFound(request.key.clone().into()));
        }
        let name = Path::new(&request.key)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| request.key.clone());
        Ok(Arc::from(name))
    }
}

impl Presenter<Arc<str>> for FakeScreen {
    fn present(&mut self, stimulus: StimulusRef<'_, Arc<str>>) -> Result<(), PresentError> {
        let label = match stimulus {
            StimulusRef::Asset(name) => name.to_string(),
            StimulusRef::FixationCross => "+".to_string(),
            StimulusRef::Blank => String::new(),
        };
        if self.fail_on.as_deref() == Some(label.as_str()) {
            return Err(PresentError::Audio("device unplugged".into()));
        }
        if let Some(clock) = &self.clock {
            clock.advance(1);
        }
        self.shown.push(label);
        Ok(())
    }
}

impl KeySource for FakeScreen {
    fn poll_key(&mut self) -> Option<Input> {
        let due = match (&self.clock, self.inputs.front()) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(clock), Some((at, _))) => *at <= clock.now_ms(),
        };
        if due {
            self.inputs.pop_front().map(|(_, input)| input)
        } else {
            None
        }
    }
}

const TWO_SOUNDS: &str = "A\t1000\tsound\ta.wav\nB\t2000\tsound\tb.wav\n";

fn trigger() -> (u64, Input) {
    (0, Input::Key("t".into()))
}

fn prepare(config: SessionConfig, script: &str, screen: &mut FakeScreen) -> Session<Arc<str>> {
    let rows = parse_event_script(script).unwrap();
    Session::prepare(config, "run1.csv", &rows, Path::new("stim"), screen).unwrap()
}

fn presentations(session: &Session<Arc<str>>) -> Vec<(u64, u64)> {
    session
        .log()
        .records()
        .iter()
        .filter_map(|r| match r {
            LogRecord::Presentation {
                clock_time_ms,
                target_onset_ms,
                ..
            } => Some((*clock_time_ms, *target_onset_ms)),
            LogRecord::KeyPress { .. } => None,
        })
        .collect()
}

#[test]
fn two_row_script_logs_two_presentations_within_lookahead() {
    let mut clock = ManualClock::new();
    let mut screen = FakeScreen::manual(&clock, vec![trigger()]);
    let mut session = prepare(SessionConfig::default(), TWO_SOUNDS, &mut screen);
    assert_eq!(session.stimuli_loaded(), 4);

    let outcome = session.run(&mut screen, &mut clock).unwrap();
    assert_eq!(outcome, DispatchOutcome::Completed);

    let lookahead = session.config().dispatch.lookahead_ms;
    let presented = presentations(&session);
    assert_eq!(presented.len(), 2);
    for (clock_time, target) in presented {
        assert!(clock_time >= target - lookahead);
        assert!(clock_time <= target + lookahead);
    }
    assert_eq!(
        screen.shown,
        vec![
            "Waiting for scanner sync (or press 't')",
            "+",
            "a.wav",
            "b.wav",
            "+",
            "Merci !",
        ]
    );
}

#[test]
fn key_presses_are_logged_during_waits_and_rest() {
    let mut clock = ManualClock::new();
    let inputs = vec![
        trigger(),
        (1500, Input::Key("b".into())),
        (2500, Input::Key("y".into())),
    ];
    let mut screen = FakeScreen::manual(&clock, inputs);
    let config = SessionConfig {
        dispatch: DispatchConfig::default().with_total_duration(3000),
        ..SessionConfig::default()
    };
    let mut session = prepare(config, TWO_SOUNDS, &mut screen);
    session.run(&mut screen, &mut clock).unwrap();

    let records = session.log().records();
    let kinds: Vec<bool> = records.iter().map(LogRecord::is_presentation).collect();
    assert_eq!(kinds, vec![true, false, true, false]);
    let times: Vec<u64> = records.iter().map(LogRecord::clock_time_ms).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(times[1], 1500);
    assert!((2500..2600).contains(&times[3]));
}

#[test]
fn trigger_ignores_other_keys_and_starts_the_clock() {
    let mut clock = ManualClock::new();
    clock.set(40_000);
    let inputs = vec![(40_010, Input::Key("a".into())), (40_050, Input::Key("t".into()))];
    let mut screen = FakeScreen::manual(&clock, inputs);
    let mut session = prepare(SessionConfig::default(), TWO_SOUNDS, &mut screen);
    session.run(&mut screen, &mut clock).unwrap();

    // nothing before the trigger is logged; onsets count from it
    assert!(session.log().key_presses().next().is_none());
    let presented = presentations(&session);
    assert!(presented[0].0 < 1000);
}

#[test]
fn interrupt_runs_closing_and_keeps_partial_log() {
    let mut clock = ManualClock::new();
    let mut screen = FakeScreen::manual(&clock, vec![trigger(), (1500, Input::Abort)]);
    let mut session = prepare(SessionConfig::default(), TWO_SOUNDS, &mut screen);

    let outcome = session.run(&mut screen, &mut clock).unwrap();
    assert_eq!(outcome, DispatchOutcome::Interrupted);
    assert_eq!(presentations(&session).len(), 1);
    assert_eq!(session.pending(), 1);
    assert_eq!(screen.shown.last().map(String::as_str), Some("Merci !"));
}

#[test]
fn abort_on_the_closing_screen_exits_at_once() {
    let mut clock = ManualClock::new();
    let mut screen = FakeScreen::manual(&clock, vec![trigger(), (2500, Input::Abort)]);
    let mut session = prepare(SessionConfig::default(), TWO_SOUNDS, &mut screen);

    let outcome = session.run(&mut screen, &mut clock).unwrap();
    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(presentations(&session).len(), 2);
    assert_eq!(screen.shown.last().map(String::as_str), Some("Merci !"));
    // the full delay would run to about 4000 ms
    assert!(clock.now_ms() <= 2501, "{}", clock.now_ms());
}

#[test]
fn presentation_failure_aborts_without_closing() {
    let mut clock = ManualClock::new();
    let mut screen = FakeScreen::manual(&clock, vec![trigger()]);
    screen.fail_on = Some("b.wav".into());
    let mut session = prepare(SessionConfig::default(), TWO_SOUNDS, &mut screen);

    let err = session.run(&mut screen, &mut clock).unwrap_err();
    match err {
        SessionError::Presentation {
            id,
            target_onset_ms,
            ..
        } => {
            assert_eq!(id, "b.wav");
            assert_eq!(target_onset_ms, 2000);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(session.log().len(), 1);
    assert!(!screen.shown.iter().any(|s| s == "Merci !"));

    let mut csv = Vec::new();
    session.log().write_csv(&mut csv).unwrap();
    assert_eq!(String::from_utf8(csv).unwrap().lines().count(), 2);
}

#[test]
fn unresolvable_stimulus_fails_before_the_run() {
    let rows = parse_event_script("A\t0\tsound\tok.wav\nB\t10\tpicture\tmissing.png\n").unwrap();
    let mut screen = FakeScreen::realtime(vec![]);
    let err = Session::prepare(
        SessionConfig::default(),
        "run1.csv",
        &rows,
        Path::new("stim"),
        &mut screen,
    )
    .err()
    .unwrap();
    assert!(matches!(err, SetupError::Stimulus { line: 2, .. }));
}

#[test]
fn realtime_clock_presents_close_to_onsets() {
    let mut timer = HighPrecisionTimer::new();
    let mut screen = FakeScreen::realtime(vec![trigger()]);
    let config = SessionConfig {
        closing_delay_ms: 0,
        ..SessionConfig::default()
    };
    let script = "A\t50\tsound\ta.wav\nB\t120\tsound\tb.wav\n";
    let mut session = prepare(config, script, &mut screen);
    session.run(&mut screen, &mut timer).unwrap();

    let lookahead = session.config().dispatch.lookahead_ms;
    for (clock_time, target) in presentations(&session) {
        assert!(clock_time + lookahead >= target);
        // loose upper bound for loaded CI machines
        assert!(clock_time <= target + 50, "{clock_time} vs {target}");
    }
    assert!(timer.now_ms() >= 110);
}
