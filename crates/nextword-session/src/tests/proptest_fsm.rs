//! Property-based tests for the suggestion mode machine and the session.
//!
//! Generates random event sequences via proptest and verifies that
//! structural invariants hold after every action.

use std::collections::HashSet;

use proptest::prelude::*;

use nextword_core::settings::{ModePreference, Settings};

use super::{make_learning_session, strings};
use crate::mode::{ModeMachine, ModeSignals, ModeTarget};
use crate::{SuggestionMode, SuggestionSource};

// ---------------------------------------------------------------------------
// Mode machine
// ---------------------------------------------------------------------------

fn arb_signals() -> impl Strategy<Value = ModeSignals> {
    (any::<bool>(), any::<bool>(), 0.0f64..=1.0).prop_map(|(partial_word, word_boundary, confidence)| {
        ModeSignals {
            partial_word,
            word_boundary,
            confidence,
        }
    })
}

fn arb_preference() -> impl Strategy<Value = ModePreference> {
    prop::sample::select(vec![
        ModePreference::Adaptive,
        ModePreference::ForceNextWord,
        ModePreference::ForceCurrentWord,
        ModePreference::Hybrid,
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The confirmed mode under the adaptive preference only changes after
    /// `debounce` consecutive qualifying events vote for the new mode.
    #[test]
    fn adaptive_switches_only_after_debounce(
        debounce in 1u32..5,
        events in prop::collection::vec(arb_signals(), 1..200),
    ) {
        let mut settings = Settings::default().mode;
        settings.debounce = debounce;
        let mut m = ModeMachine::new(&settings, true);

        let mut streak: Option<(SuggestionMode, u32)> = None;
        for signals in &events {
            let before = m.confirmed();
            let target = m.target(signals);
            let reported = m.step(signals);

            match target {
                ModeTarget::Immediate(mode) => {
                    prop_assert_eq!(reported, mode);
                    prop_assert_eq!(m.confirmed(), before);
                }
                ModeTarget::Debounced(mode) => {
                    prop_assert!(!signals.partial_word);
                    streak = match streak {
                        Some((s, n)) if s == mode => Some((s, n + 1)),
                        _ => Some((mode, 1)),
                    };
                    if m.confirmed() != before {
                        prop_assert_eq!(m.confirmed(), mode);
                        let (_, n) = streak.unwrap();
                        prop_assert!(n >= debounce);
                        streak = None;
                    }
                    prop_assert_eq!(reported, m.confirmed());
                }
            }
            if signals.partial_word {
                prop_assert_eq!(reported, SuggestionMode::CurrentWord);
            }
        }
    }

    /// Alternating high/low confidence at word boundaries never causes more
    /// than one switch inside a debounce window.
    #[test]
    fn alternating_confidence_is_stable(
        debounce in 2u32..5,
        len in 1usize..100,
        start_high in any::<bool>(),
    ) {
        let mut settings = Settings::default().mode;
        settings.debounce = debounce;
        let mut m = ModeMachine::new(&settings, true);
        let mut transitions = 0;
        for i in 0..len {
            let high = (i % 2 == 0) == start_high;
            let before = m.confirmed();
            m.step(&ModeSignals {
                partial_word: false,
                word_boundary: true,
                confidence: if high { 0.9 } else { 0.1 },
            });
            if m.confirmed() != before {
                transitions += 1;
            }
        }
        prop_assert!(transitions <= 1);
    }

    /// `step` is a pure function of the machine state and the signals.
    #[test]
    fn step_is_deterministic(
        preference in arb_preference(),
        events in prop::collection::vec(arb_signals(), 1..100),
    ) {
        let mut settings = Settings::default().mode;
        settings.preference = preference;
        let mut a = ModeMachine::new(&settings, true);
        let mut b = a.clone();
        for signals in &events {
            prop_assert_eq!(a.step(signals), b.step(signals));
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Action {
    Commit(&'static str),
    Keystroke(&'static str),
    SentenceBoundary,
    FieldChanged,
    Predict(usize),
}

const WORDS: &[&str] = &[
    "how", "are", "you", "see", "them", "the", "things", "hello", "And", "it.", ",", "42",
];

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        10 => prop::sample::select(WORDS).prop_map(Action::Commit),
        5 => prop::sample::select(vec!["", "h", "he", "th", "yo"]).prop_map(Action::Keystroke),
        2 => Just(Action::SentenceBoundary),
        1 => Just(Action::FieldChanged),
        3 => (0usize..6).prop_map(Action::Predict),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn session_invariants_hold(
        preference in arb_preference(),
        actions in prop::collection::vec(arb_action(), 1..80),
    ) {
        let (mut session, _store) = make_learning_session(preference);
        let completions = strings(&["hello", "help"]);
        for action in &actions {
            let resp = match action {
                Action::Commit(w) => Some(session.on_word_committed(w, &completions)),
                Action::Keystroke(p) => Some(session.on_keystroke(p, &completions)),
                Action::SentenceBoundary => {
                    session.on_sentence_boundary();
                    prop_assert!(session.context().is_empty());
                    None
                }
                Action::FieldChanged => {
                    session.on_field_changed();
                    prop_assert!(session.context().is_empty());
                    prop_assert_eq!(session.current_mode(), SuggestionMode::CurrentWord);
                    None
                }
                Action::Predict(k) => {
                    let words = session.predict(*k);
                    prop_assert!(words.len() <= *k);
                    let unique: HashSet<&String> = words.iter().collect();
                    prop_assert_eq!(unique.len(), words.len());
                    prop_assert_eq!(session.predict(*k), words);
                    None
                }
            };

            prop_assert!(session.context().len() <= 2);
            if let Some(resp) = resp {
                prop_assert_eq!(resp.mode, session.current_mode());
                let texts: HashSet<String> =
                    resp.items.iter().map(|i| i.text.to_lowercase()).collect();
                prop_assert_eq!(texts.len(), resp.items.len());
                match resp.mode {
                    SuggestionMode::CurrentWord => prop_assert!(resp
                        .items
                        .iter()
                        .all(|i| i.source == SuggestionSource::Completion)),
                    SuggestionMode::NextWord => prop_assert!(resp
                        .items
                        .iter()
                        .all(|i| i.source == SuggestionSource::Prediction)),
                    SuggestionMode::Hybrid => {}
                }
                if let Action::Keystroke(p) = action {
                    if !p.is_empty() && preference != ModePreference::Hybrid {
                        prop_assert_eq!(resp.mode, SuggestionMode::CurrentWord);
                    }
                }
            }
        }
    }
}
