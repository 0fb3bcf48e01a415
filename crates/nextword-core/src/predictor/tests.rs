use std::collections::HashSet;

use super::*;
use crate::index::{IndexBuilder, MemoryIndex};

const NOW: u64 = 1_700_000_000;

fn scenario_index() -> MemoryIndex {
    IndexBuilder::new()
        .add_unigram("the", 1000)
        .add_unigram("you", 800)
        .add_unigram("and", 600)
        .add_unigram("them", 300)
        .add_unigram("things", 50)
        .add_bigram("see", "them", 30)
        .add_bigram("see", "you", 10)
        .add_bigram("see", "it", 5)
        .add_trigram("how", "are", "you", 120)
        .add_trigram("how", "are", "things", 40)
        .build()
}

fn predictor(index: MemoryIndex) -> NextWordPredictor {
    NextWordPredictor::new(&Settings::default(), Some(Arc::new(index)))
}

fn ctx(words: &[&str]) -> Context {
    Context::from_words(words)
}

#[test]
fn test_scenario_trigram_with_unigram_fallback() {
    let index = IndexBuilder::new()
        .add_unigram("the", 1000)
        .add_unigram("you", 800)
        .add_unigram("and", 600)
        .add_trigram("how", "are", "you", 120)
        .add_trigram("how", "are", "things", 40)
        .build();
    let p = predictor(index).predict_at(&ctx(&["how", "are"]), None, 3, NOW);
    assert_eq!(p.words(), vec!["you", "things", "the"]);
    assert!(p.candidates.iter().all(|c| c.source == CandidateSource::Static));
    assert_eq!(p.level, Some(BackoffLevel::Trigram));
}

#[test]
fn test_scenario_unigram_only() {
    let index = IndexBuilder::new()
        .add_unigram("the", 1000)
        .add_unigram("of", 700)
        .add_unigram("and", 600)
        .add_unigram("to", 500)
        .build();
    let p = predictor(index).predict_at(&ctx(&["see"]), None, 3, NOW);
    assert_eq!(p.words(), vec!["the", "of", "and"]);
    assert_eq!(p.level, Some(BackoffLevel::Unigram));
}

#[test]
fn test_scenario_personal_weight_outranks_static() {
    let p = predictor(scenario_index());
    let c = ctx(&["see"]);
    assert_eq!(p.predict_at(&c, None, 3, NOW).words()[0], "them");

    let mut store = LearningStore::default();
    for _ in 0..5 {
        store.record_transition_at(&c, "you", NOW);
    }
    let out = p.predict_at(&c, Some(&store), 3, NOW);
    assert_eq!(out.words()[0], "you");
    assert_eq!(out.candidates[0].source, CandidateSource::Blended);
    assert_eq!(out.candidates[1].word, "them");
    assert_eq!(out.candidates[1].source, CandidateSource::Static);
}

#[test]
fn test_personal_only_candidate() {
    let p = predictor(scenario_index());
    let mut store = LearningStore::default();
    store.record_transition_at(&ctx(&["see"]), "ya", NOW);
    store.record_transition_at(&ctx(&["see"]), "ya", NOW);
    let out = p.predict_at(&ctx(&["see"]), Some(&store), 5, NOW);
    let ya = out.candidates.iter().find(|c| c.word == "ya").unwrap();
    assert_eq!(ya.source, CandidateSource::Personal);
    assert!((ya.score - 0.4).abs() < 1e-9);
}

#[test]
fn test_missing_index_disables_prediction() {
    let p = NextWordPredictor::new(&Settings::default(), None);
    assert!(!p.has_index());
    assert!(p.predict_at(&ctx(&["see"]), None, 3, NOW).is_empty());

    // Learned pairs do not leak through without an index.
    let mut store = LearningStore::default();
    store.record_transition_at(&ctx(&["see"]), "you", NOW);
    let out = p.predict_at(&ctx(&["see"]), Some(&store), 3, NOW);
    assert!(out.is_empty());
    assert_eq!(out.level, None);
    assert_eq!(
        p.predict_within(&ctx(&["see"]), Some(&store), 3, Deadline::none()),
        Ok(Prediction::default())
    );
}

#[test]
fn test_prediction_disabled() {
    let mut settings = Settings::default();
    settings.prediction.enabled = false;
    let p = NextWordPredictor::new(&settings, Some(Arc::new(scenario_index())));
    assert!(p.predict_at(&ctx(&["how", "are"]), None, 3, NOW).is_empty());
}

#[test]
fn test_learning_disabled_ignores_store() {
    let mut settings = Settings::default();
    settings.learning.enabled = false;
    let p = NextWordPredictor::new(&settings, Some(Arc::new(scenario_index())));
    let mut store = LearningStore::default();
    for _ in 0..5 {
        store.record_transition_at(&ctx(&["see"]), "you", NOW);
    }
    let out = p.predict_at(&ctx(&["see"]), Some(&store), 3, NOW);
    assert_eq!(out.words()[0], "them");
}

#[test]
fn test_score_floor_drops_weak_candidates() {
    let mut settings = Settings::default();
    settings.prediction.score_floor = 0.5;
    let p = NextWordPredictor::new(&settings, Some(Arc::new(scenario_index())));
    let out = p.predict_at(&ctx(&["how", "are"]), None, 3, NOW);
    assert_eq!(out.words(), vec!["you"]);
}

#[test]
fn test_output_properties() {
    let p = predictor(scenario_index());
    let mut store = LearningStore::default();
    store.record_transition_at(&ctx(&["how", "are"]), "things", NOW);
    store.record_transition_at(&ctx(&["see"]), "the", NOW);
    let contexts = [
        ctx(&[]),
        ctx(&["see"]),
        ctx(&["how", "are"]),
        ctx(&["unknown", "words"]),
    ];
    for c in &contexts {
        for k in 0..6 {
            let out = p.predict_at(c, Some(&store), k, NOW);
            assert!(out.len() <= k);
            let unique: HashSet<&str> = out.candidates.iter().map(|c| c.word.as_str()).collect();
            assert_eq!(unique.len(), out.len());
            assert!(out.candidates.windows(2).all(|w| w[0].score >= w[1].score));
            assert_eq!(out, p.predict_at(c, Some(&store), k, NOW));
        }
    }
}

#[test]
fn test_confidence() {
    let p = predictor(scenario_index());
    let out = p.predict_at(&ctx(&["how", "are"]), None, 3, NOW);
    assert!((out.confidence() - 0.75).abs() < 1e-9);
    assert_eq!(Prediction::default().confidence(), 0.0);

    let mut store = LearningStore::default();
    for _ in 0..5 {
        store.record_transition_at(&ctx(&["how", "are"]), "you", NOW);
    }
    let out = p.predict_at(&ctx(&["how", "are"]), Some(&store), 3, NOW);
    assert_eq!(out.confidence(), 1.0);
}

#[test]
fn test_expired_deadline() {
    let p = predictor(scenario_index());
    let deadline = Deadline::after(Duration::ZERO);
    assert!(deadline.expired());
    assert_eq!(
        p.predict_within(&ctx(&["see"]), None, 3, deadline),
        Err(PredictError::BudgetExceeded)
    );

    let generous = Deadline::after(Duration::from_secs(60));
    assert!(!generous.expired());
    assert!(!Deadline::none().expired());
    let out = p.predict_within(&ctx(&["see"]), None, 3, generous).unwrap();
    assert_eq!(out.words(), vec!["them", "you", "it"]);
}

/// Distinct four-letter word for `i` ("aaaa", "aaab", ...).
fn letter_word(mut i: usize) -> String {
    let mut out = [b'a'; 4];
    for slot in out.iter_mut().rev() {
        *slot = b'a' + (i % 26) as u8;
        i /= 26;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[test]
fn test_learned_successors_on_large_table_fit_budget() {
    let mut builder = IndexBuilder::new();
    builder.add_unigram("see", 10);
    for i in 0..200_000 {
        builder.add_bigram("see", &letter_word(i), 200_000 - i as u64);
    }
    let p = predictor(builder.build());

    let mut store = LearningStore::default();
    for i in 100_000..100_300 {
        store.record_transition_at(&ctx(&["see"]), &letter_word(i), NOW);
    }
    assert_eq!(store.successors(&ctx(&["see"]), NOW).len(), 300);

    let deadline = Deadline::after(Duration::from_millis(100));
    let out = p
        .predict_within(&ctx(&["see"]), Some(&store), 3, deadline)
        .unwrap();
    assert_eq!(out.len(), 3);
    // Learned words outrank the thin static scores; the static part breaks ties.
    assert_eq!(out.words()[0], letter_word(100_000));
    assert_eq!(out.candidates[0].source, CandidateSource::Blended);
}
