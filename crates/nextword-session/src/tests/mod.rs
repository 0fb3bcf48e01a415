mod proptest_fsm;

use std::sync::{Arc, RwLock};

use nextword_core::index::{IndexBuilder, MemoryIndex};
use nextword_core::settings::{ModePreference, Settings};
use nextword_core::user_history::LearningStore;

use super::PredictionSession;

pub(super) fn make_test_index() -> Arc<MemoryIndex> {
    let index = IndexBuilder::new()
        .add_unigram("the", 1000)
        .add_unigram("you", 800)
        .add_unigram("and", 600)
        .add_unigram("them", 300)
        .add_unigram("hello", 120)
        .add_unigram("things", 50)
        .add_bigram("see", "them", 30)
        .add_bigram("see", "you", 10)
        .add_bigram("see", "it", 5)
        .add_bigram("are", "you", 30)
        .add_trigram("how", "are", "you", 120)
        .add_trigram("how", "are", "things", 40)
        .build();
    Arc::new(index)
}

pub(super) fn settings_with(preference: ModePreference) -> Settings {
    let mut settings = Settings::default();
    settings.mode.preference = preference;
    // Generous budget so slow CI machines never hit the fallback path.
    settings.prediction.budget_ms = 10_000;
    settings
}

pub(super) fn make_session(preference: ModePreference) -> PredictionSession {
    PredictionSession::new(settings_with(preference), Some(make_test_index()), None)
}

pub(super) fn make_learning_session(
    preference: ModePreference,
) -> (PredictionSession, Arc<RwLock<LearningStore>>) {
    let store = Arc::new(RwLock::new(LearningStore::default()));
    let session = PredictionSession::new(
        settings_with(preference),
        Some(make_test_index()),
        Some(Arc::clone(&store)),
    );
    (session, store)
}

pub(super) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
