//! Per-field prediction session: tracks context, asks the predictor for
//! next words, learns from commits, and decides which suggestions to show.
//!
//! `PredictionSession` is driven by the host's keyboard controller. All calls
//! are synchronous and never touch the disk; persistence runs on the
//! [`LearningPersistence`] worker.

pub mod mode;
pub mod persist;
mod response;
mod types;

#[cfg(test)]
mod tests;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use nextword_core::context::{Context, ContextTracker};
use nextword_core::index::StaticIndex;
use nextword_core::predictor::{Deadline, NextWordPredictor, Prediction};
use nextword_core::settings::Settings;
use nextword_core::unicode::normalize_word;
use nextword_core::user_history::LearningStore;
use tracing::{debug, warn};

pub use mode::{ModeMachine, ModeSignals, ModeTarget};
pub use persist::LearningPersistence;
pub use types::{SuggestionItem, SuggestionMode, SuggestionResponse, SuggestionSource};

/// A prediction started for a specific context. Finishing it after the
/// field changed yields nothing.
#[derive(Debug, Clone)]
pub struct PendingPrediction {
    generation: u64,
    context: Context,
    top_k: usize,
}

impl PendingPrediction {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

pub struct PredictionSession {
    settings: Settings,
    predictor: NextWordPredictor,
    store: Option<Arc<RwLock<LearningStore>>>,
    persistence: Option<Arc<LearningPersistence>>,

    tracker: ContextTracker,
    mode: ModeMachine,
    /// Mode of the last response handed out.
    shown_mode: SuggestionMode,

    /// Bumped whenever the context is invalidated; stale predictions are dropped.
    generation: u64,
    /// Result of the last completed prediction cycle, reused on budget overrun.
    last_prediction: Prediction,
}

impl PredictionSession {
    pub fn new(
        settings: Settings,
        index: Option<Arc<dyn StaticIndex>>,
        store: Option<Arc<RwLock<LearningStore>>>,
    ) -> Self {
        let predictor = NextWordPredictor::new(&settings, index);
        let mode = ModeMachine::new(&settings.mode, settings.prediction.enabled);
        Self {
            settings,
            predictor,
            store,
            persistence: None,
            tracker: ContextTracker::new(),
            mode,
            shown_mode: SuggestionMode::CurrentWord,
            generation: 0,
            last_prediction: Prediction::default(),
        }
    }

    pub fn with_persistence(mut self, persistence: Arc<LearningPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn context(&self) -> &Context {
        self.tracker.context()
    }

    pub fn current_mode(&self) -> SuggestionMode {
        self.shown_mode
    }

    /// Prediction computed in the last cycle.
    pub fn last_prediction(&self) -> &Prediction {
        &self.last_prediction
    }

    /// The partial word changed. `completions` are the host's candidates for it.
    pub fn on_keystroke(&mut self, partial: &str, completions: &[String]) -> SuggestionResponse {
        let partial_word = !partial.is_empty();
        let mode = self.mode.step(&ModeSignals {
            partial_word,
            word_boundary: false,
            confidence: self.last_prediction.confidence(),
        });
        self.shown_mode = mode;
        response::build_response(mode, partial_word, completions, &self.last_prediction)
    }

    /// A word was committed. Learns the transition, advances the context and
    /// returns suggestions for what follows.
    pub fn on_word_committed(&mut self, word: &str, completions: &[String]) -> SuggestionResponse {
        if self.settings.learning.enabled && !normalize_word(word).is_empty() {
            let before = self.tracker.context().clone();
            self.record_transition(&before, word);
        }
        self.tracker.on_word_committed(word);
        // The context moved on; anything still in flight is for the old one.
        self.generation += 1;

        let pending = self.begin_prediction();
        let prediction = self.finish_prediction(pending).unwrap_or_default();
        let mode = self.mode.step(&ModeSignals {
            partial_word: false,
            word_boundary: true,
            confidence: prediction.confidence(),
        });
        self.shown_mode = mode;
        response::build_response(mode, false, completions, &prediction)
    }

    pub fn on_sentence_boundary(&mut self) {
        self.tracker.on_sentence_boundary();
        self.generation += 1;
    }

    /// Focus moved to another field: forget context, mode and in-flight work.
    pub fn on_field_changed(&mut self) {
        self.tracker.on_field_changed();
        self.mode.reset();
        self.shown_mode = SuggestionMode::CurrentWord;
        self.generation += 1;
        self.last_prediction = Prediction::default();
    }

    /// Predicted next words for the current context, best first.
    pub fn predict(&mut self, top_k: usize) -> Vec<String> {
        let pending = self.begin_prediction_with(top_k);
        self.finish_prediction(pending)
            .map(|p| p.words())
            .unwrap_or_default()
    }

    pub fn begin_prediction(&self) -> PendingPrediction {
        self.begin_prediction_with(self.settings.prediction.top_k)
    }

    fn begin_prediction_with(&self, top_k: usize) -> PendingPrediction {
        PendingPrediction {
            generation: self.generation,
            context: self.tracker.context().clone(),
            top_k,
        }
    }

    /// Run a prediction started with [`begin_prediction`](Self::begin_prediction).
    /// Returns `None` without side effects when the context was invalidated in
    /// between. When the time budget runs out the previous result is reused.
    pub fn finish_prediction(&mut self, pending: PendingPrediction) -> Option<Prediction> {
        if pending.generation != self.generation {
            debug!(
                pending = pending.generation,
                current = self.generation,
                "dropping stale prediction"
            );
            return None;
        }

        let budget = Duration::from_millis(self.settings.prediction.budget_ms);
        let deadline = Deadline::after(budget);
        let guard = self.store.as_ref().and_then(|s| s.read().ok());
        let result = self.predictor.predict_within(
            &pending.context,
            guard.as_deref(),
            pending.top_k,
            deadline,
        );
        drop(guard);

        match result {
            Ok(prediction) => {
                self.last_prediction = prediction.clone();
                Some(prediction)
            }
            Err(e) => {
                debug!(error = %e, budget_ms = self.settings.prediction.budget_ms, "reusing previous prediction");
                Some(self.last_prediction.clone())
            }
        }
    }

    /// Record that `word` followed `context` in the learning store and
    /// journal it. No-op when learning is disabled or there is no store.
    pub fn record_transition(&mut self, context: &Context, word: &str) {
        if !self.settings.learning.enabled {
            return;
        }
        let Some(store) = &self.store else {
            return;
        };
        let record = match store.write() {
            Ok(mut s) => s.record_transition(context, word),
            Err(_) => {
                warn!("learning store lock poisoned, transition not recorded");
                return;
            }
        };
        if let (Some(record), Some(persistence)) = (record, &self.persistence) {
            persistence.journal(record);
        }
    }

    /// Forget everything the user taught the store, in memory and on disk.
    pub fn clear_learning(&mut self) {
        if let Some(store) = &self.store {
            match store.write() {
                Ok(mut s) => s.clear(),
                Err(_) => warn!("learning store lock poisoned, clear skipped"),
            }
        }
        if let Some(persistence) = &self.persistence {
            persistence.clear();
        }
        self.last_prediction = Prediction::default();
    }
}
