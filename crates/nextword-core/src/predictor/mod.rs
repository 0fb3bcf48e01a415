//! Next-word prediction: blends the static n-gram ranking with the user's
//! learned transitions.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, debug_span};

use crate::context::Context;
use crate::index::StaticIndex;
use crate::ngram::{rank_order, BackoffLevel, NgramModel};
use crate::settings::{PredictionSettings, Settings};
use crate::user_history::{now_epoch, LearningStore};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PredictError {
    #[error("prediction exceeded its time budget")]
    BudgetExceeded,
}

/// Where a candidate's score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateSource {
    /// Static language model only.
    Static,
    /// User learning store only.
    Personal,
    /// Both contributed.
    Blended,
}

impl CandidateSource {
    fn from_parts(ngram: f64, boost: f64) -> Option<Self> {
        match (ngram > 0.0, boost > 0.0) {
            (true, false) => Some(Self::Static),
            (false, true) => Some(Self::Personal),
            (true, true) => Some(Self::Blended),
            (false, false) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionCandidate {
    pub word: String,
    pub score: f64,
    pub source: CandidateSource,
}

/// Ordered prediction output, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prediction {
    pub candidates: Vec<PredictionCandidate>,
    /// Most specific n-gram level that contributed, if any.
    pub level: Option<BackoffLevel>,
}

impl Prediction {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn words(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.word.clone()).collect()
    }

    /// Top candidate's score clamped to [0, 1]; 0 when empty.
    pub fn confidence(&self) -> f64 {
        self.candidates
            .first()
            .map_or(0.0, |c| c.score.clamp(0.0, 1.0))
    }
}

/// Point in time after which a prediction should be abandoned.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now().checked_add(budget))
    }

    /// A deadline that never expires.
    pub fn none() -> Self {
        Self(None)
    }

    pub fn expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    fn check(&self, stage: &str) -> Result<(), PredictError> {
        if self.expired() {
            debug!(stage, "prediction budget exceeded");
            return Err(PredictError::BudgetExceeded);
        }
        Ok(())
    }
}

pub struct NextWordPredictor {
    model: Option<NgramModel>,
    settings: PredictionSettings,
    learning_enabled: bool,
}

impl NextWordPredictor {
    /// `index` is `None` when no static index is available for the active
    /// language; prediction is then disabled and every request is empty.
    pub fn new(settings: &Settings, index: Option<Arc<dyn StaticIndex>>) -> Self {
        if index.is_none() {
            debug!("no static index loaded");
        }
        Self {
            model: index.map(|idx| NgramModel::new(idx, &settings.ngram)),
            settings: settings.prediction.clone(),
            learning_enabled: settings.learning.enabled,
        }
    }

    pub fn has_index(&self) -> bool {
        self.model.is_some()
    }

    pub fn settings(&self) -> &PredictionSettings {
        &self.settings
    }

    /// Predict up to `top_k` next words without a time budget.
    pub fn predict(
        &self,
        context: &Context,
        store: Option<&LearningStore>,
        top_k: usize,
    ) -> Prediction {
        self.predict_at(context, store, top_k, now_epoch())
    }

    /// [`predict`](Self::predict) evaluated at an explicit time.
    pub fn predict_at(
        &self,
        context: &Context,
        store: Option<&LearningStore>,
        top_k: usize,
        now: u64,
    ) -> Prediction {
        self.run(context, store, top_k, now, Deadline::none())
            .unwrap_or_default()
    }

    /// Predict, giving up with [`PredictError::BudgetExceeded`] once
    /// `deadline` has passed.
    pub fn predict_within(
        &self,
        context: &Context,
        store: Option<&LearningStore>,
        top_k: usize,
        deadline: Deadline,
    ) -> Result<Prediction, PredictError> {
        self.run(context, store, top_k, now_epoch(), deadline)
    }

    fn run(
        &self,
        context: &Context,
        store: Option<&LearningStore>,
        top_k: usize,
        now: u64,
        deadline: Deadline,
    ) -> Result<Prediction, PredictError> {
        let _span = debug_span!("predict", context_len = context.len(), top_k).entered();
        if !self.settings.enabled || top_k == 0 {
            return Ok(Prediction::default());
        }
        let Some(model) = &self.model else {
            debug!("prediction disabled: no static index");
            return Ok(Prediction::default());
        };
        let store = store.filter(|_| self.learning_enabled);
        deadline.check("start")?;

        // word → (ngram score, personal boost)
        let mut pool: HashMap<String, (f64, f64)> = HashMap::new();
        let ranking = model.rank(context, self.settings.pool_size.max(top_k));
        let level = ranking.deepest_level();
        for ranked in ranking.words {
            pool.insert(ranked.word, (ranked.score, 0.0));
        }
        deadline.check("ngram")?;

        if let Some(store) = store {
            for (word, parts) in pool.iter_mut() {
                parts.1 = store.boost(context, word, now);
            }
            for (word, boost) in store.successors(context, now) {
                if pool.contains_key(&word) {
                    continue;
                }
                let ngram = model.score(context, &word);
                pool.insert(word, (ngram, boost));
            }
        }
        deadline.check("personal")?;

        let mut candidates: Vec<(PredictionCandidate, u64)> = pool
            .into_iter()
            .filter_map(|(word, (ngram, boost))| {
                let source = CandidateSource::from_parts(ngram, boost)?;
                let score =
                    self.settings.static_weight * ngram + self.settings.personal_weight * boost;
                if score < self.settings.score_floor {
                    return None;
                }
                let freq = model.index().frequency(&word);
                Some((PredictionCandidate { word, score, source }, freq))
            })
            .collect();
        candidates.sort_by(|(a, fa), (b, fb)| {
            rank_order((a.score, *fa, a.word.as_str()), (b.score, *fb, b.word.as_str()))
        });
        candidates.truncate(top_k);

        debug!(candidates = candidates.len(), ?level);
        Ok(Prediction {
            candidates: candidates.into_iter().map(|(c, _)| c).collect(),
            level,
        })
    }
}
