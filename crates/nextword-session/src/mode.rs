//! Adaptive choice between completing the current word and predicting the next.
//!
//! Every input event is mapped through a fixed dispatch table to a
//! [`ModeTarget`]. Immediate targets are reported as-is. Debounced targets
//! come from word-boundary events under the adaptive preference and only
//! move the confirmed mode after `debounce` consecutive events agree.
//!
//! The machine keeps only the confirmed mode and the pending vote; the mode
//! last shown is the caller's to remember.

use nextword_core::settings::{ModePreference, ModeSettings};
use tracing::debug;

use crate::types::SuggestionMode;

/// Observations fed to the mode machine for one event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeSignals {
    /// A partial word is currently being typed.
    pub partial_word: bool,
    /// A word was just committed.
    pub word_boundary: bool,
    /// Confidence of the top next-word prediction for the current context.
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeTarget {
    /// Report this mode now.
    Immediate(SuggestionMode),
    /// A qualifying event voting for this mode; subject to debouncing.
    Debounced(SuggestionMode),
}

#[derive(Debug, Clone)]
pub struct ModeMachine {
    preference: ModePreference,
    threshold: f64,
    debounce: u32,
    prediction_enabled: bool,
    confirmed: SuggestionMode,
    pending: Option<(SuggestionMode, u32)>,
}

impl ModeMachine {
    pub fn new(settings: &ModeSettings, prediction_enabled: bool) -> Self {
        Self {
            preference: settings.preference,
            threshold: settings.min_confidence_threshold,
            debounce: settings.debounce.max(1),
            prediction_enabled,
            confirmed: SuggestionMode::CurrentWord,
            pending: None,
        }
    }

    /// Dispatch table from preference and signals to a target.
    pub fn target(&self, signals: &ModeSignals) -> ModeTarget {
        use ModePreference as P;
        use ModeTarget::{Debounced, Immediate};
        use SuggestionMode as M;

        if !self.prediction_enabled {
            return Immediate(M::CurrentWord);
        }
        match (self.preference, signals.partial_word, signals.word_boundary) {
            (P::ForceCurrentWord, _, _) => Immediate(M::CurrentWord),
            (P::Hybrid, _, _) => Immediate(M::Hybrid),
            (P::ForceNextWord, true, _) => Immediate(M::CurrentWord),
            (P::ForceNextWord, false, _) => Immediate(M::NextWord),
            (P::Adaptive, true, _) => Immediate(M::CurrentWord),
            (P::Adaptive, false, true) if signals.confidence >= self.threshold => {
                Debounced(M::NextWord)
            }
            (P::Adaptive, false, true) => Debounced(M::CurrentWord),
            (P::Adaptive, false, false) => Immediate(M::CurrentWord),
        }
    }

    /// Feed one event and return the mode to display.
    pub fn step(&mut self, signals: &ModeSignals) -> SuggestionMode {
        match self.target(signals) {
            ModeTarget::Immediate(mode) => {
                if self.preference != ModePreference::Adaptive || !self.prediction_enabled {
                    self.confirmed = mode;
                    self.pending = None;
                }
                mode
            }
            ModeTarget::Debounced(mode) => {
                self.vote(mode);
                self.confirmed
            }
        }
    }

    fn vote(&mut self, mode: SuggestionMode) {
        if mode == self.confirmed {
            self.pending = None;
            return;
        }
        let count = match self.pending {
            Some((pending, n)) if pending == mode => n + 1,
            _ => 1,
        };
        if count >= self.debounce {
            debug!(from = ?self.confirmed, to = ?mode, "suggestion mode switched");
            self.confirmed = mode;
            self.pending = None;
        } else {
            self.pending = Some((mode, count));
        }
    }

    /// Mode used at word boundaries, after debouncing.
    pub fn confirmed(&self) -> SuggestionMode {
        self.confirmed
    }

    pub fn reset(&mut self) {
        self.confirmed = SuggestionMode::CurrentWord;
        self.pending = None;
    }
}
