/// What the suggestion strip is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SuggestionMode {
    /// Completions of the word being typed.
    #[default]
    CurrentWord,
    /// Predictions of the word that comes next.
    NextWord,
    /// Completions and predictions together, tagged by origin.
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionSource {
    Completion,
    Prediction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionItem {
    pub text: String,
    pub source: SuggestionSource,
}

/// Result of a keystroke or commit: the mode to display and its items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionResponse {
    pub mode: SuggestionMode,
    pub items: Vec<SuggestionItem>,
}

impl SuggestionResponse {
    pub fn texts(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
