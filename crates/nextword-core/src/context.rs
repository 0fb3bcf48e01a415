//! Rolling window of the most recently committed words in the active field.

use crate::unicode::{ends_sentence, normalize_word};

/// Maximum number of context words used for prediction (trigram order - 1).
pub const MAX_CONTEXT_WORDS: usize = 2;

/// Position of a word in the context window, counted back from the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSlot {
    /// The word committed last.
    Previous,
    /// The word committed before `Previous`.
    BeforePrevious,
}

/// Ordered window of 0–2 normalised words, oldest first.
///
/// Invariant: a `BeforePrevious` word is only present when `Previous` is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Context {
    words: Vec<String>,
}

impl Context {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a context from already-committed words (oldest first). Words are
    /// normalised; empty ones are skipped and only the last two are kept.
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Self {
        let mut ctx = Self::empty();
        for w in words {
            ctx.push(normalize_word(w.as_ref()));
        }
        ctx
    }

    fn push(&mut self, word: String) {
        if word.is_empty() {
            return;
        }
        self.words.push(word);
        if self.words.len() > MAX_CONTEXT_WORDS {
            let excess = self.words.len() - MAX_CONTEXT_WORDS;
            self.words.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The word at `slot`, or `None` when that level of context is unavailable.
    pub fn slot(&self, slot: ContextSlot) -> Option<&str> {
        let back = match slot {
            ContextSlot::Previous => 1,
            ContextSlot::BeforePrevious => 2,
        };
        self.words
            .len()
            .checked_sub(back)
            .map(|i| self.words[i].as_str())
    }

    /// Words oldest first.
    pub fn words(&self) -> Vec<&str> {
        self.words.iter().map(String::as_str).collect()
    }

    /// The last `n` words (fewer when the window is shorter), oldest first.
    pub fn suffix(&self, n: usize) -> Vec<&str> {
        let start = self.words.len().saturating_sub(n);
        self.words[start..].iter().map(String::as_str).collect()
    }
}

/// Tracks the context window for the current input field.
#[derive(Debug, Default)]
pub struct ContextTracker {
    context: Context,
}

impl ContextTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a committed token. Tokens without letters are not words and
    /// leave the window untouched, unless they end the sentence.
    pub fn on_word_committed(&mut self, raw: &str) {
        self.context.push(normalize_word(raw));
        if ends_sentence(raw) {
            self.on_sentence_boundary();
        }
    }

    pub fn on_sentence_boundary(&mut self) {
        self.context.words.clear();
    }

    /// Focus moved to another field; nothing typed before applies.
    pub fn on_field_changed(&mut self) {
        self.context.words.clear();
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_keeps_last_two() {
        let mut t = ContextTracker::new();
        assert!(t.context().is_empty());
        t.on_word_committed("How");
        assert_eq!(t.context().words(), vec!["how"]);
        t.on_word_committed("are");
        t.on_word_committed("you");
        assert_eq!(t.context().words(), vec!["are", "you"]);
        assert_eq!(t.context().len(), 2);
    }

    #[test]
    fn test_slots() {
        let mut t = ContextTracker::new();
        assert_eq!(t.context().slot(ContextSlot::Previous), None);
        t.on_word_committed("see");
        assert_eq!(t.context().slot(ContextSlot::Previous), Some("see"));
        assert_eq!(t.context().slot(ContextSlot::BeforePrevious), None);
        t.on_word_committed("you");
        assert_eq!(t.context().slot(ContextSlot::Previous), Some("you"));
        assert_eq!(t.context().slot(ContextSlot::BeforePrevious), Some("see"));
    }

    #[test]
    fn test_sentence_boundary_clears() {
        let mut t = ContextTracker::new();
        t.on_word_committed("how");
        t.on_word_committed("are");
        t.on_sentence_boundary();
        assert!(t.context().is_empty());
        assert_eq!(t.context().slot(ContextSlot::Previous), None);
    }

    #[test]
    fn test_terminating_token_clears() {
        let mut t = ContextTracker::new();
        t.on_word_committed("see");
        t.on_word_committed("you.");
        assert!(t.context().is_empty());

        t.on_word_committed("ok");
        t.on_word_committed("?");
        assert!(t.context().is_empty());
    }

    #[test]
    fn test_punctuation_token_is_not_a_word() {
        let mut t = ContextTracker::new();
        t.on_word_committed("well");
        t.on_word_committed(",");
        t.on_word_committed("42");
        assert_eq!(t.context().words(), vec!["well"]);
    }

    #[test]
    fn test_field_change_clears() {
        let mut t = ContextTracker::new();
        t.on_word_committed("hello");
        t.on_field_changed();
        assert!(t.context().is_empty());
    }

    #[test]
    fn test_from_words_and_suffix() {
        let ctx = Context::from_words(&["I", "see", "you"]);
        assert_eq!(ctx.words(), vec!["see", "you"]);
        assert_eq!(ctx.suffix(1), vec!["you"]);
        assert_eq!(ctx.suffix(5), vec!["see", "you"]);
        assert!(ctx.suffix(0).is_empty());
    }
}
