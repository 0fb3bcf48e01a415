use std::collections::HashSet;

use nextword_core::predictor::Prediction;

use crate::types::{SuggestionItem, SuggestionMode, SuggestionResponse, SuggestionSource};

/// Assemble the items shown for `mode`. In hybrid mode the group matching
/// what the user is doing comes first: completions while a word is being
/// typed, predictions otherwise. Duplicates keep their first position.
pub(crate) fn build_response(
    mode: SuggestionMode,
    partial_word: bool,
    completions: &[String],
    prediction: &Prediction,
) -> SuggestionResponse {
    let completions = completions
        .iter()
        .map(|text| (text.as_str(), SuggestionSource::Completion));
    let predictions = prediction
        .candidates
        .iter()
        .map(|c| (c.word.as_str(), SuggestionSource::Prediction));

    let ordered: Vec<(&str, SuggestionSource)> = match mode {
        SuggestionMode::CurrentWord => completions.collect(),
        SuggestionMode::NextWord => predictions.collect(),
        SuggestionMode::Hybrid if partial_word => completions.chain(predictions).collect(),
        SuggestionMode::Hybrid => predictions.chain(completions).collect(),
    };

    let mut seen = HashSet::new();
    let items = ordered
        .into_iter()
        .filter(|(text, _)| !text.is_empty() && seen.insert(text.to_lowercase()))
        .map(|(text, source)| SuggestionItem {
            text: text.to_string(),
            source,
        })
        .collect();
    SuggestionResponse { mode, items }
}
