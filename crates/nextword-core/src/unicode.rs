//! Word normalisation and sentence-boundary detection for Latin-script input.

/// Map an accented Latin letter to its base letter. Other characters are
/// returned unchanged.
pub fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'ç' => 'c',
        'ñ' => 'n',
        _ => c,
    }
}

/// Normalise a committed token into a lookup word: lowercase, fold accents,
/// keep alphabetic characters only.
///
/// Returns an empty string for tokens with no letters ("...", "42").
pub fn normalize_word(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .filter(|c| c.is_alphabetic())
        .collect()
}

pub fn is_sentence_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…' | '。' | '！' | '？')
}

/// Whether a committed token closes its sentence ("you." / "?" / "really?!").
///
/// Closing quotes and brackets after the terminator are skipped, so `done.)`
/// also ends the sentence.
pub fn ends_sentence(raw: &str) -> bool {
    raw.trim_end()
        .chars()
        .rev()
        .find(|c| !matches!(c, '"' | '\'' | ')' | ']' | '»' | '”' | '’'))
        .is_some_and(is_sentence_terminator)
}
