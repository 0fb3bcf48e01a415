use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use nextword_core::context::Context;
use nextword_core::index::StaticIndex;
use nextword_core::predictor::NextWordPredictor;
use nextword_core::unicode::normalize_word;
use nextword_core::user_history::LearningStore;
use nextword_session::{LearningPersistence, PredictionSession};

use super::index_ops::open_index;
use super::load_settings;

/// Show the top `k` predictions after `words`.
pub fn predict(
    index_dir: &str,
    words: &[String],
    k: usize,
    history: Option<&str>,
    settings: Option<&str>,
) {
    let settings = load_settings(settings);
    let index: Arc<dyn StaticIndex> = Arc::new(open_index(index_dir));
    let store = history.map(|path| {
        die!(
            LearningStore::open(Path::new(path), &settings.learning),
            "Error opening history: {}"
        )
    });

    let context = Context::from_words(words);
    let predictor = NextWordPredictor::new(&settings, Some(index));
    let prediction = predictor.predict(&context, store.as_ref(), k);

    println!(
        "context: [{}]  level: {:?}  confidence: {:.3}",
        context.words().join(" "),
        prediction.level,
        prediction.confidence()
    );
    if prediction.is_empty() {
        println!("(no predictions)");
        return;
    }
    for (i, c) in prediction.candidates.iter().enumerate() {
        println!("#{:>2}: {:<20} {:>8.4}  {:?}", i + 1, c.word, c.score, c.source);
    }
}

/// Feed a text through a prediction session word by word and report how
/// often the next word was among the predictions.
pub fn replay(
    index_dir: &str,
    text_file: &str,
    history: Option<&str>,
    learn: bool,
    settings: Option<&str>,
) {
    let mut settings = load_settings(settings);
    settings.learning.enabled = learn;
    let top_k = settings.prediction.top_k;
    let text = die!(fs::read_to_string(text_file), "Error reading {text_file}: {}");
    let index: Arc<dyn StaticIndex> = Arc::new(open_index(index_dir));

    let (store, persistence) = match history {
        Some(path) if learn => {
            let (store, persistence) = die!(
                LearningPersistence::open(Path::new(path), &settings.learning),
                "Error opening history: {}"
            );
            (Some(store), Some(Arc::new(persistence)))
        }
        Some(path) => {
            let store = die!(
                LearningStore::open(Path::new(path), &settings.learning),
                "Error opening history: {}"
            );
            (Some(Arc::new(RwLock::new(store))), None)
        }
        None if learn => (Some(Arc::new(RwLock::new(LearningStore::new(&settings.learning)))), None),
        None => (None, None),
    };

    let mut session = PredictionSession::new(settings, Some(index), store);
    if let Some(p) = persistence {
        session = session.with_persistence(p);
    }

    let mut total = 0usize;
    let mut hits = 0usize;
    let mut top1 = 0usize;
    for line in text.lines() {
        for token in line.split_whitespace() {
            let word = normalize_word(token);
            if !word.is_empty() && !session.context().is_empty() {
                let predicted = session.predict(top_k);
                total += 1;
                if let Some(pos) = predicted.iter().position(|p| *p == word) {
                    hits += 1;
                    if pos == 0 {
                        top1 += 1;
                    }
                }
            }
            session.on_word_committed(token, &[]);
        }
        session.on_sentence_boundary();
    }

    let rate = |n: usize| {
        if total == 0 {
            0.0
        } else {
            n as f64 * 100.0 / total as f64
        }
    };
    println!("predicted words: {total}");
    println!("top-{top_k} hits:      {hits} ({:.1}%)", rate(hits));
    println!("top-1 hits:      {top1} ({:.1}%)", rate(top1));
}
