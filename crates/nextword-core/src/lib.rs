pub mod context;
pub mod index;
pub mod ngram;
pub mod predictor;
pub mod settings;
pub mod unicode;
pub mod user_history;
