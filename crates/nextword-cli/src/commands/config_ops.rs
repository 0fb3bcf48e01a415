use std::fs;

pub fn settings_export() {
    print!("{}", nextword_core::settings::default_toml());
}

pub fn settings_validate(file: &str) {
    let content = die!(fs::read_to_string(file), "Error reading {file}: {}");
    let s = die!(
        nextword_core::settings::parse_settings_toml(&content),
        "Error: {}"
    );
    println!(
        "OK: prediction.top_k={}, learning.capacity={}, mode.preference={:?}",
        s.prediction.top_k, s.learning.capacity, s.mode.preference
    );
}
