macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            std::process::exit(1);
        })
    };
}

pub mod config_ops;
pub mod history_ops;
pub mod index_ops;
pub mod predict_ops;

use std::path::Path;

use nextword_core::settings::Settings;

/// Settings from `path`, or the built-in defaults.
pub(crate) fn load_settings(path: Option<&str>) -> Settings {
    match path {
        Some(p) => die!(Settings::load(Path::new(p)), "Error loading settings {p}: {}"),
        None => Settings::default(),
    }
}
