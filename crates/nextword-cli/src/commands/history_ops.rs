use std::path::{Path, PathBuf};

use nextword_core::settings::Settings;
use nextword_core::user_history::wal::open_with_wal;
use serde::Serialize;

pub fn default_history_path() -> PathBuf {
    let base = std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    base.join("nextword").join("learning.nwls")
}

#[derive(Serialize)]
struct PatternRow<'a> {
    context: &'a str,
    word: &'a str,
    count: u32,
    last_updated: u64,
}

pub fn stats(path: &Path) {
    let (store, wal) = open_with_wal(path, &Settings::default().learning);
    println!("file:     {}", path.display());
    println!("contexts: {}", store.context_count());
    println!("patterns: {}", store.pattern_count());
    println!("revision: {}", store.revision());
    println!("journal:  {} entries", wal.entry_count());
}

pub fn dump(path: &Path, json: bool) {
    let (store, _) = open_with_wal(path, &Settings::default().learning);
    let mut rows: Vec<PatternRow> = store
        .iter()
        .map(|(context, word, entry)| PatternRow {
            context,
            word,
            count: entry.count,
            last_updated: entry.last_updated,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.context.cmp(b.context))
            .then_with(|| a.word.cmp(b.word))
    });

    if rows.is_empty() && !json {
        println!("(empty)");
        return;
    }
    for row in &rows {
        if json {
            println!("{}", die!(serde_json::to_string(row), "Error: {}"));
        } else {
            println!("{}\t{}\t{}\t{}", row.context, row.word, row.count, row.last_updated);
        }
    }
    if !json {
        println!("---");
        println!("{} patterns", rows.len());
    }
}

pub fn clear(path: &Path) {
    let (mut store, mut wal) = open_with_wal(path, &Settings::default().learning);
    let removed = store.pattern_count();
    store.clear();
    die!(wal.checkpoint(&store), "Error writing history: {}");
    println!("Cleared {removed} patterns");
}
