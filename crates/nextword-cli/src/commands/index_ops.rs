use std::fs;
use std::path::Path;

use nextword_core::index::{IndexBuilder, MemoryIndex, MergeStrategy, StaticIndex};

/// Count unigrams, bigrams and trigrams in a plain-text corpus and write
/// them as JSON word lists.
pub fn extract(corpus: &str, out_dir: &str, min_freq: u64) {
    let text = die!(fs::read_to_string(corpus), "Error reading {corpus}: {}");

    let mut builder = IndexBuilder::new();
    builder.add_text(&text);
    builder.retain_min_frequency(min_freq);
    eprintln!(
        "Extracted {} bigrams, {} trigrams (min freq {min_freq})",
        builder.bigram_count(),
        builder.trigram_count()
    );

    die!(
        builder.write_json_dir(Path::new(out_dir)),
        "Error writing index: {}"
    );
    eprintln!("Wrote {out_dir}");
}

/// Merge word-list directories (or single unigram list files) into one
/// index directory.
pub fn merge(inputs: &[String], out_dir: &str, strategy: &MergeStrategy, min_freq: u64) {
    let sources: Vec<IndexBuilder> = inputs
        .iter()
        .map(|input| {
            let builder = die!(
                IndexBuilder::load_json_path(Path::new(input)),
                "Error loading {input}: {}"
            );
            eprintln!("Loaded {} words from {input}", builder.word_count());
            builder
        })
        .collect();

    let merged = die!(
        IndexBuilder::merge(&sources, strategy, min_freq),
        "Error merging: {}"
    );
    eprintln!(
        "Merged {} words, {} bigrams, {} trigrams (min freq {min_freq})",
        merged.word_count(),
        merged.bigram_count(),
        merged.trigram_count()
    );
    die!(
        merged.write_json_dir(Path::new(out_dir)),
        "Error writing index: {}"
    );
    eprintln!("Wrote {out_dir}");
}

pub fn open_index(dir: &str) -> MemoryIndex {
    die!(
        MemoryIndex::load_dir(Path::new(dir)),
        "Error loading index {dir}: {}"
    )
}

pub fn info(dir: &str) {
    let index = open_index(dir);
    println!("words:            {}", index.word_count());
    println!("bigram contexts:  {}", index.bigram_contexts());
    println!("trigram contexts: {}", index.trigram_contexts());
    if let Some(table) = index.ngram_table(&[]) {
        println!("total frequency:  {}", table.total());
        let top: Vec<&str> = table.entries().iter().take(10).map(|(w, _)| w.as_str()).collect();
        println!("top words:        {}", top.join(" "));
    }
}
