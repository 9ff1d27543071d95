//! Trains a model from a corpus of Russian text.
//!
//! Usage: `cyrdet-train <corpus> <output> [corpus-encoding]`
//!
//! The corpus encoding is a WHATWG label and defaults to UTF-8.

use cyrdet::ModelTrainer;
use encoding_rs::Encoding;
use encoding_rs::UTF_8;
use encoding_rs::WINDOWS_1251;
use std::path::Path;

fn train(corpus: &Path, output: &Path, encoding: &'static Encoding) -> cyrdet::Result<()> {
    let bytes = std::fs::read(corpus)?;
    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes);
    if had_errors {
        eprintln!(
            "Warning: {} is not entirely valid {}.",
            corpus.display(),
            encoding.name()
        );
    }
    // Tables are indexed by letter, so the training encoding only needs to
    // cover the alphabet.
    let mut trainer = ModelTrainer::new(WINDOWS_1251)?;
    trainer.feed_str(&text);
    let model = trainer.finish();
    model.save(output)?;
    println!(
        "Learned {} trigrams and {} boundary trigrams.",
        model.trigrams().count_ones(),
        model.boundaries().count_ones()
    );
    Ok(())
}

fn main() {
    let mut args = std::env::args_os();
    if args.next().is_none() {
        eprintln!("Error: Program name missing from arguments.");
        std::process::exit(-1);
    }
    let (corpus, output) = match (args.next(), args.next()) {
        (Some(corpus), Some(output)) => (corpus, output),
        _ => {
            eprintln!("Error: Too few arguments.");
            eprintln!("Usage: cyrdet-train <corpus> <output> [corpus-encoding]");
            std::process::exit(-2);
        }
    };
    let encoding = match args.next() {
        Some(label) => match Encoding::for_label(label.to_string_lossy().as_bytes()) {
            Some(encoding) => encoding,
            None => {
                eprintln!("Error: Unknown encoding: {}", label.to_string_lossy());
                std::process::exit(-2);
            }
        },
        None => UTF_8,
    };
    if let Err(e) = train(Path::new(&corpus), Path::new(&output), encoding) {
        eprintln!("Error: {}", e);
        std::process::exit(-3);
    }
}
