//! Detects the encoding of short byte strings that are either UTF-8 or
//! Russian text in one of the single-byte Cyrillic encodings.
//!
//! Input that has the byte structure of UTF-8 is reported as UTF-8. Anything
//! else is scored against every candidate single-byte encoding with a
//! `TrainedModel` of letter digram frequencies and of the letter trigrams
//! that occur inside words, at word starts and at word ends.
//!
//! ```
//! let detector = cyrdet::EncodingDetector::builtin().unwrap();
//! let (bytes, _, _) = encoding_rs::KOI8_R.encode("как жрать суши");
//! assert_eq!(detector.detect(&bytes), encoding_rs::KOI8_R);
//! ```

use encoding_rs::Encoding;
use encoding_rs::IBM866_INIT;
use encoding_rs::KOI8_R_INIT;
use encoding_rs::KOI8_U_INIT;
use encoding_rs::UTF_8;
use encoding_rs::WINDOWS_1251_INIT;
use num_bigint::BigUint;
use std::borrow::Cow;
use std::path::Path;

mod alphabet;
mod error;
mod model;
mod train;
mod utf8;

use alphabet::digram_index;
use alphabet::end_boundary_index;
use alphabet::start_boundary_index;
use alphabet::trigram_index;

pub use alphabet::AlphabetIndex;
pub use alphabet::BOUNDARY_TABLE_LEN;
pub use alphabet::CHARS_NUM;
pub use alphabet::DIGRAM_TABLE_LEN;
pub use alphabet::NOT_A_LETTER;
pub use alphabet::TRIGRAM_TABLE_LEN;
pub use error::Error;
pub use error::Result;
pub use model::BitTable;
pub use model::TrainedModel;
pub use model::FORMAT_VERSION;
pub use model::MAGIC;
pub use train::ModelTrainer;
pub use utf8::is_utf8;

/// Inputs shorter than this are not scored.
const MIN_SCORED_LEN: usize = 3;

const PADDING: u8 = b' ';

/// Candidates in order of precedence. The first one is also the answer for
/// inputs too short to score.
pub static DEFAULT_CANDIDATES: [&Encoding; 4] =
    [&WINDOWS_1251_INIT, &KOI8_R_INIT, &KOI8_U_INIT, &IBM866_INIT];

/// Per-encoding counters for one detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateStats {
    /// Trigram and boundary trigram lookups made.
    pub matched: u32,
    /// Lookups that found nothing in the model.
    pub invalid: u32,
    /// Product of the digram counts seen. Exact, so equal products tie.
    pub frequency_product: BigUint,
}

impl CandidateStats {
    fn new() -> Self {
        CandidateStats {
            matched: 0,
            invalid: 0,
            frequency_product: BigUint::from(1u32),
        }
    }

    #[inline(always)]
    fn check(&mut self, seen: bool) {
        self.matched += 1;
        if !seen {
            self.invalid += 1;
        }
    }

    /// More lookups win, since a wrong encoding turns letters into
    /// non-letters. Then fewer misses, then more frequent digrams.
    fn beats(&self, other: &CandidateStats) -> bool {
        if self.matched != other.matched {
            return self.matched > other.matched;
        }
        if self.invalid != other.invalid {
            return self.invalid < other.invalid;
        }
        self.frequency_product > other.frequency_product
    }
}

impl Default for CandidateStats {
    fn default() -> Self {
        CandidateStats::new()
    }
}

struct Candidate {
    encoding: &'static Encoding,
    alphabet: AlphabetIndex,
}

impl Candidate {
    fn new(encoding: &'static Encoding) -> Result<Self> {
        Ok(Candidate {
            encoding,
            alphabet: AlphabetIndex::new(encoding)?,
        })
    }

    /// Slides a four-byte window over `padded`. With A for a letter, ^ for
    /// a non-letter and * for either:
    ///
    /// * `AA**` adds the digram frequency
    /// * `AAA*` looks up the trigram
    /// * `AAA^` also looks up the trigram as a word end
    /// * `^AAA` looks up the trigram as a word start
    fn score(&self, padded: &[u8], model: &TrainedModel) -> CandidateStats {
        let mut stats = CandidateStats::new();
        let mut i2 = self.alphabet.index_of(padded[0]);
        let mut i3 = self.alphabet.index_of(padded[1]);
        let mut i4 = self.alphabet.index_of(padded[2]);
        for &b in &padded[3..] {
            let i1 = i2;
            i2 = i3;
            i3 = i4;
            i4 = self.alphabet.index_of(b);
            if i1 >= 0 && i2 >= 0 {
                stats.frequency_product *= model.digram_count(digram_index(i1, i2));
                if i3 >= 0 {
                    stats.check(model.has_trigram(trigram_index(i1, i2, i3)));
                    if i4 < 0 {
                        stats.check(model.has_boundary(end_boundary_index(i1, i2, i3)));
                    }
                }
            } else if i1 < 0 && i2 >= 0 && i3 >= 0 && i4 >= 0 {
                stats.check(model.has_boundary(start_boundary_index(i2, i3, i4)));
            }
        }
        stats
    }
}

/// Picks the single-byte Cyrillic encoding whose reading of the input looks
/// most like the text the model was trained on.
///
/// Immutable once built. `detect` keeps its counters on the stack, so one
/// detector can serve any number of threads.
pub struct CyrillicDetector {
    model: TrainedModel,
    candidates: Vec<Candidate>,
}

impl CyrillicDetector {
    /// A detector for `DEFAULT_CANDIDATES`.
    pub fn new(model: TrainedModel) -> Result<Self> {
        CyrillicDetector::with_candidates(model, &DEFAULT_CANDIDATES)
    }

    /// A detector for `candidates` in order of precedence. Each must be a
    /// single-byte encoding that can represent the Russian alphabet.
    pub fn with_candidates(model: TrainedModel, candidates: &[&'static Encoding]) -> Result<Self> {
        if candidates.is_empty() {
            return Err(Error::NoCandidates);
        }
        let candidates = candidates
            .iter()
            .map(|&encoding| Candidate::new(encoding))
            .collect::<Result<Vec<_>>>()?;
        log::debug!(
            "Cyrillic detector candidates: {:?}",
            candidates
                .iter()
                .map(|c| c.encoding.name())
                .collect::<Vec<_>>()
        );
        Ok(CyrillicDetector { model, candidates })
    }

    /// The model candidates are scored against.
    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// The candidate encodings in order of precedence.
    pub fn candidates(&self) -> impl Iterator<Item = &'static Encoding> + '_ {
        self.candidates.iter().map(|c| c.encoding)
    }

    /// Guesses which candidate encoded `buffer`.
    ///
    /// Never fails. Inputs shorter than three bytes, and inputs in which no
    /// candidate finds any letters, yield the first candidate.
    pub fn detect(&self, buffer: &[u8]) -> &'static Encoding {
        let first = self.candidates[0].encoding;
        if buffer.len() < MIN_SCORED_LEN {
            return first;
        }
        let stats = self.score_all(buffer);
        let mut best = first;
        let mut best_stats = &stats[0];
        for (candidate, candidate_stats) in self.candidates.iter().zip(stats.iter()).skip(1) {
            if candidate_stats.beats(best_stats) {
                best = candidate.encoding;
                best_stats = candidate_stats;
            }
        }
        best
    }

    /// The counters `detect` compares, in candidate order. Empty for inputs
    /// too short to score.
    #[cfg(feature = "testing-only-no-semver-guarantees-do-not-use")]
    pub fn candidate_stats(&self, buffer: &[u8]) -> Vec<(&'static Encoding, CandidateStats)> {
        if buffer.len() < MIN_SCORED_LEN {
            return Vec::new();
        }
        self.candidates()
            .zip(self.score_all(buffer).into_iter())
            .collect()
    }

    fn score_all(&self, buffer: &[u8]) -> Vec<CandidateStats> {
        // Word boundaries at either end of the input look like interior ones.
        let mut padded = Vec::with_capacity(buffer.len() + 2);
        padded.push(PADDING);
        padded.extend_from_slice(buffer);
        padded.push(PADDING);

        let model = &self.model;
        let stats: Vec<CandidateStats>;
        cfg_if::cfg_if! {
            if #[cfg(feature = "multithreading")] {
                use rayon::prelude::*;
                stats = self
                    .candidates
                    .par_iter()
                    .map(|c| c.score(&padded, model))
                    .collect();
            } else {
                stats = self
                    .candidates
                    .iter()
                    .map(|c| c.score(&padded, model))
                    .collect();
            }
        }
        if log::log_enabled!(log::Level::Trace) {
            for (candidate, s) in self.candidates.iter().zip(stats.iter()) {
                log::trace!("{}: {:?}", candidate.encoding.name(), s);
            }
        }
        stats
    }
}

/// Reports UTF-8 for anything that has the byte structure of UTF-8 and asks
/// a `CyrillicDetector` about everything else.
pub struct EncodingDetector {
    cyrillic: CyrillicDetector,
}

impl EncodingDetector {
    pub fn new(model: TrainedModel) -> Result<Self> {
        Ok(EncodingDetector::from_cyrillic(CyrillicDetector::new(model)?))
    }

    pub fn from_cyrillic(cyrillic: CyrillicDetector) -> Self {
        EncodingDetector { cyrillic }
    }

    /// A detector using the model compiled into the library.
    pub fn builtin() -> Result<Self> {
        EncodingDetector::new(TrainedModel::builtin()?)
    }

    /// A detector using the model file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        EncodingDetector::new(TrainedModel::open(path)?)
    }

    pub fn cyrillic(&self) -> &CyrillicDetector {
        &self.cyrillic
    }

    /// Returns UTF-8 or one of the Cyrillic candidates. UTF-8 wins whenever
    /// `buffer` is structurally valid UTF-8, including when it is pure ASCII.
    pub fn detect(&self, buffer: &[u8]) -> &'static Encoding {
        if is_utf8(buffer) {
            return UTF_8;
        }
        self.cyrillic.detect(buffer)
    }

    /// Detects the encoding of `buffer` and decodes it with that encoding,
    /// without BOM sniffing.
    pub fn decode<'a>(&self, buffer: &'a [u8]) -> (Cow<'a, str>, &'static Encoding) {
        let encoding = self.detect(buffer);
        let (text, _) = encoding.decode_without_bom_handling(buffer);
        (text, encoding)
    }
}
