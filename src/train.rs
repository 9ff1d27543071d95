use crate::alphabet::digram_index;
use crate::alphabet::end_boundary_index;
use crate::alphabet::start_boundary_index;
use crate::alphabet::trigram_index;
use crate::alphabet::AlphabetIndex;
use crate::alphabet::BOUNDARY_TABLE_LEN;
use crate::alphabet::DIGRAM_TABLE_LEN;
use crate::alphabet::NOT_A_LETTER;
use crate::alphabet::TRIGRAM_TABLE_LEN;
use crate::error::Result;
use crate::model::BitTable;
use crate::model::TrainedModel;
use encoding_rs::Encoding;

/// Builds a `TrainedModel` from a corpus.
///
/// The corpus is streamed through the same four-byte window that detection
/// uses, so every pattern the detector looks up is one the trainer records.
/// The tables are indexed by alphabet position, which makes a model
/// trained on a corpus in one encoding usable for all of them.
pub struct ModelTrainer {
    encoding: &'static Encoding,
    alphabet: AlphabetIndex,
    digrams: Vec<u32>,
    trigrams: BitTable,
    boundaries: BitTable,
    window: [i8; 3],
}

impl ModelTrainer {
    /// `encoding` is the encoding of the bytes passed to `feed`.
    pub fn new(encoding: &'static Encoding) -> Result<Self> {
        Ok(ModelTrainer {
            encoding,
            alphabet: AlphabetIndex::new(encoding)?,
            digrams: vec![1u32; DIGRAM_TABLE_LEN],
            trigrams: BitTable::new(TRIGRAM_TABLE_LEN),
            boundaries: BitTable::new(BOUNDARY_TABLE_LEN),
            window: [NOT_A_LETTER; 3],
        })
    }

    /// The encoding `feed` expects.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Feeds corpus bytes. The window carries over between calls.
    pub fn feed(&mut self, buffer: &[u8]) {
        let [mut i1, mut i2, mut i3] = self.window;
        for &b in buffer {
            let i4 = self.alphabet.index_of(b);
            if i1 >= 0 && i2 >= 0 {
                let digram = &mut self.digrams[digram_index(i1, i2)];
                *digram = digram.saturating_add(1);
                if i3 >= 0 {
                    self.trigrams.set(trigram_index(i1, i2, i3));
                    if i4 < 0 {
                        self.boundaries.set(end_boundary_index(i1, i2, i3));
                    }
                }
            } else if i1 < 0 && i2 >= 0 && i3 >= 0 && i4 >= 0 {
                self.boundaries.set(start_boundary_index(i2, i3, i4));
            }
            i1 = i2;
            i2 = i3;
            i3 = i4;
        }
        self.window = [i1, i2, i3];
    }

    /// Encodes `text` into the trainer's encoding and feeds it. Characters
    /// the encoding cannot represent become numeric character references,
    /// which are not letters.
    pub fn feed_str(&mut self, text: &str) {
        let (bytes, _, _) = self.encoding.encode(text);
        self.feed(&bytes);
    }

    pub fn finish(mut self) -> TrainedModel {
        // Push the last letters through the window.
        self.feed(b"   ");
        let model =
            TrainedModel::from_parts_unchecked(self.digrams, self.trigrams, self.boundaries);
        log::debug!(
            "trained {} trigrams, {} boundary trigrams from {} corpus",
            model.trigrams().count_ones(),
            model.boundaries().count_ones(),
            self.encoding.name()
        );
        model
    }
}
