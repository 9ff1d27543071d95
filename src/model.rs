use crate::alphabet::BOUNDARY_TABLE_LEN;
use crate::alphabet::CHARS_NUM;
use crate::alphabet::DIGRAM_TABLE_LEN;
use crate::alphabet::TRIGRAM_TABLE_LEN;
use crate::error::Error;
use crate::error::Result;
use binrw::BinRead;
use binrw::BinWrite;
#[allow(unused_imports)]
use std::convert::TryFrom;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Path;

/// The first eight bytes of a model file. `ModelFileRaw` spells the same
/// bytes out in its `magic` attribute, which takes only a literal.
pub const MAGIC: [u8; 8] = *b"CYRMODEL";

pub const FORMAT_VERSION: u16 = 1;

static BUILTIN_MODEL: &[u8] = include_bytes!("../data/cyrillic.model");

fn words_for(bits: usize) -> usize {
    (bits + 63) / 64
}

// Sizes are asserted as soon as they are read so that a corrupt header
// cannot request a huge allocation.
#[derive(BinRead, BinWrite)]
#[brw(little, magic = b"CYRMODEL")]
struct ModelFileRaw {
    #[br(assert(version == FORMAT_VERSION, "unsupported model format version"))]
    version: u16,
    #[br(assert(chars_num as usize == CHARS_NUM, "alphabet size mismatch"))]
    chars_num: u16,
    #[br(assert(digram_len as usize == DIGRAM_TABLE_LEN, "digram table size mismatch"))]
    digram_len: u32,
    #[br(assert(trigram_bits as usize == TRIGRAM_TABLE_LEN, "trigram table size mismatch"))]
    trigram_bits: u32,
    #[br(assert(boundary_bits as usize == BOUNDARY_TABLE_LEN, "boundary table size mismatch"))]
    boundary_bits: u32,
    #[br(count = digram_len as usize)]
    digrams: Vec<u32>,
    #[br(count = words_for(trigram_bits as usize))]
    trigram_words: Vec<u64>,
    #[br(count = words_for(boundary_bits as usize))]
    boundary_words: Vec<u64>,
}

/// Fixed-size bit set.
#[derive(Clone, PartialEq, Eq)]
pub struct BitTable {
    words: Box<[u64]>,
    len: usize,
}

impl BitTable {
    pub fn new(len: usize) -> Self {
        BitTable {
            words: vec![0u64; words_for(len)].into_boxed_slice(),
            len,
        }
    }

    fn from_words(words: Vec<u64>, len: usize) -> Result<Self> {
        if words.len() != words_for(len) {
            return Err(Error::Shape {
                table: "bit",
                expected: words_for(len),
                actual: words.len(),
            });
        }
        Ok(BitTable {
            words: words.into_boxed_slice(),
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < self.len);
        (self.words[i >> 6] >> (i & 63)) & 1 != 0
    }

    pub fn set(&mut self, i: usize) {
        assert!(i < self.len, "bit {} out of range {}", i, self.len);
        self.words[i >> 6] |= 1u64 << (i & 63);
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

impl std::fmt::Debug for BitTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitTable")
            .field("len", &self.len)
            .field("ones", &self.count_ones())
            .finish()
    }
}

/// The statistics the detector scores against, gathered from a corpus by
/// `ModelTrainer`.
///
/// * `digrams[digram_index(a, b)]` is one more than the number of times
///   letter `a` was followed by letter `b`.
/// * `trigrams` has a bit set for every letter triple seen.
/// * `boundaries` has a bit set for every triple seen at the end of a word
///   (first half) or at the start of a word (second half).
#[derive(Clone)]
pub struct TrainedModel {
    digrams: Box<[u32]>,
    trigrams: BitTable,
    boundaries: BitTable,
}

impl TrainedModel {
    /// Assembles a model from its tables, checking their sizes and that no
    /// digram count is zero.
    pub fn from_parts(digrams: Vec<u32>, trigrams: BitTable, boundaries: BitTable) -> Result<Self> {
        if digrams.len() != DIGRAM_TABLE_LEN {
            return Err(Error::Shape {
                table: "digram",
                expected: DIGRAM_TABLE_LEN,
                actual: digrams.len(),
            });
        }
        if trigrams.len() != TRIGRAM_TABLE_LEN {
            return Err(Error::Shape {
                table: "trigram",
                expected: TRIGRAM_TABLE_LEN,
                actual: trigrams.len(),
            });
        }
        if boundaries.len() != BOUNDARY_TABLE_LEN {
            return Err(Error::Shape {
                table: "boundary",
                expected: BOUNDARY_TABLE_LEN,
                actual: boundaries.len(),
            });
        }
        if let Some(i) = digrams.iter().position(|&count| count == 0) {
            return Err(Error::ZeroFrequency(i));
        }
        let model = TrainedModel::from_parts_unchecked(digrams, trigrams, boundaries);
        log::debug!(
            "trained model: {} trigrams, {} boundary trigrams",
            model.trigrams.count_ones(),
            model.boundaries.count_ones()
        );
        Ok(model)
    }

    pub(crate) fn from_parts_unchecked(
        digrams: Vec<u32>,
        trigrams: BitTable,
        boundaries: BitTable,
    ) -> Self {
        TrainedModel {
            digrams: digrams.into_boxed_slice(),
            trigrams,
            boundaries,
        }
    }

    /// The model compiled into the library.
    pub fn builtin() -> Result<Self> {
        TrainedModel::from_bytes(BUILTIN_MODEL)
    }

    /// Parses a complete model file held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let model = TrainedModel::from_reader(&mut cursor)?;
        if cursor.position() != bytes.len() as u64 {
            return Err(Error::Format("trailing bytes after model data".to_string()));
        }
        Ok(model)
    }

    /// Reads one model from `reader`, leaving it positioned after the model.
    pub fn from_reader<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let raw = ModelFileRaw::read_le(reader)?;
        let trigrams = BitTable::from_words(raw.trigram_words, TRIGRAM_TABLE_LEN)?;
        let boundaries = BitTable::from_words(raw.boundary_words, BOUNDARY_TABLE_LEN)?;
        TrainedModel::from_parts(raw.digrams, trigrams, boundaries)
    }

    /// Reads a model file, rejecting trailing data.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("loading trained model from {}", path.display());
        let mut reader = BufReader::new(File::open(path)?);
        let model = TrainedModel::from_reader(&mut reader)?;
        let position = reader.stream_position()?;
        if reader.seek(SeekFrom::End(0))? != position {
            return Err(Error::Format("trailing bytes after model data".to_string()));
        }
        Ok(model)
    }

    pub fn write_to<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        let raw = ModelFileRaw {
            version: FORMAT_VERSION,
            chars_num: CHARS_NUM as u16,
            digram_len: DIGRAM_TABLE_LEN as u32,
            trigram_bits: TRIGRAM_TABLE_LEN as u32,
            boundary_bits: BOUNDARY_TABLE_LEN as u32,
            digrams: self.digrams.to_vec(),
            trigram_words: self.trigrams.words.to_vec(),
            boundary_words: self.boundaries.words.to_vec(),
        };
        raw.write_le(writer)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    #[inline(always)]
    pub fn digram_count(&self, index: usize) -> u32 {
        self.digrams[index]
    }

    #[inline(always)]
    pub fn has_trigram(&self, index: usize) -> bool {
        self.trigrams.get(index)
    }

    #[inline(always)]
    pub fn has_boundary(&self, index: usize) -> bool {
        self.boundaries.get(index)
    }

    pub fn trigrams(&self) -> &BitTable {
        &self.trigrams
    }

    pub fn boundaries(&self) -> &BitTable {
        &self.boundaries
    }
}

impl PartialEq for TrainedModel {
    fn eq(&self, other: &Self) -> bool {
        self.digrams == other.digrams
            && self.trigrams == other.trigrams
            && self.boundaries == other.boundaries
    }
}

impl Eq for TrainedModel {}

impl std::fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainedModel")
            .field("trigrams", &self.trigrams)
            .field("boundaries", &self.boundaries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TrainedModel {
        let mut digrams = vec![1u32; DIGRAM_TABLE_LEN];
        digrams[3] = 42;
        digrams[DIGRAM_TABLE_LEN - 1] = 7;
        let mut trigrams = BitTable::new(TRIGRAM_TABLE_LEN);
        trigrams.set(0);
        trigrams.set(64);
        trigrams.set(TRIGRAM_TABLE_LEN - 1);
        let mut boundaries = BitTable::new(BOUNDARY_TABLE_LEN);
        boundaries.set(5);
        boundaries.set(TRIGRAM_TABLE_LEN);
        TrainedModel::from_parts(digrams, trigrams, boundaries).unwrap()
    }

    fn header_len() -> usize {
        MAGIC.len() + 2 + 2 + 4 + 4 + 4
    }

    #[test]
    fn test_bit_table() {
        let mut table = BitTable::new(100);
        assert_eq!(table.len(), 100);
        assert!(!table.get(63));
        table.set(63);
        table.set(64);
        table.set(99);
        assert!(table.get(63));
        assert!(table.get(64));
        assert!(table.get(99));
        assert!(!table.get(65));
        assert_eq!(table.count_ones(), 3);
    }

    #[test]
    fn test_accessors() {
        let model = sample();
        assert_eq!(model.digram_count(3), 42);
        assert_eq!(model.digram_count(4), 1);
        assert!(model.has_trigram(64));
        assert!(!model.has_trigram(65));
        assert!(model.has_boundary(5));
        assert!(model.has_boundary(TRIGRAM_TABLE_LEN));
        assert!(!model.has_boundary(TRIGRAM_TABLE_LEN + 5));
    }

    #[test]
    fn test_layout() {
        let bytes = sample().to_bytes().unwrap();
        assert_eq!(bytes[..8], MAGIC);
        assert_eq!(&bytes[8..10], &[1, 0]);
        assert_eq!(&bytes[10..12], &[32, 0]);
        assert_eq!(&bytes[12..16], &1024u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &32768u32.to_le_bytes());
        assert_eq!(&bytes[20..24], &65536u32.to_le_bytes());
        let digrams = header_len();
        assert_eq!(&bytes[digrams + 12..digrams + 16], &42u32.to_le_bytes());
        let trigrams = digrams + 4 * DIGRAM_TABLE_LEN;
        assert_eq!(&bytes[trigrams..trigrams + 8], &1u64.to_le_bytes());
        assert_eq!(&bytes[trigrams + 8..trigrams + 16], &1u64.to_le_bytes());
        assert_eq!(
            bytes.len(),
            header_len() + 4 * DIGRAM_TABLE_LEN + (TRIGRAM_TABLE_LEN + BOUNDARY_TABLE_LEN) / 8
        );
    }

    #[test]
    fn test_read_back() {
        let model = sample();
        let bytes = model.to_bytes().unwrap();
        assert_eq!(TrainedModel::from_bytes(&bytes).unwrap(), model);
    }

    #[test]
    fn test_builtin() {
        let model = TrainedModel::builtin().unwrap();
        assert!(model.trigrams().count_ones() > 1000);
        assert!(model.boundaries().count_ones() > 1000);
        for i in 0..DIGRAM_TABLE_LEN {
            assert!(model.digram_count(i) >= 1);
        }
    }

    #[test]
    fn test_magic() {
        assert_eq!(BUILTIN_MODEL[..MAGIC.len()], MAGIC);
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&sample().to_bytes().unwrap()[MAGIC.len()..]);
        assert_eq!(TrainedModel::from_bytes(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[0] = b'X';
        assert!(matches!(TrainedModel::from_bytes(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_bad_version() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[8] = 2;
        assert!(matches!(TrainedModel::from_bytes(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_bad_declared_size() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[16..20].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(TrainedModel::from_bytes(&bytes), Err(Error::Format(_))));
        let mut bytes = sample().to_bytes().unwrap();
        bytes[10] = 36;
        assert!(matches!(TrainedModel::from_bytes(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_truncated() {
        let bytes = sample().to_bytes().unwrap();
        for &len in [0, 7, header_len(), bytes.len() - 1].iter() {
            assert!(
                matches!(TrainedModel::from_bytes(&bytes[..len]), Err(Error::Format(_))),
                "{}",
                len
            );
        }
    }

    #[test]
    fn test_trailing() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes.push(0);
        assert!(matches!(TrainedModel::from_bytes(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_zero_frequency() {
        let mut bytes = sample().to_bytes().unwrap();
        let entry = header_len() + 4 * 10;
        bytes[entry..entry + 4].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            TrainedModel::from_bytes(&bytes),
            Err(Error::ZeroFrequency(10))
        ));
    }

    #[test]
    fn test_from_parts_shape() {
        let result = TrainedModel::from_parts(
            vec![1; DIGRAM_TABLE_LEN - 1],
            BitTable::new(TRIGRAM_TABLE_LEN),
            BitTable::new(BOUNDARY_TABLE_LEN),
        );
        assert!(matches!(
            result,
            Err(Error::Shape {
                table: "digram",
                expected: 1024,
                actual: 1023,
            })
        ));
        let result = TrainedModel::from_parts(
            vec![1; DIGRAM_TABLE_LEN],
            BitTable::new(TRIGRAM_TABLE_LEN),
            BitTable::new(TRIGRAM_TABLE_LEN),
        );
        assert!(matches!(result, Err(Error::Shape { table: "boundary", .. })));
    }

    #[test]
    fn test_open_missing() {
        let result = TrainedModel::open("/nonexistent/cyrillic.model");
        assert!(matches!(result, Err(Error::Io(_))));
        let message = result.unwrap_err().to_string();
        assert!(message.starts_with("cannot read or write trained model"));
    }

    #[test]
    fn test_save_and_open() {
        let path = std::env::temp_dir().join(format!("cyrdet-{}.model", std::process::id()));
        let model = sample();
        model.save(&path).unwrap();
        let loaded = TrainedModel::open(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.unwrap(), model);
    }
}
