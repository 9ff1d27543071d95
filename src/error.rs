use std::io;

/// Errors raised while loading a trained model or building a detector.
///
/// Detection itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot read or write trained model: {0}")]
    Io(#[from] io::Error),
    #[error("cannot load trained model: {0}")]
    Format(String),
    #[error("cannot load trained model: {table} table has {actual} entries, expected {expected}")]
    Shape {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("cannot load trained model: digram entry {0} is zero")]
    ZeroFrequency(usize),
    #[error("unsupported candidate encoding: {0}")]
    UnsupportedEncoding(&'static str),
    #[error("no candidate encodings given")]
    NoCandidates,
}

impl From<binrw::Error> for Error {
    fn from(e: binrw::Error) -> Self {
        match e {
            binrw::Error::Io(e) if e.kind() != io::ErrorKind::UnexpectedEof => Error::Io(e),
            e => Error::Format(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
