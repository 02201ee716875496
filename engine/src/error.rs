use thiserror::Error;

/// Errors raised while building, configuring or persisting genomes.
///
/// The mutation sweep itself never fails; everything here is either a
/// precondition violation or a configuration/IO problem surfaced at startup.
#[derive(Error, Debug)]
pub enum GenomeError {
    #[error("cannot copy a {from} element into a {into} element")]
    KindMismatch {
        from: &'static str,
        into: &'static str,
    },

    #[error("chromosome has {0} centromeres, expected exactly one")]
    CentromereCount(usize),

    #[error("retroposon at position {0} is not flanked by two repeats")]
    UnflankedRetroposon(usize),

    #[error("invalid short sequence space: {0}")]
    ShortSeqSpace(String),

    #[error("symbol {symbol:?} is not part of alphabet {alphabet:?}")]
    UnknownSymbol { symbol: char, alphabet: String },

    #[error("short sequence {seq:?} should have length {expected}")]
    ShortSeqLength { seq: String, expected: usize },

    #[error("invalid rate {name} = {value}")]
    InvalidRate { name: &'static str, value: f64 },

    #[error("{class} rates sum to {sum}, which exceeds 1")]
    RateSum { class: &'static str, sum: f64 },

    #[error("uniform rate scheme needs 0 <= low <= high, got [{low}, {high}]")]
    UniformBounds { low: f64, high: f64 },

    #[error("unknown rate scheme {0:?}")]
    UnknownScheme(String),

    #[error("invalid blueprint: {0}")]
    Blueprint(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GenomeError>;
