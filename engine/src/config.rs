use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::factory::Blueprint;
use crate::rates::{MutationRates, RateScheme};
use crate::shortseq::ShortSeqSpace;

/// Parameters of the short-sequence space used for binding sites and
/// transcription factors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortSeqConfig {
    pub alphabet: String,
    pub length: usize,
    /// Per-symbol point mutation rate.
    pub point_mut: f64,
    pub max_hamming: usize,
}

impl Default for ShortSeqConfig {
    fn default() -> Self {
        Self {
            alphabet: "acgt".into(),
            length: 4,
            point_mut: 1e-5,
            max_hamming: 0,
        }
    }
}

impl ShortSeqConfig {
    pub fn space(&self) -> Result<ShortSeqSpace> {
        ShortSeqSpace::new(&self.alphabet, self.length, self.point_mut, self.max_hamming)
    }
}

/// Everything needed to build and mutate a genome lineage.
///
/// ```json
/// {
///   "rates": { "cp_gene": 1e-4, "dsb_recombination": 1e-2 },
///   "rate_scheme": { "scheme": "uniform", "low": 0.0, "high": 1e-3 },
///   "blueprint": { "dstreams": 60, "tposons": 4 },
///   "short_seqs": { "alphabet": "acgt", "length": 6 }
/// }
/// ```
///
/// Every field is optional and falls back to its default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub rates: MutationRates,
    pub rate_scheme: RateScheme,
    pub blueprint: Blueprint,
    pub short_seqs: ShortSeqConfig,
}

impl RunConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.rates.validate()?;
        self.rate_scheme.validate()?;
        self.blueprint.validate()?;
        self.short_seqs.space()?;
        Ok(())
    }
}
