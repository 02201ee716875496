use std::fs;
use std::path::Path;

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::genome::Genome;

/// Lineage checkpoint allowing a run to resume deterministically.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Number of completed mutation rounds.
    pub round: u32,
    pub genome: Genome,
    /// RNG state for the next round.
    pub rng: ChaCha8Rng,
}

/// Save a checkpoint to the given path as JSON.
pub fn save(path: &Path, cp: &Checkpoint) -> Result<()> {
    let json = serde_json::to_string(cp)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load a checkpoint from the given path.
pub fn load(path: &Path) -> Result<Checkpoint> {
    let json = fs::read_to_string(path)?;
    let cp: Checkpoint = serde_json::from_str(&json)?;
    Ok(cp)
}
