use std::path::PathBuf;

use log::{info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::checkpoint::{save, Checkpoint};
use crate::config::RunConfig;
use crate::error::Result;
use crate::genome::Genome;
use crate::mutations::{MutationEngine, MutationTally};

/// Configuration for the lineage loop.
#[derive(Clone, Debug)]
pub struct LineageConfig {
    /// Number of mutation rounds to run.
    pub rounds: u32,
    /// Write a checkpoint every `checkpoint_interval` rounds; 0 disables it.
    pub checkpoint_interval: u32,
    /// File path for checkpoints. The file is overwritten each time.
    pub checkpoint_path: PathBuf,
    /// Seed for the RNG driving genome construction and mutation.
    pub seed: u64,
}

/// Genome statistics after one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: u32,
    pub tally: MutationTally,
    pub chromosomes: usize,
    pub full_size: usize,
    pub retroposons: usize,
    pub repeats: usize,
}

impl RoundReport {
    fn of(round: u32, genome: &Genome) -> Self {
        Self {
            round,
            tally: genome.tally(),
            chromosomes: genome.len(),
            full_size: genome.full_size(),
            retroposons: genome.nr_retroposons(),
            repeats: genome.nr_repeats(),
        }
    }
}

/// Build a genome from `config` and mutate it for `lineage.rounds` rounds.
///
/// Returns the final [`Checkpoint`] and one report per round. Identical seeds
/// give identical results.
pub fn run_lineage(
    config: &RunConfig,
    lineage: &LineageConfig,
) -> Result<(Checkpoint, Vec<RoundReport>)> {
    config.validate()?;
    let space = config.short_seqs.space()?;
    let mut rng = ChaCha8Rng::seed_from_u64(lineage.seed);
    let genome = config.blueprint.genome(&config.rates, &space, &mut rng)?;
    info!(
        "lineage start: {} chromosomes, {} elements",
        genome.len(),
        genome.full_size()
    );
    let start = Checkpoint {
        round: 0,
        genome,
        rng,
    };
    resume_lineage(start, config, lineage)
}

/// Continue a lineage from a checkpoint for another `lineage.rounds` rounds.
/// The seed of `lineage` is not used; the checkpoint carries the RNG.
pub fn resume_lineage(
    start: Checkpoint,
    config: &RunConfig,
    lineage: &LineageConfig,
) -> Result<(Checkpoint, Vec<RoundReport>)> {
    config.validate()?;
    let Checkpoint {
        round: first,
        mut genome,
        rng,
    } = start;
    let mut engine = MutationEngine::new(rng, config.rate_scheme);
    let mut reports = Vec::with_capacity(lineage.rounds as usize);

    for step in 1..=lineage.rounds {
        let round = first + step;
        genome.mutate(&mut engine);
        reports.push(RoundReport::of(round, &genome));

        if lineage.checkpoint_interval > 0 && step % lineage.checkpoint_interval == 0 {
            let cp = Checkpoint {
                round,
                genome: genome.clone(),
                rng: engine.rng().clone(),
            };
            match save(&lineage.checkpoint_path, &cp) {
                Ok(()) => info!(
                    "checkpoint at round {round}: {} elements, {} retroposons",
                    genome.full_size(),
                    genome.nr_retroposons()
                ),
                Err(e) => warn!(
                    "checkpoint at round {round} to {} failed: {e}",
                    lineage.checkpoint_path.display()
                ),
            }
        }
    }

    let cp = Checkpoint {
        round: first + lineage.rounds,
        genome,
        rng: engine.into_rng(),
    };
    Ok((cp, reports))
}
