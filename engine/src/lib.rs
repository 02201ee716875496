//! Chromosome mutation and genome recombination engine.
//!
//! A [`Genome`] is a list of [`Chromosome`]s, each an ordered sequence of
//! [`Element`]s with its own [`MutationRates`]. [`Genome::mutate`] runs one
//! round: every chromosome is swept for gene and retroposon copies and
//! removals, repeat removals and double-strand breaks, after which broken
//! chromosomes are cut into fragments and randomly rejoined.

pub mod checkpoint;
pub mod chromosome;
pub mod config;
pub mod element;
pub mod error;
pub mod factory;
pub mod genome;
pub mod lineage;
pub mod mutations;
pub mod pool;
pub mod rates;
pub mod recombination;
pub mod shortseq;

pub use checkpoint::Checkpoint;
pub use chromosome::Chromosome;
pub use config::{RunConfig, ShortSeqConfig};
pub use element::{Element, ElementKind};
pub use error::{GenomeError, Result};
pub use factory::Blueprint;
pub use genome::Genome;
pub use lineage::{resume_lineage, run_lineage, LineageConfig, RoundReport};
pub use mutations::{random_locus, Locus, MutationEngine, MutationTally};
pub use pool::{Pool, Recycle};
pub use rates::{MutationRates, RateScheme};
pub use shortseq::{ShortSeq, ShortSeqSpace};
