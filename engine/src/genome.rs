use log::debug;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::chromosome::Chromosome;
use crate::error::{GenomeError, Result};
use crate::mutations::{self, Locus, MutationEngine, MutationTally};
use crate::recombination;
use crate::shortseq::ShortSeqSpace;

/// An ordered collection of chromosomes.
///
/// Besides the chromosomes it remembers what happened in the most recent
/// [`Genome::mutate`] round: breaks per chromosome and the summed tally.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Genome {
    chromosomes: Vec<Chromosome>,
    #[serde(default)]
    dsbs: Vec<u32>,
    #[serde(default)]
    tally: MutationTally,
}

impl Genome {
    /// Build a genome after checking every chromosome with [`Genome::validate`].
    pub fn new(chromosomes: Vec<Chromosome>) -> Result<Self> {
        let genome = Self::from_chromosomes(chromosomes);
        genome.validate()?;
        Ok(genome)
    }

    /// Build a genome without checking centromeres or flanks.
    pub fn from_chromosomes(chromosomes: Vec<Chromosome>) -> Self {
        Self {
            chromosomes,
            dsbs: Vec::new(),
            tally: MutationTally::default(),
        }
    }

    /// Check the structural invariants of every chromosome.
    pub fn validate(&self) -> Result<()> {
        for chromosome in &self.chromosomes {
            if !chromosome.one_centromere() {
                return Err(GenomeError::CentromereCount(chromosome.nr_centromeres()));
            }
            chromosome.check_flanks()?;
        }
        Ok(())
    }

    pub fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    /// Total number of elements over all chromosomes.
    pub fn full_size(&self) -> usize {
        self.chromosomes.iter().map(Chromosome::size).sum()
    }

    pub fn nr_retroposons(&self) -> usize {
        self.chromosomes.iter().map(Chromosome::nr_retroposons).sum()
    }

    pub fn nr_repeats(&self) -> usize {
        self.chromosomes.iter().map(Chromosome::nr_repeats).sum()
    }

    pub fn nr_double_strand_breaks(&self) -> u32 {
        self.dsbs.iter().sum()
    }

    /// Breaks per chromosome in the last round, in pre-recombination order.
    pub fn dsbs_per_chromosome(&self) -> &[u32] {
        &self.dsbs
    }

    pub fn tally(&self) -> MutationTally {
        self.tally
    }

    pub fn has_mutation(&self) -> bool {
        self.tally.total() > 0
    }

    pub fn essential_tags(&self) -> Vec<u32> {
        self.chromosomes
            .iter()
            .flat_map(Chromosome::essential_tags)
            .collect()
    }

    pub fn module_tags(&self, module: u32) -> Vec<u32> {
        self.chromosomes
            .iter()
            .flat_map(|c| c.module_tags(module))
            .collect()
    }

    pub fn one_centromere(&self) -> bool {
        self.chromosomes.iter().all(Chromosome::one_centromere)
    }

    /// Uniformly random valid insertion point anywhere in the genome.
    pub fn random_locus(&self, rng: &mut dyn RngCore) -> Option<Locus> {
        mutations::random_locus(&self.chromosomes, rng)
    }

    /// Double the chromosome set: every chromosome gets a deep copy appended
    /// after the originals.
    pub fn duplicate(&mut self) {
        let copies: Vec<Chromosome> = self.chromosomes.to_vec();
        self.chromosomes.extend(copies);
    }

    /// Move the second half of the chromosomes into a new genome. With an odd
    /// count the extra chromosome stays here.
    pub fn split(&mut self) -> Genome {
        let keep = self.chromosomes.len().div_ceil(2);
        Genome {
            chromosomes: self.chromosomes.split_off(keep),
            dsbs: self.dsbs.clone(),
            tally: self.tally,
        }
    }

    /// One mutation round: sweep every chromosome, then rejoin whatever broke.
    /// Returns the number of mutation events.
    pub fn mutate<R: RngCore>(&mut self, engine: &mut MutationEngine<R>) -> u32 {
        for ci in 0..self.chromosomes.len() {
            mutations::mutate_chromosome(&mut self.chromosomes, ci, engine);
        }
        self.dsbs = self
            .chromosomes
            .iter()
            .map(Chromosome::nr_double_strand_breaks)
            .collect();
        self.tally = self
            .chromosomes
            .iter()
            .map(Chromosome::tally)
            .fold(MutationTally::default(), |acc, t| acc + t);

        recombination::recombine(&mut self.chromosomes, &mut engine.chromosomes, &mut engine.rng);
        debug!(
            "mutation round: {} events, {} breaks, {} chromosomes, {} elements",
            self.tally.total(),
            self.tally.double_strand_breaks,
            self.chromosomes.len(),
            self.full_size()
        );
        self.tally.total()
    }

    pub fn to_xml(&self, space: &ShortSeqSpace) -> String {
        let mut out = String::from("<genome>\n");
        for chromosome in &self.chromosomes {
            out.push_str(&chromosome.to_xml(space));
        }
        out.push_str("</genome>\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::mutations::tests::SeqRng;
    use crate::rates::{MutationRates, RateScheme};
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ten_genes(rates: MutationRates) -> Genome {
        let mut elements = vec![Element::centromere()];
        elements.extend((0..10).map(Element::ordinary));
        Genome::new(vec![Chromosome::new(elements, rates).unwrap()]).unwrap()
    }

    fn fixed<R: RngCore>(rng: R) -> MutationEngine<R> {
        MutationEngine::new(rng, RateScheme::Fixed)
    }

    #[test]
    fn forced_gene_copy_adds_one_element() {
        let rates = MutationRates {
            copy_gene: 0.5,
            ..MutationRates::zero()
        };
        let mut genome = ten_genes(rates);
        let mut engine = fixed(SeqRng {
            values: vec![0, 0],
            idx: 0,
        });
        assert_eq!(genome.mutate(&mut engine), 1);
        assert_eq!(genome.full_size(), 12);
        assert_eq!(
            genome.tally(),
            MutationTally {
                gene_copies: 1,
                ..Default::default()
            }
        );
        assert!(genome.has_mutation());
    }

    #[test]
    fn copy_then_remove_of_the_clone_restores_size() {
        let rates = MutationRates {
            copy_gene: 0.25,
            remove_gene: 0.25,
            ..MutationRates::zero()
        };
        let mut genome = ten_genes(rates);
        let mut engine = fixed(SeqRng {
            values: vec![0, 0],
            idx: 0,
        });
        genome.mutate(&mut engine);
        assert_eq!(genome.full_size(), 12);

        // the clone sits at index 1; remove it and nothing else
        *engine.rng() = SeqRng {
            values: vec![u64::MAX / 8 * 3],
            idx: 0,
        };
        genome.mutate(&mut engine);
        assert_eq!(genome.tally().gene_removals, 1);
        assert_eq!(genome.full_size(), 11);
        assert_eq!(genome.essential_tags(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn forced_retroposon_removal() {
        let rates = MutationRates {
            remove_retroposon: 1.0,
            ..MutationRates::zero()
        };
        let mut genome = Genome::new(vec![Chromosome::new(
            vec![
                Element::ordinary(0),
                Element::repeat(),
                Element::retroposon(170),
                Element::repeat(),
                Element::centromere(),
            ],
            rates,
        )
        .unwrap()])
        .unwrap();
        let mut engine = fixed(StepRng::new(0, 0));
        genome.mutate(&mut engine);
        let c = &genome.chromosomes()[0];
        assert_eq!(c.size(), 3);
        assert!(c.elements()[1].is_repeat());
        assert!(!c.elements()[1].is_active());
        assert_eq!(genome.nr_retroposons(), 0);
        assert_eq!(genome.tally().retroposon_removals, 1);
        assert_eq!(genome.tally().total(), 1);
    }

    #[test]
    fn two_breaks_keep_chromosome_count_and_elements() {
        let rates = MutationRates {
            recombination: 1.0,
            ..MutationRates::zero()
        };
        let a = Chromosome::new(
            vec![Element::ordinary(0), Element::repeat(), Element::centromere()],
            rates,
        )
        .unwrap();
        let b = Chromosome::new(
            vec![Element::centromere(), Element::ordinary(1), Element::repeat(), Element::ordinary(2)],
            rates,
        )
        .unwrap();
        for seed in 0..8u64 {
            let mut genome = Genome::new(vec![a.clone(), b.clone()]).unwrap();
            let before = genome.full_size();
            let mut engine = fixed(ChaCha8Rng::seed_from_u64(seed));
            genome.mutate(&mut engine);
            assert_eq!(genome.len(), 2);
            assert_eq!(genome.full_size(), before);
            assert_eq!(genome.dsbs_per_chromosome(), &[1, 1]);
            assert_eq!(genome.nr_double_strand_breaks(), 2);
            assert_eq!(
                genome.chromosomes().iter().map(|c| c.nr_centromeres()).sum::<usize>(),
                2
            );
        }
    }

    #[test]
    fn duplicate_and_split() {
        let mut genome = ten_genes(MutationRates::default());
        genome.duplicate();
        assert_eq!(genome.len(), 2);
        assert_eq!(genome.full_size(), 22);
        assert_eq!(genome.essential_tags().len(), 20);

        let other = genome.split();
        assert_eq!(genome.len(), 1);
        assert_eq!(other.len(), 1);
        assert_eq!(other.full_size(), 11);

        let mut single = ten_genes(MutationRates::default());
        let empty = single.split();
        assert_eq!(single.len(), 1);
        assert!(empty.is_empty());
    }

    #[test]
    fn mutation_keeps_genome_wide_centromeres() {
        let rates = MutationRates {
            recombination: 0.05,
            remove_repeat: 0.05,
            copy_retroposon: 0.05,
            remove_retroposon: 0.05,
            copy_gene: 0.02,
            remove_gene: 0.02,
            new_retroposon: 0.001,
            ..MutationRates::zero()
        };
        let chromosome = |offset: u32| {
            let mut elements = vec![Element::centromere()];
            for t in offset..offset + 10 {
                elements.extend([
                    Element::repeat(),
                    Element::retroposon(100 + t),
                    Element::repeat(),
                    Element::ordinary(t),
                ]);
            }
            Chromosome::new(elements, rates).unwrap()
        };
        let mut genome = Genome::new(vec![chromosome(0), chromosome(10), chromosome(20)]).unwrap();
        let mut engine = fixed(ChaCha8Rng::seed_from_u64(99));
        for _ in 0..30 {
            genome.mutate(&mut engine);
            assert_eq!(genome.len(), 3);
            assert_eq!(
                genome.chromosomes().iter().map(|c| c.nr_centromeres()).sum::<usize>(),
                3
            );
            for c in genome.chromosomes() {
                assert_eq!((c.size(), c.nr_retroposons(), c.nr_repeats()), c.recount());
                assert!(c.elements().iter().all(|e| !e.has_dsb()));
                c.check_flanks().unwrap();
            }
        }
    }

    #[test]
    fn new_rejects_a_chromosome_without_centromere() {
        let bare = Chromosome::from_elements(vec![Element::ordinary(0)], MutationRates::zero());
        assert!(matches!(
            Genome::new(vec![bare.clone()]),
            Err(GenomeError::CentromereCount(0))
        ));
        assert_eq!(Genome::from_chromosomes(vec![bare]).len(), 1);
    }

    #[test]
    fn emptied_chromosome_leaves_the_genome() {
        let bare = Chromosome::from_elements(
            vec![Element::ordinary(0)],
            MutationRates {
                remove_gene: 1.0,
                ..MutationRates::zero()
            },
        );
        let broken = Chromosome::new(
            vec![Element::centromere(), Element::repeat(), Element::ordinary(1)],
            MutationRates {
                recombination: 1.0,
                ..MutationRates::zero()
            },
        )
        .unwrap();
        let mut genome = Genome::from_chromosomes(vec![bare, broken]);
        let mut engine = fixed(StepRng::new(0, 0));
        genome.mutate(&mut engine);
        assert_eq!(genome.dsbs_per_chromosome(), &[0, 1]);
        assert_eq!(genome.tally().gene_removals, 1);
        assert_eq!(genome.len(), 1);
        assert_eq!(genome.full_size(), 3);
        assert!(genome.one_centromere());
    }

    #[test]
    fn serde_keeps_elements_and_rates() {
        let genome = ten_genes(MutationRates::default());
        let json = serde_json::to_string(&genome).unwrap();
        let back: Genome = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.chromosomes()[0].elements(), genome.chromosomes()[0].elements());
        assert_eq!(back.chromosomes()[0].rates(), genome.chromosomes()[0].rates());
        assert_eq!(back.full_size(), 11);
        back.validate().unwrap();
    }

    #[test]
    fn xml_wraps_chromosomes() {
        let space = ShortSeqSpace::default();
        let genome = ten_genes(MutationRates::zero());
        let xml = genome.to_xml(&space);
        assert!(xml.starts_with("<genome>\n<chromosome len=\"11\">\n<centromere/>\n"));
        assert!(xml.ends_with("</chromosome>\n</genome>\n"));
    }
}
