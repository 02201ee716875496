use std::ops::{Add, AddAssign};

use log::trace;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::chromosome::Chromosome;
use crate::element::Element;
use crate::pool::Pool;
use crate::rates::RateScheme;

/// Rates at or below this are treated as zero and cost no random draw.
const EPS: f64 = f64::EPSILON;

/// Retroposon tags are drawn from this range.
const RETROPOSON_TAGS: std::ops::Range<u32> = 100..200;

/// Mutation events of one round, per category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationTally {
    pub double_strand_breaks: u32,
    pub gene_copies: u32,
    pub gene_removals: u32,
    pub retroposon_copies: u32,
    pub retroposon_removals: u32,
    pub repeat_removals: u32,
}

impl MutationTally {
    pub fn total(&self) -> u32 {
        self.double_strand_breaks
            + self.gene_copies
            + self.gene_removals
            + self.retroposon_copies
            + self.retroposon_removals
            + self.repeat_removals
    }
}

impl Add for MutationTally {
    type Output = MutationTally;

    fn add(mut self, rhs: MutationTally) -> MutationTally {
        self += rhs;
        self
    }
}

impl AddAssign for MutationTally {
    fn add_assign(&mut self, rhs: MutationTally) {
        self.double_strand_breaks += rhs.double_strand_breaks;
        self.gene_copies += rhs.gene_copies;
        self.gene_removals += rhs.gene_removals;
        self.retroposon_copies += rhs.retroposon_copies;
        self.retroposon_removals += rhs.retroposon_removals;
        self.repeat_removals += rhs.repeat_removals;
    }
}

/// Insertion point: in front of element `index` of chromosome `chromosome`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Locus {
    pub chromosome: usize,
    pub index: usize,
}

/// Per-run mutation context: the random source, the rate-evolution scheme
/// and the recycling pools. One engine drives one lineage.
#[derive(Debug)]
pub struct MutationEngine<R> {
    pub(crate) rng: R,
    pub(crate) scheme: RateScheme,
    pub(crate) chromosomes: Pool<Chromosome>,
    pub(crate) runs: Pool<Vec<Element>>,
}

impl<R: RngCore> MutationEngine<R> {
    pub fn new(rng: R, scheme: RateScheme) -> Self {
        Self {
            rng,
            scheme,
            chromosomes: Pool::new(),
            runs: Pool::new(),
        }
    }

    pub fn rng(&mut self) -> &mut R {
        &mut self.rng
    }

    pub fn into_rng(self) -> R {
        self.rng
    }

    pub fn scheme(&self) -> RateScheme {
        self.scheme
    }

    /// Recycled chromosomes waiting for reuse.
    pub fn pooled_chromosomes(&self) -> usize {
        self.chromosomes.len()
    }
}

/// Pick an insertion point uniformly among all valid targets of all
/// chromosomes. `None` when no chromosome has a valid target.
pub fn random_locus(chromosomes: &[Chromosome], rng: &mut dyn RngCore) -> Option<Locus> {
    let counts: Vec<usize> = chromosomes.iter().map(Chromosome::nr_valid_targets).collect();
    let total: usize = counts.iter().sum();
    if total == 0 {
        return None;
    }
    let mut k = rng.gen_range(0..total);
    for (chromosome, n) in counts.into_iter().enumerate() {
        if k < n {
            let index = chromosomes[chromosome].nth_valid_target(k)?;
            return Some(Locus { chromosome, index });
        }
        k -= n;
    }
    None
}

/// One mutation sweep over chromosome `ci`.
///
/// Elements inserted during the sweep are inactive, so each element present
/// at the start is visited at most once. Copies may land in any chromosome.
pub(crate) fn mutate_chromosome<R: RngCore>(
    chromosomes: &mut [Chromosome],
    ci: usize,
    engine: &mut MutationEngine<R>,
) {
    chromosomes[ci].reset();
    new_retroposon(chromosomes, ci, engine);

    let mut pos = 0;
    while pos < chromosomes[ci].elements().len() {
        let e = chromosomes[ci].elements()[pos];
        if !e.is_active() {
            pos += 1;
            continue;
        }
        pos = if e.is_true_downstream() {
            gene_mutate(chromosomes, ci, pos, engine)
        } else if e.is_repeat() {
            repeat_mutate(&mut chromosomes[ci], pos, &mut engine.rng)
        } else if e.is_retroposon() {
            retroposon_mutate(chromosomes, ci, pos, engine)
        } else {
            pos + 1
        };
    }

    let rates = *chromosomes[ci].rates();
    let next = engine.scheme.mutate(&rates, &mut engine.rng);
    chromosomes[ci].set_rates(next);
}

/// Insert `run` at `locus` and return the sweep cursor of chromosome `ci`,
/// shifted if the insertion happened at or before it.
fn insert_at(
    chromosomes: &mut [Chromosome],
    locus: Locus,
    run: &[Element],
    ci: usize,
    pos: usize,
) -> usize {
    chromosomes[locus.chromosome].insert_run(locus.index, run);
    if locus.chromosome == ci && locus.index <= pos {
        pos + run.len()
    } else {
        pos
    }
}

/// Maybe insert a fresh, flanked retroposon somewhere in the genome. The
/// chance grows with the size of chromosome `ci`.
fn new_retroposon<R: RngCore>(
    chromosomes: &mut [Chromosome],
    ci: usize,
    engine: &mut MutationEngine<R>,
) {
    let rate = chromosomes[ci].rates().new_retroposon;
    if rate <= EPS {
        return;
    }
    let p = 1.0 - (1.0 - rate).powi(chromosomes[ci].size() as i32);
    if engine.rng.gen::<f64>() >= p {
        return;
    }
    let Some(locus) = random_locus(chromosomes, &mut engine.rng) else {
        return;
    };
    let tag = engine.rng.gen_range(RETROPOSON_TAGS);
    let block = [Element::repeat(), Element::retroposon(tag), Element::repeat()];
    chromosomes[locus.chromosome].insert_run(locus.index, &block);
    trace!("new retroposon {tag} at {locus:?}");
}

/// Copy or remove the gene ending at `pos` together with its binding sites.
fn gene_mutate<R: RngCore>(
    chromosomes: &mut [Chromosome],
    ci: usize,
    pos: usize,
    engine: &mut MutationEngine<R>,
) -> usize {
    let rates = *chromosomes[ci].rates();
    if rates.copy_gene + rates.remove_gene <= EPS {
        return pos + 1;
    }
    let u = engine.rng.gen::<f64>();
    if u < rates.copy_gene {
        let Some(locus) = random_locus(chromosomes, &mut engine.rng) else {
            return pos + 1;
        };
        let start = chromosomes[ci].upstream_start(pos);
        let mut run = engine.runs.borrow();
        run.extend(chromosomes[ci].elements()[start..=pos].iter().map(|e| {
            let mut copy = *e;
            copy.inactivate();
            copy
        }));
        let pos = insert_at(chromosomes, locus, &run, ci, pos);
        trace!("gene copy of {} elements to {locus:?}", run.len());
        engine.runs.give_back(run);
        chromosomes[ci].tally_mut().gene_copies += 1;
        pos + 1
    } else if u < rates.copy_gene + rates.remove_gene {
        let start = chromosomes[ci].upstream_start(pos);
        chromosomes[ci].remove_range(start..pos + 1);
        chromosomes[ci].tally_mut().gene_removals += 1;
        trace!("gene removal of {} elements", pos + 1 - start);
        start
    } else {
        pos + 1
    }
}

/// Copy or remove the flanked retroposon at `pos`.
fn retroposon_mutate<R: RngCore>(
    chromosomes: &mut [Chromosome],
    ci: usize,
    pos: usize,
    engine: &mut MutationEngine<R>,
) -> usize {
    let rates = *chromosomes[ci].rates();
    if rates.copy_retroposon + rates.remove_retroposon <= EPS {
        return pos + 1;
    }
    // a break at the leading repeat can separate the block during recombination
    if !chromosomes[ci].is_flanked(pos) {
        return pos + 1;
    }
    let u = engine.rng.gen::<f64>();
    if u < rates.copy_retroposon {
        let Some(locus) = random_locus(chromosomes, &mut engine.rng) else {
            return pos + 1;
        };
        let mut run = engine.runs.borrow();
        run.extend(chromosomes[ci].elements()[pos - 1..=pos + 1].iter().map(|e| {
            let mut copy = *e;
            copy.repair_dsb();
            copy.inactivate();
            copy
        }));
        let pos = insert_at(chromosomes, locus, &run, ci, pos);
        engine.runs.give_back(run);
        chromosomes[ci].tally_mut().retroposon_copies += 1;
        trace!("retroposon copy to {locus:?}");
        pos + 1
    } else if u < rates.copy_retroposon + rates.remove_retroposon {
        let chromosome = &mut chromosomes[ci];
        chromosome.remove_range(pos - 1..pos + 1);
        // the trailing repeat stays behind
        chromosome.element_mut(pos - 1).inactivate();
        chromosome.tally_mut().retroposon_removals += 1;
        trace!("retroposon removal");
        pos - 1
    } else {
        pos + 1
    }
}

/// Break or remove the repeat at `pos`. A repeat next to a retroposon is
/// never removed.
fn repeat_mutate(chromosome: &mut Chromosome, pos: usize, rng: &mut dyn RngCore) -> usize {
    chromosome.element_mut(pos).repair_dsb();
    let rates = *chromosome.rates();
    if rates.recombination + rates.remove_repeat <= EPS {
        return pos + 1;
    }
    let u = rng.gen::<f64>();
    if u < rates.recombination {
        let e = chromosome.element_mut(pos);
        e.induce_dsb();
        e.inactivate();
        chromosome.tally_mut().double_strand_breaks += 1;
        pos + 1
    } else if u < rates.recombination + rates.remove_repeat {
        if chromosome.pins_retroposon(pos) {
            return pos + 1;
        }
        chromosome.remove_range(pos..pos + 1);
        chromosome.tally_mut().repeat_removals += 1;
        pos
    } else {
        pos + 1
    }
}
