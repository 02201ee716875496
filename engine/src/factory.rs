use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::chromosome::Chromosome;
use crate::element::Element;
use crate::error::{GenomeError, Result};
use crate::genome::Genome;
use crate::rates::MutationRates;
use crate::shortseq::ShortSeqSpace;

/// Layout of a freshly built chromosome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Blueprint {
    /// Ordinary (essential) downstreams.
    pub dstreams: u32,
    pub modules: u32,
    /// Downstreams per module.
    pub dstreams_mod: u32,
    /// Transcription factors, kept together like a module.
    pub transfacs: u32,
    pub tposons: u32,
    /// Single repeats, not part of a retroposon block.
    pub repeats: u32,
    /// Binding sites in front of every gene.
    pub bsites: u32,
    pub chromos: u32,
    /// 1.0 keeps the part order intact, 0.0 shuffles everything.
    pub organised: f64,
}

impl Default for Blueprint {
    fn default() -> Self {
        Self {
            dstreams: 600,
            modules: 1,
            dstreams_mod: 1,
            transfacs: 0,
            tposons: 10,
            repeats: 0,
            bsites: 5,
            chromos: 1,
            organised: 0.0,
        }
    }
}

impl Blueprint {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.organised) {
            return Err(GenomeError::Blueprint(format!(
                "organised must be within [0, 1], got {}",
                self.organised
            )));
        }
        if self.chromos == 0 {
            return Err(GenomeError::Blueprint("a genome needs at least one chromosome".into()));
        }
        Ok(())
    }

    /// Build a genome of `chromos` chromosomes. Tags count from zero.
    pub fn genome(
        &self,
        rates: &MutationRates,
        space: &ShortSeqSpace,
        rng: &mut dyn RngCore,
    ) -> Result<Genome> {
        self.validate()?;
        let mut tags = 0;
        let chromosomes = (0..self.chromos)
            .map(|_| self.build(rates, space, &mut tags, rng))
            .collect::<Result<Vec<_>>>()?;
        Genome::new(chromosomes)
    }

    /// Build a single chromosome with tags counting from zero.
    pub fn chromosome(
        &self,
        rates: &MutationRates,
        space: &ShortSeqSpace,
        rng: &mut dyn RngCore,
    ) -> Result<Chromosome> {
        self.validate()?;
        self.build(rates, space, &mut 0, rng)
    }

    fn build(
        &self,
        rates: &MutationRates,
        space: &ShortSeqSpace,
        tags: &mut u32,
        rng: &mut dyn RngCore,
    ) -> Result<Chromosome> {
        let mut next_tag = || {
            let t = *tags;
            *tags += 1;
            t
        };

        let mut parts: Vec<VecDeque<Element>> = Vec::new();
        parts.push((0..self.dstreams).map(|_| Element::ordinary(next_tag())).collect());
        for m in 0..self.modules {
            parts.push(
                (0..self.dstreams_mod)
                    .map(|_| Element::module(next_tag(), m))
                    .collect(),
            );
        }
        if self.transfacs > 0 {
            parts.push(
                (0..self.transfacs)
                    .map(|_| Element::transcription_factor(next_tag(), space.random(rng)))
                    .collect(),
            );
        }
        let retroposons: Vec<Element> = (0..self.tposons)
            .map(|_| Element::retroposon(next_tag()))
            .collect();
        let mut singles: Vec<Element> = (0..self.repeats).map(|_| Element::repeat()).collect();
        singles.push(Element::centromere());

        // scatter singles, then retroposons, over both ends of the parts
        let ends = 2 * parts.len();
        for e in singles.into_iter().chain(retroposons) {
            let b = (ends as f64 * rng.gen::<f64>()) as usize;
            if b % 2 == 0 {
                parts[b / 2].push_back(e);
            } else {
                parts[b / 2].push_front(e);
            }
        }
        let mut elements: Vec<Element> = parts.into_iter().flatten().collect();
        disorganise(&mut elements, self.organised, rng);

        let mut full = Vec::with_capacity(
            elements.len() + 2 * self.tposons as usize + self.bsites as usize * elements.len(),
        );
        for e in elements {
            if e.is_retroposon() {
                full.extend([Element::repeat(), e, Element::repeat()]);
            } else if e.is_true_downstream() {
                full.extend((0..self.bsites).map(|_| Element::binding_site(space.random(rng))));
                full.push(e);
            } else {
                full.push(e);
            }
        }
        Chromosome::new(full, *rates)
    }
}

/// Re-place a `1 - organised` share of the elements at random positions.
fn disorganise(elements: &mut Vec<Element>, organised: f64, rng: &mut dyn RngCore) {
    let mut n = elements.len();
    let moved = (0.5 + (1.0 - organised) * n as f64) as usize;
    if moved == n {
        elements.shuffle(rng);
        return;
    }
    let mut taken = Vec::with_capacity(moved);
    for _ in 0..moved {
        let i = (n as f64 * rng.gen::<f64>()) as usize;
        taken.push(elements.remove(i));
        n -= 1;
    }
    while let Some(e) = taken.pop() {
        let i = (n as f64 * rng.gen::<f64>()) as usize;
        elements.insert(i, e);
        n += 1;
    }
}
