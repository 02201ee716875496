use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{GenomeError, Result};

/// Number of rate parameters the rate-evolution schemes can touch.
pub const NR_EVOLVING_RATES: u32 = 12;

/// Per-chromosome mutation rates. Serialized names are the short option
/// names used in configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationRates {
    #[serde(rename = "new_bsite")]
    pub new_bsite: f64,
    #[serde(rename = "cp_bsite")]
    pub copy_bsite: f64,
    #[serde(rename = "rm_bsite")]
    pub remove_bsite: f64,
    #[serde(rename = "cp_gene")]
    pub copy_gene: f64,
    #[serde(rename = "rm_gene")]
    pub remove_gene: f64,
    #[serde(rename = "cp_tp")]
    pub copy_retroposon: f64,
    #[serde(rename = "rm_tp")]
    pub remove_retroposon: f64,
    #[serde(rename = "rm_ltr")]
    pub remove_repeat: f64,
    #[serde(rename = "new_tp")]
    pub new_retroposon: f64,
    /// Rate of a double-strand break times the rate of faulty repair.
    #[serde(rename = "dsb_recombination")]
    pub recombination: f64,
    #[serde(rename = "mut_step")]
    pub mutation_step: f64,
    pub dsb_step: f64,
    pub retro_step: f64,
    /// Per-parameter probability that the rates themselves mutate.
    #[serde(rename = "mut_rate")]
    pub rate_mutation: f64,
}

impl Default for MutationRates {
    fn default() -> Self {
        Self {
            new_bsite: 1e-5,
            copy_bsite: 1e-3,
            remove_bsite: 1.01e-3,
            copy_gene: 1e-4,
            remove_gene: 1e-4,
            copy_retroposon: 1e-4,
            remove_retroposon: 1e-4,
            remove_repeat: 1e-5,
            new_retroposon: 1e-6,
            recombination: 1e-2,
            mutation_step: 1e-9,
            dsb_step: 1e-5,
            retro_step: 1e-6,
            rate_mutation: 1e-5,
        }
    }
}

impl MutationRates {
    /// All rates zero: nothing ever happens.
    pub fn zero() -> Self {
        Self {
            new_bsite: 0.0,
            copy_bsite: 0.0,
            remove_bsite: 0.0,
            copy_gene: 0.0,
            remove_gene: 0.0,
            copy_retroposon: 0.0,
            remove_retroposon: 0.0,
            remove_repeat: 0.0,
            new_retroposon: 0.0,
            recombination: 0.0,
            mutation_step: 0.0,
            dsb_step: 0.0,
            retro_step: 0.0,
            rate_mutation: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let named = [
            ("new_bsite", self.new_bsite),
            ("cp_bsite", self.copy_bsite),
            ("rm_bsite", self.remove_bsite),
            ("cp_gene", self.copy_gene),
            ("rm_gene", self.remove_gene),
            ("cp_tp", self.copy_retroposon),
            ("rm_tp", self.remove_retroposon),
            ("rm_ltr", self.remove_repeat),
            ("new_tp", self.new_retroposon),
            ("dsb_recombination", self.recombination),
            ("mut_step", self.mutation_step),
            ("dsb_step", self.dsb_step),
            ("retro_step", self.retro_step),
            ("mut_rate", self.rate_mutation),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(GenomeError::InvalidRate { name, value });
            }
        }
        for (name, value) in [("new_tp", self.new_retroposon), ("mut_rate", self.rate_mutation)] {
            if value > 1.0 {
                return Err(GenomeError::InvalidRate { name, value });
            }
        }
        let sums = [
            ("gene", self.copy_gene + self.remove_gene),
            ("retroposon", self.copy_retroposon + self.remove_retroposon),
            ("repeat", self.recombination + self.remove_repeat),
            ("binding site", self.new_bsite + self.copy_bsite + self.remove_bsite),
        ];
        for (class, sum) in sums {
            if sum > 1.0 {
                return Err(GenomeError::RateSum { class, sum });
            }
        }
        Ok(())
    }
}

/// How a chromosome's own rates evolve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum RateScheme {
    /// Gene rates move by a fixed `mutation_step`.
    #[default]
    Fixed,
    /// Gene rates move proportionally to their current value. A rate that
    /// reaches zero stays there.
    Linear,
    /// Gene rates are redrawn from `[low, high)`.
    Uniform { low: f64, high: f64 },
}

impl RateScheme {
    /// Resolve a scheme from its selector name. Bounds are only consulted for
    /// `uniform` and default to `[0, 1)`.
    pub fn from_name(name: &str, low: Option<f64>, high: Option<f64>) -> Result<Self> {
        let scheme = match name {
            "fixed" => RateScheme::Fixed,
            "linear" => RateScheme::Linear,
            "uniform" => RateScheme::Uniform {
                low: low.unwrap_or(0.0),
                high: high.unwrap_or(1.0),
            },
            other => return Err(GenomeError::UnknownScheme(other.to_string())),
        };
        scheme.validate()?;
        Ok(scheme)
    }

    pub fn validate(&self) -> Result<()> {
        if let RateScheme::Uniform { low, high } = *self {
            if !(low.is_finite() && high.is_finite() && 0.0 <= low && low <= high) {
                return Err(GenomeError::UniformBounds { low, high });
            }
        }
        Ok(())
    }

    /// Possibly perturb one of the evolving rates. Pure apart from the RNG
    /// draws; the input is left untouched.
    pub fn mutate(&self, rates: &MutationRates, rng: &mut dyn RngCore) -> MutationRates {
        let mut next = *rates;
        if rates.rate_mutation <= f64::EPSILON {
            return next;
        }
        let p = 1.0 - (1.0 - rates.rate_mutation).powi(NR_EVOLVING_RATES as i32);
        if rng.gen::<f64>() >= p {
            return next;
        }
        let which = rng.gen_range(0..NR_EVOLVING_RATES);
        let redraw = match *self {
            RateScheme::Uniform { low, high } => Some(low + rng.gen::<f64>() * (high - low)),
            _ => None,
        };
        let gene_step = |rate: f64| match self {
            RateScheme::Linear => rates.mutation_step * rate,
            _ => rates.mutation_step,
        };
        match which {
            0 => match redraw {
                Some(v) => next.copy_gene = v,
                None => next.copy_gene += gene_step(rates.copy_gene),
            },
            1 => match redraw {
                Some(v) => next.remove_gene = v,
                None => next.remove_gene += gene_step(rates.remove_gene),
            },
            2 => next.recombination += rates.dsb_step,
            3 => match redraw {
                Some(v) => next.copy_gene = v,
                None => decrease(&mut next.copy_gene, gene_step(rates.copy_gene)),
            },
            4 => match redraw {
                Some(v) => next.remove_gene = v,
                None => decrease(&mut next.remove_gene, gene_step(rates.remove_gene)),
            },
            5 => decrease(&mut next.recombination, rates.dsb_step),
            6 => next.copy_retroposon += rates.retro_step,
            7 => next.remove_retroposon += rates.retro_step,
            8 => next.remove_repeat += rates.retro_step,
            9 => decrease(&mut next.copy_retroposon, rates.retro_step),
            10 => decrease(&mut next.remove_retroposon, rates.retro_step),
            _ => decrease(&mut next.remove_repeat, rates.retro_step),
        }
        next
    }
}

fn decrease(rate: &mut f64, step: f64) {
    *rate = (*rate - step).max(0.0);
}
