use log::trace;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::chromosome::Chromosome;
use crate::pool::Pool;

/// Rejoin broken chromosomes at random.
///
/// Chromosomes without a break this round are kept as they are, in order.
/// Every broken chromosome contributes its first fragment as a head, its last
/// fragment as a tail and everything in between as middles. Middles are
/// appended to random heads, then every head receives one of the shuffled
/// tails. The rejoined heads follow the unaffected chromosomes. Chromosomes
/// left without elements go back to the pool.
pub fn recombine(
    chromosomes: &mut Vec<Chromosome>,
    pool: &mut Pool<Chromosome>,
    rng: &mut dyn RngCore,
) {
    if chromosomes
        .iter()
        .all(|c| c.nr_double_strand_breaks() == 0 && !c.is_empty())
    {
        return;
    }
    let mut unaffected = Vec::with_capacity(chromosomes.len());
    let mut heads = Vec::new();
    let mut middles = Vec::new();
    let mut tails = Vec::new();
    for chromosome in chromosomes.drain(..) {
        let mut parts = chromosome.segments(pool);
        if parts.len() == 1 {
            for part in parts {
                if part.is_empty() {
                    pool.give_back(part);
                } else {
                    unaffected.push(part);
                }
            }
            continue;
        }
        let tail = parts.pop();
        let mut parts = parts.into_iter();
        heads.extend(parts.next());
        middles.extend(parts);
        tails.extend(tail);
    }
    trace!(
        "recombining {} heads, {} middles, {} tails",
        heads.len(),
        middles.len(),
        tails.len()
    );

    middles.shuffle(rng);
    for mut middle in middles {
        let h = rng.gen_range(0..heads.len());
        heads[h].append(&mut middle);
        pool.give_back(middle);
    }

    tails.shuffle(rng);
    for (head, mut tail) in heads.iter_mut().zip(tails) {
        head.append(&mut tail);
        pool.give_back(tail);
    }
    for head in &heads {
        head.recache();
    }

    unaffected.extend(heads);
    *chromosomes = unaffected;
}
