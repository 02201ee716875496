use std::cell::Cell;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementKind};
use crate::error::{GenomeError, Result};
use crate::mutations::MutationTally;
use crate::pool::{Pool, Recycle};
use crate::rates::MutationRates;
use crate::shortseq::ShortSeqSpace;

/// Lazily recomputed chromosome statistics.
///
/// Structural operators keep the counts up to date incrementally. A stale
/// flag forces a brute-force recount on the next read.
#[derive(Clone, Debug)]
struct StatCache {
    len: Cell<usize>,
    retroposons: Cell<usize>,
    repeats: Cell<usize>,
    stale_len: Cell<bool>,
    stale_retroposons: Cell<bool>,
    stale_repeats: Cell<bool>,
}

impl Default for StatCache {
    fn default() -> Self {
        Self {
            len: Cell::new(0),
            retroposons: Cell::new(0),
            repeats: Cell::new(0),
            stale_len: Cell::new(true),
            stale_retroposons: Cell::new(true),
            stale_repeats: Cell::new(true),
        }
    }
}

impl StatCache {
    fn invalidate(&self) {
        self.stale_len.set(true);
        self.stale_retroposons.set(true);
        self.stale_repeats.set(true);
    }

    fn added(&self, run: &[Element]) {
        self.len.set(self.len.get() + run.len());
        self.retroposons
            .set(self.retroposons.get() + run.iter().filter(|e| e.is_retroposon()).count());
        self.repeats
            .set(self.repeats.get() + run.iter().filter(|e| e.is_repeat()).count());
    }

    fn removed(&self, run: &[Element]) {
        self.len.set(self.len.get().saturating_sub(run.len()));
        self.retroposons.set(
            self.retroposons
                .get()
                .saturating_sub(run.iter().filter(|e| e.is_retroposon()).count()),
        );
        self.repeats.set(
            self.repeats
                .get()
                .saturating_sub(run.iter().filter(|e| e.is_repeat()).count()),
        );
    }
}

/// An ordered sequence of chromosome elements with its own mutation rates.
///
/// The chromosome owns its elements exclusively. The per-round mutation tally
/// and the statistics cache are not persisted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Chromosome {
    elements: Vec<Element>,
    rates: MutationRates,
    #[serde(skip)]
    tally: MutationTally,
    #[serde(skip)]
    cache: StatCache,
}

impl Recycle for Chromosome {
    fn recycle(&mut self) {
        self.elements.clear();
        self.rates = MutationRates::zero();
        self.tally = MutationTally::default();
        self.cache.invalidate();
    }
}

impl Chromosome {
    /// Build a chromosome, checking that it has exactly one centromere and
    /// that every retroposon sits between two repeats.
    pub fn new(elements: Vec<Element>, rates: MutationRates) -> Result<Self> {
        let chromosome = Self::from_elements(elements, rates);
        let centromeres = chromosome.nr_centromeres();
        if centromeres != 1 {
            return Err(GenomeError::CentromereCount(centromeres));
        }
        chromosome.check_flanks()?;
        Ok(chromosome)
    }

    /// Build a chromosome without validating its structure.
    pub fn from_elements(elements: Vec<Element>, rates: MutationRates) -> Self {
        Self {
            elements,
            rates,
            tally: MutationTally::default(),
            cache: StatCache::default(),
        }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn rates(&self) -> &MutationRates {
        &self.rates
    }

    pub fn rates_mut(&mut self) -> &mut MutationRates {
        &mut self.rates
    }

    /// Mutation events of the most recent round.
    pub fn tally(&self) -> MutationTally {
        self.tally
    }

    pub fn nr_double_strand_breaks(&self) -> u32 {
        self.tally.double_strand_breaks
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of elements (cached).
    pub fn size(&self) -> usize {
        if self.cache.stale_len.get() {
            self.cache.len.set(self.elements.len());
            self.cache.stale_len.set(false);
        }
        self.cache.len.get()
    }

    pub fn nr_retroposons(&self) -> usize {
        if self.cache.stale_retroposons.get() {
            self.cache
                .retroposons
                .set(self.elements.iter().filter(|e| e.is_retroposon()).count());
            self.cache.stale_retroposons.set(false);
        }
        self.cache.retroposons.get()
    }

    pub fn nr_repeats(&self) -> usize {
        if self.cache.stale_repeats.get() {
            self.cache
                .repeats
                .set(self.elements.iter().filter(|e| e.is_repeat()).count());
            self.cache.stale_repeats.set(false);
        }
        self.cache.repeats.get()
    }

    /// Mark every cached statistic stale.
    pub fn recache(&self) {
        self.cache.invalidate();
    }

    /// Brute-force (size, retroposons, repeats), bypassing the cache.
    pub fn recount(&self) -> (usize, usize, usize) {
        (
            self.elements.len(),
            self.elements.iter().filter(|e| e.is_retroposon()).count(),
            self.elements.iter().filter(|e| e.is_repeat()).count(),
        )
    }

    pub fn nr_centromeres(&self) -> usize {
        self.elements.iter().filter(|e| e.is_centromere()).count()
    }

    pub fn one_centromere(&self) -> bool {
        self.nr_centromeres() == 1
    }

    /// Every retroposon must have a repeat directly before and after it.
    pub fn check_flanks(&self) -> Result<()> {
        for (i, e) in self.elements.iter().enumerate() {
            if e.is_retroposon() && !self.is_flanked(i) {
                return Err(GenomeError::UnflankedRetroposon(i));
            }
        }
        Ok(())
    }

    pub(crate) fn is_flanked(&self, pos: usize) -> bool {
        pos > 0
            && self.elements.get(pos - 1).is_some_and(Element::is_repeat)
            && self.elements.get(pos + 1).is_some_and(Element::is_repeat)
    }

    /// Is the repeat at `pos` directly next to a retroposon?
    pub(crate) fn pins_retroposon(&self, pos: usize) -> bool {
        let before = pos > 0 && self.elements[pos - 1].is_retroposon();
        let after = self
            .elements
            .get(pos + 1)
            .is_some_and(Element::is_retroposon);
        before || after
    }

    /// Mark all elements active and clear the round tally.
    pub fn reset(&mut self) {
        for e in &mut self.elements {
            e.activate();
        }
        self.tally = MutationTally::default();
    }

    /// Tags of all ordinary downstreams, duplicates included.
    pub fn essential_tags(&self) -> Vec<u32> {
        self.elements
            .iter()
            .filter_map(|e| match e.kind {
                ElementKind::OrdinaryDownstream { tag } => Some(tag),
                _ => None,
            })
            .collect()
    }

    /// Tags of the module downstreams belonging to `module`.
    pub fn module_tags(&self, module: u32) -> Vec<u32> {
        self.elements
            .iter()
            .filter_map(|e| match e.kind {
                ElementKind::ModuleDownstream { tag, module: m } if m == module => Some(tag),
                _ => None,
            })
            .collect()
    }

    /// Start of the gene ending at `pos`: the first of the contiguous binding
    /// sites directly in front of it, or `pos` itself if there are none.
    pub fn upstream_start(&self, pos: usize) -> usize {
        let mut start = pos;
        while start > 0 && self.elements[start - 1].is_binding_site() {
            start -= 1;
        }
        start
    }

    /// Can new material be inserted in front of the element at `pos`?
    ///
    /// Genes, binding sites and repeats qualify, except a repeat that closes a
    /// retroposon block.
    pub fn is_valid_target(&self, pos: usize) -> bool {
        let e = &self.elements[pos];
        if e.is_true_downstream() || e.is_binding_site() {
            return true;
        }
        e.is_repeat() && (pos == 0 || !self.elements[pos - 1].is_retroposon())
    }

    pub fn valid_targets(&self) -> Vec<usize> {
        (0..self.elements.len())
            .filter(|i| self.is_valid_target(*i))
            .collect()
    }

    pub(crate) fn nr_valid_targets(&self) -> usize {
        (0..self.elements.len())
            .filter(|i| self.is_valid_target(*i))
            .count()
    }

    pub(crate) fn nth_valid_target(&self, n: usize) -> Option<usize> {
        (0..self.elements.len())
            .filter(|i| self.is_valid_target(*i))
            .nth(n)
    }

    pub(crate) fn element_mut(&mut self, pos: usize) -> &mut Element {
        &mut self.elements[pos]
    }

    pub(crate) fn tally_mut(&mut self) -> &mut MutationTally {
        &mut self.tally
    }

    pub(crate) fn set_rates(&mut self, rates: MutationRates) {
        self.rates = rates;
    }

    /// Insert `run` in front of the element at `at`.
    pub(crate) fn insert_run(&mut self, at: usize, run: &[Element]) {
        self.elements.splice(at..at, run.iter().copied());
        self.cache.added(run);
    }

    pub(crate) fn remove_range(&mut self, range: Range<usize>) {
        let removed: Vec<Element> = self.elements.drain(range).collect();
        self.cache.removed(&removed);
    }

    /// Move all elements of `other` to the end of `self`, leaving `other`
    /// empty. Rates of `self` are kept.
    pub fn append(&mut self, other: &mut Chromosome) {
        let moved = std::mem::take(&mut other.elements);
        self.cache.added(&moved);
        self.elements.extend(moved);
        other.cache.invalidate();
    }

    /// Split at repaired double-strand breaks.
    ///
    /// Without a break this round the chromosome itself is returned. Otherwise
    /// each flagged repeat is repaired and closes a fragment (the repeat is the
    /// last element of its fragment), the remainder forms the final fragment,
    /// and the emptied chromosome goes back to `pool`. Fragments come from
    /// `pool` and inherit this chromosome's rates.
    pub fn segments(mut self, pool: &mut Pool<Chromosome>) -> Vec<Chromosome> {
        if self.tally.double_strand_breaks == 0 {
            return vec![self];
        }
        let rates = self.rates;
        let mut fragments = Vec::new();
        let mut current = pool.borrow();
        current.rates = rates;
        for mut e in self.elements.drain(..) {
            let cut = e.has_dsb();
            if cut {
                e.repair_dsb();
            }
            current.elements.push(e);
            if cut {
                current.cache.invalidate();
                fragments.push(current);
                current = pool.borrow();
                current.rates = rates;
            }
        }
        current.cache.invalidate();
        fragments.push(current);
        pool.give_back(self);
        fragments
    }

    pub fn to_xml(&self, space: &ShortSeqSpace) -> String {
        let mut out = format!("<chromosome len=\"{}\">\n", self.elements.len());
        for e in &self.elements {
            out.push_str(&e.to_xml(space));
            out.push('\n');
        }
        let r = &self.rates;
        out.push_str("<rates>\n");
        out.push_str(&format!(
            "<copy gene=\"{}\" retro=\"{}\"/>\n",
            r.copy_gene, r.copy_retroposon
        ));
        out.push_str(&format!(
            "<remove gene=\"{}\" retro=\"{}\" repeat=\"{}\"/>\n",
            r.remove_gene, r.remove_retroposon, r.remove_repeat
        ));
        out.push_str(&format!("<break dsb=\"{}\"/>\n", r.recombination));
        out.push_str("</rates>\n</chromosome>\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortseq::ShortSeq;

    fn bs() -> Element {
        Element::binding_site(ShortSeq(0))
    }

    fn broken_repeat() -> Element {
        let mut r = Element::repeat();
        r.induce_dsb();
        r
    }

    fn with_breaks(elements: Vec<Element>) -> Chromosome {
        let mut c = Chromosome::from_elements(elements, MutationRates::default());
        c.tally.double_strand_breaks = c.elements.iter().filter(|e| e.has_dsb()).count() as u32;
        c
    }

    #[test]
    fn construction_checks_centromere_and_flanks() {
        let rates = MutationRates::zero();
        assert!(Chromosome::new(vec![Element::ordinary(0), Element::centromere()], rates).is_ok());
        assert!(matches!(
            Chromosome::new(vec![Element::ordinary(0)], rates),
            Err(GenomeError::CentromereCount(0))
        ));
        assert!(matches!(
            Chromosome::new(vec![Element::centromere(), Element::centromere()], rates),
            Err(GenomeError::CentromereCount(2))
        ));
        assert!(matches!(
            Chromosome::new(
                vec![Element::centromere(), Element::retroposon(100), Element::repeat()],
                rates
            ),
            Err(GenomeError::UnflankedRetroposon(1))
        ));
    }

    #[test]
    fn cache_tracks_structural_edits() {
        let mut c = Chromosome::from_elements(
            vec![Element::centromere(), Element::ordinary(0), Element::ordinary(1)],
            MutationRates::zero(),
        );
        assert_eq!(c.size(), 3);
        c.insert_run(1, &[Element::repeat(), Element::retroposon(150), Element::repeat()]);
        c.remove_range(0..1);
        c.insert_run(0, &[bs(), bs()]);
        let cached = (c.size(), c.nr_retroposons(), c.nr_repeats());
        assert_eq!(cached, c.recount());
        c.recache();
        assert_eq!((c.size(), c.nr_retroposons(), c.nr_repeats()), cached);
        assert_eq!(cached, (7, 1, 2));
    }

    #[test]
    fn upstream_start_covers_binding_sites() {
        let c = Chromosome::from_elements(
            vec![Element::ordinary(0), bs(), bs(), Element::ordinary(1), Element::ordinary(2)],
            MutationRates::zero(),
        );
        assert_eq!(c.upstream_start(3), 1);
        assert_eq!(c.upstream_start(4), 4);
        assert_eq!(c.upstream_start(0), 0);
    }

    #[test]
    fn valid_targets_skip_closing_repeats() {
        let c = Chromosome::from_elements(
            vec![
                Element::repeat(),
                Element::retroposon(100),
                Element::repeat(),
                Element::centromere(),
                bs(),
                Element::ordinary(0),
            ],
            MutationRates::zero(),
        );
        assert_eq!(c.valid_targets(), vec![0, 4, 5]);
        assert_eq!(c.nr_valid_targets(), 3);
        assert_eq!(c.nth_valid_target(2), Some(5));
        assert_eq!(c.nth_valid_target(3), None);
    }

    #[test]
    fn repeats_next_to_retroposons_are_pinned() {
        let c = Chromosome::from_elements(
            vec![
                Element::repeat(),
                Element::retroposon(100),
                Element::repeat(),
                Element::repeat(),
            ],
            MutationRates::zero(),
        );
        assert!(c.pins_retroposon(0));
        assert!(c.pins_retroposon(2));
        assert!(!c.pins_retroposon(3));
    }

    #[test]
    fn segments_without_breaks_is_identity() {
        let mut pool = Pool::new();
        let c = Chromosome::from_elements(
            vec![Element::centromere(), Element::repeat(), Element::ordinary(0)],
            MutationRates::zero(),
        );
        let ptr = c.elements().as_ptr();
        let parts = c.segments(&mut pool);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].elements().as_ptr(), ptr);
        assert!(pool.is_empty());
    }

    #[test]
    fn segments_cut_after_each_break() {
        let mut pool = Pool::new();
        let original = vec![
            Element::ordinary(0),
            broken_repeat(),
            Element::centromere(),
            Element::ordinary(1),
            broken_repeat(),
            Element::ordinary(2),
        ];
        let c = with_breaks(original.clone());
        let rates = *c.rates();
        let parts = c.segments(&mut pool);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.iter().map(|p| p.size()).collect::<Vec<_>>(), vec![2, 3, 1]);
        assert!(parts[0].elements()[1].is_repeat());

        let joined: Vec<Element> = parts.iter().flat_map(|p| p.elements().iter().copied()).collect();
        assert_eq!(joined.len(), original.len());
        assert!(joined.iter().all(|e| !e.has_dsb()));
        for (a, b) in joined.iter().zip(original.iter()) {
            let mut b = *b;
            b.repair_dsb();
            assert_eq!(*a, b);
        }
        assert!(parts.iter().all(|p| *p.rates() == rates));
        // the emptied parent is recycled
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn trailing_break_leaves_empty_tail() {
        let mut pool = Pool::new();
        let c = with_breaks(vec![Element::centromere(), broken_repeat()]);
        let parts = c.segments(&mut pool);
        assert_eq!(parts.len(), 2);
        assert!(parts[1].is_empty());
    }

    #[test]
    fn append_moves_everything() {
        let mut a = Chromosome::from_elements(vec![Element::centromere()], MutationRates::zero());
        let mut b = Chromosome::from_elements(
            vec![Element::repeat(), Element::retroposon(101), Element::repeat()],
            MutationRates::default(),
        );
        a.append(&mut b);
        assert!(b.is_empty());
        assert_eq!(b.size(), 0);
        assert_eq!((a.size(), a.nr_retroposons(), a.nr_repeats()), a.recount());
        assert_eq!(*a.rates(), MutationRates::zero());
    }

    #[test]
    fn tags() {
        let c = Chromosome::from_elements(
            vec![
                Element::ordinary(3),
                Element::module(4, 0),
                Element::module(5, 1),
                Element::ordinary(3),
                Element::transcription_factor(6, ShortSeq(1)),
            ],
            MutationRates::zero(),
        );
        assert_eq!(c.essential_tags(), vec![3, 3]);
        assert_eq!(c.module_tags(1), vec![5]);
        assert!(c.module_tags(2).is_empty());
    }

    #[test]
    fn deep_clone_is_independent() {
        let c = Chromosome::new(
            vec![Element::centromere(), Element::ordinary(1)],
            MutationRates::default(),
        )
        .unwrap();
        let mut d = c.clone();
        d.remove_range(1..2);
        assert_eq!(c.size(), 2);
        assert_eq!(d.size(), 1);
        assert!(d.one_centromere());
    }

    #[test]
    fn xml_lists_elements_and_rates() {
        let space = ShortSeqSpace::default();
        let c = Chromosome::from_elements(
            vec![Element::centromere(), Element::ordinary(2)],
            MutationRates::zero(),
        );
        assert_eq!(
            c.to_xml(&space),
            "<chromosome len=\"2\">\n<centromere/>\n<dstream id=\"2\"/>\n<rates>\n\
             <copy gene=\"0\" retro=\"0\"/>\n<remove gene=\"0\" retro=\"0\" repeat=\"0\"/>\n\
             <break dsb=\"0\"/>\n</rates>\n</chromosome>\n"
        );
    }
}
