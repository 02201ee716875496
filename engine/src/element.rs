use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{GenomeError, Result};
use crate::shortseq::{ShortSeq, ShortSeqSpace};

/// The kinds of atoms a chromosome is made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementKind {
    /// Regulatory site upstream of a gene.
    BindingSite { site: ShortSeq },
    /// Gene product binding to sites similar to `factor`.
    TranscriptionFactor { tag: u32, factor: ShortSeq },
    OrdinaryDownstream { tag: u32 },
    ModuleDownstream { tag: u32, module: u32 },
    /// Transposable element, always between two repeats.
    Retroposon { tag: u32 },
    /// Long terminal repeat; carries the double-strand-break flag.
    Repeat { dsb: bool },
    Centromere,
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::BindingSite { .. } => "binding site",
            ElementKind::TranscriptionFactor { .. } => "transcription factor",
            ElementKind::OrdinaryDownstream { .. } => "ordinary downstream",
            ElementKind::ModuleDownstream { .. } => "module downstream",
            ElementKind::Retroposon { .. } => "retroposon",
            ElementKind::Repeat { .. } => "repeat",
            ElementKind::Centromere => "centromere",
        }
    }
}

/// A chromosome element together with its per-round activity flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    #[serde(default = "active_default")]
    pub active: bool,
}

fn active_default() -> bool {
    true
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Self { kind, active: true }
    }

    pub fn binding_site(site: ShortSeq) -> Self {
        Self::new(ElementKind::BindingSite { site })
    }

    pub fn transcription_factor(tag: u32, factor: ShortSeq) -> Self {
        Self::new(ElementKind::TranscriptionFactor { tag, factor })
    }

    pub fn ordinary(tag: u32) -> Self {
        Self::new(ElementKind::OrdinaryDownstream { tag })
    }

    pub fn module(tag: u32, module: u32) -> Self {
        Self::new(ElementKind::ModuleDownstream { tag, module })
    }

    pub fn retroposon(tag: u32) -> Self {
        Self::new(ElementKind::Retroposon { tag })
    }

    pub fn repeat() -> Self {
        Self::new(ElementKind::Repeat { dsb: false })
    }

    pub fn centromere() -> Self {
        Self::new(ElementKind::Centromere)
    }

    /// Overwrite the state of `self` with that of `other`. The activity flag
    /// is left alone. Both elements must be of the same kind.
    pub fn copy_from(&mut self, other: &Element) -> Result<()> {
        if std::mem::discriminant(&self.kind) != std::mem::discriminant(&other.kind) {
            return Err(GenomeError::KindMismatch {
                from: other.kind.name(),
                into: self.kind.name(),
            });
        }
        self.kind = other.kind;
        Ok(())
    }

    /// Apply the kind's point mutation rule. Only sequence-carrying kinds
    /// change internally; structural kinds mutate at chromosome level.
    pub fn point_mutate(&mut self, space: &ShortSeqSpace, rng: &mut dyn RngCore) -> u32 {
        match &mut self.kind {
            ElementKind::BindingSite { site } => {
                let (next, n) = space.mutate(*site, rng);
                *site = next;
                n
            }
            ElementKind::TranscriptionFactor { factor, .. } => {
                let (next, n) = space.mutate(*factor, rng);
                *factor = next;
                n
            }
            _ => 0,
        }
    }

    /// Does this transcription factor bind the given binding site?
    /// Any other pairing of kinds never binds.
    pub fn binds(&self, site: &Element, space: &ShortSeqSpace) -> bool {
        match (&self.kind, &site.kind) {
            (
                ElementKind::TranscriptionFactor { factor, .. },
                ElementKind::BindingSite { site },
            ) => space.similar(*factor, *site),
            _ => false,
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn inactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Ordinary or module downstream, or transcription factor.
    pub fn is_true_downstream(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::OrdinaryDownstream { .. }
                | ElementKind::ModuleDownstream { .. }
                | ElementKind::TranscriptionFactor { .. }
        )
    }

    pub fn is_binding_site(&self) -> bool {
        matches!(self.kind, ElementKind::BindingSite { .. })
    }

    pub fn is_repeat(&self) -> bool {
        matches!(self.kind, ElementKind::Repeat { .. })
    }

    pub fn is_retroposon(&self) -> bool {
        matches!(self.kind, ElementKind::Retroposon { .. })
    }

    pub fn is_centromere(&self) -> bool {
        matches!(self.kind, ElementKind::Centromere)
    }

    pub fn has_dsb(&self) -> bool {
        matches!(self.kind, ElementKind::Repeat { dsb: true })
    }

    /// Set the break flag. No effect on anything but repeats.
    pub fn induce_dsb(&mut self) {
        if let ElementKind::Repeat { dsb } = &mut self.kind {
            *dsb = true;
        }
    }

    pub fn repair_dsb(&mut self) {
        if let ElementKind::Repeat { dsb } = &mut self.kind {
            *dsb = false;
        }
    }

    pub fn to_xml(&self, space: &ShortSeqSpace) -> String {
        match self.kind {
            ElementKind::BindingSite { site } => {
                format!("<bsite seq=\"{}\"/>", space.render(site))
            }
            ElementKind::TranscriptionFactor { tag, factor } => {
                format!("<transfac id=\"{tag}\">{}</transfac>", space.render(factor))
            }
            ElementKind::OrdinaryDownstream { tag } => format!("<dstream id=\"{tag}\"/>"),
            ElementKind::ModuleDownstream { tag, module } => {
                format!("<dstream id=\"{tag}\" module=\"{module}\"/>")
            }
            ElementKind::Retroposon { tag } => format!("<tposon id=\"{tag}\"/>"),
            ElementKind::Repeat { dsb } => {
                format!("<repeat dsb=\"{}\"/>", if dsb { "yes" } else { "no" })
            }
            ElementKind::Centromere => "<centromere/>".to_string(),
        }
    }
}
