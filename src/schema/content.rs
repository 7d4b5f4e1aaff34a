//! Content-Model: Particles, Terms, Compositors und Wildcards.
//!
//! Ein [`Particle`] platziert einen [`Term`] mit Occurrence-Constraints.
//! Die Term-Varianten sind durch die XSD-Grammatik fest vorgegeben
//! (Element, Wildcard, Group-Referenz, Compositor).

use std::fmt;

use super::types::{TypeDefinition, TypeRef};
use super::SourceLocation;
use crate::qname::QualifiedName;

// ============================================================================
// Occurs
// ============================================================================

/// minOccurs/maxOccurs eines Particles. `max = None` bedeutet unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occurs {
    pub min: u32,
    pub max: Option<u32>,
}

impl Occurs {
    /// `[1..1]`, der Default ohne explizite Attribute.
    pub const EXACTLY_ONE: Occurs = Occurs { min: 1, max: Some(1) };
    /// `[0..1]`
    pub const OPTIONAL: Occurs = Occurs { min: 0, max: Some(1) };
    /// `[0..∞]`
    pub const ZERO_OR_MORE: Occurs = Occurs { min: 0, max: None };
    /// `[1..∞]`
    pub const ONE_OR_MORE: Occurs = Occurs { min: 1, max: None };

    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.max.is_none()
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::EXACTLY_ONE
    }
}

/// Anzeige als `[min..max]`, unbounded als `∞`.
impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}..{max}]", self.min),
            None => write!(f, "[{}..∞]", self.min),
        }
    }
}

// ============================================================================
// Wildcard
// ============================================================================

/// Default-Namespace-Constraint eines Wildcards.
pub const ANY_NAMESPACE: &str = "##any";

/// processContents eines Wildcards (XSD 1.0 Part 1 §3.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProcessContents {
    #[default]
    Strict,
    Lax,
    Skip,
}

impl ProcessContents {
    /// Parsed den lexikalischen Wert (`strict`, `lax`, `skip`).
    pub fn from_lexical(value: &str) -> Option<Self> {
        match value.trim() {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

/// Element- oder Attribut-Wildcard (`xs:any`, `xs:anyAttribute`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wildcard {
    /// Namespace-Constraint wie im Schema notiert, z.B. `##any`, `##other`, `urn:a urn:b`.
    pub namespace_constraint: String,
    pub process_contents: ProcessContents,
}

impl Default for Wildcard {
    fn default() -> Self {
        Self {
            namespace_constraint: ANY_NAMESPACE.to_string(),
            process_contents: ProcessContents::Strict,
        }
    }
}

// ============================================================================
// Terms
// ============================================================================

/// Compositor-Art einer Model Group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositorKind {
    Sequence,
    Choice,
    All,
}

impl CompositorKind {
    /// XSD-Elementname (`sequence`, `choice`, `all`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequence => "sequence",
            Self::Choice => "choice",
            Self::All => "all",
        }
    }
}

/// Anonyme oder benannte Model Group: Compositor + geordnete Particles.
#[derive(Debug, Clone, PartialEq)]
pub struct Compositor {
    pub kind: CompositorKind,
    pub particles: Vec<Particle>,
}

impl Compositor {
    pub fn new(kind: CompositorKind, particles: Vec<Particle>) -> Self {
        Self { kind, particles }
    }

    /// Leere Sequence (Fallback für Groups ohne Model Group).
    pub fn empty_sequence() -> Self {
        Self::new(CompositorKind::Sequence, Vec::new())
    }
}

/// Element-Term innerhalb eines Content-Models.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementParticle {
    /// `ref="..."` auf ein globales Element.
    Reference {
        name: QualifiedName,
        nillable: bool,
        is_abstract: bool,
    },
    /// Lokale Element-Deklaration.
    Local {
        name: String,
        /// Typ per QName oder anonym; `None` wenn weder `type` noch Inline-Typ.
        type_ref: Option<TypeRef<TypeDefinition>>,
        nillable: bool,
        is_abstract: bool,
        default_value: Option<String>,
        fixed_value: Option<String>,
    },
}

impl ElementParticle {
    /// Anzeigename: QName der Referenz bzw. lokaler Name.
    pub fn display_name(&self) -> String {
        match self {
            Self::Reference { name, .. } => name.to_string(),
            Self::Local { name, .. } => name.clone(),
        }
    }
}

/// Geschlossene Menge der Term-Varianten.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Element(ElementParticle),
    Wildcard(Wildcard),
    /// Referenz auf eine benannte Group. Wird beim Mapping nicht inlined,
    /// Konsumenten lösen sie über `SchemaSet::group` auf.
    GroupRef(QualifiedName),
    Compositor(Compositor),
}

/// Term + Occurs (+ optionale Quellposition).
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub term: Term,
    pub occurs: Occurs,
    pub source: Option<SourceLocation>,
}

impl Particle {
    /// Particle mit `[1..1]`.
    pub fn once(term: Term) -> Self {
        Self {
            term,
            occurs: Occurs::EXACTLY_ONE,
            source: None,
        }
    }

    /// Besucht alle Terms dieses Particles in Dokumentreihenfolge (pre-order).
    ///
    /// Iterativ, damit tief verschachtelte Content-Models keinen Stack-Overflow
    /// auslösen. Anonyme Typen lokaler Elemente werden nicht betreten.
    pub fn for_each_term(&self, mut visit: impl FnMut(&Term)) {
        let mut stack: Vec<&Particle> = vec![self];
        while let Some(particle) = stack.pop() {
            visit(&particle.term);
            if let Term::Compositor(compositor) = &particle.term {
                stack.extend(compositor.particles.iter().rev());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occurs_default_is_exactly_one() {
        assert_eq!(Occurs::default(), Occurs { min: 1, max: Some(1) });
    }

    #[test]
    fn occurs_display() {
        assert_eq!(Occurs::EXACTLY_ONE.to_string(), "[1..1]");
        assert_eq!(Occurs::ZERO_OR_MORE.to_string(), "[0..∞]");
        assert_eq!(Occurs::new(2, Some(5)).to_string(), "[2..5]");
    }

    #[test]
    fn wildcard_defaults() {
        let w = Wildcard::default();
        assert_eq!(w.namespace_constraint, "##any");
        assert_eq!(w.process_contents, ProcessContents::Strict);
    }

    #[test]
    fn process_contents_lexical() {
        assert_eq!(ProcessContents::from_lexical("lax"), Some(ProcessContents::Lax));
        assert_eq!(ProcessContents::from_lexical("skip"), Some(ProcessContents::Skip));
        assert_eq!(ProcessContents::from_lexical("strict"), Some(ProcessContents::Strict));
        assert_eq!(ProcessContents::from_lexical("sloppy"), None);
    }

    #[test]
    fn for_each_term_is_preorder() {
        let leaf = |n: &str| {
            Particle::once(Term::Element(ElementParticle::Local {
                name: n.to_string(),
                type_ref: None,
                nillable: false,
                is_abstract: false,
                default_value: None,
                fixed_value: None,
            }))
        };
        let inner = Particle::once(Term::Compositor(Compositor::new(
            CompositorKind::Choice,
            vec![leaf("b"), leaf("c")],
        )));
        let root = Particle::once(Term::Compositor(Compositor::new(
            CompositorKind::Sequence,
            vec![leaf("a"), inner, leaf("d")],
        )));

        let mut names = Vec::new();
        root.for_each_term(|t| match t {
            Term::Element(e) => names.push(e.display_name()),
            Term::Compositor(c) => names.push(c.kind.as_str().to_string()),
            Term::Wildcard(_) | Term::GroupRef(_) => {}
        });
        assert_eq!(names, ["sequence", "a", "choice", "b", "c", "d"]);
    }
}
