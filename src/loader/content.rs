//! Content-Model-Mapping: Particles, Compositors, Wildcards, Occurs.

use super::{documentation, Mapper};
use crate::parsed::{ParsedElement, ParsedGroup, ParsedParticle, ParsedTerm, ParsedWildcard};
use crate::schema::{
    Compositor, CompositorDecl, CompositorKind, ElementParticle, Occurs, Particle,
    SourceLocation, Term, TypeRef, Wildcard, ANY_NAMESPACE,
};

/// Wildcard mit Defaults `##any` / strict.
pub(super) fn map_wildcard(parsed: &ParsedWildcard) -> Wildcard {
    Wildcard {
        namespace_constraint: parsed
            .namespace
            .as_deref()
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .unwrap_or(ANY_NAMESPACE)
            .to_string(),
        process_contents: parsed.process_contents.unwrap_or_default(),
    }
}

impl Mapper<'_> {
    /// minOccurs/maxOccurs aus den lexikalischen Werten.
    ///
    /// Fehlende Werte ergeben 1. `unbounded` (beliebige Groß-/Kleinschreibung)
    /// ergibt `max = None`. Ungültige Werte ergeben eine Warnung und 1.
    pub(crate) fn map_occurs(
        &mut self,
        min: Option<&str>,
        max: Option<&str>,
        source: Option<&SourceLocation>,
    ) -> Occurs {
        let min = match min.map(str::trim) {
            None => 1,
            Some(lexical) => lexical.parse::<u32>().unwrap_or_else(|_| {
                self.warn(format!("invalid minOccurs '{lexical}', using 1"), source);
                1
            }),
        };
        let max = match max.map(str::trim) {
            None => Some(1),
            Some(lexical) if lexical.eq_ignore_ascii_case("unbounded") => None,
            Some(lexical) => Some(lexical.parse::<u32>().unwrap_or_else(|_| {
                self.warn(format!("invalid maxOccurs '{lexical}', using 1"), source);
                1
            })),
        };
        Occurs { min, max }
    }

    pub(crate) fn map_particle(&mut self, parsed: &ParsedParticle) -> Particle {
        let occurs = self.map_occurs(
            parsed.min_occurs.as_deref(),
            parsed.max_occurs.as_deref(),
            parsed.source.as_ref(),
        );
        let term = match &parsed.term {
            ParsedTerm::Element(element) => Term::Element(self.map_element_particle(element)),
            ParsedTerm::Any(wildcard) => Term::Wildcard(map_wildcard(wildcard)),
            ParsedTerm::GroupRef(name) => Term::GroupRef(name.clone()),
            ParsedTerm::Sequence(children) => {
                Term::Compositor(self.map_compositor(CompositorKind::Sequence, children))
            }
            ParsedTerm::Choice(children) => {
                Term::Compositor(self.map_compositor(CompositorKind::Choice, children))
            }
            ParsedTerm::All(children) => {
                Term::Compositor(self.map_compositor(CompositorKind::All, children))
            }
        };
        Particle {
            term,
            occurs,
            source: parsed.source.clone(),
        }
    }

    fn map_compositor(&mut self, kind: CompositorKind, children: &[ParsedParticle]) -> Compositor {
        let particles = children.iter().map(|child| self.map_particle(child)).collect();
        Compositor::new(kind, particles)
    }

    /// Benannte Group. Ohne sequence/choice/all ergibt sich eine leere Sequence.
    pub(crate) fn map_group(&mut self, group: &ParsedGroup) -> CompositorDecl {
        let compositor = match group.particle.as_ref().map(|p| &p.term) {
            Some(ParsedTerm::Sequence(children)) => {
                self.map_compositor(CompositorKind::Sequence, children)
            }
            Some(ParsedTerm::Choice(children)) => {
                self.map_compositor(CompositorKind::Choice, children)
            }
            Some(ParsedTerm::All(children)) => self.map_compositor(CompositorKind::All, children),
            _ => Compositor::empty_sequence(),
        };
        CompositorDecl {
            name: group.name.clone(),
            compositor,
            documentation: documentation(&group.documentation),
            source: group.source.clone(),
        }
    }

    fn map_element_particle(&mut self, element: &ParsedElement) -> ElementParticle {
        if let Some(name) = &element.ref_name {
            return ElementParticle::Reference {
                name: name.clone(),
                nillable: element.nillable,
                is_abstract: element.is_abstract,
            };
        }
        let type_ref = if let Some(type_name) = &element.type_name {
            Some(TypeRef::Named(type_name.clone()))
        } else {
            element
                .inline_type
                .as_deref()
                .map(|inline| TypeRef::Anonymous(Box::new(self.map_type_definition(inline))))
        };
        ElementParticle::Local {
            name: element
                .name
                .as_ref()
                .map(|n| n.local_name.clone())
                .unwrap_or_default(),
            type_ref,
            nillable: element.nillable,
            is_abstract: element.is_abstract,
            default_value: element.default_value.clone(),
            fixed_value: element.fixed_value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::attribute_groups::AttributeGroupSources;
    use crate::qname::QualifiedName;
    use crate::schema::ProcessContents;

    fn occurs(min: Option<&str>, max: Option<&str>) -> (Occurs, usize) {
        let sources = AttributeGroupSources::default();
        let mut mapper = Mapper::new(&sources, None);
        let o = mapper.map_occurs(min, max, None);
        (o, mapper.into_diagnostics().len())
    }

    fn local(name: &str) -> ParsedParticle {
        ParsedParticle::new(ParsedTerm::Element(ParsedElement {
            name: Some(QualifiedName::local(name)),
            type_name: Some(QualifiedName::in_namespace(crate::qname::XS_NAMESPACE, "string")),
            ..ParsedElement::default()
        }))
    }

    #[test]
    fn absent_occurs_is_exactly_one() {
        assert_eq!(occurs(None, None), (Occurs::EXACTLY_ONE, 0));
    }

    #[test]
    fn unbounded_any_case() {
        for lexical in ["unbounded", "UNBOUNDED", "Unbounded", " unbounded "] {
            let (o, warnings) = occurs(Some("0"), Some(lexical));
            assert_eq!(o, Occurs::ZERO_OR_MORE, "{lexical}");
            assert_eq!(warnings, 0);
        }
    }

    #[test]
    fn explicit_bounds() {
        assert_eq!(occurs(Some("2"), Some("5")).0, Occurs::new(2, Some(5)));
        assert_eq!(occurs(Some("0"), None).0, Occurs::OPTIONAL);
    }

    #[test]
    fn invalid_occurs_defaults_with_warning() {
        assert_eq!(occurs(Some("-1"), Some("many")), (Occurs::EXACTLY_ONE, 2));
        assert_eq!(occurs(Some("x"), Some("3")), (Occurs::new(1, Some(3)), 1));
    }

    #[test]
    fn wildcard_defaults_and_values() {
        let w = map_wildcard(&ParsedWildcard::default());
        assert_eq!(w, Wildcard::default());

        let w = map_wildcard(&ParsedWildcard {
            namespace: Some("##other".into()),
            process_contents: Some(ProcessContents::Lax),
            source: None,
        });
        assert_eq!(w.namespace_constraint, "##other");
        assert_eq!(w.process_contents, ProcessContents::Lax);
    }

    #[test]
    fn nested_compositors_preserve_order_and_kind() {
        let sources = AttributeGroupSources::default();
        let mut mapper = Mapper::new(&sources, None);
        let choice = ParsedParticle::new(ParsedTerm::Choice(vec![local("b"), local("c")]))
            .with_occurs(Some("0"), Some("unbounded"));
        let root = ParsedParticle::new(ParsedTerm::Sequence(vec![
            local("a"),
            choice,
            ParsedParticle::new(ParsedTerm::Any(ParsedWildcard::default())),
            ParsedParticle::new(ParsedTerm::GroupRef(QualifiedName::local("g"))),
        ]));
        let particle = mapper.map_particle(&root);

        let Term::Compositor(seq) = &particle.term else {
            panic!("expected sequence");
        };
        assert_eq!(seq.kind, CompositorKind::Sequence);
        assert_eq!(seq.particles.len(), 4);
        let Term::Compositor(choice) = &seq.particles[1].term else {
            panic!("expected choice");
        };
        assert_eq!(choice.kind, CompositorKind::Choice);
        assert_eq!(seq.particles[1].occurs, Occurs::ZERO_OR_MORE);
        assert_eq!(choice.particles.len(), 2);
        assert!(matches!(seq.particles[2].term, Term::Wildcard(_)));
        assert!(matches!(&seq.particles[3].term, Term::GroupRef(n) if n.local_name == "g"));
    }

    #[test]
    fn group_without_model_group_is_empty_sequence() {
        let sources = AttributeGroupSources::default();
        let mut mapper = Mapper::new(&sources, None);
        let decl = mapper.map_group(&ParsedGroup {
            name: QualifiedName::local("g"),
            particle: None,
            documentation: Vec::new(),
            source: None,
        });
        assert_eq!(decl.compositor, Compositor::empty_sequence());
    }

    #[test]
    fn element_reference_keeps_flags() {
        let sources = AttributeGroupSources::default();
        let mut mapper = Mapper::new(&sources, None);
        let particle = mapper.map_particle(&ParsedParticle::new(ParsedTerm::Element(ParsedElement {
            ref_name: Some(QualifiedName::in_namespace("urn:a", "head")),
            nillable: true,
            ..ParsedElement::default()
        })));
        assert_eq!(
            particle.term,
            Term::Element(ElementParticle::Reference {
                name: QualifiedName::in_namespace("urn:a", "head"),
                nillable: true,
                is_abstract: false,
            })
        );
    }
}
