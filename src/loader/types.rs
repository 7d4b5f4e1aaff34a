//! Type-Mapping: Simple/Complex Types, Facets, Attribute und globale Elemente.

use super::content::map_wildcard;
use super::{documentation, Mapper};
use crate::parsed::{
    ParsedAttribute, ParsedAttributeItem, ParsedAttributeList, ParsedComplexContent,
    ParsedComplexType, ParsedElement, ParsedFacet, ParsedParticle, ParsedSimpleContent,
    ParsedSimpleType, ParsedTerm, ParsedTypeDef,
};
use crate::qname::QualifiedName;
use crate::schema::{
    AttributeDecl, AttributeTarget, AttributeUse, ComplexType, ElementDecl, Facet, FacetKind,
    SimpleType, SimpleTypeContent, TypeDefinition, TypeRef, Wildcard,
};
use crate::FastHashSet;

/// Leere Model Group (`<xs:sequence/>` o.ä.) zählt als leerer Content.
fn is_empty_model_group(particle: &ParsedParticle) -> bool {
    match &particle.term {
        ParsedTerm::Sequence(children) | ParsedTerm::Choice(children) | ParsedTerm::All(children) => {
            children.is_empty()
        }
        _ => false,
    }
}

impl Mapper<'_> {
    pub(crate) fn map_type_definition(&mut self, parsed: &ParsedTypeDef) -> TypeDefinition {
        match parsed {
            ParsedTypeDef::Simple(st) => TypeDefinition::Simple(self.map_simple_type(st)),
            ParsedTypeDef::Complex(ct) => TypeDefinition::Complex(self.map_complex_type(ct)),
        }
    }

    pub(crate) fn map_simple_type(&mut self, parsed: &ParsedSimpleType) -> SimpleType {
        let content = match &parsed.content {
            ParsedSimpleContent::Empty => SimpleTypeContent::BuiltIn,
            ParsedSimpleContent::Restriction { base, facets } => SimpleTypeContent::Restriction {
                base_type: base.clone(),
                facets: facets.iter().map(|f| self.map_facet(f)).collect(),
            },
            ParsedSimpleContent::List {
                item_type,
                inline_item_type,
            } => SimpleTypeContent::List {
                item_type: item_type.clone(),
                anonymous_item_type: inline_item_type
                    .as_deref()
                    .map(|inline| Box::new(self.map_simple_type(inline))),
            },
            ParsedSimpleContent::Union {
                member_types,
                inline_members,
            } => SimpleTypeContent::Union {
                member_types: member_types.clone(),
                anonymous_members: inline_members
                    .iter()
                    .map(|inline| self.map_simple_type(inline))
                    .collect(),
            },
        };
        SimpleType {
            name: parsed.name.clone(),
            documentation: documentation(&parsed.documentation),
            source: parsed.source.clone(),
            content,
        }
    }

    /// Facet aus dem XSD-Elementnamen. Unbekannte Namen werden mit Warnung
    /// als Pattern übernommen.
    pub(crate) fn map_facet(&mut self, parsed: &ParsedFacet) -> Facet {
        let value = parsed.value.clone().unwrap_or_default();
        match FacetKind::from_element_name(parsed.kind.trim()) {
            Some(kind) => Facet::new(kind, value, parsed.fixed),
            None => {
                self.warn(
                    format!("unknown facet '{}', mapped as pattern", parsed.kind),
                    parsed.source.as_ref(),
                );
                Facet::Pattern { value }
            }
        }
    }

    pub(crate) fn map_complex_type(&mut self, parsed: &ParsedComplexType) -> ComplexType {
        let mut ct = ComplexType {
            name: parsed.name.clone(),
            documentation: documentation(&parsed.documentation),
            source: parsed.source.clone(),
            is_abstract: parsed.is_abstract,
            mixed: parsed.mixed,
            base_type: None,
            derivation: None,
            content: None,
            attributes: Vec::new(),
            any_attribute: None,
        };
        let (particle, attributes) = match &parsed.content {
            ParsedComplexContent::Direct {
                particle,
                attributes,
            } => (particle.as_ref(), attributes),
            ParsedComplexContent::SimpleContent(derivation) => {
                ct.base_type = derivation.base.clone();
                ct.derivation = Some(derivation.method);
                (None, &derivation.attributes)
            }
            ParsedComplexContent::ComplexContent(derivation) => {
                ct.base_type = derivation.base.clone();
                ct.derivation = Some(derivation.method);
                (derivation.particle.as_ref(), &derivation.attributes)
            }
        };
        ct.content = particle
            .filter(|p| !is_empty_model_group(p))
            .map(|p| self.map_particle(p));
        let (uses, any_attribute) = self.map_attribute_list(attributes);
        ct.attributes = uses;
        ct.any_attribute = any_attribute;
        ct
    }

    /// Attribute eines Complex Types in Dokumentreihenfolge.
    ///
    /// Attributgruppen-Referenzen werden an ihrer Position flach eingefügt.
    /// Ein Visited-Set pro Owner, jede Gruppe trägt höchstens einmal bei.
    pub(crate) fn map_attribute_list(
        &mut self,
        list: &ParsedAttributeList,
    ) -> (Vec<AttributeUse>, Option<Wildcard>) {
        let mut visited = FastHashSet::default();
        let mut uses = Vec::with_capacity(list.items.len());
        for item in &list.items {
            match item {
                ParsedAttributeItem::Attribute(attr) => uses.push(self.map_attribute_use(attr)),
                ParsedAttributeItem::GroupRef(name) => {
                    self.expand_into(name, &mut visited, &mut uses)
                }
            }
        }
        (uses, list.any_attribute.as_ref().map(map_wildcard))
    }

    pub(crate) fn map_attribute_use(&mut self, parsed: &ParsedAttribute) -> AttributeUse {
        let target = match &parsed.ref_name {
            Some(name) => AttributeTarget::Reference(name.clone()),
            None => {
                let name = parsed
                    .name
                    .clone()
                    .unwrap_or_else(|| QualifiedName::local(""));
                AttributeTarget::Local(self.map_attribute_decl(parsed, name))
            }
        };
        AttributeUse {
            use_kind: parsed.use_kind,
            target,
        }
    }

    pub(crate) fn map_attribute_decl(
        &mut self,
        parsed: &ParsedAttribute,
        name: QualifiedName,
    ) -> AttributeDecl {
        let type_ref = match (&parsed.type_name, &parsed.inline_type) {
            (Some(type_name), _) => Some(TypeRef::Named(type_name.clone())),
            (None, Some(inline)) => Some(TypeRef::Anonymous(Box::new(self.map_simple_type(inline)))),
            (None, None) => None,
        };
        AttributeDecl {
            name,
            default_value: parsed.default_value.clone(),
            fixed_value: parsed.fixed_value.clone(),
            documentation: documentation(&parsed.documentation),
            source: parsed.source.clone(),
            type_ref,
        }
    }

    pub(crate) fn map_element_decl(
        &mut self,
        parsed: &ParsedElement,
        name: QualifiedName,
    ) -> ElementDecl {
        let type_ref = match (&parsed.type_name, parsed.inline_type.as_deref()) {
            (Some(type_name), _) => Some(TypeRef::Named(type_name.clone())),
            (None, Some(inline)) => Some(TypeRef::Anonymous(Box::new(self.map_type_definition(inline)))),
            (None, None) => None,
        };
        ElementDecl {
            name,
            is_abstract: parsed.is_abstract,
            nillable: parsed.nillable,
            default_value: parsed.default_value.clone(),
            fixed_value: parsed.fixed_value.clone(),
            documentation: documentation(&parsed.documentation),
            source: parsed.source.clone(),
            type_ref,
            substitution_group: parsed.substitution_group.clone(),
        }
    }
}
