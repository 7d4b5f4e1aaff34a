//! Eingabegraph des Loaders: ein geparstes XSD-Dokument.
//!
//! Diese Strukturen bilden die XSD-Syntax nahezu 1:1 ab und werden vom
//! Front-End in [`crate::xsd`] erzeugt. Der Loader ([`crate::loader`])
//! liest sie nur und baut daraus das Domain-Modell in [`crate::schema`].
//!
//! Lexikalische Werte, die der Loader validiert (minOccurs/maxOccurs,
//! Facet-Namen), bleiben hier Strings.

use crate::qname::QualifiedName;
use crate::schema::{AttributeUseKind, DerivationMethod, Diagnostic, ProcessContents, SourceLocation};

/// Ein geparstes Schema-Dokument.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedSchema {
    pub document_uri: Option<String>,
    pub target_namespace: Option<String>,
    pub version: Option<String>,
    /// In-scope Namespace-Deklarationen des `xs:schema` Elements (Prefix `""` = Default).
    pub namespaces: Vec<(String, String)>,
    pub references: Vec<ParsedReference>,
    /// Top-Level-Komponenten in Dokumentreihenfolge.
    pub items: Vec<ParsedItem>,
    /// Probleme, die das Front-End gefunden hat.
    pub diagnostics: Vec<Diagnostic>,
}

/// include/import/redefine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedReference {
    Include { location: Option<String> },
    Import { namespace: Option<String>, location: Option<String> },
    Redefine { location: Option<String> },
}

impl ParsedReference {
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Include { location } | Self::Import { location, .. } | Self::Redefine { location } => {
                location.as_deref()
            }
        }
    }
}

/// Top-Level-Komponente.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedItem {
    SimpleType(ParsedSimpleType),
    ComplexType(ParsedComplexType),
    Attribute(ParsedAttribute),
    Element(ParsedElement),
    Group(ParsedGroup),
    AttributeGroup(ParsedAttributeGroup),
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedTypeDef {
    Simple(ParsedSimpleType),
    Complex(ParsedComplexType),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedSimpleType {
    pub name: Option<QualifiedName>,
    pub documentation: Vec<String>,
    pub source: Option<SourceLocation>,
    pub content: ParsedSimpleContent,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParsedSimpleContent {
    /// Weder restriction noch list noch union.
    #[default]
    Empty,
    Restriction {
        base: Option<QualifiedName>,
        facets: Vec<ParsedFacet>,
    },
    List {
        item_type: Option<QualifiedName>,
        inline_item_type: Option<Box<ParsedSimpleType>>,
    },
    Union {
        member_types: Vec<QualifiedName>,
        inline_members: Vec<ParsedSimpleType>,
    },
}

/// Facet wie notiert; `kind` ist der XSD-Elementname (z.B. `maxLength`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedFacet {
    pub kind: String,
    pub value: Option<String>,
    pub fixed: bool,
    pub source: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedComplexType {
    pub name: Option<QualifiedName>,
    pub documentation: Vec<String>,
    pub source: Option<SourceLocation>,
    pub is_abstract: bool,
    pub mixed: bool,
    pub content: ParsedComplexContent,
}

/// Inhalt eines Complex Types: direkt oder über simpleContent/complexContent.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedComplexContent {
    Direct {
        particle: Option<ParsedParticle>,
        attributes: ParsedAttributeList,
    },
    SimpleContent(ParsedDerivation),
    ComplexContent(ParsedDerivation),
}

impl Default for ParsedComplexContent {
    fn default() -> Self {
        Self::Direct {
            particle: None,
            attributes: ParsedAttributeList::default(),
        }
    }
}

/// extension/restriction innerhalb von simpleContent/complexContent.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDerivation {
    pub method: DerivationMethod,
    pub base: Option<QualifiedName>,
    /// Nur bei complexContent belegt.
    pub particle: Option<ParsedParticle>,
    pub attributes: ParsedAttributeList,
}

// ============================================================================
// Attributes
// ============================================================================

/// Attribute, Attributgruppen-Referenzen und anyAttribute eines Owners.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedAttributeList {
    pub items: Vec<ParsedAttributeItem>,
    pub any_attribute: Option<ParsedWildcard>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedAttributeItem {
    Attribute(ParsedAttribute),
    /// `xs:attributeGroup ref="..."`
    GroupRef(QualifiedName),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedAttribute {
    pub name: Option<QualifiedName>,
    pub ref_name: Option<QualifiedName>,
    pub type_name: Option<QualifiedName>,
    pub inline_type: Option<ParsedSimpleType>,
    pub use_kind: AttributeUseKind,
    pub default_value: Option<String>,
    pub fixed_value: Option<String>,
    pub documentation: Vec<String>,
    pub source: Option<SourceLocation>,
}

impl ParsedAttribute {
    /// Lokale Deklaration mit Namen und optionalem Typ.
    pub fn named(name: QualifiedName, type_name: Option<QualifiedName>) -> Self {
        Self {
            name: Some(name),
            type_name,
            ..Self::default()
        }
    }

    /// Referenz auf ein globales Attribut.
    pub fn reference(name: QualifiedName) -> Self {
        Self {
            ref_name: Some(name),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAttributeGroup {
    pub name: QualifiedName,
    pub attributes: ParsedAttributeList,
    pub documentation: Vec<String>,
    pub source: Option<SourceLocation>,
}

// ============================================================================
// Elements, Groups, Particles
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedElement {
    pub name: Option<QualifiedName>,
    pub ref_name: Option<QualifiedName>,
    pub type_name: Option<QualifiedName>,
    pub inline_type: Option<Box<ParsedTypeDef>>,
    pub is_abstract: bool,
    pub nillable: bool,
    pub default_value: Option<String>,
    pub fixed_value: Option<String>,
    pub substitution_group: Option<QualifiedName>,
    pub documentation: Vec<String>,
    pub source: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGroup {
    pub name: QualifiedName,
    /// Die Model Group (sequence/choice/all) der Group.
    pub particle: Option<ParsedParticle>,
    pub documentation: Vec<String>,
    pub source: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedWildcard {
    /// `namespace`-Attribut wie notiert.
    pub namespace: Option<String>,
    pub process_contents: Option<ProcessContents>,
    pub source: Option<SourceLocation>,
}

/// Particle mit lexikalischen Occurrence-Werten.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedParticle {
    pub min_occurs: Option<String>,
    pub max_occurs: Option<String>,
    pub term: ParsedTerm,
    pub source: Option<SourceLocation>,
}

impl ParsedParticle {
    /// Particle ohne minOccurs/maxOccurs.
    pub fn new(term: ParsedTerm) -> Self {
        Self {
            min_occurs: None,
            max_occurs: None,
            term,
            source: None,
        }
    }

    pub fn with_occurs(mut self, min: Option<&str>, max: Option<&str>) -> Self {
        self.min_occurs = min.map(str::to_string);
        self.max_occurs = max.map(str::to_string);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedTerm {
    Element(ParsedElement),
    Any(ParsedWildcard),
    GroupRef(QualifiedName),
    Sequence(Vec<ParsedParticle>),
    Choice(Vec<ParsedParticle>),
    All(Vec<ParsedParticle>),
}
