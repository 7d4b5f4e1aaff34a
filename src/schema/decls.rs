//! Globale Deklarationen: Elemente, Attribute, Groups, Attributgruppen.

use super::content::{Compositor, Wildcard};
use super::types::{SimpleType, TypeDefinition, TypeRef};
use super::SourceLocation;
use crate::qname::QualifiedName;

/// Globale Element-Deklaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDecl {
    pub name: QualifiedName,
    pub is_abstract: bool,
    pub nillable: bool,
    pub default_value: Option<String>,
    pub fixed_value: Option<String>,
    pub documentation: Option<String>,
    pub source: Option<SourceLocation>,
    /// Typ per QName (globaler Typ) oder anonym.
    pub type_ref: Option<TypeRef<TypeDefinition>>,
    /// Head der Substitution Group, falls angegeben.
    pub substitution_group: Option<QualifiedName>,
}

/// Attribut-Deklaration (global oder lokal in einem Attribute Use).
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDecl {
    pub name: QualifiedName,
    pub default_value: Option<String>,
    pub fixed_value: Option<String>,
    pub documentation: Option<String>,
    pub source: Option<SourceLocation>,
    /// Nur Simple Types erlaubt (QName oder anonym).
    pub type_ref: Option<TypeRef<SimpleType>>,
}

/// `use`-Attribut eines Attribute Use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttributeUseKind {
    #[default]
    Optional,
    Required,
    Prohibited,
}

impl AttributeUseKind {
    /// Parsed den lexikalischen Wert (`optional`, `required`, `prohibited`).
    pub fn from_lexical(value: &str) -> Option<Self> {
        match value.trim() {
            "optional" => Some(Self::Optional),
            "required" => Some(Self::Required),
            "prohibited" => Some(Self::Prohibited),
            _ => None,
        }
    }
}

/// Ziel eines Attribute Use: Referenz auf globales Attribut oder lokale Deklaration.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeTarget {
    Reference(QualifiedName),
    Local(AttributeDecl),
}

/// Attribute Use innerhalb eines Complex Types oder einer Attributgruppe.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeUse {
    pub use_kind: AttributeUseKind,
    pub target: AttributeTarget,
}

impl AttributeUse {
    /// QName des Attributs (Referenzziel bzw. lokaler Name).
    pub fn name(&self) -> &QualifiedName {
        match &self.target {
            AttributeTarget::Reference(name) => name,
            AttributeTarget::Local(decl) => &decl.name,
        }
    }

    pub fn is_required(&self) -> bool {
        self.use_kind == AttributeUseKind::Required
    }
}

/// Benannte Model Group (`xs:group name="..."`).
#[derive(Debug, Clone, PartialEq)]
pub struct CompositorDecl {
    pub name: QualifiedName,
    pub compositor: Compositor,
    pub documentation: Option<String>,
    pub source: Option<SourceLocation>,
}

/// Benannte Attributgruppe mit flach expandierten Attribute Uses.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeGroupDecl {
    pub name: QualifiedName,
    pub attributes: Vec<AttributeUse>,
    pub any_attribute: Option<Wildcard>,
    pub documentation: Option<String>,
    pub source: Option<SourceLocation>,
}
