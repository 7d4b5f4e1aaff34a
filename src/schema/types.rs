//! Type Definitions (Simple/Complex) und Facets.

use super::content::{Particle, Wildcard};
use super::decls::AttributeUse;
use super::SourceLocation;
use crate::qname::QualifiedName;

/// Typangabe: entweder per QName oder als eingebetteter anonymer Typ.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef<T> {
    Named(QualifiedName),
    Anonymous(Box<T>),
}

impl<T> TypeRef<T> {
    /// QName des referenzierten Typs (None bei anonymem Typ).
    pub fn name(&self) -> Option<&QualifiedName> {
        match self {
            Self::Named(name) => Some(name),
            Self::Anonymous(_) => None,
        }
    }

    /// Der eingebettete anonyme Typ.
    pub fn anonymous(&self) -> Option<&T> {
        match self {
            Self::Named(_) => None,
            Self::Anonymous(t) => Some(t),
        }
    }
}

// ============================================================================
// Derivation
// ============================================================================

/// Art der Typableitung.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivationMethod {
    Extension,
    Restriction,
}

impl DerivationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extension => "extension",
            Self::Restriction => "restriction",
        }
    }
}

// ============================================================================
// Facets
// ============================================================================

/// Die 12 Constraining Facets (XSD 1.0 Part 2 §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetKind {
    Length,
    MinLength,
    MaxLength,
    Pattern,
    Enumeration,
    WhiteSpace,
    MaxInclusive,
    MaxExclusive,
    MinInclusive,
    MinExclusive,
    TotalDigits,
    FractionDigits,
}

impl FacetKind {
    pub const ALL: [FacetKind; 12] = [
        Self::Length,
        Self::MinLength,
        Self::MaxLength,
        Self::Pattern,
        Self::Enumeration,
        Self::WhiteSpace,
        Self::MaxInclusive,
        Self::MaxExclusive,
        Self::MinInclusive,
        Self::MinExclusive,
        Self::TotalDigits,
        Self::FractionDigits,
    ];

    /// Facet-Kind zu einem XSD-Elementnamen (z.B. `maxLength`).
    pub fn from_element_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.element_name() == name)
    }

    /// XSD-Elementname dieses Facets.
    pub fn element_name(&self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::MinLength => "minLength",
            Self::MaxLength => "maxLength",
            Self::Pattern => "pattern",
            Self::Enumeration => "enumeration",
            Self::WhiteSpace => "whiteSpace",
            Self::MaxInclusive => "maxInclusive",
            Self::MaxExclusive => "maxExclusive",
            Self::MinInclusive => "minInclusive",
            Self::MinExclusive => "minExclusive",
            Self::TotalDigits => "totalDigits",
            Self::FractionDigits => "fractionDigits",
        }
    }

    /// Nur length/minLength/maxLength/whiteSpace tragen ein `fixed`-Flag.
    pub fn supports_fixed(&self) -> bool {
        matches!(
            self,
            Self::Length | Self::MinLength | Self::MaxLength | Self::WhiteSpace
        )
    }
}

/// Ein Facet mit lexikalischem Wert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Facet {
    Length { value: String, fixed: bool },
    MinLength { value: String, fixed: bool },
    MaxLength { value: String, fixed: bool },
    Pattern { value: String },
    Enumeration { value: String },
    WhiteSpace { value: String, fixed: bool },
    MaxInclusive { value: String },
    MaxExclusive { value: String },
    MinInclusive { value: String },
    MinExclusive { value: String },
    TotalDigits { value: String },
    FractionDigits { value: String },
}

impl Facet {
    /// Erstellt ein Facet. `fixed` wird für Kinds ohne fixed-Flag ignoriert.
    pub fn new(kind: FacetKind, value: impl Into<String>, fixed: bool) -> Self {
        let value = value.into();
        match kind {
            FacetKind::Length => Self::Length { value, fixed },
            FacetKind::MinLength => Self::MinLength { value, fixed },
            FacetKind::MaxLength => Self::MaxLength { value, fixed },
            FacetKind::Pattern => Self::Pattern { value },
            FacetKind::Enumeration => Self::Enumeration { value },
            FacetKind::WhiteSpace => Self::WhiteSpace { value, fixed },
            FacetKind::MaxInclusive => Self::MaxInclusive { value },
            FacetKind::MaxExclusive => Self::MaxExclusive { value },
            FacetKind::MinInclusive => Self::MinInclusive { value },
            FacetKind::MinExclusive => Self::MinExclusive { value },
            FacetKind::TotalDigits => Self::TotalDigits { value },
            FacetKind::FractionDigits => Self::FractionDigits { value },
        }
    }

    pub fn kind(&self) -> FacetKind {
        match self {
            Self::Length { .. } => FacetKind::Length,
            Self::MinLength { .. } => FacetKind::MinLength,
            Self::MaxLength { .. } => FacetKind::MaxLength,
            Self::Pattern { .. } => FacetKind::Pattern,
            Self::Enumeration { .. } => FacetKind::Enumeration,
            Self::WhiteSpace { .. } => FacetKind::WhiteSpace,
            Self::MaxInclusive { .. } => FacetKind::MaxInclusive,
            Self::MaxExclusive { .. } => FacetKind::MaxExclusive,
            Self::MinInclusive { .. } => FacetKind::MinInclusive,
            Self::MinExclusive { .. } => FacetKind::MinExclusive,
            Self::TotalDigits { .. } => FacetKind::TotalDigits,
            Self::FractionDigits { .. } => FacetKind::FractionDigits,
        }
    }

    /// Lexikalischer Wert wie im Schema notiert.
    pub fn value(&self) -> &str {
        match self {
            Self::Length { value, .. }
            | Self::MinLength { value, .. }
            | Self::MaxLength { value, .. }
            | Self::WhiteSpace { value, .. }
            | Self::Pattern { value }
            | Self::Enumeration { value }
            | Self::MaxInclusive { value }
            | Self::MaxExclusive { value }
            | Self::MinInclusive { value }
            | Self::MinExclusive { value }
            | Self::TotalDigits { value }
            | Self::FractionDigits { value } => value,
        }
    }

    pub fn is_fixed(&self) -> bool {
        match self {
            Self::Length { fixed, .. }
            | Self::MinLength { fixed, .. }
            | Self::MaxLength { fixed, .. }
            | Self::WhiteSpace { fixed, .. } => *fixed,
            _ => false,
        }
    }
}

// ============================================================================
// Simple Types
// ============================================================================

/// Variety eines Simple Types.
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleTypeContent {
    /// Kein restriction/list/union Inhalt.
    BuiltIn,
    Restriction {
        base_type: Option<QualifiedName>,
        facets: Vec<Facet>,
    },
    List {
        item_type: Option<QualifiedName>,
        anonymous_item_type: Option<Box<SimpleType>>,
    },
    Union {
        member_types: Vec<QualifiedName>,
        anonymous_members: Vec<SimpleType>,
    },
}

/// Simple Type Definition.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleType {
    /// `None` für anonyme Typen.
    pub name: Option<QualifiedName>,
    pub documentation: Option<String>,
    pub source: Option<SourceLocation>,
    pub content: SimpleTypeContent,
}

impl SimpleType {
    pub fn is_global(&self) -> bool {
        self.name.is_some()
    }

    /// Facets einer Restriction (leer für andere Varieties).
    pub fn facets(&self) -> &[Facet] {
        match &self.content {
            SimpleTypeContent::Restriction { facets, .. } => facets,
            _ => &[],
        }
    }
}

// ============================================================================
// Complex Types
// ============================================================================

/// Complex Type Definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexType {
    /// `None` für anonyme Typen.
    pub name: Option<QualifiedName>,
    pub documentation: Option<String>,
    pub source: Option<SourceLocation>,
    pub is_abstract: bool,
    pub mixed: bool,
    /// Base-Typ bei simpleContent/complexContent Ableitung.
    pub base_type: Option<QualifiedName>,
    /// `None` = keine Ableitung.
    pub derivation: Option<DerivationMethod>,
    /// `None` = leerer Content.
    pub content: Option<Particle>,
    /// Attribute Uses, Attributgruppen bereits expandiert.
    pub attributes: Vec<AttributeUse>,
    pub any_attribute: Option<Wildcard>,
}

impl ComplexType {
    pub fn is_global(&self) -> bool {
        self.name.is_some()
    }
}

// ============================================================================
// Type Definition
// ============================================================================

/// Simple oder Complex Type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    Simple(SimpleType),
    Complex(ComplexType),
}

impl TypeDefinition {
    /// QName des Typs (None für anonyme Typen).
    pub fn name(&self) -> Option<&QualifiedName> {
        match self {
            Self::Simple(t) => t.name.as_ref(),
            Self::Complex(t) => t.name.as_ref(),
        }
    }

    pub fn is_global(&self) -> bool {
        self.name().is_some()
    }

    pub fn documentation(&self) -> Option<&str> {
        match self {
            Self::Simple(t) => t.documentation.as_deref(),
            Self::Complex(t) => t.documentation.as_deref(),
        }
    }

    pub fn source(&self) -> Option<&SourceLocation> {
        match self {
            Self::Simple(t) => t.source.as_ref(),
            Self::Complex(t) => t.source.as_ref(),
        }
    }

    pub fn is_simple(&self) -> bool {
        matches!(self, Self::Simple(_))
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Self::Complex(_))
    }
}
