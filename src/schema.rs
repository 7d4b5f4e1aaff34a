//! Domain-Modell eines geladenen Schema-Sets.
//!
//! [`SchemaSet`] ist das Ergebnis von [`load`](crate::load): pro Quelldokument
//! ein [`SchemaDocument`] mit den Komponenten in Dokumentreihenfolge, dazu
//! globale Registries (Key = [`QualifiedName::to_key`]) für Elemente, Typen,
//! Attribute, Groups und Attributgruppen.
//!
//! Registry-Einträge und Dokumentlisten teilen sich dieselben `Arc`s, d.h.
//! `Arc::ptr_eq` zwischen Registry-Eintrag und Dokument-Eintrag ist `true`.
//! Nach dem Laden ist ein Set unveränderlich und kann zwischen Threads
//! geteilt werden.

pub mod content;
pub mod decls;
pub mod types;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub use content::{
    Compositor, CompositorKind, ElementParticle, Occurs, Particle, ProcessContents, Term,
    Wildcard, ANY_NAMESPACE,
};
pub use decls::{
    AttributeDecl, AttributeGroupDecl, AttributeTarget, AttributeUse, AttributeUseKind,
    CompositorDecl, ElementDecl,
};
pub use types::{
    ComplexType, DerivationMethod, Facet, FacetKind, SimpleType, SimpleTypeContent,
    TypeDefinition, TypeRef,
};

use crate::loader::attribute_groups::{expand_attribute_group, AttributeGroupSources};
use crate::qname::{QualifiedName, XML_NAMESPACE};
use crate::{FastHashSet, FastIndexMap, Result};

/// Registry globaler Komponenten, Key = `namespace|local`.
pub type Registry<T> = FastIndexMap<String, Arc<T>>;

// ============================================================================
// Source Location
// ============================================================================

/// 1-basierte Position des `<` eines Start-Tags in einem Quelldokument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// Dokument-URI bzw. Pfad. `None` wenn aus einem String ohne Namen geparst.
    pub document_uri: Option<String>,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(document_uri: Option<String>, line: u32, column: u32) -> Self {
        Self {
            document_uri,
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uri = self.document_uri.as_deref().unwrap_or("<unknown>");
        write!(f, "{uri}:{}:{}", self.line, self.column)
    }
}

/// Komponenten mit optionaler Quellposition.
pub trait HasSource {
    fn source(&self) -> Option<&SourceLocation>;
}

macro_rules! impl_has_source {
    ($($ty:ty),* $(,)?) => {
        $(impl HasSource for $ty {
            fn source(&self) -> Option<&SourceLocation> {
                self.source.as_ref()
            }
        })*
    };
}

impl_has_source!(
    ElementDecl,
    AttributeDecl,
    ComplexType,
    SimpleType,
    CompositorDecl,
    AttributeGroupDecl,
    Particle,
);

impl HasSource for TypeDefinition {
    fn source(&self) -> Option<&SourceLocation> {
        TypeDefinition::source(self)
    }
}

impl<T: HasSource + ?Sized> HasSource for Arc<T> {
    fn source(&self) -> Option<&SourceLocation> {
        (**self).source()
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Schweregrad einer Diagnose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Nicht-fatales Problem beim Parsen oder Laden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            location,
        }
    }

    pub fn error(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " ({loc})")?;
        }
        Ok(())
    }
}

// ============================================================================
// Schema Document
// ============================================================================

/// `xs:import` eines Dokuments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaImport {
    pub namespace: Option<String>,
    pub schema_location: Option<String>,
}

/// Ein Quelldokument mit seinen Komponenten in Dokumentreihenfolge.
///
/// Die Listen enthalten alle Top-Level-Komponenten des Dokuments, auch
/// wenn ein späteres Dokument denselben Namen in der Registry überschreibt.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaDocument {
    pub document_uri: Option<String>,
    pub target_namespace: Option<String>,
    pub version: Option<String>,
    /// Prefix → Namespace-URI (Default-Namespace unter `""`).
    pub namespaces: FastIndexMap<String, String>,
    /// schemaLocation von include/redefine.
    pub includes: Vec<String>,
    pub imports: Vec<SchemaImport>,
    pub elements: Vec<Arc<ElementDecl>>,
    pub complex_types: Vec<Arc<ComplexType>>,
    pub simple_types: Vec<Arc<SimpleType>>,
    pub attributes: Vec<Arc<AttributeDecl>>,
    pub groups: Vec<Arc<CompositorDecl>>,
    pub attribute_groups: Vec<Arc<AttributeGroupDecl>>,
}

// ============================================================================
// Resolution
// ============================================================================

/// Ergebnis einer Namensauflösung in einer Registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a, T> {
    Found(&'a Arc<T>),
    Unresolved(QualifiedName),
}

impl<'a, T> Resolution<'a, T> {
    pub fn found(&self) -> Option<&'a Arc<T>> {
        match self {
            Self::Found(t) => Some(t),
            Self::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Ergebnis der Auflösung eines Typ-QNames.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeResolution<'a> {
    Complex(&'a Arc<ComplexType>),
    Simple(&'a Arc<SimpleType>),
    /// Name im XML Schema Namespace ohne eigene Definition.
    BuiltIn(QualifiedName),
    Unresolved(QualifiedName),
}

impl TypeResolution<'_> {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved(_))
    }
}

/// Art einer Referenz für [`SchemaSet::unresolved_references`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Element,
    Type,
    Attribute,
    Group,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Element => "element",
            Self::Type => "type",
            Self::Attribute => "attribute",
            Self::Group => "group",
        })
    }
}

/// Eine Referenz ohne Ziel im Set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub kind: ReferenceKind,
    pub name: QualifiedName,
}

// ============================================================================
// Schema Set
// ============================================================================

/// Geladenes, unveränderliches Schema-Set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaSet {
    pub(crate) documents: Vec<SchemaDocument>,
    pub(crate) elements: Registry<ElementDecl>,
    pub(crate) complex_types: Registry<ComplexType>,
    pub(crate) simple_types: Registry<SimpleType>,
    pub(crate) attributes: Registry<AttributeDecl>,
    pub(crate) groups: Registry<CompositorDecl>,
    pub(crate) attribute_groups: Registry<AttributeGroupDecl>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl SchemaSet {
    /// Liest XSD-Dateien (inkl. include/import/redefine) und lädt sie.
    pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<SchemaSet> {
        let parsed = crate::xsd::read_schema_files(paths)?;
        Ok(crate::loader::load(&parsed))
    }

    pub fn documents(&self) -> &[SchemaDocument] {
        &self.documents
    }

    pub fn elements(&self) -> &Registry<ElementDecl> {
        &self.elements
    }

    pub fn complex_types(&self) -> &Registry<ComplexType> {
        &self.complex_types
    }

    pub fn simple_types(&self) -> &Registry<SimpleType> {
        &self.simple_types
    }

    pub fn attributes(&self) -> &Registry<AttributeDecl> {
        &self.attributes
    }

    pub fn groups(&self) -> &Registry<CompositorDecl> {
        &self.groups
    }

    pub fn attribute_groups(&self) -> &Registry<AttributeGroupDecl> {
        &self.attribute_groups
    }

    /// Diagnosen aus Front-End und Loader, in Entstehungsreihenfolge.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn element(&self, name: &QualifiedName) -> Option<&Arc<ElementDecl>> {
        self.elements.get(&name.to_key())
    }

    pub fn complex_type(&self, name: &QualifiedName) -> Option<&Arc<ComplexType>> {
        self.complex_types.get(&name.to_key())
    }

    pub fn simple_type(&self, name: &QualifiedName) -> Option<&Arc<SimpleType>> {
        self.simple_types.get(&name.to_key())
    }

    pub fn attribute(&self, name: &QualifiedName) -> Option<&Arc<AttributeDecl>> {
        self.attributes.get(&name.to_key())
    }

    pub fn group(&self, name: &QualifiedName) -> Option<&Arc<CompositorDecl>> {
        self.groups.get(&name.to_key())
    }

    pub fn attribute_group(&self, name: &QualifiedName) -> Option<&Arc<AttributeGroupDecl>> {
        self.attribute_groups.get(&name.to_key())
    }

    /// Löst einen Typ-QName auf: Complex vor Simple, danach Built-in.
    pub fn resolve_type(&self, name: &QualifiedName) -> TypeResolution<'_> {
        let key = name.to_key();
        if let Some(ct) = self.complex_types.get(&key) {
            TypeResolution::Complex(ct)
        } else if let Some(st) = self.simple_types.get(&key) {
            TypeResolution::Simple(st)
        } else if name.is_xsd_builtin() {
            TypeResolution::BuiltIn(name.clone())
        } else {
            TypeResolution::Unresolved(name.clone())
        }
    }

    pub fn resolve_element(&self, name: &QualifiedName) -> Resolution<'_, ElementDecl> {
        match self.element(name) {
            Some(decl) => Resolution::Found(decl),
            None => Resolution::Unresolved(name.clone()),
        }
    }

    pub fn resolve_group(&self, name: &QualifiedName) -> Resolution<'_, CompositorDecl> {
        match self.group(name) {
            Some(decl) => Resolution::Found(decl),
            None => Resolution::Unresolved(name.clone()),
        }
    }

    /// Flache Attribute Uses einer Attributgruppe aus der Registry.
    ///
    /// Unbekannte Namen liefern eine leere Liste.
    pub fn expand_attribute_group(&self, name: &QualifiedName) -> Vec<AttributeUse> {
        let sources = AttributeGroupSources::default();
        let mut visited = FastHashSet::default();
        expand_attribute_group(name, &mut visited, &sources, Some(&self.attribute_groups))
    }

    /// Alle Referenzen (Elemente, Typen, Attribute, Groups) ohne Ziel im Set.
    ///
    /// Dedupliziert, in Dokumentreihenfolge der ersten Fundstelle.
    /// Built-in Typen und Attribute im `xml:` Namespace gelten als aufgelöst.
    pub fn unresolved_references(&self) -> Vec<UnresolvedReference> {
        let mut collector = ReferenceCollector {
            set: self,
            seen: FastHashSet::default(),
            found: Vec::new(),
        };
        for doc in &self.documents {
            for decl in &doc.elements {
                collector.element(decl);
            }
            for ct in &doc.complex_types {
                collector.complex_type(ct);
            }
            for st in &doc.simple_types {
                collector.simple_type(st);
            }
            for attr in &doc.attributes {
                collector.attribute_decl(attr);
            }
            for group in &doc.groups {
                for particle in &group.compositor.particles {
                    collector.particle(particle);
                }
            }
            for ag in &doc.attribute_groups {
                for attr_use in &ag.attributes {
                    collector.attribute_use(attr_use);
                }
            }
        }
        collector.found
    }
}

struct ReferenceCollector<'s> {
    set: &'s SchemaSet,
    seen: FastHashSet<(ReferenceKind, String)>,
    found: Vec<UnresolvedReference>,
}

impl ReferenceCollector<'_> {
    fn check(&mut self, kind: ReferenceKind, name: &QualifiedName) {
        let key = name.to_key();
        let resolved = match kind {
            ReferenceKind::Element => self.set.elements.contains_key(&key),
            ReferenceKind::Type => self.set.resolve_type(name).is_resolved(),
            ReferenceKind::Attribute => {
                name.namespace() == XML_NAMESPACE || self.set.attributes.contains_key(&key)
            }
            ReferenceKind::Group => self.set.groups.contains_key(&key),
        };
        if !resolved && self.seen.insert((kind, key)) {
            self.found.push(UnresolvedReference {
                kind,
                name: name.clone(),
            });
        }
    }

    fn element(&mut self, decl: &ElementDecl) {
        if let Some(type_ref) = &decl.type_ref {
            self.type_ref(type_ref);
        }
        if let Some(head) = &decl.substitution_group {
            self.check(ReferenceKind::Element, head);
        }
    }

    fn type_ref(&mut self, type_ref: &TypeRef<TypeDefinition>) {
        match type_ref {
            TypeRef::Named(name) => self.check(ReferenceKind::Type, name),
            TypeRef::Anonymous(def) => match def.as_ref() {
                TypeDefinition::Simple(st) => self.simple_type(st),
                TypeDefinition::Complex(ct) => self.complex_type(ct),
            },
        }
    }

    fn complex_type(&mut self, ct: &ComplexType) {
        if let Some(base) = &ct.base_type {
            self.check(ReferenceKind::Type, base);
        }
        if let Some(content) = &ct.content {
            self.particle(content);
        }
        for attr_use in &ct.attributes {
            self.attribute_use(attr_use);
        }
    }

    fn simple_type(&mut self, st: &SimpleType) {
        match &st.content {
            SimpleTypeContent::BuiltIn => {}
            SimpleTypeContent::Restriction { base_type, .. } => {
                if let Some(base) = base_type {
                    self.check(ReferenceKind::Type, base);
                }
            }
            SimpleTypeContent::List {
                item_type,
                anonymous_item_type,
            } => {
                if let Some(item) = item_type {
                    self.check(ReferenceKind::Type, item);
                }
                if let Some(item) = anonymous_item_type {
                    self.simple_type(item);
                }
            }
            SimpleTypeContent::Union {
                member_types,
                anonymous_members,
            } => {
                for member in member_types {
                    self.check(ReferenceKind::Type, member);
                }
                for member in anonymous_members {
                    self.simple_type(member);
                }
            }
        }
    }

    fn particle(&mut self, particle: &Particle) {
        particle.for_each_term(|term| match term {
            Term::Element(ElementParticle::Reference { name, .. }) => {
                self.check(ReferenceKind::Element, name)
            }
            Term::Element(ElementParticle::Local {
                type_ref: Some(type_ref),
                ..
            }) => self.type_ref(type_ref),
            Term::GroupRef(name) => self.check(ReferenceKind::Group, name),
            Term::Element(_) | Term::Wildcard(_) | Term::Compositor(_) => {}
        });
    }

    fn attribute_use(&mut self, attr_use: &AttributeUse) {
        match &attr_use.target {
            AttributeTarget::Reference(name) => self.check(ReferenceKind::Attribute, name),
            AttributeTarget::Local(decl) => self.attribute_decl(decl),
        }
    }

    fn attribute_decl(&mut self, decl: &AttributeDecl) {
        match &decl.type_ref {
            Some(TypeRef::Named(name)) => self.check(ReferenceKind::Type, name),
            Some(TypeRef::Anonymous(st)) => self.simple_type(st),
            None => {}
        }
    }
}
