//! schemaflow – XML Schema (XSD) Domain-Modell mit Quelltext-Zugriff
//!
//! Ablauf: XSD-Text → [`xsd`] (Eingabegraph [`parsed::ParsedSchema`]) →
//! [`load`] ([`SchemaSet`] mit globalen Registries, flach expandierten
//! Attributgruppen und gemappten Content-Modellen). Zu jeder Komponente mit
//! Quellposition liefert [`SourceTextProvider`] den Original-XSD-Text.
//!
//! # Beispiel
//!
//! ```
//! use schemaflow::{load, QualifiedName, TypeResolution};
//! use schemaflow::xsd::parse_schema_document;
//!
//! let xsd = r#"
//!     <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
//!                xmlns:ex="urn:ex" targetNamespace="urn:ex">
//!         <xs:attributeGroup name="common">
//!             <xs:attribute name="id" type="xs:ID" use="required"/>
//!         </xs:attributeGroup>
//!         <xs:complexType name="Person">
//!             <xs:sequence>
//!                 <xs:element name="name" type="xs:string"/>
//!             </xs:sequence>
//!             <xs:attributeGroup ref="ex:common"/>
//!         </xs:complexType>
//!         <xs:element name="person" type="ex:Person"/>
//!     </xs:schema>
//! "#;
//!
//! let parsed = parse_schema_document(xsd, Some("person.xsd")).unwrap();
//! let set = load(&[parsed]);
//! assert!(!set.has_errors());
//!
//! let person = QualifiedName::in_namespace("urn:ex", "Person");
//! let TypeResolution::Complex(ct) = set.resolve_type(&person) else {
//!     panic!("Person must be a complex type");
//! };
//! assert_eq!(ct.attributes.len(), 1);
//! assert!(ct.attributes[0].is_required());
//! ```

pub mod error;
pub mod loader;
pub mod parsed;
pub mod qname;
pub mod schema;
pub mod source_text;
pub mod xsd;

pub use error::{Error, Result};

/// HashMap mit ahash (schneller, nicht DoS-resistent, für interne Datenstrukturen).
pub type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// HashSet mit ahash.
pub type FastHashSet<K> = hashbrown::HashSet<K, ahash::RandomState>;

/// IndexMap mit ahash (deterministische Iteration + schnelles Hashing).
pub type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Laden
pub use loader::{load, load_with_options, LoadOptions};

// Public API: Modell
pub use qname::QualifiedName;
pub use schema::{
    Diagnostic, HasSource, ReferenceKind, Resolution, SchemaDocument, SchemaSet, Severity,
    SourceLocation, TypeResolution, UnresolvedReference,
};

// Public API: Quelltext
pub use source_text::{CacheConfig, SourceTextProvider};
