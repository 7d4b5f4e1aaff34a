//! Schema-Set-Builder: baut aus geparsten Dokumenten das Domain-Modell.
//!
//! Ablauf:
//!
//! 1. Pro Eingabedokument ein [`SchemaDocument`] anlegen (URI, Namespaces,
//!    include/import), Front-End-Diagnosen übernehmen.
//! 2. Benannte Groups vollständig mappen und registrieren, Attributgruppen
//!    als Skelett (Name + anyAttribute) registrieren.
//! 3. Quell-Map Name → geparste Attributgruppe aufbauen. Bei doppelten
//!    Namen gewinnt die letzte Deklaration.
//! 4. Pro Dokument: Simple/Complex Types und globale Attribute, danach die
//!    Attribute der Attributgruppen (flach expandiert), danach globale Elemente.
//!
//! Die Quell-Map hängt nur von den Eingaben ab und wird vor Schritt 2
//! gebaut. Damit sehen auch anonyme Typen in Groups fertig expandierte
//! Attributgruppen, unabhängig von der Dokumentreihenfolge.
//!
//! Laden schlägt nie fehl: ungültige Werte und doppelte Namen werden als
//! [`Diagnostic`] im Ergebnis gesammelt.

pub mod attribute_groups;
mod content;
mod types;

use std::sync::Arc;

use log::debug;

use crate::parsed::{ParsedItem, ParsedReference, ParsedSchema};
use crate::qname::QualifiedName;
use crate::schema::{
    AttributeGroupDecl, Diagnostic, Registry, SchemaDocument, SchemaImport, SchemaSet,
    SourceLocation,
};
use crate::FastIndexMap;
use attribute_groups::AttributeGroupSources;

/// Optionen für [`load_with_options`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Warnung für jede globale Deklaration, die einen gleichnamigen
    /// Registry-Eintrag ersetzt. Default: `true`.
    pub report_duplicates: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            report_duplicates: true,
        }
    }
}

/// Lädt geparste Dokumente mit Default-Optionen.
pub fn load(inputs: &[ParsedSchema]) -> SchemaSet {
    load_with_options(inputs, &LoadOptions::default())
}

/// Lädt geparste Dokumente in ein [`SchemaSet`].
pub fn load_with_options(inputs: &[ParsedSchema], options: &LoadOptions) -> SchemaSet {
    let sources = AttributeGroupSources::build(inputs);
    let mut mapper = Mapper::new(&sources, None);
    let mut builder = SchemaSetBuilder::new(options);

    for input in inputs {
        builder.create_document(input);
    }
    for (index, input) in inputs.iter().enumerate() {
        builder.register_groups(index, input, &mut mapper);
    }
    for (index, input) in inputs.iter().enumerate() {
        builder.populate(index, input, &mut mapper);
    }

    builder.diagnostics.extend(mapper.into_diagnostics());
    let set = builder.build();
    debug!(
        "[schemaflow] loaded {} documents: {} elements, {} complex types, {} simple types, \
         {} attributes, {} groups, {} attribute groups, {} diagnostics",
        set.documents.len(),
        set.elements.len(),
        set.complex_types.len(),
        set.simple_types.len(),
        set.attributes.len(),
        set.groups.len(),
        set.attribute_groups.len(),
        set.diagnostics.len(),
    );
    set
}

// ============================================================================
// Mapper
// ============================================================================

/// Gemeinsamer Zustand der Mapping-Funktionen.
///
/// Die eigentlichen Mappings liegen in `content`, `types` und
/// `attribute_groups`, jeweils als `impl Mapper`.
pub(crate) struct Mapper<'a> {
    sources: &'a AttributeGroupSources<'a>,
    /// Fertige Attributgruppen für Namen, die nicht in `sources` stehen.
    fallback: Option<&'a Registry<AttributeGroupDecl>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Mapper<'a> {
    pub(crate) fn new(
        sources: &'a AttributeGroupSources<'a>,
        fallback: Option<&'a Registry<AttributeGroupDecl>>,
    ) -> Self {
        Self {
            sources,
            fallback,
            diagnostics: Vec::new(),
        }
    }

    fn warn(&mut self, message: String, location: Option<&SourceLocation>) {
        debug!("[schemaflow] {message}");
        self.diagnostics
            .push(Diagnostic::warning(message, location.cloned()));
    }

    pub(crate) fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Dokumentation: getrimmte, nicht-leere Teile mit Leerzeile verbunden.
pub(crate) fn documentation(parts: &[String]) -> Option<String> {
    let joined = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    (!joined.is_empty()).then_some(joined)
}

// ============================================================================
// Builder
// ============================================================================

struct DocumentDraft {
    document: SchemaDocument,
    /// Attributgruppen bleiben bis zum Ende veränderbar und werden erst in
    /// [`SchemaSetBuilder::build`] in `Arc`s verpackt.
    attribute_groups: Vec<AttributeGroupDecl>,
}

struct SchemaSetBuilder<'o> {
    options: &'o LoadOptions,
    drafts: Vec<DocumentDraft>,
    elements: Registry<crate::schema::ElementDecl>,
    complex_types: Registry<crate::schema::ComplexType>,
    simple_types: Registry<crate::schema::SimpleType>,
    attributes: Registry<crate::schema::AttributeDecl>,
    groups: Registry<crate::schema::CompositorDecl>,
    /// Key → (Dokumentindex, Index in `DocumentDraft::attribute_groups`).
    attribute_groups: FastIndexMap<String, (usize, usize)>,
    diagnostics: Vec<Diagnostic>,
}

/// Trägt `value` unter dem Key von `name` ein; ein vorhandener Eintrag wird ersetzt.
fn register<V>(
    registry: &mut FastIndexMap<String, V>,
    kind: &str,
    name: &QualifiedName,
    value: V,
    source: Option<&SourceLocation>,
    report: bool,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if registry.insert(name.to_key(), value).is_some() && report {
        diagnostics.push(Diagnostic::warning(
            format!("duplicate global {kind} {name}: later declaration replaces the earlier one"),
            source.cloned(),
        ));
    }
}

impl<'o> SchemaSetBuilder<'o> {
    fn new(options: &'o LoadOptions) -> Self {
        Self {
            options,
            drafts: Vec::new(),
            elements: Registry::default(),
            complex_types: Registry::default(),
            simple_types: Registry::default(),
            attributes: Registry::default(),
            groups: Registry::default(),
            attribute_groups: FastIndexMap::default(),
            diagnostics: Vec::new(),
        }
    }

    fn create_document(&mut self, input: &ParsedSchema) {
        let mut document = SchemaDocument {
            document_uri: input.document_uri.clone(),
            target_namespace: input.target_namespace.clone(),
            version: input.version.clone(),
            ..SchemaDocument::default()
        };
        for (prefix, uri) in &input.namespaces {
            document.namespaces.insert(prefix.clone(), uri.clone());
        }
        for reference in &input.references {
            match reference {
                ParsedReference::Include { location } | ParsedReference::Redefine { location } => {
                    if let Some(location) = location {
                        document.includes.push(location.clone());
                    }
                }
                ParsedReference::Import {
                    namespace,
                    location,
                } => document.imports.push(SchemaImport {
                    namespace: namespace.clone(),
                    schema_location: location.clone(),
                }),
            }
        }
        self.diagnostics.extend(input.diagnostics.iter().cloned());
        self.drafts.push(DocumentDraft {
            document,
            attribute_groups: Vec::new(),
        });
    }

    fn register_groups(&mut self, index: usize, input: &ParsedSchema, mapper: &mut Mapper<'_>) {
        let report = self.options.report_duplicates;
        for item in &input.items {
            match item {
                ParsedItem::Group(group) => {
                    let decl = Arc::new(mapper.map_group(group));
                    register(
                        &mut self.groups,
                        "group",
                        &group.name,
                        Arc::clone(&decl),
                        group.source.as_ref(),
                        report,
                        &mut self.diagnostics,
                    );
                    self.drafts[index].document.groups.push(decl);
                }
                ParsedItem::AttributeGroup(group) => {
                    let draft = &mut self.drafts[index];
                    let position = (index, draft.attribute_groups.len());
                    draft.attribute_groups.push(AttributeGroupDecl {
                        name: group.name.clone(),
                        attributes: Vec::new(),
                        any_attribute: group
                            .attributes
                            .any_attribute
                            .as_ref()
                            .map(content::map_wildcard),
                        documentation: documentation(&group.documentation),
                        source: group.source.clone(),
                    });
                    register(
                        &mut self.attribute_groups,
                        "attribute group",
                        &group.name,
                        position,
                        group.source.as_ref(),
                        report,
                        &mut self.diagnostics,
                    );
                }
                _ => {}
            }
        }
    }

    fn populate<'a>(&mut self, index: usize, input: &'a ParsedSchema, mapper: &mut Mapper<'a>) {
        let report = self.options.report_duplicates;

        for item in &input.items {
            match item {
                ParsedItem::SimpleType(parsed) => {
                    let st = Arc::new(mapper.map_simple_type(parsed));
                    if let Some(name) = &st.name {
                        register(
                            &mut self.simple_types,
                            "simple type",
                            name,
                            Arc::clone(&st),
                            st.source.as_ref(),
                            report,
                            &mut self.diagnostics,
                        );
                    }
                    self.drafts[index].document.simple_types.push(st);
                }
                ParsedItem::ComplexType(parsed) => {
                    let ct = Arc::new(mapper.map_complex_type(parsed));
                    if let Some(name) = &ct.name {
                        register(
                            &mut self.complex_types,
                            "complex type",
                            name,
                            Arc::clone(&ct),
                            ct.source.as_ref(),
                            report,
                            &mut self.diagnostics,
                        );
                    }
                    self.drafts[index].document.complex_types.push(ct);
                }
                ParsedItem::Attribute(parsed) => {
                    let Some(name) = &parsed.name else {
                        continue;
                    };
                    let attr = Arc::new(mapper.map_attribute_decl(parsed, name.clone()));
                    register(
                        &mut self.attributes,
                        "attribute",
                        name,
                        Arc::clone(&attr),
                        attr.source.as_ref(),
                        report,
                        &mut self.diagnostics,
                    );
                    self.drafts[index].document.attributes.push(attr);
                }
                _ => {}
            }
        }

        // Skelette aus Schritt 2 befüllen, gleiche Reihenfolge wie dort.
        let groups = input.items.iter().filter_map(|item| match item {
            ParsedItem::AttributeGroup(group) => Some(group),
            _ => None,
        });
        for (slot, group) in groups.enumerate() {
            let attributes = mapper.expand_group_body(group);
            if let Some(decl) = self.drafts[index].attribute_groups.get_mut(slot) {
                decl.attributes = attributes;
            }
        }

        for item in &input.items {
            let ParsedItem::Element(parsed) = item else {
                continue;
            };
            let Some(name) = &parsed.name else {
                continue;
            };
            let decl = Arc::new(mapper.map_element_decl(parsed, name.clone()));
            register(
                &mut self.elements,
                "element",
                name,
                Arc::clone(&decl),
                decl.source.as_ref(),
                report,
                &mut self.diagnostics,
            );
            self.drafts[index].document.elements.push(decl);
        }
    }

    fn build(self) -> SchemaSet {
        let mut documents = Vec::with_capacity(self.drafts.len());
        for draft in self.drafts {
            let mut document = draft.document;
            document.attribute_groups = draft.attribute_groups.into_iter().map(Arc::new).collect();
            documents.push(document);
        }

        let attribute_groups: Registry<AttributeGroupDecl> = self
            .attribute_groups
            .into_iter()
            .filter_map(|(key, (doc, slot))| {
                let decl = documents.get(doc)?.attribute_groups.get(slot)?;
                Some((key, Arc::clone(decl)))
            })
            .collect();

        SchemaSet {
            documents,
            elements: self.elements,
            complex_types: self.complex_types,
            simple_types: self.simple_types,
            attributes: self.attributes,
            groups: self.groups,
            attribute_groups,
            diagnostics: self.diagnostics,
        }
    }
}
