//! XSD Front-End: liest XSD-Text in den Eingabegraphen [`ParsedSchema`].
//!
//! Die Komponenten werden syntaktisch übernommen, nicht aufgelöst:
//! QName-Attributwerte (`type`, `ref`, `base`, ...) werden nur gegen die
//! in-scope Namespace-Deklarationen expandiert. Ob ein Name existiert,
//! prüft erst das geladene [`SchemaSet`](crate::SchemaSet).
//!
//! Jede Komponente trägt die Position des `<` ihres Start-Tags
//! (1-basiert), passend zur Fragment-Extraktion in [`crate::source_text`].
//!
//! Nicht unterstützte oder fehlerhafte Konstrukte werden übersprungen und
//! als Diagnose gemeldet. Fatal sind nur nicht-wohlgeformtes XML und ein
//! falsches Root-Element.

mod includes;

pub use includes::{parse_schema_file, read_schema_files};

use roxmltree::{Document, Node, ParsingOptions};

use crate::error::{Error, Result};
use crate::parsed::{
    ParsedAttribute, ParsedAttributeGroup, ParsedAttributeItem, ParsedAttributeList,
    ParsedComplexContent, ParsedComplexType, ParsedDerivation, ParsedElement, ParsedFacet,
    ParsedGroup, ParsedItem, ParsedParticle, ParsedReference, ParsedSchema, ParsedSimpleContent,
    ParsedSimpleType, ParsedTerm, ParsedTypeDef, ParsedWildcard,
};
use crate::qname::{QualifiedName, XML_NAMESPACE, XS_NAMESPACE};
use crate::schema::{
    AttributeUseKind, DerivationMethod, Diagnostic, ProcessContents, SourceLocation,
};

/// Maximale Größe eines XSD-Dokuments.
///
/// Ausreichend für praktisch alle realen XSD-Dateien.
pub(crate) const MAX_XSD_SIZE: usize = 16 * 1024 * 1024;

/// Parsed ein XSD-Dokument.
///
/// `document_uri` wird in alle Quellpositionen übernommen.
///
/// # Größenbeschränkung
///
/// XSD-Dokumente größer als 16 MiB werden abgelehnt.
///
/// # Beispiel
///
/// ```
/// use schemaflow::xsd::parse_schema_document;
///
/// let xsd = r#"
///     <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
///                targetNamespace="http://example.org">
///         <xs:element name="book" type="xs:string"/>
///     </xs:schema>
/// "#;
///
/// let parsed = parse_schema_document(xsd, Some("book.xsd")).unwrap();
/// assert_eq!(parsed.items.len(), 1);
/// ```
pub fn parse_schema_document(xsd_content: &str, document_uri: Option<&str>) -> Result<ParsedSchema> {
    if xsd_content.len() > MAX_XSD_SIZE {
        return Err(Error::XsdParseError(format!(
            "XSD document too large: {} bytes (max {} bytes)",
            xsd_content.len(),
            MAX_XSD_SIZE
        )));
    }

    let xml_opts = ParsingOptions { allow_dtd: true, ..Default::default() };
    let doc = Document::parse_with_options(xsd_content, xml_opts)
        .map_err(|e| Error::XsdParseError(format!("XML: {e}")))?;

    let root = doc.root_element();
    if root.tag_name().name() != "schema" || root.tag_name().namespace() != Some(XS_NAMESPACE) {
        return Err(Error::XsdParseError(
            "Root element must be xs:schema".to_string(),
        ));
    }

    let mut reader = SchemaReader::new(&doc, &root, document_uri);
    Ok(reader.read_schema(&root))
}

/// Element-Kinder im XSD-Namespace.
fn xs_children<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(|c| c.is_element() && c.tag_name().namespace() == Some(XS_NAMESPACE))
}

fn first_xs_child<'a, 'input>(node: Node<'a, 'input>, names: &[&str]) -> Option<Node<'a, 'input>> {
    xs_children(node).find(|c| names.contains(&c.tag_name().name()))
}

/// xs:boolean Attribut (`true`/`1`).
fn bool_attr(node: &Node, name: &str) -> bool {
    matches!(node.attribute(name).map(str::trim), Some("true" | "1"))
}

fn string_attr(node: &Node, name: &str) -> Option<String> {
    node.attribute(name).map(str::to_string)
}

/// Form-Default für lokale Elemente und Attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum FormDefault {
    #[default]
    Unqualified,
    Qualified,
}

impl FormDefault {
    fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("qualified") => Self::Qualified,
            _ => Self::Unqualified,
        }
    }
}

/// Zustand beim Lesen eines Dokuments.
struct SchemaReader<'d, 'input> {
    doc: &'d Document<'input>,
    document_uri: Option<String>,
    target_ns: String,
    element_form_default: FormDefault,
    attribute_form_default: FormDefault,
    diagnostics: Vec<Diagnostic>,
}

impl<'d, 'input> SchemaReader<'d, 'input> {
    fn new(doc: &'d Document<'input>, root: &Node, document_uri: Option<&str>) -> Self {
        Self {
            doc,
            document_uri: document_uri.map(str::to_string),
            target_ns: root.attribute("targetNamespace").unwrap_or("").to_string(),
            element_form_default: FormDefault::from_attr(root.attribute("elementFormDefault")),
            attribute_form_default: FormDefault::from_attr(root.attribute("attributeFormDefault")),
            diagnostics: Vec::new(),
        }
    }

    fn location(&self, node: &Node) -> SourceLocation {
        let pos = self.doc.text_pos_at(node.range().start);
        SourceLocation::new(self.document_uri.clone(), pos.row, pos.col)
    }

    fn warn(&mut self, node: &Node, message: String) {
        let location = self.location(node);
        self.diagnostics.push(Diagnostic::warning(message, Some(location)));
    }

    fn error(&mut self, node: &Node, message: String) {
        let location = self.location(node);
        self.diagnostics.push(Diagnostic::error(message, Some(location)));
    }

    /// Löst einen QName-String aus Attributwerten auf (type, ref, base).
    ///
    /// `node.namespaces()` enthält auch die Deklarationen der Ancestors.
    /// Der Prefix `xml` ist implizit gebunden. Unpräfixierte Namen liegen im
    /// Default-Namespace (bzw. in keinem Namespace, wenn keiner deklariert ist).
    /// Ein unbekannter Prefix ergibt eine Fehlerdiagnose und einen Namen ohne
    /// Namespace, der den Prefix für die Anzeige behält.
    fn resolve_qname(&mut self, qname_str: &str, node: &Node) -> QualifiedName {
        let qname_str = qname_str.trim();
        if let Some((prefix, local)) = qname_str.split_once(':') {
            if prefix == "xml" {
                return QualifiedName::in_namespace(XML_NAMESPACE, local).with_prefix(prefix);
            }
            match node.namespaces().find(|ns| ns.name() == Some(prefix)) {
                Some(ns) => QualifiedName::in_namespace(ns.uri(), local).with_prefix(prefix),
                None => {
                    self.error(node, format!("Unknown prefix '{prefix}' in '{qname_str}'"));
                    QualifiedName::local(local).with_prefix(prefix)
                }
            }
        } else {
            let default_ns = node
                .namespaces()
                .find(|ns| ns.name().is_none())
                .map(|ns| ns.uri())
                .unwrap_or("");
            QualifiedName::in_namespace(default_ns, qname_str)
        }
    }

    fn resolve_attr(&mut self, node: &Node, name: &str) -> Option<QualifiedName> {
        let value = node.attribute(name)?;
        Some(self.resolve_qname(value, node))
    }

    /// Ermittelt Namespace basierend auf form-Attribut und Default.
    fn namespace_for_form(&self, node: &Node, form_default: FormDefault) -> &str {
        match node.attribute("form") {
            Some("qualified") => &self.target_ns,
            Some("unqualified") => "",
            _ => match form_default {
                FormDefault::Qualified => &self.target_ns,
                FormDefault::Unqualified => "",
            },
        }
    }

    fn global_name(&mut self, node: &Node) -> Option<QualifiedName> {
        match node.attribute("name") {
            Some(name) => Some(QualifiedName::in_namespace(&self.target_ns, name)),
            None => {
                self.error(
                    node,
                    format!("Global xs:{} missing name", node.tag_name().name()),
                );
                None
            }
        }
    }

    /// `xs:annotation/xs:documentation` Texte, ungetrimmt.
    fn documentation(&self, node: &Node) -> Vec<String> {
        let mut parts = Vec::new();
        for annotation in xs_children(*node).filter(|c| c.tag_name().name() == "annotation") {
            for doc in xs_children(annotation).filter(|c| c.tag_name().name() == "documentation") {
                let text: String = doc
                    .descendants()
                    .filter(|n| n.is_text())
                    .filter_map(|n| n.text())
                    .collect();
                parts.push(text);
            }
        }
        parts
    }

    // ========================================================================
    // Schema
    // ========================================================================

    fn read_schema(&mut self, root: &Node) -> ParsedSchema {
        let namespaces = root
            .namespaces()
            .filter(|ns| ns.name() != Some("xml"))
            .map(|ns| (ns.name().unwrap_or("").to_string(), ns.uri().to_string()))
            .collect();

        let mut references = Vec::new();
        let mut items = Vec::new();
        for child in xs_children(*root) {
            match child.tag_name().name() {
                "include" => references.push(ParsedReference::Include {
                    location: string_attr(&child, "schemaLocation"),
                }),
                "import" => references.push(ParsedReference::Import {
                    namespace: string_attr(&child, "namespace"),
                    location: string_attr(&child, "schemaLocation"),
                }),
                "redefine" => {
                    references.push(ParsedReference::Redefine {
                        location: string_attr(&child, "schemaLocation"),
                    });
                    // Ersetzen die Originale: read_schema_files ordnet das
                    // redefinierte Schema vor diesem Dokument ein.
                    for nested in xs_children(child) {
                        if let Some(item) = self.read_top_level(&nested) {
                            items.push(item);
                        }
                    }
                }
                _ => {
                    if let Some(item) = self.read_top_level(&child) {
                        items.push(item);
                    }
                }
            }
        }

        ParsedSchema {
            document_uri: self.document_uri.clone(),
            target_namespace: (!self.target_ns.is_empty()).then(|| self.target_ns.clone()),
            version: string_attr(root, "version"),
            namespaces,
            references,
            items,
            diagnostics: std::mem::take(&mut self.diagnostics),
        }
    }

    fn read_top_level(&mut self, node: &Node) -> Option<ParsedItem> {
        let item = match node.tag_name().name() {
            "annotation" | "notation" => return None,
            "element" => {
                let name = self.global_name(node)?;
                ParsedItem::Element(self.read_element(node, Some(name)))
            }
            "simpleType" => {
                let name = self.global_name(node)?;
                ParsedItem::SimpleType(self.read_simple_type(node, Some(name)))
            }
            "complexType" => {
                let name = self.global_name(node)?;
                ParsedItem::ComplexType(self.read_complex_type(node, Some(name)))
            }
            "attribute" => {
                let name = self.global_name(node)?;
                ParsedItem::Attribute(self.read_attribute(node, Some(name)))
            }
            "group" => {
                let name = self.global_name(node)?;
                ParsedItem::Group(self.read_group(node, name))
            }
            "attributeGroup" => {
                let name = self.global_name(node)?;
                ParsedItem::AttributeGroup(self.read_attribute_group(node, name))
            }
            other => {
                self.warn(node, format!("Unsupported top-level xs:{other} ignored"));
                return None;
            }
        };
        Some(item)
    }

    // ========================================================================
    // Elements
    // ========================================================================

    /// Element-Deklaration. `global_name` ist für Top-Level-Elemente gesetzt,
    /// lokale Namen folgen `form`/`elementFormDefault`.
    fn read_element(&mut self, node: &Node, global_name: Option<QualifiedName>) -> ParsedElement {
        let name = global_name.or_else(|| {
            node.attribute("name").map(|n| {
                QualifiedName::in_namespace(
                    self.namespace_for_form(node, self.element_form_default),
                    n,
                )
            })
        });
        let ref_name = self.resolve_attr(node, "ref");
        if name.is_none() && ref_name.is_none() {
            self.warn(node, "xs:element without name or ref".to_string());
        }
        ParsedElement {
            name,
            ref_name,
            type_name: self.resolve_attr(node, "type"),
            inline_type: self.read_inline_type(node).map(Box::new),
            is_abstract: bool_attr(node, "abstract"),
            nillable: bool_attr(node, "nillable"),
            default_value: string_attr(node, "default"),
            fixed_value: string_attr(node, "fixed"),
            substitution_group: self.resolve_attr(node, "substitutionGroup"),
            documentation: self.documentation(node),
            source: Some(self.location(node)),
        }
    }

    fn read_inline_type(&mut self, node: &Node) -> Option<ParsedTypeDef> {
        let child = first_xs_child(*node, &["simpleType", "complexType"])?;
        Some(match child.tag_name().name() {
            "simpleType" => ParsedTypeDef::Simple(self.read_simple_type(&child, None)),
            _ => ParsedTypeDef::Complex(self.read_complex_type(&child, None)),
        })
    }

    // ========================================================================
    // Simple Types
    // ========================================================================

    fn read_simple_type(&mut self, node: &Node, name: Option<QualifiedName>) -> ParsedSimpleType {
        let mut content = ParsedSimpleContent::Empty;
        for child in xs_children(*node) {
            match child.tag_name().name() {
                "restriction" => {
                    let base = self.resolve_attr(&child, "base");
                    let facets = xs_children(child)
                        .filter(|f| !matches!(f.tag_name().name(), "annotation" | "simpleType"))
                        .map(|f| ParsedFacet {
                            kind: f.tag_name().name().to_string(),
                            value: string_attr(&f, "value"),
                            fixed: bool_attr(&f, "fixed"),
                            source: Some(self.location(&f)),
                        })
                        .collect();
                    content = ParsedSimpleContent::Restriction { base, facets };
                }
                "list" => {
                    let item_type = self.resolve_attr(&child, "itemType");
                    let inline_item_type = first_xs_child(child, &["simpleType"])
                        .map(|inline| Box::new(self.read_simple_type(&inline, None)));
                    content = ParsedSimpleContent::List {
                        item_type,
                        inline_item_type,
                    };
                }
                "union" => {
                    let member_types = child
                        .attribute("memberTypes")
                        .map(|members| {
                            members
                                .split_whitespace()
                                .map(|m| self.resolve_qname(m, &child))
                                .collect()
                        })
                        .unwrap_or_default();
                    let inline_members = xs_children(child)
                        .filter(|c| c.tag_name().name() == "simpleType")
                        .map(|inline| self.read_simple_type(&inline, None))
                        .collect();
                    content = ParsedSimpleContent::Union {
                        member_types,
                        inline_members,
                    };
                }
                _ => {}
            }
        }
        ParsedSimpleType {
            name,
            documentation: self.documentation(node),
            source: Some(self.location(node)),
            content,
        }
    }

    // ========================================================================
    // Complex Types
    // ========================================================================

    fn read_complex_type(&mut self, node: &Node, name: Option<QualifiedName>) -> ParsedComplexType {
        let mut mixed = bool_attr(node, "mixed");
        let mut derived = None;
        let mut particle = None;
        let mut attributes = ParsedAttributeList::default();

        for child in xs_children(*node) {
            match child.tag_name().name() {
                "simpleContent" => {
                    derived = self
                        .read_derivation(&child, false)
                        .map(ParsedComplexContent::SimpleContent);
                }
                "complexContent" => {
                    mixed |= bool_attr(&child, "mixed");
                    derived = self
                        .read_derivation(&child, true)
                        .map(ParsedComplexContent::ComplexContent);
                }
                "sequence" | "choice" | "all" | "group" => particle = self.read_particle(&child),
                "attribute" | "attributeGroup" | "anyAttribute" => {
                    self.read_attribute_item(&child, &mut attributes)
                }
                _ => {}
            }
        }

        ParsedComplexType {
            name,
            documentation: self.documentation(node),
            source: Some(self.location(node)),
            is_abstract: bool_attr(node, "abstract"),
            mixed,
            content: derived.unwrap_or(ParsedComplexContent::Direct {
                particle,
                attributes,
            }),
        }
    }

    /// extension/restriction unter simpleContent/complexContent.
    fn read_derivation(&mut self, node: &Node, with_particle: bool) -> Option<ParsedDerivation> {
        let Some(derivation) = first_xs_child(*node, &["extension", "restriction"]) else {
            self.warn(
                node,
                format!("xs:{} without extension or restriction", node.tag_name().name()),
            );
            return None;
        };
        let method = if derivation.tag_name().name() == "extension" {
            DerivationMethod::Extension
        } else {
            DerivationMethod::Restriction
        };
        let mut result = ParsedDerivation {
            method,
            base: self.resolve_attr(&derivation, "base"),
            particle: None,
            attributes: ParsedAttributeList::default(),
        };
        for child in xs_children(derivation) {
            match child.tag_name().name() {
                "sequence" | "choice" | "all" | "group" if with_particle => {
                    result.particle = self.read_particle(&child)
                }
                "attribute" | "attributeGroup" | "anyAttribute" => {
                    self.read_attribute_item(&child, &mut result.attributes)
                }
                _ => {}
            }
        }
        Some(result)
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    fn read_attribute_item(&mut self, node: &Node, list: &mut ParsedAttributeList) {
        match node.tag_name().name() {
            "attribute" => {
                let attr = self.read_attribute(node, None);
                list.items.push(ParsedAttributeItem::Attribute(attr));
            }
            "attributeGroup" => match self.resolve_attr(node, "ref") {
                Some(name) => list.items.push(ParsedAttributeItem::GroupRef(name)),
                None => self.warn(node, "xs:attributeGroup without ref ignored".to_string()),
            },
            "anyAttribute" => list.any_attribute = Some(self.read_wildcard(node)),
            _ => {}
        }
    }

    fn read_attribute(&mut self, node: &Node, global_name: Option<QualifiedName>) -> ParsedAttribute {
        let name = global_name.or_else(|| {
            node.attribute("name").map(|n| {
                QualifiedName::in_namespace(
                    self.namespace_for_form(node, self.attribute_form_default),
                    n,
                )
            })
        });
        let use_kind = match node.attribute("use") {
            None => AttributeUseKind::default(),
            Some(value) => AttributeUseKind::from_lexical(value).unwrap_or_else(|| {
                self.warn(node, format!("Invalid use value '{value}', using optional"));
                AttributeUseKind::default()
            }),
        };
        ParsedAttribute {
            name,
            ref_name: self.resolve_attr(node, "ref"),
            type_name: self.resolve_attr(node, "type"),
            inline_type: first_xs_child(*node, &["simpleType"])
                .map(|inline| self.read_simple_type(&inline, None)),
            use_kind,
            default_value: string_attr(node, "default"),
            fixed_value: string_attr(node, "fixed"),
            documentation: self.documentation(node),
            source: Some(self.location(node)),
        }
    }

    fn read_attribute_group(&mut self, node: &Node, name: QualifiedName) -> ParsedAttributeGroup {
        let mut attributes = ParsedAttributeList::default();
        for child in xs_children(*node) {
            self.read_attribute_item(&child, &mut attributes);
        }
        ParsedAttributeGroup {
            name,
            attributes,
            documentation: self.documentation(node),
            source: Some(self.location(node)),
        }
    }

    // ========================================================================
    // Particles
    // ========================================================================

    fn read_group(&mut self, node: &Node, name: QualifiedName) -> ParsedGroup {
        let particle = first_xs_child(*node, &["sequence", "choice", "all"])
            .and_then(|model_group| self.read_particle(&model_group));
        ParsedGroup {
            name,
            particle,
            documentation: self.documentation(node),
            source: Some(self.location(node)),
        }
    }

    /// Particle aus element/any/group/sequence/choice/all. minOccurs und
    /// maxOccurs bleiben lexikalisch.
    fn read_particle(&mut self, node: &Node) -> Option<ParsedParticle> {
        let term = match node.tag_name().name() {
            "element" => ParsedTerm::Element(self.read_element(node, None)),
            "any" => ParsedTerm::Any(self.read_wildcard(node)),
            "group" => match self.resolve_attr(node, "ref") {
                Some(name) => ParsedTerm::GroupRef(name),
                None => {
                    self.warn(node, "xs:group without ref ignored".to_string());
                    return None;
                }
            },
            "sequence" => ParsedTerm::Sequence(self.read_particles(node)),
            "choice" => ParsedTerm::Choice(self.read_particles(node)),
            "all" => ParsedTerm::All(self.read_particles(node)),
            _ => return None,
        };
        Some(ParsedParticle {
            min_occurs: string_attr(node, "minOccurs"),
            max_occurs: string_attr(node, "maxOccurs"),
            term,
            source: Some(self.location(node)),
        })
    }

    fn read_particles(&mut self, node: &Node) -> Vec<ParsedParticle> {
        xs_children(*node)
            .filter_map(|child| self.read_particle(&child))
            .collect()
    }

    fn read_wildcard(&mut self, node: &Node) -> ParsedWildcard {
        let process_contents = match node.attribute("processContents") {
            None => None,
            Some(value) => {
                let parsed = ProcessContents::from_lexical(value);
                if parsed.is_none() {
                    self.warn(node, format!("Invalid processContents value: {value}"));
                }
                parsed
            }
        };
        ParsedWildcard {
            namespace: string_attr(node, "namespace"),
            process_contents,
            source: Some(self.location(node)),
        }
    }
}
