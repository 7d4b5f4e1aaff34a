use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use schemaflow::schema::{CompositorKind, ElementParticle, FacetKind, Registry, Term, TypeRef};
use schemaflow::{QualifiedName, Resolution, SchemaSet, Severity, TypeResolution};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn temp_dir(tag: &str) -> PathBuf {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "schemaflow-load-{tag}-{}-{n}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

const ORDERS_NS: &str = "urn:orders";
const TYPES_NS: &str = "urn:types";

fn orders(local: &str) -> QualifiedName {
    QualifiedName::in_namespace(ORDERS_NS, local)
}

fn types(local: &str) -> QualifiedName {
    QualifiedName::in_namespace(TYPES_NS, local)
}

/// orders.xsd importiert types.xsd und inkludiert audit.xsd.
fn write_order_schemas() -> PathBuf {
    let dir = temp_dir("orders");
    fs::write(
        dir.join("orders.xsd"),
        r###"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:o="urn:orders" xmlns:t="urn:types"
           targetNamespace="urn:orders" elementFormDefault="qualified">
  <xs:import namespace="urn:types" schemaLocation="types/types.xsd"/>
  <xs:include schemaLocation="audit.xsd"/>

  <xs:complexType name="Order">
    <xs:annotation><xs:documentation> An order. </xs:documentation></xs:annotation>
    <xs:sequence>
      <xs:element name="id" type="t:Code"/>
      <xs:element name="line" maxOccurs="unbounded">
        <xs:complexType>
          <xs:attribute name="qty" type="xs:positiveInteger" use="required"/>
        </xs:complexType>
      </xs:element>
      <xs:group ref="o:notes" minOccurs="0"/>
    </xs:sequence>
    <xs:attributeGroup ref="o:audit"/>
  </xs:complexType>

  <xs:group name="notes">
    <xs:choice>
      <xs:element name="note" type="xs:string"/>
      <xs:any namespace="##other" processContents="lax"/>
    </xs:choice>
  </xs:group>

  <xs:element name="order" type="o:Order"/>
  <xs:attribute name="currency" type="xs:string"/>
</xs:schema>
"###,
    )
    .expect("write orders.xsd");
    fs::write(
        dir.join("audit.xsd"),
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:o="urn:orders" targetNamespace="urn:orders">
  <xs:attributeGroup name="audit">
    <xs:attribute name="createdBy" type="xs:string"/>
    <xs:attributeGroup ref="o:stamp"/>
  </xs:attributeGroup>
  <xs:attributeGroup name="stamp">
    <xs:attribute name="createdAt" type="xs:dateTime"/>
    <xs:attributeGroup ref="o:audit"/>
  </xs:attributeGroup>
</xs:schema>
"#,
    )
    .expect("write audit.xsd");
    fs::create_dir_all(dir.join("types")).expect("create types dir");
    fs::write(
        dir.join("types/types.xsd"),
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:types">
  <xs:simpleType name="Code">
    <xs:restriction base="xs:token">
      <xs:maxLength value="12" fixed="true"/>
      <xs:pattern value="[A-Z0-9]+"/>
    </xs:restriction>
  </xs:simpleType>
</xs:schema>
"#,
    )
    .expect("write types.xsd");
    dir.join("orders.xsd")
}

#[test]
fn load_files_follows_import_and_include() {
    let set = SchemaSet::load_files(&[write_order_schemas()]).expect("load");
    assert!(set.diagnostics().is_empty(), "{:?}", set.diagnostics());
    assert_eq!(set.documents().len(), 3);
    assert_eq!(set.documents()[0].imports[0].namespace.as_deref(), Some(TYPES_NS));
    assert_eq!(set.documents()[0].includes, ["audit.xsd"]);
    assert!(set.unresolved_references().is_empty(), "{:?}", set.unresolved_references());
}

#[test]
fn content_model_is_mapped() {
    let set = SchemaSet::load_files(&[write_order_schemas()]).expect("load");
    let order = set.complex_type(&orders("Order")).expect("Order");
    assert_eq!(order.documentation.as_deref(), Some("An order."));

    let content = order.content.as_ref().expect("content");
    let Term::Compositor(sequence) = &content.term else {
        panic!("expected sequence");
    };
    assert_eq!(sequence.kind, CompositorKind::Sequence);
    assert_eq!(sequence.particles.len(), 3);

    let Term::Element(ElementParticle::Local { name, type_ref, .. }) = &sequence.particles[0].term
    else {
        panic!("expected local element");
    };
    assert_eq!(name, "id");
    assert_eq!(type_ref.as_ref().and_then(TypeRef::name), Some(&types("Code")));

    let line = &sequence.particles[1];
    assert!(line.occurs.is_unbounded());
    assert!(matches!(
        &line.term,
        Term::Element(ElementParticle::Local { type_ref: Some(TypeRef::Anonymous(_)), .. })
    ));
    assert_eq!(sequence.particles[2].occurs.min, 0);
    assert!(matches!(&sequence.particles[2].term, Term::GroupRef(g) if *g == orders("notes")));

    let Resolution::Found(notes) = set.resolve_group(&orders("notes")) else {
        panic!("notes group must resolve");
    };
    assert_eq!(notes.compositor.kind, CompositorKind::Choice);
}

#[test]
fn cyclic_attribute_groups_across_files_expand_once() {
    let set = SchemaSet::load_files(&[write_order_schemas()]).expect("load");
    let order = set.complex_type(&orders("Order")).expect("Order");
    let names: Vec<&str> = order
        .attributes
        .iter()
        .map(|a| a.name().local_name.as_str())
        .collect();
    assert_eq!(names, ["createdBy", "createdAt"]);

    let audit = set.attribute_group(&orders("audit")).expect("audit");
    assert_eq!(audit.attributes.len(), 2);
    let stamp = set.attribute_group(&orders("stamp")).expect("stamp");
    let names: Vec<&str> = stamp
        .attributes
        .iter()
        .map(|a| a.name().local_name.as_str())
        .collect();
    assert_eq!(names, ["createdAt", "createdBy"]);
}

#[test]
fn imported_simple_type_has_facets() {
    let set = SchemaSet::load_files(&[write_order_schemas()]).expect("load");
    let TypeResolution::Simple(code) = set.resolve_type(&types("Code")) else {
        panic!("Code must be a simple type");
    };
    let facets = code.facets();
    assert_eq!(facets.len(), 2);
    assert_eq!(facets[0].kind(), FacetKind::MaxLength);
    assert!(facets[0].is_fixed());
    assert_eq!(facets[1].kind(), FacetKind::Pattern);
    assert_eq!(facets[1].value(), "[A-Z0-9]+");

    assert!(matches!(
        set.resolve_type(&QualifiedName::in_namespace("http://www.w3.org/2001/XMLSchema", "token")),
        TypeResolution::BuiltIn(_)
    ));
}

#[test]
fn registry_and_document_share_entities() {
    let set = SchemaSet::load_files(&[write_order_schemas()]).expect("load");
    let from_registry = set.element(&orders("order")).expect("order");
    let from_document = &set.documents()[0].elements[0];
    assert!(Arc::ptr_eq(from_registry, from_document));

    let source = from_registry.source.as_ref().expect("source");
    assert!(source.document_uri.as_deref().unwrap().ends_with("orders.xsd"));
    assert_eq!((source.line, source.column), (29, 3));
}

/// Prüft `key == name.to_key()` für alle Einträge, liefert die Anzahl.
fn assert_keyed_by_name<T>(
    registry: &Registry<T>,
    name_of: impl Fn(&T) -> Option<&QualifiedName>,
) -> usize {
    for (key, entity) in registry {
        let name = name_of(&**entity).expect("global entity has a name");
        assert_eq!(key, &name.to_key());
    }
    registry.len()
}

#[test]
fn every_registry_entry_is_keyed_by_its_name() {
    let set = SchemaSet::load_files(&[write_order_schemas()]).expect("load");
    let counts = [
        assert_keyed_by_name(set.elements(), |e| Some(&e.name)),
        assert_keyed_by_name(set.complex_types(), |t| t.name.as_ref()),
        assert_keyed_by_name(set.simple_types(), |t| t.name.as_ref()),
        assert_keyed_by_name(set.attributes(), |a| Some(&a.name)),
        assert_keyed_by_name(set.groups(), |g| Some(&g.name)),
        assert_keyed_by_name(set.attribute_groups(), |g| Some(&g.name)),
    ];
    assert_eq!(counts, [1, 1, 1, 1, 1, 2]);
    assert!(set.attribute(&orders("currency")).is_some());
}

#[test]
fn redefine_replaces_the_original_declaration() {
    let dir = temp_dir("redefine");
    fs::write(
        dir.join("base.xsd"),
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:simpleType name="Code">
    <xs:restriction base="xs:string"><xs:length value="2"/></xs:restriction>
  </xs:simpleType>
  <xs:element name="code" type="Code"/>
</xs:schema>
"#,
    )
    .expect("write base.xsd");
    fs::write(
        dir.join("main.xsd"),
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:redefine schemaLocation="base.xsd">
    <xs:simpleType name="Code">
      <xs:restriction base="Code"><xs:length value="3"/></xs:restriction>
    </xs:simpleType>
  </xs:redefine>
</xs:schema>
"#,
    )
    .expect("write main.xsd");

    let set = SchemaSet::load_files(&[dir.join("main.xsd")]).expect("load");
    assert!(!set.has_errors(), "{:?}", set.diagnostics());
    assert_eq!(set.documents().len(), 2);

    let code = set.simple_type(&QualifiedName::local("Code")).expect("Code");
    assert_eq!(code.facets()[0].kind(), FacetKind::Length);
    assert_eq!(code.facets()[0].value(), "3");
    let uri = code.source.as_ref().and_then(|s| s.document_uri.as_deref()).expect("uri");
    assert!(uri.ends_with("main.xsd"), "{uri}");
    assert!(set.element(&QualifiedName::local("code")).is_some());
}

#[test]
fn missing_import_is_a_warning() {
    let dir = temp_dir("missing");
    let path = dir.join("main.xsd");
    fs::write(
        &path,
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:import namespace="urn:gone" schemaLocation="gone.xsd"/>
  <xs:element name="root"/>
</xs:schema>"#,
    )
    .expect("write");

    let set = SchemaSet::load_files(&[&path]).expect("load");
    assert!(!set.has_errors());
    assert_eq!(set.diagnostics().len(), 1);
    assert_eq!(set.diagnostics()[0].severity, Severity::Warning);
    assert!(set.diagnostics()[0].message.contains("gone.xsd"));
    assert!(set.element(&QualifiedName::local("root")).is_some());
}

#[test]
fn malformed_root_file_fails() {
    let dir = temp_dir("malformed");
    let path = dir.join("bad.xsd");
    fs::write(&path, "<xs:schema").expect("write");
    assert!(SchemaSet::load_files(&[&path]).is_err());
}
