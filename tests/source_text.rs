use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use schemaflow::source_text::cache::entry_size;
use schemaflow::{CacheConfig, Error, HasSource, QualifiedName, SchemaSet, SourceTextProvider};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn temp_file(name: &str, content: &str) -> PathBuf {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "schemaflow-source-text-{}-{n}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join(name);
    fs::write(&path, content).expect("write file");
    path
}

const XSD_LF: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
<!-- header -->
<xs:simpleType name="Size">
  <xs:restriction base="xs:string">
    <xs:enumeration value="S"/>
    <?editor hint?>
    <xs:enumeration value="L"/>
  </xs:restriction>
</xs:simpleType>
<xs:element name="shirt">
  <xs:complexType>
    <xs:attribute name="size" type="Size"/>
  </xs:complexType>
</xs:element>
</xs:schema>
"#;

/// Schema mit CRLF-Zeilenenden.
fn xsd() -> String {
    XSD_LF.replace('\n', "\r\n")
}

#[test]
fn document_text_reads_files_and_caches() {
    let path = temp_file("doc.xsd", &xsd());
    let provider = SourceTextProvider::new();
    let locator = path.to_str().unwrap();

    let first = provider.document_text(locator).expect("text");
    assert_eq!(*first, *xsd());
    assert_eq!(provider.cached_len(), 1);

    fs::write(&path, "<changed/>").expect("rewrite");
    let second = provider.document_text(locator).expect("cached text");
    assert!(Arc::ptr_eq(&first, &second));

    assert!(provider.remove_from_cache(locator));
    assert_eq!(&*provider.document_text(locator).expect("fresh text"), "<changed/>");
}

#[test]
fn missing_file_is_an_io_error() {
    let provider = SourceTextProvider::new();
    let path = std::env::temp_dir().join("schemaflow-source-text-does-not-exist.xsd");
    let result = provider.document_text(path.to_str().unwrap());
    assert!(matches!(result, Err(Error::IoError(_))));
    assert_eq!(provider.cached_len(), 0);
}

#[test]
fn oversized_files_are_not_cached() {
    let path = temp_file("big.xsd", &xsd());
    let provider = SourceTextProvider::with_config(CacheConfig {
        max_entry_size: 64,
        ..CacheConfig::default()
    });
    provider.document_text(path.to_str().unwrap()).expect("text");
    assert_eq!(provider.cached_len(), 0);
}

#[test]
fn fragments_of_loaded_components() {
    let path = temp_file("shirt.xsd", &xsd());
    let set = SchemaSet::load_files(&[&path]).expect("load");
    let provider = SourceTextProvider::new();

    let size = set.simple_type(&QualifiedName::local("Size")).expect("Size");
    let xml = provider.fragment_of(size).expect("fragment");
    assert!(xml.starts_with("<xs:simpleType name=\"Size\""), "{xml}");
    assert!(xml.contains("<?editor hint?>"), "{xml}");
    assert!(!xml.contains('\r'), "{xml}");
    assert!(!xml.contains("header"), "{xml}");
    assert!(xml.ends_with("</xs:simpleType>"), "{xml}");

    let shirt = set.element(&QualifiedName::local("shirt")).expect("shirt");
    let location = shirt.source().expect("source");
    assert_eq!((location.line, location.column), (10, 1));
    let xml = provider.fragment(location).expect("fragment");
    assert!(xml.contains("<xs:attribute name=\"size\" type=\"Size\"/>"), "{xml}");
    assert_eq!(provider.cached_len(), 0);
}

#[cfg(unix)]
#[test]
fn file_uri_locators() {
    let path = temp_file("uri.xsd", &xsd());
    let provider = SourceTextProvider::new();
    let uri = format!("file://{}", path.display());
    assert_eq!(*provider.document_text(&uri).expect("text"), *xsd());
    let xml = provider.fragment_at(&uri, 3, 1).expect("fragment");
    assert!(xml.starts_with("<xs:simpleType"), "{xml}");
}

#[test]
fn position_without_element_fails() {
    let path = temp_file("miss.xsd", &xsd());
    let provider = SourceTextProvider::new();
    let locator = path.to_str().unwrap();
    assert!(matches!(
        provider.fragment_at(locator, 2, 1),
        Err(Error::FragmentNotFound { line: 2, column: 1, .. })
    ));
    assert!(matches!(
        provider.fragment_at(locator, 0, 0),
        Err(Error::MissingLineInfo)
    ));
}

#[test]
fn fragments_in_files_with_byte_order_mark() {
    let path = temp_file(
        "bom.xsd",
        "\u{feff}<xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\"><xs:element name=\"e\" type=\"xs:string\"/></xs:schema>",
    );
    let set = SchemaSet::load_files(&[&path]).expect("load");
    let e = set.element(&QualifiedName::local("e")).expect("e");
    let location = e.source().expect("source");
    assert_eq!((location.line, location.column), (1, 56));

    let xml = SourceTextProvider::new().fragment_of(e).expect("fragment");
    assert!(xml.starts_with("<xs:element name=\"e\""), "{xml}");
}

#[test]
fn concurrent_reads_and_removals_keep_cache_consistent() {
    let paths: Vec<String> = (0..3)
        .map(|i| {
            let body = format!("<doc n=\"{i}\">{}</doc>", "x".repeat(100 * (i + 1)));
            temp_file(&format!("concurrent-{i}.xml"), &body)
                .to_str()
                .unwrap()
                .to_string()
        })
        .collect();
    let provider = SourceTextProvider::new();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..50 {
                    for path in &paths {
                        let text = provider.document_text(path).expect("text");
                        assert!(text.starts_with("<doc"));
                    }
                }
            });
        }
        scope.spawn(|| {
            for round in 0..50 {
                if round % 10 == 0 {
                    provider.clear_cache();
                } else {
                    provider.remove_from_cache(&paths[round % paths.len()]);
                }
            }
        });
    });

    let expected: usize = paths
        .iter()
        .map(|path| entry_size(&provider.document_text(path).expect("text")))
        .sum();
    assert_eq!(provider.cached_len(), paths.len());
    assert_eq!(provider.cache().total_size(), expected);
}
