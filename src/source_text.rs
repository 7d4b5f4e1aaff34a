//! Quelltext-Zugriff: ganzer Dokumenttext (gecacht) und Element-Fragmente
//! (gestreamt) zu einer [`SourceLocation`].
//!
//! # Beispiel
//!
//! ```no_run
//! use schemaflow::{QualifiedName, SchemaSet, SourceTextProvider};
//!
//! let set = SchemaSet::load_files(&["schema.xsd"]).unwrap();
//! let person = set.element(&QualifiedName::local("person")).unwrap();
//! let xml = SourceTextProvider::shared().fragment_of(person).unwrap();
//! println!("{xml}");
//! ```

pub mod cache;
pub mod fragment;
pub mod locator;

use std::fmt;
use std::sync::{Arc, OnceLock};

use log::debug;

pub use cache::{CacheConfig, DocumentTextCache};
pub use fragment::extract_fragment;
pub use locator::{DocumentSource, FileSystemSource};

use crate::error::{Error, Result};
use crate::schema::{HasSource, SourceLocation};

/// Liefert Dokumenttext und Fragmente.
///
/// Der Dokumenttext wird im [`DocumentTextCache`] gehalten, Fragmente werden
/// immer frisch aus der Quelle gestreamt.
pub struct SourceTextProvider {
    source: Box<dyn DocumentSource>,
    cache: DocumentTextCache,
}

impl fmt::Debug for SourceTextProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceTextProvider")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Default for SourceTextProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceTextProvider {
    /// Dateisystem-Quelle mit Default-Cache-Konfiguration.
    pub fn new() -> Self {
        Self::with_source(FileSystemSource, CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_source(FileSystemSource, config)
    }

    pub fn with_source(source: impl DocumentSource + 'static, config: CacheConfig) -> Self {
        Self {
            source: Box::new(source),
            cache: DocumentTextCache::new(config),
        }
    }

    /// Prozessweite Instanz, beim ersten Aufruf angelegt.
    pub fn shared() -> &'static SourceTextProvider {
        static SHARED: OnceLock<SourceTextProvider> = OnceLock::new();
        SHARED.get_or_init(SourceTextProvider::new)
    }

    pub fn cache(&self) -> &DocumentTextCache {
        &self.cache
    }

    /// Gesamter Text des Dokuments.
    ///
    /// Bei einem Cache-Treffer wird nicht erneut gelesen. Dokumente über der
    /// Obergrenze pro Eintrag werden bei jedem Aufruf neu gelesen.
    pub fn document_text(&self, locator: &str) -> Result<Arc<str>> {
        let key = checked_locator(locator)?;
        if let Some(text) = self.cache.get(key) {
            return Ok(text);
        }
        let text: Arc<str> = Arc::from(self.source.read_to_string(key)?);
        self.cache.insert(key, Arc::clone(&text));
        Ok(text)
    }

    /// Fragment des Elements, dessen Start-Tag bei `(line, column)` beginnt.
    pub fn fragment_at(&self, locator: &str, line: u32, column: u32) -> Result<String> {
        let key = checked_locator(locator)?;
        let reader = self.source.open(key)?;
        extract_fragment(reader, key, line, column).inspect_err(|e| {
            debug!("[schemaflow] no fragment at {key}:{line}:{column}: {e}");
        })
    }

    pub fn fragment(&self, location: &SourceLocation) -> Result<String> {
        let locator = location.document_uri.as_deref().ok_or(Error::EmptyLocator)?;
        self.fragment_at(locator, location.line, location.column)
    }

    /// Fragment einer Modell-Komponente. Ohne Quellposition:
    /// [`Error::MissingLineInfo`].
    pub fn fragment_of<T: HasSource + ?Sized>(&self, item: &T) -> Result<String> {
        let location = item.source().ok_or(Error::MissingLineInfo)?;
        self.fragment(location)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn remove_from_cache(&self, locator: &str) -> bool {
        self.cache.remove(locator.trim())
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

fn checked_locator(locator: &str) -> Result<&str> {
    let locator = locator.trim();
    if locator.is_empty() {
        Err(Error::EmptyLocator)
    } else {
        Ok(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, Cursor};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::parsed::{ParsedItem, ParsedSchema};
    use crate::qname::QualifiedName;
    use crate::xsd::parse_schema_document;

    const XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:p">
  <xs:element name="person">
    <xs:complexType>
      <xs:attribute name="id" type="xs:ID"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

    /// In-Memory Quelle, zählt Lesezugriffe.
    struct CountingSource {
        text: String,
        reads: Arc<AtomicUsize>,
        opens: Arc<AtomicUsize>,
    }

    impl CountingSource {
        fn new(text: &str) -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
            let reads = Arc::new(AtomicUsize::new(0));
            let opens = Arc::new(AtomicUsize::new(0));
            let source = Self {
                text: text.to_string(),
                reads: Arc::clone(&reads),
                opens: Arc::clone(&opens),
            };
            (source, reads, opens)
        }
    }

    impl DocumentSource for CountingSource {
        fn read_to_string(&self, locator: &str) -> Result<String> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if locator == "mem:missing" {
                return Err(Error::IoError("not found".to_string()));
            }
            Ok(self.text.clone())
        }

        fn open(&self, _locator: &str) -> Result<Box<dyn BufRead + Send>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Cursor::new(self.text.clone().into_bytes())))
        }
    }

    fn parsed() -> ParsedSchema {
        parse_schema_document(XSD, Some("mem:person.xsd")).unwrap()
    }

    #[test]
    fn second_read_is_cached() {
        let (source, reads, _) = CountingSource::new(XSD);
        let provider = SourceTextProvider::with_source(source, CacheConfig::default());

        let first = provider.document_text("mem:person.xsd").unwrap();
        let second = provider.document_text("mem:person.xsd").unwrap();
        assert_eq!(&*first, XSD);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(provider.cached_len(), 1);
    }

    #[test]
    fn oversized_document_is_read_every_time() {
        let (source, reads, _) = CountingSource::new(XSD);
        let config = CacheConfig {
            max_entry_size: 16,
            ..CacheConfig::default()
        };
        let provider = SourceTextProvider::with_source(source, config);

        provider.document_text("mem:big.xsd").unwrap();
        provider.document_text("mem:big.xsd").unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 2);
        assert_eq!(provider.cached_len(), 0);
    }

    #[test]
    fn read_failure_is_an_error_and_not_cached() {
        let (source, reads, _) = CountingSource::new(XSD);
        let provider = SourceTextProvider::with_source(source, CacheConfig::default());
        assert!(provider.document_text("mem:missing").is_err());
        assert!(provider.document_text("mem:missing").is_err());
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_locator() {
        let provider = SourceTextProvider::new();
        assert_eq!(provider.document_text("  "), Err(Error::EmptyLocator));
        assert_eq!(provider.fragment_at("", 1, 1), Err(Error::EmptyLocator));
        assert_eq!(
            provider.fragment(&SourceLocation::new(None, 1, 1)),
            Err(Error::EmptyLocator)
        );
    }

    #[test]
    fn clear_and_remove() {
        let (source, reads, _) = CountingSource::new(XSD);
        let provider = SourceTextProvider::with_source(source, CacheConfig::default());
        provider.document_text("mem:a").unwrap();
        provider.document_text("mem:b").unwrap();

        assert!(provider.remove_from_cache("mem:a"));
        assert!(!provider.remove_from_cache("mem:a"));
        assert_eq!(provider.cached_len(), 1);
        provider.document_text("mem:a").unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 3);

        provider.clear_cache();
        assert_eq!(provider.cached_len(), 0);
    }

    #[test]
    fn fragments_bypass_the_cache() {
        let (source, reads, opens) = CountingSource::new(XSD);
        let provider = SourceTextProvider::with_source(source, CacheConfig::default());
        let schema = parsed();
        let ParsedItem::Element(person) = &schema.items[0] else {
            panic!("expected element");
        };

        let location = person.source.as_ref().unwrap();
        let first = provider.fragment(location).unwrap();
        let second = provider.fragment(location).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("<xs:element name=\"person\""), "{first}");
        assert!(first.contains("xmlns:xs=\"http://www.w3.org/2001/XMLSchema\""));
        assert!(first.ends_with("</xs:element>"));
        assert_eq!(opens.load(Ordering::SeqCst), 2);
        assert_eq!(reads.load(Ordering::SeqCst), 0);
        assert_eq!(provider.cached_len(), 0);
    }

    #[test]
    fn fragment_of_model_components() {
        let (source, _, _) = CountingSource::new(XSD);
        let provider = SourceTextProvider::with_source(source, CacheConfig::default());
        let set = crate::load(&[parsed()]);

        let person = set
            .element(&QualifiedName::in_namespace("urn:p", "person"))
            .unwrap();
        let xml = provider.fragment_of(person).unwrap();
        assert!(xml.contains("<xs:attribute name=\"id\" type=\"xs:ID\"/>"));

        let no_source = crate::schema::SimpleType {
            name: None,
            documentation: None,
            source: None,
            content: crate::schema::SimpleTypeContent::BuiltIn,
        };
        assert_eq!(provider.fragment_of(&no_source), Err(Error::MissingLineInfo));
    }

    #[test]
    fn fragment_miss_reports_position() {
        let (source, _, _) = CountingSource::new(XSD);
        let provider = SourceTextProvider::with_source(source, CacheConfig::default());
        assert_eq!(
            provider.fragment_at("mem:person.xsd", 2, 4),
            Err(Error::fragment_not_found("mem:person.xsd", 2, 4))
        );
    }

    #[test]
    fn shared_instance_is_unique() {
        assert!(std::ptr::eq(SourceTextProvider::shared(), SourceTextProvider::shared()));
    }
}
