//! Schema-Dateien laden und include/import/redefine folgen.
//!
//! Relative `schemaLocation`s werden vom Verzeichnis des referenzierenden
//! Schemas aufgelöst. Jede Datei wird einmal geladen (kanonischer Pfad),
//! zirkuläre Referenzen werden damit übersprungen.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::parse_schema_document;
use crate::error::{Error, Result};
use crate::parsed::{ParsedReference, ParsedSchema};
use crate::schema::Diagnostic;
use crate::source_text::locator::{locator_to_path, strip_bom};
use crate::FastHashMap;

/// Liest und parsed eine einzelne Schema-Datei.
///
/// Der Pfad wird als `document_uri` übernommen.
pub fn parse_schema_file(path: &Path) -> Result<ParsedSchema> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::XsdParseError(format!("Cannot read schema '{}': {}", path.display(), e))
    })?;
    let uri = path.display().to_string();
    parse_schema_document(&strip_bom(text), Some(&uri))
}

/// Lädt die Root-Schemas und alle referenzierten Schemas.
///
/// Ergebnis in Preorder: jedes Dokument steht vor den Dokumenten, die es
/// inkludiert oder importiert. Ausnahme `xs:redefine`: das redefinierte
/// Schema steht vor dem redefinierenden, damit dessen Deklarationen bei
/// der Registrierung gewinnen. Nicht lesbare Root-Dateien sind fatal, nicht
/// lesbare referenzierte Dateien ergeben eine Warnung am referenzierenden
/// Dokument.
///
/// # Beispiel
///
/// ```no_run
/// use schemaflow::xsd::read_schema_files;
///
/// let parsed = read_schema_files(&["schema.xsd"]).unwrap();
/// let set = schemaflow::load(&parsed);
/// ```
pub fn read_schema_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<ParsedSchema>> {
    let mut collector = Collector::default();

    for root in paths {
        let root = root.as_ref();
        let canonical = root.canonicalize().map_err(|e| {
            Error::XsdParseError(format!("Cannot resolve schema path '{}': {}", root.display(), e))
        })?;
        if collector.loaded.contains_key(&canonical) {
            continue;
        }
        let schema = parse_schema_file(root)?;
        let index = collector.add(canonical, schema);
        collector.collect_referenced(index, root);
    }

    let schemas = collector.into_ordered();
    debug!("[schemaflow] read {} schema documents", schemas.len());
    Ok(schemas)
}

/// Pending: (Index des referenzierenden Dokuments, Pfad, über `xs:redefine`).
type Pending = (usize, PathBuf, bool);

#[derive(Default)]
struct Collector {
    schemas: Vec<ParsedSchema>,
    /// Kanonischer Pfad → Index in `schemas`.
    loaded: FastHashMap<PathBuf, usize>,
    /// Pro Dokument die geladenen Referenzen: (Index, über `xs:redefine`).
    children: Vec<Vec<(usize, bool)>>,
}

impl Collector {
    fn add(&mut self, canonical: PathBuf, schema: ParsedSchema) -> usize {
        let index = self.schemas.len();
        self.schemas.push(schema);
        self.children.push(Vec::new());
        self.loaded.insert(canonical, index);
        index
    }

    /// Folgt den Referenzen ab `schemas[root_index]`, iterativ in Preorder.
    fn collect_referenced(&mut self, root_index: usize, root_path: &Path) {
        let mut stack: Vec<Pending> = Vec::new();
        push_references(root_index, root_path, &mut self.schemas, &mut stack);

        while let Some((parent, path, redefine)) = stack.pop() {
            let canonical = match path.canonicalize() {
                Ok(canonical) => canonical,
                Err(e) => {
                    report_unreadable(&mut self.schemas[parent], &path, &e.to_string());
                    continue;
                }
            };
            if let Some(&existing) = self.loaded.get(&canonical) {
                self.children[parent].push((existing, redefine));
                continue;
            }
            match parse_schema_file(&path) {
                Ok(schema) => {
                    let index = self.add(canonical, schema);
                    self.children[parent].push((index, redefine));
                    push_references(index, &path, &mut self.schemas, &mut stack);
                }
                Err(e) => report_unreadable(&mut self.schemas[parent], &path, &e.to_string()),
            }
        }
    }

    /// Preorder beibehalten, redefinierte Teilbäume vor ihre Redefinition ziehen.
    fn into_ordered(self) -> Vec<ParsedSchema> {
        let mut placed = vec![false; self.schemas.len()];
        let mut order = Vec::with_capacity(self.schemas.len());
        for index in 0..self.schemas.len() {
            place(index, &self.children, &mut placed, &mut order);
        }

        let mut slots: Vec<Option<ParsedSchema>> = self.schemas.into_iter().map(Some).collect();
        order.into_iter().filter_map(|index| slots[index].take()).collect()
    }
}

/// Redefinierte Teilbäume, dann das Dokument, dann die übrigen Referenzen.
/// `placed` wird beim Betreten gesetzt, Zyklen enden dort.
fn place(
    index: usize,
    children: &[Vec<(usize, bool)>],
    placed: &mut [bool],
    order: &mut Vec<usize>,
) {
    if placed[index] {
        return;
    }
    placed[index] = true;
    for &(child, _) in children[index].iter().filter(|(_, redefine)| *redefine) {
        place(child, children, placed, order);
    }
    order.push(index);
    for &(child, _) in children[index].iter().filter(|(_, redefine)| !*redefine) {
        place(child, children, placed, order);
    }
}

/// Legt die Referenzen von `schemas[index]` in umgekehrter Reihenfolge auf
/// den Stack, damit sie in Dokumentreihenfolge abgearbeitet werden.
fn push_references(
    index: usize,
    path: &Path,
    schemas: &mut [ParsedSchema],
    stack: &mut Vec<Pending>,
) {
    let base_dir = path.parent().unwrap_or(Path::new("."));
    let mut resolved = Vec::new();
    let mut rejected = Vec::new();

    for reference in &schemas[index].references {
        let Some(location) = reference.location() else {
            continue;
        };
        let redefine = matches!(reference, ParsedReference::Redefine { .. });
        match resolve_location(base_dir, location) {
            Ok(target) => resolved.push((target, redefine)),
            Err(e) => rejected.push(format!("Schema '{location}' not loaded: {e}")),
        }
    }

    for message in rejected {
        warn!("[schemaflow] {message}");
        schemas[index].diagnostics.push(Diagnostic::warning(message, None));
    }
    stack.extend(
        resolved
            .into_iter()
            .rev()
            .map(|(target, redefine)| (index, target, redefine)),
    );
}

/// `schemaLocation` relativ zum Verzeichnis des referenzierenden Schemas.
fn resolve_location(base_dir: &Path, location: &str) -> Result<PathBuf> {
    let location = location.trim();
    if location.contains(':') {
        // URI oder Laufwerk: absolut
        return locator_to_path(location);
    }
    if location.is_empty() {
        return Err(Error::EmptyLocator);
    }
    Ok(base_dir.join(location))
}

fn report_unreadable(referencing: &mut ParsedSchema, path: &Path, reason: &str) {
    let message = format!("Cannot read schema '{}': {}", path.display(), reason);
    warn!("[schemaflow] {message}");
    referencing.diagnostics.push(Diagnostic::warning(message, None));
}
