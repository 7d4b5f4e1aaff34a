//! Fragment-Extraktion: der Teilbaum eines Elements an einer Quellposition.
//!
//! Das Dokument wird gestreamt, nicht gecacht. Treffer ist nur ein Start-Tag,
//! dessen `<` exakt auf (Zeile, Spalte) liegt (1-basiert, Spalte in Zeichen).
//! Der Teilbaum wird inklusive Kommentaren und Processing Instructions
//! ausgegeben. Zeilenenden werden zu `\n` normalisiert.
//!
//! Namespace-Deklarationen der Vorfahren, die im Fragment sichtbar sind,
//! werden am Fragment-Root ergänzt.

use std::io::{BufRead, Read};

use memchr::memchr2_iter;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};
use crate::FastIndexMap;

/// Position des zuletzt gelesenen `<`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TagPosition {
    line: u32,
    column: u32,
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Zeilen-/Spaltenzähler über konsumierte Bytes.
#[derive(Debug)]
struct Cursor {
    line: u32,
    column: u32,
    last_tag: TagPosition,
    /// Noch nichts konsumiert; ein BOM am Anfang zählt nicht als Spalte.
    at_start: bool,
    /// `false` sobald konsumierte Bytes nicht mehr gezählt werden konnten.
    in_sync: bool,
}

impl Cursor {
    /// Zählt Zeichen (keine UTF-8 Folgebytes).
    fn advance_columns(&mut self, bytes: &[u8]) {
        let chars = bytes.iter().filter(|&&b| b & 0xC0 != 0x80).count();
        self.column = self.column.saturating_add(chars as u32);
    }

    fn track(&mut self, bytes: &[u8]) {
        let bytes = if self.at_start && !bytes.is_empty() {
            self.at_start = false;
            bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
        } else {
            bytes
        };
        let mut start = 0;
        for pos in memchr2_iter(b'\n', b'<', bytes) {
            self.advance_columns(&bytes[start..pos]);
            if bytes[pos] == b'\n' {
                self.line = self.line.saturating_add(1);
                self.column = 1;
            } else {
                self.last_tag = TagPosition {
                    line: self.line,
                    column: self.column,
                };
                self.column = self.column.saturating_add(1);
            }
            start = pos + 1;
        }
        self.advance_columns(&bytes[start..]);
    }
}

/// `BufRead`-Wrapper, der beim `consume` die Position mitzählt.
struct PositionTracker<R> {
    inner: R,
    cursor: Cursor,
}

impl<R: BufRead> PositionTracker<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            cursor: Cursor {
                line: 1,
                column: 1,
                last_tag: TagPosition::default(),
                at_start: true,
                in_sync: true,
            },
        }
    }
}

impl<R: BufRead> Read for PositionTracker<R> {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for PositionTracker<R> {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        // Nach fill_buf liefert ein BufRead den gepufferten Inhalt ohne neues I/O.
        // Scheitert das trotzdem, ist die Position ab hier unbekannt.
        match self.inner.fill_buf() {
            Ok(buf) => self.cursor.track(&buf[..amt.min(buf.len())]),
            Err(_) => self.cursor.in_sync = false,
        }
        self.inner.consume(amt);
    }
}

/// Extrahiert den Teilbaum des Elements, dessen Start-Tag bei
/// `(line, column)` beginnt.
///
/// Fehler:
/// - [`Error::MissingLineInfo`] wenn Zeile oder Spalte 0 ist,
/// - [`Error::FragmentNotFound`] wenn das Dokument ohne Treffer endet,
/// - [`Error::XmlParseError`] bei nicht wohlgeformtem XML.
pub fn extract_fragment<R: BufRead>(
    source: R,
    document_uri: &str,
    line: u32,
    column: u32,
) -> Result<String> {
    if line == 0 || column == 0 {
        return Err(Error::MissingLineInfo);
    }
    let target = TagPosition { line, column };

    let mut reader = Reader::from_reader(PositionTracker::new(source));
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    // Namespace-Deklarationen der offenen Elemente, eine Ebene pro Element.
    let mut scopes: Vec<Vec<(Vec<u8>, Vec<u8>)>> = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf);
        let cursor = &reader.get_ref().cursor;
        if !cursor.in_sync {
            return Err(Error::MissingLineInfo);
        }
        let position = cursor.last_tag;
        let event = event?;
        match event {
            Event::Start(start) if position == target => {
                let root = with_inherited_namespaces(&start, &scopes);
                return copy_subtree(&mut reader, root);
            }
            Event::Empty(start) if position == target => {
                let root = with_inherited_namespaces(&start, &scopes);
                return serialize(&[Event::Empty(root)]);
            }
            Event::Start(start) => scopes.push(namespace_declarations(&start)),
            Event::End(_) => {
                scopes.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Err(Error::fragment_not_found(document_uri, line, column))
}

/// `xmlns`/`xmlns:p` Attribute eines Start-Tags.
fn namespace_declarations(start: &BytesStart) -> Vec<(Vec<u8>, Vec<u8>)> {
    start
        .attributes()
        .flatten()
        .filter(|attr| {
            let key = attr.key.as_ref();
            key == b"xmlns" || key.starts_with(b"xmlns:")
        })
        .map(|attr| (attr.key.as_ref().to_vec(), attr.value.into_owned()))
        .collect()
}

/// Kopie des Start-Tags mit allen in-scope Deklarationen, die es nicht
/// selbst deklariert.
fn with_inherited_namespaces(
    start: &BytesStart,
    scopes: &[Vec<(Vec<u8>, Vec<u8>)>],
) -> BytesStart<'static> {
    let own: Vec<Vec<u8>> = namespace_declarations(start)
        .into_iter()
        .map(|(key, _)| key)
        .collect();

    let mut in_scope: FastIndexMap<&[u8], &[u8]> = FastIndexMap::default();
    for (key, value) in scopes.iter().flatten() {
        in_scope.insert(key.as_slice(), value.as_slice());
    }

    let mut root = start.clone().into_owned();
    for (key, value) in in_scope {
        let undeclared_prefix = value.is_empty() && key != b"xmlns";
        if own.iter().any(|k| k.as_slice() == key) || undeclared_prefix {
            continue;
        }
        root.push_attribute((key, value));
    }
    root
}

/// Schreibt Start-Tag und alle Events bis zum passenden End-Tag.
fn copy_subtree<R: BufRead>(reader: &mut Reader<R>, root: BytesStart<'static>) -> Result<String> {
    let mut events: Vec<Event<'static>> = vec![Event::Start(root)];
    let mut depth = 1usize;
    let mut buf = Vec::new();

    while depth > 0 {
        let event = reader.read_event_into(&mut buf)?;
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth -= 1,
            Event::Eof => {
                return Err(Error::XmlParseError(
                    "unexpected end of document inside fragment".to_string(),
                ));
            }
            _ => {}
        }
        events.push(event.into_owned());
        buf.clear();
    }
    serialize(&events)
}

fn serialize(events: &[Event<'static>]) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    for event in events {
        writer
            .write_event(event.borrow())
            .map_err(|e| Error::XmlParseError(e.to_string()))?;
    }
    let text = String::from_utf8(writer.into_inner())
        .map_err(|e| Error::XmlParseError(e.to_string()))?;
    Ok(normalize_line_endings(&text))
}

/// `\r\n` und einzelnes `\r` zu `\n`.
fn normalize_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}
