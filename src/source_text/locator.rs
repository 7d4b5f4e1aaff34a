//! Document locators: `file:` URIs and local paths.
//!
//! Andere Schemes (`http:`, `https:`, ...) werden mit
//! [`Error::UnsupportedLocator`] abgelehnt, es gibt keinen Netzwerk-Client.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// UTF-8 Byte Order Mark.
const BOM: char = '\u{feff}';

/// Quelle für Dokumenttext.
///
/// Der Provider liest über diese Schnittstelle, Tests können sie ersetzen.
pub trait DocumentSource: Send + Sync {
    /// Liest das gesamte Dokument.
    fn read_to_string(&self, locator: &str) -> Result<String>;

    /// Öffnet das Dokument zum Streamen.
    fn open(&self, locator: &str) -> Result<Box<dyn BufRead + Send>>;
}

/// Liest aus dem lokalen Dateisystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemSource;

impl DocumentSource for FileSystemSource {
    fn read_to_string(&self, locator: &str) -> Result<String> {
        let path = locator_to_path(locator)?;
        let text = std::fs::read_to_string(&path)?;
        Ok(strip_bom(text))
    }

    fn open(&self, locator: &str) -> Result<Box<dyn BufRead + Send>> {
        let path = locator_to_path(locator)?;
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

/// Entfernt ein führendes BOM.
pub(crate) fn strip_bom(text: String) -> String {
    match text.strip_prefix(BOM) {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

/// Wandelt einen Locator in einen absoluten Dateipfad.
///
/// - `file:///a/b.xsd`, `file://localhost/a/b.xsd` und `file:/a/b.xsd`
///   werden percent-dekodiert.
/// - Relative Pfade werden gegen das aktuelle Verzeichnis aufgelöst.
/// - Ein- oder mehrbuchstabige Schemes wie `C:` gelten als Laufwerk,
///   nicht als Scheme.
pub fn locator_to_path(locator: &str) -> Result<PathBuf> {
    let locator = locator.trim();
    if locator.is_empty() {
        return Err(Error::EmptyLocator);
    }

    if let Some(rest) = strip_scheme(locator, "file") {
        let rest = rest
            .strip_prefix("//localhost")
            .or_else(|| rest.strip_prefix("//"))
            .unwrap_or(rest);
        let decoded = percent_decode(rest)?;
        // file:///C:/x -> C:/x
        let decoded = match decoded.as_bytes() {
            [b'/', drive, b':', ..] if drive.is_ascii_alphabetic() && cfg!(windows) => {
                decoded[1..].to_string()
            }
            _ => decoded,
        };
        return absolute(Path::new(&decoded));
    }

    if has_scheme(locator) {
        return Err(Error::UnsupportedLocator(locator.to_string()));
    }
    absolute(Path::new(locator))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// `scheme:` am Anfang, case-insensitive.
fn strip_scheme<'a>(locator: &'a str, scheme: &str) -> Option<&'a str> {
    let (head, rest) = locator.split_once(':')?;
    head.eq_ignore_ascii_case(scheme).then_some(rest)
}

/// RFC 3986 Scheme mit mindestens zwei Zeichen.
fn has_scheme(locator: &str) -> bool {
    let Some((head, _)) = locator.split_once(':') else {
        return false;
    };
    let mut chars = head.chars();
    head.len() > 1
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn percent_decode(input: &str) -> Result<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(byte) = hex {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out)
        .map_err(|_| Error::UnsupportedLocator(format!("invalid UTF-8 in '{input}'")))
}
