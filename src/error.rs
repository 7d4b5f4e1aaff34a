//! Central error types for schemaflow.
//!
//! Model construction never fails with an `Error`; problems found while
//! building a `SchemaSet` are collected as [`Diagnostic`](crate::schema::Diagnostic)s.
//! These variants cover the XSD front-end and the source-text lookups.

use core::fmt;

/// All error types returned by the fallible schemaflow APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// XSD document could not be read as a schema (malformed, wrong root, too large).
    XsdParseError(String),
    /// XML parsing failed while streaming a source document.
    XmlParseError(String),
    /// An IO error while reading a source document.
    IoError(String),
    /// The document locator was empty or whitespace only.
    EmptyLocator,
    /// The document locator uses a scheme that cannot be read (e.g. `http:`).
    UnsupportedLocator(String),
    /// The reader cannot report line/column positions.
    ///
    /// Fragment-Extraktion ist ohne Positionsangaben nicht möglich.
    MissingLineInfo,
    /// No element start tag exists at the requested position.
    FragmentNotFound {
        /// Dokument in dem gesucht wurde.
        document_uri: String,
        /// 1-basierte Zeile.
        line: u32,
        /// 1-basierte Spalte.
        column: u32,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XsdParseError(msg) => write!(f, "XSD parse error: {msg}"),
            Self::XmlParseError(msg) => write!(f, "XML parse error: {msg}"),
            Self::IoError(msg) => write!(f, "IO error: {msg}"),
            Self::EmptyLocator => write!(f, "empty document locator"),
            Self::UnsupportedLocator(locator) => {
                write!(f, "unsupported document locator '{locator}' (only file URIs and local paths)")
            }
            Self::MissingLineInfo => write!(f, "reader provides no line information"),
            Self::FragmentNotFound { document_uri, line, column } => write!(
                f,
                "no element starts at {document_uri}:{line}:{column}"
            ),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Self::XmlParseError(e.to_string())
    }
}

impl Error {
    /// Erstellt einen `FragmentNotFound` Fehler.
    pub fn fragment_not_found(document_uri: impl Into<String>, line: u32, column: u32) -> Self {
        Self::FragmentNotFound {
            document_uri: document_uri.into(),
            line,
            column,
        }
    }
}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
