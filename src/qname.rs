//! Qualified names and registry keys.
//!
//! A [`QualifiedName`] is a namespace URI + local-name pair. The prefix is
//! carried for display only: equality, hashing and registry keys ignore it.
//!
//! Registry-Keys werden ausschließlich hier gebildet ([`QualifiedName::to_key`]),
//! alle anderen Module verwenden nur diese Funktion.

use std::fmt;
use std::hash::{Hash, Hasher};

/// XML Schema Namespace.
pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Namespace (Prefix `xml` ist implizit immer gebunden).
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace URI + local name, optional prefix for display.
#[derive(Debug, Clone, Default)]
pub struct QualifiedName {
    /// The namespace URI. `None` means no namespace.
    pub namespace_uri: Option<String>,
    /// The local name.
    pub local_name: String,
    /// The prefix as written in the source. Cosmetic only.
    pub prefix: Option<String>,
}

/// Zwei QNames sind gleich wenn URI und local-name übereinstimmen,
/// unabhängig vom Prefix.
impl PartialEq for QualifiedName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace() == other.namespace() && self.local_name == other.local_name
    }
}

impl Eq for QualifiedName {}

impl Hash for QualifiedName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace().hash(state);
        self.local_name.hash(state);
    }
}

/// Display: `prefix:local` wenn ein Prefix gesetzt ist, sonst `{uri}local`.
impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(pfx) if !pfx.is_empty() => write!(f, "{pfx}:{}", self.local_name),
            _ => write!(f, "{{{}}}{}", self.namespace(), self.local_name),
        }
    }
}

impl QualifiedName {
    /// Creates a name from namespace URI and local name, without prefix.
    ///
    /// An empty namespace string is normalized to "no namespace".
    pub fn new<N: Into<String>>(namespace_uri: Option<N>, local_name: impl Into<String>) -> Self {
        let namespace_uri = namespace_uri.map(Into::into).filter(|ns| !ns.is_empty());
        Self {
            namespace_uri,
            local_name: local_name.into(),
            prefix: None,
        }
    }

    /// Creates a name in the given namespace (`""` = no namespace).
    pub fn in_namespace(namespace_uri: &str, local_name: impl Into<String>) -> Self {
        Self::new(Some(namespace_uri), local_name)
    }

    /// Creates a name without namespace.
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::new(None::<String>, local_name)
    }

    /// Setzt den Anzeige-Prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Namespace URI, `""` wenn kein Namespace gesetzt ist.
    pub fn namespace(&self) -> &str {
        self.namespace_uri.as_deref().unwrap_or("")
    }

    /// Stable registry key: `namespaceUri|localName`.
    pub fn to_key(&self) -> String {
        let ns = self.namespace();
        let mut key = String::with_capacity(ns.len() + 1 + self.local_name.len());
        key.push_str(ns);
        key.push('|');
        key.push_str(&self.local_name);
        key
    }

    /// Check ob der Name im XML Schema Namespace liegt (Built-in Typen).
    pub fn is_xsd_builtin(&self) -> bool {
        self.namespace() == XS_NAMESPACE
    }
}
