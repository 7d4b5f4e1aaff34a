//! Attributgruppen-Expansion.
//!
//! Referenzen auf Attributgruppen werden flach in die Attributliste des
//! Owners eingefügt, rekursiv über verschachtelte Referenzen. Quelle ist
//! immer die geparste Deklaration aus [`AttributeGroupSources`], nie ein
//! halb befülltes Registry-Objekt. Dadurch ist das Ergebnis unabhängig von
//! der Reihenfolge, in der Dokumente und Gruppen verarbeitet werden.
//!
//! Zyklen (A → B → A) werden über ein Visited-Set abgebrochen: jede Gruppe
//! trägt pro Owner höchstens einmal bei. Die Expansion ist iterativ, die
//! Tiefe einer Referenzkette ist nicht durch den Call-Stack begrenzt.

use std::slice;

use log::debug;

use super::Mapper;
use crate::parsed::{ParsedAttributeGroup, ParsedAttributeItem, ParsedItem, ParsedSchema};
use crate::qname::QualifiedName;
use crate::schema::{AttributeGroupDecl, AttributeUse, Registry};
use crate::{FastHashMap, FastHashSet};

/// Name → geparste Attributgruppe über alle Eingabedokumente.
///
/// Bei mehrfach deklarierten Namen gewinnt die letzte Deklaration.
#[derive(Debug, Default)]
pub struct AttributeGroupSources<'a> {
    groups: FastHashMap<String, &'a ParsedAttributeGroup>,
}

impl<'a> AttributeGroupSources<'a> {
    pub fn build(inputs: &'a [ParsedSchema]) -> Self {
        let mut groups = FastHashMap::default();
        for input in inputs {
            for item in &input.items {
                if let ParsedItem::AttributeGroup(group) = item {
                    groups.insert(group.name.to_key(), group);
                }
            }
        }
        Self { groups }
    }

    pub fn get(&self, name: &QualifiedName) -> Option<&'a ParsedAttributeGroup> {
        self.groups.get(&name.to_key()).copied()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Expandiert die Attributgruppe `name` zu einer flachen Liste.
///
/// `visited` enthält die bereits expandierten Gruppen-Keys des Owners und
/// wird fortgeschrieben. Namen, die weder in `sources` noch in `registry`
/// stehen, tragen nichts bei.
pub fn expand_attribute_group(
    name: &QualifiedName,
    visited: &mut FastHashSet<String>,
    sources: &AttributeGroupSources<'_>,
    registry: Option<&Registry<AttributeGroupDecl>>,
) -> Vec<AttributeUse> {
    let mut mapper = Mapper::new(sources, registry);
    let mut uses = Vec::new();
    mapper.expand_into(name, visited, &mut uses);
    for diagnostic in mapper.into_diagnostics() {
        debug!("[schemaflow] {diagnostic}");
    }
    uses
}

impl<'a> Mapper<'a> {
    /// Hängt die Attribute der Gruppe `name` (rekursiv expandiert) an `out` an.
    pub(crate) fn expand_into(
        &mut self,
        name: &QualifiedName,
        visited: &mut FastHashSet<String>,
        out: &mut Vec<AttributeUse>,
    ) {
        let mut stack: Vec<slice::Iter<'a, ParsedAttributeItem>> = Vec::new();
        self.enter_group(name, visited, out, &mut stack);
        self.drain(&mut stack, visited, out);
    }

    /// Attribute einer deklarierten Gruppe selbst. Die eigene Gruppe ist
    /// vorab als besucht markiert, Selbstreferenzen tragen nichts bei.
    pub(crate) fn expand_group_body(&mut self, group: &'a ParsedAttributeGroup) -> Vec<AttributeUse> {
        let mut visited = FastHashSet::default();
        visited.insert(group.name.to_key());
        let mut out = Vec::with_capacity(group.attributes.items.len());
        let mut stack = vec![group.attributes.items.iter()];
        self.drain(&mut stack, &mut visited, &mut out);
        out
    }

    fn drain(
        &mut self,
        stack: &mut Vec<slice::Iter<'a, ParsedAttributeItem>>,
        visited: &mut FastHashSet<String>,
        out: &mut Vec<AttributeUse>,
    ) {
        while let Some(items) = stack.last_mut() {
            let Some(item) = items.next() else {
                stack.pop();
                continue;
            };
            match item {
                ParsedAttributeItem::Attribute(attr) => {
                    let attr_use = self.map_attribute_use(attr);
                    out.push(attr_use);
                }
                ParsedAttributeItem::GroupRef(nested) => {
                    self.enter_group(nested, visited, out, stack)
                }
            }
        }
    }

    fn enter_group(
        &self,
        name: &QualifiedName,
        visited: &mut FastHashSet<String>,
        out: &mut Vec<AttributeUse>,
        stack: &mut Vec<slice::Iter<'a, ParsedAttributeItem>>,
    ) {
        let key = name.to_key();
        if visited.contains(&key) {
            debug!("[schemaflow] attribute group {name} already expanded for this owner");
            return;
        }
        let sources: &'a AttributeGroupSources<'a> = self.sources;
        if let Some(group) = sources.get(name) {
            visited.insert(key);
            stack.push(group.attributes.items.iter());
        } else if let Some(decl) = self.fallback.and_then(|registry| registry.get(&key)) {
            visited.insert(key);
            out.extend(decl.attributes.iter().cloned());
        } else {
            debug!("[schemaflow] unresolved attribute group {name}");
        }
    }
}
