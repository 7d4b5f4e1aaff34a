//! Größenbeschränkter Dokumenttext-Cache.
//!
//! Größe eines Eintrags: UTF-16 Code Units × 2 Bytes. Einträge über
//! [`CacheConfig::max_entry_size`] werden nie aufgenommen. Ist das Budget
//! voll, werden die am längsten nicht gelesenen Einträge verdrängt.
//!
//! Ablauf: gleitend nach [`CacheConfig::sliding_expiration`] ohne Zugriff,
//! absolut nach [`CacheConfig::absolute_expiration`] seit dem Einfügen.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace};
use parking_lot::Mutex;

use crate::FastHashMap;

/// Konfiguration des Dokumenttext-Caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Gesamtbudget in Bytes. Default: 128 MiB.
    pub size_limit: usize,
    /// Größter aufnehmbarer Eintrag in Bytes. Default: 4 MiB.
    pub max_entry_size: usize,
    /// Ablauf ohne Zugriff. Default: 10 Minuten.
    pub sliding_expiration: Duration,
    /// Ablauf seit dem Einfügen. Default: 1 Stunde.
    pub absolute_expiration: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size_limit: 128 * 1024 * 1024,
            max_entry_size: 4 * 1024 * 1024,
            sliding_expiration: Duration::from_secs(10 * 60),
            absolute_expiration: Duration::from_secs(60 * 60),
        }
    }
}

/// Geschätzte Größe eines Texts in Bytes (UTF-16 × 2).
pub fn entry_size(text: &str) -> usize {
    text.encode_utf16().count().saturating_mul(2)
}

#[derive(Debug)]
struct CacheEntry {
    text: Arc<str>,
    size: usize,
    inserted: Instant,
    last_access: Instant,
}

impl CacheEntry {
    fn is_expired(&self, config: &CacheConfig, now: Instant) -> bool {
        now.saturating_duration_since(self.last_access) >= config.sliding_expiration
            || now.saturating_duration_since(self.inserted) >= config.absolute_expiration
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: FastHashMap<String, CacheEntry>,
    total_size: usize,
}

impl CacheState {
    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.total_size -= entry.size;
                true
            }
            None => false,
        }
    }

    /// Entfernt den am längsten nicht gelesenen Eintrag.
    fn evict_one(&mut self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());
        match oldest {
            Some(key) => {
                debug!("[schemaflow] cache evict {key}");
                self.remove(&key)
            }
            None => false,
        }
    }
}

/// Thread-sicherer Text-Cache, Schlüssel ist der Dokument-Locator.
#[derive(Debug, Default)]
pub struct DocumentTextCache {
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl DocumentTextCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Liefert den Text und verlängert den gleitenden Ablauf.
    pub fn get(&self, key: &str) -> Option<Arc<str>> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<Arc<str>> {
        let mut state = self.state.lock();
        let expired = match state.entries.get_mut(key) {
            None => return None,
            Some(entry) if entry.is_expired(&self.config, now) => true,
            Some(entry) => {
                entry.last_access = now;
                trace!("[schemaflow] cache hit {key}");
                return Some(Arc::clone(&entry.text));
            }
        };
        if expired {
            debug!("[schemaflow] cache expired {key}");
            state.remove(key);
        }
        None
    }

    /// Nimmt den Text auf, wenn er die Obergrenze pro Eintrag einhält.
    ///
    /// Gibt `false` zurück, wenn der Eintrag abgelehnt wurde.
    pub fn insert(&self, key: &str, text: Arc<str>) -> bool {
        self.insert_at(key, text, Instant::now())
    }

    pub(crate) fn insert_at(&self, key: &str, text: Arc<str>, now: Instant) -> bool {
        let size = entry_size(&text);
        if size > self.config.max_entry_size || size > self.config.size_limit {
            debug!("[schemaflow] cache skip {key}: {size} bytes");
            return false;
        }

        let mut state = self.state.lock();
        state.remove(key);

        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(&self.config, now))
            .map(|(k, _)| k.clone())
            .collect();
        for k in expired {
            state.remove(&k);
        }

        while state.total_size + size > self.config.size_limit {
            if !state.evict_one() {
                break;
            }
        }

        state.total_size += size;
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                text,
                size,
                inserted: now,
                last_access: now,
            },
        );
        trace!("[schemaflow] cache insert {key}: {size} bytes, total {}", state.total_size);
        true
    }

    pub fn remove(&self, key: &str) -> bool {
        self.state.lock().remove(key)
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.total_size = 0;
    }

    /// Anzahl der Einträge (inkl. noch nicht entfernter abgelaufener).
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Summe der Eintragsgrößen in Bytes.
    pub fn total_size(&self) -> usize {
        self.state.lock().total_size
    }
}
