//! Log record store with interned field handles
//!
//! Field names are interned into compact 32-bit handles by a process-wide
//! directory, so the hot path addresses fields by index instead of by name.
//! The top bit of the handle space is reserved for the filter engine's
//! floating variables and is never allocated here.

use crate::value::ValueKind;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock, RwLock};

/// Compact identifier of a registered field name. Zero is never allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldHandle(pub u32);

/// Handles above this bit belong to the filter engine, not to records.
pub const FIELD_HANDLE_MAX: u32 = (1 << 31) - 1;

/// Standard fields every deployment expects to exist; transports fill
/// SOURCEIP/DESTIP/DESTPORT with the original peer endpoints even when the
/// connection arrives wrapped in a HAProxy proxy protocol header.
const BUILTIN_FIELDS: &[&str] = &[
    "MESSAGE", "HOST", "PROGRAM", "PID", "SOURCEIP", "DESTIP", "DESTPORT",
];

struct FieldDirectory {
    by_name: FxHashMap<Arc<str>, u32>,
    names: Vec<Arc<str>>,
}

impl FieldDirectory {
    fn new() -> Self {
        let mut directory = Self {
            by_name: FxHashMap::default(),
            names: Vec::new(),
        };
        for name in BUILTIN_FIELDS {
            directory.intern(name);
        }
        directory
    }

    fn intern(&mut self, name: &str) -> u32 {
        if let Some(&handle) = self.by_name.get(name) {
            return handle;
        }
        let name: Arc<str> = Arc::from(name);
        self.names.push(name.clone());
        let handle = self.names.len() as u32;
        assert!(handle <= FIELD_HANDLE_MAX, "field directory exhausted");
        self.by_name.insert(name, handle);
        handle
    }
}

fn directory() -> &'static RwLock<FieldDirectory> {
    static DIRECTORY: OnceLock<RwLock<FieldDirectory>> = OnceLock::new();
    DIRECTORY.get_or_init(|| RwLock::new(FieldDirectory::new()))
}

/// Interns `name`, registering it on first use.
pub fn field_handle(name: &str) -> FieldHandle {
    let dir = directory();
    if let Some(&handle) = dir.read().expect("field directory poisoned").by_name.get(name) {
        return FieldHandle(handle);
    }
    FieldHandle(dir.write().expect("field directory poisoned").intern(name))
}

/// Name a handle resolves to, if it was ever registered.
pub fn field_name(handle: FieldHandle) -> Option<Arc<str>> {
    let dir = directory().read().expect("field directory poisoned");
    dir.names.get(handle.0.checked_sub(1)? as usize).cloned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FieldValue {
    raw: Arc<str>,
    kind: ValueKind,
}

/// A single log record: typed text fields addressed by handle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<Option<FieldValue>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw payload and type tag of a field, if set.
    pub fn get_value(&self, handle: FieldHandle) -> Option<(&Arc<str>, ValueKind)> {
        let slot = self.fields.get(handle.0.checked_sub(1)? as usize)?;
        slot.as_ref().map(|f| (&f.raw, f.kind))
    }

    pub fn set_value(&mut self, handle: FieldHandle, raw: impl Into<Arc<str>>, kind: ValueKind) {
        assert!(handle.0 > 0 && handle.0 <= FIELD_HANDLE_MAX, "invalid field handle");
        let index = (handle.0 - 1) as usize;
        if index >= self.fields.len() {
            self.fields.resize(index + 1, None);
        }
        self.fields[index] = Some(FieldValue {
            raw: raw.into(),
            kind,
        });
    }

    pub fn unset_value(&mut self, handle: FieldHandle) {
        if let Some(index) = handle.0.checked_sub(1) {
            if let Some(slot) = self.fields.get_mut(index as usize) {
                *slot = None;
            }
        }
    }

    /// Convenience lookup by name; interns the name if needed.
    pub fn get(&self, name: &str) -> Option<(&Arc<str>, ValueKind)> {
        self.get_value(field_handle(name))
    }

    pub fn set(&mut self, name: &str, raw: impl Into<Arc<str>>, kind: ValueKind) {
        self.set_value(field_handle(name), raw, kind);
    }

    /// Builder-style field assignment for tests and ingestion code.
    pub fn with_field(mut self, name: &str, raw: impl Into<Arc<str>>, kind: ValueKind) -> Self {
        self.set(name, raw, kind);
        self
    }
}
