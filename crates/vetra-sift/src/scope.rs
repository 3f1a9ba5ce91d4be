//! Variable scope of a filter evaluation
//!
//! Variables are either tied to a record field (their lifetime is the
//! record) or floating, i.e. local to the evaluation. Floating variables
//! declared with `declare` survive from one record to the next within the
//! same scope; plain floating variables and cached record fields go stale
//! when a new record begins. Staleness is tracked with a generation
//! counter instead of eagerly clearing the slot pool.

use rustc_hash::FxHashMap;
use std::sync::Arc;
use vetra_core::record::{field_handle, field_name, FieldHandle};
use vetra_core::{Record, Value};

/// Handles with this bit set name floating variables; without it, the low
/// bits are the record field handle the variable is tied to.
pub const VAR_HANDLE_FLOATING_BIT: u32 = 1 << 31;

/// Compact identifier of a variable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarHandle(u32);

impl VarHandle {
    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn is_floating(self) -> bool {
        self.0 & VAR_HANDLE_FLOATING_BIT != 0
    }

    pub fn is_message_tied(self) -> bool {
        !self.is_floating()
    }

    /// Record field behind the handle; meaningful for both kinds, since
    /// floating names are interned in the same directory.
    pub fn field_handle(self) -> FieldHandle {
        FieldHandle(self.0 & !VAR_HANDLE_FLOATING_BIT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Cached view of a record field; synced back when assigned.
    MessageTied,
    /// Evaluation-local, cleared when the next record begins.
    Floating,
    /// Evaluation-local but retained across records in this scope.
    DeclaredFloating,
}

/// Interns `name` into a handle. Message-tied variables are spelled with a
/// `$` prefix (`$MESSAGE`), which is stripped before interning so the
/// handle's low bits equal the record field handle.
pub fn map_variable_name(name: &str, kind: VarKind) -> VarHandle {
    match kind {
        VarKind::MessageTied => {
            let name = name.strip_prefix('$').unwrap_or(name);
            VarHandle(field_handle(name).0)
        }
        VarKind::Floating | VarKind::DeclaredFloating => {
            VarHandle(field_handle(name).0 | VAR_HANDLE_FLOATING_BIT)
        }
    }
}

/// Human-readable name of a variable handle, `$`-prefixed for message-tied.
pub fn variable_name(handle: VarHandle) -> Option<Arc<str>> {
    let name = field_name(handle.field_handle())?;
    if handle.is_message_tied() {
        Some(Arc::from(format!("${}", name).as_str()))
    } else {
        Some(name)
    }
}

/// A variable slot. Live iff `value` is set and the generation matches.
#[derive(Debug, Clone)]
pub struct Variable {
    handle: VarHandle,
    kind: VarKind,
    assigned: bool,
    generation: u16,
    value: Option<Value>,
}

impl Variable {
    pub fn handle(&self) -> VarHandle {
        self.handle
    }

    pub fn kind(&self) -> VarKind {
        self.kind
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned
    }

    pub fn value(&self) -> Option<Value> {
        self.value.clone()
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = Some(value);
        self.assigned = true;
    }

    /// Caches a value without marking the slot dirty for sync.
    pub fn cache_value(&mut self, value: Value) {
        self.value = Some(value);
    }

    /// Keeps the slot alive but empty; for message-tied variables the
    /// assigned flag makes sync remove the record field.
    pub fn unset(&mut self) {
        self.value = None;
        self.assigned = true;
    }
}

/// Variable table with O(1) handle lookup.
#[derive(Debug, Default)]
pub struct Scope {
    variables: Vec<Variable>,
    index: FxHashMap<u32, usize>,
    generation: u16,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u16 {
        self.generation
    }

    /// Starts the next record: declared variables carry over, everything
    /// else goes stale via the generation bump.
    pub fn begin_record(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        for variable in &mut self.variables {
            if variable.kind == VarKind::DeclaredFloating {
                variable.generation = self.generation;
                variable.assigned = false;
            }
        }
    }

    fn slot(&self, handle: VarHandle) -> Option<usize> {
        self.index.get(&handle.raw()).copied()
    }

    /// Looks up a variable, ignoring slots left over from earlier records.
    pub fn lookup(&self, handle: VarHandle) -> Option<&Variable> {
        let variable = &self.variables[self.slot(handle)?];
        if variable.generation != self.generation {
            return None;
        }
        Some(variable)
    }

    pub fn lookup_mut(&mut self, handle: VarHandle) -> Option<&mut Variable> {
        let slot = self.slot(handle)?;
        let variable = &mut self.variables[slot];
        if variable.generation != self.generation {
            return None;
        }
        Some(variable)
    }

    /// Registers (or revives) a variable slot and returns it.
    pub fn register(
        &mut self,
        kind: VarKind,
        handle: VarHandle,
        initial_value: Option<Value>,
    ) -> &mut Variable {
        let generation = self.generation;
        match self.slot(handle) {
            Some(slot) => {
                let variable = &mut self.variables[slot];
                if variable.generation != generation {
                    // stale slot from a previous record, reset it
                    variable.kind = kind;
                    variable.assigned = false;
                    variable.generation = generation;
                    variable.value = initial_value;
                } else if let Some(value) = initial_value {
                    variable.cache_value(value);
                }
                variable
            }
            None => {
                let slot = self.variables.len();
                self.variables.push(Variable {
                    handle,
                    kind,
                    assigned: false,
                    generation,
                    value: initial_value,
                });
                self.index.insert(handle.raw(), slot);
                &mut self.variables[slot]
            }
        }
    }

    /// Unsets a variable; the slot stays allocated.
    pub fn unset(&mut self, handle: VarHandle) {
        if let Some(variable) = self.lookup_mut(handle) {
            variable.unset();
        }
    }

    /// Visits every live variable.
    pub fn foreach<F>(&self, mut f: F) -> bool
    where
        F: FnMut(&Variable) -> bool,
    {
        for variable in &self.variables {
            if variable.generation != self.generation || !variable.is_set() {
                continue;
            }
            if !f(variable) {
                return false;
            }
        }
        true
    }

    /// Writes assigned message-tied variables back into the record.
    pub fn sync(&mut self, record: &mut Record) {
        for variable in &mut self.variables {
            if variable.generation != self.generation
                || variable.kind != VarKind::MessageTied
                || !variable.assigned
            {
                continue;
            }
            match &variable.value {
                Some(value) => {
                    let mut text = String::new();
                    let kind = value.marshal_into(&mut text);
                    record.set_value(variable.handle.field_handle(), text, kind);
                }
                None => record.unset_value(variable.handle.field_handle()),
            }
            variable.assigned = false;
        }
    }
}
