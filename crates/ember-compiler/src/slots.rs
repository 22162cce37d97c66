//! Storage and link-table allocation for one compiled unit.
//!
//! Class-binding call sites cache their constructed object in a
//! per-instance field; instance bindings load their target from a shared
//! slot of the script class. [`SlotAllocator`] mints the names and indices
//! for both, and keeps the link tables the VM dispatches host calls through.
//!
//! - Every class-binding call site gets its own cache field, even when two
//!   call sites name the same binding.
//! - Shared slots are keyed by target object; bindings on the same host
//!   object share one slot.
//!
//! Every table is indexed by a 16-bit operand. A unit that needs more
//! entries fails with [`LimitExceeded`].

use std::sync::Arc;

use ember_core::{LimitExceeded, ObjectRef};
use ember_registry::{ClassBinding, ImportedFunction, InstanceBinding};
use rustc_hash::FxHashMap;

/// A per-instance field caching the object of one class-binding call site.
#[derive(Debug, Clone)]
pub struct CacheField {
    /// Unique name of the field within the unit.
    pub name: String,
    /// The binding constructed into this field.
    pub binding: Arc<ClassBinding>,
}

/// A slot of the script class holding an instance binding's target.
#[derive(Debug, Clone)]
pub struct SharedSlot {
    /// Unique name of the slot within the unit.
    pub name: String,
    /// The object the slot is populated with.
    pub target: ObjectRef,
}

/// The allocator's tables, handed over to the compiled unit.
#[derive(Debug, Clone, Default)]
pub struct LinkTables {
    pub cache_fields: Vec<CacheField>,
    pub shared_slots: Vec<SharedSlot>,
    pub imports: Vec<Arc<ImportedFunction>>,
    pub instance_bindings: Vec<Arc<InstanceBinding>>,
}

fn next_index(len: usize, what: &'static str) -> Result<u16, LimitExceeded> {
    u16::try_from(len).map_err(|_| LimitExceeded::new(what, u16::MAX as usize + 1))
}

/// Mints cache fields, shared slots and link-table indices.
#[derive(Debug, Default)]
pub struct SlotAllocator {
    tables: LinkTables,
    import_by_entry: FxHashMap<usize, u16>,
    instance_by_entry: FxHashMap<usize, u16>,
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh cache field for one class-binding call site.
    pub fn allocate_cache_field(&mut self, binding: &Arc<ClassBinding>) -> Result<u16, LimitExceeded> {
        let index = next_index(self.tables.cache_fields.len(), "class-binding call sites")?;
        self.tables.cache_fields.push(CacheField {
            name: format!("$class_binding${index}"),
            binding: Arc::clone(binding),
        });
        Ok(index)
    }

    /// The shared slot holding the binding's target and the binding's
    /// link-table index, as `(slot, index)`.
    pub fn allocate_instance_binding(
        &mut self,
        binding: &Arc<InstanceBinding>,
    ) -> Result<(u16, u16), LimitExceeded> {
        let slot = self.shared_slot(binding.target())?;
        let key = Arc::as_ptr(binding) as usize;
        if let Some(&index) = self.instance_by_entry.get(&key) {
            return Ok((slot, index));
        }
        let index = next_index(self.tables.instance_bindings.len(), "instance bindings")?;
        self.tables.instance_bindings.push(Arc::clone(binding));
        self.instance_by_entry.insert(key, index);
        Ok((slot, index))
    }

    fn shared_slot(&mut self, target: &ObjectRef) -> Result<u16, LimitExceeded> {
        let existing = self
            .tables
            .shared_slots
            .iter()
            .position(|slot| slot.target.ptr_eq(target));
        let index = next_index(existing.unwrap_or(self.tables.shared_slots.len()), "shared slots")?;
        if existing.is_none() {
            self.tables.shared_slots.push(SharedSlot {
                name: format!("$instance_binding${index}"),
                target: target.clone(),
            });
        }
        Ok(index)
    }

    /// Link-table index of an imported function.
    pub fn link_import(&mut self, function: &Arc<ImportedFunction>) -> Result<u16, LimitExceeded> {
        let key = Arc::as_ptr(function) as usize;
        if let Some(&index) = self.import_by_entry.get(&key) {
            return Ok(index);
        }
        let index = next_index(self.tables.imports.len(), "imported functions")?;
        self.tables.imports.push(Arc::clone(function));
        self.import_by_entry.insert(key, index);
        Ok(index)
    }

    pub fn cache_fields(&self) -> &[CacheField] {
        &self.tables.cache_fields
    }

    pub fn shared_slots(&self) -> &[SharedSlot] {
        &self.tables.shared_slots
    }

    pub fn into_tables(self) -> LinkTables {
        self.tables
    }
}
