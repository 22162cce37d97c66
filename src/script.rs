//! Compiled script classes and their instances.
//!
//! A [`ScriptClass`] is one compiled unit ready to run. It owns the shared
//! slots every instance reads instance-binding targets from, populated once
//! when the class is created.
//!
//! A [`ScriptInstance`] binds a class to one receiver object and owns the
//! cache fields its class-binding call sites construct into. Executing takes
//! `&mut self`, so an instance runs on one thread at a time.

use std::sync::Arc;

use ember_compiler::CompiledUnit;
use ember_core::{DataType, ObjectRef, RuntimeError, ScriptValue};

use crate::vm::Vm;

/// A compiled script, shared by all of its instances.
#[derive(Debug)]
pub struct ScriptClass {
    unit: CompiledUnit,
    base_type: DataType,
    /// Instance-binding targets, by shared slot
    shared: Vec<ObjectRef>,
}

impl ScriptClass {
    pub(crate) fn new(unit: CompiledUnit, base_type: DataType) -> Self {
        let shared: Vec<ObjectRef> = unit
            .shared_slots
            .iter()
            .map(|slot| slot.target.clone())
            .collect();
        tracing::debug!(
            base_type = %base_type,
            shared_slots = shared.len(),
            cache_fields = unit.cache_fields.len(),
            "initialized script class"
        );
        Self {
            unit,
            base_type,
            shared,
        }
    }

    pub fn unit(&self) -> &CompiledUnit {
        &self.unit
    }

    /// The type every receiver of this class must have.
    pub fn base_type(&self) -> &DataType {
        &self.base_type
    }

    pub fn shared_slot(&self, index: u16) -> Option<&ObjectRef> {
        self.shared.get(index as usize)
    }

    /// Create an instance running against `receiver`.
    ///
    /// Every cache field starts out empty.
    pub fn new_instance(self: &Arc<Self>, receiver: ObjectRef) -> Result<ScriptInstance, RuntimeError> {
        if *receiver.data_type() != self.base_type {
            return Err(RuntimeError::InvalidReceiver {
                expected: self.base_type.to_string(),
                found: receiver.data_type().to_string(),
            });
        }
        Ok(ScriptInstance {
            class: Arc::clone(self),
            receiver,
            cache: vec![None; self.unit.cache_fields.len()],
        })
    }
}

/// One running copy of a script class.
#[derive(Debug)]
pub struct ScriptInstance {
    class: Arc<ScriptClass>,
    receiver: ObjectRef,
    /// Class-binding objects, by cache field
    cache: Vec<Option<ObjectRef>>,
}

impl ScriptInstance {
    pub fn class(&self) -> &Arc<ScriptClass> {
        &self.class
    }

    pub fn receiver(&self) -> &ObjectRef {
        &self.receiver
    }

    /// Run the script's `main` function.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn execute(&mut self, args: &[ScriptValue]) -> Result<ScriptValue, RuntimeError> {
        Vm::new(&self.class, &self.receiver, &mut self.cache).run(args)
    }

    /// The object cached in the field named `name`, once its call site ran.
    pub fn cached_field(&self, name: &str) -> Option<&ObjectRef> {
        let index = self
            .class
            .unit
            .cache_fields
            .iter()
            .position(|field| field.name == name)?;
        self.cache[index].as_ref()
    }
}
