//! BindingRegistry - the catalog of host callables visible to scripts.
//!
//! # Storage Model
//!
//! Three independent [`BindingTable`]s, one per entry kind, each keyed by
//! `(name, arity)`. A name may appear in several tables and at several
//! arities; which entry a call site uses is decided by the compiler's
//! resolution order, not by the registry.
//!
//! For class bindings the arity is the length of the full declared list,
//! constructor parameters followed by method parameters.
//!
//! # Thread Safety
//!
//! The registry is populated single-threaded through
//! [`BindingRegistryBuilder`] and then frozen by [`BindingRegistryBuilder::build`].
//! The built [`BindingRegistry`] is immutable and `Send + Sync`, so one
//! `Arc<BindingRegistry>` can serve any number of compilations running on
//! different threads.
//!
//! # Example
//!
//! ```
//! use ember_core::{DataType, ScriptValue};
//! use ember_registry::{BindingRegistryBuilder, ImportedFunction};
//!
//! let mut builder = BindingRegistryBuilder::new();
//! builder
//!     .add_imported_function(ImportedFunction::new(
//!         "max",
//!         DataType::object("Math"),
//!         vec![DataType::int(), DataType::int()],
//!         DataType::int(),
//!         |args| Ok(args[0].clone()),
//!     ))
//!     .unwrap();
//! let registry = builder.build();
//!
//! assert!(registry.lookup_imported_function("max", 2).is_some());
//! assert!(registry.lookup_imported_function("max", 1).is_none());
//! ```

use std::sync::Arc;

use ember_core::RegistrationError;

use crate::{BindingTable, ClassBinding, ImportedFunction, InstanceBinding};

/// Mutable registry under construction.
#[derive(Default)]
pub struct BindingRegistryBuilder {
    imported_functions: BindingTable<ImportedFunction>,
    class_bindings: BindingTable<ClassBinding>,
    instance_bindings: BindingTable<InstanceBinding>,
}

fn insert_unique<T>(
    table: &mut BindingTable<T>,
    kind: &'static str,
    name: &str,
    arity: usize,
    entry: T,
) -> Result<(), RegistrationError> {
    if name.is_empty() {
        return Err(RegistrationError::InvalidBinding {
            name: name.to_string(),
            reason: format!("{kind} name must not be empty"),
        });
    }
    if !table.insert(name, arity, Arc::new(entry)) {
        return Err(RegistrationError::DuplicateBinding {
            kind,
            name: name.to_string(),
            arity,
        });
    }
    Ok(())
}

impl BindingRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a static host function.
    pub fn add_imported_function(
        &mut self,
        function: ImportedFunction,
    ) -> Result<&mut Self, RegistrationError> {
        let name = function.name().to_string();
        let arity = function.arity();
        insert_unique(
            &mut self.imported_functions,
            "imported function",
            &name,
            arity,
            function,
        )?;
        Ok(self)
    }

    /// Register a class binding under the length of its declared list.
    pub fn add_class_binding(
        &mut self,
        binding: ClassBinding,
    ) -> Result<&mut Self, RegistrationError> {
        let name = binding.name().to_string();
        let arity = binding.arity();
        insert_unique(&mut self.class_bindings, "class binding", &name, arity, binding)?;
        Ok(self)
    }

    /// Register an instance binding.
    pub fn add_instance_binding(
        &mut self,
        binding: InstanceBinding,
    ) -> Result<&mut Self, RegistrationError> {
        let name = binding.name().to_string();
        let arity = binding.arity();
        insert_unique(
            &mut self.instance_bindings,
            "instance binding",
            &name,
            arity,
            binding,
        )?;
        Ok(self)
    }

    /// Freeze the registry.
    pub fn build(self) -> BindingRegistry {
        tracing::debug!(
            imported_functions = self.imported_functions.len(),
            class_bindings = self.class_bindings.len(),
            instance_bindings = self.instance_bindings.len(),
            "binding registry built"
        );
        BindingRegistry {
            imported_functions: self.imported_functions,
            class_bindings: self.class_bindings,
            instance_bindings: self.instance_bindings,
        }
    }
}

/// Immutable catalog of host callables.
#[derive(Default)]
pub struct BindingRegistry {
    imported_functions: BindingTable<ImportedFunction>,
    class_bindings: BindingTable<ClassBinding>,
    instance_bindings: BindingTable<InstanceBinding>,
}

impl BindingRegistry {
    /// A registry with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> BindingRegistryBuilder {
        BindingRegistryBuilder::new()
    }

    pub fn lookup_imported_function(
        &self,
        name: &str,
        arity: usize,
    ) -> Option<&Arc<ImportedFunction>> {
        self.imported_functions.get(name, arity)
    }

    /// Look up a class binding by the length of its declared list.
    pub fn lookup_class_binding(&self, name: &str, arity: usize) -> Option<&Arc<ClassBinding>> {
        self.class_bindings.get(name, arity)
    }

    pub fn lookup_instance_binding(
        &self,
        name: &str,
        arity: usize,
    ) -> Option<&Arc<InstanceBinding>> {
        self.instance_bindings.get(name, arity)
    }

    pub fn imported_functions(&self) -> &BindingTable<ImportedFunction> {
        &self.imported_functions
    }

    pub fn class_bindings(&self) -> &BindingTable<ClassBinding> {
        &self.class_bindings
    }

    pub fn instance_bindings(&self) -> &BindingTable<InstanceBinding> {
        &self.instance_bindings
    }
}

impl std::fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("imported_functions", &self.imported_functions.len())
            .field("class_bindings", &self.class_bindings.len())
            .field("instance_bindings", &self.instance_bindings.len())
            .finish()
    }
}

impl std::fmt::Debug for BindingRegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingRegistryBuilder")
            .field("imported_functions", &self.imported_functions.len())
            .field("class_bindings", &self.class_bindings.len())
            .field("instance_bindings", &self.instance_bindings.len())
            .finish()
    }
}
