//! Binding registry for ember.
//!
//! Hosts describe the capabilities scripts may call as three kinds of entry:
//!
//! - [`ImportedFunction`]: a static host function.
//! - [`ClassBinding`]: a host class constructed lazily per script instance
//!   and call site, paired with one method.
//! - [`InstanceBinding`]: a method on a single host object shared by all
//!   script instances.
//!
//! Entries are collected with a [`BindingRegistryBuilder`] and frozen into an
//! immutable, thread-safe [`BindingRegistry`].

mod entries;
mod registry;
mod table;

pub use entries::{ClassBinding, ImportedFunction, InstanceBinding, NativeFn};
pub use registry::{BindingRegistry, BindingRegistryBuilder};
pub use table::BindingTable;
