//! Ember: an embeddable, sandboxed scripting language.
//!
//! Scripts call into the host through a [`BindingRegistry`] of three kinds of
//! entries:
//!
//! - **imported functions**: static host functions
//! - **class bindings**: host objects constructed lazily, once per script
//!   instance and call site, then invoked through a fixed method
//! - **instance bindings**: a method on one shared host object
//!
//! A [`Context`] compiles a [`ScriptUnit`] into a [`ScriptClass`]; each
//! [`ScriptInstance`] of that class runs against its own receiver object.
//!
//! ## Crates
//!
//! - `ember-core`: types, values and errors
//! - `ember-registry`: the binding registry
//! - `ember-compiler`: call resolution, code generation and the unit compiler

mod context;
mod script;
mod vm;

pub use context::Context;
pub use script::{ScriptClass, ScriptInstance};
pub use vm::MAX_CALL_DEPTH;

pub use ember_compiler::{
    CompiledUnit, CompilerSettings, Expr, FunctionDecl, Literal, Param, ScriptUnit,
};
pub use ember_core::{
    CompilationError, CompilationErrors, DataType, EmberError, LimitExceeded, NativeError,
    ObjectRef, RegistrationError, RuntimeError, ScriptValue, Span, TypeHash,
};
pub use ember_registry::{
    BindingRegistry, BindingRegistryBuilder, ClassBinding, ImportedFunction, InstanceBinding,
};
