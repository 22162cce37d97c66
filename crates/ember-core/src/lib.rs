//! Core types shared by every ember crate.
//!
//! This crate holds the pieces the registry, the compiler and the runtime all
//! need to agree on: source spans, type identity, runtime values and the
//! error hierarchy.

mod data_type;
pub mod error;
mod span;
mod type_hash;
mod value;

pub use data_type::DataType;
pub use error::{
    CompilationError, CompilationErrors, EmberError, LimitExceeded, NativeError,
    RegistrationError, RuntimeError,
};
pub use span::Span;
pub use type_hash::{TypeHash, hash_constants, primitives};
pub use value::{ObjectRef, ScriptValue};
