//! Ember Compiler
//!
//! Turns analyzed expression trees into stack bytecode.
//!
//! ## Modules
//!
//! - [`ast`]: Expression nodes and the analyze/write contract
//! - [`bytecode`]: Bytecode types (OpCode, BytecodeChunk, ConstantPool)
//! - [`call`]: Resolution and code generation for unqualified calls
//! - [`compiler`]: Unit compiler driver
//! - [`conversion`]: Implicit conversions and the [`Caster`]
//! - [`emit`]: High-level bytecode emitter
//! - [`locals`]: Function table and parameter scope seen during analysis
//! - [`settings`]: Compiler settings
//! - [`slots`]: Cache fields, shared slots and link tables

pub mod ast;
pub mod bytecode;
pub mod call;
pub mod compiler;
pub mod conversion;
pub mod emit;
pub mod locals;
pub mod settings;
pub mod slots;

pub use ast::{AstNode, Expr, ExprFlags, Literal};
pub use call::{CallLocalExpr, CallResolution, resolve_call};
pub use compiler::{CompiledFunction, CompiledUnit, Compiler, FunctionDecl, Param, ScriptUnit};
pub use conversion::{Caster, ConversionKind, ImplicitCaster, find_conversion};
pub use emit::{BytecodeEmitter, JumpLabel};
pub use locals::{FunctionTable, LocalFunction, Locals};
pub use settings::{CompilerSettings, MAX_CALL_ARGUMENTS};
pub use slots::{CacheField, LinkTables, SharedSlot, SlotAllocator};

// Re-export the error types from core for convenience
pub use ember_core::{CompilationError, CompilationErrors};
