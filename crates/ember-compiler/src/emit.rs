//! Bytecode emitter for the ember compiler.
//!
//! The [`BytecodeEmitter`] provides a high-level API for generating bytecode,
//! handling constants, forward jumps and source lines.
//!
//! # Example
//!
//! ```
//! use ember_compiler::bytecode::{ConstantPool, OpCode};
//! use ember_compiler::emit::BytecodeEmitter;
//!
//! let mut constants = ConstantPool::new();
//! let mut emitter = BytecodeEmitter::new(&mut constants);
//!
//! emitter.set_line(1);
//! emitter.emit_int(42).unwrap();
//! emitter.emit_return();
//!
//! let chunk = emitter.finish();
//! chunk.assert_opcodes(&[OpCode::Constant, OpCode::Return]);
//! ```

use ember_core::{LimitExceeded, TypeHash};

use crate::bytecode::{BytecodeChunk, Constant, ConstantPool, OpCode};

fn constant_index(index: u32) -> Result<u16, LimitExceeded> {
    u16::try_from(index).map_err(|_| LimitExceeded::new("constant pool", u16::MAX as usize + 1))
}

/// A forward jump waiting for its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a jump label must be patched"]
pub struct JumpLabel(usize);

/// Emits bytecode instructions.
///
/// Uses a shared unit-level constant pool for deduplication across functions.
/// Each `BytecodeEmitter` produces bytecode for a single function.
pub struct BytecodeEmitter<'pool> {
    /// The bytecode chunk being built (per-function)
    chunk: BytecodeChunk,

    /// Shared unit-level constant pool (deduplicated)
    constants: &'pool mut ConstantPool,

    /// Current source line for debug info
    current_line: u32,

    /// When false every instruction is recorded at line 0
    line_numbers: bool,
}

impl<'pool> BytecodeEmitter<'pool> {
    /// Create a new bytecode emitter.
    pub fn new(constants: &'pool mut ConstantPool) -> Self {
        Self {
            chunk: BytecodeChunk::new(),
            constants,
            current_line: 1,
            line_numbers: true,
        }
    }

    /// Enable or disable recording of source lines.
    pub fn with_line_numbers(mut self, enabled: bool) -> Self {
        self.line_numbers = enabled;
        if !enabled {
            self.current_line = 0;
        }
        self
    }

    /// Set current source line for debug info.
    ///
    /// All subsequent instructions will be associated with this line number.
    pub fn set_line(&mut self, line: u32) {
        if self.line_numbers {
            self.current_line = line;
        }
    }

    /// Get current source line.
    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    // ==========================================================================
    // Basic Emission
    // ==========================================================================

    /// Emit a single opcode with no operands.
    pub fn emit(&mut self, op: OpCode) {
        self.chunk.write_op(op, self.current_line);
    }

    /// Emit opcode with 8-bit operand.
    pub fn emit_byte(&mut self, op: OpCode, byte: u8) {
        self.chunk.write_op(op, self.current_line);
        self.chunk.write_byte(byte, self.current_line);
    }

    /// Emit opcode with 16-bit operand.
    pub fn emit_u16(&mut self, op: OpCode, value: u16) {
        self.chunk.write_op(op, self.current_line);
        self.chunk.write_u16(value, self.current_line);
    }

    /// Emit opcode with a 16-bit index and an 8-bit argument count.
    fn emit_invoke(&mut self, op: OpCode, index: u16, arg_count: u8) {
        self.emit_u16(op, index);
        self.chunk.write_byte(arg_count, self.current_line);
    }

    /// Emit a constant load instruction.
    ///
    /// Uses narrow (8-bit) or wide (16-bit) index based on pool size.
    pub fn emit_constant(&mut self, constant: Constant) -> Result<(), LimitExceeded> {
        let index = self.constants.add(constant);
        match u8::try_from(index) {
            Ok(narrow) => self.emit_byte(OpCode::Constant, narrow),
            Err(_) => {
                let wide = constant_index(index)?;
                self.emit_u16(OpCode::ConstantWide, wide);
            }
        }
        Ok(())
    }

    // ==========================================================================
    // Constants
    // ==========================================================================

    /// Emit an integer constant.
    ///
    /// Optimizes common cases: 0 uses `PushZero`, 1 uses `PushOne`.
    pub fn emit_int(&mut self, value: i64) -> Result<(), LimitExceeded> {
        match value {
            0 => self.emit(OpCode::PushZero),
            1 => self.emit(OpCode::PushOne),
            _ => return self.emit_constant(Constant::Int(value)),
        }
        Ok(())
    }

    pub fn emit_double(&mut self, value: f64) -> Result<(), LimitExceeded> {
        self.emit_constant(Constant::Double(value))
    }

    pub fn emit_string(&mut self, value: &str) -> Result<(), LimitExceeded> {
        self.emit_constant(Constant::String(value.into()))
    }

    pub fn emit_null(&mut self) {
        self.emit(OpCode::PushNull);
    }

    pub fn emit_bool(&mut self, value: bool) {
        self.emit(if value {
            OpCode::PushTrue
        } else {
            OpCode::PushFalse
        });
    }

    // ==========================================================================
    // Variables and storage
    // ==========================================================================

    /// Emit a parameter load.
    pub fn emit_get_local(&mut self, slot: u8) {
        self.emit_byte(OpCode::GetLocal, slot);
    }

    /// Emit a load of the running script instance's receiver.
    pub fn emit_get_this(&mut self) {
        self.emit(OpCode::GetThis);
    }

    pub fn emit_get_cache(&mut self, field: u16) {
        self.emit_u16(OpCode::GetCache, field);
    }

    pub fn emit_set_cache(&mut self, field: u16) {
        self.emit_u16(OpCode::SetCache, field);
    }

    pub fn emit_get_shared(&mut self, slot: u16) {
        self.emit_u16(OpCode::GetShared, slot);
    }

    pub fn emit_pop(&mut self) {
        self.emit(OpCode::Pop);
    }

    // ==========================================================================
    // Calls
    // ==========================================================================

    /// Emit a call to a function of the unit being compiled.
    pub fn emit_call(&mut self, function: u16, arg_count: u8) {
        self.emit_invoke(OpCode::Call, function, arg_count);
    }

    /// Emit a call to a static host function.
    pub fn emit_call_imported(&mut self, import: u16, arg_count: u8) {
        self.emit_invoke(OpCode::CallImported, import, arg_count);
    }

    /// Emit construction of the class binding behind a cache field.
    pub fn emit_new(&mut self, field: u16, arg_count: u8) {
        self.emit_invoke(OpCode::New, field, arg_count);
    }

    pub fn emit_invoke_class_binding(&mut self, field: u16, arg_count: u8) {
        self.emit_invoke(OpCode::InvokeClassBinding, field, arg_count);
    }

    pub fn emit_invoke_instance_binding(&mut self, binding: u16, arg_count: u8) {
        self.emit_invoke(OpCode::InvokeInstanceBinding, binding, arg_count);
    }

    /// Emit return with value.
    pub fn emit_return(&mut self) {
        self.emit(OpCode::Return);
    }

    /// Emit return from void function.
    pub fn emit_return_void(&mut self) {
        self.emit(OpCode::ReturnVoid);
    }

    // ==========================================================================
    // Conversions
    // ==========================================================================

    pub fn emit_i64_to_f64(&mut self) {
        self.emit(OpCode::I64toF64);
    }

    /// Emit a runtime type check against `target`.
    pub fn emit_cast(&mut self, target: TypeHash) -> Result<(), LimitExceeded> {
        let index = constant_index(self.constants.add_type_hash(target))?;
        self.emit_u16(OpCode::Cast, index);
        Ok(())
    }

    // ==========================================================================
    // Jumps
    // ==========================================================================

    /// Emit a forward jump (target unknown).
    ///
    /// Returns a label that must be patched later with [`Self::patch_jump`].
    pub fn emit_jump(&mut self, op: OpCode) -> JumpLabel {
        JumpLabel(self.chunk.write_jump(op, self.current_line))
    }

    /// Patch a forward jump to the current position.
    ///
    /// Fails when the code jumped over is longer than a 16-bit distance.
    pub fn patch_jump(&mut self, label: JumpLabel) -> Result<(), LimitExceeded> {
        self.chunk.patch_jump(label.0)
    }

    // ==========================================================================
    // Finalization
    // ==========================================================================

    /// Finish emission and return the bytecode chunk.
    pub fn finish(self) -> BytecodeChunk {
        self.chunk
    }
}
