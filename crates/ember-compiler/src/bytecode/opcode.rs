//! Bytecode operation codes.
//!
//! Each opcode is a single byte, with operands following inline in
//! big-endian order.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Bytecode operation codes.
///
/// The VM is a stack machine. Operations pop their operands from the stack
/// and push their result. Every call instruction pushes exactly one value,
/// [`ScriptValue::Void`](ember_core::ScriptValue::Void) for `void` callees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Constants
    // =========================================================================
    /// Push constant from pool (8-bit index).
    /// Operand: u8 constant index
    Constant = 0,
    /// Push constant from pool (16-bit index).
    /// Operand: u16 constant index
    ConstantWide,
    /// Push null reference.
    PushNull,
    /// Push boolean true.
    PushTrue,
    /// Push boolean false.
    PushFalse,
    /// Push integer 0.
    PushZero,
    /// Push integer 1.
    PushOne,

    // =========================================================================
    // Stack and variables
    // =========================================================================
    /// Pop top of stack.
    Pop,
    /// Push a function argument.
    /// Operand: u8 parameter slot
    GetLocal,
    /// Push the receiver of the running script instance.
    GetThis,

    // =========================================================================
    // Instance and shared storage
    // =========================================================================
    /// Push a per-instance cache field (null while unset).
    /// Operand: u16 cache field index
    GetCache,
    /// Pop a value and store it in a per-instance cache field.
    /// Operand: u16 cache field index
    SetCache,
    /// Push a shared slot of the script class.
    /// Operand: u16 shared slot index
    GetShared,

    // =========================================================================
    // Control flow
    // =========================================================================
    /// Pop a value; jump forward if it is not null.
    /// Operand: u16 forward offset
    JumpIfNotNull,

    // =========================================================================
    // Calls
    // =========================================================================
    /// Call a function of the same unit.
    /// Operands: u16 function index, u8 argument count
    Call,
    /// Call a static host function.
    /// Operands: u16 import index, u8 argument count
    CallImported,
    /// Construct the class binding of a cache field; pushes the object.
    /// Operands: u16 cache field index, u8 argument count
    New,
    /// Invoke a class binding's method. The target object sits below the
    /// arguments.
    /// Operands: u16 cache field index, u8 argument count
    InvokeClassBinding,
    /// Invoke an instance binding's method. The target object sits below the
    /// arguments.
    /// Operands: u16 shared slot index, u8 argument count
    InvokeInstanceBinding,

    // =========================================================================
    // Conversions
    // =========================================================================
    /// Widen int to double.
    I64toF64,
    /// Check that the top of stack holds the given type.
    /// Operand: u16 constant index of a type hash
    Cast,

    // =========================================================================
    // Return
    // =========================================================================
    /// Return the top of stack.
    Return,
    /// Return from a void function.
    ReturnVoid,
}

impl OpCode {
    /// Convert from u8, returning None for invalid values.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Number of operand bytes following the opcode.
    pub fn operand_size(&self) -> usize {
        match self {
            OpCode::ConstantWide
            | OpCode::GetCache
            | OpCode::SetCache
            | OpCode::GetShared
            | OpCode::JumpIfNotNull
            | OpCode::Cast => 2,

            OpCode::Call
            | OpCode::CallImported
            | OpCode::New
            | OpCode::InvokeClassBinding
            | OpCode::InvokeInstanceBinding => 3,

            OpCode::Constant | OpCode::GetLocal => 1,

            OpCode::PushNull
            | OpCode::PushTrue
            | OpCode::PushFalse
            | OpCode::PushZero
            | OpCode::PushOne
            | OpCode::Pop
            | OpCode::GetThis
            | OpCode::I64toF64
            | OpCode::Return
            | OpCode::ReturnVoid => 0,
        }
    }

    /// Get the opcode name for disassembly.
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::Constant => "CONSTANT",
            OpCode::ConstantWide => "CONSTANT_WIDE",
            OpCode::PushNull => "PUSH_NULL",
            OpCode::PushTrue => "PUSH_TRUE",
            OpCode::PushFalse => "PUSH_FALSE",
            OpCode::PushZero => "PUSH_ZERO",
            OpCode::PushOne => "PUSH_ONE",
            OpCode::Pop => "POP",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::GetThis => "GET_THIS",
            OpCode::GetCache => "GET_CACHE",
            OpCode::SetCache => "SET_CACHE",
            OpCode::GetShared => "GET_SHARED",
            OpCode::JumpIfNotNull => "JUMP_IF_NOT_NULL",
            OpCode::Call => "CALL",
            OpCode::CallImported => "CALL_IMPORTED",
            OpCode::New => "NEW",
            OpCode::InvokeClassBinding => "INVOKE_CLASS_BINDING",
            OpCode::InvokeInstanceBinding => "INVOKE_INSTANCE_BINDING",
            OpCode::I64toF64 => "I64_TO_F64",
            OpCode::Cast => "CAST",
            OpCode::Return => "RETURN",
            OpCode::ReturnVoid => "RETURN_VOID",
        }
    }
}
