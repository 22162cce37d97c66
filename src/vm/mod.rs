//! Stack interpreter for compiled units.
//!
//! One [`Vm`] runs one `execute` call of a script instance. Every value an
//! instruction produces goes on the operand stack; a call's arguments sit on
//! the stack above the callee frame's base pointer, where `GetLocal` reads
//! them.

mod frame;

use std::sync::Arc;

use ember_compiler::CompiledUnit;
use ember_compiler::bytecode::{BytecodeChunk, Constant, OpCode};
use ember_core::{ObjectRef, RuntimeError, ScriptValue, TypeHash, primitives};

use self::frame::CallFrame;
use crate::script::ScriptClass;

/// Deepest nesting of script function calls.
pub const MAX_CALL_DEPTH: usize = 256;

fn malformed(offset: usize, detail: impl Into<String>) -> RuntimeError {
    RuntimeError::MalformedBytecode {
        offset,
        detail: detail.into(),
    }
}

fn unknown(kind: &'static str, index: usize) -> RuntimeError {
    RuntimeError::UnknownIndex { kind, index }
}

fn operand_u8(chunk: &BytecodeChunk, offset: usize) -> Result<u8, RuntimeError> {
    chunk
        .read_byte(offset)
        .ok_or_else(|| malformed(offset, "truncated operand"))
}

fn operand_u16(chunk: &BytecodeChunk, offset: usize) -> Result<u16, RuntimeError> {
    chunk
        .read_u16(offset)
        .ok_or_else(|| malformed(offset, "truncated operand"))
}

/// Name of a type known only by hash, for error messages.
fn type_name(hash: TypeHash) -> String {
    match hash {
        primitives::BOOL => "boolean".to_string(),
        primitives::INT => "int".to_string(),
        primitives::DOUBLE => "double".to_string(),
        primitives::STRING => "String".to_string(),
        primitives::DYNAMIC => "def".to_string(),
        other => format!("{other:?}"),
    }
}

/// Runtime check behind `Cast`: `def` to a concrete type.
fn checked_cast(value: ScriptValue, target: TypeHash) -> Result<ScriptValue, RuntimeError> {
    let found = value.data_type();
    if found.type_hash == target {
        return Ok(value);
    }
    match value {
        ScriptValue::Int(i) if target == primitives::DOUBLE => Ok(ScriptValue::Double(i as f64)),
        ScriptValue::Null
            if !matches!(
                target,
                primitives::BOOL | primitives::INT | primitives::DOUBLE
            ) =>
        {
            Ok(ScriptValue::Null)
        }
        _ => Err(RuntimeError::InvalidCast {
            expected: type_name(target),
            found: found.name().to_string(),
        }),
    }
}

/// Executes the functions of one script class against one instance.
pub(crate) struct Vm<'a> {
    class: &'a ScriptClass,
    receiver: &'a ObjectRef,
    cache: &'a mut [Option<ObjectRef>],
    stack: Vec<ScriptValue>,
    frames: Vec<CallFrame>,
}

impl<'a> Vm<'a> {
    pub fn new(class: &'a ScriptClass, receiver: &'a ObjectRef, cache: &'a mut [Option<ObjectRef>]) -> Self {
        Self {
            class,
            receiver,
            cache,
            stack: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Run `main` with `args` and return its result.
    pub fn run(mut self, args: &[ScriptValue]) -> Result<ScriptValue, RuntimeError> {
        let main = self.class.unit().main();
        if args.len() != main.arity {
            return Err(RuntimeError::ArgumentCount {
                function: main.name.clone(),
                expected: main.arity,
                got: args.len(),
            });
        }

        self.stack.extend_from_slice(args);
        self.frames.push(CallFrame::new(0, 0));
        loop {
            if let Some(result) = self.step()? {
                return Ok(result);
            }
        }
    }

    fn pop(&mut self, offset: usize) -> Result<ScriptValue, RuntimeError> {
        self.stack
            .pop()
            .ok_or(RuntimeError::StackUnderflow { offset })
    }

    fn pop_args(&mut self, count: u8, offset: usize) -> Result<Vec<ScriptValue>, RuntimeError> {
        let start = self
            .stack
            .len()
            .checked_sub(count as usize)
            .ok_or(RuntimeError::StackUnderflow { offset })?;
        Ok(self.stack.split_off(start))
    }

    fn pop_object(&mut self, offset: usize) -> Result<ObjectRef, RuntimeError> {
        match self.pop(offset)? {
            ScriptValue::Object(obj) => Ok(obj),
            other => Err(malformed(
                offset,
                format!("expected an object, found {}", other.data_type()),
            )),
        }
    }

    fn cache_field(&mut self, field: u16) -> Result<&mut Option<ObjectRef>, RuntimeError> {
        self.cache
            .get_mut(field as usize)
            .ok_or_else(|| unknown("cache field", field as usize))
    }

    fn push_constant(&mut self, unit: &CompiledUnit, index: u32, offset: usize) -> Result<(), RuntimeError> {
        let value = match unit.constants.get(index) {
            Some(Constant::Int(i)) => ScriptValue::Int(*i),
            Some(Constant::Double(d)) => ScriptValue::Double(*d),
            Some(Constant::String(s)) => ScriptValue::String(Arc::clone(s)),
            Some(Constant::TypeHash(_)) => return Err(malformed(offset, "type hash loaded as a value")),
            None => return Err(unknown("constant", index as usize)),
        };
        self.stack.push(value);
        Ok(())
    }

    /// Execute one instruction. Returns the result once `main` returns.
    fn step(&mut self) -> Result<Option<ScriptValue>, RuntimeError> {
        let class: &'a ScriptClass = self.class;
        let unit = class.unit();
        let Some(frame) = self.frames.last().copied() else {
            return Err(malformed(0, "no active frame"));
        };
        let function = unit
            .function(frame.function)
            .ok_or_else(|| unknown("function", frame.function as usize))?;
        let chunk = &function.chunk;

        let at = frame.ip;
        let byte = chunk
            .read_byte(at)
            .ok_or_else(|| malformed(at, format!("'{}' has no return", function.name)))?;
        let op = OpCode::from_u8(byte).ok_or_else(|| malformed(at, format!("unknown opcode {byte:#04x}")))?;
        if let Some(frame) = self.frames.last_mut() {
            frame.ip = at + 1 + op.operand_size();
        }

        match op {
            OpCode::Constant => {
                let index = operand_u8(chunk, at + 1)?;
                self.push_constant(unit, index as u32, at)?;
            }
            OpCode::ConstantWide => {
                let index = operand_u16(chunk, at + 1)?;
                self.push_constant(unit, index as u32, at)?;
            }
            OpCode::PushNull => self.stack.push(ScriptValue::Null),
            OpCode::PushTrue => self.stack.push(ScriptValue::Bool(true)),
            OpCode::PushFalse => self.stack.push(ScriptValue::Bool(false)),
            OpCode::PushZero => self.stack.push(ScriptValue::Int(0)),
            OpCode::PushOne => self.stack.push(ScriptValue::Int(1)),
            OpCode::Pop => {
                self.pop(at)?;
            }

            OpCode::GetLocal => {
                let slot = operand_u8(chunk, at + 1)? as usize;
                let value = self
                    .stack
                    .get(frame.base_pointer + slot)
                    .cloned()
                    .ok_or(RuntimeError::StackUnderflow { offset: at })?;
                self.stack.push(value);
            }
            OpCode::GetThis => self.stack.push(ScriptValue::Object(self.receiver.clone())),
            OpCode::GetCache => {
                let field = operand_u16(chunk, at + 1)?;
                let value = match self.cache_field(field)? {
                    Some(obj) => ScriptValue::Object(obj.clone()),
                    None => ScriptValue::Null,
                };
                self.stack.push(value);
            }
            OpCode::SetCache => {
                let field = operand_u16(chunk, at + 1)?;
                let obj = self.pop_object(at)?;
                *self.cache_field(field)? = Some(obj);
            }
            OpCode::GetShared => {
                let slot = operand_u16(chunk, at + 1)?;
                let target = class
                    .shared_slot(slot)
                    .ok_or_else(|| unknown("shared slot", slot as usize))?;
                self.stack.push(ScriptValue::Object(target.clone()));
            }
            OpCode::JumpIfNotNull => {
                let distance = operand_u16(chunk, at + 1)? as usize;
                if !self.pop(at)?.is_null()
                    && let Some(frame) = self.frames.last_mut()
                {
                    frame.ip += distance;
                }
            }

            OpCode::Call => {
                let index = operand_u16(chunk, at + 1)?;
                let argc = operand_u8(chunk, at + 3)? as usize;
                let callee = unit
                    .function(index)
                    .ok_or_else(|| unknown("function", index as usize))?;
                if argc != callee.arity {
                    return Err(RuntimeError::ArgumentCount {
                        function: callee.name.clone(),
                        expected: callee.arity,
                        got: argc,
                    });
                }
                if self.frames.len() >= MAX_CALL_DEPTH {
                    return Err(RuntimeError::StackOverflow {
                        limit: MAX_CALL_DEPTH,
                    });
                }
                let base_pointer = self
                    .stack
                    .len()
                    .checked_sub(argc)
                    .ok_or(RuntimeError::StackUnderflow { offset: at })?;
                self.frames.push(CallFrame::new(index, base_pointer));
            }
            OpCode::CallImported => {
                let index = operand_u16(chunk, at + 1)?;
                let argc = operand_u8(chunk, at + 3)?;
                let function = unit
                    .imports
                    .get(index as usize)
                    .ok_or_else(|| unknown("imported function", index as usize))?;
                let args = self.pop_args(argc, at)?;
                let result = function
                    .invoke(&args)
                    .map_err(|source| RuntimeError::Native {
                        function: function.name().to_string(),
                        source,
                    })?;
                self.stack.push(result);
            }
            OpCode::New => {
                let field = operand_u16(chunk, at + 1)?;
                let argc = operand_u8(chunk, at + 3)?;
                let cache_field = unit
                    .cache_fields
                    .get(field as usize)
                    .ok_or_else(|| unknown("cache field", field as usize))?;
                let args = self.pop_args(argc, at)?;
                tracing::trace!(
                    binding = cache_field.binding.name(),
                    field = %cache_field.name,
                    "constructing class binding"
                );
                let obj = cache_field
                    .binding
                    .construct(&args)
                    .map_err(|source| RuntimeError::Native {
                        function: cache_field.binding.name().to_string(),
                        source,
                    })?;
                self.stack.push(ScriptValue::Object(obj));
            }
            OpCode::InvokeClassBinding => {
                let field = operand_u16(chunk, at + 1)?;
                let argc = operand_u8(chunk, at + 3)?;
                let binding = &unit
                    .cache_fields
                    .get(field as usize)
                    .ok_or_else(|| unknown("cache field", field as usize))?
                    .binding;
                let args = self.pop_args(argc, at)?;
                let target = self.pop_object(at)?;
                let result = binding
                    .invoke(&target, &args)
                    .map_err(|source| RuntimeError::Native {
                        function: binding.name().to_string(),
                        source,
                    })?;
                self.stack.push(result);
            }
            OpCode::InvokeInstanceBinding => {
                let index = operand_u16(chunk, at + 1)?;
                let argc = operand_u8(chunk, at + 3)?;
                let binding = unit
                    .instance_bindings
                    .get(index as usize)
                    .ok_or_else(|| unknown("instance binding", index as usize))?;
                let args = self.pop_args(argc, at)?;
                let target = self.pop_object(at)?;
                let result = binding
                    .invoke(&target, &args)
                    .map_err(|source| RuntimeError::Native {
                        function: binding.name().to_string(),
                        source,
                    })?;
                self.stack.push(result);
            }

            OpCode::I64toF64 => match self.pop(at)? {
                ScriptValue::Int(i) => self.stack.push(ScriptValue::Double(i as f64)),
                other => {
                    return Err(RuntimeError::InvalidCast {
                        expected: "double".to_string(),
                        found: other.data_type().name().to_string(),
                    });
                }
            },
            OpCode::Cast => {
                let index = operand_u16(chunk, at + 1)? as u32;
                let target = match unit.constants.get(index) {
                    Some(Constant::TypeHash(hash)) => *hash,
                    Some(_) => return Err(malformed(at, "cast target is not a type")),
                    None => return Err(unknown("constant", index as usize)),
                };
                let value = self.pop(at)?;
                self.stack.push(checked_cast(value, target)?);
            }

            OpCode::Return | OpCode::ReturnVoid => {
                let value = if op == OpCode::Return {
                    self.pop(at)?
                } else {
                    ScriptValue::Void
                };
                self.frames.pop();
                self.stack.truncate(frame.base_pointer);
                if self.frames.is_empty() {
                    return Ok(Some(value));
                }
                self.stack.push(value);
            }
        }

        Ok(None)
    }
}
