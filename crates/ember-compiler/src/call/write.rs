//! Code generation for resolved calls.

use std::sync::Arc;

use ember_core::{CompilationError, Span};
use ember_registry::ClassBinding;

use super::CallResolution;
use crate::ast::{AstNode, Expr};
use crate::bytecode::OpCode;
use crate::emit::BytecodeEmitter;
use crate::slots::SlotAllocator;

fn count_u8(count: usize) -> u8 {
    match u8::try_from(count) {
        Ok(count) => count,
        Err(_) => panic!("argument count {count} does not fit an operand"),
    }
}

fn write_arguments(
    arguments: &[Expr],
    emitter: &mut BytecodeEmitter<'_>,
    slots: &mut SlotAllocator,
) -> Result<(), CompilationError> {
    for argument in arguments {
        argument.write(emitter, slots)?;
    }
    Ok(())
}

/// Emit the code for a call, leaving its result on the stack.
///
/// Overflowing a link table or the construction jump is reported at `span`.
///
/// # Panics
///
/// Panics if the call is unresolved, or if the argument count does not line
/// up with the resolved parameters.
pub(super) fn write_call(
    resolution: &CallResolution,
    arguments: &[Expr],
    span: Span,
    emitter: &mut BytecodeEmitter<'_>,
    slots: &mut SlotAllocator,
) -> Result<(), CompilationError> {
    assert_eq!(
        arguments.len() + resolution.offset(),
        resolution.parameters().len(),
        "arguments do not line up with the {} parameters",
        resolution.kind()
    );

    match resolution {
        CallResolution::Unresolved => panic!("call written before it was resolved"),
        CallResolution::LocalFunction(function) => {
            write_arguments(arguments, emitter, slots)?;
            emitter.emit_call(function.index(), count_u8(arguments.len()));
        }
        CallResolution::ImportedFunction(function) => {
            write_arguments(arguments, emitter, slots)?;
            let import = slots.link_import(function).map_err(|e| e.at(span))?;
            emitter.emit_call_imported(import, count_u8(arguments.len()));
        }
        CallResolution::ClassBinding {
            binding,
            receiver_injected,
        } => write_class_binding(
            binding,
            *receiver_injected,
            resolution.constructor_argument_count(),
            arguments,
            span,
            emitter,
            slots,
        )?,
        CallResolution::InstanceBinding(binding) => {
            let (slot, index) = slots
                .allocate_instance_binding(binding)
                .map_err(|e| e.at(span))?;
            tracing::trace!(binding = binding.name(), slot, index, "instance binding call");

            emitter.emit_get_shared(slot);
            write_arguments(arguments, emitter, slots)?;
            emitter.emit_invoke_instance_binding(index, count_u8(arguments.len()));
        }
    }
    Ok(())
}

/// ```text
///     GetCache f
///     JumpIfNotNull done
///     [GetThis]                     receiver, when injected
///     <constructor arguments>
///     New f <constructor arity>
///     SetCache f
/// done:
///     GetCache f
///     <method arguments>
///     InvokeClassBinding f <method arity>
/// ```
fn write_class_binding(
    binding: &Arc<ClassBinding>,
    receiver_injected: bool,
    constructor_arguments: usize,
    arguments: &[Expr],
    span: Span,
    emitter: &mut BytecodeEmitter<'_>,
    slots: &mut SlotAllocator,
) -> Result<(), CompilationError> {
    let field = slots.allocate_cache_field(binding).map_err(|e| e.at(span))?;
    tracing::trace!(
        binding = binding.name(),
        field,
        receiver_injected,
        "class binding call"
    );

    emitter.emit_get_cache(field);
    let constructed = emitter.emit_jump(OpCode::JumpIfNotNull);
    if receiver_injected {
        emitter.emit_get_this();
    }
    let (constructor, method) = arguments.split_at(constructor_arguments);
    write_arguments(constructor, emitter, slots)?;
    emitter.emit_new(field, count_u8(binding.constructor_arity()));
    emitter.emit_set_cache(field);
    emitter.patch_jump(constructed).map_err(|e| e.at(span))?;

    emitter.emit_get_cache(field);
    write_arguments(method, emitter, slots)?;
    emitter.emit_invoke_class_binding(field, count_u8(method.len()));
    Ok(())
}
