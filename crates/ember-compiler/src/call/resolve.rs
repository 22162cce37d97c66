//! Call resolution.
//!
//! First match wins:
//!
//! 1. local function `name`/N
//! 2. imported function `name`/N
//! 3. class binding `name`/N, unless its first constructor parameter is the
//!    base type
//! 4. class binding `name`/N+1 whose first constructor parameter is the base
//!    type, with the receiver injected
//! 5. instance binding `name`/N
//!
//! Step 4 only covers a receiver in the first constructor position. A class
//! binding rejected at step 3 is not reconsidered.

use std::sync::Arc;

use ember_core::{CompilationError, Span};

use super::CallResolution;
use crate::locals::Locals;

/// Resolve `name` called with `arity` arguments.
pub fn resolve_call(
    name: &str,
    arity: usize,
    locals: &Locals<'_>,
    span: Span,
) -> Result<CallResolution, CompilationError> {
    if let Some(function) = locals.lookup_local_function(name, arity) {
        return Ok(CallResolution::LocalFunction(Arc::clone(function)));
    }

    let registry = locals.registry();
    if let Some(function) = registry.lookup_imported_function(name, arity) {
        return Ok(CallResolution::ImportedFunction(Arc::clone(function)));
    }

    let base_type = locals.base_type();
    if let Some(binding) = registry.lookup_class_binding(name, arity)
        && !binding.takes_receiver(base_type)
    {
        return Ok(CallResolution::ClassBinding {
            binding: Arc::clone(binding),
            receiver_injected: false,
        });
    }

    if let Some(binding) = registry.lookup_class_binding(name, arity + 1)
        && binding.takes_receiver(base_type)
    {
        return Ok(CallResolution::ClassBinding {
            binding: Arc::clone(binding),
            receiver_injected: true,
        });
    }

    if let Some(binding) = registry.lookup_instance_binding(name, arity) {
        return Ok(CallResolution::InstanceBinding(Arc::clone(binding)));
    }

    Err(CompilationError::UnresolvedCall {
        name: name.to_string(),
        arity,
        span,
    })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::locals::FunctionTable;
    use ember_core::DataType;

    fn resolve(name: &str, arity: usize) -> Result<CallResolution, CompilationError> {
        let registry = registry();
        let functions = functions();
        let base = script_type();
        let locals = Locals::new(&registry, &base, &functions);
        resolve_call(name, arity, &locals, span())
    }

    #[test]
    fn local_function_wins() {
        // `shadow`/1 exists in every table.
        let resolution = resolve("shadow", 1).unwrap();
        assert!(matches!(resolution, CallResolution::LocalFunction(ref f) if f.name() == "shadow"));
    }

    #[test]
    fn imported_before_bindings() {
        let registry = registry();
        let functions = FunctionTable::new();
        let base = script_type();
        let locals = Locals::new(&registry, &base, &functions);

        let resolution = resolve_call("shadow", 1, &locals, span()).unwrap();
        assert!(matches!(resolution, CallResolution::ImportedFunction(_)));
    }

    #[test]
    fn receiver_injection() {
        let resolution = resolve("Make", 1).unwrap();
        let CallResolution::ClassBinding {
            binding,
            receiver_injected,
        } = &resolution
        else {
            panic!("expected class binding, got {}", resolution.kind());
        };
        assert!(receiver_injected);
        assert_eq!(binding.name(), "Make");
        assert_eq!(resolution.argument_types(), &[DataType::int()]);
        assert_eq!(resolution.constructor_argument_count(), 1);
    }

    #[test]
    fn receiver_injection_with_method_arguments() {
        let resolution = resolve("Tally", 2).unwrap();
        assert_eq!(resolution.offset(), 1);
        assert_eq!(resolution.constructor_argument_count(), 1);
        assert_eq!(resolution.argument_types().len(), 2);
        assert!(resolve("Tally", 3).is_err());
    }

    #[test]
    fn receiver_not_injected_without_base_type() {
        let resolution = resolve("Build", 1).unwrap();
        assert!(matches!(
            resolution,
            CallResolution::ClassBinding {
                receiver_injected: false,
                ..
            }
        ));
        assert_eq!(resolution.offset(), 0);
    }

    #[test]
    fn receiver_taking_binding_deferred_at_same_arity() {
        // `Deferred`/1 takes the receiver, so a one-argument call skips it and
        // falls through to the instance binding of the same name.
        let resolution = resolve("Deferred", 1).unwrap();
        assert!(matches!(resolution, CallResolution::InstanceBinding(_)));

        // With no arguments it matches one arity up, injected.
        let resolution = resolve("Deferred", 0).unwrap();
        assert!(matches!(
            resolution,
            CallResolution::ClassBinding {
                receiver_injected: true,
                ..
            }
        ));
        assert!(resolution.argument_types().is_empty());
    }

    #[test]
    fn plain_class_binding_before_injected_one() {
        // `Prefer`/2 would take the receiver, but `Prefer`/1 matches first.
        let resolution = resolve("Prefer", 1).unwrap();
        let CallResolution::ClassBinding {
            binding,
            receiver_injected,
        } = &resolution
        else {
            panic!("expected class binding, got {}", resolution.kind());
        };
        assert!(!receiver_injected);
        assert_eq!(binding.arity(), 1);
    }

    #[test]
    fn injected_class_binding_before_instance_binding() {
        // `Attach`/1 is also an instance binding, which only comes last.
        let resolution = resolve("Attach", 1).unwrap();
        let CallResolution::ClassBinding {
            binding,
            receiver_injected,
        } = &resolution
        else {
            panic!("expected class binding, got {}", resolution.kind());
        };
        assert!(receiver_injected);
        assert_eq!(binding.arity(), 2);
        assert_eq!(resolution.argument_types(), &[DataType::int()]);
    }

    #[test]
    fn zero_parameter_constructor_is_not_injected() {
        let resolution = resolve("Zero", 1).unwrap();
        assert!(matches!(
            resolution,
            CallResolution::ClassBinding {
                receiver_injected: false,
                ..
            }
        ));
        assert_eq!(resolution.constructor_argument_count(), 0);
        assert_eq!(resolution.argument_types(), &[DataType::int()]);
    }

    #[test]
    fn injection_requires_base_type_in_first_position() {
        // `Build`/1 does not take the receiver, so `Build()` is not rewritten
        // into it.
        let err = resolve("Build", 0).unwrap_err();
        assert!(matches!(err, CompilationError::UnresolvedCall { arity: 0, .. }));
    }

    #[test]
    fn instance_binding() {
        let resolution = resolve("total", 0).unwrap();
        assert!(matches!(resolution, CallResolution::InstanceBinding(ref b) if b.name() == "total"));
    }

    #[test]
    fn unknown_call() {
        let err = resolve("Foo", 2).unwrap_err();
        assert_eq!(
            err,
            CompilationError::UnresolvedCall {
                name: "Foo".to_string(),
                arity: 2,
                span: span(),
            }
        );
        assert_eq!(err.to_string(), "at 1:1: unknown call [Foo] with [2] arguments");
    }

    #[test]
    fn arity_is_part_of_identity() {
        assert!(resolve("lookup", 1).is_ok());
        assert!(resolve("lookup", 2).is_err());
        assert!(resolve("helper", 1).is_err());
    }
}
