//! Implicit type conversions.
//!
//! ## Conversion rules
//!
//! Checked in this order:
//! 1. Identity (same type): no conversion
//! 2. `int` to `double`: widening
//! 3. `null` to any reference type
//! 4. Anything but `void` to `def`
//! 5. `def` to anything but `void`: checked when it runs
//!
//! Everything else is a type mismatch.

use ember_core::{CompilationError, DataType};

use crate::ast::{AstNode, CastExpr, Expr};

/// The kind of conversion being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    /// `int` to `double`.
    IntToDouble,
    /// Null literal to a reference type.
    NullToReference,
    /// Any value to `def`.
    ToDynamic,
    /// `def` to a concrete type, verified at run time.
    FromDynamic,
}

/// Find the implicit conversion from `from` to `to`.
///
/// Returns `Some(None)` when no conversion is needed and `None` when the
/// types are incompatible.
pub fn find_conversion(from: &DataType, to: &DataType) -> Option<Option<ConversionKind>> {
    if from == to {
        return Some(None);
    }
    if from.is_void() || to.is_void() {
        return None;
    }
    if *from == DataType::int() && *to == DataType::double() {
        return Some(Some(ConversionKind::IntToDouble));
    }
    if from.is_null() && to.is_reference() {
        return Some(Some(ConversionKind::NullToReference));
    }
    if to.is_dynamic() {
        return Some(Some(ConversionKind::ToDynamic));
    }
    if from.is_dynamic() {
        return Some(Some(ConversionKind::FromDynamic));
    }
    None
}

/// Coerces an analyzed expression to the type its position requires.
pub trait Caster {
    /// Convert `expr` in place to `expected`, or fail with
    /// [`CompilationError::TypeMismatch`].
    ///
    /// # Panics
    ///
    /// Panics if `expr` has not been analyzed.
    fn cast(&self, expr: &mut Expr, expected: &DataType) -> Result<(), CompilationError>;
}

/// The language's implicit conversion rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImplicitCaster;

impl Caster for ImplicitCaster {
    fn cast(&self, expr: &mut Expr, expected: &DataType) -> Result<(), CompilationError> {
        let Some(found) = expr.result_type() else {
            panic!("cast of unanalyzed expression {expr}");
        };
        match find_conversion(&found, expected) {
            Some(None) => Ok(()),
            Some(Some(kind)) => {
                expr.wrap(|inner| CastExpr::new(inner, kind, expected.clone()));
                Ok(())
            }
            None => Err(CompilationError::TypeMismatch {
                expected: expected.to_string(),
                found: found.to_string(),
                span: expr.span(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locals::{FunctionTable, Locals};
    use ember_core::Span;
    use ember_registry::BindingRegistry;

    fn analyzed(mut expr: Expr) -> Expr {
        let registry = BindingRegistry::empty();
        let base = DataType::object("Script");
        let functions = FunctionTable::new();
        let mut locals = Locals::new(&registry, &base, &functions);
        expr.analyze(&mut locals).unwrap();
        expr
    }

    #[test]
    fn conversion_table() {
        let int = DataType::int();
        let double = DataType::double();
        let string = DataType::string();
        let def = DataType::dynamic();
        let widget = DataType::object("Widget");
        let null = DataType::null();
        let void = DataType::void();

        assert_eq!(find_conversion(&int, &int), Some(None));
        assert_eq!(find_conversion(&int, &double), Some(Some(ConversionKind::IntToDouble)));
        assert_eq!(find_conversion(&double, &int), None);
        assert_eq!(find_conversion(&null, &widget), Some(Some(ConversionKind::NullToReference)));
        assert_eq!(find_conversion(&null, &string), Some(Some(ConversionKind::NullToReference)));
        assert_eq!(find_conversion(&null, &int), None);
        assert_eq!(find_conversion(&widget, &def), Some(Some(ConversionKind::ToDynamic)));
        assert_eq!(find_conversion(&def, &int), Some(Some(ConversionKind::FromDynamic)));
        assert_eq!(find_conversion(&void, &def), None);
        assert_eq!(find_conversion(&def, &void), None);
        assert_eq!(find_conversion(&string, &widget), None);
    }

    #[test]
    fn identity_leaves_expression_alone() {
        let mut expr = analyzed(Expr::constant(3i64, Span::default()));
        ImplicitCaster.cast(&mut expr, &DataType::int()).unwrap();
        assert!(matches!(expr, Expr::Constant(_)));
    }

    #[test]
    fn widening_wraps_expression() {
        let mut expr = analyzed(Expr::constant(3i64, Span::default()));
        ImplicitCaster.cast(&mut expr, &DataType::double()).unwrap();

        let Expr::Cast(cast) = &expr else {
            panic!("expected cast, got {expr}");
        };
        assert_eq!(cast.kind(), ConversionKind::IntToDouble);
        assert_eq!(expr.result_type(), Some(DataType::double()));
        assert_eq!(expr.to_string(), "(cast double (const 3))");
    }

    #[test]
    fn mismatch_reports_both_types() {
        let mut expr = analyzed(Expr::constant("x", Span::new(2, 4, 3)));
        let err = ImplicitCaster.cast(&mut expr, &DataType::int()).unwrap_err();
        assert_eq!(
            err,
            CompilationError::TypeMismatch {
                expected: "int".to_string(),
                found: "String".to_string(),
                span: Span::new(2, 4, 3),
            }
        );
    }

    #[test]
    #[should_panic(expected = "cast of unanalyzed expression")]
    fn unanalyzed_expression_panics() {
        let mut expr = Expr::constant(1i64, Span::default());
        let _ = ImplicitCaster.cast(&mut expr, &DataType::int());
    }
}
