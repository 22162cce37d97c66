//! Lexical scope for function compilation.
//!
//! [`Locals`] is what an expression node sees while it is analyzed: the
//! binding registry, the script base type, the functions of the unit being
//! compiled, the parameters of the current function and the caster that
//! coerces arguments.

use std::sync::Arc;

use ember_core::{CompilationError, DataType, LimitExceeded, Span};
use ember_registry::{BindingRegistry, BindingTable};
use rustc_hash::FxHashMap;

use crate::conversion::{Caster, ImplicitCaster};
use crate::settings::MAX_CALL_ARGUMENTS;

// ============================================================================
// Local functions
// ============================================================================

/// A function defined in the unit being compiled.
#[derive(Debug, Clone)]
pub struct LocalFunction {
    name: String,
    parameters: Vec<DataType>,
    return_type: DataType,
    /// Position of the function in the compiled unit
    index: u16,
}

impl LocalFunction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[DataType] {
        &self.parameters
    }

    pub fn return_type(&self) -> &DataType {
        &self.return_type
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn index(&self) -> u16 {
        self.index
    }
}

/// The functions of one unit, by name and arity.
#[derive(Default)]
pub struct FunctionTable {
    table: BindingTable<LocalFunction>,
    functions: Vec<Arc<LocalFunction>>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a function. Indices are assigned in declaration order.
    pub fn declare(
        &mut self,
        name: &str,
        parameters: Vec<DataType>,
        return_type: DataType,
        span: Span,
    ) -> Result<Arc<LocalFunction>, CompilationError> {
        if parameters.len() > MAX_CALL_ARGUMENTS {
            return Err(CompilationError::TooManyArguments {
                name: name.to_string(),
                count: parameters.len(),
                max: MAX_CALL_ARGUMENTS,
                span,
            });
        }

        let index = u16::try_from(self.functions.len()).map_err(|_| {
            LimitExceeded::new("functions in one unit", u16::MAX as usize + 1).at(span)
        })?;
        let arity = parameters.len();
        let function = Arc::new(LocalFunction {
            name: name.to_string(),
            parameters,
            return_type,
            index,
        });

        if !self.table.insert(name, arity, Arc::clone(&function)) {
            return Err(CompilationError::DuplicateFunction {
                name: name.to_string(),
                arity,
                span,
            });
        }
        self.functions.push(Arc::clone(&function));
        Ok(function)
    }

    pub fn lookup(&self, name: &str, arity: usize) -> Option<&Arc<LocalFunction>> {
        self.table.get(name, arity)
    }

    pub fn get(&self, index: u16) -> Option<&Arc<LocalFunction>> {
        self.functions.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// A parameter of the function being compiled.
#[derive(Debug, Clone)]
pub struct LocalVar {
    pub name: String,
    pub data_type: DataType,
    /// Argument slot
    pub slot: u8,
    /// Source location of declaration
    pub span: Span,
}

/// Parameters of one function, by name.
#[derive(Debug, Default)]
pub struct LocalScope {
    variables: FxHashMap<String, LocalVar>,
}

impl LocalScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the next parameter and return its slot.
    pub fn declare(
        &mut self,
        name: &str,
        data_type: DataType,
        span: Span,
    ) -> Result<u8, CompilationError> {
        if let Some(existing) = self.variables.get(name) {
            return Err(CompilationError::VariableRedeclaration {
                name: name.to_string(),
                original_span: existing.span,
                new_span: span,
            });
        }
        let slot = u8::try_from(self.variables.len()).map_err(|_| {
            LimitExceeded::new("parameters in one function", u8::MAX as usize + 1).at(span)
        })?;
        self.variables.insert(
            name.to_string(),
            LocalVar {
                name: name.to_string(),
                data_type,
                slot,
                span,
            },
        );
        Ok(slot)
    }

    pub fn lookup(&self, name: &str) -> Option<&LocalVar> {
        self.variables.get(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

// ============================================================================
// Locals
// ============================================================================

/// Everything visible to an expression during analysis.
pub struct Locals<'a> {
    registry: &'a BindingRegistry,
    base_type: &'a DataType,
    functions: &'a FunctionTable,
    caster: &'a dyn Caster,
    scope: LocalScope,
}

impl<'a> Locals<'a> {
    pub fn new(
        registry: &'a BindingRegistry,
        base_type: &'a DataType,
        functions: &'a FunctionTable,
    ) -> Self {
        Self {
            registry,
            base_type,
            functions,
            caster: &ImplicitCaster,
            scope: LocalScope::new(),
        }
    }

    /// Use `caster` instead of the implicit conversion rules.
    pub fn with_caster(mut self, caster: &'a dyn Caster) -> Self {
        self.caster = caster;
        self
    }

    pub fn caster(&self) -> &'a dyn Caster {
        self.caster
    }

    pub fn registry(&self) -> &'a BindingRegistry {
        self.registry
    }

    /// The type of the running script instance.
    pub fn base_type(&self) -> &'a DataType {
        self.base_type
    }

    /// Look up a function of the unit being compiled.
    pub fn lookup_local_function(&self, name: &str, arity: usize) -> Option<&'a Arc<LocalFunction>> {
        self.functions.lookup(name, arity)
    }

    pub fn lookup_variable(&self, name: &str) -> Option<&LocalVar> {
        self.scope.lookup(name)
    }

    pub fn scope_mut(&mut self) -> &mut LocalScope {
        &mut self.scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn functions_indexed_in_order() {
        let mut table = FunctionTable::new();
        let f = table
            .declare("f", vec![DataType::int()], DataType::int(), Span::default())
            .unwrap();
        let g = table
            .declare("g", vec![], DataType::void(), Span::default())
            .unwrap();

        assert_eq!(f.index(), 0);
        assert_eq!(g.index(), 1);
        assert_eq!(table.lookup("f", 1).map(|f| f.index()), Some(0));
        assert!(table.lookup("f", 0).is_none());
        assert_eq!(table.get(1).map(|f| f.name()), Some("g"));
    }

    #[test]
    fn overload_by_arity() {
        let mut table = FunctionTable::new();
        table
            .declare("f", vec![], DataType::int(), Span::default())
            .unwrap();
        table
            .declare("f", vec![DataType::int()], DataType::int(), Span::default())
            .unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn function_indices_run_out() {
        let mut table = FunctionTable::new();
        for i in 0..=u16::MAX {
            table
                .declare(&format!("f{i}"), vec![], DataType::int(), Span::default())
                .unwrap();
        }

        let err = table
            .declare("last", vec![], DataType::int(), Span::new(9, 1, 4))
            .unwrap_err();
        assert_eq!(
            err,
            CompilationError::CodeTooLarge {
                what: "functions in one unit",
                limit: 65536,
                span: Span::new(9, 1, 4),
            }
        );
        assert!(table.lookup("last", 0).is_none());
    }

    #[test]
    fn duplicate_function_rejected() {
        let mut table = FunctionTable::new();
        table
            .declare("f", vec![DataType::int()], DataType::int(), Span::new(1, 1, 1))
            .unwrap();
        let err = table
            .declare("f", vec![DataType::double()], DataType::void(), Span::new(4, 1, 1))
            .unwrap_err();
        assert_eq!(
            err,
            CompilationError::DuplicateFunction {
                name: "f".to_string(),
                arity: 1,
                span: Span::new(4, 1, 1),
            }
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn too_many_parameters() {
        let mut table = FunctionTable::new();
        let err = table
            .declare("f", vec![DataType::int(); 256], DataType::void(), Span::default())
            .unwrap_err();
        assert!(matches!(err, CompilationError::TooManyArguments { count: 256, .. }));
    }

    #[test]
    fn parameter_slots() {
        let mut scope = LocalScope::new();
        assert_eq!(scope.declare("a", DataType::int(), Span::default()), Ok(0));
        assert_eq!(scope.declare("b", DataType::string(), Span::default()), Ok(1));
        assert_eq!(scope.lookup("b").map(|v| v.slot), Some(1));
        assert!(scope.lookup("c").is_none());
    }

    #[test]
    fn parameter_slots_run_out() {
        let mut scope = LocalScope::new();
        for i in 0..=u8::MAX {
            scope.declare(&format!("p{i}"), DataType::int(), Span::default()).unwrap();
        }

        let err = scope
            .declare("last", DataType::int(), Span::new(2, 9, 4))
            .unwrap_err();
        assert_eq!(
            err,
            CompilationError::CodeTooLarge {
                what: "parameters in one function",
                limit: 256,
                span: Span::new(2, 9, 4),
            }
        );
    }

    #[test]
    fn parameter_redeclaration() {
        let mut scope = LocalScope::new();
        scope.declare("a", DataType::int(), Span::new(1, 3, 1)).unwrap();
        let err = scope
            .declare("a", DataType::int(), Span::new(1, 9, 1))
            .unwrap_err();
        assert!(matches!(err, CompilationError::VariableRedeclaration { .. }));
    }

    #[test]
    fn locals_view() {
        let registry = BindingRegistry::empty();
        let base = DataType::object("Script");
        let mut functions = FunctionTable::new();
        functions
            .declare("helper", vec![], DataType::int(), Span::default())
            .unwrap();

        let mut locals = Locals::new(&registry, &base, &functions);
        locals
            .scope_mut()
            .declare("x", DataType::int(), Span::default())
            .unwrap();

        assert_eq!(locals.base_type(), &base);
        assert!(locals.lookup_local_function("helper", 0).is_some());
        assert!(locals.lookup_variable("x").is_some());
    }
}
