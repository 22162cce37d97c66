//! Unit compiler.
//!
//! Compiles a [`ScriptUnit`] (a `main` function plus helper functions) into a
//! [`CompiledUnit`] in two passes:
//!
//! 1. **Analysis**: declare every function, push settings down the trees,
//!    then analyze each body. A failing body contributes one error and the
//!    remaining bodies are still analyzed.
//! 2. **Emission**: only when every body analyzed cleanly, write each
//!    function into its own chunk against the unit's shared constant pool.
//!    A unit too large for the bytecode's operands stops at the first
//!    overflow.
//!
//! `main` is always function 0 of the compiled unit.

use std::sync::Arc;

use ember_core::{CompilationError, CompilationErrors, DataType, Span};
use ember_registry::{BindingRegistry, ImportedFunction, InstanceBinding};
use rustc_hash::FxHashSet;

use crate::ast::{AstNode, Expr};
use crate::bytecode::{BytecodeChunk, ConstantPool};
use crate::emit::BytecodeEmitter;
use crate::locals::{FunctionTable, Locals};
use crate::settings::CompilerSettings;
use crate::slots::{CacheField, SharedSlot, SlotAllocator};

// ============================================================================
// Input
// ============================================================================

/// A declared function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub data_type: DataType,
    pub span: Span,
}

impl Param {
    pub fn new(name: impl Into<String>, data_type: DataType, span: Span) -> Self {
        Self {
            name: name.into(),
            data_type,
            span,
        }
    }
}

/// A function of a script unit.
///
/// Every body expression but the last is a statement. The last one is the
/// function's result, unless the function returns `void`.
#[derive(Debug)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: DataType,
    pub body: Vec<Expr>,
    pub span: Span,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>, return_type: DataType, span: Span) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type,
            body: Vec::new(),
            span,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, data_type: DataType, span: Span) -> Self {
        self.params.push(Param::new(name, data_type, span));
        self
    }

    pub fn with_body(mut self, body: Vec<Expr>) -> Self {
        self.body = body;
        self
    }

    fn parameter_types(&self) -> Vec<DataType> {
        self.params.iter().map(|p| p.data_type.clone()).collect()
    }
}

/// One script: an entry point and the functions it may call.
#[derive(Debug)]
pub struct ScriptUnit {
    pub main: FunctionDecl,
    pub functions: Vec<FunctionDecl>,
}

impl ScriptUnit {
    pub fn new(main: FunctionDecl) -> Self {
        Self {
            main,
            functions: Vec::new(),
        }
    }

    pub fn with_function(mut self, function: FunctionDecl) -> Self {
        self.functions.push(function);
        self
    }
}

// ============================================================================
// Output
// ============================================================================

/// A compiled function.
#[derive(Debug)]
pub struct CompiledFunction {
    pub name: String,
    pub arity: usize,
    pub return_type: DataType,
    pub chunk: BytecodeChunk,
}

/// A compiled script unit with its link tables.
#[derive(Debug)]
pub struct CompiledUnit {
    /// Functions by unit-local index; `main` is first.
    pub functions: Vec<CompiledFunction>,
    /// Constant pool shared by every function.
    pub constants: ConstantPool,
    /// Imported functions, indexed by `CallImported`.
    pub imports: Vec<Arc<ImportedFunction>>,
    /// One field per class-binding call site, indexed by the cache opcodes.
    pub cache_fields: Vec<CacheField>,
    /// Shared instance-binding targets, indexed by `GetShared`.
    pub shared_slots: Vec<SharedSlot>,
    /// Instance bindings, indexed by `InvokeInstanceBinding`.
    pub instance_bindings: Vec<Arc<InstanceBinding>>,
    /// Names of the variables referenced by `main`, sorted.
    pub variables: Vec<String>,
}

impl CompiledUnit {
    /// The entry point.
    pub fn main(&self) -> &CompiledFunction {
        &self.functions[0]
    }

    pub fn function(&self, index: u16) -> Option<&CompiledFunction> {
        self.functions.get(index as usize)
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles script units against one binding registry.
pub struct Compiler {
    registry: Arc<BindingRegistry>,
    base_type: DataType,
    settings: CompilerSettings,
}

impl Compiler {
    /// `base_type` is the type of the receiver a compiled script runs against.
    pub fn new(registry: Arc<BindingRegistry>, base_type: DataType, settings: CompilerSettings) -> Self {
        Self {
            registry,
            base_type,
            settings,
        }
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    pub fn base_type(&self) -> &DataType {
        &self.base_type
    }

    /// Compile a unit.
    ///
    /// Returns every error found, at most one per function.
    #[tracing::instrument(skip_all, fields(main = %unit.main.name, functions = unit.functions.len() + 1))]
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&self, unit: ScriptUnit) -> Result<CompiledUnit, CompilationErrors> {
        let ScriptUnit { main, functions } = unit;
        let mut decls: Vec<FunctionDecl> = std::iter::once(main).chain(functions).collect();
        let mut errors = CompilationErrors::new();

        // Pass 1: declarations, settings, analysis
        let mut table = FunctionTable::new();
        let mut declared = Vec::with_capacity(decls.len());
        for decl in &decls {
            let result =
                table.declare(&decl.name, decl.parameter_types(), decl.return_type.clone(), decl.span);
            declared.push(result.is_ok());
            if let Err(e) = result {
                errors.push(e);
            }
        }

        for decl in &mut decls {
            for expr in &mut decl.body {
                expr.store_settings(&self.settings);
            }
        }

        let mut variables = FxHashSet::default();
        for expr in &decls[0].body {
            expr.extract_variables(&mut variables);
        }
        let mut variables: Vec<String> = variables.into_iter().collect();
        variables.sort();

        // A function that failed to declare already has its error.
        for (decl, _) in decls.iter_mut().zip(&declared).filter(|(_, ok)| **ok) {
            let mut locals = Locals::new(&self.registry, &self.base_type, &table);
            if let Err(e) = analyze_function(decl, &mut locals) {
                errors.push(e);
            }
        }

        if !errors.is_empty() {
            tracing::debug!(errors = errors.len(), "compilation failed");
            return Err(errors);
        }

        // Pass 2: emission
        let mut constants = ConstantPool::new();
        let mut slots = SlotAllocator::new();
        let mut compiled = Vec::with_capacity(decls.len());
        for decl in &decls {
            match self.write_function(decl, &mut constants, &mut slots) {
                Ok(chunk) => compiled.push(CompiledFunction {
                    name: decl.name.clone(),
                    arity: decl.params.len(),
                    return_type: decl.return_type.clone(),
                    chunk,
                }),
                Err(e) => {
                    tracing::debug!(function = %decl.name, error = %e, "emission failed");
                    errors.push(e);
                    return Err(errors);
                }
            }
        }

        let tables = slots.into_tables();
        tracing::debug!(
            functions = compiled.len(),
            constants = constants.len(),
            imports = tables.imports.len(),
            cache_fields = tables.cache_fields.len(),
            shared_slots = tables.shared_slots.len(),
            "compiled unit"
        );

        Ok(CompiledUnit {
            functions: compiled,
            constants,
            imports: tables.imports,
            cache_fields: tables.cache_fields,
            shared_slots: tables.shared_slots,
            instance_bindings: tables.instance_bindings,
            variables,
        })
    }

    fn write_function(
        &self,
        decl: &FunctionDecl,
        constants: &mut ConstantPool,
        slots: &mut SlotAllocator,
    ) -> Result<BytecodeChunk, CompilationError> {
        let mut emitter = BytecodeEmitter::new(constants).with_line_numbers(self.settings.line_numbers());
        emitter.set_line(decl.span.line);

        let returns_value = !decl.return_type.is_void();
        if let Some((last, statements)) = decl.body.split_last() {
            for statement in statements {
                statement.write(&mut emitter, slots)?;
                emitter.emit_pop();
            }
            last.write(&mut emitter, slots)?;
            if returns_value {
                emitter.emit_return();
            } else {
                emitter.emit_pop();
                emitter.emit_return_void();
            }
        } else {
            emitter.emit_return_void();
        }

        Ok(emitter.finish())
    }
}

/// Analyze one function body, stopping at its first error.
fn analyze_function(decl: &mut FunctionDecl, locals: &mut Locals<'_>) -> Result<(), CompilationError> {
    for param in &decl.params {
        locals
            .scope_mut()
            .declare(&param.name, param.data_type.clone(), param.span)?;
    }

    let returns_value = !decl.return_type.is_void();
    let Some((last, statements)) = decl.body.split_last_mut() else {
        if returns_value {
            return Err(CompilationError::MissingReturn {
                function: decl.name.clone(),
                span: decl.span,
            });
        }
        return Ok(());
    };

    for statement in statements {
        if !statement.is_statement() {
            return Err(CompilationError::NotAStatement {
                span: statement.span(),
            });
        }
        statement.analyze(locals)?;
    }

    if !returns_value && !last.is_statement() {
        return Err(CompilationError::NotAStatement { span: last.span() });
    }
    last.analyze(locals)?;
    if returns_value {
        locals.caster().cast(last, &decl.return_type)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::OpCode;
    use ember_core::ScriptValue;
    use ember_registry::ClassBinding;

    fn span(line: u32) -> Span {
        Span::new(line, 1, 0)
    }

    fn script_type() -> DataType {
        DataType::object("Script")
    }

    fn registry() -> Arc<BindingRegistry> {
        let mut builder = BindingRegistry::builder();
        builder
            .add_class_binding(ClassBinding::new(
                "Make",
                DataType::object("Maker"),
                vec![script_type(), DataType::int()],
                vec![],
                DataType::int(),
                |_| Ok(()),
                |_: &(), _| Ok(ScriptValue::Int(0)),
            ))
            .unwrap();
        builder
            .add_imported_function(ImportedFunction::new(
                "log",
                DataType::object("Host"),
                vec![DataType::dynamic()],
                DataType::void(),
                |_| Ok(ScriptValue::Void),
            ))
            .unwrap();
        Arc::new(builder.build())
    }

    fn compiler() -> Compiler {
        Compiler::new(registry(), script_type(), CompilerSettings::default())
    }

    fn int(value: i64) -> Expr {
        Expr::constant(value, span(1))
    }

    #[test]
    fn compiles_main_and_helpers() {
        let main = FunctionDecl::new("main", DataType::int(), span(1))
            .with_param("x", DataType::int(), span(1))
            .with_body(vec![
                Expr::call("log", vec![Expr::variable("x", span(2))], span(2)),
                Expr::call("twice", vec![Expr::variable("x", span(3))], span(3)),
            ]);
        let twice = FunctionDecl::new("twice", DataType::int(), span(5))
            .with_param("n", DataType::int(), span(5))
            .with_body(vec![Expr::call("Make", vec![Expr::variable("n", span(6))], span(6))]);

        let unit = compiler()
            .compile(ScriptUnit::new(main).with_function(twice))
            .unwrap();

        assert_eq!(unit.functions.len(), 2);
        assert_eq!(unit.main().name, "main");
        assert_eq!(unit.function(1).map(|f| f.arity), Some(1));
        assert_eq!(unit.imports.len(), 1);
        assert_eq!(unit.cache_fields.len(), 1);
        assert_eq!(unit.variables, ["x"]);

        unit.main().chunk.assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::CallImported,
            OpCode::Pop,
            OpCode::GetLocal,
            OpCode::Call,
            OpCode::Return,
        ]);
        unit.functions[1].chunk.assert_contains_opcodes(&[OpCode::GetThis, OpCode::New]);
    }

    #[test]
    fn constant_pool_overflow_fails_compilation() {
        // One distinct constant more than a wide operand can index.
        let mut body: Vec<Expr> = (2..65538)
            .map(|i| Expr::call("log", vec![int(i)], span(1)))
            .collect();
        body.push(Expr::call(
            "log",
            vec![Expr::constant(-7i64, Span::new(9, 4, 2))],
            span(9),
        ));
        let main = FunctionDecl::new("main", DataType::void(), span(1)).with_body(body);

        let errors = compiler().compile(ScriptUnit::new(main)).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.first(),
            Some(&CompilationError::CodeTooLarge {
                what: "constant pool",
                limit: 65536,
                span: Span::new(9, 4, 2),
            })
        );
    }

    #[test]
    fn void_function_discards_its_last_value() {
        let main = FunctionDecl::new("main", DataType::void(), span(1))
            .with_body(vec![Expr::call("log", vec![int(5)], span(1))]);
        let unit = compiler().compile(ScriptUnit::new(main)).unwrap();

        unit.main().chunk.assert_opcodes(&[
            OpCode::Constant,
            OpCode::CallImported,
            OpCode::Pop,
            OpCode::ReturnVoid,
        ]);
    }

    #[test]
    fn empty_void_function() {
        let main = FunctionDecl::new("main", DataType::void(), span(1));
        let unit = compiler().compile(ScriptUnit::new(main)).unwrap();
        unit.main().chunk.assert_opcodes(&[OpCode::ReturnVoid]);
    }

    #[test]
    fn result_is_cast_to_return_type() {
        let main = FunctionDecl::new("main", DataType::double(), span(1)).with_body(vec![int(7)]);
        let unit = compiler().compile(ScriptUnit::new(main)).unwrap();
        unit.main()
            .chunk
            .assert_opcodes(&[OpCode::Constant, OpCode::I64toF64, OpCode::Return]);
    }

    #[test]
    fn missing_return() {
        let main = FunctionDecl::new("main", DataType::int(), span(4));
        let errors = compiler().compile(ScriptUnit::new(main)).unwrap_err();
        assert_eq!(
            errors.first(),
            Some(&CompilationError::MissingReturn {
                function: "main".to_string(),
                span: span(4),
            })
        );
    }

    #[test]
    fn only_calls_are_statements() {
        let main = FunctionDecl::new("main", DataType::int(), span(1))
            .with_body(vec![Expr::constant(1i64, span(2)), int(2)]);
        let errors = compiler().compile(ScriptUnit::new(main)).unwrap_err();
        assert_eq!(
            errors.first(),
            Some(&CompilationError::NotAStatement { span: span(2) })
        );
    }

    #[test]
    fn one_error_per_function() {
        let main = FunctionDecl::new("main", DataType::int(), span(1)).with_body(vec![
            Expr::call("Foo", vec![], span(1)),
            Expr::call("Bar", vec![], span(2)),
        ]);
        let helper = FunctionDecl::new("helper", DataType::int(), span(3))
            .with_body(vec![Expr::call("Make", vec![Expr::constant("x", span(4))], span(4))]);

        let errors = compiler()
            .compile(ScriptUnit::new(main).with_function(helper))
            .unwrap_err();

        let errors = errors.into_vec();
        assert_eq!(errors.len(), 2);
        assert!(matches!(&errors[0], CompilationError::UnresolvedCall { name, .. } if name == "Foo"));
        assert!(matches!(errors[1], CompilationError::TypeMismatch { .. }));
    }

    #[test]
    fn duplicate_function() {
        let main = FunctionDecl::new("main", DataType::void(), span(1));
        let a = FunctionDecl::new("f", DataType::void(), span(2));
        let b = FunctionDecl::new("f", DataType::void(), span(3));

        let errors = compiler()
            .compile(ScriptUnit::new(main).with_function(a).with_function(b))
            .unwrap_err();
        assert!(matches!(
            errors.first(),
            Some(CompilationError::DuplicateFunction { arity: 0, .. })
        ));
    }

    #[test]
    fn oversized_parameter_list_is_one_error() {
        let main = FunctionDecl::new("main", DataType::void(), span(1));
        let wide = (0..256).fold(
            FunctionDecl::new("wide", DataType::int(), span(2)),
            |decl, i| decl.with_param(format!("p{i}"), DataType::int(), span(2)),
        );
        let wide = wide.with_body(vec![Expr::variable("p0", span(3))]);

        let errors = compiler()
            .compile(ScriptUnit::new(main).with_function(wide))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors.first(),
            Some(CompilationError::TooManyArguments { count: 256, .. })
        ));
    }

    #[test]
    fn recursion_resolves_locally() {
        let main = FunctionDecl::new("main", DataType::int(), span(1))
            .with_param("n", DataType::int(), span(1))
            .with_body(vec![Expr::call("main", vec![Expr::variable("n", span(1))], span(1))]);
        let unit = compiler().compile(ScriptUnit::new(main)).unwrap();

        let chunk = &unit.main().chunk;
        assert_eq!(chunk.read_op(2), Some(OpCode::Call));
        assert_eq!(chunk.read_u16(3), Some(0));
    }

    #[test]
    fn settings_reach_the_body() {
        let main = FunctionDecl::new("main", DataType::void(), span(9))
            .with_body(vec![Expr::call("log", vec![int(5)], span(9))]);
        let settings = CompilerSettings::default().with_line_numbers(false);
        let unit = Compiler::new(registry(), script_type(), settings)
            .compile(ScriptUnit::new(main))
            .unwrap();
        assert!(unit.main().chunk.lines().iter().all(|&line| line == 0));

        let main = FunctionDecl::new("main", DataType::void(), span(9))
            .with_body(vec![Expr::call("log", vec![int(5)], span(9))]);
        let settings = CompilerSettings::default().with_max_call_arguments(0);
        let errors = Compiler::new(registry(), script_type(), settings)
            .compile(ScriptUnit::new(main))
            .unwrap_err();
        assert!(matches!(
            errors.first(),
            Some(CompilationError::TooManyArguments { .. })
        ));
    }
}
