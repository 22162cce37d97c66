//! Shared bindings for call tests.

use std::sync::Arc;

use ember_core::{DataType, ScriptValue, Span};
use ember_registry::{BindingRegistry, ClassBinding, ImportedFunction, InstanceBinding};

use crate::locals::FunctionTable;

pub fn script_type() -> DataType {
    DataType::object("Script")
}

pub fn span() -> Span {
    Span::new(1, 1, 0)
}

/// `Make`: constructor `(Script, int)`, no method parameters, returns `int`.
pub fn make_binding() -> ClassBinding {
    ClassBinding::new(
        "Make",
        DataType::object("Maker"),
        vec![script_type(), DataType::int()],
        vec![],
        DataType::int(),
        |_| Ok(()),
        |_: &(), _| Ok(ScriptValue::Int(0)),
    )
}

/// `Tally`: constructor `(Script, int)`, method `(int)`, returns `int`.
pub fn tally_binding() -> ClassBinding {
    ClassBinding::new(
        "Tally",
        DataType::object("Tally"),
        vec![script_type(), DataType::int()],
        vec![DataType::int()],
        DataType::int(),
        |_| Ok(()),
        |_: &(), _| Ok(ScriptValue::Int(0)),
    )
}

/// `Build`: constructor `(int)`, no method parameters, returns `String`.
pub fn build_binding() -> ClassBinding {
    ClassBinding::new(
        "Build",
        DataType::object("Builder"),
        vec![DataType::int()],
        vec![],
        DataType::string(),
        |_| Ok(()),
        |_: &(), _| Ok(ScriptValue::from("")),
    )
}

fn class_binding(name: &str, constructor: Vec<DataType>, method: Vec<DataType>) -> ClassBinding {
    ClassBinding::new(
        name,
        DataType::object("Thing"),
        constructor,
        method,
        DataType::int(),
        |_| Ok(()),
        |_: &(), _| Ok(ScriptValue::Int(0)),
    )
}

fn imported(name: &str, arity: usize) -> ImportedFunction {
    ImportedFunction::new(
        name,
        DataType::object("Host"),
        vec![DataType::int(); arity],
        DataType::double(),
        |_| Ok(ScriptValue::Double(0.0)),
    )
}

fn instance_binding(name: &str, arity: usize) -> InstanceBinding {
    InstanceBinding::new(
        name,
        DataType::object("Counter"),
        Arc::new(0u32),
        vec![DataType::int(); arity],
        DataType::bool(),
        |_: &u32, _| Ok(ScriptValue::Bool(true)),
    )
}

/// A registry exercising every resolution step.
///
/// - `Make`/2 and `Tally`/3 take the receiver, `Build`/1 does not
/// - `shadow`/1 in all three tables
/// - `Deferred`/1 class binding taking the receiver, with no N+1 entry
/// - `Zero`/1: constructor `()`, method `(int)`
/// - `Prefer`/1 plain class binding and `Prefer`/2 taking the receiver
/// - `Attach`/2 class binding taking the receiver, `Attach`/1 instance binding
/// - `lookup`/1 imported function, `total`/0 instance binding
pub fn registry() -> BindingRegistry {
    let mut builder = BindingRegistry::builder();
    builder.add_class_binding(make_binding()).unwrap();
    builder.add_class_binding(tally_binding()).unwrap();
    builder.add_class_binding(build_binding()).unwrap();
    builder.add_imported_function(imported("shadow", 1)).unwrap();
    builder
        .add_class_binding(class_binding("shadow", vec![DataType::int()], vec![]))
        .unwrap();
    builder.add_instance_binding(instance_binding("shadow", 1)).unwrap();
    builder
        .add_class_binding(class_binding("Deferred", vec![script_type()], vec![]))
        .unwrap();
    builder
        .add_instance_binding(instance_binding("Deferred", 1))
        .unwrap();
    builder
        .add_class_binding(class_binding("Zero", vec![], vec![DataType::int()]))
        .unwrap();
    builder
        .add_class_binding(class_binding("Prefer", vec![DataType::int()], vec![]))
        .unwrap();
    builder
        .add_class_binding(class_binding(
            "Prefer",
            vec![script_type(), DataType::int()],
            vec![],
        ))
        .unwrap();
    builder
        .add_class_binding(class_binding(
            "Attach",
            vec![script_type(), DataType::int()],
            vec![],
        ))
        .unwrap();
    builder.add_instance_binding(instance_binding("Attach", 1)).unwrap();
    builder.add_imported_function(imported("lookup", 1)).unwrap();
    builder.add_instance_binding(instance_binding("total", 0)).unwrap();
    builder.build()
}

/// A function table declaring `shadow(int) -> int` and `helper() -> int`.
pub fn functions() -> FunctionTable {
    let mut functions = FunctionTable::new();
    functions
        .declare("shadow", vec![DataType::int()], DataType::int(), span())
        .unwrap();
    functions
        .declare("helper", vec![], DataType::int(), span())
        .unwrap();
    functions
}
