//! Registry entries for the three kinds of host callables.
//!
//! Each entry owns its declared signature and a type-erased host callable.
//! The typed constructors accept closures over concrete host types and erase
//! them behind [`ObjectRef`], so the compiler and the VM only ever see
//! [`ScriptValue`]s.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use ember_core::{DataType, NativeError, ObjectRef, ScriptValue};

/// A host callable taking positional arguments.
pub type NativeFn = Arc<dyn Fn(&[ScriptValue]) -> Result<ScriptValue, NativeError> + Send + Sync>;

type ConstructorFn = Arc<dyn Fn(&[ScriptValue]) -> Result<ObjectRef, NativeError> + Send + Sync>;

type MethodFn =
    Arc<dyn Fn(&ObjectRef, &[ScriptValue]) -> Result<ScriptValue, NativeError> + Send + Sync>;

fn erase_method<T, M>(type_name: String, method: M) -> MethodFn
where
    T: Any + Send + Sync,
    M: Fn(&T, &[ScriptValue]) -> Result<ScriptValue, NativeError> + Send + Sync + 'static,
{
    Arc::new(move |target: &ObjectRef, args: &[ScriptValue]| {
        let this = target.downcast_ref::<T>().ok_or_else(|| {
            NativeError::new(format!(
                "expected receiver of type '{}', got '{}'",
                type_name,
                target.data_type()
            ))
        })?;
        method(this, args)
    })
}

// ============================================================================
// Imported functions
// ============================================================================

/// A static host function callable from scripts by name.
pub struct ImportedFunction {
    name: String,
    declaring_type: DataType,
    parameters: Vec<DataType>,
    return_type: DataType,
    function: NativeFn,
}

impl ImportedFunction {
    pub fn new<F>(
        name: impl Into<String>,
        declaring_type: DataType,
        parameters: Vec<DataType>,
        return_type: DataType,
        function: F,
    ) -> Self
    where
        F: Fn(&[ScriptValue]) -> Result<ScriptValue, NativeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            declaring_type,
            parameters,
            return_type,
            function: Arc::new(function),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The host type the function is declared on.
    pub fn declaring_type(&self) -> &DataType {
        &self.declaring_type
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

    pub fn invoke(&self, args: &[ScriptValue]) -> Result<ScriptValue, NativeError> {
        (self.function)(args)
    }
}

impl fmt::Debug for ImportedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportedFunction")
            .field("name", &self.name)
            .field("declaring_type", &self.declaring_type)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Class bindings
// ============================================================================

/// A host class constructed lazily by scripts, paired with one fixed method.
///
/// A script call `name(args...)` constructs the object from the leading
/// arguments the first time the call site runs, caches it on the script
/// instance, and invokes the method with the remaining arguments.
///
/// The declared parameter list is the constructor parameters followed by the
/// method parameters; the registry looks class bindings up by its length. If
/// the first constructor parameter is the script base type, the compiler may
/// supply the running script instance for it (receiver injection).
pub struct ClassBinding {
    name: String,
    declaring_type: DataType,
    constructor_arity: usize,
    parameters: Vec<DataType>,
    return_type: DataType,
    constructor: ConstructorFn,
    method: MethodFn,
}

impl ClassBinding {
    /// Create a class binding over the host type `T`.
    ///
    /// `constructor` builds a `T` from the constructor arguments; `method` is
    /// invoked on the cached `T` with the method arguments. Methods receive
    /// `&T`, so state that changes across calls needs interior mutability.
    pub fn new<T, C, M>(
        name: impl Into<String>,
        declaring_type: DataType,
        constructor_parameters: Vec<DataType>,
        method_parameters: Vec<DataType>,
        return_type: DataType,
        constructor: C,
        method: M,
    ) -> Self
    where
        T: Any + Send + Sync,
        C: Fn(&[ScriptValue]) -> Result<T, NativeError> + Send + Sync + 'static,
        M: Fn(&T, &[ScriptValue]) -> Result<ScriptValue, NativeError> + Send + Sync + 'static,
    {
        let object_type = declaring_type.clone();
        let constructor: ConstructorFn = Arc::new(move |args: &[ScriptValue]| {
            constructor(args).map(|value| ObjectRef::new(object_type.clone(), value))
        });
        let method = erase_method(declaring_type.name().to_string(), method);

        let constructor_arity = constructor_parameters.len();
        let mut parameters = constructor_parameters;
        parameters.extend(method_parameters);

        Self {
            name: name.into(),
            declaring_type,
            constructor_arity,
            parameters,
            return_type,
            constructor,
            method,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type of the constructed object.
    pub fn declaring_type(&self) -> &DataType {
        &self.declaring_type
    }

    /// The full declared list: constructor parameters, then method parameters.
    pub fn parameters(&self) -> &[DataType] {
        &self.parameters
    }

    pub fn constructor_parameters(&self) -> &[DataType] {
        &self.parameters[..self.constructor_arity]
    }

    pub fn method_parameters(&self) -> &[DataType] {
        &self.parameters[self.constructor_arity..]
    }

    pub fn constructor_arity(&self) -> usize {
        self.constructor_arity
    }

    /// Length of the declared parameter list.
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn return_type(&self) -> &DataType {
        &self.return_type
    }

    /// Whether the first constructor parameter is `base_type`.
    pub fn takes_receiver(&self, base_type: &DataType) -> bool {
        self.constructor_parameters().first() == Some(base_type)
    }

    pub fn construct(&self, args: &[ScriptValue]) -> Result<ObjectRef, NativeError> {
        (self.constructor)(args)
    }

    pub fn invoke(&self, target: &ObjectRef, args: &[ScriptValue]) -> Result<ScriptValue, NativeError> {
        (self.method)(target, args)
    }
}

impl fmt::Debug for ClassBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBinding")
            .field("name", &self.name)
            .field("declaring_type", &self.declaring_type)
            .field("constructor_parameters", &self.constructor_parameters())
            .field("method_parameters", &self.method_parameters())
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Instance bindings
// ============================================================================

/// A method on one pre-existing host object, shared by every script instance.
pub struct InstanceBinding {
    name: String,
    target: ObjectRef,
    parameters: Vec<DataType>,
    return_type: DataType,
    method: MethodFn,
}

impl InstanceBinding {
    pub fn new<T, M>(
        name: impl Into<String>,
        target_type: DataType,
        target: Arc<T>,
        parameters: Vec<DataType>,
        return_type: DataType,
        method: M,
    ) -> Self
    where
        T: Any + Send + Sync,
        M: Fn(&T, &[ScriptValue]) -> Result<ScriptValue, NativeError> + Send + Sync + 'static,
    {
        let method = erase_method(target_type.name().to_string(), method);
        Self {
            name: name.into(),
            target: ObjectRef::from_arc(target_type, target),
            parameters,
            return_type,
            method,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bound host object.
    pub fn target(&self) -> &ObjectRef {
        &self.target
    }

    pub fn parameters(&self) -> &[DataType] {
        &self.parameters
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn return_type(&self) -> &DataType {
        &self.return_type
    }

    /// Invoke the bound method on `target`, normally the value loaded from
    /// the shared slot populated from [`Self::target`].
    pub fn invoke(&self, target: &ObjectRef, args: &[ScriptValue]) -> Result<ScriptValue, NativeError> {
        (self.method)(target, args)
    }
}

impl fmt::Debug for InstanceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceBinding")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct Accumulator {
        total: AtomicI64,
    }

    fn script_type() -> DataType {
        DataType::object("Script")
    }

    fn accumulator_binding() -> ClassBinding {
        ClassBinding::new(
            "Accumulate",
            DataType::object("Accumulator"),
            vec![script_type(), DataType::int()],
            vec![DataType::int()],
            DataType::int(),
            |args| {
                Ok(Accumulator {
                    total: AtomicI64::new(args[1].as_int().unwrap_or(0)),
                })
            },
            |acc: &Accumulator, args| {
                let delta = args[0].as_int().unwrap_or(0);
                Ok(ScriptValue::Int(acc.total.fetch_add(delta, Ordering::SeqCst) + delta))
            },
        )
    }

    #[test]
    fn imported_function_invoke() {
        let abs = ImportedFunction::new(
            "abs",
            DataType::object("Math"),
            vec![DataType::int()],
            DataType::int(),
            |args| Ok(ScriptValue::Int(args[0].as_int().unwrap_or(0).abs())),
        );
        assert_eq!(abs.arity(), 1);
        assert_eq!(abs.invoke(&[ScriptValue::Int(-4)]), Ok(ScriptValue::Int(4)));
    }

    #[test]
    fn class_binding_parameter_split() {
        let binding = accumulator_binding();
        assert_eq!(binding.arity(), 3);
        assert_eq!(binding.constructor_arity(), 2);
        assert_eq!(binding.constructor_parameters(), &[script_type(), DataType::int()]);
        assert_eq!(binding.method_parameters(), &[DataType::int()]);
        assert!(binding.takes_receiver(&script_type()));
        assert!(!binding.takes_receiver(&DataType::int()));
    }

    #[test]
    fn class_binding_construct_and_invoke() {
        let binding = accumulator_binding();
        let obj = binding
            .construct(&[ScriptValue::Null, ScriptValue::Int(10)])
            .unwrap();
        assert_eq!(obj.data_type(), &DataType::object("Accumulator"));

        assert_eq!(binding.invoke(&obj, &[ScriptValue::Int(5)]), Ok(ScriptValue::Int(15)));
        assert_eq!(binding.invoke(&obj, &[ScriptValue::Int(1)]), Ok(ScriptValue::Int(16)));
    }

    #[test]
    fn method_rejects_foreign_receiver() {
        let binding = accumulator_binding();
        let foreign = ObjectRef::new(DataType::object("Other"), 0u8);
        let err = binding.invoke(&foreign, &[ScriptValue::Int(1)]).unwrap_err();
        assert!(err.message.contains("Accumulator"));
    }

    #[test]
    fn instance_binding_targets_shared_object() {
        let shared = Arc::new(Accumulator {
            total: AtomicI64::new(100),
        });
        let binding = InstanceBinding::new(
            "total",
            DataType::object("Accumulator"),
            Arc::clone(&shared),
            vec![],
            DataType::int(),
            |acc: &Accumulator, _| Ok(ScriptValue::Int(acc.total.load(Ordering::SeqCst))),
        );

        shared.total.store(42, Ordering::SeqCst);
        assert_eq!(binding.invoke(binding.target(), &[]), Ok(ScriptValue::Int(42)));
        assert_eq!(binding.arity(), 0);
    }
}
