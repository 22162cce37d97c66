//! Runtime values.
//!
//! [`ScriptValue`] is what the VM keeps on its operand stack and what host
//! callables receive and return. Host objects are carried as [`ObjectRef`]s:
//! shared, type-tagged handles with identity semantics.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::DataType;

/// A shared handle to a host object.
///
/// Cloning an `ObjectRef` clones the handle, not the object. Two handles are
/// equal only if they point at the same object.
#[derive(Clone)]
pub struct ObjectRef {
    data_type: DataType,
    value: Arc<dyn Any + Send + Sync>,
}

impl ObjectRef {
    /// Wrap a host value as an object of `data_type`.
    pub fn new<T: Any + Send + Sync>(data_type: DataType, value: T) -> Self {
        Self {
            data_type,
            value: Arc::new(value),
        }
    }

    /// Wrap an already shared host value without copying it.
    pub fn from_arc<T: Any + Send + Sync>(data_type: DataType, value: Arc<T>) -> Self {
        Self { data_type, value }
    }

    /// The script-visible type of the object.
    #[inline]
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Borrow the host value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Whether both handles refer to the same object.
    #[inline]
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.data_type)
    }
}

/// A value that can live on the VM stack.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScriptValue {
    /// The result of a call that returns nothing
    #[default]
    Void,
    /// Null reference
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(Arc<str>),
    /// Handle to a host object
    Object(ObjectRef),
}

impl ScriptValue {
    /// The runtime type of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            ScriptValue::Void => DataType::void(),
            ScriptValue::Null => DataType::null(),
            ScriptValue::Bool(_) => DataType::bool(),
            ScriptValue::Int(_) => DataType::int(),
            ScriptValue::Double(_) => DataType::double(),
            ScriptValue::String(_) => DataType::string(),
            ScriptValue::Object(obj) => obj.data_type().clone(),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, ScriptValue::Null)
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        matches!(self, ScriptValue::Void)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScriptValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Read a `double`, widening an `int` if needed.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            ScriptValue::Double(d) => Some(*d),
            ScriptValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            ScriptValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Borrow the host value behind an object handle if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_object().and_then(ObjectRef::downcast_ref)
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Bool(value)
    }
}

impl From<i64> for ScriptValue {
    fn from(value: i64) -> Self {
        ScriptValue::Int(value)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        ScriptValue::Double(value)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::String(Arc::from(value))
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::String(Arc::from(value))
    }
}

impl From<ObjectRef> for ScriptValue {
    fn from(value: ObjectRef) -> Self {
        ScriptValue::Object(value)
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Void => write!(f, "void"),
            ScriptValue::Null => write!(f, "null"),
            ScriptValue::Bool(b) => write!(f, "{b}"),
            ScriptValue::Int(i) => write!(f, "{i}"),
            ScriptValue::Double(d) => write!(f, "{d}"),
            ScriptValue::String(s) => write!(f, "{s:?}"),
            ScriptValue::Object(obj) => write!(f, "<{}>", obj.data_type()),
        }
    }
}
