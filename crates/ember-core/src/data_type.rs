//! DataType - a script-visible type.
//!
//! A `DataType` pairs a [`TypeHash`] with the name the type is written as in
//! scripts. Identity is the hash alone: two `DataType`s built from the same
//! name are equal no matter how the name was stored.
//!
//! # Example
//!
//! ```
//! use ember_core::{DataType, primitives};
//!
//! let int = DataType::int();
//! assert_eq!(int.type_hash, primitives::INT);
//!
//! let widget = DataType::object("Widget");
//! assert_eq!(widget, DataType::object(String::from("Widget")));
//! assert!(widget.is_reference());
//! ```

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

use crate::{TypeHash, primitives};

/// A script-visible type.
#[derive(Clone)]
pub struct DataType {
    /// The identity of the type.
    pub type_hash: TypeHash,
    name: Cow<'static, str>,
}

impl DataType {
    const fn builtin(type_hash: TypeHash, name: &'static str) -> Self {
        Self {
            type_hash,
            name: Cow::Borrowed(name),
        }
    }

    /// `void`, the result type of calls that produce nothing.
    pub const fn void() -> Self {
        Self::builtin(primitives::VOID, "void")
    }

    /// `boolean`
    pub const fn bool() -> Self {
        Self::builtin(primitives::BOOL, "boolean")
    }

    /// `int`, a 64-bit signed integer.
    pub const fn int() -> Self {
        Self::builtin(primitives::INT, "int")
    }

    /// `double`
    pub const fn double() -> Self {
        Self::builtin(primitives::DOUBLE, "double")
    }

    /// `String`
    pub const fn string() -> Self {
        Self::builtin(primitives::STRING, "String")
    }

    /// `def`, the dynamic type. Any value converts to it, and it converts to
    /// any type with a check at run time.
    pub const fn dynamic() -> Self {
        Self::builtin(primitives::DYNAMIC, "def")
    }

    /// The type of the `null` literal.
    pub const fn null() -> Self {
        Self::builtin(primitives::NULL, "null")
    }

    /// A host object type, identified by name.
    pub fn object(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        Self {
            type_hash: TypeHash::from_name(&name),
            name,
        }
    }

    /// The name of this type as written in scripts.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        self.type_hash == primitives::VOID
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.type_hash == primitives::DYNAMIC
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.type_hash == primitives::NULL
    }

    /// Whether this is one of the unboxed value types (`boolean`, `int`, `double`).
    pub fn is_primitive(&self) -> bool {
        matches!(
            self.type_hash,
            primitives::BOOL | primitives::INT | primitives::DOUBLE
        )
    }

    /// Whether values of this type are references that may hold `null`.
    pub fn is_reference(&self) -> bool {
        !self.is_primitive() && !self.is_void() && !self.is_null()
    }
}

impl PartialEq for DataType {
    fn eq(&self, other: &Self) -> bool {
        self.type_hash == other.type_hash
    }
}

impl Eq for DataType {}

impl Hash for DataType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_hash.hash(state);
    }
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "DataType({})", self.name)
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_hash() {
        let a = DataType::object("Widget");
        let b = DataType::object(String::from("Widget"));
        assert_eq!(a, b);
        assert_ne!(a, DataType::object("Gadget"));
    }

    #[test]
    fn builtin_names() {
        assert_eq!(DataType::int().to_string(), "int");
        assert_eq!(DataType::bool().to_string(), "boolean");
        assert_eq!(DataType::dynamic().to_string(), "def");
        assert_eq!(DataType::string().name(), "String");
    }

    #[test]
    fn object_named_like_builtin_is_the_builtin() {
        assert_eq!(DataType::object("int"), DataType::int());
    }

    #[test]
    fn classification() {
        assert!(DataType::int().is_primitive());
        assert!(DataType::double().is_primitive());
        assert!(!DataType::string().is_primitive());

        assert!(DataType::string().is_reference());
        assert!(DataType::dynamic().is_reference());
        assert!(DataType::object("Widget").is_reference());
        assert!(!DataType::void().is_reference());
        assert!(!DataType::null().is_reference());

        assert!(DataType::void().is_void());
        assert!(DataType::null().is_null());
        assert!(DataType::dynamic().is_dynamic());
    }

    #[test]
    fn debug_shows_name() {
        assert_eq!(format!("{:?}", DataType::object("Widget")), "DataType(Widget)");
    }
}
