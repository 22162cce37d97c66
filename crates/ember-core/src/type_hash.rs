//! Deterministic hash-based type identity.
//!
//! [`TypeHash`] is a 64-bit hash computed from a type's script-visible name.
//! Two [`DataType`](crate::DataType)s are the same type exactly when their
//! hashes agree, so host bindings and compiled scripts can refer to the same
//! type without sharing a registration-order id.
//!
//! # Examples
//!
//! ```
//! use ember_core::{TypeHash, primitives};
//!
//! let int_hash = TypeHash::from_name("int");
//! assert_eq!(int_hash, primitives::INT);
//! assert_ne!(TypeHash::from_name("Widget"), TypeHash::from_name("Gadget"));
//! ```

use std::fmt;
use xxhash_rust::const_xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Domain marker for type hashes
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;
}

/// A deterministic 64-bit hash identifying a type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Compute the hash of a type from its name.
    ///
    /// This is a `const fn` so the primitive hashes below are computed at
    /// compile time.
    #[inline]
    pub const fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Whether this is the empty hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the raw u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Well-known hashes for the built-in types.
pub mod primitives {
    use super::TypeHash;

    /// Hash for `void`
    pub const VOID: TypeHash = TypeHash::from_name("void");

    /// Hash for `boolean`
    pub const BOOL: TypeHash = TypeHash::from_name("boolean");

    /// Hash for `int` (64-bit signed integer)
    pub const INT: TypeHash = TypeHash::from_name("int");

    /// Hash for `double`
    pub const DOUBLE: TypeHash = TypeHash::from_name("double");

    /// Hash for `String`
    pub const STRING: TypeHash = TypeHash::from_name("String");

    /// Hash for the dynamic type `def`
    pub const DYNAMIC: TypeHash = TypeHash::from_name("def");

    /// Hash for the type of the `null` literal
    pub const NULL: TypeHash = TypeHash::from_name("null");
}
