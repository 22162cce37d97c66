//! Constant pool for compiled units.
//!
//! The constant pool stores values referenced by bytecode instructions:
//! numeric literals, string literals and type hashes.

use std::sync::Arc;

use ember_core::TypeHash;
use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

/// Values stored in the constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Double(f64),
    String(Arc<str>),
    /// Type hash (for runtime cast checks).
    TypeHash(TypeHash),
}

/// Unit-level constant pool with deduplication.
///
/// Shared across all functions in a unit.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    /// Deduplication index: maps constant to its index.
    index: FxHashMap<ConstantKey, u32>,
}

/// Hashable version of [`Constant`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstantKey {
    Int(i64),
    Double(OrderedFloat<f64>),
    String(Arc<str>),
    TypeHash(TypeHash),
}

impl ConstantPool {
    /// Create a new empty constant pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or get existing constant, returns index.
    pub fn add(&mut self, constant: Constant) -> u32 {
        let key = Self::to_key(&constant);

        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }

        let idx = self.constants.len() as u32;
        self.constants.push(constant);
        self.index.insert(key, idx);
        idx
    }

    pub fn add_int(&mut self, value: i64) -> u32 {
        self.add(Constant::Int(value))
    }

    pub fn add_double(&mut self, value: f64) -> u32 {
        self.add(Constant::Double(value))
    }

    pub fn add_string(&mut self, value: impl Into<Arc<str>>) -> u32 {
        self.add(Constant::String(value.into()))
    }

    pub fn add_type_hash(&mut self, hash: TypeHash) -> u32 {
        self.add(Constant::TypeHash(hash))
    }

    /// Get constant by index.
    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    fn to_key(constant: &Constant) -> ConstantKey {
        match constant {
            Constant::Int(v) => ConstantKey::Int(*v),
            Constant::Double(v) => ConstantKey::Double(OrderedFloat(*v)),
            Constant::String(s) => ConstantKey::String(Arc::clone(s)),
            Constant::TypeHash(h) => ConstantKey::TypeHash(*h),
        }
    }
}
