use std::fmt;
use std::sync::Arc;

use ember_core::{CompilationError, DataType, Span};
use rustc_hash::FxHashSet;

use super::{AstNode, ExprFlags};
use crate::emit::BytecodeEmitter;
use crate::locals::Locals;
use crate::settings::CompilerSettings;
use crate::slots::SlotAllocator;

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(Arc<str>),
}

impl Literal {
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Null => DataType::null(),
            Literal::Bool(_) => DataType::bool(),
            Literal::Int(_) => DataType::int(),
            Literal::Double(_) => DataType::double(),
            Literal::String(_) => DataType::string(),
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Double(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(Arc::from(value))
    }
}

/// A literal in the expression tree.
#[derive(Debug)]
pub struct ConstantExpr {
    value: Literal,
    span: Span,
    flags: ExprFlags,
}

impl ConstantExpr {
    pub fn new(value: Literal, span: Span) -> Self {
        Self {
            value,
            span,
            flags: ExprFlags::empty(),
        }
    }

    pub fn value(&self) -> &Literal {
        &self.value
    }

    pub fn flags(&self) -> ExprFlags {
        self.flags
    }

    pub fn result_type(&self) -> Option<DataType> {
        self.flags
            .contains(ExprFlags::ANALYZED)
            .then(|| self.value.data_type())
    }
}

impl AstNode for ConstantExpr {
    fn span(&self) -> Span {
        self.span
    }

    fn store_settings(&mut self, _settings: &CompilerSettings) {}

    fn extract_variables(&self, _variables: &mut FxHashSet<String>) {}

    fn analyze(&mut self, _locals: &mut Locals<'_>) -> Result<DataType, CompilationError> {
        self.flags.insert(ExprFlags::ANALYZED);
        Ok(self.value.data_type())
    }

    fn write(
        &self,
        emitter: &mut BytecodeEmitter<'_>,
        _slots: &mut SlotAllocator,
    ) -> Result<(), CompilationError> {
        assert!(
            self.flags.contains(ExprFlags::ANALYZED),
            "constant written before analysis"
        );
        emitter.set_line(self.span.line);
        let loaded = match &self.value {
            Literal::Null => {
                emitter.emit_null();
                Ok(())
            }
            Literal::Bool(b) => {
                emitter.emit_bool(*b);
                Ok(())
            }
            Literal::Int(i) => emitter.emit_int(*i),
            Literal::Double(d) => emitter.emit_double(*d),
            Literal::String(s) => emitter.emit_string(s),
        };
        loaded.map_err(|e| e.at(self.span))
    }
}

impl fmt::Display for ConstantExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Literal::Null => write!(f, "(const null)"),
            Literal::Bool(b) => write!(f, "(const {b})"),
            Literal::Int(i) => write!(f, "(const {i})"),
            Literal::Double(d) => write!(f, "(const {d:?})"),
            Literal::String(s) => write!(f, "(const {s:?})"),
        }
    }
}
