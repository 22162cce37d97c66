use std::fmt;

use ember_core::{CompilationError, DataType, Span};
use rustc_hash::FxHashSet;

use super::{AstNode, Expr, ExprFlags};
use crate::conversion::ConversionKind;
use crate::emit::BytecodeEmitter;
use crate::locals::Locals;
use crate::settings::CompilerSettings;
use crate::slots::SlotAllocator;

/// An implicit conversion inserted around an analyzed expression.
#[derive(Debug)]
pub struct CastExpr {
    inner: Box<Expr>,
    kind: ConversionKind,
    target: DataType,
}

impl CastExpr {
    pub(crate) fn new(inner: Expr, kind: ConversionKind, target: DataType) -> Self {
        Self {
            inner: Box::new(inner),
            kind,
            target,
        }
    }

    pub fn inner(&self) -> &Expr {
        &self.inner
    }

    pub fn kind(&self) -> ConversionKind {
        self.kind
    }

    pub fn target(&self) -> &DataType {
        &self.target
    }

    pub fn flags(&self) -> ExprFlags {
        ExprFlags::ANALYZED
    }
}

impl AstNode for CastExpr {
    fn span(&self) -> Span {
        self.inner.span()
    }

    fn store_settings(&mut self, settings: &CompilerSettings) {
        self.inner.store_settings(settings);
    }

    fn extract_variables(&self, variables: &mut FxHashSet<String>) {
        self.inner.extract_variables(variables);
    }

    fn analyze(&mut self, _locals: &mut Locals<'_>) -> Result<DataType, CompilationError> {
        Ok(self.target.clone())
    }

    fn write(
        &self,
        emitter: &mut BytecodeEmitter<'_>,
        slots: &mut SlotAllocator,
    ) -> Result<(), CompilationError> {
        self.inner.write(emitter, slots)?;
        match self.kind {
            ConversionKind::IntToDouble => emitter.emit_i64_to_f64(),
            ConversionKind::FromDynamic => emitter
                .emit_cast(self.target.type_hash)
                .map_err(|e| e.at(self.span()))?,
            ConversionKind::NullToReference | ConversionKind::ToDynamic => {}
        }
        Ok(())
    }
}

impl fmt::Display for CastExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(cast {} {})", self.target, self.inner)
    }
}
