use std::fmt;

use ember_core::{CompilationError, DataType, Span};
use rustc_hash::FxHashSet;

use super::{AstNode, ExprFlags};
use crate::emit::BytecodeEmitter;
use crate::locals::Locals;
use crate::settings::CompilerSettings;
use crate::slots::SlotAllocator;

/// A reference to a function parameter.
#[derive(Debug)]
pub struct VariableExpr {
    name: String,
    span: Span,
    flags: ExprFlags,
    /// Set by analysis: parameter slot and type
    resolved: Option<(u8, DataType)>,
}

impl VariableExpr {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
            flags: ExprFlags::empty(),
            resolved: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> ExprFlags {
        self.flags
    }

    pub fn result_type(&self) -> Option<DataType> {
        self.resolved.as_ref().map(|(_, data_type)| data_type.clone())
    }
}

impl AstNode for VariableExpr {
    fn span(&self) -> Span {
        self.span
    }

    fn store_settings(&mut self, _settings: &CompilerSettings) {}

    fn extract_variables(&self, variables: &mut FxHashSet<String>) {
        variables.insert(self.name.clone());
    }

    fn analyze(&mut self, locals: &mut Locals<'_>) -> Result<DataType, CompilationError> {
        if let Some((_, data_type)) = &self.resolved {
            return Ok(data_type.clone());
        }
        let var = locals
            .lookup_variable(&self.name)
            .ok_or_else(|| CompilationError::UnknownVariable {
                name: self.name.clone(),
                span: self.span,
            })?;
        let data_type = var.data_type.clone();
        self.resolved = Some((var.slot, data_type.clone()));
        self.flags.insert(ExprFlags::ANALYZED);
        Ok(data_type)
    }

    fn write(
        &self,
        emitter: &mut BytecodeEmitter<'_>,
        _slots: &mut SlotAllocator,
    ) -> Result<(), CompilationError> {
        let Some((slot, _)) = &self.resolved else {
            panic!("variable '{}' written before analysis", self.name);
        };
        emitter.set_line(self.span.line);
        emitter.emit_get_local(*slot);
        Ok(())
    }
}

impl fmt::Display for VariableExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(var {})", self.name)
    }
}
