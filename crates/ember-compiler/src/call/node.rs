use std::fmt;

use ember_core::{CompilationError, DataType, Span};
use rustc_hash::FxHashSet;

use super::write::write_call;
use super::{CallResolution, resolve_call};
use crate::ast::{AstNode, Expr, ExprFlags};
use crate::emit::BytecodeEmitter;
use crate::locals::Locals;
use crate::settings::{CompilerSettings, MAX_CALL_ARGUMENTS};
use crate::slots::SlotAllocator;

/// An unqualified call `name(arguments...)`.
#[derive(Debug)]
pub struct CallLocalExpr {
    name: String,
    arguments: Vec<Expr>,
    span: Span,
    flags: ExprFlags,
    max_arguments: usize,
    /// Set by analysis
    resolution: CallResolution,
    result_type: Option<DataType>,
}

impl CallLocalExpr {
    pub fn new(name: impl Into<String>, arguments: Vec<Expr>, span: Span) -> Self {
        Self {
            name: name.into(),
            arguments,
            span,
            flags: ExprFlags::STATEMENT,
            max_arguments: MAX_CALL_ARGUMENTS,
            resolution: CallResolution::Unresolved,
            result_type: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[Expr] {
        &self.arguments
    }

    /// How the call was resolved; [`CallResolution::Unresolved`] before analysis.
    pub fn resolution(&self) -> &CallResolution {
        &self.resolution
    }

    pub fn flags(&self) -> ExprFlags {
        self.flags
    }

    pub fn result_type(&self) -> Option<DataType> {
        self.result_type.clone()
    }

    fn too_many_arguments(&self, count: usize, max: usize) -> CompilationError {
        CompilationError::TooManyArguments {
            name: self.name.clone(),
            count,
            max,
            span: self.span,
        }
    }
}

impl AstNode for CallLocalExpr {
    fn span(&self) -> Span {
        self.span
    }

    fn store_settings(&mut self, settings: &CompilerSettings) {
        self.max_arguments = settings.max_call_arguments();
        for argument in &mut self.arguments {
            argument.store_settings(settings);
        }
    }

    fn extract_variables(&self, variables: &mut FxHashSet<String>) {
        for argument in &self.arguments {
            argument.extract_variables(variables);
        }
    }

    fn analyze(&mut self, locals: &mut Locals<'_>) -> Result<DataType, CompilationError> {
        if let Some(result_type) = &self.result_type {
            return Ok(result_type.clone());
        }

        let arity = self.arguments.len();
        if arity > self.max_arguments {
            return Err(self.too_many_arguments(arity, self.max_arguments));
        }

        let resolution = resolve_call(&self.name, arity, locals, self.span)?;
        // An injected receiver takes one more slot than the user wrote.
        if resolution.parameters().len() > MAX_CALL_ARGUMENTS {
            return Err(self.too_many_arguments(resolution.parameters().len(), MAX_CALL_ARGUMENTS));
        }

        let caster = locals.caster();
        for (argument, expected) in self.arguments.iter_mut().zip(resolution.argument_types()) {
            argument.analyze(locals)?;
            caster.cast(argument, expected)?;
        }

        let result_type = match resolution.return_type() {
            Some(return_type) => return_type.clone(),
            None => panic!("resolved call '{}' has no return type", self.name),
        };
        tracing::debug!(
            name = %self.name,
            arity,
            strategy = resolution.kind(),
            offset = resolution.offset(),
            "resolved call"
        );

        self.resolution = resolution;
        self.result_type = Some(result_type.clone());
        self.flags.insert(ExprFlags::ANALYZED);
        Ok(result_type)
    }

    fn write(
        &self,
        emitter: &mut BytecodeEmitter<'_>,
        slots: &mut SlotAllocator,
    ) -> Result<(), CompilationError> {
        emitter.set_line(self.span.line);
        write_call(&self.resolution, &self.arguments, self.span, emitter, slots)
    }
}

impl fmt::Display for CallLocalExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(call {}", self.name)?;
        for argument in &self.arguments {
            write!(f, " {argument}")?;
        }
        write!(f, ")")
    }
}
