//! Expression tree and the node contract shared by every expression.
//!
//! Compilation of a node runs in four phases, each exactly once and in this
//! order:
//!
//! 1. [`AstNode::store_settings`] pushes compiler settings down the tree.
//! 2. [`AstNode::extract_variables`] collects the variable names used.
//! 3. [`AstNode::analyze`] resolves names, checks types and records the
//!    result type. Running it again on an analyzed node returns the recorded
//!    type without doing any work.
//! 4. [`AstNode::write`] emits bytecode. It must only be called on an
//!    analyzed node, and fails only when the code outgrows an operand.

mod cast;
mod constant;
mod variable;

use std::fmt;

use bitflags::bitflags;
use ember_core::{CompilationError, DataType, Span};
use rustc_hash::FxHashSet;

use crate::call::CallLocalExpr;
use crate::emit::BytecodeEmitter;
use crate::locals::Locals;
use crate::settings::CompilerSettings;
use crate::slots::SlotAllocator;

pub use cast::CastExpr;
pub use constant::{ConstantExpr, Literal};
pub use variable::VariableExpr;

bitflags! {
    /// Per-node analysis state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ExprFlags: u8 {
        /// `analyze` has completed successfully.
        const ANALYZED = 1 << 0;
        /// The node may stand alone as a statement, discarding its value.
        const STATEMENT = 1 << 1;
    }
}

/// The contract every expression node implements.
pub trait AstNode {
    /// Source location of the node.
    fn span(&self) -> Span;

    /// Receive compiler settings and pass them on to sub-expressions.
    fn store_settings(&mut self, settings: &CompilerSettings);

    /// Add the names of all variables referenced by this node and its
    /// sub-expressions.
    fn extract_variables(&self, variables: &mut FxHashSet<String>);

    /// Analyze the node and return its result type.
    fn analyze(&mut self, locals: &mut Locals<'_>) -> Result<DataType, CompilationError>;

    /// Emit code that leaves the node's value on the stack.
    ///
    /// Returns [`CompilationError::CodeTooLarge`] when an index or jump no
    /// longer fits its operand.
    ///
    /// # Panics
    ///
    /// Panics if the node has not been analyzed.
    fn write(
        &self,
        emitter: &mut BytecodeEmitter<'_>,
        slots: &mut SlotAllocator,
    ) -> Result<(), CompilationError>;
}

/// An expression.
#[derive(Debug)]
pub enum Expr {
    Constant(ConstantExpr),
    Variable(VariableExpr),
    Call(CallLocalExpr),
    Cast(CastExpr),
}

impl Expr {
    /// A constant expression.
    pub fn constant(value: impl Into<Literal>, span: Span) -> Self {
        Expr::Constant(ConstantExpr::new(value.into(), span))
    }

    /// A variable reference.
    pub fn variable(name: impl Into<String>, span: Span) -> Self {
        Expr::Variable(VariableExpr::new(name, span))
    }

    /// An unqualified call `name(arguments...)`.
    pub fn call(name: impl Into<String>, arguments: Vec<Expr>, span: Span) -> Self {
        Expr::Call(CallLocalExpr::new(name, arguments, span))
    }

    fn node(&self) -> &dyn AstNode {
        match self {
            Expr::Constant(e) => e,
            Expr::Variable(e) => e,
            Expr::Call(e) => e,
            Expr::Cast(e) => e,
        }
    }

    fn node_mut(&mut self) -> &mut dyn AstNode {
        match self {
            Expr::Constant(e) => e,
            Expr::Variable(e) => e,
            Expr::Call(e) => e,
            Expr::Cast(e) => e,
        }
    }

    /// Analysis state of the node.
    pub fn flags(&self) -> ExprFlags {
        match self {
            Expr::Constant(e) => e.flags(),
            Expr::Variable(e) => e.flags(),
            Expr::Call(e) => e.flags(),
            Expr::Cast(e) => e.flags(),
        }
    }

    /// Whether the expression may be used as a statement.
    pub fn is_statement(&self) -> bool {
        self.flags().contains(ExprFlags::STATEMENT)
    }

    pub fn is_analyzed(&self) -> bool {
        self.flags().contains(ExprFlags::ANALYZED)
    }

    /// The result type recorded by analysis.
    pub fn result_type(&self) -> Option<DataType> {
        match self {
            Expr::Constant(e) => e.result_type(),
            Expr::Variable(e) => e.result_type(),
            Expr::Call(e) => e.result_type(),
            Expr::Cast(e) => Some(e.target().clone()),
        }
    }

    /// Replace this analyzed expression by a conversion of itself.
    pub(crate) fn wrap(&mut self, build: impl FnOnce(Expr) -> CastExpr) {
        let span = self.span();
        let inner = std::mem::replace(self, Expr::constant(Literal::Null, span));
        *self = Expr::Cast(build(inner));
    }
}

impl AstNode for Expr {
    fn span(&self) -> Span {
        self.node().span()
    }

    fn store_settings(&mut self, settings: &CompilerSettings) {
        self.node_mut().store_settings(settings);
    }

    fn extract_variables(&self, variables: &mut FxHashSet<String>) {
        self.node().extract_variables(variables);
    }

    fn analyze(&mut self, locals: &mut Locals<'_>) -> Result<DataType, CompilationError> {
        self.node_mut().analyze(locals)
    }

    fn write(
        &self,
        emitter: &mut BytecodeEmitter<'_>,
        slots: &mut SlotAllocator,
    ) -> Result<(), CompilationError> {
        self.node().write(emitter, slots)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(e) => fmt::Display::fmt(e, f),
            Expr::Variable(e) => fmt::Display::fmt(e, f),
            Expr::Call(e) => fmt::Display::fmt(e, f),
            Expr::Cast(e) => fmt::Display::fmt(e, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_calls_are_statements() {
        let span = Span::default();
        assert!(Expr::call("f", vec![], span).is_statement());
        assert!(!Expr::constant(1i64, span).is_statement());
        assert!(!Expr::variable("x", span).is_statement());
    }

    #[test]
    fn display_nested() {
        let span = Span::default();
        let expr = Expr::call(
            "Make",
            vec![
                Expr::constant(2i64, span),
                Expr::call("g", vec![Expr::variable("x", span)], span),
            ],
            span,
        );
        assert_eq!(expr.to_string(), "(call Make (const 2) (call g (var x)))");
    }

    #[test]
    fn extract_variables_is_transitive() {
        let span = Span::default();
        let expr = Expr::call(
            "f",
            vec![
                Expr::variable("a", span),
                Expr::call("g", vec![Expr::variable("b", span)], span),
                Expr::variable("a", span),
            ],
            span,
        );
        let mut variables = FxHashSet::default();
        expr.extract_variables(&mut variables);

        let mut names: Vec<_> = variables.into_iter().collect();
        names.sort();
        assert_eq!(names, ["a", "b"]);
    }
}
