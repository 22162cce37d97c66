//! Unified error types for ember.
//!
//! ## Error Hierarchy
//!
//! ```text
//! EmberError (top-level wrapper)
//! ├── RegistrationError  - Binding registry construction errors
//! ├── CompilationErrors  - One CompilationError per failing function
//! └── RuntimeError       - Execution errors (wraps NativeError)
//! ```
//!
//! Each phase-specific error can be handled on its own, or converted to
//! [`EmberError`] with `?`.

use thiserror::Error;

use crate::Span;

// ============================================================================
// Native Errors
// ============================================================================

/// A failure reported by a host callable.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct NativeError {
    /// Message supplied by the host.
    pub message: String,
}

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors that occur while populating a binding registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// An entry with the same name and arity already exists in the table.
    #[error("duplicate {kind} '{name}' with [{arity}] parameters")]
    DuplicateBinding {
        /// Which table rejected the entry.
        kind: &'static str,
        name: String,
        arity: usize,
    },

    /// The binding declaration is malformed.
    #[error("invalid binding '{name}': {reason}")]
    InvalidBinding { name: String, reason: String },
}

// ============================================================================
// Compilation Errors
// ============================================================================

/// A bytecode operand that a script outgrew.
///
/// Raised by code generation, which has no source location of its own; the
/// node being written attaches one with [`LimitExceeded::at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{what} exceeds the limit of {limit}")]
pub struct LimitExceeded {
    pub what: &'static str,
    pub limit: usize,
}

impl LimitExceeded {
    pub fn new(what: &'static str, limit: usize) -> Self {
        Self { what, limit }
    }

    /// Report the overflow at the node being written.
    pub fn at(self, span: Span) -> CompilationError {
        CompilationError::CodeTooLarge {
            what: self.what,
            limit: self.limit,
            span,
        }
    }
}

/// Errors found while analyzing a script.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    /// No local function, imported function, class binding or instance
    /// binding matches the call.
    #[error("at {span}: unknown call [{name}] with [{arity}] arguments")]
    UnresolvedCall {
        name: String,
        /// Number of arguments written at the call site.
        arity: usize,
        span: Span,
    },

    /// An expression cannot be converted to the type its position requires.
    #[error("at {span}: cannot cast from [{found}] to [{expected}]")]
    TypeMismatch {
        expected: String,
        found: String,
        span: Span,
    },

    /// A variable that is neither a parameter nor a script input.
    #[error("at {span}: undefined variable '{name}'")]
    UnknownVariable { name: String, span: Span },

    /// The expression's value would be discarded but it has no effect.
    #[error("at {span}: not a statement")]
    NotAStatement { span: Span },

    /// A non-void function has an empty body.
    #[error("at {span}: function '{function}' must return a value")]
    MissingReturn { function: String, span: Span },

    /// Two functions in one unit share a name and arity.
    #[error("at {span}: duplicate function '{name}' with [{arity}] parameters")]
    DuplicateFunction {
        name: String,
        arity: usize,
        span: Span,
    },

    /// A parameter name is used twice in one function.
    #[error("at {new_span}: variable '{name}' redeclared (originally declared at {original_span})")]
    VariableRedeclaration {
        name: String,
        original_span: Span,
        new_span: Span,
    },

    /// The call passes more arguments than the bytecode can encode.
    #[error("at {span}: call [{name}] has {count} arguments, the limit is {max}")]
    TooManyArguments {
        name: String,
        count: usize,
        max: usize,
        span: Span,
    },

    /// The compiled code does not fit a fixed-width operand.
    #[error("at {span}: {what} exceeds the limit of {limit}")]
    CodeTooLarge {
        what: &'static str,
        limit: usize,
        span: Span,
    },
}

impl CompilationError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            CompilationError::UnresolvedCall { span, .. } => *span,
            CompilationError::TypeMismatch { span, .. } => *span,
            CompilationError::UnknownVariable { span, .. } => *span,
            CompilationError::NotAStatement { span } => *span,
            CompilationError::MissingReturn { span, .. } => *span,
            CompilationError::DuplicateFunction { span, .. } => *span,
            CompilationError::VariableRedeclaration { new_span, .. } => *new_span,
            CompilationError::TooManyArguments { span, .. } => *span,
            CompilationError::CodeTooLarge { span, .. } => *span,
        }
    }
}

/// A collection of compilation errors, in the order they were found.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompilationErrors {
    errors: Vec<CompilationError>,
}

impl CompilationErrors {
    /// Create a new empty error collection.
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add an error to the collection.
    pub fn push(&mut self, error: CompilationError) {
        self.errors.push(error);
    }

    /// Check if there are any errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterate over the errors.
    pub fn iter(&self) -> impl Iterator<Item = &CompilationError> {
        self.errors.iter()
    }

    /// The first error found, if any.
    pub fn first(&self) -> Option<&CompilationError> {
        self.errors.first()
    }

    /// Convert to a Vec of errors.
    pub fn into_vec(self) -> Vec<CompilationError> {
        self.errors
    }

    /// `Ok(value)` if no error was collected, otherwise `Err(self)`.
    pub fn into_result<T>(self, value: T) -> Result<T, CompilationErrors> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl IntoIterator for CompilationErrors {
    type Item = CompilationError;
    type IntoIter = std::vec::IntoIter<CompilationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a CompilationErrors {
    type Item = &'a CompilationError;
    type IntoIter = std::slice::Iter<'a, CompilationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl From<CompilationError> for CompilationErrors {
    fn from(error: CompilationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl std::fmt::Display for CompilationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompilationErrors {}

// ============================================================================
// Runtime Errors
// ============================================================================

/// Errors that occur while executing compiled code.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A host callable failed.
    #[error("native call '{function}' failed: {source}")]
    Native {
        function: String,
        #[source]
        source: NativeError,
    },

    /// A `def` value did not hold the type the script expected.
    #[error("cannot cast value of type '{found}' to '{expected}'")]
    InvalidCast { expected: String, found: String },

    /// An instruction needed more operands than the stack held.
    #[error("stack underflow at offset {offset}")]
    StackUnderflow { offset: usize },

    /// Script functions nested deeper than the VM allows.
    #[error("stack overflow: call depth exceeded {limit}")]
    StackOverflow { limit: usize },

    /// The bytecode could not be decoded.
    #[error("malformed bytecode at offset {offset}: {detail}")]
    MalformedBytecode { offset: usize, detail: String },

    /// A script function was entered with the wrong number of arguments.
    #[error("'{function}' expects {expected} argument(s), got {got}")]
    ArgumentCount {
        function: String,
        expected: usize,
        got: usize,
    },

    /// A script instance was created for the wrong receiver type.
    #[error("receiver must be of type '{expected}', got '{found}'")]
    InvalidReceiver { expected: String, found: String },

    /// A link-table index does not name an entry of the compiled unit.
    #[error("unknown {kind} index {index}")]
    UnknownIndex { kind: &'static str, index: usize },
}

// ============================================================================
// Unified Error
// ============================================================================

/// Top-level error type covering every phase.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmberError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Compilation(#[from] CompilationErrors),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl From<CompilationError> for EmberError {
    fn from(error: CompilationError) -> Self {
        EmberError::Compilation(error.into())
    }
}

impl EmberError {
    pub fn is_registration(&self) -> bool {
        matches!(self, EmberError::Registration(_))
    }

    pub fn is_compilation(&self) -> bool {
        matches!(self, EmberError::Compilation(_))
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, EmberError::Runtime(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_call_message() {
        let err = CompilationError::UnresolvedCall {
            name: "Foo".to_string(),
            arity: 2,
            span: Span::new(3, 7, 8),
        };
        assert_eq!(err.to_string(), "at 3:7: unknown call [Foo] with [2] arguments");
        assert_eq!(err.span(), Span::new(3, 7, 8));
    }

    #[test]
    fn limit_exceeded_takes_the_node_span() {
        let err = LimitExceeded::new("jump distance", 65535).at(Span::new(4, 2, 0));
        assert_eq!(err.span(), Span::new(4, 2, 0));
        assert_eq!(err.to_string(), "at 4:2: jump distance exceeds the limit of 65535");
    }

    #[test]
    fn redeclaration_reports_new_span() {
        let err = CompilationError::VariableRedeclaration {
            name: "x".to_string(),
            original_span: Span::new(1, 1, 1),
            new_span: Span::new(1, 5, 1),
        };
        assert_eq!(err.span(), Span::new(1, 5, 1));
        assert!(err.to_string().contains("originally declared at 1:1"));
    }

    #[test]
    fn errors_collection() {
        let mut errors = CompilationErrors::new();
        assert!(errors.is_empty());
        assert_eq!(errors.clone().into_result(1), Ok(1));

        errors.push(CompilationError::NotAStatement {
            span: Span::new(1, 1, 0),
        });
        errors.push(CompilationError::UnknownVariable {
            name: "y".to_string(),
            span: Span::new(2, 1, 0),
        });
        assert_eq!(errors.len(), 2);
        assert!(matches!(
            errors.first(),
            Some(CompilationError::NotAStatement { .. })
        ));
        assert_eq!(
            errors.to_string(),
            "at 1:1: not a statement\nat 2:1: undefined variable 'y'"
        );
        assert!(errors.into_result(()).is_err());
    }

    #[test]
    fn native_error_is_runtime_source() {
        use std::error::Error as _;

        let err = RuntimeError::Native {
            function: "lookup".to_string(),
            source: NativeError::new("not found"),
        };
        assert_eq!(err.to_string(), "native call 'lookup' failed: not found");
        assert!(err.source().is_some());
    }

    #[test]
    fn unified_conversions() {
        let err: EmberError = RegistrationError::InvalidBinding {
            name: "f".to_string(),
            reason: "empty".to_string(),
        }
        .into();
        assert!(err.is_registration());

        let err: EmberError = CompilationError::NotAStatement {
            span: Span::default(),
        }
        .into();
        assert!(err.is_compilation());
        assert_eq!(err.to_string(), "at 0:0: not a statement");

        let err: EmberError = RuntimeError::StackOverflow { limit: 4 }.into();
        assert!(err.is_runtime());
    }
}
