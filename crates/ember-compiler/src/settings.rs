//! Compiler settings.

/// Largest argument count the bytecode can encode for one call.
pub const MAX_CALL_ARGUMENTS: usize = u8::MAX as usize;

/// Options that shape how a unit is compiled.
///
/// Settings reach expression nodes through
/// [`AstNode::store_settings`](crate::ast::AstNode::store_settings).
///
/// # Example
///
/// ```
/// use ember_compiler::CompilerSettings;
///
/// let settings = CompilerSettings::default()
///     .with_line_numbers(false)
///     .with_max_call_arguments(8);
/// assert!(!settings.line_numbers());
/// assert_eq!(settings.max_call_arguments(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerSettings {
    line_numbers: bool,
    max_call_arguments: usize,
}

impl CompilerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record source lines for every emitted instruction.
    pub fn with_line_numbers(mut self, enabled: bool) -> Self {
        self.line_numbers = enabled;
        self
    }

    /// Limit the number of arguments a call may pass. Values above
    /// [`MAX_CALL_ARGUMENTS`] are clamped.
    pub fn with_max_call_arguments(mut self, max: usize) -> Self {
        self.max_call_arguments = max.min(MAX_CALL_ARGUMENTS);
        self
    }

    pub fn line_numbers(&self) -> bool {
        self.line_numbers
    }

    pub fn max_call_arguments(&self) -> usize {
        self.max_call_arguments
    }
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            line_numbers: true,
            max_call_arguments: MAX_CALL_ARGUMENTS,
        }
    }
}
