//! Unqualified calls: `name(arguments...)`.
//!
//! A call is resolved once during analysis into one of four strategies and
//! written as one of three code shapes:
//!
//! | resolution | code |
//! |---|---|
//! | local function, imported function | arguments, then a direct call |
//! | class binding | construct on first use into a per-instance cache field, then invoke |
//! | instance binding | load the shared target, arguments, then invoke |
//!
//! Receiver injection lets a class binding whose constructor starts with a
//! parameter of the script base type be called without that argument: the
//! running script instance is passed for it.
//!
//! [`CallResolution`] carries the matched entry together with the injection
//! marker, and owns all of the arithmetic that lines user arguments up with
//! declared parameters.

mod node;
mod resolve;
mod write;

#[cfg(test)]
mod fixtures;

use std::sync::Arc;

use ember_core::DataType;
use ember_registry::{ClassBinding, ImportedFunction, InstanceBinding};

use crate::locals::LocalFunction;

pub use node::CallLocalExpr;
pub use resolve::resolve_call;

/// How a call site invokes its target.
#[derive(Debug, Clone, Default)]
pub enum CallResolution {
    /// Not analyzed yet.
    #[default]
    Unresolved,
    /// A function of the unit being compiled.
    LocalFunction(Arc<LocalFunction>),
    /// A static host function.
    ImportedFunction(Arc<ImportedFunction>),
    /// A lazily constructed host object, cached per script instance and call site.
    ClassBinding {
        binding: Arc<ClassBinding>,
        /// The first constructor argument is the running script instance.
        receiver_injected: bool,
    },
    /// A method on a shared host object.
    InstanceBinding(Arc<InstanceBinding>),
}

impl CallResolution {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, CallResolution::Unresolved)
    }

    /// Short name of the strategy, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            CallResolution::Unresolved => "unresolved",
            CallResolution::LocalFunction(_) => "local function",
            CallResolution::ImportedFunction(_) => "imported function",
            CallResolution::ClassBinding { .. } => "class binding",
            CallResolution::InstanceBinding(_) => "instance binding",
        }
    }

    /// The full declared parameter list of the matched entry.
    pub fn parameters(&self) -> &[DataType] {
        match self {
            CallResolution::Unresolved => &[],
            CallResolution::LocalFunction(f) => f.parameters(),
            CallResolution::ImportedFunction(f) => f.parameters(),
            CallResolution::ClassBinding { binding, .. } => binding.parameters(),
            CallResolution::InstanceBinding(b) => b.parameters(),
        }
    }

    /// Number of leading declared parameters not supplied by the user.
    pub fn offset(&self) -> usize {
        match self {
            CallResolution::ClassBinding {
                receiver_injected: true,
                ..
            } => 1,
            _ => 0,
        }
    }

    /// The declared types of the user arguments, in order: user argument `i`
    /// lines up with declared parameter `i + offset`.
    pub fn argument_types(&self) -> &[DataType] {
        &self.parameters()[self.offset()..]
    }

    /// How many user arguments go to the constructor of a class binding.
    /// The rest go to its method. Zero for every other strategy.
    pub fn constructor_argument_count(&self) -> usize {
        match self {
            CallResolution::ClassBinding { binding, .. } => {
                binding.constructor_arity() - self.offset()
            }
            _ => 0,
        }
    }

    pub fn return_type(&self) -> Option<&DataType> {
        match self {
            CallResolution::Unresolved => None,
            CallResolution::LocalFunction(f) => Some(f.return_type()),
            CallResolution::ImportedFunction(f) => Some(f.return_type()),
            CallResolution::ClassBinding { binding, .. } => Some(binding.return_type()),
            CallResolution::InstanceBinding(b) => Some(b.return_type()),
        }
    }
}
