//! Compilation context.
//!
//! A [`Context`] ties a sealed binding registry to the type of the receiver
//! scripts run against, and compiles script units into [`ScriptClass`]es.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use ember::{BindingRegistry, Context, DataType, Expr, FunctionDecl, ObjectRef, ScriptUnit, ScriptValue, Span};
//!
//! let script = DataType::object("Script");
//! let context = Context::new(Arc::new(BindingRegistry::empty()), script.clone());
//!
//! let main = FunctionDecl::new("main", DataType::int(), Span::default())
//!     .with_body(vec![Expr::constant(42i64, Span::default())]);
//! let class = context.compile(ScriptUnit::new(main)).unwrap();
//!
//! let mut instance = class.new_instance(ObjectRef::new(script, ())).unwrap();
//! assert_eq!(instance.execute(&[]).unwrap(), ScriptValue::Int(42));
//! ```

use std::sync::Arc;

use ember_compiler::{Compiler, CompilerSettings, ScriptUnit};
use ember_core::{DataType, EmberError};
use ember_registry::BindingRegistry;

use crate::script::ScriptClass;

/// Compiles scripts against one registry.
#[derive(Debug, Clone)]
pub struct Context {
    registry: Arc<BindingRegistry>,
    base_type: DataType,
    settings: CompilerSettings,
}

impl Context {
    /// Create a context whose scripts run against receivers of `base_type`.
    pub fn new(registry: Arc<BindingRegistry>, base_type: DataType) -> Self {
        Self {
            registry,
            base_type,
            settings: CompilerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: CompilerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn registry(&self) -> &Arc<BindingRegistry> {
        &self.registry
    }

    pub fn base_type(&self) -> &DataType {
        &self.base_type
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    /// Compile a unit into a script class.
    ///
    /// # Errors
    ///
    /// Returns [`EmberError::Compilation`] with every error found.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&self, unit: ScriptUnit) -> Result<Arc<ScriptClass>, EmberError> {
        let compiler = Compiler::new(Arc::clone(&self.registry), self.base_type.clone(), self.settings);
        let unit = compiler.compile(unit)?;
        Ok(Arc::new(ScriptClass::new(unit, self.base_type.clone())))
    }
}
