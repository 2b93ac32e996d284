//! Toolkits — groups of callable tools exposed to the model.
//!
//! A toolkit is one instance owning one or more tool methods. The loader
//! instantiates the configured toolkits at startup, derives a [`ToolSpec`]
//! per exposed method, and hands the result to the registry. Tool state, if
//! any, lives inside the toolkit instance; the handles close over it.

pub mod loader;
pub mod registry;
pub mod shell;
pub mod utility;
pub mod wikipedia;

pub use loader::load_toolkits;
pub use registry::ToolRegistry;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::schema::{MethodDecl, ToolSpec};

/// Validated, coerced arguments passed to a tool invocation.
pub type Arguments = Map<String, Value>;

/// Capability interface every tool group implements.
///
/// Construction must be side-effect-free and take no runtime arguments;
/// the loader calls it exactly once per configured source.
#[async_trait]
pub trait Toolkit: Send + Sync {
    /// Identity used in load-time error reports.
    fn name(&self) -> &str;

    /// The methods this toolkit exposes. Declarations whose name starts
    /// with `_` are internal and never advertised.
    fn methods(&self) -> Vec<MethodDecl>;

    /// Invoke one of the declared methods. Arguments have already been
    /// validated and coerced against the method's spec.
    async fn invoke(&self, method: &str, args: &Arguments) -> Result<Value>;
}

/// A tool specification bound to the instance that implements it.
/// Created at load time, immutable for the life of the process.
#[derive(Clone)]
pub struct ToolHandle {
    pub spec: ToolSpec,
    /// Name of the toolkit this tool came from (for load-error reporting).
    pub source: String,
    toolkit: Arc<dyn Toolkit>,
}

impl ToolHandle {
    pub fn new(spec: ToolSpec, source: impl Into<String>, toolkit: Arc<dyn Toolkit>) -> Self {
        Self {
            spec,
            source: source.into(),
            toolkit,
        }
    }

    /// Call the underlying method on the owning toolkit instance.
    pub async fn invoke(&self, args: &Arguments) -> Result<Value> {
        self.toolkit.invoke(&self.spec.name, args).await
    }
}

impl std::fmt::Debug for ToolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolHandle")
            .field("spec", &self.spec)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
