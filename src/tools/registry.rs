//! In-memory tool registry.
//!
//! Built exactly once from the loader's output and read-only afterwards,
//! so it is safe to share behind an `Arc` with any number of concurrent
//! dispatch workers.

use std::collections::HashMap;

use crate::schema::ToolSpec;
use crate::tools::ToolHandle;

pub struct ToolRegistry {
    handles: Vec<ToolHandle>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Build the registry from loaded handles. The loader has already
    /// enforced name uniqueness.
    pub fn new(handles: Vec<ToolHandle>) -> Self {
        let index = handles
            .iter()
            .enumerate()
            .map(|(i, h)| (h.spec.name.clone(), i))
            .collect();
        Self { handles, index }
    }

    /// Look up a tool by name. Unknown names are an ordinary miss, never
    /// a session-ending failure.
    pub fn get(&self, name: &str) -> Option<&ToolHandle> {
        self.index.get(name).map(|&i| &self.handles[i])
    }

    /// The full ordered set of specifications, for advertisement to the
    /// model backend.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.handles.iter().map(|h| h.spec.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MethodDecl;
    use crate::tools::{Arguments, Toolkit};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct NullKit;

    #[async_trait]
    impl Toolkit for NullKit {
        fn name(&self) -> &str {
            "null"
        }

        fn methods(&self) -> Vec<MethodDecl> {
            vec![
                MethodDecl::new("one", "", vec![]),
                MethodDecl::new("two", "", vec![]),
            ]
        }

        async fn invoke(&self, _method: &str, _args: &Arguments) -> anyhow::Result<Value> {
            Ok(json!(null))
        }
    }

    fn registry() -> ToolRegistry {
        let handles =
            crate::tools::loader::load_from_instances(vec![Arc::new(NullKit) as Arc<dyn Toolkit>])
                .unwrap();
        ToolRegistry::new(handles)
    }

    #[test]
    fn specs_preserve_load_order() {
        let reg = registry();
        let names: Vec<_> = reg.specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["one", "two"]);
    }

    #[test]
    fn lookup_hits_and_misses() {
        let reg = registry();
        assert!(reg.get("one").is_some());
        assert!(reg.get("three").is_none());
        assert_eq!(reg.len(), 2);
    }
}
