//! Toolkit loading — resolves configured sources into tool handles.
//!
//! Sources are toolkit identifiers resolved against a build-time factory
//! table. Loading is one-shot: every source is instantiated and every method
//! schema built before the registry is considered ready, and any failure
//! aborts startup rather than leaving a partially loaded set.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::LoadError;
use crate::schema::build_spec;
use crate::tools::{shell, utility, wikipedia, ToolHandle, Toolkit};

type Constructor = fn() -> anyhow::Result<Box<dyn Toolkit>>;

/// Resolve a toolkit identifier to its zero-argument constructor.
fn builtin_constructor(id: &str) -> Option<Constructor> {
    match id {
        "wikipedia" => Some(|| Ok(Box::new(wikipedia::WikipediaToolkit::new()))),
        "shell" => Some(|| Ok(Box::new(shell::ShellToolkit::new()))),
        "utility" => Some(|| Ok(Box::new(utility::UtilityToolkit::new()))),
        _ => None,
    }
}

/// Instantiate the configured toolkit sources and collect every tool handle.
pub fn load_toolkits(sources: &[String]) -> Result<Vec<ToolHandle>, LoadError> {
    let mut instances: Vec<Arc<dyn Toolkit>> = Vec::with_capacity(sources.len());

    for id in sources {
        let ctor = builtin_constructor(id).ok_or_else(|| LoadError::UnknownToolkit(id.clone()))?;
        let toolkit = ctor().map_err(|e| LoadError::Construction {
            toolkit: id.clone(),
            reason: e.to_string(),
        })?;
        instances.push(Arc::from(toolkit));
    }

    load_from_instances(instances)
}

/// Build handles from already-constructed toolkit instances, enforcing
/// registry-wide name uniqueness. Order follows the instance order, then
/// each toolkit's declaration order.
pub fn load_from_instances(
    toolkits: Vec<Arc<dyn Toolkit>>,
) -> Result<Vec<ToolHandle>, LoadError> {
    let mut handles = Vec::new();
    let mut seen: HashMap<String, String> = HashMap::new();

    for toolkit in toolkits {
        let source = toolkit.name().to_string();
        for method in toolkit.methods() {
            if method.name.starts_with('_') {
                debug!("Skipping internal method {}.{}", source, method.name);
                continue;
            }

            let spec = build_spec(&source, &method)?;

            if let Some(first) = seen.get(&spec.name) {
                return Err(LoadError::DuplicateTool {
                    name: spec.name,
                    first: first.clone(),
                    second: source,
                });
            }
            seen.insert(spec.name.clone(), source.clone());

            debug!(
                "Loaded tool {} from {} ({} parameters)",
                spec.name,
                source,
                spec.parameters.len()
            );
            handles.push(ToolHandle::new(spec, source.clone(), toolkit.clone()));
        }
    }

    info!("Loaded {} tools", handles.len());
    Ok(handles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{MethodDecl, ParamDecl};
    use crate::tools::Arguments;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct FixtureKit {
        name: &'static str,
        methods: Vec<MethodDecl>,
    }

    #[async_trait]
    impl Toolkit for FixtureKit {
        fn name(&self) -> &str {
            self.name
        }

        fn methods(&self) -> Vec<MethodDecl> {
            self.methods.clone()
        }

        async fn invoke(&self, _method: &str, _args: &Arguments) -> anyhow::Result<Value> {
            Ok(json!(null))
        }
    }

    fn kit(name: &'static str, methods: Vec<MethodDecl>) -> Arc<dyn Toolkit> {
        Arc::new(FixtureKit { name, methods })
    }

    #[test]
    fn loads_methods_in_declaration_order() {
        let handles = load_from_instances(vec![kit(
            "alpha",
            vec![
                MethodDecl::new("first", "", vec![]),
                MethodDecl::new("second", "", vec![]),
            ],
        )])
        .unwrap();

        let names: Vec<_> = handles.iter().map(|h| h.spec.name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
        assert!(handles.iter().all(|h| h.source == "alpha"));
    }

    #[test]
    fn internal_methods_are_not_advertised() {
        let handles = load_from_instances(vec![kit(
            "alpha",
            vec![
                MethodDecl::new("visible", "", vec![]),
                MethodDecl::new("_scratch", "", vec![]),
            ],
        )])
        .unwrap();

        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].spec.name, "visible");
    }

    #[test]
    fn duplicate_names_across_toolkits_fail_fast_naming_both_sources() {
        let err = load_from_instances(vec![
            kit("alpha", vec![MethodDecl::new("lookup", "", vec![])]),
            kit("beta", vec![MethodDecl::new("lookup", "", vec![])]),
        ])
        .unwrap_err();

        match err {
            LoadError::DuplicateTool {
                name,
                first,
                second,
            } => {
                assert_eq!(name, "lookup");
                assert_eq!(first, "alpha");
                assert_eq!(second, "beta");
            }
            other => panic!("expected DuplicateTool, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_parameter_type_aborts_the_load() {
        let err = load_from_instances(vec![kit(
            "alpha",
            vec![MethodDecl::new(
                "broken",
                "",
                vec![ParamDecl::required("path", "PathBuf", "")],
            )],
        )])
        .unwrap_err();

        assert!(matches!(err, LoadError::Schema(_)));
    }

    #[test]
    fn unknown_source_identifier_is_rejected() {
        let err = load_toolkits(&["no_such_toolkit".to_string()]).unwrap_err();
        assert!(matches!(err, LoadError::UnknownToolkit(name) if name == "no_such_toolkit"));
    }

    #[test]
    fn builtin_sources_all_resolve() {
        let handles = load_toolkits(&[
            "wikipedia".to_string(),
            "shell".to_string(),
            "utility".to_string(),
        ])
        .unwrap();

        let names: Vec<_> = handles.iter().map(|h| h.spec.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "fetch_wikipedia_content",
                "run_shell_command",
                "get_current_time",
                "calculator",
            ]
        );
    }
}
