//! Import graph resolution.

use std::collections::HashMap;

use gqlmod_di::MergeStrategy;
use tracing::{trace, warn};

use super::Module;
use crate::error::CompositionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting,
    Done,
}

/// Modules reachable from a root, each once, imports before importers.
///
/// The order is a depth-first post-order over `imports`: for a module
/// importing `[b, c]`, everything `b` pulls in comes first, then everything
/// `c` pulls in that was not already seen, then the module itself.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    modules: Vec<Module>,
}

impl ModuleGraph {
    /// Walks the imports of `root`.
    ///
    /// Modules are identified by name. When two different modules share a
    /// name, `Strict` rejects the graph; otherwise the first one reached is
    /// kept.
    ///
    /// # Errors
    ///
    /// `CyclicImport` when an import chain leads back to a module still being
    /// visited, `DuplicateModule` as described above.
    pub fn resolve(root: &Module, strategy: MergeStrategy) -> Result<Self, CompositionError> {
        let mut walk = Walk {
            strategy,
            states: HashMap::new(),
            stack: Vec::new(),
            order: Vec::new(),
        };
        walk.visit(root)?;
        trace!(root = %root.name(), modules = walk.order.len(), "Resolved module graph");
        Ok(Self { modules: walk.order })
    }

    /// Modules in dependency order; the root is last.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(Module::name).collect()
    }

    pub fn root(&self) -> Option<&Module> {
        self.modules.last()
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|module| module.name() == name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

struct Walk {
    strategy: MergeStrategy,
    states: HashMap<String, VisitState>,
    stack: Vec<String>,
    order: Vec<Module>,
}

impl Walk {
    fn visit(&mut self, module: &Module) -> Result<(), CompositionError> {
        let name = module.name();

        match self.states.get(name) {
            Some(VisitState::Visiting) => {
                let start = self
                    .stack
                    .iter()
                    .position(|entry| entry == name)
                    .unwrap_or_default();
                let mut path = self.stack[start..].to_vec();
                path.push(name.to_string());
                return Err(CompositionError::CyclicImport { path });
            }
            Some(VisitState::Done) => {
                if let Some(seen) = self.order.iter().find(|seen| seen.name() == name) {
                    if !seen.is_same(module) {
                        self.duplicate(name)?;
                    }
                }
                return Ok(());
            }
            None => {}
        }

        self.states.insert(name.to_string(), VisitState::Visiting);
        self.stack.push(name.to_string());

        for import in module.imports() {
            self.visit(&import)?;
        }

        self.stack.pop();
        self.states.insert(name.to_string(), VisitState::Done);
        self.order.push(module.clone());
        Ok(())
    }

    fn duplicate(&self, name: &str) -> Result<(), CompositionError> {
        match self.strategy {
            MergeStrategy::Strict => Err(CompositionError::DuplicateModule {
                name: name.to_string(),
            }),
            MergeStrategy::Warn | MergeStrategy::Override => {
                warn!(module = %name, "Two different modules share a name; keeping the first");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn module(name: &str, imports: Vec<Module>) -> Module {
        Module::builder(name).imports(imports).build()
    }

    #[test]
    fn test_post_order() {
        let c = module("c", vec![]);
        let b = module("b", vec![c.clone()]);
        let a = module("a", vec![b]);

        let graph = ModuleGraph::resolve(&a, MergeStrategy::Override).unwrap();
        assert_eq!(graph.names(), vec!["c", "b", "a"]);
        assert_eq!(graph.root().unwrap().name(), "a");
    }

    #[test]
    fn test_diamond_visits_shared_module_once() {
        let shared = module("shared", vec![]);
        let left = module("left", vec![shared.clone()]);
        let right = module("right", vec![shared.clone()]);
        let root = module("root", vec![left, right]);

        let graph = ModuleGraph::resolve(&root, MergeStrategy::Strict).unwrap();
        assert_eq!(graph.names(), vec!["shared", "left", "right", "root"]);
    }

    #[test]
    fn test_cycle_is_detected() {
        // b imports a lazily, so the cycle can be expressed.
        let a_slot: std::sync::Arc<std::sync::OnceLock<Module>> = Default::default();
        let slot = std::sync::Arc::clone(&a_slot);
        let b = Module::builder("b")
            .imports_with(move |_| slot.get().cloned().into_iter().collect())
            .build();
        let a = module("a", vec![b]);
        a_slot.set(a.clone()).unwrap();

        let err = ModuleGraph::resolve(&a, MergeStrategy::Override).unwrap_err();
        match err {
            CompositionError::CyclicImport { path } => assert_eq!(path, vec!["a", "b", "a"]),
            other => panic!("expected cycle, got {other}"),
        }
    }

    #[test]
    fn test_self_import_is_a_cycle() {
        let slot: std::sync::Arc<std::sync::OnceLock<Module>> = Default::default();
        let inner = std::sync::Arc::clone(&slot);
        let selfish = Module::builder("selfish")
            .imports_with(move |_| inner.get().cloned().into_iter().collect())
            .build();
        slot.set(selfish.clone()).unwrap();

        let err = ModuleGraph::resolve(&selfish, MergeStrategy::Override).unwrap_err();
        assert!(matches!(err, CompositionError::CyclicImport { ref path } if path.len() == 2));
    }

    #[test]
    fn test_duplicate_names() {
        let first = Module::builder("users").config(json!({"v": 1})).build();
        let second = first.with_config(json!({"v": 2}));
        let root = module("root", vec![first, second]);

        let graph = ModuleGraph::resolve(&root, MergeStrategy::Warn).unwrap();
        assert_eq!(graph.names(), vec!["users", "root"]);
        assert_eq!(graph.get("users").unwrap().config(), &json!({"v": 1}));

        let err = ModuleGraph::resolve(&root, MergeStrategy::Strict).unwrap_err();
        assert!(matches!(err, CompositionError::DuplicateModule { ref name } if name == "users"));
    }

    #[test]
    fn test_same_module_twice_is_not_a_duplicate() {
        let users = module("users", vec![]);
        let root = module("root", vec![users.clone(), users]);
        assert!(ModuleGraph::resolve(&root, MergeStrategy::Strict).is_ok());
    }
}
