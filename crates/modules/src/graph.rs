//! Dependency resolution.
//!
//! Nodes are modules in registration order; an edge `a -> b` means "`a`
//! depends on `b`". Resolution runs in three passes:
//!
//! 1. every declared dependency must name a registered module;
//! 2. a depth-first walk with a "visiting" mark rejects cycles and reports the
//!    modules on the cycle;
//! 3. Kahn's algorithm produces the order, always taking the lowest
//!    registration index among modules whose dependencies are all placed, so
//!    independent modules start in the order they were registered.

use std::collections::{BTreeSet, HashMap};

use crate::{ModuleDescriptor, RegistryError};

/// Resolve an initialization order for `descriptors` (given in registration
/// order). Returns indices into `descriptors`.
pub fn resolve_order<'a, I>(descriptors: I) -> Result<Vec<usize>, RegistryError>
where
    I: IntoIterator<Item = &'a ModuleDescriptor>,
{
    let graph = DependencyGraph::build(descriptors)?;
    if let Some(cycle) = graph.find_cycle() {
        return Err(RegistryError::CyclicDependency { modules: cycle });
    }
    Ok(graph.topological_order())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

struct DependencyGraph<'a> {
    names: Vec<&'a str>,
    /// `deps[i]`: distinct modules `i` depends on, in declaration order.
    deps: Vec<Vec<usize>>,
}

impl<'a> DependencyGraph<'a> {
    fn build<I>(descriptors: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = &'a ModuleDescriptor>,
    {
        let descriptors: Vec<&'a ModuleDescriptor> = descriptors.into_iter().collect();
        let index: HashMap<&str, usize> = descriptors
            .iter()
            .enumerate()
            .map(|(i, &d)| (d.name(), i))
            .collect();

        let mut deps = Vec::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            let mut edges: Vec<usize> = Vec::with_capacity(descriptor.dependencies().len());
            for dependency in descriptor.dependencies() {
                let Some(&target) = index.get(dependency.as_str()) else {
                    return Err(RegistryError::UnknownDependency {
                        module: descriptor.name().to_string(),
                        dependency: dependency.clone(),
                    });
                };
                if !edges.contains(&target) {
                    edges.push(target);
                }
            }
            deps.push(edges);
        }

        Ok(Self {
            names: descriptors.iter().map(|&d| d.name()).collect(),
            deps,
        })
    }

    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks = vec![Mark::Unvisited; self.names.len()];
        let mut path = Vec::new();

        (0..self.names.len()).find_map(|start| {
            if marks[start] == Mark::Unvisited {
                self.visit(start, &mut marks, &mut path)
            } else {
                None
            }
        })
    }

    fn visit(&self, node: usize, marks: &mut [Mark], path: &mut Vec<usize>) -> Option<Vec<String>> {
        marks[node] = Mark::Visiting;
        path.push(node);

        for &dep in &self.deps[node] {
            match marks[dep] {
                Mark::Visiting => {
                    let start = path.iter().position(|&n| n == dep).unwrap_or(0);
                    return Some(path[start..].iter().map(|&n| self.names[n].to_string()).collect());
                }
                Mark::Unvisited => {
                    if let Some(cycle) = self.visit(dep, marks, path) {
                        return Some(cycle);
                    }
                }
                Mark::Done => {}
            }
        }

        path.pop();
        marks[node] = Mark::Done;
        None
    }

    /// Only meaningful on an acyclic graph.
    fn topological_order(&self) -> Vec<usize> {
        let n = self.names.len();
        let mut pending: Vec<usize> = self.deps.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (module, deps) in self.deps.iter().enumerate() {
            for &dep in deps {
                dependents[dep].push(module);
            }
        }

        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(next) = ready.pop_first() {
            order.push(next);
            for &dependent in &dependents[next] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str, deps: &[&str]) -> ModuleDescriptor {
        ModuleDescriptor::new(name, "0.1.0", format!("/{name}")).with_dependencies(deps.iter().copied())
    }

    fn names(descriptors: &[ModuleDescriptor], order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| descriptors[i].name().to_string()).collect()
    }

    #[test]
    fn chain_registered_out_of_order() {
        let ds = vec![module("c", &["b"]), module("a", &[]), module("b", &["a"])];
        let order = resolve_order(&ds).unwrap();
        assert_eq!(names(&ds, &order), ["a", "b", "c"]);
    }

    #[test]
    fn independent_modules_keep_registration_order() {
        let ds = vec![
            module("analytics", &[]),
            module("iam", &[]),
            module("teams", &["iam"]),
            module("notifications", &[]),
        ];
        let order = resolve_order(&ds).unwrap();
        assert_eq!(names(&ds, &order), ["analytics", "iam", "teams", "notifications"]);
    }

    #[test]
    fn diamond() {
        let ds = vec![
            module("chat", &["iam", "teams"]),
            module("teams", &["iam"]),
            module("iam", &[]),
        ];
        let order = resolve_order(&ds).unwrap();
        assert_eq!(names(&ds, &order), ["iam", "teams", "chat"]);
    }

    #[test]
    fn repeated_dependency_is_counted_once() {
        let ds = vec![module("b", &["a", "a"]), module("a", &[])];
        let order = resolve_order(&ds).unwrap();
        assert_eq!(names(&ds, &order), ["a", "b"]);
    }

    #[test]
    fn unknown_dependency() {
        let ds = vec![module("chat", &["iam", "presence"]), module("iam", &[])];
        assert_eq!(
            resolve_order(&ds).unwrap_err(),
            RegistryError::UnknownDependency {
                module: "chat".into(),
                dependency: "presence".into(),
            }
        );
    }

    #[test]
    fn two_node_cycle_names_both() {
        let ds = vec![module("a", &["b"]), module("b", &["a"])];
        assert_eq!(
            resolve_order(&ds).unwrap_err(),
            RegistryError::CyclicDependency {
                modules: vec!["a".into(), "b".into()],
            }
        );
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let ds = vec![module("a", &["a"])];
        assert_eq!(
            resolve_order(&ds).unwrap_err(),
            RegistryError::CyclicDependency {
                modules: vec!["a".into()],
            }
        );
    }

    #[test]
    fn cycle_report_excludes_the_approach_path() {
        // entry -> x -> y -> z -> x
        let ds = vec![
            module("entry", &["x"]),
            module("x", &["y"]),
            module("y", &["z"]),
            module("z", &["x"]),
        ];
        assert_eq!(
            resolve_order(&ds).unwrap_err(),
            RegistryError::CyclicDependency {
                modules: vec!["x".into(), "y".into(), "z".into()],
            }
        );
    }

    #[test]
    fn empty_graph() {
        assert!(resolve_order(&Vec::<ModuleDescriptor>::new()).unwrap().is_empty());
    }
}
