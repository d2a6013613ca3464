use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::{
    collection::ServiceEntry,
    identifier::ServiceId,
    instantiation::{instantiation_service_identifier, InstantiationService},
    signature::Dependency,
};

/// Graph of all services visible to a scope
/// Used to check for missing and circular dependencies before anything is built
pub struct DependencyGraph {
    entries: Vec<DependencyGraphEntry>,
    /// (scope depth, service) -> position in entries
    positions: HashMap<(usize, ServiceId), usize>,
    depth: usize,
}

struct DependencyGraphEntry {
    id: ServiceId,
    depth: usize,
    dependencies: Vec<Dependency>,
}

impl DependencyGraph {
    pub fn new(scope: &InstantiationService) -> Self {
        let mut graph = Self {
            entries: Vec::new(),
            positions: HashMap::new(),
            depth: 0,
        };

        for (depth, scope) in scope.chain().into_iter().enumerate() {
            graph.depth = depth;
            for (id, entry) in scope.snapshot().iter() {
                let dependencies = match entry {
                    ServiceEntry::Instance(_) => Vec::new(),
                    ServiceEntry::Descriptor(descriptor) => {
                        descriptor.constructor().dependencies().to_vec()
                    }
                };
                graph.positions.insert((depth, id), graph.entries.len());
                graph.entries.push(DependencyGraphEntry {
                    id,
                    depth,
                    dependencies,
                });
            }
        }

        graph
    }

    /// Declared dependencies of `id` as seen from the scope the graph was taken of
    ///
    /// `None` if the service is unknown, empty for services bound to an instance
    pub fn dependencies_of(&self, id: impl Into<ServiceId>) -> Option<&[Dependency]> {
        self.find(id.into(), self.depth)
            .map(|entry| entry.dependencies.as_slice())
    }

    /// Closest binding of `id` at or above `depth`, as the scope at `depth` would resolve it
    fn find(&self, id: ServiceId, depth: usize) -> Option<&DependencyGraphEntry> {
        (0..=depth)
            .rev()
            .find_map(|depth| self.positions.get(&(depth, id)))
            .map(|position| &self.entries[*position])
    }

    /// Validate the graph
    ///
    /// Returns a list of all issues
    pub fn check(&self) -> Result<(), DependencyGraphErrors> {
        let mut checked = HashSet::new();
        let mut errors = Vec::new();
        for entry in &self.entries {
            let mut dependency_chain = Vec::new();
            check_recurse(
                self,
                &mut checked,
                &mut errors,
                &mut dependency_chain,
                entry,
            );
        }

        if !errors.is_empty() {
            return Err(DependencyGraphErrors { errors });
        }

        return Ok(());

        fn check_recurse(
            graph: &DependencyGraph,
            checked: &mut HashSet<(usize, ServiceId)>,
            errors: &mut Vec<DependencyGraphError>,
            dependency_chain: &mut Vec<(usize, ServiceId)>,
            entry: &DependencyGraphEntry,
        ) {
            let key = (entry.depth, entry.id);

            // Circular Dependency Check
            if let Some(start) = dependency_chain.iter().position(|link| *link == key) {
                let mut chain: Vec<ServiceId> =
                    dependency_chain[start..].iter().map(|(_, id)| *id).collect();
                chain.push(entry.id); // Add current so chain is complete

                errors.push(DependencyGraphError::CircularDependency {
                    from: chain[0],
                    to: chain[chain.len() - 2],
                    chain,
                });
            }

            // Skip other checks if already checked
            if !checked.insert(key) {
                return;
            };

            dependency_chain.push(key);

            for dependency in &entry.dependencies {
                if dependency.id == instantiation_service_identifier().id() {
                    continue;
                }

                // Dependencies resolve from the scope owning the entry
                let Some(next_entry) = graph.find(dependency.id, entry.depth) else {
                    if !dependency.optional {
                        errors.push(DependencyGraphError::MissingDependency {
                            dependency: dependency.id,
                            required_by: entry.id,
                        });
                    }

                    continue;
                };

                check_recurse(graph, checked, errors, dependency_chain, next_entry);
            }

            dependency_chain.pop();
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyGraphError {
    #[error("'{required_by}' needs '{dependency}' but it is missing")]
    MissingDependency {
        dependency: ServiceId,
        required_by: ServiceId,
    },
    #[error("A Circular Dependency exists between '{from}' and '{to}' through {chain:?} - Consider loading one of them lazily")]
    CircularDependency {
        from: ServiceId,
        to: ServiceId,
        chain: Vec<ServiceId>,
    },
}
impl std::fmt::Display for DependencyGraphErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut display = Vec::new();
        display.push("The dependency graph had one or more errors:".to_string());
        for error in &self.errors {
            display.push(format!("- {}", error));
        }
        f.write_str(&display.join("\n"))
    }
}

#[derive(Error, Debug, Clone)]
pub struct DependencyGraphErrors {
    pub errors: Vec<DependencyGraphError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_listed_one_per_line() {
        let a = ServiceId::intern("dependency_graph.tests.a");
        let b = ServiceId::intern("dependency_graph.tests.b");
        let errors = DependencyGraphErrors {
            errors: vec![
                DependencyGraphError::MissingDependency {
                    dependency: b,
                    required_by: a,
                },
                DependencyGraphError::CircularDependency {
                    from: a,
                    to: a,
                    chain: vec![a, a],
                },
            ],
        };

        let display = errors.to_string();
        let lines: Vec<&str> = display.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "- 'dependency_graph.tests.a' needs 'dependency_graph.tests.b' but it is missing"
        );
        assert!(lines[2].starts_with("- A Circular Dependency exists"));
    }
}
