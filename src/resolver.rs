// resolver.rs - Turning declarations into an ordered fixture set
//
// Resolution is a depth-first topological sort driven by an explicit stack:
//
// 1. Top-level declarations are normalized into (identifier, alias, overrides).
//    The alias and override tables are built from the top level only, and a
//    later entry for an identifier replaces an earlier one. Both tables are
//    read when a declaration is popped, never when it is pushed.
// 2. Every declaration is pushed so that the first one is popped first.
// 3. Popping an unvisited declaration marks its name `InProgress`, then pushes
//    the constructed instance followed by its dependencies (first dependency on
//    top). Meeting an `InProgress` name again means a cycle.
// 4. Popping a constructed instance (re)inserts it at the end of the result,
//    which places it after everything it depends on.

use crate::declaration::{Declaration, Declarations, Overrides};
use crate::error::{FixtureError, FixtureResult};
use crate::fixture::{Fixture, FixtureId};
use crate::registry::FixtureFactory;
use crate::set::FixtureSet;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Per-name status while resolving. Absent from the map means unvisited.
enum NodeState {
    InProgress,
    Resolved(Box<dyn Fixture>),
}

/// Work item on the expansion stack.
enum Pending {
    Declared(FixtureId),
    Constructed {
        name: String,
        instance: Box<dyn Fixture>,
    },
}

/// Resolves declarations against a fixture factory.
pub struct FixtureResolver<'a> {
    factory: &'a dyn FixtureFactory,
}

impl<'a> FixtureResolver<'a> {
    pub fn new(factory: &'a dyn FixtureFactory) -> Self {
        Self { factory }
    }

    /// Build the dependency-ordered set for `declarations`.
    ///
    /// The result holds every declared fixture plus every transitive
    /// dependency, each exactly once, never before a fixture it depends on.
    pub fn resolve(&self, declarations: Declarations) -> FixtureResult<FixtureSet> {
        let mut context = ResolveContext::default();
        let mut stack = Vec::with_capacity(declarations.len());

        for (alias, declaration) in declarations {
            stack.push(context.normalize(alias, declaration)?);
        }
        stack.reverse();

        let mut nodes: IndexMap<String, NodeState> = IndexMap::new();

        while let Some(pending) = stack.pop() {
            match pending {
                Pending::Constructed { name, instance } => {
                    tracing::trace!(fixture = %name, "fixture resolved");
                    nodes.shift_remove(&name);
                    nodes.insert(name, NodeState::Resolved(instance));
                }
                Pending::Declared(fixture) => {
                    let name = context.alias_for(&fixture);
                    match nodes.get(&name) {
                        None => {
                            nodes.insert(name.clone(), NodeState::InProgress);
                            let instance = context.build(self.factory, &fixture)?;
                            let depends = instance.depends();
                            tracing::debug!(
                                fixture = %fixture,
                                alias = %name,
                                dependencies = depends.len(),
                                "expanding fixture"
                            );

                            stack.push(Pending::Constructed { name, instance });
                            stack.extend(depends.into_iter().rev().map(Pending::Declared));
                        }
                        Some(NodeState::InProgress) => {
                            return Err(FixtureError::CircularDependency {
                                fixture: fixture.to_string(),
                            });
                        }
                        Some(NodeState::Resolved(_)) => {}
                    }
                }
            }
        }

        // every marker is followed on the stack by its own instance, so no
        // `InProgress` node survives an empty stack
        let set: FixtureSet = nodes
            .into_iter()
            .filter_map(|(name, node)| match node {
                NodeState::Resolved(instance) => Some((name, instance)),
                NodeState::InProgress => None,
            })
            .collect();

        tracing::info!(fixtures = set.len(), "resolved fixture set");
        Ok(set)
    }
}

/// Tables built from the top-level declarations.
#[derive(Default)]
struct ResolveContext {
    aliases: HashMap<FixtureId, String>,
    config: HashMap<FixtureId, Overrides>,
    instances: HashMap<FixtureId, Box<dyn Fixture>>,
}

impl ResolveContext {
    fn normalize(&mut self, alias: Option<String>, declaration: Declaration) -> FixtureResult<Pending> {
        let fixture = match declaration {
            Declaration::Identifier(fixture) => fixture,
            Declaration::Configured {
                fixture: Some(fixture),
                overrides,
            } => {
                self.config.insert(fixture.clone(), overrides);
                fixture
            }
            Declaration::Configured { fixture: None, .. } => {
                let name = alias.unwrap_or_else(|| "<anonymous>".to_string());
                return Err(FixtureError::invalid_declaration(
                    name,
                    "you must specify the fixture identifier",
                ));
            }
            Declaration::Instance(instance) => {
                let fixture = instance.identifier();
                if self.instances.insert(fixture.clone(), instance).is_some() {
                    tracing::warn!(fixture = %fixture, "fixture instance declared twice, keeping the last");
                }
                fixture
            }
        };

        let alias = alias.unwrap_or_else(|| fixture.to_string());
        if let Some(previous) = self.aliases.insert(fixture.clone(), alias.clone()) {
            if previous != alias {
                tracing::warn!(fixture = %fixture, previous = %previous, alias = %alias, "fixture alias redeclared");
            }
        }

        Ok(Pending::Declared(fixture))
    }

    fn alias_for(&self, fixture: &FixtureId) -> String {
        self.aliases
            .get(fixture)
            .cloned()
            .unwrap_or_else(|| fixture.to_string())
    }

    /// Take the declared instance for `fixture` if one was supplied, else ask
    /// the factory and apply the overrides recorded for the identifier.
    fn build(&mut self, factory: &dyn FixtureFactory, fixture: &FixtureId) -> FixtureResult<Box<dyn Fixture>> {
        if let Some(instance) = self.instances.remove(fixture) {
            return Ok(instance);
        }

        let mut instance = factory.construct(fixture)?;
        for (field, value) in self.config.get(fixture).into_iter().flatten() {
            instance.configure(field, value)?;
        }
        Ok(instance)
    }
}
