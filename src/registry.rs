// registry.rs - Constructing fixtures by identifier
//
// The resolver never builds fixtures itself. It asks a `FixtureFactory` for a
// fresh instance whenever it reaches an identifier for the first time.
// `FixtureRegistry` is the table-of-constructors implementation; any
// `Fn(&FixtureId) -> FixtureResult<Box<dyn Fixture>>` works as well.

use crate::error::{FixtureError, FixtureResult};
use crate::fixture::{Fixture, FixtureId};
use std::collections::HashMap;

/// Builds a new fixture instance for an identifier.
pub trait FixtureFactory {
    fn construct(&self, fixture: &FixtureId) -> FixtureResult<Box<dyn Fixture>>;
}

impl<F> FixtureFactory for F
where
    F: Fn(&FixtureId) -> FixtureResult<Box<dyn Fixture>>,
{
    fn construct(&self, fixture: &FixtureId) -> FixtureResult<Box<dyn Fixture>> {
        self(fixture)
    }
}

type Constructor = Box<dyn Fn() -> FixtureResult<Box<dyn Fixture>>>;

/// Identifier -> constructor table.
#[derive(Default)]
pub struct FixtureRegistry {
    constructors: HashMap<FixtureId, Constructor>,
}

impl FixtureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under the identifier its instances report.
    pub fn register<T>(&mut self) -> &mut Self
    where
        T: Fixture + Default,
    {
        let id = T::default().identifier();
        self.register_with(id, || Ok(Box::new(T::default()) as Box<dyn Fixture>))
    }

    /// Register an arbitrary constructor. A later registration for the same
    /// identifier replaces the earlier one.
    pub fn register_with<F>(&mut self, fixture: impl Into<FixtureId>, constructor: F) -> &mut Self
    where
        F: Fn() -> FixtureResult<Box<dyn Fixture>> + 'static,
    {
        let fixture = fixture.into();
        tracing::debug!(fixture = %fixture, "registering fixture constructor");
        self.constructors.insert(fixture, Box::new(constructor));
        self
    }

    pub fn contains(&self, fixture: &str) -> bool {
        self.constructors.contains_key(fixture)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &FixtureId> {
        self.constructors.keys()
    }
}

impl FixtureFactory for FixtureRegistry {
    fn construct(&self, fixture: &FixtureId) -> FixtureResult<Box<dyn Fixture>> {
        let constructor = self
            .constructors
            .get(fixture)
            .ok_or_else(|| FixtureError::UnknownFixture {
                fixture: fixture.to_string(),
            })?;
        constructor()
    }
}
