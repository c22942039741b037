// set.rs - The resolved fixture set and its lifecycle drivers
//
// A `FixtureSet` maps alias -> fixture in load order. Loading runs three
// phases over the whole set:
//   before_load (forward) -> load (forward) -> after_load (reverse)
// Unloading reverses the set first and then runs all three phases over that
// reversed order:
//   before_unload -> unload -> after_unload
//
// The first failing call aborts the batch; fixtures after it are not touched.

use crate::error::FixtureResult;
use crate::fixture::{canonical_name, Fixture, FixtureState};
use indexmap::IndexMap;
use std::fmt;

struct Entry {
    fixture: Box<dyn Fixture>,
    state: FixtureState,
}

/// Alias -> fixture mapping in dependency order.
#[derive(Default)]
pub struct FixtureSet {
    entries: IndexMap<String, Entry>,
}

impl FixtureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fixture. Re-inserting an existing alias moves it to the end.
    pub fn insert(&mut self, alias: impl Into<String>, fixture: Box<dyn Fixture>) {
        let alias = alias.into();
        self.entries.shift_remove(&alias);
        self.entries.insert(
            alias,
            Entry {
                fixture,
                state: FixtureState::Unloaded,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(canonical_name(alias))
    }

    /// Aliases in load order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Fixture)> {
        self.entries
            .iter()
            .map(|(alias, entry)| (alias.as_str(), entry.fixture.as_ref()))
    }

    /// Look up a fixture by alias; leading namespace separators are ignored.
    pub fn get(&self, alias: &str) -> Option<&dyn Fixture> {
        self.entries
            .get(canonical_name(alias))
            .map(|entry| entry.fixture.as_ref())
    }

    pub fn get_mut(&mut self, alias: &str) -> Option<&mut dyn Fixture> {
        match self.entries.get_mut(canonical_name(alias)) {
            Some(entry) => Some(entry.fixture.as_mut()),
            None => None,
        }
    }

    /// Look up a fixture and downcast it to its concrete type.
    pub fn get_as<T: Fixture>(&self, alias: &str) -> Option<&T> {
        self.get(alias)?.as_any().downcast_ref::<T>()
    }

    pub fn get_as_mut<T: Fixture>(&mut self, alias: &str) -> Option<&mut T> {
        self.get_mut(alias)?.as_any_mut().downcast_mut::<T>()
    }

    pub fn state(&self, alias: &str) -> Option<FixtureState> {
        self.entries.get(canonical_name(alias)).map(|entry| entry.state)
    }

    /// Run the load protocol over the set in dependency order.
    pub fn load_all(&mut self) -> FixtureResult<()> {
        tracing::debug!(fixtures = self.len(), "loading fixtures");

        for (alias, entry) in self.entries.iter_mut() {
            tracing::trace!(fixture = %alias, "before_load");
            entry.fixture.before_load()?;
            entry.state = FixtureState::Loading;
        }

        for (alias, entry) in self.entries.iter_mut() {
            tracing::debug!(fixture = %alias, "load");
            entry.fixture.load()?;
            entry.state = FixtureState::Loaded;
        }

        for (alias, entry) in self.entries.iter_mut().rev() {
            tracing::trace!(fixture = %alias, "after_load");
            entry.fixture.after_load()?;
            entry.state = FixtureState::Ready;
        }

        tracing::info!(fixtures = self.len(), "fixtures loaded");
        Ok(())
    }

    /// Run the unload protocol over the set in reverse dependency order.
    pub fn unload_all(&mut self) -> FixtureResult<()> {
        tracing::debug!(fixtures = self.len(), "unloading fixtures");

        for (alias, entry) in self.entries.iter_mut().rev() {
            tracing::trace!(fixture = %alias, "before_unload");
            entry.fixture.before_unload()?;
            entry.state = FixtureState::Unloading;
        }

        for (alias, entry) in self.entries.iter_mut().rev() {
            tracing::debug!(fixture = %alias, "unload");
            entry.fixture.unload()?;
            entry.state = FixtureState::Unloaded;
        }

        for (alias, entry) in self.entries.iter_mut().rev() {
            tracing::trace!(fixture = %alias, "after_unload");
            entry.fixture.after_unload()?;
            entry.state = FixtureState::Idle;
        }

        tracing::info!(fixtures = self.len(), "fixtures unloaded");
        Ok(())
    }
}

impl fmt::Debug for FixtureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.entries
                    .iter()
                    .map(|(alias, entry)| (alias, (entry.fixture.identifier(), entry.state))),
            )
            .finish()
    }
}

impl<S: Into<String>> FromIterator<(S, Box<dyn Fixture>)> for FixtureSet {
    fn from_iter<I: IntoIterator<Item = (S, Box<dyn Fixture>)>>(iter: I) -> Self {
        let mut set = FixtureSet::new();
        for (alias, fixture) in iter {
            set.insert(alias, fixture);
        }
        set
    }
}
