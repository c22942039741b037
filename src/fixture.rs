// fixture.rs - The fixture contract
//
// A fixture is a fixed state of the test environment. Each fixture names the
// fixtures it depends on and exposes load/unload plus four batch hooks.
// The hooks run once per batch around every fixture's own load/unload, so a
// fixture can acquire or release shared resources there.

use crate::error::{FixtureError, FixtureResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::borrow::Borrow;
use std::fmt;

/// Canonical name of a fixture type.
///
/// Leading namespace separators (`::` or `\`) are stripped, so
/// `"::app::UserFixture"` and `"app::UserFixture"` name the same fixture.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FixtureId(String);

impl FixtureId {
    pub fn new(name: impl AsRef<str>) -> Self {
        FixtureId(canonical_name(name.as_ref()).to_string())
    }

    /// The identifier a fixture type reports by default.
    pub fn of<T: ?Sized>() -> Self {
        FixtureId::new(std::any::type_name::<T>())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Strip leading namespace separators from a fixture name.
pub fn canonical_name(name: &str) -> &str {
    name.trim_start_matches(|c: char| c == ':' || c == '\\')
}

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FixtureId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FixtureId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FixtureId {
    fn from(name: &str) -> Self {
        FixtureId::new(name)
    }
}

impl From<String> for FixtureId {
    fn from(name: String) -> Self {
        FixtureId::new(name)
    }
}

impl From<FixtureId> for String {
    fn from(id: FixtureId) -> Self {
        id.0
    }
}

/// Where a fixture is in its load/unload cycle.
///
/// `Unloaded -> Loading -> Loaded -> Ready` on load and
/// `Ready -> Unloading -> Unloaded -> Idle` on unload. A failed call leaves
/// the fixture in the last state it reached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FixtureState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Ready,
    Unloading,
    Idle,
}

impl fmt::Display for FixtureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixtureState::Unloaded => write!(f, "unloaded"),
            FixtureState::Loading => write!(f, "loading"),
            FixtureState::Loaded => write!(f, "loaded"),
            FixtureState::Ready => write!(f, "ready"),
            FixtureState::Unloading => write!(f, "unloading"),
            FixtureState::Idle => write!(f, "idle"),
        }
    }
}

/// Upcast helper so resolved fixtures can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A fixed state of a test environment.
///
/// Only `load` and `unload` touch the fixture's own state. Every other
/// method defaults to a no-op.
pub trait Fixture: AsAny {
    /// Identifier used as the dependency-graph key and the default alias.
    fn identifier(&self) -> FixtureId {
        FixtureId::of::<Self>()
    }

    /// Fixtures that must be loaded before this one, in declared order.
    fn depends(&self) -> Vec<FixtureId> {
        Vec::new()
    }

    /// Apply one configuration override after construction.
    fn configure(&mut self, field: &str, _value: &Value) -> FixtureResult<()> {
        Err(FixtureError::UnknownField {
            fixture: self.identifier().to_string(),
            field: field.to_string(),
        })
    }

    /// Set up the fixture.
    fn load(&mut self) -> FixtureResult<()> {
        Ok(())
    }

    /// Reverse `load`, leaving the fixture empty.
    fn unload(&mut self) -> FixtureResult<()> {
        Ok(())
    }

    /// Called before any fixture in the batch is loaded.
    fn before_load(&mut self) -> FixtureResult<()> {
        Ok(())
    }

    /// Called after every fixture in the batch has been loaded.
    fn after_load(&mut self) -> FixtureResult<()> {
        Ok(())
    }

    /// Called before any fixture in the batch is unloaded.
    fn before_unload(&mut self) -> FixtureResult<()> {
        Ok(())
    }

    /// Called after every fixture in the batch has been unloaded.
    fn after_unload(&mut self) -> FixtureResult<()> {
        Ok(())
    }
}
