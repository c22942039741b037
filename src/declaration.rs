// declaration.rs - How a test context asks for fixtures
//
// A declaration comes in three shapes:
// - a bare identifier
// - an identifier with configuration overrides
// - a fixture instance that was built by hand
//
// A `Declarations` list pairs each declaration with an optional alias. An
// entry without an alias is known by its identifier.

use crate::error::{FixtureError, FixtureResult};
use crate::fixture::{Fixture, FixtureId};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// Field name -> value pairs applied to a freshly constructed fixture.
pub type Overrides = IndexMap<String, Value>;

/// Key naming the fixture identifier inside a JSON declaration object.
pub const FIXTURE_KEY: &str = "fixture";

/// One requested fixture.
pub enum Declaration {
    Identifier(FixtureId),
    /// `fixture` is `None` only when the declaration came from untyped input
    /// without an identifier; resolving it fails.
    Configured {
        fixture: Option<FixtureId>,
        overrides: Overrides,
    },
    Instance(Box<dyn Fixture>),
}

impl Declaration {
    /// Request fixture type `T` by its default identifier.
    pub fn of<T: Fixture>() -> Self {
        Declaration::Identifier(FixtureId::of::<T>())
    }

    pub fn id(fixture: impl Into<FixtureId>) -> Self {
        Declaration::Identifier(fixture.into())
    }

    /// Start a configured declaration; add overrides with [`Declaration::set`].
    pub fn configured(fixture: impl Into<FixtureId>) -> Self {
        Declaration::Configured {
            fixture: Some(fixture.into()),
            overrides: Overrides::new(),
        }
    }

    pub fn instance<F: Fixture>(fixture: F) -> Self {
        Declaration::Instance(Box::new(fixture))
    }

    /// Add a configuration override. A bare identifier becomes a configured
    /// declaration; an instance is left untouched.
    pub fn set(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        match self {
            Declaration::Identifier(fixture) => {
                let mut overrides = Overrides::new();
                overrides.insert(field.into(), value.into());
                Declaration::Configured {
                    fixture: Some(fixture),
                    overrides,
                }
            }
            Declaration::Configured {
                fixture,
                mut overrides,
            } => {
                overrides.insert(field.into(), value.into());
                Declaration::Configured { fixture, overrides }
            }
            instance @ Declaration::Instance(_) => instance,
        }
    }

    /// Identifier this declaration refers to, if it has one.
    pub fn fixture_id(&self) -> Option<FixtureId> {
        match self {
            Declaration::Identifier(fixture) => Some(fixture.clone()),
            Declaration::Configured { fixture, .. } => fixture.clone(),
            Declaration::Instance(instance) => Some(instance.identifier()),
        }
    }

    /// Parse one declaration from JSON: a string identifier, or an object
    /// with a `"fixture"` key plus override fields.
    pub fn from_value(name: &str, value: &Value) -> FixtureResult<Self> {
        match value {
            Value::String(fixture) => Ok(Declaration::id(fixture.as_str())),
            Value::Object(fields) => {
                let fixture = match fields.get(FIXTURE_KEY) {
                    None => None,
                    Some(Value::String(fixture)) => Some(FixtureId::new(fixture)),
                    Some(_) => {
                        return Err(FixtureError::invalid_declaration(
                            name,
                            format!("'{}' must be a string", FIXTURE_KEY),
                        ))
                    }
                };
                let overrides = fields
                    .iter()
                    .filter(|(key, _)| key.as_str() != FIXTURE_KEY)
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                Ok(Declaration::Configured { fixture, overrides })
            }
            other => Err(FixtureError::invalid_declaration(
                name,
                format!("expected a string or an object, found {}", other),
            )),
        }
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declaration::Identifier(fixture) => f.debug_tuple("Identifier").field(fixture).finish(),
            Declaration::Configured { fixture, overrides } => f
                .debug_struct("Configured")
                .field("fixture", fixture)
                .field("overrides", overrides)
                .finish(),
            Declaration::Instance(instance) => f
                .debug_tuple("Instance")
                .field(&instance.identifier())
                .finish(),
        }
    }
}

impl From<FixtureId> for Declaration {
    fn from(fixture: FixtureId) -> Self {
        Declaration::Identifier(fixture)
    }
}

impl From<&str> for Declaration {
    fn from(fixture: &str) -> Self {
        Declaration::id(fixture)
    }
}

/// The ordered fixture request of one test context.
#[derive(Debug, Default)]
pub struct Declarations {
    entries: Vec<(Option<String>, Declaration)>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an anonymous declaration, known by its identifier.
    pub fn add(mut self, declaration: impl Into<Declaration>) -> Self {
        self.entries.push((None, declaration.into()));
        self
    }

    /// Add a declaration under an explicit alias.
    pub fn named(mut self, alias: impl Into<String>, declaration: impl Into<Declaration>) -> Self {
        self.entries.push((Some(alias.into()), declaration.into()));
        self
    }

    /// Append every entry of `other` after this list's entries.
    pub fn extend(mut self, other: Declarations) -> Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &Declaration)> {
        self.entries
            .iter()
            .map(|(alias, declaration)| (alias.as_deref(), declaration))
    }

    /// Parse a declaration list from JSON.
    ///
    /// An array holds anonymous declarations; an object maps alias to
    /// declaration.
    pub fn from_value(value: &Value) -> FixtureResult<Self> {
        let mut declarations = Declarations::new();
        match value {
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    let declaration = Declaration::from_value(&index.to_string(), item)?;
                    declarations = declarations.add(declaration);
                }
            }
            Value::Object(items) => {
                for (alias, item) in items {
                    let declaration = Declaration::from_value(alias, item)?;
                    declarations = declarations.named(alias.as_str(), declaration);
                }
            }
            other => {
                return Err(FixtureError::invalid_declaration(
                    "<root>",
                    format!("expected an array or an object, found {}", other),
                ))
            }
        }
        Ok(declarations)
    }

    pub fn from_json(json: &str) -> FixtureResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }
}

impl IntoIterator for Declarations {
    type Item = (Option<String>, Declaration);
    type IntoIter = std::vec::IntoIter<(Option<String>, Declaration)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<D: Into<Declaration>> FromIterator<D> for Declarations {
    fn from_iter<I: IntoIterator<Item = D>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Declarations::new(), |declarations, item| declarations.add(item))
    }
}
