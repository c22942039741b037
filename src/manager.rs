// manager.rs - Owning the fixtures of one test context
//
// `FixtureManager` holds the factory, the declaration provider and the
// memoized resolved set. The set is resolved on first use and reused until
// `invalidate` drops it, which is what a test harness does between tests.

use crate::declaration::Declarations;
use crate::error::FixtureResult;
use crate::fixture::Fixture;
use crate::registry::FixtureFactory;
use crate::resolver::FixtureResolver;
use crate::set::FixtureSet;

type DeclarationProvider = Box<dyn Fn() -> Declarations>;

/// Resolves, loads, unloads and looks up the fixtures of a test context.
pub struct FixtureManager {
    factory: Box<dyn FixtureFactory>,
    global: Option<DeclarationProvider>,
    declarations: Option<DeclarationProvider>,
    resolved: Option<FixtureSet>,
}

impl FixtureManager {
    pub fn new(factory: impl FixtureFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            global: None,
            declarations: None,
            resolved: None,
        }
    }

    /// Declarations this context requests when it resolves on demand.
    pub fn with_declarations<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> Declarations + 'static,
    {
        self.declarations = Some(Box::new(provider));
        self
    }

    /// Declarations shared by every test, placed before the test's own.
    pub fn with_global_declarations<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> Declarations + 'static,
    {
        self.global = Some(Box::new(provider));
        self
    }

    pub fn factory(&self) -> &dyn FixtureFactory {
        self.factory.as_ref()
    }

    /// Resolve `declarations` (after any global ones) unless a set is
    /// already memoized, in which case the existing set is returned.
    pub fn resolve(&mut self, declarations: Declarations) -> FixtureResult<&mut FixtureSet> {
        self.resolve_with(move |_| declarations)
    }

    /// Resolve with the configured declaration provider.
    pub fn fixtures(&mut self) -> FixtureResult<&mut FixtureSet> {
        self.resolve_with(|manager| {
            manager
                .declarations
                .as_ref()
                .map(|provider| provider())
                .unwrap_or_default()
        })
    }

    fn resolve_with<F>(&mut self, local: F) -> FixtureResult<&mut FixtureSet>
    where
        F: FnOnce(&Self) -> Declarations,
    {
        let set = match self.resolved.take() {
            Some(set) => set,
            None => {
                let local = local(self);
                let declarations = match &self.global {
                    Some(global) => global().extend(local),
                    None => local,
                };
                FixtureResolver::new(self.factory.as_ref()).resolve(declarations)?
            }
        };
        Ok(self.resolved.insert(set))
    }

    /// The memoized set, if resolution has happened.
    pub fn resolved(&self) -> Option<&FixtureSet> {
        self.resolved.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Drop the memoized set so the next call resolves afresh.
    pub fn invalidate(&mut self) -> Option<FixtureSet> {
        self.resolved.take()
    }

    /// Load the context's fixtures, resolving them first if needed.
    ///
    /// To load some other set, resolve it with [`FixtureResolver`] and call
    /// [`FixtureSet::load_all`] on it directly.
    pub fn load_all(&mut self) -> FixtureResult<()> {
        self.fixtures()?.load_all()
    }

    /// Unload the context's fixtures in reverse order.
    ///
    /// A caller-built set is unloaded with [`FixtureSet::unload_all`].
    pub fn unload_all(&mut self) -> FixtureResult<()> {
        self.fixtures()?.unload_all()
    }

    /// Unload then load, giving the next test a clean copy of the same set.
    pub fn reinit(&mut self) -> FixtureResult<()> {
        self.unload_all()?;
        self.load_all()
    }

    /// Find a fixture by alias without triggering resolution.
    pub fn lookup(&self, name: &str) -> Option<&dyn Fixture> {
        self.resolved.as_ref()?.get(name)
    }

    pub fn lookup_as<T: Fixture>(&self, name: &str) -> Option<&T> {
        self.resolved.as_ref()?.get_as::<T>(name)
    }
}

/// Load the context's fixtures, run `test`, then unload whatever happened.
///
/// A failed load is returned as-is; nothing is unloaded for it. When both the
/// test and the unload fail, the test's error wins.
pub fn with_fixtures<T, F>(manager: &mut FixtureManager, test: F) -> anyhow::Result<T>
where
    F: FnOnce(&mut FixtureSet) -> anyhow::Result<T>,
{
    manager.load_all()?;

    let result = test(manager.fixtures()?);

    // Always cleanup, even if the test fails
    let cleanup = manager.unload_all();

    match (result, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err.into()),
        (Err(err), cleanup) => {
            if let Err(unload_err) = cleanup {
                tracing::error!(error = %unload_err, "fixture unload failed after test failure");
            }
            Err(err)
        }
    }
}
