// Lifecycle tests - phase ordering, reinit, failure handling and lookup

mod common;

use common::{events, new_log, probe_registry, Log, Probe};
use pg_fixtures::{
    with_fixtures, Declaration, Declarations, Fixture, FixtureError, FixtureId, FixtureManager,
    FixtureRegistry, FixtureResolver, FixtureResult, FixtureState,
};
use serde_json::{json, Value};

fn chain_manager(log: &Log) -> FixtureManager {
    // C depends on B depends on A
    let registry = probe_registry(&[("A", &[]), ("B", &["A"]), ("C", &["B"])], log);
    FixtureManager::new(registry).with_declarations(|| Declarations::new().add("C"))
}

#[test]
fn test_load_phases_run_in_order() -> anyhow::Result<()> {
    let log = new_log();
    let mut manager = chain_manager(&log);
    manager.load_all()?;

    assert_eq!(events(&log, "before_load"), vec!["A", "B", "C"]);
    assert_eq!(events(&log, "load"), vec!["A", "B", "C"]);
    assert_eq!(events(&log, "after_load"), vec!["C", "B", "A"]);

    // every before_load happens before the first load
    let all = log.borrow().clone();
    let last_before = all.iter().rposition(|e| e.starts_with("before_load:"));
    let first_load = all.iter().position(|e| e.starts_with("load:"));
    assert!(last_before < first_load);
    Ok(())
}

#[test]
fn test_unload_phases_run_in_reverse() -> anyhow::Result<()> {
    let log = new_log();
    let mut manager = chain_manager(&log);
    manager.load_all()?;
    manager.unload_all()?;

    assert_eq!(events(&log, "before_unload"), vec!["C", "B", "A"]);
    assert_eq!(events(&log, "unload"), vec!["C", "B", "A"]);
    assert_eq!(events(&log, "after_unload"), vec!["C", "B", "A"]);

    let set = manager.resolved().expect("resolved set");
    assert_eq!(set.state("B"), Some(FixtureState::Idle));
    Ok(())
}

#[test]
fn test_reinit_unloads_then_loads_same_instances() -> anyhow::Result<()> {
    let log = new_log();
    let mut manager = chain_manager(&log);
    manager.load_all()?;
    log.borrow_mut().clear();

    manager.reinit()?;

    let all = log.borrow().clone();
    let last_unload = all.iter().rposition(|e| e.starts_with("after_unload:"));
    let first_load = all.iter().position(|e| e.starts_with("before_load:"));
    assert!(last_unload < first_load);
    assert!(events(&log, "construct").is_empty());
    assert_eq!(manager.resolved().and_then(|set| set.state("C")), Some(FixtureState::Ready));
    Ok(())
}

#[test]
fn test_load_failure_stops_remaining_fixtures() {
    let log = new_log();
    let mut manager = FixtureManager::new(probe_registry(&[("A", &[])], &log));
    let declarations = Declarations::new()
        .add(Declaration::instance(Probe::new("B", &["A"], &log).failing_on("load")))
        .add(Declaration::instance(Probe::new("C", &["B"], &log)));
    manager.resolve(declarations).expect("resolves");

    let err = manager.load_all().unwrap_err();
    assert!(!err.is_config());
    assert_eq!(events(&log, "load"), vec!["A", "B"]);
    assert!(events(&log, "after_load").is_empty());

    let set = manager.resolved().expect("resolved set");
    assert_eq!(set.state("A"), Some(FixtureState::Loaded));
    assert_eq!(set.state("B"), Some(FixtureState::Loading));
    assert_eq!(set.state("C"), Some(FixtureState::Loading));
}

#[test]
fn test_lookup_does_not_resolve() -> anyhow::Result<()> {
    let log = new_log();
    let mut manager = chain_manager(&log);

    assert!(manager.lookup("A").is_none());
    assert!(!manager.is_resolved());

    manager.fixtures()?;
    assert!(manager.lookup("A").is_some());
    assert!(manager.lookup("::A").is_some());
    assert!(manager.lookup_as::<Probe>("B").is_some());
    assert!(manager.lookup("Z").is_none());
    Ok(())
}

#[test]
fn test_global_declarations_come_first() -> anyhow::Result<()> {
    let log = new_log();
    let registry = probe_registry(&[("Settings", &[]), ("A", &[])], &log);
    let mut manager = FixtureManager::new(registry)
        .with_global_declarations(|| Declarations::new().add("Settings"))
        .with_declarations(|| Declarations::new().add("A"));

    let order: Vec<String> = manager.fixtures()?.names().map(str::to_string).collect();
    assert_eq!(order, vec!["Settings", "A"]);
    Ok(())
}

#[test]
fn test_explicit_set_loads_without_touching_the_managed_one() -> anyhow::Result<()> {
    let log = new_log();
    let manager = chain_manager(&log);

    let mut set = FixtureResolver::new(manager.factory()).resolve(Declarations::new().add("B"))?;
    set.load_all()?;
    set.unload_all()?;

    assert_eq!(events(&log, "load"), vec!["A", "B"]);
    assert_eq!(events(&log, "unload"), vec!["B", "A"]);
    assert!(!manager.is_resolved());
    Ok(())
}

/// Fixture with one configurable field.
#[derive(Default)]
struct Tagged {
    tag: Option<Value>,
}

impl Fixture for Tagged {
    fn identifier(&self) -> FixtureId {
        FixtureId::new("Tagged")
    }

    fn configure(&mut self, field: &str, value: &Value) -> FixtureResult<()> {
        match field {
            "tag" => {
                self.tag = Some(value.clone());
                Ok(())
            }
            _ => Err(FixtureError::UnknownField {
                fixture: "Tagged".to_string(),
                field: field.to_string(),
            }),
        }
    }
}

#[test]
fn test_local_configuration_overrides_global_declaration() -> anyhow::Result<()> {
    let mut registry = FixtureRegistry::new();
    registry.register::<Tagged>();
    let mut manager = FixtureManager::new(registry)
        .with_global_declarations(|| Declarations::new().add("Tagged"))
        .with_declarations(|| Declarations::new().named("t", Declaration::configured("Tagged").set("tag", "blue")));

    let order: Vec<String> = manager.fixtures()?.names().map(str::to_string).collect();
    assert_eq!(order, vec!["t"]);

    let tagged = manager.lookup_as::<Tagged>("t").expect("tagged fixture");
    assert_eq!(tagged.tag, Some(json!("blue")));
    Ok(())
}

#[test]
fn test_with_fixtures_always_unloads() {
    let log = new_log();
    let mut manager = chain_manager(&log);

    let result: anyhow::Result<()> = with_fixtures(&mut manager, |set| {
        assert_eq!(set.state("C"), Some(FixtureState::Ready));
        anyhow::bail!("assertion failed in test body")
    });

    assert_eq!(result.unwrap_err().to_string(), "assertion failed in test body");
    assert_eq!(events(&log, "after_unload"), vec!["C", "B", "A"]);
}

#[test]
fn test_invalidate_drops_memoized_set() -> anyhow::Result<()> {
    let log = new_log();
    let mut manager = chain_manager(&log);
    manager.fixtures()?;
    assert!(manager.invalidate().is_some());
    assert!(!manager.is_resolved());

    manager.fixtures()?;
    assert_eq!(events(&log, "construct"), vec!["C", "B", "A", "C", "B", "A"]);
    Ok(())
}
