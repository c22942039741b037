// common/mod.rs - Shared test utilities for fixture resolution and lifecycle
//
// Provides a recording probe fixture and helpers that build registries from a
// small dependency graph, so tests can assert on construction, load and
// unload order without any real storage.

#![allow(dead_code)]

use pg_fixtures::{Fixture, FixtureError, FixtureId, FixtureRegistry, FixtureResult};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared event log, e.g. `["load:A", "unload:A"]`.
pub type Log = Rc<RefCell<Vec<String>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Events recorded so far whose phase is `phase`, as fixture names.
pub fn events(log: &Log, phase: &str) -> Vec<String> {
    let prefix = format!("{}:", phase);
    log.borrow()
        .iter()
        .filter_map(|event| event.strip_prefix(&prefix).map(str::to_string))
        .collect()
}

/// A fixture that records every lifecycle call and can be told to fail one.
pub struct Probe {
    id: FixtureId,
    depends: Vec<FixtureId>,
    log: Log,
    fail_on: Option<&'static str>,
}

impl Probe {
    pub fn new(id: &str, depends: &[&str], log: &Log) -> Self {
        Self {
            id: FixtureId::new(id),
            depends: depends.iter().map(FixtureId::new).collect(),
            log: Rc::clone(log),
            fail_on: None,
        }
    }

    pub fn failing_on(mut self, phase: &'static str) -> Self {
        self.fail_on = Some(phase);
        self
    }

    fn record(&self, phase: &str) -> FixtureResult<()> {
        self.log.borrow_mut().push(format!("{}:{}", phase, self.id));
        if self.fail_on == Some(phase) {
            return Err(FixtureError::Collaborator(anyhow::anyhow!(
                "{} failed for {}",
                phase,
                self.id
            )));
        }
        Ok(())
    }
}

impl Fixture for Probe {
    fn identifier(&self) -> FixtureId {
        self.id.clone()
    }

    fn depends(&self) -> Vec<FixtureId> {
        self.depends.clone()
    }

    fn before_load(&mut self) -> FixtureResult<()> {
        self.record("before_load")
    }

    fn load(&mut self) -> FixtureResult<()> {
        self.record("load")
    }

    fn after_load(&mut self) -> FixtureResult<()> {
        self.record("after_load")
    }

    fn before_unload(&mut self) -> FixtureResult<()> {
        self.record("before_unload")
    }

    fn unload(&mut self) -> FixtureResult<()> {
        self.record("unload")
    }

    fn after_unload(&mut self) -> FixtureResult<()> {
        self.record("after_unload")
    }
}

/// Registry of probes for `graph`, a list of `(fixture, dependencies)`.
/// Each construction is logged as `construct:<fixture>`.
pub fn probe_registry(graph: &[(&str, &[&str])], log: &Log) -> FixtureRegistry {
    let mut registry = FixtureRegistry::new();
    for (id, depends) in graph {
        let id = id.to_string();
        let depends: Vec<String> = depends.iter().map(|d| d.to_string()).collect();
        let log = Rc::clone(log);
        registry.register_with(FixtureId::new(&id), move || {
            log.borrow_mut().push(format!("construct:{}", id));
            let depends: Vec<&str> = depends.iter().map(String::as_str).collect();
            Ok(Box::new(Probe::new(&id, &depends, &log)) as Box<dyn Fixture>)
        });
    }
    registry
}
