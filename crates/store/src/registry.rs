//! Named-table registry
//!
//! A `Registry` is an owned name→table map, constructed where it is needed
//! and passed explicitly — never ambient global state. Tables remain fully
//! usable on their own; the registry only adds naming.

use crate::table::Table;
use rustc_hash::FxHashMap;
use shale_core::{Error, Result};
use tracing::info;

/// An owned collection of named tables.
#[derive(Debug, Default)]
pub struct Registry {
    tables: FxHashMap<String, Table>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table under `name` and return it for immediate use.
    ///
    /// Fails with [`Error::TableExists`] if the name is taken.
    pub fn add(&mut self, name: impl Into<String>) -> Result<&mut Table> {
        self.add_table(name, Table::new())
    }

    /// Register a pre-built (pre-loaded, pre-indexed) table under `name`.
    ///
    /// Fails with [`Error::TableExists`] if the name is taken.
    pub fn add_table(&mut self, name: impl Into<String>, table: Table) -> Result<&mut Table> {
        let name = name.into();
        if self.tables.contains_key(&name) {
            return Err(Error::TableExists(name));
        }
        info!(target: "shale::registry", name = %name, "table registered");
        Ok(self.tables.entry(name).or_insert(table))
    }

    /// The table named `name`, if present.
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Mutable access to the table named `name`, if present.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Drop the table named `name`, returning it.
    ///
    /// Fails with [`Error::TableNotFound`] if the name is absent.
    pub fn remove(&mut self, name: &str) -> Result<Table> {
        match self.tables.remove(name) {
            Some(table) => {
                info!(target: "shale::registry", name = %name, "table dropped");
                Ok(table)
            }
            None => Err(Error::TableNotFound(name.to_string())),
        }
    }

    /// True if a table named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Registered table names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True if no tables are registered.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
