//! Consistency levels and the per-call override policy
//!
//! Levels are configured per column family (entity-level or property-level)
//! and installed for the duration of a single store call through a
//! [`ConsistencyGuard`]. Dropping the guard restores the previous level,
//! whether the call succeeded or not.

use crate::error::{CfmapError, CfmapResult};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

/// Store-side consistency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyLevel {
    Any,
    One,
    Two,
    Three,
    Quorum,
    LocalQuorum,
    EachQuorum,
    All,
}

impl ConsistencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLevel::Any => "ANY",
            ConsistencyLevel::One => "ONE",
            ConsistencyLevel::Two => "TWO",
            ConsistencyLevel::Three => "THREE",
            ConsistencyLevel::Quorum => "QUORUM",
            ConsistencyLevel::LocalQuorum => "LOCAL_QUORUM",
            ConsistencyLevel::EachQuorum => "EACH_QUORUM",
            ConsistencyLevel::All => "ALL",
        }
    }
}

impl FromStr for ConsistencyLevel {
    type Err = CfmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ANY" => Ok(ConsistencyLevel::Any),
            "ONE" => Ok(ConsistencyLevel::One),
            "TWO" => Ok(ConsistencyLevel::Two),
            "THREE" => Ok(ConsistencyLevel::Three),
            "QUORUM" => Ok(ConsistencyLevel::Quorum),
            "LOCAL_QUORUM" => Ok(ConsistencyLevel::LocalQuorum),
            "EACH_QUORUM" => Ok(ConsistencyLevel::EachQuorum),
            "ALL" => Ok(ConsistencyLevel::All),
            other => Err(CfmapError::Config(format!(
                "unknown consistency level '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read/write pair declared on an entity or a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsistencyLevels {
    pub read: ConsistencyLevel,
    pub write: ConsistencyLevel,
}

impl ConsistencyLevels {
    pub fn new(read: ConsistencyLevel, write: ConsistencyLevel) -> Self {
        Self { read, write }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Read,
    Write,
}

thread_local! {
    static CURRENT_READ: Cell<Option<ConsistencyLevel>> = const { Cell::new(None) };
    static CURRENT_WRITE: Cell<Option<ConsistencyLevel>> = const { Cell::new(None) };
}

fn slot(op: Operation) -> &'static std::thread::LocalKey<Cell<Option<ConsistencyLevel>>> {
    match op {
        Operation::Read => &CURRENT_READ,
        Operation::Write => &CURRENT_WRITE,
    }
}

/// Per-column-family consistency configuration.
#[derive(Debug)]
pub struct ConsistencyPolicy {
    defaults: ConsistencyLevels,
    read_levels: DashMap<String, ConsistencyLevel>,
    write_levels: DashMap<String, ConsistencyLevel>,
}

impl ConsistencyPolicy {
    pub fn new(defaults: ConsistencyLevels) -> Self {
        Self {
            defaults,
            read_levels: DashMap::new(),
            write_levels: DashMap::new(),
        }
    }

    pub fn defaults(&self) -> ConsistencyLevels {
        self.defaults
    }

    /// Registers the pair for a column family. Later calls win.
    pub fn set_levels_for(&self, column_family: &str, levels: ConsistencyLevels) {
        self.read_levels.insert(column_family.to_string(), levels.read);
        self.write_levels.insert(column_family.to_string(), levels.write);
    }

    pub fn read_level_for(&self, column_family: &str) -> ConsistencyLevel {
        self.read_levels
            .get(column_family)
            .map(|l| *l)
            .unwrap_or(self.defaults.read)
    }

    pub fn write_level_for(&self, column_family: &str) -> ConsistencyLevel {
        self.write_levels
            .get(column_family)
            .map(|l| *l)
            .unwrap_or(self.defaults.write)
    }

    /// Level in effect for reads on this thread.
    pub fn current_read_level(&self) -> ConsistencyLevel {
        CURRENT_READ.with(Cell::get).unwrap_or(self.defaults.read)
    }

    /// Level in effect for writes on this thread.
    pub fn current_write_level(&self) -> ConsistencyLevel {
        CURRENT_WRITE.with(Cell::get).unwrap_or(self.defaults.write)
    }

    /// Installs the read level configured for `column_family`.
    pub fn scoped_read(&self, column_family: &str) -> ConsistencyGuard {
        ConsistencyGuard::install(Operation::Read, self.read_level_for(column_family))
    }

    /// Installs the write level configured for `column_family`.
    pub fn scoped_write(&self, column_family: &str) -> ConsistencyGuard {
        ConsistencyGuard::install(Operation::Write, self.write_level_for(column_family))
    }

    /// Installs an explicit read level, bypassing the column-family map.
    pub fn scoped_read_level(&self, level: ConsistencyLevel) -> ConsistencyGuard {
        ConsistencyGuard::install(Operation::Read, level)
    }

    /// Installs an explicit write level, bypassing the column-family map.
    pub fn scoped_write_level(&self, level: ConsistencyLevel) -> ConsistencyGuard {
        ConsistencyGuard::install(Operation::Write, level)
    }
}

impl Default for ConsistencyPolicy {
    fn default() -> Self {
        Self::new(ConsistencyLevels::new(
            ConsistencyLevel::One,
            ConsistencyLevel::One,
        ))
    }
}

/// Installed level for one store call; restores the previous one on drop.
///
/// The guard is bound to the thread that created it.
#[must_use = "the level is restored as soon as the guard is dropped"]
pub struct ConsistencyGuard {
    op: Operation,
    level: ConsistencyLevel,
    previous: Option<ConsistencyLevel>,
    _not_send: PhantomData<*const ()>,
}

impl ConsistencyGuard {
    fn install(op: Operation, level: ConsistencyLevel) -> Self {
        let previous = slot(op).with(|cell| cell.replace(Some(level)));
        Self {
            op,
            level,
            previous,
            _not_send: PhantomData,
        }
    }

    pub fn level(&self) -> ConsistencyLevel {
        self.level
    }
}

impl Drop for ConsistencyGuard {
    fn drop(&mut self) {
        slot(self.op).with(|cell| cell.set(self.previous));
    }
}

impl fmt::Debug for ConsistencyGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsistencyGuard")
            .field("op", &self.op)
            .field("level", &self.level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ConsistencyPolicy {
        ConsistencyPolicy::new(ConsistencyLevels::new(
            ConsistencyLevel::One,
            ConsistencyLevel::Quorum,
        ))
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(
            "local_quorum".parse::<ConsistencyLevel>().unwrap(),
            ConsistencyLevel::LocalQuorum
        );
        assert!("SOME".parse::<ConsistencyLevel>().is_err());
    }

    #[test]
    fn test_column_family_override_wins_over_default() {
        let policy = policy();
        policy.set_levels_for(
            "users",
            ConsistencyLevels::new(ConsistencyLevel::All, ConsistencyLevel::Any),
        );
        assert_eq!(policy.read_level_for("users"), ConsistencyLevel::All);
        assert_eq!(policy.write_level_for("users"), ConsistencyLevel::Any);
        assert_eq!(policy.read_level_for("other"), ConsistencyLevel::One);
    }

    #[test]
    fn test_guard_restores_default_on_drop() {
        let policy = policy();
        policy.set_levels_for(
            "users",
            ConsistencyLevels::new(ConsistencyLevel::LocalQuorum, ConsistencyLevel::All),
        );
        {
            let guard = policy.scoped_read("users");
            assert_eq!(guard.level(), ConsistencyLevel::LocalQuorum);
            assert_eq!(policy.current_read_level(), ConsistencyLevel::LocalQuorum);
        }
        assert_eq!(policy.current_read_level(), ConsistencyLevel::One);
    }

    #[test]
    fn test_guard_restores_on_error_path() {
        let policy = policy();
        policy.set_levels_for(
            "users",
            ConsistencyLevels::new(ConsistencyLevel::One, ConsistencyLevel::All),
        );
        let failing = || -> CfmapResult<()> {
            let _guard = policy.scoped_write("users");
            Err(CfmapError::store("timed out"))
        };
        assert!(failing().is_err());
        assert_eq!(policy.current_write_level(), ConsistencyLevel::Quorum);
    }

    #[test]
    fn test_nested_guards_unwind_in_order() {
        let policy = policy();
        policy.set_levels_for(
            "a",
            ConsistencyLevels::new(ConsistencyLevel::Two, ConsistencyLevel::Two),
        );
        policy.set_levels_for(
            "b",
            ConsistencyLevels::new(ConsistencyLevel::Three, ConsistencyLevel::Three),
        );
        let outer = policy.scoped_read("a");
        {
            let _inner = policy.scoped_read("b");
            assert_eq!(policy.current_read_level(), ConsistencyLevel::Three);
        }
        assert_eq!(policy.current_read_level(), ConsistencyLevel::Two);
        drop(outer);
        assert_eq!(policy.current_read_level(), ConsistencyLevel::One);
    }
}
