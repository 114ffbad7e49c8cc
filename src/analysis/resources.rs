//! Module/resource context tracking.
//!
//! Decides, for every line, whether the translator must emit the
//! initialization of an external resource (database, queue, object store...)
//! or only a reference to an already-initialized handle.
//!
//! The walk is a static pre-pass in program order: a resource is initialized
//! at its first *textual* use, whatever the control flow does at run time.

use crate::lang::{Line, LineNumber, Program};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum ResourceTableError {
    #[error("invalid resource table: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid resource table: empty resource key for hint '{hint}'")]
    EmptyKey { hint: String },
}

/// Injectable lookup from task-hint vocabulary to normalized resource keys.
///
/// Several hints may name the same resource (`pg`, `postgres`), in which case
/// they share one initialization. Hints missing from the table imply no
/// resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTable {
    aliases: IndexMap<String, String>,
}

impl Default for ResourceTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ResourceTable {
    pub fn empty() -> Self {
        ResourceTable {
            aliases: IndexMap::new(),
        }
    }

    /// The services the runtime ships wrappers for.
    pub fn builtin() -> Self {
        const BUILTIN: &[(&str, &str)] = &[
            ("redis", "redis"),
            ("cache", "redis"),
            ("postgres", "postgres"),
            ("postgresql", "postgres"),
            ("pg", "postgres"),
            ("mysql", "mysql"),
            ("mariadb", "mysql"),
            ("sqlite", "sqlite"),
            ("mongo", "mongodb"),
            ("mongodb", "mongodb"),
            ("dynamodb", "dynamodb"),
            ("s3", "s3"),
            ("object-store", "s3"),
            ("sqs", "sqs"),
            ("queue", "sqs"),
            ("kafka", "kafka"),
            ("ses", "ses"),
            ("smtp", "smtp"),
            ("email", "smtp"),
            ("sftp", "sftp"),
            ("http", "http"),
            ("api", "http"),
            ("rest", "http"),
            ("llm", "llm"),
            ("ai", "llm"),
        ];

        BUILTIN
            .iter()
            .fold(Self::empty(), |table, (hint, key)| table.with_alias(hint, key))
    }

    /// Adds or replaces one mapping. Both sides are normalized.
    pub fn with_alias(mut self, hint: &str, resource_key: &str) -> Self {
        self.aliases
            .insert(normalize(hint), normalize(resource_key));
        self
    }

    /// Parses a table of the form `{"aliases": {"pg": "postgres"}}`.
    pub fn from_json(json: &str) -> Result<Self, ResourceTableError> {
        let raw: ResourceTable = serde_json::from_str(json)?;

        let mut table = Self::empty();
        for (hint, key) in raw.aliases {
            if key.trim().is_empty() {
                return Err(ResourceTableError::EmptyKey { hint });
            }
            table = table.with_alias(&hint, &key);
        }
        Ok(table)
    }

    /// Overlays `other` on top of this table; `other` wins on conflicts.
    pub fn extend(&mut self, other: ResourceTable) {
        self.aliases.extend(other.aliases);
    }

    /// Resource key implied by `hint`, if any.
    pub fn resolve(&self, hint: &str) -> Option<&str> {
        self.aliases.get(&normalize(hint)).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// What the translator must do for a line's resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InitRequirement {
    /// First textual use: emit the acquisition.
    FirstUse { resource_key: String },
    /// Already acquired earlier in program order: emit a reference only.
    Reuse { resource_key: String },
    /// The line implies no resource.
    None,
}

impl InitRequirement {
    pub fn resource_key(&self) -> Option<&str> {
        match self {
            InitRequirement::FirstUse { resource_key } | InitRequirement::Reuse { resource_key } => {
                Some(resource_key)
            }
            InitRequirement::None => None,
        }
    }
}

impl std::fmt::Display for InitRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitRequirement::FirstUse { resource_key } => write!(f, "init {}", resource_key),
            InitRequirement::Reuse { resource_key } => write!(f, "reuse {}", resource_key),
            InitRequirement::None => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleContextEntry {
    pub resource_key: String,
    pub first_use_line: LineNumber,
}

/// Result of a full tracking pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleContext {
    /// One entry per distinct resource, in first-use order.
    pub entries: Vec<ModuleContextEntry>,
    /// Requirement for every line, in program order.
    pub requirements: IndexMap<LineNumber, InitRequirement>,
}

impl ModuleContext {
    pub fn requirement(&self, line: LineNumber) -> &InitRequirement {
        static NO_RESOURCE: InitRequirement = InitRequirement::None;
        self.requirements.get(&line).unwrap_or(&NO_RESOURCE)
    }
}

/// Incremental tracker. Lines must be observed in increasing program order.
pub struct ContextTracker<'t> {
    table: &'t ResourceTable,
    entries: IndexMap<String, ModuleContextEntry>,
    requirements: IndexMap<LineNumber, InitRequirement>,
}

impl<'t> ContextTracker<'t> {
    pub fn new(table: &'t ResourceTable) -> Self {
        ContextTracker {
            table,
            entries: IndexMap::new(),
            requirements: IndexMap::new(),
        }
    }

    pub fn observe(&mut self, line: &Line) -> InitRequirement {
        debug_assert!(
            self.requirements
                .last()
                .map(|(last, _)| *last < line.number)
                .unwrap_or(true),
            "lines must be observed in program order"
        );

        let table = self.table;
        let requirement = match line.task_hint.as_deref().and_then(|h| table.resolve(h)) {
            None => InitRequirement::None,
            Some(key) if self.entries.contains_key(key) => InitRequirement::Reuse {
                resource_key: key.to_string(),
            },
            Some(key) => {
                self.entries.insert(
                    key.to_string(),
                    ModuleContextEntry {
                        resource_key: key.to_string(),
                        first_use_line: line.number,
                    },
                );
                debug!(line = line.number, resource = key, "resource first use");
                InitRequirement::FirstUse {
                    resource_key: key.to_string(),
                }
            }
        };

        if requirement == InitRequirement::None {
            if let Some(hint) = &line.task_hint {
                trace!(line = line.number, hint = %hint, "hint implies no resource");
            }
        }

        self.requirements.insert(line.number, requirement.clone());
        requirement
    }

    pub fn finish(self) -> ModuleContext {
        ModuleContext {
            entries: self.entries.into_values().collect(),
            requirements: self.requirements,
        }
    }
}

/// Runs the tracker over a whole program.
pub fn track(program: &Program, table: &ResourceTable) -> ModuleContext {
    let mut tracker = ContextTracker::new(table);
    for line in program.lines() {
        tracker.observe(line);
    }
    tracker.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::Parser;
    use indoc::indoc;

    fn track_source(source: &str) -> ModuleContext {
        let program = Parser::new(source).parse().expect("parse failed");
        track(&program, &ResourceTable::builtin())
    }

    fn first_use(key: &str) -> InitRequirement {
        InitRequirement::FirstUse {
            resource_key: key.to_string(),
        }
    }

    fn reuse(key: &str) -> InitRequirement {
        InitRequirement::Reuse {
            resource_key: key.to_string(),
        }
    }

    #[test]
    fn test_first_use_then_reuse() {
        let ctx = track_source(indoc! {"
            10 (redis) read the session
            20 (postgres) load the user
            30 (redis) refresh the session
            40 print the page
            50 (pg) save the user
        "});

        assert_eq!(ctx.requirement(10), &first_use("redis"));
        assert_eq!(ctx.requirement(20), &first_use("postgres"));
        assert_eq!(ctx.requirement(30), &reuse("redis"));
        assert_eq!(ctx.requirement(40), &InitRequirement::None);
        assert_eq!(ctx.requirement(50), &reuse("postgres"));

        assert_eq!(
            ctx.entries,
            vec![
                ModuleContextEntry {
                    resource_key: "redis".to_string(),
                    first_use_line: 10
                },
                ModuleContextEntry {
                    resource_key: "postgres".to_string(),
                    first_use_line: 20
                },
            ]
        );
    }

    #[test]
    fn test_program_order_ignores_control_flow() {
        // line 20 is skipped at run time, but it is still the first textual use
        let ctx = track_source(indoc! {"
            10 goto 30
            20 (sqs) send the welcome message
            30 (queue) send the reminder
        "});

        assert_eq!(ctx.requirement(20), &first_use("sqs"));
        assert_eq!(ctx.requirement(30), &reuse("sqs"));
        assert_eq!(ctx.entries[0].first_use_line, 20);
    }

    #[test]
    fn test_source_order_does_not_matter() {
        let ctx = track_source("30 (s3) upload\n10 (s3) download");
        assert_eq!(ctx.requirement(10), &first_use("s3"));
        assert_eq!(ctx.requirement(30), &reuse("s3"));
    }

    #[test]
    fn test_unknown_hint_implies_no_resource() {
        let ctx = track_source("10 (compute) add the numbers");
        assert_eq!(ctx.requirement(10), &InitRequirement::None);
        assert!(ctx.entries.is_empty());
    }

    #[test]
    fn test_no_duplicate_keys() {
        let ctx = track_source(indoc! {"
            10 (redis) a
            20 (cache) b
            30 (REDIS) c
            40 (redis) d
        "});
        assert_eq!(ctx.entries.len(), 1);
        let first_uses = ctx
            .requirements
            .values()
            .filter(|r| matches!(r, InitRequirement::FirstUse { .. }))
            .count();
        assert_eq!(first_uses, 1);
    }

    #[test]
    fn test_injected_table() {
        let table = ResourceTable::empty().with_alias("Warehouse", "snowflake");
        let program = Parser::new("10 (warehouse) q\n20 (redis) r").parse().expect("parse failed");
        let ctx = track(&program, &table);

        assert_eq!(ctx.requirement(10), &first_use("snowflake"));
        assert_eq!(ctx.requirement(20), &InitRequirement::None);
    }

    #[test]
    fn test_table_from_json() {
        let table = ResourceTable::from_json(r#"{"aliases": {"Clickhouse": "olap", "ch": "olap"}}"#)
            .expect("valid table");
        assert_eq!(table.resolve("clickhouse"), Some("olap"));
        assert_eq!(table.resolve(" CH "), Some("olap"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_table_from_json_errors() {
        assert!(matches!(
            ResourceTable::from_json("{ not json"),
            Err(ResourceTableError::Json(_))
        ));
        assert!(matches!(
            ResourceTable::from_json(r#"{"aliases": {"x": "  "}}"#),
            Err(ResourceTableError::EmptyKey { .. })
        ));
    }

    #[test]
    fn test_extend_overrides() {
        let mut table = ResourceTable::builtin();
        table.extend(ResourceTable::empty().with_alias("cache", "memcached"));
        assert_eq!(table.resolve("cache"), Some("memcached"));
        assert_eq!(table.resolve("redis"), Some("redis"));
    }
}
