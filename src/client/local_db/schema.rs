//! Database Schema Definitions
//!
//! Box names and the ordered list of schema migrations applied by
//! [`LocalDatabase`](super::LocalDatabase) on open.

/// Box holding queued sync operations, keyed by operation id
pub const SYNC_QUEUE_BOX: &str = "sync_queue";

/// Box holding cached server resources
pub const FITNESS_CACHE_BOX: &str = "fitness_cache";

/// A single forward-only schema change
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "key-value boxes",
    sql: include_str!("schema.sql"),
}];

/// Highest version known to this build
pub fn current_schema_version() -> i32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Migrations newer than `applied_version`
pub fn pending_migrations(applied_version: i32) -> impl Iterator<Item = &'static Migration> {
    MIGRATIONS.iter().filter(move |m| m.version > applied_version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered() {
        let versions: Vec<i32> = MIGRATIONS.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(versions, sorted);
    }

    #[test]
    fn test_pending_migrations() {
        assert_eq!(pending_migrations(0).count(), MIGRATIONS.len());
        assert_eq!(pending_migrations(current_schema_version()).count(), 0);
    }
}
