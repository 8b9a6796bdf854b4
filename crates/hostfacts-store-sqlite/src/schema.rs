//! SQL schemas for the fact store and the legacy document collection.

/// Fact store DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Owned by the inventory subsystem; read-only for fact storage.
CREATE TABLE IF NOT EXISTS hosts (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    inventory_id  INTEGER NOT NULL,
    name          TEXT NOT NULL,
    UNIQUE (inventory_id, name)
);

-- Facts are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS facts (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    host_id    INTEGER NOT NULL REFERENCES hosts(id),
    timestamp  TEXT NOT NULL,   -- ISO 8601 UTC
    module     TEXT NOT NULL,
    facts      TEXT NOT NULL    -- JSON payload, unescaped keys
);

CREATE INDEX IF NOT EXISTS facts_host_ts_module_idx
    ON facts(host_id, timestamp, module);

PRAGMA user_version = 1;
";

/// Legacy fact-version collection: one JSON document per row, `id` giving
/// the natural iteration order.
pub const LEGACY_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS fact_versions (
    id        INTEGER PRIMARY KEY,
    document  TEXT NOT NULL
);
";
