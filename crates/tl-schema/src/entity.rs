//! Entity schema for the telemetry store.
//!
//! Ordered, idempotent DDL for the relational model around the measurement
//! hypertable: sites own devices and logical measurement points, points
//! carry a metadata history, devices report health into `device_state`.
//! Safe to run on every startup; no-op once the objects exist.

/// Tables that make up the entity schema, in creation order.
pub const TABLE_NAMES: &[&str] = &[
    "sites",
    "devices",
    "points",
    "point_metadata_history",
    "measurements",
    "device_state",
];

/// Unmanaged tables written by earlier field agents. Dropped only on an
/// explicitly authorized destructive run.
pub const LEGACY_TABLES: &[&str] = &["validation_rules", "write_commands", "command_ack"];

/// Ordered list of DDL statements to ensure the entity schema exists.
/// Every statement is idempotent so the batch is safe on every startup.
pub const CREATE_STATEMENTS: &[&str] = &[
    // Device health status enum; CREATE TYPE has no IF NOT EXISTS
    r"DO $$ BEGIN
    CREATE TYPE device_status AS ENUM ('READY', 'DEGRADED', 'ERROR');
EXCEPTION WHEN duplicate_object THEN NULL;
END $$",

    // ── Sites ──
    r"CREATE TABLE IF NOT EXISTS sites (
    id           UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    display_name TEXT NOT NULL,
    tz           TEXT NOT NULL DEFAULT 'UTC',
    created_at   TIMESTAMPTZ NOT NULL DEFAULT now()
)",

    // ── Devices ──
    r"CREATE TABLE IF NOT EXISTS devices (
    id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    site_id    UUID NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
    model      TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)",

    // ── Logical measurement points ──
    r"CREATE TABLE IF NOT EXISTS points (
    id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    site_id    UUID NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
    point_name TEXT NOT NULL,
    unit       TEXT NOT NULL,
    tags       JSONB NOT NULL DEFAULT '{}'::jsonb,
    active     BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_points_site_name UNIQUE (site_id, point_name)
)",

    // ── Point metadata history (unit/tag changes over time) ──
    r"CREATE TABLE IF NOT EXISTS point_metadata_history (
    id             UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    point_id       UUID NOT NULL REFERENCES points(id) ON DELETE CASCADE,
    effective_from TIMESTAMPTZ NOT NULL,
    unit           TEXT NOT NULL,
    tags           JSONB NOT NULL,
    meta_hash      TEXT NOT NULL,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_point_meta_version UNIQUE (point_id, effective_from)
)",

    // ── Measurements ──
    // Created with the ORM-shaped surrogate key; the reconciler swaps the
    // primary key onto (time, space) before registering partitioning.
    r"CREATE TABLE IF NOT EXISTS measurements (
    id                    UUID NOT NULL DEFAULT gen_random_uuid(),
    point_id              UUID NOT NULL REFERENCES points(id) ON DELETE CASCADE,
    measurement_timestamp TIMESTAMPTZ NOT NULL,
    created_at            TIMESTAMPTZ NOT NULL DEFAULT now(),
    point_name            TEXT NOT NULL,
    unit                  TEXT,
    value                 NUMERIC(14, 6) NOT NULL,
    quality               INTEGER,
    schema_version        INTEGER NOT NULL DEFAULT 1,
    meta_hash             TEXT,
    PRIMARY KEY (id)
)",

    // ── Device health state ──
    r"CREATE TABLE IF NOT EXISTS device_state (
    id              UUID PRIMARY KEY REFERENCES devices(id) ON DELETE CASCADE,
    last_seen_ts    TIMESTAMPTZ NOT NULL,
    last_upload_ts  TIMESTAMPTZ,
    queue_depth     INTEGER,
    agent_version   TEXT,
    poll_interval_s INTEGER,
    cpu_pct         NUMERIC(5, 2),
    disk_free_gb    NUMERIC(10, 2),
    status          device_status NOT NULL,
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT now()
)",

    // Foreign-key indexes for common lookups
    r"CREATE INDEX IF NOT EXISTS idx_devices_site_id ON devices (site_id)",
    r"CREATE INDEX IF NOT EXISTS idx_points_site_id ON points (site_id)",
    r"CREATE INDEX IF NOT EXISTS idx_point_metadata_history_point_id ON point_metadata_history (point_id)",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_has_a_create_statement() {
        for table in TABLE_NAMES {
            assert!(
                CREATE_STATEMENTS
                    .iter()
                    .any(|s| s.contains(&format!("CREATE TABLE IF NOT EXISTS {table}"))),
                "missing create statement for {table}"
            );
        }
    }

    #[test]
    fn create_statements_are_guarded() {
        for stmt in CREATE_STATEMENTS {
            let guarded = stmt.contains("IF NOT EXISTS") || stmt.contains("duplicate_object");
            assert!(guarded, "unguarded statement: {stmt}");
        }
    }

    #[test]
    fn legacy_tables_are_not_part_of_the_entity_schema() {
        for legacy in LEGACY_TABLES {
            assert!(!TABLE_NAMES.contains(legacy));
        }
    }
}
