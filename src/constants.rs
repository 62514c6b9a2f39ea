//! Crate-wide limits and reserved names.
//!
//! All limits use big-endian naming with units in the name:
//! `CATEGORY_SPECIFIC_UNIT_MAX`, never `MAX_CATEGORY`.

// =============================================================================
// Relational Backend Limits
// =============================================================================

/// Maximum number of bound parameters SQLite accepts in one statement.
pub const SQLITE_PARAMS_COUNT_MAX: usize = 999;

// =============================================================================
// Storage Adapter Limits
// =============================================================================

/// Chunk size for bounded head/tail probes.
///
/// Probes read at most this many bytes per step from the respective end of
/// the file until the requested number of newlines has been observed.
pub const ADAPTER_PROBE_CHUNK_BYTES: usize = 8 * 1024;

// =============================================================================
// Reserved Names
// =============================================================================

/// File reserved at the adapter root for the persisted schema.
pub const SCHEMA_FILE_NAME: &str = "schema.json";

/// Extension of partition data files.
pub const CSV_FILE_EXTENSION: &str = "csv";

// =============================================================================
// Time Constants
// =============================================================================

/// Milliseconds per second.
pub const TIME_MS_PER_SEC: i64 = 1000;

// =============================================================================
// Tests
// =============================================================================
