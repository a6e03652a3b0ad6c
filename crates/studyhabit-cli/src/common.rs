//! Shared helpers for CLI commands.

use chrono::{DateTime, Utc};
use studyhabit_core::{Database, Profile};

/// Resolve a profile by id or display name.
pub fn resolve_profile(
    db: &Database,
    id_or_name: &str,
) -> Result<Profile, Box<dyn std::error::Error>> {
    db.find_profile(id_or_name)?
        .ok_or_else(|| format!("Profile not found: {id_or_name}").into())
}

/// Parse an RFC 3339 timestamp argument (e.g. "2026-09-01T18:00:00Z").
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(|e| format!("invalid timestamp '{s}': {e}"))?
        .with_timezone(&Utc))
}
