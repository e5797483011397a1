//! Syntactic validation for space and group ids (spec §4.6).

use anyhow::{Result, bail};

/// Spaces are validated "against a format predicate": lowercase
/// alphanumerics, underscores, and hyphens, non-empty, capped at a
/// reasonable length for a collection-row discriminator.
pub fn validate_space_id(space_id: &str) -> Result<()> {
    let valid = !space_id.is_empty()
        && space_id.len() <= 64
        && space_id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if !valid {
        bail!("Invalid space id: {space_id}");
    }
    Ok(())
}

pub fn validate_space_ids(space_ids: &[String]) -> Result<()> {
    let invalid: Vec<&String> = space_ids.iter().filter(|id| validate_space_id(id).is_err()).collect();
    if !invalid.is_empty() {
        let list = invalid.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ");
        bail!("Invalid space IDs: {list}");
    }
    Ok(())
}

/// "Group id is any non-empty string without a dot" (spec §4.6).
pub fn validate_group_id(group_id: &str) -> Result<()> {
    if group_id.is_empty() || group_id.contains('.') {
        bail!("Invalid group id: {group_id}");
    }
    Ok(())
}

pub fn validate_group_ids(group_ids: &[String]) -> Result<()> {
    let invalid: Vec<&String> = group_ids.iter().filter(|id| validate_group_id(id).is_err()).collect();
    if !invalid.is_empty() {
        let list = invalid.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ");
        bail!("Invalid group IDs: {list}");
    }
    Ok(())
}
