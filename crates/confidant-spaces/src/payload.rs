//! Confirmation-token payload shapes for the three two-phase operations
//! (spec §4.6).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishPayload {
    pub memory_id: String,
    pub spaces: Vec<String>,
    pub groups: Vec<String>,
    pub additional_tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetractPayload {
    pub memory_id: String,
    pub spaces: Vec<String>,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisePayload {
    pub memory_id: String,
    pub space_ids: HashSet<String>,
    pub group_ids: HashSet<String>,
}
