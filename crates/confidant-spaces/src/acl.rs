//! Write-ACL resolution (spec §4.6 "auxiliary to C6").

use confidant_core::AuthContext;

use crate::model::{PublishedMemory, WriteMode};

/// `canRevise(user, memory, credsFetcher?)`.
pub fn can_revise(user_id: &str, memory: &PublishedMemory, auth: Option<&AuthContext>) -> bool {
    if user_id == memory.source_owner_id {
        return true;
    }
    match memory.write_mode {
        WriteMode::OwnerOnly => false,
        WriteMode::Anyone => true,
        WriteMode::GroupEditors => {
            let (Some(auth), Some(group_id)) = (auth, &memory.group_id) else { return false };
            auth.can_revise_in(group_id)
        }
    }
}

/// `canOverwrite(user, memory, credsFetcher?)`.
pub fn can_overwrite(user_id: &str, memory: &PublishedMemory, auth: Option<&AuthContext>) -> bool {
    if user_id == memory.source_owner_id {
        return true;
    }
    if memory.overwrite_allowed_ids.contains(user_id) {
        return true;
    }
    match memory.write_mode {
        WriteMode::OwnerOnly => false,
        WriteMode::Anyone => true,
        WriteMode::GroupEditors => {
            let (Some(auth), Some(group_id)) = (auth, &memory.group_id) else { return false };
            auth.can_overwrite_in(group_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use confidant_core::{GroupMembership, Permissions};
    use std::collections::HashSet;

    use super::*;

    fn published(write_mode: WriteMode, group_id: Option<&str>) -> PublishedMemory {
        PublishedMemory {
            id: "row".to_string(),
            doc_type: confidant_core::DocType::Memory,
            source_owner_id: "owner".to_string(),
            author_id: "owner".to_string(),
            source_memory_id: "m1".to_string(),
            content: "c".to_string(),
            title: None,
            summary: None,
            memory_type: "note".to_string(),
            tags: HashSet::new(),
            content_type: None,
            weight: 0.5,
            space_ids: HashSet::new(),
            group_id: group_id.map(str::to_string),
            moderation_status: crate::model::ModerationStatus::Approved,
            moderated_by: None,
            moderated_at: None,
            write_mode,
            overwrite_allowed_ids: HashSet::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            retracted_at: None,
            revision_history: Vec::new(),
            revision_count: 0,
        }
    }

    #[test]
    fn owner_can_always_revise_and_overwrite() {
        let memory = published(WriteMode::OwnerOnly, None);
        assert!(can_revise("owner", &memory, None));
        assert!(can_overwrite("owner", &memory, None));
    }

    #[test]
    fn owner_only_blocks_everyone_else() {
        let memory = published(WriteMode::OwnerOnly, None);
        assert!(!can_revise("someone", &memory, None));
    }

    #[test]
    fn anyone_mode_allows_any_user() {
        let memory = published(WriteMode::Anyone, None);
        assert!(can_revise("someone", &memory, None));
        assert!(can_overwrite("someone", &memory, None));
    }

    #[test]
    fn group_editors_requires_matching_capability() {
        let memory = published(WriteMode::GroupEditors, Some("eng"));
        let auth = AuthContext {
            user_id: "someone".to_string(),
            group_memberships: vec![GroupMembership {
                group_id: "eng".to_string(),
                permissions: Permissions { can_revise: true, can_overwrite: false, can_moderate: false },
            }],
        };
        assert!(can_revise("someone", &memory, Some(&auth)));
        assert!(!can_overwrite("someone", &memory, Some(&auth)));
    }

    #[test]
    fn explicit_overwrite_allow_list_bypasses_write_mode() {
        let mut memory = published(WriteMode::OwnerOnly, None);
        memory.overwrite_allowed_ids.insert("guest".to_string());
        assert!(can_overwrite("guest", &memory, None));
    }
}
