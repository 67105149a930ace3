//! Conversation-index records.
//!
//! Two tagged variants share the merge machinery: bare conversation
//! records and invite records carrying the invitation payload with its own
//! key material. Only the validation rules differ per variant.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Required length of invitation key material (AES-256-GCM-HKDF seed).
pub const INVITATION_KEY_MATERIAL_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Record topic is empty")]
    EmptyTopic,
    #[error("Record timestamp must be positive, got {0}")]
    InvalidTimestamp(i64),
    #[error("Record peer address is empty")]
    EmptyPeerAddress,
    #[error("Invitation topic is empty")]
    EmptyInvitationTopic,
    #[error("Invitation key material must be {INVITATION_KEY_MATERIAL_LEN} bytes, got {0}")]
    InvalidKeyMaterial(usize),
}

/// Application context attached to an invitation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationContext {
    pub conversation_id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Invitation payload embedded in an invite record: the session topic plus
/// the symmetric key material that unlocks it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub topic: String,
    pub key_material: Vec<u8>,
    pub context: Option<InvitationContext>,
}

/// One member of an append-only per-collection list. Records are set
/// members keyed by topic, not slots that get overwritten.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationRecord {
    Bare {
        topic: String,
        created_ns: i64,
        peer_address: String,
    },
    Invite {
        topic: String,
        created_ns: i64,
        peer_address: String,
        invitation: Invitation,
    },
}

impl ConversationRecord {
    pub fn topic(&self) -> &str {
        match self {
            ConversationRecord::Bare { topic, .. } => topic,
            ConversationRecord::Invite { topic, .. } => topic,
        }
    }

    pub fn created_ns(&self) -> i64 {
        match self {
            ConversationRecord::Bare { created_ns, .. } => *created_ns,
            ConversationRecord::Invite { created_ns, .. } => *created_ns,
        }
    }

    pub fn peer_address(&self) -> &str {
        match self {
            ConversationRecord::Bare { peer_address, .. } => peer_address,
            ConversationRecord::Invite { peer_address, .. } => peer_address,
        }
    }

    pub fn invitation(&self) -> Option<&Invitation> {
        match self {
            ConversationRecord::Bare { .. } => None,
            ConversationRecord::Invite { invitation, .. } => Some(invitation),
        }
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.topic().is_empty() {
            return Err(RecordError::EmptyTopic);
        }
        if self.created_ns() <= 0 {
            return Err(RecordError::InvalidTimestamp(self.created_ns()));
        }
        if self.peer_address().is_empty() {
            return Err(RecordError::EmptyPeerAddress);
        }
        if let Some(invitation) = self.invitation() {
            if invitation.topic.is_empty() {
                return Err(RecordError::EmptyInvitationTopic);
            }
            if invitation.key_material.len() != INVITATION_KEY_MATERIAL_LEN {
                return Err(RecordError::InvalidKeyMaterial(invitation.key_material.len()));
            }
        }
        Ok(())
    }
}
