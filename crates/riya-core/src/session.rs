//! Session identity and the persisted guest record.

use serde::{Deserialize, Serialize};

/// Who the orchestrator is talking for.
///
/// Passed explicitly into the orchestrator factory instead of being looked up
/// from device-local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Stable per-device session identity; also the conversation key.
    pub session_id: String,
    /// Set once the user is authenticated.
    pub user_id: Option<String>,
}

impl SessionContext {
    /// An unauthenticated visitor.
    pub fn guest(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: None,
        }
    }

    /// A signed-in user chatting under `session_id`.
    pub fn user(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: Some(user_id.into()),
        }
    }

    /// Generates a fresh guest identity.
    pub fn new_guest() -> Self {
        Self::guest(format!("guest-{}", uuid::Uuid::new_v4()))
    }

    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }

    /// Identity the completion endpoint keys the conversation on.
    pub fn completion_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or(&self.session_id)
    }
}

/// Guest bookkeeping kept by the session store.
///
/// Read on restore so the gate state can be rebuilt without replaying the
/// whole conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestRecord {
    pub session_id: String,
    /// User messages the backend accepted. Never decremented.
    pub message_count: u32,
    /// The guest signed in; guest-mode gating no longer applies.
    #[serde(default)]
    pub converted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl GuestRecord {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            session_id: session_id.into(),
            message_count: 0,
            converted: false,
            user_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Adds an accepted batch to the count and bumps `updated_at`.
    pub fn add_messages(&mut self, accepted: u32) {
        self.message_count = self.message_count.saturating_add(accepted);
        self.touch();
    }

    pub fn mark_converted(&mut self, user_id: impl Into<String>) {
        self.converted = true;
        self.user_id = Some(user_id.into());
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_id_prefers_user() {
        assert_eq!(SessionContext::guest("g-1").completion_id(), "g-1");
        assert_eq!(SessionContext::user("g-1", "u-9").completion_id(), "u-9");
    }

    #[test]
    fn test_new_guest_ids_are_unique() {
        let a = SessionContext::new_guest();
        let b = SessionContext::new_guest();
        assert!(a.is_guest());
        assert!(a.session_id.starts_with("guest-"));
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_record_counts_and_converts() {
        let mut record = GuestRecord::new("g-1");
        record.add_messages(3);
        record.add_messages(2);
        assert_eq!(record.message_count, 5);
        assert!(!record.converted);

        record.mark_converted("u-1");
        assert!(record.converted);
        assert_eq!(record.user_id.as_deref(), Some("u-1"));
        assert_eq!(record.message_count, 5);
    }
}
