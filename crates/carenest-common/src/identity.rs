use serde::{Deserialize, Serialize};

/// The signed-in caregiver. Threaded explicitly into the components that
/// need to know who "self" is.
#[derive(Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub display_name: Option<String>,
    /// Supabase Auth JWT for row-level-security protected requests.
    #[serde(skip)]
    pub access_token: Option<String>,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("display_name", &self.display_name)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Identity {
    pub fn new(user_id: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name,
            access_token: None,
        }
    }

    /// Attach the Supabase Auth session token, if signed in.
    pub fn with_access_token(mut self, access_token: Option<String>) -> Self {
        self.access_token = access_token;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let id = Identity::new("u1", Some("Sam".into())).with_access_token(Some("secret".into()));
        let dbg = format!("{id:?}");
        assert!(dbg.contains("u1"));
        assert!(dbg.contains("[REDACTED]"));
        assert!(!dbg.contains("secret"));
    }

    #[test]
    fn token_is_not_serialized() {
        let id = Identity::new("u1", None).with_access_token(Some("secret".into()));
        let json = serde_json::to_string(&id).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"user_id\":\"u1\""));
    }
}
