use dashmap::DashMap;

use crate::{
    error::{Error, Result},
    id,
};

/// Request-scoped session state, threaded explicitly through calls instead
/// of living in ambient global state.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    /// Name the visitor declared, if any. `None` while anonymous.
    pub declared_name: Option<String>,
}

impl SessionContext {
    /// Best display name for this session: the declared name when present,
    /// otherwise whatever the identifier slug encodes.
    pub fn display_name(&self) -> String {
        match &self.declared_name {
            Some(name) => name.clone(),
            None => id::extract_display_name(&self.session_id),
        }
    }
}

/// Maps current session identifiers to declared display names.
///
/// A session starts anonymous; a successful [`SessionRegistry::set_name`]
/// issues a fresh identifier and records the name against it. Prior
/// identifiers stay resolvable in the conversation log but are never
/// re-registered here.
#[derive(Default)]
pub struct SessionRegistry {
    names: DashMap<String, String>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh anonymous session identifier.
    pub fn start_session(&self) -> String {
        id::generate_session_id(None)
    }

    /// Declare a visitor name: returns a new named session identifier.
    ///
    /// Fails with [`Error::InvalidName`] when the name is empty after
    /// trimming.
    pub fn set_name(&self, raw_name: &str) -> Result<String> {
        let name = sanitize_name(raw_name);
        if name.is_empty() {
            return Err(Error::InvalidName);
        }
        let session_id = id::generate_session_id(Some(&name));
        self.names.insert(session_id.clone(), name);
        Ok(session_id)
    }

    /// Build the request context for a session identifier.
    pub fn context_for(&self, session_id: &str) -> SessionContext {
        SessionContext {
            session_id: session_id.to_string(),
            declared_name: self.names.get(session_id).map(|n| n.value().clone()),
        }
    }
}

/// Trim and strip control characters from a declared name.
fn sanitize_name(raw: &str) -> String {
    raw.trim().chars().filter(|c| !c.is_control()).collect()
}
