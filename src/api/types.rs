//! Shared types for the REST layer.

use std::str::FromStr;
use std::sync::Arc;

use crate::models::StaffRole;
use crate::state::AppState;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub state: Arc<AppState>,
}

impl ApiContext {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

/// Authenticated staff context, injected into request extensions by the
/// staff middleware. The upstream authenticator is trusted to have
/// verified the identity; these headers are its hand-off.
#[derive(Debug, Clone)]
pub struct StaffContext {
    pub staff_id: String,
    pub role: StaffRole,
}

impl StaffContext {
    /// Parse the trusted `X-Staff-Id` / `X-Staff-Role` header pair.
    pub fn from_headers(staff_id: Option<&str>, role: Option<&str>) -> Option<Self> {
        let staff_id = staff_id?.trim();
        if staff_id.is_empty() {
            return None;
        }
        let role = StaffRole::from_str(role?.trim()).ok()?;
        Some(Self {
            staff_id: staff_id.to_string(),
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_context_parses_valid_headers() {
        let ctx = StaffContext::from_headers(Some("reception-2"), Some("secretary")).unwrap();
        assert_eq!(ctx.staff_id, "reception-2");
        assert_eq!(ctx.role, StaffRole::Secretary);
    }

    #[test]
    fn staff_context_rejects_missing_id() {
        assert!(StaffContext::from_headers(None, Some("admin")).is_none());
        assert!(StaffContext::from_headers(Some(""), Some("admin")).is_none());
        assert!(StaffContext::from_headers(Some("   "), Some("admin")).is_none());
    }

    #[test]
    fn staff_context_rejects_unknown_role() {
        assert!(StaffContext::from_headers(Some("x"), Some("janitor")).is_none());
        assert!(StaffContext::from_headers(Some("x"), None).is_none());
    }
}
