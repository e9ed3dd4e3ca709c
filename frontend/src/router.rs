use crate::{api::Role, state::auth::AuthState};

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

/// Protected capabilities and the minimum role each one needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    VerifyPhone,
    UserAnalytics,
    BulkDispatch,
    ManageUsers,
    AggregateAnalytics,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::VerifyPhone,
        Capability::UserAnalytics,
        Capability::BulkDispatch,
        Capability::ManageUsers,
        Capability::AggregateAnalytics,
    ];

    pub fn required_role(self) -> Role {
        match self {
            Capability::VerifyPhone | Capability::UserAnalytics => Role::User,
            Capability::BulkDispatch | Capability::ManageUsers | Capability::AggregateAnalytics => {
                Role::Admin
            }
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Capability::VerifyPhone => "/verify",
            Capability::UserAnalytics => "/analytics/me",
            Capability::BulkDispatch => "/admin/bulk",
            Capability::ManageUsers => "/admin/users",
            Capability::AggregateAnalytics => "/admin/analytics",
        }
    }

    pub fn from_path(path: &str) -> Option<Capability> {
        Capability::ALL.into_iter().find(|c| c.path() == path)
    }
}

pub const PUBLIC_ROUTE_PATHS: &[&str] = &[HOME_PATH, LOGIN_PATH];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    RedirectLogin,
    RedirectHome,
}

impl Access {
    pub fn is_allowed(self) -> bool {
        self == Access::Allow
    }

    pub fn redirect_path(self) -> Option<&'static str> {
        match self {
            Access::Allow => None,
            Access::RedirectLogin => Some(LOGIN_PATH),
            Access::RedirectHome => Some(HOME_PATH),
        }
    }
}

pub fn authorize(state: &AuthState, capability: Capability) -> Access {
    match (state, capability.required_role()) {
        (AuthState::Anonymous, _) => Access::RedirectLogin,
        (AuthState::AuthenticatedUser(_), Role::Admin) => Access::RedirectHome,
        (AuthState::AuthenticatedUser(_), Role::User) => Access::Allow,
        (AuthState::AuthenticatedAdmin(_), _) => Access::Allow,
    }
}

/// Route-level check: public paths always resolve, unknown paths send the user home.
pub fn resolve_path(state: &AuthState, path: &str) -> Access {
    if PUBLIC_ROUTE_PATHS.contains(&path) {
        return Access::Allow;
    }
    match Capability::from_path(path) {
        Some(capability) => authorize(state, capability),
        None => Access::RedirectHome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::UserRecord;
    use crate::state::auth::{Credential, Session};
    use chrono::Utc;
    use std::collections::HashSet;

    fn session(role: Role) -> Session {
        Session {
            credential: Credential::new("tok"),
            user: UserRecord {
                id: "u1".into(),
                name: "Ada".into(),
                email: "ada@example.com".into(),
                role,
                created_at: None,
            },
            issued_at: Utc::now(),
        }
    }

    #[test]
    fn anonymous_is_sent_to_login_for_every_capability() {
        for capability in Capability::ALL {
            assert_eq!(
                authorize(&AuthState::Anonymous, capability),
                Access::RedirectLogin
            );
        }
    }

    #[test]
    fn user_role_is_denied_admin_capabilities() {
        let state = AuthState::AuthenticatedUser(session(Role::User));
        assert_eq!(authorize(&state, Capability::VerifyPhone), Access::Allow);
        assert_eq!(authorize(&state, Capability::UserAnalytics), Access::Allow);
        assert_eq!(
            authorize(&state, Capability::BulkDispatch),
            Access::RedirectHome
        );
        assert_eq!(
            authorize(&state, Capability::ManageUsers),
            Access::RedirectHome
        );
        assert_eq!(
            authorize(&state, Capability::AggregateAnalytics),
            Access::RedirectHome
        );
    }

    #[test]
    fn admin_reaches_everything() {
        let state = AuthState::AuthenticatedAdmin(session(Role::Admin));
        for capability in Capability::ALL {
            assert!(authorize(&state, capability).is_allowed());
        }
    }

    #[test]
    fn redirects_point_at_login_or_home() {
        assert_eq!(Access::RedirectLogin.redirect_path(), Some("/login"));
        assert_eq!(Access::RedirectHome.redirect_path(), Some("/"));
        assert_eq!(Access::Allow.redirect_path(), None);
    }

    #[test]
    fn resolve_path_handles_public_protected_and_unknown() {
        let state = AuthState::Anonymous;
        assert_eq!(resolve_path(&state, "/login"), Access::Allow);
        assert_eq!(resolve_path(&state, "/verify"), Access::RedirectLogin);
        assert_eq!(resolve_path(&state, "/nope"), Access::RedirectHome);
    }

    #[test]
    fn no_duplicate_routes() {
        let mut all: Vec<&str> = Capability::ALL.iter().map(|c| c.path()).collect();
        all.extend(PUBLIC_ROUTE_PATHS);
        let unique: HashSet<&str> = all.iter().copied().collect();
        assert_eq!(unique.len(), all.len());
    }
}
