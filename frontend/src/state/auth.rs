use std::{fmt, sync::Arc};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::{
    api::{LoginRequest, MessagingService, Role, UserRecord},
    error::ClientError,
    router::{self, Access, Capability},
    utils::storage::Storage,
};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Opaque bearer credential. Never printed.
#[derive(Clone)]
pub struct Credential(Arc<SecretString>);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::new(SecretString::from(token.into())))
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0.expose_secret())
    }

    fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub credential: Credential,
    pub user: UserRecord,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    pub fn role(&self) -> Role {
        self.user.role
    }
}

#[derive(Debug, Clone, Default)]
pub enum AuthState {
    #[default]
    Anonymous,
    AuthenticatedUser(Session),
    AuthenticatedAdmin(Session),
}

impl AuthState {
    fn from_session(session: Session) -> Self {
        match session.role() {
            Role::Admin => AuthState::AuthenticatedAdmin(session),
            Role::User => AuthState::AuthenticatedUser(session),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Anonymous => None,
            AuthState::AuthenticatedUser(s) | AuthState::AuthenticatedAdmin(s) => Some(s),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.session().map(Session::role)
    }
}

/// Profile half of the persisted session.
#[derive(Debug, Serialize, Deserialize)]
struct StoredProfile {
    #[serde(flatten)]
    user: UserRecord,
    #[serde(rename = "issuedAt")]
    issued_at: DateTime<Utc>,
}

/// Sole owner of the session. Components receive credentials from it rather than reading
/// shared storage themselves.
pub struct SessionGuard {
    state: AuthState,
    storage: Arc<dyn Storage>,
}

impl SessionGuard {
    /// Start anonymous without consulting storage.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            state: AuthState::Anonymous,
            storage,
        }
    }

    /// Rebuild the session persisted by a previous process. Anything incomplete or
    /// unreadable is cleared and yields `Anonymous`.
    pub fn restore(storage: Arc<dyn Storage>) -> Self {
        let mut guard = Self::new(storage);
        match guard.load_persisted() {
            Ok(Some(session)) => {
                tracing::info!(user_id = %session.user.id, role = %session.role(), "session restored");
                guard.state = AuthState::from_session(session);
            }
            Ok(None) => {
                guard.clear_persisted();
            }
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable session");
                guard.clear_persisted();
            }
        }
        guard
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn credential(&self) -> Option<Credential> {
        self.state.session().map(|s| s.credential.clone())
    }

    pub fn current_user(&self) -> Option<&UserRecord> {
        self.state.session().map(|s| &s.user)
    }

    pub async fn authenticate(
        &mut self,
        service: &dyn MessagingService,
        email: &str,
        password: &SecretString,
    ) -> Result<UserRecord, ClientError> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.expose_secret().to_string(),
        };
        request.validate()?;

        let response = service.login(&request).await.map_err(|err| match err {
            ClientError::RemoteOperation { message, .. } | ClientError::Authorization(message) => {
                ClientError::Authentication(message)
            }
            other => other,
        })?;
        if response.token.trim().is_empty() {
            return Err(ClientError::Authentication(
                "Login response did not include a token".into(),
            ));
        }

        let credential = Credential::new(response.token);
        let issued_at = decode_issued_at(credential.expose()).unwrap_or_else(Utc::now);
        let session = Session {
            credential,
            user: response.user,
            issued_at,
        };
        if let Err(err) = self.persist(&session) {
            self.clear_persisted();
            return Err(err);
        }

        tracing::info!(user_id = %session.user.id, role = %session.role(), "authenticated");
        let user = session.user.clone();
        self.state = AuthState::from_session(session);
        Ok(user)
    }

    pub fn authorize(&self, capability: Capability) -> Access {
        router::authorize(&self.state, capability)
    }

    /// Clear the session in memory and in storage. Safe to call when already anonymous.
    pub fn end_session(&mut self) {
        if let Some(user) = self.current_user() {
            tracing::info!(user_id = %user.id, "session ended");
        }
        self.clear_persisted();
        self.state = AuthState::Anonymous;
    }

    /// Call-site hook for failed remote calls: an authentication rejection ends the
    /// session. Returns whether it did.
    pub fn on_remote_error(&mut self, err: &ClientError) -> bool {
        if matches!(err, ClientError::Authentication(_)) && self.state.is_authenticated() {
            tracing::warn!(error = %err, "credential rejected by service");
            self.end_session();
            true
        } else {
            false
        }
    }

    fn persist(&self, session: &Session) -> Result<(), ClientError> {
        let profile = StoredProfile {
            user: session.user.clone(),
            issued_at: session.issued_at,
        };
        let profile_json = serde_json::to_string(&profile)
            .map_err(|e| ClientError::Storage(format!("Failed to serialize user profile: {}", e)))?;
        self.storage
            .set_item(TOKEN_KEY, session.credential.expose())?;
        self.storage.set_item(USER_KEY, &profile_json)
    }

    fn load_persisted(&self) -> Result<Option<Session>, ClientError> {
        let token = self.storage.get_item(TOKEN_KEY)?;
        let profile = self.storage.get_item(USER_KEY)?;
        let (Some(token), Some(profile)) = (token, profile) else {
            return Ok(None);
        };
        if token.trim().is_empty() {
            return Ok(None);
        }
        let profile: StoredProfile = serde_json::from_str(&profile)
            .map_err(|e| ClientError::Storage(format!("Invalid stored profile: {}", e)))?;
        Ok(Some(Session {
            credential: Credential::new(token),
            user: profile.user,
            issued_at: profile.issued_at,
        }))
    }

    fn clear_persisted(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(err) = self.storage.remove_item(key) {
                tracing::warn!(key, error = %err, "failed to clear session key");
            }
        }
    }
}

/// `iat` claim of a JWT-shaped token, if the token has one.
fn decode_issued_at(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    parts.next()?;
    let payload = parts.next()?;
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let value: Value = serde_json::from_slice(&decoded).ok()?;
    let iat = value.get("iat")?.as_i64()?;
    Utc.timestamp_opt(iat, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{LoginResponse, MockMessagingService};
    use crate::utils::storage::{FileStorage, MemoryStorage};

    fn user(role: Role) -> UserRecord {
        UserRecord {
            id: "u1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            role,
            created_at: None,
        }
    }

    fn jwt_with_iat(iat: i64) -> String {
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"u1","iat":{}}}"#, iat));
        format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", payload)
    }

    fn login_ok(token: String, role: Role) -> MockMessagingService {
        let mut service = MockMessagingService::new();
        service.expect_login().times(1).returning(move |_| {
            Ok(LoginResponse {
                token: token.clone(),
                user: user(role),
            })
        });
        service
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[tokio::test]
    async fn authenticate_stores_session_under_both_keys() {
        let storage = Arc::new(MemoryStorage::new());
        let mut guard = SessionGuard::new(storage.clone());
        let service = login_ok(jwt_with_iat(1_700_000_000), Role::Admin);

        let record = guard
            .authenticate(&service, "ada@example.com", &secret("pw"))
            .await
            .unwrap();

        assert_eq!(record.role, Role::Admin);
        assert!(matches!(guard.state(), AuthState::AuthenticatedAdmin(_)));
        assert!(storage.get_item(TOKEN_KEY).unwrap().is_some());
        assert!(storage.get_item(USER_KEY).unwrap().is_some());
        let session = guard.state().session().unwrap();
        assert_eq!(session.issued_at.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn failed_login_reports_authentication_error_and_stores_nothing() {
        let storage = Arc::new(MemoryStorage::new());
        let mut guard = SessionGuard::new(storage.clone());
        let mut service = MockMessagingService::new();
        service.expect_login().times(1).returning(|_| {
            Err(ClientError::RemoteOperation {
                status: 400,
                code: "INVALID_CREDENTIALS".into(),
                message: "Invalid credentials".into(),
            })
        });

        let err = guard
            .authenticate(&service, "ada@example.com", &secret("wrong"))
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::Authentication("Invalid credentials".into()));
        assert!(!guard.state().is_authenticated());
        assert!(storage.get_item(TOKEN_KEY).unwrap().is_none());
        assert!(storage.get_item(USER_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn blank_credentials_are_rejected_locally() {
        let mut guard = SessionGuard::new(Arc::new(MemoryStorage::new()));
        let mut service = MockMessagingService::new();
        service.expect_login().never();

        let err = guard
            .authenticate(&service, "  ", &secret(""))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ClientError::Validation("Please enter both email and password".into())
        );
    }

    #[tokio::test]
    async fn session_survives_restart_until_ended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut guard = SessionGuard::new(Arc::new(FileStorage::new(&path)));
        let service = login_ok("opaque-token".into(), Role::User);
        guard
            .authenticate(&service, "ada@example.com", &secret("pw"))
            .await
            .unwrap();

        let restored = SessionGuard::restore(Arc::new(FileStorage::new(&path)));
        assert!(matches!(restored.state(), AuthState::AuthenticatedUser(_)));
        assert_eq!(
            restored.credential().unwrap().bearer(),
            "Bearer opaque-token"
        );

        let mut restored = restored;
        restored.end_session();
        restored.end_session();
        assert!(!restored.state().is_authenticated());

        let after_logout = SessionGuard::restore(Arc::new(FileStorage::new(&path)));
        assert!(!after_logout.state().is_authenticated());
    }

    #[test]
    fn restore_with_half_a_session_clears_both_keys() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(TOKEN_KEY, "orphan").unwrap();

        let guard = SessionGuard::restore(storage.clone());

        assert!(!guard.state().is_authenticated());
        assert!(storage.get_item(TOKEN_KEY).unwrap().is_none());
    }

    #[test]
    fn restore_with_corrupt_profile_is_anonymous() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(TOKEN_KEY, "tok").unwrap();
        storage.set_item(USER_KEY, "{not json").unwrap();

        let guard = SessionGuard::restore(storage.clone());

        assert!(!guard.state().is_authenticated());
        assert!(storage.get_item(USER_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn authentication_rejection_at_call_site_ends_session() {
        let mut guard = SessionGuard::new(Arc::new(MemoryStorage::new()));
        let service = login_ok("tok".into(), Role::User);
        guard
            .authenticate(&service, "ada@example.com", &secret("pw"))
            .await
            .unwrap();

        assert!(!guard.on_remote_error(&ClientError::transport("offline")));
        assert!(guard.state().is_authenticated());

        assert!(guard.on_remote_error(&ClientError::Authentication("expired".into())));
        assert!(!guard.state().is_authenticated());
        assert!(!guard.on_remote_error(&ClientError::Authentication("expired".into())));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("super-secret");
        assert_eq!(format!("{:?}", credential), "Credential([REDACTED])");
    }

    #[test]
    fn issued_at_is_absent_for_opaque_tokens() {
        assert!(decode_issued_at("opaque").is_none());
        assert_eq!(
            decode_issued_at(&jwt_with_iat(42)).map(|t| t.timestamp()),
            Some(42)
        );
    }
}
