//! Administrative surface: user management and aggregate SMS analytics.

use validator::Validate;

use crate::{
    api::{ApiClient, CreateUserRequest, DailyCount, SmsAnalytics, UserRecord},
    error::ClientError,
    router::{Access, Capability},
    state::auth::SessionGuard,
};

/// Days of history shown in the daily SMS chart.
pub const DAILY_WINDOW_DAYS: usize = 14;

/// Admin-only operations bound to the current session. A rejected credential ends the
/// session before the error is returned.
pub struct AdminConsole<'a> {
    api: ApiClient,
    guard: &'a mut SessionGuard,
}

impl<'a> AdminConsole<'a> {
    /// Fails with the redirect the guard prescribes when the session is not an admin one.
    pub fn new(api: &ApiClient, guard: &'a mut SessionGuard) -> Result<Self, Access> {
        for capability in [Capability::ManageUsers, Capability::AggregateAnalytics] {
            let access = guard.authorize(capability);
            if !access.is_allowed() {
                return Err(access);
            }
        }
        Ok(Self {
            api: api.with_credential(guard.credential()),
            guard,
        })
    }

    fn settle<T>(&mut self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(err) = &result {
            self.guard.on_remote_error(err);
        }
        result
    }

    pub async fn list_users(&mut self) -> Result<Vec<UserRecord>, ClientError> {
        let result = self.api.list_users().await;
        self.settle(result)
    }

    pub async fn create_user(
        &mut self,
        request: &CreateUserRequest,
    ) -> Result<UserRecord, ClientError> {
        request.validate()?;
        let result = self.api.create_user(request).await;
        if let Ok(user) = &result {
            tracing::info!(user_id = %user.id, role = %user.role, "user created");
        }
        self.settle(result)
    }

    pub async fn delete_user(&mut self, user_id: &str) -> Result<(), ClientError> {
        if user_id.trim().is_empty() {
            return Err(ClientError::validation("User id is required"));
        }
        if self.guard.current_user().is_some_and(|u| u.id == user_id) {
            return Err(ClientError::validation("You cannot delete your own account"));
        }
        let result = self.api.delete_user(user_id).await;
        if result.is_ok() {
            tracing::info!(user_id, "user deleted");
        }
        self.settle(result)
    }

    pub async fn sms_analytics(&mut self) -> Result<SmsAnalytics, ClientError> {
        let result = self.api.get_sms_analytics().await;
        self.settle(result)
    }

    /// Daily counters for the last [`DAILY_WINDOW_DAYS`] days on record, oldest first.
    pub async fn daily_sms_counts(&mut self) -> Result<Vec<(String, DailyCount)>, ClientError> {
        let result = self.api.get_daily_sms_count().await.map(|counts| {
            counts
                .recent(DAILY_WINDOW_DAYS)
                .into_iter()
                .map(|(date, count)| (date.to_string(), count))
                .collect()
        });
        self.settle(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use httpmock::prelude::*;
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;
    use crate::{
        api::Role,
        state::auth::AuthState,
        utils::storage::{MemoryStorage, Storage},
    };

    async fn admin_guard(server: &MockServer, role: &str) -> SessionGuard {
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/login");
                then.status(200).json_body(json!({
                    "token": "admin-token",
                    "user": {"_id": "u-1", "name": "Ada", "email": "ada@example.com", "role": role}
                }));
            })
            .await;
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut guard = SessionGuard::new(storage);
        let api = ApiClient::new_with_base_url(server.base_url());
        guard
            .authenticate(&api, "ada@example.com", &SecretString::from("pw".to_string()))
            .await
            .unwrap();
        guard
    }

    #[tokio::test]
    async fn non_admins_are_redirected_home() {
        let server = MockServer::start_async().await;
        let mut guard = admin_guard(&server, "user").await;
        let api = ApiClient::new_with_base_url(server.base_url());

        let denied = AdminConsole::new(&api, &mut guard).err();
        assert_eq!(denied, Some(Access::RedirectHome));
    }

    #[tokio::test]
    async fn anonymous_sessions_are_redirected_to_login() {
        let mut guard = SessionGuard::new(Arc::new(MemoryStorage::new()));
        let api = ApiClient::new_with_base_url("http://localhost:9");

        let denied = AdminConsole::new(&api, &mut guard).err();
        assert_eq!(denied, Some(Access::RedirectLogin));
    }

    #[tokio::test]
    async fn lists_users_with_bearer_token() {
        let server = MockServer::start_async().await;
        let mut guard = admin_guard(&server, "admin").await;
        let users = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/users")
                    .header("authorization", "Bearer admin-token");
                then.status(200).json_body(json!([
                    {"_id": "u-1", "name": "Ada", "email": "ada@example.com", "role": "admin"},
                    {"_id": "u-2", "name": "Bob", "email": "bob@example.com", "role": "user"}
                ]));
            })
            .await;
        let api = ApiClient::new_with_base_url(server.base_url());

        let mut console = AdminConsole::new(&api, &mut guard).unwrap();
        let listed = console.list_users().await.unwrap();

        users.assert_async().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].role, Role::User);
    }

    #[tokio::test]
    async fn rejected_credential_ends_the_session() {
        let server = MockServer::start_async().await;
        let mut guard = admin_guard(&server, "admin").await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/analytics/sms");
                then.status(401).json_body(json!({"error": "Token expired"}));
            })
            .await;
        let api = ApiClient::new_with_base_url(server.base_url());

        let err = {
            let mut console = AdminConsole::new(&api, &mut guard).unwrap();
            console.sms_analytics().await.unwrap_err()
        };

        assert_eq!(err, ClientError::Authentication("Token expired".into()));
        assert!(matches!(guard.state(), AuthState::Anonymous));
    }

    #[tokio::test]
    async fn invalid_user_is_rejected_before_any_request() {
        let server = MockServer::start_async().await;
        let mut guard = admin_guard(&server, "admin").await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/users");
                then.status(201);
            })
            .await;
        let api = ApiClient::new_with_base_url(server.base_url());
        let mut console = AdminConsole::new(&api, &mut guard).unwrap();

        let err = console
            .create_user(&CreateUserRequest {
                name: String::new(),
                email: "not-an-email".into(),
                password: "secret".into(),
                role: Role::User,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(create.hits_async().await, 0);
        assert!(console.delete_user("u-1").await.is_err());
    }

    #[tokio::test]
    async fn daily_counts_keep_the_last_two_weeks() {
        let server = MockServer::start_async().await;
        let mut guard = admin_guard(&server, "admin").await;
        let mut days = serde_json::Map::new();
        for day in 1..=20 {
            days.insert(
                format!("2024-03-{:02}", day),
                json!({"sent": day, "failed": 0, "total": day}),
            );
        }
        server
            .mock_async(|when, then| {
                when.method(GET).path("/analytics/sms/daily");
                then.status(200).json_body(json!({ "data": days }));
            })
            .await;
        let api = ApiClient::new_with_base_url(server.base_url());
        let mut console = AdminConsole::new(&api, &mut guard).unwrap();

        let counts = console.daily_sms_counts().await.unwrap();
        assert_eq!(counts.len(), DAILY_WINDOW_DAYS);
        assert_eq!(counts[0].0, "2024-03-07");
        assert_eq!(counts[13].1.sent, 20);
    }
}
