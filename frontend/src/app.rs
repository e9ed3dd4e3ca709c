use std::sync::Arc;

use secrecy::SecretString;

use crate::{
    admin::AdminConsole,
    api::{ApiClient, UserAnalytics, UserRecord},
    bulk::{BulkDispatcher, BulkJobRequest, JobReport, ProgressSink},
    config::RuntimeConfig,
    error::ClientError,
    otp::OtpController,
    router::{self, Access, Capability},
    state::auth::{AuthState, SessionGuard},
    utils::storage::{local_storage, Storage},
};

/// Application shell: owns the configuration, the service client and the session guard, and
/// hands out feature controllers only to sessions allowed to use them.
pub struct Frontend {
    config: RuntimeConfig,
    api: ApiClient,
    guard: SessionGuard,
}

impl Frontend {
    /// Build from configuration, restoring any session persisted at `config.session_file`.
    pub fn new(config: RuntimeConfig) -> Result<Self, ClientError> {
        let api = ApiClient::new(&config)?;
        let storage: Arc<dyn Storage> = Arc::new(local_storage(config.session_file.clone()));
        Ok(Self::with_parts(config, api, storage))
    }

    pub fn with_parts(config: RuntimeConfig, api: ApiClient, storage: Arc<dyn Storage>) -> Self {
        let guard = SessionGuard::restore(storage);
        Self { config, api, guard }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn auth_state(&self) -> &AuthState {
        self.guard.state()
    }

    pub fn current_user(&self) -> Option<&UserRecord> {
        self.guard.current_user()
    }

    pub async fn login(
        &mut self,
        email: &str,
        password: &SecretString,
    ) -> Result<UserRecord, ClientError> {
        self.guard.authenticate(&self.api, email, password).await
    }

    pub fn logout(&mut self) {
        self.guard.end_session();
    }

    /// Where a request for `path` ends up for the current session.
    pub fn navigate(&self, path: &str) -> Access {
        router::resolve_path(self.guard.state(), path)
    }

    /// Feed a failed remote call back to the guard; an authentication failure logs out.
    pub fn report_error(&mut self, err: &ClientError) -> bool {
        self.guard.on_remote_error(err)
    }

    fn authorized_client(&self, capability: Capability) -> Result<ApiClient, Access> {
        match self.guard.authorize(capability) {
            Access::Allow => Ok(self.api.with_credential(self.guard.credential())),
            denied => Err(denied),
        }
    }

    /// A fresh verification flow for the signed-in user.
    pub fn verification(&self) -> Result<OtpController, Access> {
        let api = self.authorized_client(Capability::VerifyPhone)?;
        Ok(OtpController::new(
            Arc::new(api),
            self.config.otp_countdown_secs,
        ))
    }

    pub fn bulk_dispatcher(&self) -> Result<BulkDispatcher, Access> {
        let api = self.authorized_client(Capability::BulkDispatch)?;
        Ok(BulkDispatcher::new(Arc::new(api)))
    }

    /// Run a bulk job to completion. A job that fails on a rejected credential also ends
    /// the session.
    pub async fn run_bulk_job(
        &mut self,
        request: BulkJobRequest,
        sink: &mut dyn ProgressSink,
    ) -> Result<JobReport, Access> {
        let dispatcher = self.bulk_dispatcher()?;
        let report = dispatcher.run(request, sink).await;
        if let Some(err) = &report.error {
            self.guard.on_remote_error(err);
        }
        Ok(report)
    }

    pub fn admin(&mut self) -> Result<AdminConsole<'_>, Access> {
        AdminConsole::new(&self.api, &mut self.guard)
    }

    pub async fn user_analytics(&mut self) -> Result<UserAnalytics, ClientError> {
        let api = self
            .authorized_client(Capability::UserAnalytics)
            .map_err(|_| ClientError::Authentication("Please log in to continue".into()))?;
        let result = api.get_user_analytics().await;
        if let Err(err) = &result {
            self.guard.on_remote_error(err);
        }
        result
    }
}
