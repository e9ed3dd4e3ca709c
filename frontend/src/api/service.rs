//! Service seam used by the session guard and the controllers.
//!
//! `ApiClient` is the production implementation; tests substitute `MockMessagingService`.

use async_trait::async_trait;

use super::{
    client::ApiClient,
    types::{Ack, BulkSendRequest, LoginRequest, LoginResponse},
};
use crate::error::ClientError;

/// Remote operations the core state machines depend on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingService: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ClientError>;

    /// Ask the service to dispatch a one-time code to `phone_number`.
    async fn send_code(&self, phone_number: &str) -> Result<Ack, ClientError>;

    async fn verify_code(&self, phone_number: &str, code: &str) -> Result<Ack, ClientError>;

    /// Issue one batch of a bulk job.
    async fn bulk_send(&self, request: &BulkSendRequest) -> Result<Ack, ClientError>;
}

#[async_trait]
impl MessagingService for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ClientError> {
        ApiClient::login(self, request).await
    }

    async fn send_code(&self, phone_number: &str) -> Result<Ack, ClientError> {
        ApiClient::send_otp(self, phone_number).await
    }

    async fn verify_code(&self, phone_number: &str, code: &str) -> Result<Ack, ClientError> {
        ApiClient::verify_otp(self, phone_number, code).await
    }

    async fn bulk_send(&self, request: &BulkSendRequest) -> Result<Ack, ClientError> {
        ApiClient::send_bulk_otp(self, request).await
    }
}
