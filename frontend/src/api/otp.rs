use super::{
    client::ApiClient,
    types::{Ack, BulkSendRequest, SendCodeRequest, VerifyCodeRequest},
};
use crate::error::ClientError;

impl ApiClient {
    pub async fn send_otp(&self, phone_number: &str) -> Result<Ack, ClientError> {
        let body = SendCodeRequest {
            phone_number: phone_number.to_string(),
        };
        let response = self
            .send(self.http_client().post(self.url("/otp/send")).json(&body))
            .await?;
        self.map_ack_response(response).await
    }

    pub async fn verify_otp(&self, phone_number: &str, otp: &str) -> Result<Ack, ClientError> {
        let body = VerifyCodeRequest {
            phone_number: phone_number.to_string(),
            otp: otp.to_string(),
        };
        let response = self
            .send(self.http_client().post(self.url("/otp/verify")).json(&body))
            .await?;
        self.map_ack_response(response).await
    }

    pub async fn send_bulk_otp(&self, request: &BulkSendRequest) -> Result<Ack, ClientError> {
        let response = self
            .send(
                self.http_client()
                    .post(self.url("/otp/bulk-send"))
                    .json(request),
            )
            .await?;
        self.map_ack_response(response).await
    }
}
