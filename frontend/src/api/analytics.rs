use super::{
    client::ApiClient,
    types::{DailySmsCounts, DataEnvelope, SmsAnalytics, UserAnalytics},
};
use crate::error::ClientError;

impl ApiClient {
    pub async fn get_sms_analytics(&self) -> Result<SmsAnalytics, ClientError> {
        let response = self
            .send(self.http_client().get(self.url("/analytics/sms")))
            .await?;
        let envelope: DataEnvelope<SmsAnalytics> = self.map_json_response(response).await?;
        Ok(envelope.data)
    }

    pub async fn get_daily_sms_count(&self) -> Result<DailySmsCounts, ClientError> {
        let response = self
            .send(self.http_client().get(self.url("/analytics/sms/daily")))
            .await?;
        let envelope: DataEnvelope<DailySmsCounts> = self.map_json_response(response).await?;
        Ok(envelope.data)
    }

    /// Analytics for the caller identified by the bearer token.
    pub async fn get_user_analytics(&self) -> Result<UserAnalytics, ClientError> {
        let response = self
            .send(self.http_client().get(self.url("/analytics/user")))
            .await?;
        self.map_json_response(response).await
    }
}
