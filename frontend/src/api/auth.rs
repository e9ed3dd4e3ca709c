use super::{
    client::ApiClient,
    types::{LoginRequest, LoginResponse},
};
use crate::error::ClientError;

impl ApiClient {
    /// `POST /auth/login`. Persisting the returned session is the guard's job.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ClientError> {
        let response = self
            .send(self.http_client().post(self.url("/auth/login")).json(request))
            .await?;
        self.map_json_response(response).await
    }
}
