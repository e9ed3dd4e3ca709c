use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use super::{
    client::ApiClient,
    types::{CreateUserRequest, UserRecord},
};
use crate::error::ClientError;

impl ApiClient {
    pub async fn list_users(&self) -> Result<Vec<UserRecord>, ClientError> {
        let response = self
            .send(self.http_client().get(self.url("/users")))
            .await?;
        self.map_json_response(response).await
    }

    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<UserRecord, ClientError> {
        let response = self
            .send(self.http_client().post(self.url("/users")).json(request))
            .await?;
        self.map_json_response(response).await
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<(), ClientError> {
        let encoded = utf8_percent_encode(user_id, NON_ALPHANUMERIC).to_string();
        let response = self
            .send(
                self.http_client()
                    .delete(self.url(&format!("/users/{}", encoded))),
            )
            .await?;
        self.map_empty_response(response).await
    }
}
