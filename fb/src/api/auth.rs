//! Authentication endpoints

use tracing::debug;

use super::{ApiClient, ApiError, ApiRequest, Body, Method, RegisterRequest, TokenResponse, User};

pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for a bearer token and keep it for later calls
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        debug!(%username, "AuthApi::login: called");
        let request = ApiRequest::new(Method::Post, "/auth/login").body(Body::Form(vec![
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
        ]));
        let token: TokenResponse = self.client.call(request).await?;
        self.client.set_token(Some(token.access_token.clone())).await;
        Ok(token)
    }

    /// Forget the stored token
    pub async fn logout(&self) {
        debug!("AuthApi::logout: called");
        self.client.set_token(None).await;
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        debug!(username = %request.username, "AuthApi::register: called");
        let request = ApiRequest::new(Method::Post, "/auth/register").body(ApiClient::json_body(request)?);
        self.client.call(request).await
    }

    /// The user the current token belongs to
    pub async fn me(&self) -> Result<User, ApiError> {
        debug!("AuthApi::me: called");
        self.client.call(ApiRequest::new(Method::Get, "/auth/me")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::mock::MockTransport;
    use crate::events::Buses;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_login_stores_token_for_later_calls() {
        let transport = Arc::new(
            MockTransport::new()
                .ok(Method::Post, "/auth/login", json!({"access_token": "tok-1", "token_type": "bearer"}))
                .ok(Method::Get, "/auth/me", json!({"id": 1, "email": "a@b.c", "username": "alex"})),
        );
        let client = ApiClient::new(transport.clone(), Buses::new());

        let token = client.auth().login("alex", "hunter2").await.unwrap();
        assert_eq!(token.access_token, "tok-1");

        let me = client.auth().me().await.unwrap();
        assert_eq!(me.username, "alex");

        let requests = transport.requests();
        assert_eq!(requests[0].token, None);
        assert!(matches!(&requests[0].body, Body::Form(pairs) if pairs.len() == 2));
        assert_eq!(requests[1].token.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_failed_login_keeps_previous_token() {
        let transport = Arc::new(MockTransport::new().status(
            Method::Post,
            "/auth/login",
            401,
            r#"{"detail": "Incorrect username or password"}"#,
        ));
        let client = ApiClient::new(transport, Buses::new()).with_token("old");

        let err = client.auth().login("alex", "wrong").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(client.token().await.as_deref(), Some("old"));

        client.auth().logout().await;
        assert_eq!(client.token().await, None);
    }
}
