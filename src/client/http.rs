//! `reqwest` implementation of [`HashicupsApi`].

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::error::ClientError;
use super::models::{Coffee, NewOrderItem, Order};
use super::HashicupsApi;

/// Host used when neither configuration nor environment names one.
pub const DEFAULT_HOST: &str = "http://localhost:19090";

/// Timeout applied to every request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SignInRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
}

/// HTTP client for a HashiCups server.
///
/// Once signed in, every request carries the session token in the
/// `Authorization` header.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    host: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create an anonymous client for `host` (scheme included).
    pub fn new(host: impl Into<String>) -> Result<Self, ClientError> {
        let host = host.into().trim_end_matches('/').to_string();
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(ClientError::InvalidHost(host));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("hashicups-provider/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            host,
            token: None,
        })
    }

    /// Create a client and sign in with the given credentials.
    ///
    /// A rejected sign-in is an error; use [`HttpClient::new`] for an
    /// anonymous client.
    #[instrument(skip(password))]
    pub async fn sign_in(host: &str, username: &str, password: &str) -> Result<Self, ClientError> {
        let mut client = Self::new(host)?;
        let request = client
            .http
            .post(client.url("/signin"))
            .json(&SignInRequest { username, password });
        let auth: AuthResponse = client.send(request).await?;
        client.token = Some(auth.token);
        debug!("Signed in");
        Ok(client)
    }

    /// The base URL requests are sent to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The session token, if signed in.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let request = match &self.token {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait::async_trait]
impl HashicupsApi for HttpClient {
    async fn get_coffees(&self) -> Result<Vec<Coffee>, ClientError> {
        debug!(host = %self.host, "GET /coffees");
        self.send(self.http.get(self.url("/coffees"))).await
    }

    async fn create_order(&self, items: &[NewOrderItem]) -> Result<Order, ClientError> {
        debug!(host = %self.host, items = items.len(), "POST /orders");
        self.send(self.http.post(self.url("/orders")).json(items))
            .await
    }

    async fn get_order(&self, order_id: &str) -> Result<Order, ClientError> {
        debug!(host = %self.host, order_id = %order_id, "GET /orders/:id");
        self.send(self.http.get(self.url(&format!("/orders/{}", order_id))))
            .await
    }
}
