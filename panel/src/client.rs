use std::time::Duration;

use common::{
    env_config::PanelConfig,
    error::{AppError, Res},
};
use log::{debug, info};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    PanelApi,
    dtos::{Envelope, ListEnvelope, NewPanelServer, NewPanelUser, PanelErrors, PanelServer, PanelUser},
};

/// HTTP client for the panel's Application API.
#[derive(Clone)]
pub struct PanelClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PanelClient {
    pub fn new(config: &PanelConfig) -> Res<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(PanelClient {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/application{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Turns non-2xx responses into `AppError::Panel` carrying the first error detail.
    async fn check(response: Response) -> Res<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let errors: PanelErrors = serde_json::from_str(&body).unwrap_or_default();
        let message = errors
            .errors
            .first()
            .map(|e| {
                if e.detail.is_empty() {
                    e.code.clone()
                } else {
                    e.detail.clone()
                }
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected panel response")
                    .to_string()
            });
        Err(AppError::panel(status.as_u16(), message))
    }

    async fn read<T: DeserializeOwned>(response: Response) -> Res<T> {
        let envelope = Self::check(response).await?.json::<Envelope<T>>().await?;
        Ok(envelope.attributes)
    }

    async fn post_action(&self, path: &str) -> Res<()> {
        let response = self
            .authorized(self.client.post(self.url(path)))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

impl PanelApi for PanelClient {
    async fn find_user_by_email(&self, email: &str) -> Res<Option<PanelUser>> {
        debug!("Looking up panel user by email {}", email);
        let response = self
            .authorized(self.client.get(self.url("/users")))
            .query(&[("filter[email]", email)])
            .send()
            .await?;
        let users = Self::check(response).await?.json::<ListEnvelope<PanelUser>>().await?;
        Ok(users
            .data
            .into_iter()
            .map(|u| u.attributes)
            .find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    async fn create_user(&self, user: &NewPanelUser) -> Res<PanelUser> {
        info!("Creating panel user {}", user.email);
        let response = self
            .authorized(self.client.post(self.url("/users")))
            .json(user)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn find_server_by_external_id(&self, external_id: &str) -> Res<Option<PanelServer>> {
        let response = self
            .authorized(
                self.client
                    .get(self.url(&format!("/servers/external/{}", external_id))),
            )
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::read(response).await.map(Some)
    }

    async fn create_server(&self, server: &NewPanelServer) -> Res<PanelServer> {
        info!(
            "Creating panel server {} (external_id={})",
            server.name, server.external_id
        );
        let response = self
            .authorized(self.client.post(self.url("/servers")))
            .json(server)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn suspend_server(&self, id: i64) -> Res<()> {
        self.post_action(&format!("/servers/{}/suspend", id)).await
    }

    async fn unsuspend_server(&self, id: i64) -> Res<()> {
        self.post_action(&format!("/servers/{}/unsuspend", id)).await
    }

    async fn delete_server(&self, id: i64, force: bool) -> Res<()> {
        let path = if force {
            format!("/servers/{}/force", id)
        } else {
            format!("/servers/{}", id)
        };
        let response = self
            .authorized(self.client.delete(self.url(&path)))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
