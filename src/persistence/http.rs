//! HTTP persistence against the episode timeline API.
//!
//! Every response is wrapped in a `{ "success": bool, "data": ... }`
//! envelope.

use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{
    NewPlacement, NewScene, PersistenceError, PersistenceResult, PersistenceService,
    PlacementPatch, ScenePatch,
};
use crate::model::{Placement, Scene};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl From<reqwest::Error> for PersistenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PersistenceError::InvalidResponse {
                reason: err.to_string(),
            }
        } else {
            PersistenceError::Unavailable {
                reason: err.to_string(),
            }
        }
    }
}

/// API client for one episode's timeline
pub struct HttpPersistence {
    client: Client,
    base_url: String,
    episode_id: String,
}

impl HttpPersistence {
    /// Create a client for `episode_id`, optionally sending a bearer token.
    pub fn new(base_url: &str, episode_id: &str, token: Option<&str>) -> PersistenceResult<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                PersistenceError::Unavailable {
                    reason: format!("invalid auth token: {}", e),
                }
            })?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            episode_id: episode_id.to_string(),
        })
    }

    fn placements_url(&self) -> String {
        format!(
            "{}/api/v1/episodes/{}/timeline/placements",
            self.base_url, self.episode_id
        )
    }

    fn scenes_url(&self) -> String {
        format!(
            "{}/api/v1/episodes/{}/library-scenes",
            self.base_url, self.episode_id
        )
    }

    /// Check the status and unwrap the envelope.
    async fn unwrap<T: DeserializeOwned>(resp: Response, id: Option<Uuid>) -> PersistenceResult<T> {
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(PersistenceError::NotFound { id });
            }
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(PersistenceError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<T> = resp.json().await?;
        if !envelope.success {
            return Err(PersistenceError::Rejected {
                status: status.as_u16(),
                message: envelope.error.unwrap_or_default(),
            });
        }
        envelope.data.ok_or_else(|| PersistenceError::InvalidResponse {
            reason: "response envelope has no data".to_string(),
        })
    }

    /// Like [`Self::unwrap`] for endpoints whose envelope carries no data.
    async fn unwrap_empty(resp: Response, id: Uuid) -> PersistenceResult<()> {
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PersistenceError::NotFound { id });
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(PersistenceError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: String,
        body: &B,
        id: Option<Uuid>,
    ) -> PersistenceResult<T> {
        debug!(%method, url = %url, "persistence request");
        let resp = self.client.request(method, &url).json(body).send().await?;
        Self::unwrap(resp, id).await
    }
}

impl PersistenceService for HttpPersistence {
    /// POST /api/v1/episodes/{episode}/timeline/placements
    async fn create_placement(&self, data: NewPlacement) -> PersistenceResult<Placement> {
        self.send_json(reqwest::Method::POST, self.placements_url(), &data, None)
            .await
    }

    /// PATCH /api/v1/episodes/{episode}/timeline/placements/{id}
    async fn update_placement(&self, id: Uuid, patch: PlacementPatch) -> PersistenceResult<Placement> {
        let url = format!("{}/{}", self.placements_url(), id);
        self.send_json(reqwest::Method::PATCH, url, &patch, Some(id))
            .await
    }

    /// DELETE /api/v1/episodes/{episode}/timeline/placements/{id}
    async fn delete_placement(&self, id: Uuid) -> PersistenceResult<()> {
        let url = format!("{}/{}", self.placements_url(), id);
        debug!(url = %url, "persistence delete");
        let resp = self.client.delete(&url).send().await?;
        Self::unwrap_empty(resp, id).await
    }

    /// POST /api/v1/episodes/{episode}/library-scenes
    async fn create_scene(&self, data: NewScene) -> PersistenceResult<Scene> {
        self.send_json(reqwest::Method::POST, self.scenes_url(), &data, None)
            .await
    }

    /// PUT /api/v1/episodes/{episode}/library-scenes/{id}
    async fn update_scene(&self, id: Uuid, patch: ScenePatch) -> PersistenceResult<Scene> {
        let url = format!("{}/{}", self.scenes_url(), id);
        self.send_json(reqwest::Method::PUT, url, &patch, Some(id))
            .await
    }

    /// GET /api/v1/episodes/{episode}/timeline/placements
    async fn list_placements(&self) -> PersistenceResult<Vec<Placement>> {
        let resp = self.client.get(self.placements_url()).send().await?;
        Self::unwrap(resp, None).await
    }

    /// GET /api/v1/episodes/{episode}/library-scenes
    async fn list_scenes(&self) -> PersistenceResult<Vec<Scene>> {
        let resp = self.client.get(self.scenes_url()).send().await?;
        Self::unwrap(resp, None).await
    }
}
