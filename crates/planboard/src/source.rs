//! Read-only access to plan records.
//!
//! Plans are owned by an external system. Every call goes back to the
//! source; nothing is cached between board loads or hovers.

use std::path::PathBuf;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::SourceSettings;
use crate::error::SourceError;
use crate::types::{Plan, PlanDetail, PlanList};

/// Plan API client
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| SourceError::Http {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, SourceError> {
        debug!(url = %url, "Fetching");
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| SourceError::Http {
            url: url.clone(),
            source,
        })?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// `GET /api/plans/`, unfiltered. The API's `?year=` matches calendar
    /// years, so ISO-year selection is left to the board.
    pub async fn list_plans(&self) -> Result<Vec<Plan>, SourceError> {
        let url = format!("{}/api/plans/", self.base_url);
        let list: PlanList<Plan> = self.get_json(url).await?;
        Ok(list.into_vec())
    }

    /// `GET /api/plans/{id}/`
    pub async fn plan_detail(&self, id: i64) -> Result<PlanDetail, SourceError> {
        let url = format!("{}/api/plans/{}/", self.base_url, id);
        match self.get_json(url).await {
            Err(SourceError::Status { status: 404, .. }) => Err(SourceError::NotFound(id)),
            other => other,
        }
    }
}

/// A JSON file in the list endpoint's shape, re-read on every call
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_all(&self) -> Result<Vec<PlanDetail>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;
        let list: PlanList<PlanDetail> = serde_json::from_str(&content)?;
        let entries = list.into_vec();
        debug!(count = entries.len(), path = %self.path.display(), "Loaded plans file");
        Ok(entries)
    }

    pub async fn list_plans(&self) -> Result<Vec<Plan>, SourceError> {
        let plans = self
            .read_all()
            .await?
            .into_iter()
            .map(|detail| detail.plan)
            .collect();
        Ok(plans)
    }

    pub async fn plan_detail(&self, id: i64) -> Result<PlanDetail, SourceError> {
        self.read_all()
            .await?
            .into_iter()
            .find(|detail| detail.plan.id == id)
            .ok_or(SourceError::NotFound(id))
    }
}

/// The configured backend
#[derive(Debug, Clone)]
pub enum PlanSource {
    Http(HttpSource),
    File(FileSource),
}

impl PlanSource {
    pub fn from_settings(settings: &SourceSettings) -> Result<Self, SourceError> {
        match settings {
            SourceSettings::Api { base_url, timeout } => {
                Ok(PlanSource::Http(HttpSource::new(base_url, *timeout)?))
            }
            SourceSettings::File(path) => Ok(PlanSource::File(FileSource::new(path.clone()))),
        }
    }

    pub async fn list_plans(&self) -> Result<Vec<Plan>, SourceError> {
        match self {
            PlanSource::Http(source) => source.list_plans().await,
            PlanSource::File(source) => source.list_plans().await,
        }
    }

    pub async fn plan_detail(&self, id: i64) -> Result<PlanDetail, SourceError> {
        match self {
            PlanSource::Http(source) => source.plan_detail(id).await,
            PlanSource::File(source) => source.plan_detail(id).await,
        }
    }
}
