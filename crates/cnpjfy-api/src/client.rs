//! HTTP client for `GET {base}/{cnpj}` and `GET {base}/info`.

use cnpjfy_core::{Cnpj, CnpjError, Company, RawCompanyRecord, map_company_with};
use cnpjfy_core::{CodeTable, ReferenceTable};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::ApiConfig;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid CNPJ: {0}")]
    Validation(#[from] CnpjError),
    #[error("CNPJ not found")]
    NotFound,
    #[error("too many requests, try again in a few minutes")]
    RateLimited,
    #[error("server error {status}: {body}")]
    Server { status: u16, body: String },
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::RateLimited | ApiError::Server { .. })
    }

    fn from_status(status: u16, body: String) -> Self {
        match status {
            404 => ApiError::NotFound,
            429 => ApiError::RateLimited,
            500..=599 => ApiError::Server { status, body },
            _ => ApiError::UnexpectedStatus { status, body },
        }
    }
}

/// Dataset metadata from `/info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub zip_size: Option<u64>,
    #[serde(default)]
    pub zip_url: Option<String>,
    #[serde(default)]
    pub zip_md5checksum: Option<String>,
}

/// Client for the public CNPJ lookup API.
///
/// One request per call: no retries, no caching, no persistence. Dropping the
/// returned future cancels the request.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    table: Box<dyn CodeTable>,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            table: Box::new(ReferenceTable::builtin()),
        })
    }

    /// Describe bare CNAE / legal-nature codes with `table` instead of the
    /// built-in one.
    pub fn with_code_table(mut self, table: impl CodeTable + 'static) -> Self {
        self.table = Box::new(table);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Validate `input` and fetch the company. Invalid input never reaches
    /// the network.
    pub async fn lookup(&self, input: &str) -> Result<Company, ApiError> {
        let cnpj = Cnpj::parse(input)?;
        self.fetch_company(&cnpj).await
    }

    /// Fetch and map one company.
    pub async fn fetch_company(&self, cnpj: &Cnpj) -> Result<Company, ApiError> {
        let url = format!("{}/{}", self.base_url, cnpj.as_str());
        info!(url = %url, cnpj = %cnpj, "fetching company");
        let body = self.get(&url).await?;
        let raw = RawCompanyRecord::from_json(&body)?;
        let company = map_company_with(raw, self.table.as_ref());
        if &company.cnpj != cnpj {
            warn!(requested = %cnpj, returned = %company.cnpj, "API returned a different CNPJ");
        }
        info!(
            cnpj = %company.cnpj,
            partners = company.partners.len(),
            "fetched company"
        );
        Ok(company)
    }

    pub async fn info(&self) -> Result<ApiInfo, ApiError> {
        let url = format!("{}/info", self.base_url);
        info!(url = %url, "fetching dataset info");
        let body = self.get(&url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get(&self, url: &str) -> Result<String, ApiError> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), "request failed");
            return Err(ApiError::from_status(status.as_u16(), body));
        }
        Ok(resp.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(ApiError::from_status(404, String::new()), ApiError::NotFound));
        assert!(matches!(ApiError::from_status(429, String::new()), ApiError::RateLimited));
        assert!(matches!(
            ApiError::from_status(503, "down".into()),
            ApiError::Server { status: 503, .. }
        ));
        assert!(matches!(
            ApiError::from_status(418, "teapot".into()),
            ApiError::UnexpectedStatus { status: 418, ref body } if body == "teapot"
        ));
    }

    #[test]
    fn retryable_kinds() {
        assert!(ApiError::RateLimited.is_retryable());
        assert!(ApiError::from_status(500, String::new()).is_retryable());
        assert!(!ApiError::NotFound.is_retryable());
        assert!(!ApiError::from_status(400, String::new()).is_retryable());
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = ApiClient::new(ApiConfig {
            base_url: "http://localhost:4000/".into(),
            ..ApiConfig::default()
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:4000");
    }

    #[test]
    fn info_tolerates_missing_fields() {
        let info: ApiInfo = serde_json::from_str(r#"{"total": 63000000}"#).unwrap();
        assert_eq!(info.total, Some(63_000_000));
        assert!(info.zip_url.is_none());
    }
}
