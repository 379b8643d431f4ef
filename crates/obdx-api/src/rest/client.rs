// HTTP client for the hosted store's PostgREST surface.
//
// Base path: /rest/v1/
// Auth: `apikey` + `Authorization: Bearer` headers carrying the same key.
// Every table read returns a JSON array; writes ask for
// `Prefer: return=representation` so the affected rows come back.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::models::PostgrestError;
use crate::Error;
use crate::transport::TransportConfig;

const PREFER: &str = "Prefer";
const RETURN_REPRESENTATION: &str = "return=representation";

/// Async client for the hosted store's REST API.
///
/// Table-specific operations live in sibling modules as inherent methods;
/// this module only knows how to talk PostgREST.
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl RestClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// The key is sent both as `apikey` and as a bearer token, which is
    /// what the hosted gateway expects for anonymous-role and service-role
    /// keys alike.
    pub fn from_api_key(
        base_url: &str,
        api_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let invalid = |e: reqwest::header::InvalidHeaderValue| Error::Authentication {
            message: format!("invalid API key header value: {e}"),
        };

        let mut key_value = HeaderValue::from_str(api_key.expose_secret()).map_err(invalid)?;
        key_value.set_sensitive(true);
        let mut bearer =
            HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret())).map_err(invalid)?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key_value);
        headers.insert(AUTHORIZATION, bearer);

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;

        Ok(Self {
            http,
            base_url,
            timeout: transport.timeout,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            timeout: TransportConfig::default().timeout,
        })
    }

    /// Build the base URL ending in `/rest/v1/`.
    ///
    /// Accepts either the project root (`https://x.example.co`) or the
    /// REST root itself (`https://x.example.co/rest/v1`).
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with("/rest/v1") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/rest/v1/"));
        }

        Ok(url)
    }

    /// The REST root this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, table: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(table)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, Error> {
        let url = self.url(table)?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        self.handle_response(resp).await
    }

    /// Fetch at most one row matching `params`.
    pub(crate) async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>, Error> {
        let rows: Vec<T> = self.select(table, params).await?;
        Ok(rows.into_iter().next())
    }

    pub(crate) async fn insert<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(table)?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .header(PREFER, RETURN_REPRESENTATION)
            .json(body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let rows: Vec<T> = self.handle_response(resp).await?;
        rows.into_iter().next().ok_or_else(|| Error::EmptyRepresentation {
            table: table.to_owned(),
        })
    }

    /// PATCH every row matching `params`; returns the rows actually changed.
    pub(crate) async fn update<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        table: &str,
        params: &[(&str, String)],
        body: &B,
    ) -> Result<Vec<T>, Error> {
        let url = self.url(table)?;
        debug!("PATCH {url} params={params:?}");

        let resp = self
            .http
            .patch(url)
            .query(params)
            .header(PREFER, RETURN_REPRESENTATION)
            .json(body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        self.handle_response(resp).await
    }

    /// DELETE every row matching `params`; returns the rows actually removed.
    pub(crate) async fn delete<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, Error> {
        let url = self.url(table)?;
        debug!("DELETE {url} params={params:?}");

        let resp = self
            .http
            .delete(url)
            .query(params)
            .header(PREFER, RETURN_REPRESENTATION)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        self.handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    fn send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.send_error(e))?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            });
        }

        let parsed: Option<PostgrestError> = serde_json::from_str(&body).ok();
        let code = parsed.as_ref().and_then(|e| e.code.clone());
        let message = parsed
            .and_then(|e| match (e.message, e.details) {
                (Some(m), Some(d)) => Some(format!("{m} ({d})")),
                (m, d) => m.or(d),
            })
            .unwrap_or_else(|| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body.clone()
                }
            });

        match status.as_u16() {
            401 | 403 => Err(Error::Authentication { message }),
            409 => Err(Error::Conflict { message, code }),
            _ if code.as_deref() == Some("23505") => Err(Error::Conflict { message, code }),
            s => Err(Error::Rest {
                message,
                code,
                status: s,
            }),
        }
    }
}

// ── Filter helpers ───────────────────────────────────────────────────

/// `column=eq.value`
pub(crate) fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}
