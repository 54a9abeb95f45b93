use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;

use feedbot_core::{domain::Image, errors::Error, ports::ObjectStore, Result};

use crate::sigv4::{self, Credentials, SigningRequest};

/// R2 buckets are region-less; S3 clients sign them as `auto`.
const R2_REGION: &str = "auto";

#[derive(Clone, Debug)]
pub struct R2Config {
    pub endpoint: Option<String>,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

/// Minimal S3 `PutObject` client for Cloudflare R2 (path-style addressing).
#[derive(Clone, Debug)]
pub struct R2Client {
    /// `None` when no endpoint could be derived (account id missing).
    endpoint: Option<Url>,
    bucket: String,
    creds: Credentials,
    http: reqwest::Client,
}

impl R2Client {
    pub fn new(cfg: R2Config, timeout: Duration) -> Result<Self> {
        let endpoint = match cfg.endpoint.as_deref() {
            Some(raw) => {
                let url = Url::parse(raw)
                    .map_err(|e| Error::Config(format!("invalid R2 endpoint {raw:?}: {e}")))?;
                if url.host_str().is_none() {
                    return Err(Error::Config(format!("R2 endpoint has no host: {raw}")));
                }
                Some(url)
            }
            None => None,
        };

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;

        Ok(Self {
            endpoint,
            bucket: cfg.bucket,
            creds: Credentials {
                access_key: cfg.access_key,
                secret_key: cfg.secret_key,
                region: R2_REGION.to_string(),
                service: "s3".to_string(),
            },
            http,
        })
    }

    /// `Host` header value as reqwest will send it (port only when non-default).
    fn host_header(endpoint: &Url) -> String {
        let host = endpoint.host_str().unwrap_or_default();
        match endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    fn object_path(&self, endpoint: &Url, key: &str) -> String {
        let prefix = endpoint.path().trim_end_matches('/');
        format!(
            "{prefix}/{}/{}",
            sigv4::encode_segment(&self.bucket),
            sigv4::encode_key(key.trim_start_matches('/'))
        )
    }
}

#[async_trait]
impl ObjectStore for R2Client {
    async fn put_object(&self, key: &str, image: &Image) -> Result<()> {
        let Some(endpoint) = &self.endpoint else {
            return Err(Error::Config("R2 endpoint not configured".to_string()));
        };
        if self.bucket.is_empty() || self.creds.access_key.is_empty() {
            return Err(Error::Config("R2 bucket or credentials not configured".to_string()));
        }

        let path = self.object_path(endpoint, key);
        let host = Self::host_header(endpoint);
        let payload_hash = sigv4::sha256_hex(&image.bytes);
        let now = Utc::now();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let sig = sigv4::sign(
            &self.creds,
            &SigningRequest {
                method: "PUT",
                canonical_uri: &path,
                canonical_query: "",
                headers: &[
                    ("content-type", image.content_type),
                    ("host", host.as_str()),
                    ("x-amz-content-sha256", payload_hash.as_str()),
                    ("x-amz-date", amz_date.as_str()),
                ],
                payload_sha256: &payload_hash,
                at: now,
            },
        )?;

        let mut url = endpoint.clone();
        url.set_path(&path);

        let resp = self
            .http
            .put(url)
            .header("content-type", image.content_type)
            .header("x-amz-content-sha256", &payload_hash)
            .header("x-amz-date", &sig.amz_date)
            .header("authorization", &sig.authorization)
            .body(image.bytes.clone())
            .send()
            .await
            .map_err(|e| Error::External(format!("r2 request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::http(status, &body));
        }

        tracing::debug!(bucket = %self.bucket, %key, bytes = image.bytes.len(), "object stored");
        Ok(())
    }
}
