use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use feedbot_core::{domain::ImageRecord, errors::Error, ports::RecordStore, Result};

#[derive(Clone, Debug)]
pub struct D1Config {
    pub api_base: String,
    pub account_id: String,
    pub database_id: String,
    pub api_token: String,
    pub table: String,
}

#[derive(Debug, Serialize)]
struct QueryBody<'a> {
    sql: &'a str,
    params: Vec<serde_json::Value>,
}

/// D1 over the Cloudflare REST API (`/d1/database/{id}/query`).
#[derive(Clone, Debug)]
pub struct D1Client {
    query_url: String,
    api_token: String,
    insert_sql: String,
    http: reqwest::Client,
}

impl D1Client {
    pub fn new(cfg: D1Config, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;

        let query_url = format!(
            "{}/accounts/{}/d1/database/{}/query",
            cfg.api_base.trim_end_matches('/'),
            cfg.account_id,
            cfg.database_id
        );

        Ok(Self {
            query_url,
            api_token: cfg.api_token,
            insert_sql: insert_sql(&cfg.table),
            http,
        })
    }
}

fn insert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {table} (id, file_name, caption, tags, created_at) VALUES (?, ?, ?, ?, ?)"
    )
}

/// Cloudflare wraps every answer in `{ success, errors, ... }`; a 200 can still be a failure.
fn envelope_error(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    if v.get("success").and_then(|s| s.as_bool()) != Some(false) {
        return None;
    }

    let errors = v
        .get("errors")
        .and_then(|e| e.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown error".to_string());
    Some(errors)
}

#[async_trait]
impl RecordStore for D1Client {
    async fn insert_image(&self, record: &ImageRecord) -> Result<()> {
        if self.api_token.is_empty() {
            return Err(Error::Config("CLOUDFLARE_API_TOKEN not configured".to_string()));
        }

        let body = QueryBody {
            sql: &self.insert_sql,
            params: vec![
                record.id.clone().into(),
                record.file_name.clone().into(),
                record.caption.clone().into(),
                record.tags.clone().into(),
                record.created_at.into(),
            ],
        };

        let resp = self
            .http
            .post(&self.query_url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::External(format!("d1 request error: {e}")))?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::http(status.as_u16(), &text));
        }
        if let Some(msg) = envelope_error(&text) {
            return Err(Error::External(format!("d1 query failed: {msg}")));
        }

        tracing::debug!(id = %record.id, "d1 row inserted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    fn client(server: &mockito::ServerGuard) -> D1Client {
        D1Client::new(
            D1Config {
                api_base: server.url(),
                account_id: "acct".into(),
                database_id: "db-1".into(),
                api_token: "cf-token".into(),
                table: "images".into(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn record() -> ImageRecord {
        ImageRecord {
            id: "1234".into(),
            file_name: "1234.jpg".into(),
            caption: "ID: 1234\nTags: #sky".into(),
            tags: "sky".into(),
            created_at: 1_760_000_000,
        }
    }

    #[tokio::test]
    async fn insert_posts_parameterized_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/accounts/acct/d1/database/db-1/query")
            .match_header("authorization", "Bearer cf-token")
            .match_body(Matcher::Json(serde_json::json!({
                "sql": "INSERT INTO images (id, file_name, caption, tags, created_at) VALUES (?, ?, ?, ?, ?)",
                "params": ["1234", "1234.jpg", "ID: 1234\nTags: #sky", "sky", 1_760_000_000i64],
            })))
            .with_status(200)
            .with_body(r#"{"success": true, "errors": [], "messages": [], "result": []}"#)
            .create_async()
            .await;

        client(&server).insert_image(&record()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unsuccessful_envelope_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/accounts/acct/d1/database/db-1/query")
            .with_status(200)
            .with_body(r#"{"success": false, "errors": [{"code": 7500, "message": "UNIQUE constraint failed: images.id"}]}"#)
            .create_async()
            .await;

        let err = client(&server).insert_image(&record()).await.unwrap_err();
        assert!(err.to_string().contains("UNIQUE constraint failed"));
    }

    #[tokio::test]
    async fn http_error_keeps_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/accounts/acct/d1/database/db-1/query")
            .with_status(401)
            .with_body("Authentication error")
            .create_async()
            .await;

        let err = client(&server).insert_image(&record()).await.unwrap_err();
        assert!(matches!(err, Error::Http { status: 401, .. }));
    }

    #[test]
    fn envelope_parsing() {
        assert_eq!(envelope_error(r#"{"success": true}"#), None);
        assert_eq!(envelope_error("not json"), None);
        assert_eq!(
            envelope_error(r#"{"success": false, "errors": []}"#).as_deref(),
            Some("unknown error")
        );
    }
}
