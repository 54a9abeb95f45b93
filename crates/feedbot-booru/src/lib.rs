//! Image board adapter (Moebooru `post.json` API, e.g. yande.re).

use std::time::Duration;

use async_trait::async_trait;

use feedbot_core::{
    domain::{Image, Post},
    errors::Error,
    ports::ImageSource,
    Result,
};

const USER_AGENT: &str = concat!("feedbot/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct BooruClient {
    base_url: String,
    tags: String,
    http: reqwest::Client,
}

impl BooruClient {
    pub fn new(base_url: impl Into<String>, tags: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tags: tags.into(),
            http,
        })
    }

    fn map_err(e: reqwest::Error) -> Error {
        Error::Source(format!("board request error: {e}"))
    }
}

#[async_trait]
impl ImageSource for BooruClient {
    async fn random_post(&self) -> Result<Option<Post>> {
        let resp = self
            .http
            .get(format!("{}/post.json", self.base_url))
            .query(&[("limit", "1"), ("tags", self.tags.as_str())])
            .send()
            .await
            .map_err(Self::map_err)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::http(status, &body));
        }

        let body = resp.text().await.map_err(Self::map_err)?;
        let mut posts: Vec<Post> = serde_json::from_str(&body)?;
        if posts.is_empty() {
            return Ok(None);
        }
        Ok(Some(posts.swap_remove(0)))
    }

    async fn download(&self, post: &Post) -> Result<Option<Image>> {
        let Some(url) = post.image_url() else {
            return Ok(None);
        };

        let resp = self.http.get(url).send().await.map_err(Self::map_err)?;
        if !resp.status().is_success() {
            tracing::debug!(status = resp.status().as_u16(), %url, "image host refused download");
            return Ok(None);
        }

        let bytes = resp.bytes().await.map_err(Self::map_err)?;
        Ok(Some(Image::for_post(post, bytes.to_vec())))
    }
}
