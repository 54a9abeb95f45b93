//! Telegram adapter (teloxide).
//!
//! This crate implements the `feedbot-core` Publisher port over the Telegram Bot API.

pub mod throttled;

use async_trait::async_trait;

use teloxide::{prelude::*, types::InputFile};

use tokio::time::sleep;

use feedbot_core::{
    caption::{fit_caption, TELEGRAM_CAPTION_LIMIT},
    domain::{ChannelId, Image},
    errors::Error,
    ports::Publisher,
    Result,
};

#[derive(Clone)]
pub struct TelegramPublisher {
    bot: Bot,
    channel: ChannelId,
}

impl TelegramPublisher {
    pub fn new(bot: Bot, channel: ChannelId) -> Self {
        Self { bot, channel }
    }

    /// Build a bot from a token, optionally pointing at a self-hosted Bot API server.
    pub fn from_token(token: &str, api_url: Option<&str>, channel: ChannelId) -> Result<Self> {
        let mut bot = Bot::new(token);
        if let Some(url) = api_url {
            let url = reqwest::Url::parse(url)
                .map_err(|e| Error::Config(format!("invalid TELEGRAM_API_URL {url:?}: {e}")))?;
            bot = bot.set_api_url(url);
        }
        Ok(Self::new(bot, channel))
    }

    fn tg_chat(channel: ChannelId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(channel.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(after) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        tracing::warn!(
                            wait_secs = after.as_secs(),
                            "telegram flood control, retrying"
                        );
                        sleep(after).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    async fn publish_photo(&self, image: &Image, caption: &str) -> Result<()> {
        let caption = fit_caption(caption, TELEGRAM_CAPTION_LIMIT);

        self.with_retry(|| {
            let photo = InputFile::memory(image.bytes.clone()).file_name(image.file_name.clone());
            self.bot
                .send_photo(Self::tg_chat(self.channel), photo)
                .caption(caption.clone())
        })
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use feedbot_core::{caption::build_caption, domain::PostId};

    use super::*;

    const TOKEN: &str = "123456:test-token";

    fn image() -> Image {
        Image {
            bytes: vec![0xff, 0xd8, 0xff],
            file_name: "5.jpg".into(),
            content_type: "image/jpeg",
        }
    }

    fn publisher(server: &mockito::ServerGuard) -> TelegramPublisher {
        let url = server.url();
        TelegramPublisher::from_token(TOKEN, Some(url.as_str()), ChannelId(-1001)).unwrap()
    }

    // Bot API method names are case-insensitive; match either spelling.
    fn send_photo_path() -> Matcher {
        Matcher::Regex(format!(r"(?i)^/bot{TOKEN}/sendphoto$"))
    }

    const SENT_MESSAGE: &str = r#"{"ok": true, "result": {"message_id": 1, "date": 1706529600, "chat": {"id": -1001, "type": "channel", "title": "feed"}, "photo": [{"file_id": "a", "file_unique_id": "b", "width": 1, "height": 1, "file_size": 3}], "caption": "ID: 5"}}"#;

    const FLOOD: &str = r#"{"ok": false, "error_code": 429, "description": "Too Many Requests: retry after 0", "parameters": {"retry_after": 0}}"#;

    // Multipart text field as reqwest writes it.
    fn form_field(name: &str, value: &str) -> Matcher {
        Matcher::Regex(format!("name=\"{name}\"\r\n\r\n{value}\r\n"))
    }

    #[tokio::test]
    async fn photo_is_sent_to_channel_with_caption() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", send_photo_path())
            .match_body(Matcher::AllOf(vec![
                form_field("chat_id", "-1001"),
                form_field("caption", "ID: 5\nTags: #sky"),
                Matcher::Regex(r#"filename="5\.jpg""#.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SENT_MESSAGE)
            .expect(1)
            .create_async()
            .await;

        publisher(&server)
            .publish_photo(&image(), "ID: 5\nTags: #sky")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn flood_control_then_success_is_ok() {
        let mut server = mockito::Server::new_async().await;
        // The first mock still missing hits wins, so the 429 is served first.
        let flood = server
            .mock("POST", send_photo_path())
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_body(FLOOD)
            .expect(1)
            .create_async()
            .await;
        let sent = server
            .mock("POST", send_photo_path())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SENT_MESSAGE)
            .expect(1)
            .create_async()
            .await;

        publisher(&server)
            .publish_photo(&image(), "ID: 5\nTags:")
            .await
            .unwrap();
        flood.assert_async().await;
        sent.assert_async().await;
    }

    #[tokio::test]
    async fn long_caption_is_cut_before_sending() {
        let tags = (1..=300)
            .map(|i| format!("tag{i:04}"))
            .collect::<Vec<_>>()
            .join(" ");
        let caption = build_caption(PostId(5), &tags);
        assert!(caption.chars().count() > TELEGRAM_CAPTION_LIMIT);

        let fitted = fit_caption(&caption, TELEGRAM_CAPTION_LIMIT);
        assert!(fitted.ends_with('…'));
        assert!(fitted.chars().count() <= TELEGRAM_CAPTION_LIMIT);
        assert!(!fitted.contains("#tag0300"));

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", send_photo_path())
            .match_body(form_field("caption", &fitted))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SENT_MESSAGE)
            .expect(1)
            .create_async()
            .await;

        publisher(&server)
            .publish_photo(&image(), &caption)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_is_mapped() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", send_photo_path())
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}"#)
            .expect(1)
            .create_async()
            .await;

        let err = publisher(&server)
            .publish_photo(&image(), "ID: 5\nTags:")
            .await
            .unwrap_err();
        mock.assert_async().await;
        assert!(matches!(err, Error::External(ref m) if m.starts_with("telegram error")));
    }

    #[tokio::test]
    async fn flood_control_is_retried_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", send_photo_path())
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_body(FLOOD)
            .expect(2)
            .create_async()
            .await;

        let res = publisher(&server).publish_photo(&image(), "caption").await;
        mock.assert_async().await;
        assert!(res.is_err());
    }

    #[test]
    fn bad_api_url_is_config_error() {
        assert!(matches!(
            TelegramPublisher::from_token(TOKEN, Some("not a url"), ChannelId(1)),
            Err(Error::Config(_))
        ));
    }
}
