use async_trait::async_trait;

use crate::{
    domain::{Image, ImageRecord, Post},
    Result,
};

/// Where posts come from (an image board API).
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Pick one post. `None` when the board returned nothing.
    async fn random_post(&self) -> Result<Option<Post>>;

    /// Fetch the post's image. `None` when the image host answers non-success.
    async fn download(&self, post: &Post) -> Result<Option<Image>>;
}

/// Where images get published (a Telegram channel today).
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish_photo(&self, image: &Image, caption: &str) -> Result<()>;
}

/// Blob storage for the archived image bytes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, key: &str, image: &Image) -> Result<()>;
}

/// Metadata storage, one row per relayed image.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_image(&self, record: &ImageRecord) -> Result<()>;
}
