//! One relay tick: fetch a post, publish it, archive it, record it.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    caption::build_caption,
    domain::{ImageRecord, PostId},
    ports::{ImageSource, ObjectStore, Publisher, RecordStore},
    recent::RecentPosts,
    Result,
};

/// What a single tick ended up doing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    NoPost,
    NoImageUrl(PostId),
    Duplicate(PostId),
    DownloadFailed(PostId),
    Relayed(RelayReport),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayReport {
    pub post_id: PostId,
    pub file_name: String,
    pub archived: bool,
    pub recorded: bool,
}

pub struct Relay {
    source: Arc<dyn ImageSource>,
    publisher: Arc<dyn Publisher>,
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    recent: Mutex<RecentPosts>,
}

impl Relay {
    pub fn new(
        source: Arc<dyn ImageSource>,
        publisher: Arc<dyn Publisher>,
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        recent_capacity: usize,
    ) -> Self {
        Self {
            source,
            publisher,
            objects,
            records,
            recent: Mutex::new(RecentPosts::new(recent_capacity)),
        }
    }

    /// Run one tick.
    ///
    /// Source and publish failures abort the tick with an error. Archive and
    /// record failures are logged and reported, but do not fail the tick.
    pub async fn run_once(&self) -> Result<RelayOutcome> {
        let Some(post) = self.source.random_post().await? else {
            tracing::info!("source returned no posts");
            return Ok(RelayOutcome::NoPost);
        };
        let post_id = post.id;

        if post.image_url().is_none() {
            tracing::warn!(%post_id, "post has no image url, skipping");
            return Ok(RelayOutcome::NoImageUrl(post_id));
        }

        if self.recent.lock().await.contains(post_id) {
            tracing::info!(%post_id, "post relayed recently, skipping");
            return Ok(RelayOutcome::Duplicate(post_id));
        }

        tracing::info!(%post_id, "downloading image");
        let Some(image) = self.source.download(&post).await? else {
            tracing::warn!(%post_id, "image download returned non-success status");
            return Ok(RelayOutcome::DownloadFailed(post_id));
        };

        let caption = build_caption(post_id, &post.tags);

        self.publisher.publish_photo(&image, &caption).await?;
        tracing::info!(%post_id, "published to channel");

        let archived = match self.objects.put_object(&image.file_name, &image).await {
            Ok(()) => {
                tracing::info!(key = %image.file_name, "image archived");
                true
            }
            Err(e) => {
                tracing::error!(key = %image.file_name, "archive upload failed: {e}");
                false
            }
        };

        let record = ImageRecord {
            id: post_id.to_string(),
            file_name: image.file_name.clone(),
            caption,
            tags: post.tags.clone(),
            created_at: Utc::now().timestamp(),
        };
        let recorded = match self.records.insert_image(&record).await {
            Ok(()) => {
                tracing::info!(%post_id, "metadata recorded");
                true
            }
            Err(e) => {
                tracing::error!(%post_id, "metadata insert failed: {e}");
                false
            }
        };

        self.recent.lock().await.insert(post_id);

        Ok(RelayOutcome::Relayed(RelayReport {
            post_id,
            file_name: image.file_name,
            archived,
            recorded,
        }))
    }
}
