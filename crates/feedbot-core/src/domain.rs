use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric post id on the image board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Telegram chat id of the target channel (numeric, usually negative).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(pub i64);

/// A single board post, as returned by `post.json`.
///
/// Only the fields the relay needs are modelled; everything else is ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct Post {
    pub id: PostId,
    #[serde(default)]
    pub sample_url: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: String,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub md5: Option<String>,
}

impl Post {
    /// Preferred download URL: the sample rendition, falling back to the original file.
    pub fn image_url(&self) -> Option<&str> {
        [self.sample_url.as_deref(), self.file_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|u| !u.is_empty())
    }

    pub fn image_format(&self) -> ImageFormat {
        self.image_url()
            .map(ImageFormat::from_url)
            .unwrap_or(ImageFormat::Jpeg)
    }

    /// Object key / upload file name: `{id}.{ext}`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.image_format().extension())
    }
}

fn null_as_empty<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Guess the format from the last path segment of a URL. Unknown => JPEG.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let last = path.rsplit('/').next().unwrap_or(path);
        let ext = last
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "png" => Self::Png,
            "gif" => Self::Gif,
            "webp" => Self::Webp,
            _ => Self::Jpeg,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

/// Downloaded image, held in memory for the duration of one tick.
#[derive(Clone, Debug)]
pub struct Image {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: &'static str,
}

impl Image {
    pub fn for_post(post: &Post, bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: post.file_name(),
            content_type: post.image_format().content_type(),
        }
    }
}

/// Metadata row written to the `images` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    pub id: String,
    pub file_name: String,
    pub caption: String,
    pub tags: String,
    pub created_at: i64,
}
