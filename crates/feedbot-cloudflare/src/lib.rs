//! Cloudflare adapters: R2 object storage (S3 API) and D1 (REST API).

pub mod d1;
pub mod r2;
pub mod sigv4;

pub use d1::{D1Client, D1Config};
pub use r2::{R2Client, R2Config};
