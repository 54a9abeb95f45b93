/// Core error type.
///
/// Adapter crates map their specific errors into this type so the relay loop
/// can log failures consistently and keep going.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http {status}: {body}")]
    Http { status: u16, body: String },

    #[error("source error: {0}")]
    Source(String),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Build an `Http` error, keeping only the head of the response body.
    pub fn http(status: u16, body: &str) -> Self {
        Self::Http {
            status,
            body: truncate_chars(body, 200),
        }
    }
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_truncates_body() {
        let body = "x".repeat(500);
        let Error::Http { status, body } = Error::http(502, &body) else {
            panic!("expected http error");
        };
        assert_eq!(status, 502);
        assert_eq!(body.len(), 200);
    }
}
