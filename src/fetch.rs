//! Bounded streaming download of Apex log bodies.
//!
//! Logs can run to megabytes while the only thing needed is the first
//! `CODE_UNIT_STARTED` line, so the download stops as soon as more than
//! [`BODY_LIMIT`] bytes have arrived and the connection is dropped.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::session::SessionStore;

/// Once the buffer grows past this many bytes the stream is cancelled.
pub const BODY_LIMIT: usize = 1024;

pub const DEFAULT_API_VERSION: &str = "59.0";

/// A response body being received chunk by chunk.
#[async_trait]
pub trait BodyStream: Send {
    /// Next chunk, or `None` when the remote side finished.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Abort the transfer and release the connection.
    fn cancel(&mut self);
}

/// Opens authenticated streaming GETs.
#[async_trait]
pub trait LogTransport: Send + Sync {
    async fn open(&self, url: &str, bearer_token: &str) -> Result<Box<dyn BodyStream>>;
}

/// HTTPS transport over `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpsTransport {
    client: reqwest::Client,
}

impl HttpsTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sflogs/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpsTransport { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        HttpsTransport { client }
    }
}

#[async_trait]
impl LogTransport for HttpsTransport {
    async fn open(&self, url: &str, bearer_token: &str) -> Result<Box<dyn BodyStream>> {
        let response = self.client.get(url).bearer_auth(bearer_token).send().await?;
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "log body request was not successful");
        }
        Ok(Box::new(ResponseBody {
            response: Some(response),
        }))
    }
}

struct ResponseBody {
    response: Option<reqwest::Response>,
}

#[async_trait]
impl BodyStream for ResponseBody {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.response.as_mut() {
            Some(response) => Ok(response.chunk().await?.map(|bytes| bytes.to_vec())),
            None => Ok(None),
        }
    }

    fn cancel(&mut self) {
        // Dropping an unfinished response closes the socket instead of
        // returning it to the pool.
        self.response.take();
    }
}

/// Byte accumulator that reports when it has grown past its limit.
#[derive(Debug)]
pub struct BoundedBuffer {
    buf: Vec<u8>,
    limit: usize,
}

impl BoundedBuffer {
    pub fn new(limit: usize) -> Self {
        BoundedBuffer {
            buf: Vec::with_capacity(limit * 2),
            limit,
        }
    }

    /// Append a whole chunk. Returns `true` once the contents exceed the limit.
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        self.buf.extend_from_slice(chunk);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() > self.limit
    }

    fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Drain `stream` until it ends or the buffer passes `limit`, cancelling the
/// stream in the latter case. The chunk that crosses the limit is kept whole.
pub async fn read_bounded(stream: &mut dyn BodyStream, limit: usize) -> Result<Vec<u8>> {
    let mut buffer = BoundedBuffer::new(limit);
    while let Some(chunk) = stream.next_chunk().await? {
        if buffer.push(&chunk) {
            tracing::debug!(received = buffer.len(), limit, "body limit reached, cancelling");
            stream.cancel();
            break;
        }
    }
    Ok(buffer.into_inner())
}

pub fn log_body_url(instance_url: &str, api_version: &str, log_id: &str) -> String {
    format!("{instance_url}/services/data/v{api_version}/sobjects/ApexLog/{log_id}/Body")
}

pub struct LogBodyFetcher {
    transport: Arc<dyn LogTransport>,
    session: Arc<SessionStore>,
    api_version: String,
}

impl LogBodyFetcher {
    pub fn new(
        transport: Arc<dyn LogTransport>,
        session: Arc<SessionStore>,
        api_version: impl Into<String>,
    ) -> Self {
        LogBodyFetcher {
            transport,
            session,
            api_version: api_version.into(),
        }
    }

    /// The first kilobyte or so of a log. Transport errors are returned as is.
    pub async fn get_log_body(&self, log_id: &str) -> Result<String> {
        let session = self.session.snapshot();
        if !session.is_connected {
            return Err(Error::NotConnected);
        }

        let url = log_body_url(&session.instance_url, &self.api_version, log_id);
        tracing::debug!(%url, "fetching log body");
        let mut stream = self.transport.open(&url, &session.auth_token).await?;
        let bytes = read_bounded(stream.as_mut(), BODY_LIMIT).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Chunks {
        chunks: Vec<Vec<u8>>,
        cancels: usize,
    }

    #[async_trait]
    impl BodyStream for Chunks {
        async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
            if self.chunks.is_empty() {
                Ok(None)
            } else {
                Ok(Some(self.chunks.remove(0)))
            }
        }

        fn cancel(&mut self) {
            self.cancels += 1;
        }
    }

    #[test]
    fn buffer_reports_full_only_past_limit() {
        let mut buffer = BoundedBuffer::new(4);
        assert!(!buffer.push(b"ab"));
        assert!(!buffer.push(b"cd"));
        assert!(buffer.push(b"e"));
        assert_eq!(buffer.into_inner(), b"abcde");
    }

    #[tokio::test]
    async fn exact_limit_does_not_cancel() {
        let mut stream = Chunks {
            chunks: vec![vec![b'x'; 512], vec![b'x'; 512]],
            cancels: 0,
        };
        let body = read_bounded(&mut stream, BODY_LIMIT).await.unwrap();
        assert_eq!(body.len(), 1024);
        assert_eq!(stream.cancels, 0);
    }

    #[tokio::test]
    async fn crossing_chunk_is_kept_whole() {
        let mut stream = Chunks {
            chunks: vec![vec![b'a'; 1000], vec![b'b'; 300], vec![b'c'; 300]],
            cancels: 0,
        };
        let body = read_bounded(&mut stream, BODY_LIMIT).await.unwrap();
        assert_eq!(body.len(), 1300);
        assert_eq!(stream.cancels, 1);
        assert_eq!(stream.chunks.len(), 1);
    }

    #[test]
    fn body_url_is_built_from_parts() {
        assert_eq!(
            log_body_url("https://org.my.salesforce.com", DEFAULT_API_VERSION, "07L1"),
            "https://org.my.salesforce.com/services/data/v59.0/sobjects/ApexLog/07L1/Body"
        );
    }
}
