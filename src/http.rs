#![forbid(unsafe_code)]

//! Blocking HTTP GET capability shared by discovery, resolution and cover
//! downloads.

use std::io::Read;
use std::time::Duration;

use tracing::debug;

use crate::error::FetchError;

/// Upper bound for binary bodies such as cover images.
const MAX_BODY_BYTES: u64 = 32 * 1024 * 1024;

const USER_AGENT: &str = concat!("mediathek-mirror/", env!("CARGO_PKG_VERSION"));

pub trait HttpClient: Send + Sync {
    fn get_text(&self, url: &str) -> Result<String, FetchError>;

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Production client backed by a shared `ureq` agent.
#[derive(Clone)]
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self { agent }
    }

    fn call(&self, url: &str) -> Result<ureq::Response, FetchError> {
        debug!(url, "GET");
        self.agent.get(url).call().map_err(|err| match err {
            ureq::Error::Status(status, _) => FetchError::Status {
                url: url.to_string(),
                status,
            },
            ureq::Error::Transport(transport) => FetchError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            },
        })
    }
}

impl HttpClient for UreqClient {
    fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.call(url)?.into_string().map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        read_limited(self.call(url)?.into_reader(), url, MAX_BODY_BYTES)
    }
}

/// Reads at most `limit` bytes; anything longer is rejected rather than cut.
fn read_limited(reader: impl Read, url: &str, limit: u64) -> Result<Vec<u8>, FetchError> {
    let mut body = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut body)
        .map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;
    if body.len() as u64 > limit {
        return Err(FetchError::TooLarge {
            url: url.to_string(),
            limit,
        });
    }
    Ok(body)
}
