//! Metadata lookup against arXiv.
//!
//! The module is split along the seam the rest of the crate depends on:
//!
//! - [`MetadataSource`]: anything that can turn an identifier into a [`Lookup`]. The dispatcher
//!   only ever sees this trait, so tests substitute an in-process source.
//! - [`ArxivClient`]: the production source, querying the arXiv Atom API over HTTP.
//! - [`Resolver`]: wraps a source with a per-attempt timeout and a [`RetryPolicy`] for transient
//!   failures. A well-formed answer of "no such paper" is [`Lookup::NotFound`] and is never
//!   retried; transport and service failures surface as [`TaggerError`].
//!
//! # Examples
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use tagger::{
//!   paper::Lookup,
//!   retriever::{ArxivClient, Resolver, RetryPolicy},
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ArxivClient::new("https://export.arxiv.org/api/query?id_list={identifier}")?;
//! let resolver = Resolver::new(Arc::new(client))
//!   .with_timeout(Duration::from_secs(10))
//!   .with_retry(RetryPolicy::with_max_attempts(5));
//!
//! match resolver.resolve("1706.03762").await? {
//!   Lookup::Found(record) => println!("{record}"),
//!   Lookup::NotFound => println!("no such paper"),
//! }
//! # Ok(())
//! # }
//! ```

use super::*;
use crate::configuration::Config;

mod retry;
mod xml;

pub use retry::RetryPolicy;

/// A service mapping identifiers to paper metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
  /// Looks up a single identifier.
  ///
  /// Returns [`Lookup::NotFound`] when the service answers but knows no such paper, and an
  /// error when the service could not be asked or its answer could not be read.
  async fn lookup(&self, identifier: &str) -> Result<Lookup>;
}

/// HTTP client for the arXiv query API.
#[derive(Debug, Clone)]
pub struct ArxivClient {
  /// Reusable connection pool
  client:   reqwest::Client,
  /// URL template with an `{identifier}` placeholder
  endpoint: String,
}

impl ArxivClient {
  /// Creates a client for the endpoint template `endpoint`.
  ///
  /// # Errors
  ///
  /// Returns [`TaggerError::Network`] if the HTTP client cannot be initialized.
  pub fn new(endpoint: impl Into<String>) -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { client, endpoint: endpoint.into() })
  }

  /// Creates a client for the endpoint configured in `config`.
  pub fn from_config(config: &Config) -> Result<Self> { Self::new(config.endpoint.clone()) }

  /// The endpoint template.
  pub fn endpoint(&self) -> &str { &self.endpoint }

  /// The query URL for `identifier`.
  fn url_for(&self, identifier: &str) -> String {
    self.endpoint.replace("{identifier}", identifier)
  }
}

#[async_trait]
impl MetadataSource for ArxivClient {
  async fn lookup(&self, identifier: &str) -> Result<Lookup> {
    let url = self.url_for(identifier);
    debug!("Querying {url}");

    let response = self.client.get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
      return Err(TaggerError::HttpStatus(status.as_u16()));
    }
    let data = response.bytes().await?;
    trace!("Received {} bytes for {identifier}", data.len());

    xml::parse_feed(&data)
  }
}

/// A [`MetadataSource`] with a timeout on each attempt and retries on transient failures.
#[derive(Clone)]
pub struct Resolver {
  /// Where records come from
  source:  Arc<dyn MetadataSource>,
  /// When to try again
  retry:   RetryPolicy,
  /// Upper bound on a single attempt
  timeout: Duration,
}

impl Resolver {
  /// Wraps `source` with a 30 second timeout and the default retry policy.
  pub fn new(source: Arc<dyn MetadataSource>) -> Self {
    Self { source, retry: RetryPolicy::default(), timeout: Duration::from_secs(30) }
  }

  /// Wraps `source` with the timeout and attempt budget from `config`.
  pub fn from_config(source: Arc<dyn MetadataSource>, config: &Config) -> Self {
    Self::new(source)
      .with_timeout(config.lookup_timeout())
      .with_retry(RetryPolicy::with_max_attempts(config.lookup_attempts))
  }

  /// Replaces the retry policy.
  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  /// Replaces the per-attempt timeout.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Resolves `identifier`, retrying transient failures.
  ///
  /// # Errors
  ///
  /// The error of the last attempt once retries are exhausted, or the first error that is not
  /// worth retrying. A timed out attempt is [`TaggerError::LookupTimeout`].
  pub async fn resolve(&self, identifier: &str) -> Result<Lookup> {
    let mut attempt = 1;
    loop {
      match self.attempt(identifier).await {
        Ok(lookup) => return Ok(lookup),
        Err(err) => match self.retry.should_retry(&err, attempt) {
          Some(delay) => {
            warn!("Lookup of {identifier} failed (attempt {attempt}): {err}, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
          },
          None => return Err(err),
        },
      }
    }
  }

  /// One lookup bounded by the timeout.
  async fn attempt(&self, identifier: &str) -> Result<Lookup> {
    tokio::time::timeout(self.timeout, self.source.lookup(identifier))
      .await
      .map_err(|_| TaggerError::LookupTimeout(self.timeout))?
  }
}
