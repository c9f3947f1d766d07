use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::CycleError;
use crate::fetch::{HttpClient, load_source};
use crate::lines::{LineCatalog, LineId};
use crate::parser::{FeedFormat, parse_delayed_lines};
use crate::services::delay_feed::DelayFeed;

/// Pulls the service status document and reduces it to delayed lines.
pub struct SiriFeedClient {
    http: Arc<dyn HttpClient>,
    source: String,
    format: FeedFormat,
    catalog: Arc<LineCatalog>,
}

impl SiriFeedClient {
    /// `source` is an `http(s)` URL or a local file path.
    pub fn new(
        http: Arc<dyn HttpClient>,
        source: impl Into<String>,
        format: FeedFormat,
        catalog: Arc<LineCatalog>,
    ) -> Self {
        Self {
            http,
            source: source.into(),
            format,
            catalog,
        }
    }
}

#[async_trait]
impl DelayFeed for SiriFeedClient {
    #[tracing::instrument(skip(self))]
    async fn fetch_delayed_lines(&self) -> Result<BTreeSet<LineId>, CycleError> {
        let bytes = load_source(self.http.as_ref(), &self.source).await?;
        debug!(source = %self.source, bytes = bytes.len(), "Feed bytes received, parsing");

        let delayed = parse_delayed_lines(&bytes, &self.format, &self.catalog)?;
        debug!(delayed = delayed.len(), "Feed parsed successfully");
        Ok(delayed)
    }
}
