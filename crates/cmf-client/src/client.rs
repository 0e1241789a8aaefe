//! reqwest-backed CMF client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cmf_core::HttpConfig;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::CmfError;
use crate::models::Page;
use crate::traits::CmfApi;
use crate::Result;

/// Lineage view requested from the lineage endpoints.
const LINEAGE_VIEW: &str = "tangled_tree";

/// Client for one CMF server.
pub struct CmfClient {
    /// HTTP client (connection pool)
    client: Client,
    /// Address as configured, used as the connection identifier
    base_url: String,
    /// Parsed address requests are built from
    base: Url,
    /// Items requested per page on paginated endpoints
    page_size: u32,
    /// Set once `close_session` has run
    closed: AtomicBool,
}

impl CmfClient {
    /// Create a client with default timeouts and page size.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::from_config(base_url, &HttpConfig::default())
    }

    /// Create a client using the given HTTP settings.
    pub fn from_config(base_url: impl Into<String>, http: &HttpConfig) -> Result<Self> {
        let base_url = base_url.into().trim().to_string();
        let base = Url::parse(&base_url)
            .map_err(|e| CmfError::invalid_url(&base_url, e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(CmfError::invalid_url(&base_url, "cannot be used as a base"));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
            .timeout(Duration::from_secs(http.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            base,
            page_size: http.page_size.max(1),
            closed: AtomicBool::new(false),
        })
    }

    /// Whether `close_session` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Build an endpoint URL, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| CmfError::invalid_url(&self.base_url, "cannot be used as a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET an endpoint and decode the JSON body.
    async fn get_json(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Value> {
        if self.is_closed() {
            return Err(CmfError::SessionClosed);
        }

        let url = self.endpoint(segments)?;
        debug!(url = %url, "CMF request");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(CmfError::from_request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CmfError::api(status.as_u16(), body));
        }

        response.json().await.map_err(CmfError::from_request)
    }

    /// GET a paginated endpoint, walking pages until `total_items` is reached.
    ///
    /// A first response without the page shape is returned unchanged. The walk
    /// stops early when a page repeats the previous one, or once as many pages
    /// as `total_items` needs have been read, so a server that ignores `page`
    /// cannot produce duplicates.
    async fn get_all_pages(&self, segments: &[&str]) -> Result<Value> {
        let mut items: Vec<Value> = Vec::new();
        let mut previous: Vec<Value> = Vec::new();
        let mut page_number: u32 = 1;

        loop {
            let query = [
                ("page", page_number.to_string()),
                ("per_page", self.page_size.to_string()),
            ];
            let body = self.get_json(segments, &query).await?;

            let page = match Page::from_value(&body) {
                Some(page) => page,
                None if page_number == 1 => return Ok(body),
                None => {
                    return Err(CmfError::Decode(format!(
                        "page {} of /{} is not a page",
                        page_number,
                        segments.join("/")
                    )))
                }
            };

            let repeated = page_number > 1 && !page.items.is_empty() && page.items == previous;
            if repeated {
                warn!(
                    endpoint = %segments.join("/"),
                    page = page_number,
                    "CMF server repeated a page, stopping pagination"
                );
            }

            let received = page.items.len();
            if !repeated {
                items.extend(page.items.iter().cloned());
            }
            let last_page = u64::from(page_number)
                >= page.total_items.div_ceil(u64::from(self.page_size));

            if repeated || received == 0 || last_page || items.len() as u64 >= page.total_items {
                let total = usize::try_from(page.total_items).unwrap_or(usize::MAX);
                items.truncate(total);
                debug!(
                    endpoint = %segments.join("/"),
                    pages = page_number,
                    items = items.len(),
                    "Collected paginated listing"
                );
                return Ok(Page::merged(page.total_items, items));
            }

            previous = page.items;
            page_number += 1;
        }
    }
}

#[async_trait]
impl CmfApi for CmfClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_pipelines(&self) -> Result<Value> {
        self.get_json(&["display_pipelines"], &[]).await
    }

    async fn get_executions(&self, pipeline: &str) -> Result<Value> {
        self.get_all_pages(&["display_executions", pipeline]).await
    }

    async fn get_list_of_executions(&self, pipeline: &str) -> Result<Value> {
        self.get_json(&["display_list_of_executions", pipeline], &[])
            .await
    }

    async fn get_artifact_types(&self) -> Result<Value> {
        self.get_json(&["display_artifact_types"], &[]).await
    }

    async fn get_artifacts(&self, pipeline: &str, artifact_type: &str) -> Result<Value> {
        self.get_all_pages(&["display_artifacts", pipeline, artifact_type])
            .await
    }

    async fn get_execution_lineage(&self, pipeline: &str, execution_uuid: &str) -> Result<Value> {
        self.get_json(
            &["display_exec_lineage", LINEAGE_VIEW, pipeline, execution_uuid],
            &[],
        )
        .await
    }

    async fn get_artifact_lineage(&self, pipeline: &str) -> Result<Value> {
        self.get_json(&["display_artifact_lineage", LINEAGE_VIEW, pipeline], &[])
            .await
    }

    async fn get_python_env(&self) -> Result<Value> {
        self.get_json(&["display_python_env"], &[]).await
    }

    async fn close_session(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(CmfError::SessionClosed);
        }
        info!(server = %self.base_url, "CMF session closed");
        Ok(())
    }
}
