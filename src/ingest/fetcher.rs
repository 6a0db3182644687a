use crate::constants::{OFFSET_PARAM, QUANTITY_PARAM};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Pagination parameters for one request, built fresh from the immutable
/// base parameter set. Nothing is mutated between requests.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    base: BTreeMap<String, String>,
    pub offset: u64,
    pub quantity: u64,
}

impl PageQuery {
    pub fn new(base: &BTreeMap<String, String>, offset: u64, quantity: u64) -> Self {
        Self {
            base: base.clone(),
            offset,
            quantity,
        }
    }

    /// Full parameter list for the request: base parameters followed by the
    /// pagination pair.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .base
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        params.push((OFFSET_PARAM.to_string(), self.offset.to_string()));
        params.push((QUANTITY_PARAM.to_string(), self.quantity.to_string()));
        params
    }
}

/// Port for fetching one page of records from the remote source.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Value>;
}

/// HTTP implementation over the paginated JSON GET interface.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpPageFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Value> {
        let response = self
            .client
            .get(&self.url)
            .query(&query.params())
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Value>().await?)
    }
}
