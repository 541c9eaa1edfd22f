//! Wrapper for the `idoit.*` namespace.

use serde_json::{Map, Value};

use crate::client::ApiClient;
use crate::error::IdoitError;
use crate::models::{BatchRequest, Params, SearchResult, Version};

/// Typed access to `idoit.version`, `idoit.constants` and `idoit.search`.
pub struct Idoit<'a> {
    client: &'a mut ApiClient,
}

impl<'a> Idoit<'a> {
    pub(crate) fn new(client: &'a mut ApiClient) -> Self {
        Self { client }
    }

    /// Reads product version, edition and the authenticated user.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let version = client.idoit().read_version().await?;
    /// println!("i-doit {}", version.display());
    /// ```
    pub async fn read_version(&mut self) -> Result<Version, IdoitError> {
        self.client.request_as("idoit.version", Params::new()).await
    }

    /// Reads object types, categories and record status constants.
    pub async fn read_constants(&mut self) -> Result<Map<String, Value>, IdoitError> {
        self.client.request_as("idoit.constants", Params::new()).await
    }

    /// Runs a full-text search.
    ///
    /// # Errors
    ///
    /// Returns `IdoitError::InvalidArgument` for a blank query.
    pub async fn search(&mut self, query: &str) -> Result<Vec<SearchResult>, IdoitError> {
        validate_query(query)?;
        self.client
            .request_as("idoit.search", search_params(query))
            .await
    }

    /// Runs several searches in one batch; results keep the query order.
    ///
    /// # Errors
    ///
    /// Returns `IdoitError::InvalidArgument` if any query is blank.
    pub async fn batch_search(
        &mut self,
        queries: &[&str],
    ) -> Result<Vec<Vec<SearchResult>>, IdoitError> {
        let requests = queries
            .iter()
            .map(|query| {
                validate_query(query)?;
                Ok(BatchRequest::new("idoit.search").with_params(search_params(query)))
            })
            .collect::<Result<Vec<_>, IdoitError>>()?;

        self.client
            .batch_request(requests)
            .await?
            .into_iter()
            .map(|result| {
                serde_json::from_value(result).map_err(|e| {
                    IdoitError::protocol(format!("unexpected result for idoit.search: {}", e))
                })
            })
            .collect()
    }
}

fn validate_query(query: &str) -> Result<(), IdoitError> {
    if query.trim().is_empty() {
        return Err(IdoitError::invalid_argument("search query must not be empty"));
    }
    Ok(())
}

fn search_params(query: &str) -> Params {
    let mut params = Params::new();
    params.insert("q".to_string(), Value::String(query.to_string()));
    params
}
