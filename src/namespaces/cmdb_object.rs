//! Wrapper for the `cmdb.object.*` namespace.

use serde_json::Value;

use crate::client::ApiClient;
use crate::error::IdoitError;
use crate::models::{BatchRequest, CmdbObjectRecord, ObjectCreated, OperationResult, Params};

/// Typed access to single CMDB objects.
pub struct CmdbObject<'a> {
    client: &'a mut ApiClient,
}

impl<'a> CmdbObject<'a> {
    pub(crate) fn new(client: &'a mut ApiClient) -> Self {
        Self { client }
    }

    /// Creates an object and returns its id.
    ///
    /// # Arguments
    ///
    /// * `object_type` - Type constant (e.g. `C__OBJTYPE__SERVER`) or numeric id
    /// * `title` - Object title
    /// * `attributes` - Further attributes such as `purpose` or `cmdb_status`
    ///
    /// # Example
    ///
    /// ```ignore
    /// let id = client
    ///     .cmdb_object()
    ///     .create("C__OBJTYPE__SERVER", "web01", Params::new())
    ///     .await?;
    /// ```
    pub async fn create(
        &mut self,
        object_type: &str,
        title: &str,
        attributes: Params,
    ) -> Result<u64, IdoitError> {
        if object_type.trim().is_empty() {
            return Err(IdoitError::invalid_argument("object type must not be empty"));
        }
        if title.trim().is_empty() {
            return Err(IdoitError::invalid_argument("object title must not be empty"));
        }

        let mut params = attributes;
        params.insert("type".to_string(), Value::String(object_type.to_string()));
        params.insert("title".to_string(), Value::String(title.to_string()));

        let created: ObjectCreated = self.client.request_as("cmdb.object.create", params).await?;
        if !created.success {
            return Err(IdoitError::protocol(format!(
                "i-doit did not confirm creation of object {}: {}",
                created.id,
                created.message.as_deref().unwrap_or("no message")
            )));
        }

        tracing::debug!(id = created.id, "Created CMDB object");
        Ok(created.id)
    }

    /// Reads an object; `None` if it does not exist.
    pub async fn read(&mut self, id: u64) -> Result<Option<CmdbObjectRecord>, IdoitError> {
        validate_id(id)?;
        let result = self.client.request("cmdb.object.read", id_params("id", id)).await?;
        parse_record(result)
    }

    /// Reads several objects in one batch; entries keep the id order.
    pub async fn batch_read(
        &mut self,
        ids: &[u64],
    ) -> Result<Vec<Option<CmdbObjectRecord>>, IdoitError> {
        let requests = ids
            .iter()
            .map(|id| {
                validate_id(*id)?;
                Ok(BatchRequest::new("cmdb.object.read").with_params(id_params("id", *id)))
            })
            .collect::<Result<Vec<_>, IdoitError>>()?;

        self.client
            .batch_request(requests)
            .await?
            .into_iter()
            .map(parse_record)
            .collect()
    }

    /// Updates attributes of an object, e.g. its `title`.
    pub async fn update(&mut self, id: u64, attributes: Params) -> Result<(), IdoitError> {
        validate_id(id)?;
        let mut params = attributes;
        params.insert("id".to_string(), Value::from(id));

        let result: OperationResult = self.client.request_as("cmdb.object.update", params).await?;
        ensure_success(result, "update", id)
    }

    /// Moves an object to the archive.
    pub async fn archive(&mut self, id: u64) -> Result<(), IdoitError> {
        self.change_status("cmdb.object.archive", "archive", id).await
    }

    /// Marks an object as deleted.
    pub async fn delete(&mut self, id: u64) -> Result<(), IdoitError> {
        self.change_status("cmdb.object.delete", "delete", id).await
    }

    /// Removes an object permanently.
    pub async fn purge(&mut self, id: u64) -> Result<(), IdoitError> {
        self.change_status("cmdb.object.purge", "purge", id).await
    }

    async fn change_status(
        &mut self,
        method: &str,
        action: &str,
        id: u64,
    ) -> Result<(), IdoitError> {
        validate_id(id)?;
        let result: OperationResult = self
            .client
            .request_as(method, id_params("object", id))
            .await?;
        ensure_success(result, action, id)
    }
}

fn validate_id(id: u64) -> Result<(), IdoitError> {
    if id == 0 {
        return Err(IdoitError::invalid_argument("object id must be positive"));
    }
    Ok(())
}

fn id_params(key: &str, id: u64) -> Params {
    let mut params = Params::new();
    params.insert(key.to_string(), Value::from(id));
    params
}

/// i-doit answers reads of unknown objects with an empty array.
fn parse_record(result: Value) -> Result<Option<CmdbObjectRecord>, IdoitError> {
    match result {
        Value::Null => Ok(None),
        Value::Array(items) if items.is_empty() => Ok(None),
        other => serde_json::from_value(other).map(Some).map_err(|e| {
            IdoitError::protocol(format!("unexpected result for cmdb.object.read: {}", e))
        }),
    }
}

fn ensure_success(result: OperationResult, action: &str, id: u64) -> Result<(), IdoitError> {
    if result.success {
        tracing::debug!(id = id, action = action, "CMDB object changed");
        return Ok(());
    }
    Err(IdoitError::protocol(format!(
        "i-doit did not confirm {} of object {}: {}",
        action,
        id,
        result.message.as_deref().unwrap_or("no message")
    )))
}
