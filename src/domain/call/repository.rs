//! Call record store interface

use crate::domain::call::record::{CallRecord, CallRecordPatch, NewCallRecord};
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::CallId;
use async_trait::async_trait;

/// Port to the durable record store that owns call records.
///
/// Backend failures surface as `DomainError::StoreUnavailable`. `update` on a
/// missing record is `NotFound`; a patch that breaks the lifecycle rules is
/// `InvalidState`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CallRecordStore: Send + Sync {
    /// Find a record by its ID
    async fn get(&self, id: CallId) -> Result<Option<CallRecord>>;

    /// Insert a record, letting the store assign the id
    async fn create(&self, record: NewCallRecord) -> Result<CallRecord>;

    /// Apply a patch and return the updated record
    async fn update(&self, id: CallId, patch: CallRecordPatch) -> Result<CallRecord>;
}
