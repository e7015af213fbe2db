use std::marker::PhantomData;

use bson::{Document, deserialize_from_document, doc, serialize_to_document};
use futures_util::TryStreamExt;
use mongodb::Collection;
use serde::{Serialize, de::DeserializeOwned};

use crate::prelude::*;

/// Report that is stored as a whole document under its natural key.
pub trait StoredReport: Send + Sync + Serialize + DeserializeOwned {
    const COLLECTION_NAME: &str;

    /// Sort order of the range queries.
    fn sort() -> Document;

    /// Equality filter on the natural key.
    fn key_filter(&self) -> Document;
}

/// Collection of whole-document reports.
#[must_use]
pub struct Reports<R>(Collection<Document>, PhantomData<R>);

impl<R: StoredReport> Reports<R> {
    pub(super) const fn new(collection: Collection<Document>) -> Self {
        Self(collection, PhantomData)
    }

    /// Replace the report fields, keeping the creation timestamp.
    #[instrument(skip_all, fields(collection_name = R::COLLECTION_NAME))]
    pub async fn upsert(&self, report: &R) -> Result {
        let filter = report.key_filter();
        debug!(?filter, "upserting…");
        let update = doc! {
            "$set": serialize_to_document(report)?,
            "$setOnInsert": { "createdAt": bson::DateTime::now() },
        };
        self.0
            .update_one(filter, update)
            .upsert(true)
            .await
            .with_context(|| format!("failed to upsert into `{}`", R::COLLECTION_NAME))?;
        Ok(())
    }

    #[instrument(skip_all, fields(collection_name = R::COLLECTION_NAME))]
    pub async fn find(&self, filter: Document) -> Result<Vec<R>> {
        self.0
            .find(filter)
            .sort(R::sort())
            .await
            .with_context(|| format!("failed to query `{}`", R::COLLECTION_NAME))?
            .map_err(Error::from)
            .and_then(|document| async move { Ok(deserialize_from_document::<R>(document)?) })
            .try_collect()
            .await
    }

    #[instrument(skip_all, fields(collection_name = R::COLLECTION_NAME))]
    pub async fn delete_many(&self, filter: Document) -> Result<u64> {
        let result = self
            .0
            .delete_many(filter)
            .await
            .with_context(|| format!("failed to delete from `{}`", R::COLLECTION_NAME))?;
        info!(deleted_count = result.deleted_count, "deleted");
        Ok(result.deleted_count)
    }
}
