use chrono::Utc;
use futures_util::stream::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document},
    error::{ErrorKind, WriteFailure},
    options::ReturnDocument,
    Collection,
};

use super::models::{Allergen, Child, Parent};
use crate::error::{AppError, Result};

const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write_error)) if write_error.code == DUPLICATE_KEY
    )
}

fn inserted_id(result: mongodb::results::InsertOneResult) -> Result<ObjectId> {
    result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::Internal("inserted document has no ObjectId".to_string()))
}

/// Adds the `updated_at` stamp to a partial update.
fn touch(mut changes: Document) -> Result<Document> {
    let now = bson::to_bson(&Utc::now())
        .map_err(|e| AppError::Internal(format!("failed to encode timestamp: {}", e)))?;
    changes.insert("updated_at", now);
    Ok(doc! { "$set": changes })
}

#[derive(Clone)]
pub struct ParentRepository {
    collection: Collection<Parent>,
}

impl ParentRepository {
    pub(crate) fn new(collection: Collection<Parent>) -> Self {
        Self { collection }
    }

    pub async fn insert(&self, mut parent: Parent) -> Result<Parent> {
        let result = self.collection.insert_one(&parent).await.map_err(|err| {
            if is_duplicate_key(&err) {
                AppError::Conflict(format!("username '{}' is already taken", parent.username))
            } else {
                AppError::Database(err)
            }
        })?;

        parent.id = Some(inserted_id(result)?);
        Ok(parent)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Parent>> {
        let parent = self
            .collection
            .find_one(doc! { "username": username })
            .await?;
        Ok(parent)
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Parent>> {
        let parent = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(parent)
    }
}

#[derive(Clone)]
pub struct ChildRepository {
    collection: Collection<Child>,
}

impl ChildRepository {
    pub(crate) fn new(collection: Collection<Child>) -> Self {
        Self { collection }
    }

    pub async fn insert(&self, mut child: Child) -> Result<Child> {
        let result = self.collection.insert_one(&child).await?;
        child.id = Some(inserted_id(result)?);
        Ok(child)
    }

    pub async fn list_for_parent(&self, parent_id: &ObjectId) -> Result<Vec<Child>> {
        let mut cursor = self
            .collection
            .find(doc! { "parent_id": parent_id })
            .sort(doc! { "created_at": 1 })
            .await?;

        let mut children = Vec::new();
        while let Some(child) = cursor.try_next().await? {
            children.push(child);
        }

        Ok(children)
    }

    pub async fn find_owned(&self, id: &ObjectId, parent_id: &ObjectId) -> Result<Option<Child>> {
        let child = self
            .collection
            .find_one(doc! { "_id": id, "parent_id": parent_id })
            .await?;
        Ok(child)
    }

    pub async fn update_owned(
        &self,
        id: &ObjectId,
        parent_id: &ObjectId,
        changes: Document,
    ) -> Result<Option<Child>> {
        let child = self
            .collection
            .find_one_and_update(doc! { "_id": id, "parent_id": parent_id }, touch(changes)?)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(child)
    }

    pub async fn delete_owned(&self, id: &ObjectId, parent_id: &ObjectId) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id, "parent_id": parent_id })
            .await?;
        Ok(result.deleted_count > 0)
    }
}

#[derive(Clone)]
pub struct AllergenRepository {
    collection: Collection<Allergen>,
}

impl AllergenRepository {
    pub(crate) fn new(collection: Collection<Allergen>) -> Self {
        Self { collection }
    }

    pub async fn insert(&self, mut allergen: Allergen) -> Result<Allergen> {
        let result = self.collection.insert_one(&allergen).await?;
        allergen.id = Some(inserted_id(result)?);
        Ok(allergen)
    }

    pub async fn list_for_parent(
        &self,
        parent_id: &ObjectId,
        child_id: Option<&ObjectId>,
    ) -> Result<Vec<Allergen>> {
        let mut filter = doc! { "parent_id": parent_id };
        if let Some(child_id) = child_id {
            filter.insert("child_id", child_id);
        }

        let mut cursor = self
            .collection
            .find(filter)
            .sort(doc! { "name": 1 })
            .await?;

        let mut allergens = Vec::new();
        while let Some(allergen) = cursor.try_next().await? {
            allergens.push(allergen);
        }

        Ok(allergens)
    }

    pub async fn find_owned(
        &self,
        id: &ObjectId,
        parent_id: &ObjectId,
    ) -> Result<Option<Allergen>> {
        let allergen = self
            .collection
            .find_one(doc! { "_id": id, "parent_id": parent_id })
            .await?;
        Ok(allergen)
    }

    pub async fn update_owned(
        &self,
        id: &ObjectId,
        parent_id: &ObjectId,
        changes: Document,
    ) -> Result<Option<Allergen>> {
        let allergen = self
            .collection
            .find_one_and_update(doc! { "_id": id, "parent_id": parent_id }, touch(changes)?)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(allergen)
    }

    pub async fn delete_owned(&self, id: &ObjectId, parent_id: &ObjectId) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id, "parent_id": parent_id })
            .await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn delete_for_child(&self, child_id: &ObjectId) -> Result<u64> {
        let result = self
            .collection
            .delete_many(doc! { "child_id": child_id })
            .await?;
        Ok(result.deleted_count)
    }
}
