use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ReturnDocument;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::store::path::OWNERS_ROOT;
use crate::store::{generate_key, DocumentStore, StorePath};

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB implementation of the DocumentStore.
///
/// Each owner is one document in the `owners` collection, keyed by `_id`.
/// Everything below `owners/{ownerId}` maps to a dotted field path inside
/// that document, so single-owner updates are atomic.
pub struct MongoDocumentStore {
    collection: mongodb::Collection<Document>,
}

impl MongoDocumentStore {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection(OWNERS_ROOT),
        }
    }
}

/// Where a path lands in MongoDB.
enum Target<'a> {
    /// The whole collection.
    All,
    /// One owner document.
    Owner(&'a str),
    /// A (possibly nested) field of an owner document.
    Field { owner: &'a str, field: String },
}

fn target(path: &StorePath) -> Result<Target<'_>, AppError> {
    match path.segments() {
        [root] if root == OWNERS_ROOT => Ok(Target::All),
        [root, owner] if root == OWNERS_ROOT => Ok(Target::Owner(owner)),
        [root, owner, rest @ ..] if root == OWNERS_ROOT => Ok(Target::Field {
            owner,
            field: rest.join("."),
        }),
        _ => Err(AppError::Validation(format!(
            "Path '{path}' is outside the '{OWNERS_ROOT}' tree"
        ))),
    }
}

fn db_err(e: mongodb::error::Error) -> AppError {
    AppError::Store(e.to_string())
}

fn to_bson(value: Value) -> Result<Bson, AppError> {
    mongodb::bson::to_bson(&value).map_err(|e| AppError::Internal(format!("BSON encoding: {e}")))
}

/// Owner document without its `_id`, as plain JSON.
fn owner_json(mut doc: Document) -> Value {
    doc.remove("_id");
    Bson::Document(doc).into_relaxed_extjson()
}

fn field<'a>(doc: &'a Document, dotted: &str) -> Option<&'a Bson> {
    let mut parts = dotted.split('.');
    let first = doc.get(parts.next()?)?;
    parts.try_fold(first, |node, part| match node {
        Bson::Document(inner) => inner.get(part),
        _ => None,
    })
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn read(&self, path: &StorePath) -> Result<Option<Value>, AppError> {
        match target(path)? {
            Target::All => {
                let mut cursor = self.collection.find(doc! {}).await.map_err(db_err)?;
                let mut owners = Map::new();
                while let Some(doc) = cursor.try_next().await.map_err(db_err)? {
                    let Some(id) = doc.get_str("_id").ok().map(str::to_string) else {
                        tracing::warn!("Skipping owner document with a non-string _id");
                        continue;
                    };
                    owners.insert(id, owner_json(doc));
                }
                Ok((!owners.is_empty()).then_some(Value::Object(owners)))
            }
            Target::Owner(owner) => {
                let doc = self
                    .collection
                    .find_one(doc! { "_id": owner })
                    .await
                    .map_err(db_err)?;
                Ok(doc.map(owner_json))
            }
            Target::Field { owner, field: dotted } => {
                let doc = self
                    .collection
                    .find_one(doc! { "_id": owner })
                    .projection(doc! { dotted.as_str(): 1 })
                    .await
                    .map_err(db_err)?;
                Ok(doc
                    .as_ref()
                    .and_then(|d| field(d, &dotted))
                    .filter(|b| !matches!(b, Bson::Null))
                    .map(|b| b.clone().into_relaxed_extjson()))
            }
        }
    }

    async fn write(&self, path: &StorePath, value: Value) -> Result<(), AppError> {
        match target(path)? {
            Target::All => Err(AppError::Validation(
                "Refusing to replace the whole owners collection".into(),
            )),
            Target::Owner(owner) => {
                if value.is_null() {
                    self.collection
                        .delete_one(doc! { "_id": owner })
                        .await
                        .map_err(db_err)?;
                    return Ok(());
                }
                let Bson::Document(mut replacement) = to_bson(value)? else {
                    return Err(AppError::Validation(format!(
                        "Owner '{owner}' must be written as an object"
                    )));
                };
                replacement.insert("_id", owner);
                self.collection
                    .replace_one(doc! { "_id": owner }, replacement)
                    .upsert(true)
                    .await
                    .map_err(db_err)?;
                Ok(())
            }
            Target::Field { owner, field: dotted } => {
                let update = if value.is_null() {
                    doc! { "$unset": { dotted.as_str(): "" } }
                } else {
                    doc! { "$set": { dotted.as_str(): to_bson(value)? } }
                };
                self.collection
                    .update_one(doc! { "_id": owner }, update)
                    .upsert(true)
                    .await
                    .map_err(db_err)?;
                Ok(())
            }
        }
    }

    async fn append(&self, path: &StorePath, value: Value) -> Result<String, AppError> {
        let key = generate_key();
        self.write(&path.child(&key)?, value).await?;
        Ok(key)
    }

    async fn increment(&self, path: &StorePath, delta: i64) -> Result<i64, AppError> {
        let Target::Field { owner, field: dotted } = target(path)? else {
            return Err(AppError::Validation(format!(
                "Cannot increment '{path}': not a field path"
            )));
        };
        let updated = self
            .collection
            .find_one_and_update(
                doc! { "_id": owner },
                doc! { "$inc": { dotted.as_str(): delta } },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::Store(format!("No document returned for '{path}'")))?;

        match field(&updated, &dotted) {
            Some(Bson::Int32(n)) => Ok(i64::from(*n)),
            Some(Bson::Int64(n)) => Ok(*n),
            Some(Bson::Double(n)) => Ok(*n as i64),
            other => Err(AppError::Store(format!(
                "Counter at '{path}' has unexpected value {other:?}"
            ))),
        }
    }

    async fn create_if_absent(&self, path: &StorePath, value: Value) -> Result<bool, AppError> {
        let Target::Field { owner, field: dotted } = target(path)? else {
            return Err(AppError::Validation(format!(
                "Cannot create '{path}': not a field path"
            )));
        };
        // When the field exists the filter misses and the upsert collides on _id.
        let result = self
            .collection
            .update_one(
                doc! { "_id": owner, dotted.as_str(): { "$exists": false } },
                doc! { "$set": { dotted.as_str(): to_bson(value)? } },
            )
            .upsert(true)
            .await;

        match result {
            Ok(outcome) => Ok(outcome.modified_count > 0 || outcome.upserted_id.is_some()),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(db_err(e)),
        }
    }
}
