//! Conversion between stored records and their external representation.
//!
//! [`RecordSerializer`] is the contract every record kind is served through.
//! [`ModelSerializer`] implements it for any [`Record`] by walking the kind's
//! declared fields; [`UsersSerializer`] wraps a `ModelSerializer<Users>` and
//! adds credential hashing.

use std::marker::PhantomData;

use serde_json::Value;

use crate::error::{FieldError, SerializerError, StoreError, ValidationError};
use crate::models::{check_shape, Master, Record, Representation, RoadReport, UserHistory};
use crate::services::RecordStore;

pub mod users;

pub use users::UsersSerializer;

pub type MasterSerializer = ModelSerializer<Master>;
pub type UserHistorySerializer = ModelSerializer<UserHistory>;
pub type RoadReportSerializer = ModelSerializer<RoadReport>;

pub trait RecordSerializer {
    type Record: Record;

    /// Every exposed field of `record`, in declaration order.
    fn to_representation(&self, record: &Self::Record) -> Representation;

    /// Check `data` against the declared shape and domain rules.
    fn validate(&self, data: &Representation) -> Result<Self::Record, ValidationError>;

    /// Validate and persist a new record.
    fn create<S: RecordStore>(
        &self,
        store: &S,
        data: &Representation,
    ) -> Result<Self::Record, SerializerError>;

    /// Replace (`partial == false`) or patch an existing record.
    fn update<S: RecordStore>(
        &self,
        store: &S,
        key: &str,
        data: &Representation,
        partial: bool,
    ) -> Result<Self::Record, SerializerError>;

    fn read<S: RecordStore>(&self, store: &S, key: &str) -> Result<Representation, SerializerError> {
        let record = fetch::<S, Self::Record>(store, key)?;
        Ok(self.to_representation(&record))
    }

    fn list<S: RecordStore>(&self, store: &S) -> Result<Vec<Representation>, SerializerError> {
        Ok(store
            .list::<Self::Record>()?
            .iter()
            .map(|r| self.to_representation(r))
            .collect())
    }

    fn delete<S: RecordStore>(&self, store: &S, key: &str) -> Result<(), SerializerError> {
        let kind = <Self::Record as Record>::KIND;
        if !store.remove::<Self::Record>(key)? {
            return Err(StoreError::NotFound {
                kind,
                key: key.to_string(),
            }
            .into());
        }
        tracing::info!(kind, key, "Record deleted");
        Ok(())
    }
}

/// Load a record or fail with `NotFound`.
pub(crate) fn fetch<S: RecordStore, R: Record>(store: &S, key: &str) -> Result<R, StoreError> {
    store.get::<R>(key)?.ok_or_else(|| StoreError::NotFound {
        kind: R::KIND,
        key: key.to_string(),
    })
}

/// Pass-through serializer exposing every declared field of `R`.
pub struct ModelSerializer<R> {
    _record: PhantomData<fn() -> R>,
}

impl<R> Default for ModelSerializer<R> {
    fn default() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<R> Clone for ModelSerializer<R> {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl<R: Record> ModelSerializer<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing record overlaid with `data`, with the key pinned to `key`.
    ///
    /// `data` is shape-checked on its own first when `partial`, so errors name
    /// only the fields the caller sent.
    pub fn merge_for_update(
        &self,
        existing: &R,
        key_value: Option<Value>,
        data: &Representation,
        partial: bool,
    ) -> Result<Representation, ValidationError> {
        let mut merged = if partial {
            check_shape(R::FIELDS, data, true).map_err(ValidationError::new)?;
            let mut base = self.to_representation(existing);
            for (k, v) in data {
                base.insert(k.clone(), v.clone());
            }
            base
        } else {
            data.clone()
        };
        if let Some(v) = key_value {
            merged.insert(R::KEY_FIELD.to_string(), v);
        }
        Ok(merged)
    }

    /// Reject a natural key that is already taken.
    pub fn check_unique<S: RecordStore>(&self, store: &S, record: &R) -> Result<(), SerializerError> {
        if R::AUTO_KEY {
            return Ok(());
        }
        if let Some(key) = record.key() {
            if store.get::<R>(&key)?.is_some() {
                return Err(already_exists::<R>().into());
            }
        }
        Ok(())
    }

    /// Insert an already validated record.
    pub fn persist<S: RecordStore>(&self, store: &S, record: R) -> Result<R, SerializerError> {
        self.check_unique(store, &record)?;
        let stored = match store.insert(record) {
            Ok(stored) => stored,
            Err(StoreError::Conflict { .. }) => return Err(already_exists::<R>().into()),
            Err(e) => {
                tracing::error!(%e, kind = R::KIND, "Failed to persist record");
                return Err(e.into());
            }
        };
        tracing::info!(kind = R::KIND, key = ?stored.key(), "Record created");
        Ok(stored)
    }
}

fn already_exists<R: Record>() -> ValidationError {
    ValidationError::single(
        R::KEY_FIELD,
        format!("{} with this {} already exists.", R::KIND, R::KEY_FIELD),
    )
}

impl<R: Record> RecordSerializer for ModelSerializer<R> {
    type Record = R;

    /// Record kinds are flat structs of strings, integers and timestamps, so
    /// serde cannot fail here; the empty-map fallback only guards a future
    /// kind that breaks that rule, and is logged at `error`.
    fn to_representation(&self, record: &R) -> Representation {
        match serde_json::to_value(record) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                tracing::error!(kind = R::KIND, value = ?other, "Record did not serialize to an object");
                Representation::new()
            }
            Err(e) => {
                tracing::error!(%e, kind = R::KIND, "Record serialization failed");
                Representation::new()
            }
        }
    }

    fn validate(&self, data: &Representation) -> Result<R, ValidationError> {
        let cleaned = check_shape(R::FIELDS, data, false).map_err(|errors| {
            let err = ValidationError::new(errors);
            tracing::warn!(kind = R::KIND, fields = ?err.fields(), "Validation failed");
            err
        })?;
        let record: R = serde_json::from_value(Value::Object(cleaned)).map_err(|e| {
            ValidationError::new(vec![FieldError::new("non_field_errors", e.to_string())])
        })?;
        let domain_errors = record.clean();
        if !domain_errors.is_empty() {
            tracing::warn!(kind = R::KIND, "Domain validation failed");
            return Err(ValidationError::new(domain_errors));
        }
        Ok(record)
    }

    fn create<S: RecordStore>(&self, store: &S, data: &Representation) -> Result<R, SerializerError> {
        let record = self.validate(data)?;
        self.persist(store, record)
    }

    fn update<S: RecordStore>(
        &self,
        store: &S,
        key: &str,
        data: &Representation,
        partial: bool,
    ) -> Result<R, SerializerError> {
        let existing = fetch::<S, R>(store, key)?;
        let key_value = self.to_representation(&existing).get(R::KEY_FIELD).cloned();
        let merged = self.merge_for_update(&existing, key_value, data, partial)?;
        let record = self.validate(&merged)?;
        store.replace(&record)?;
        tracing::info!(kind = R::KIND, key, partial, "Record updated");
        Ok(record)
    }
}
