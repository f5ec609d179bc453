//! Record serialization for the Dorosee road-damage service.
//!
//! Four record kinds ([`models::Users`], [`models::Master`],
//! [`models::UserHistory`], [`models::RoadReport`]) are converted to and from a
//! JSON field map by the serializers in [`serializers`], validated against
//! each kind's declared fields, and persisted through a
//! [`services::RecordStore`]. Member passwords are hashed with PBKDF2 before
//! they are stored and are never emitted again.

pub mod config;
pub mod error;
pub mod models;
pub mod serializers;
pub mod services;

pub use error::{FieldError, HashError, SerializerError, StoreError, ValidationError};
pub use models::{Record, Representation};
pub use serializers::{
    MasterSerializer, ModelSerializer, RecordSerializer, RoadReportSerializer,
    UserHistorySerializer, UsersSerializer,
};
