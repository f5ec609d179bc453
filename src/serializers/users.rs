use serde_json::Value;

use super::{fetch, ModelSerializer, RecordSerializer};
use crate::error::{SerializerError, StoreError, ValidationError};
use crate::models::users::PASSWORD_FIELD;
use crate::models::{Representation, Users};
use crate::services::{PasswordHasher, Pbkdf2Hasher, RecordStore};

/// Serializer for member accounts.
///
/// `user_pw` is write-only: it is hashed before every store write that carries
/// a new plaintext and never appears in a representation.
#[derive(Clone)]
pub struct UsersSerializer<H = Pbkdf2Hasher> {
    model: ModelSerializer<Users>,
    hasher: H,
}

impl Default for UsersSerializer<Pbkdf2Hasher> {
    fn default() -> Self {
        Self::new(Pbkdf2Hasher::from_env())
    }
}

impl<H: PasswordHasher> UsersSerializer<H> {
    pub fn new(hasher: H) -> Self {
        Self {
            model: ModelSerializer::new(),
            hasher,
        }
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Replace the plaintext in `record.user_pw` with its hash.
    fn hash_password(&self, record: &mut Users) -> Result<(), ValidationError> {
        let plaintext = std::mem::take(&mut record.user_pw);
        record.user_pw = self
            .hasher
            .hash(&plaintext)
            .map_err(|e| ValidationError::single(PASSWORD_FIELD, e.to_string()))?;
        Ok(())
    }

    /// The stored account if `candidate` matches its password.
    pub fn authenticate<S: RecordStore>(
        &self,
        store: &S,
        user_id: &str,
        candidate: &str,
    ) -> Result<Option<Users>, StoreError> {
        let Some(user) = store.get::<Users>(user_id)? else {
            tracing::info!(user_id, "Login for unknown user");
            return Ok(None);
        };
        if self.hasher.verify(&user.user_pw, candidate) {
            Ok(Some(user))
        } else {
            tracing::info!(user_id, "Login with wrong password");
            Ok(None)
        }
    }
}

impl<H: PasswordHasher> RecordSerializer for UsersSerializer<H> {
    type Record = Users;

    fn to_representation(&self, record: &Users) -> Representation {
        self.model
            .to_representation(record)
            .into_iter()
            .filter(|(k, _)| k != PASSWORD_FIELD)
            .collect()
    }

    fn validate(&self, data: &Representation) -> Result<Users, ValidationError> {
        self.model.validate(data)
    }

    fn create<S: RecordStore>(&self, store: &S, data: &Representation) -> Result<Users, SerializerError> {
        let mut record = self.validate(data)?;
        self.model.check_unique(store, &record)?;
        self.hash_password(&mut record)?;
        self.model.persist(store, record)
    }

    /// Re-hashes only when the payload carries a new `user_pw`; otherwise the
    /// stored hash is kept as is.
    fn update<S: RecordStore>(
        &self,
        store: &S,
        key: &str,
        data: &Representation,
        partial: bool,
    ) -> Result<Users, SerializerError> {
        let existing = fetch::<S, Users>(store, key)?;
        let new_password = matches!(data.get(PASSWORD_FIELD), Some(v) if !v.is_null());
        let merged = self.model.merge_for_update(
            &existing,
            Some(Value::String(existing.user_id.clone())),
            data,
            partial,
        )?;
        let mut record = self.model.validate(&merged)?;
        if new_password {
            self.hash_password(&mut record)?;
        } else {
            record.user_pw = existing.user_pw;
        }
        store.replace(&record)?;
        tracing::info!(kind = "users", key, password_changed = new_password, "Record updated");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HashError;
    use crate::services::MemoryStore;
    use serde_json::json;

    struct BrokenHasher;

    impl PasswordHasher for BrokenHasher {
        fn hash(&self, _plaintext: &str) -> Result<String, HashError> {
            Err(HashError::InvalidParameters("unavailable".into()))
        }

        fn verify(&self, _stored: &str, _candidate: &str) -> bool {
            false
        }
    }

    fn serializer() -> UsersSerializer {
        UsersSerializer::new(Pbkdf2Hasher::new(1_000).unwrap())
    }

    fn rep(v: Value) -> Representation {
        v.as_object().cloned().unwrap_or_default()
    }

    fn alice() -> Representation {
        rep(json!({
            "user_id": "alice",
            "user_pw": "secret123",
            "user_name": "Alice",
            "user_age": 30,
            "user_phonenumber": "010-0000-0000"
        }))
    }

    #[test]
    fn representation_never_contains_password() {
        let store = MemoryStore::new();
        let s = serializer();
        let created = s.create(&store, &alice()).unwrap();
        assert!(s.to_representation(&created).get("user_pw").is_none());
        assert!(s.read(&store, "alice").unwrap().get("user_pw").is_none());
    }

    #[test]
    fn partial_update_without_password_keeps_hash() {
        let store = MemoryStore::new();
        let s = serializer();
        let created = s.create(&store, &alice()).unwrap();
        let updated = s
            .update(&store, "alice", &rep(json!({"user_name": "Alice K"})), true)
            .unwrap();
        assert_eq!(updated.user_pw, created.user_pw);
        assert!(s.hasher().verify(&updated.user_pw, "secret123"));
    }

    #[test]
    fn update_with_new_password_rehashes() {
        let store = MemoryStore::new();
        let s = serializer();
        s.create(&store, &alice()).unwrap();
        let updated = s
            .update(&store, "alice", &rep(json!({"user_pw": "n3w-pass"})), true)
            .unwrap();
        assert_ne!(updated.user_pw, "n3w-pass");
        assert!(s.hasher().verify(&updated.user_pw, "n3w-pass"));
        assert!(!s.hasher().verify(&updated.user_pw, "secret123"));
    }

    #[test]
    fn blank_password_on_update_is_rejected() {
        let store = MemoryStore::new();
        let s = serializer();
        s.create(&store, &alice()).unwrap();
        let err = s
            .update(&store, "alice", &rep(json!({"user_pw": ""})), true)
            .unwrap_err();
        assert!(err.as_validation().unwrap().has_field("user_pw"));
    }

    #[test]
    fn hash_failure_aborts_create() {
        let store = MemoryStore::new();
        let s = UsersSerializer::new(BrokenHasher);
        let err = s.create(&store, &alice()).unwrap_err();
        let v = err.as_validation().expect("validation error");
        assert_eq!(v.fields(), vec!["user_pw"]);
        assert!(store.list::<Users>().unwrap().is_empty());
    }

    #[test]
    fn full_update_requires_and_rehashes_password() {
        let store = MemoryStore::new();
        let s = serializer();
        let created = s.create(&store, &alice()).unwrap();

        let mut without_pw = alice();
        without_pw.remove("user_pw");
        let err = s.update(&store, "alice", &without_pw, false).unwrap_err();
        assert!(err.as_validation().unwrap().has_field("user_pw"));
        let unchanged: Users = store.get("alice").unwrap().unwrap();
        assert_eq!(unchanged.user_pw, created.user_pw);

        let mut replacement = alice();
        replacement.insert("user_pw".into(), json!("brand-new"));
        replacement.insert("user_name".into(), json!("Alice Kim"));
        let updated = s.update(&store, "alice", &replacement, false).unwrap();
        assert_eq!(updated.user_name, "Alice Kim");
        assert_ne!(updated.user_pw, "brand-new");
        assert!(s.hasher().verify(&updated.user_pw, "brand-new"));
        let stored: Users = store.get("alice").unwrap().unwrap();
        assert_eq!(stored.user_pw, updated.user_pw);
    }

    #[test]
    fn authenticate_checks_the_stored_hash() {
        let store = MemoryStore::new();
        let s = serializer();
        s.create(&store, &alice()).unwrap();
        assert!(s.authenticate(&store, "alice", "secret123").unwrap().is_some());
        assert!(s.authenticate(&store, "alice", "wrong").unwrap().is_none());
        assert!(s.authenticate(&store, "bob", "secret123").unwrap().is_none());
    }
}
