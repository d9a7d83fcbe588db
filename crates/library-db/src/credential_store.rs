//! Relational [`CredentialStore`] backed by the `users` table

use chrono::Utc;
use library_auth::{async_trait, Credential, CredentialStore, NewCredential, StoreError};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use tracing::{debug, error};
use uuid::Uuid;

use crate::entities::user;

#[derive(Clone)]
pub struct DbCredentialStore {
    db: DatabaseConnection,
}

impl DbCredentialStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<user::Model> for Credential {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            password_hash: model.password_hash,
            role: model.role,
        }
    }
}

fn backend_error(err: DbErr) -> StoreError {
    error!("Credential store query failed: {}", err);
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl CredentialStore for DbCredentialStore {
    async fn find_by_username_key(
        &self,
        username_key: &str,
    ) -> Result<Option<Credential>, StoreError> {
        let found = user::Entity::find()
            .filter(user::Column::UsernameKey.eq(username_key))
            .one(&self.db)
            .await
            .map_err(backend_error)?;

        Ok(found.map(Credential::from))
    }

    async fn insert(&self, credential: NewCredential) -> Result<Credential, StoreError> {
        let active = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(credential.username),
            username_key: Set(credential.username_key),
            password_hash: Set(credential.password_hash),
            role: Set(credential.role),
            created_at: Set(Utc::now()),
        };

        match active.insert(&self.db).await {
            Ok(model) => Ok(model.into()),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(detail)) => {
                    debug!("Username key already taken: {}", detail);
                    Err(StoreError::Duplicate)
                }
                _ => Err(backend_error(err)),
            },
        }
    }
}
