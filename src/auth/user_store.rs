//! User storage and find-or-create provisioning.

use anyhow::Result;
use surrealdb::RecordId;
use tracing::{debug, info, warn};

use crate::db::{Db, Role, UserCreate, UserRecord};

/// User store for database operations.
///
/// This is the only writer of user fields: directory and third-party logins
/// go through [`UserStore::find_or_create`] and [`UserStore::backfill_if_unset`],
/// local registration through [`UserStore::create_user`].
#[derive(Clone)]
pub struct UserStore {
    db: Db,
}

impl UserStore {
    /// Create a new user store.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Get or create a user by name.
    ///
    /// New users get the given password hash and email and the default role.
    /// A concurrent create of the same name loses on the unique index and
    /// falls back to reading the winner's row.
    pub async fn find_or_create(&self, name: &str, passwd: &str, email: &str) -> Result<UserRecord> {
        if let Some(user) = self.get_user_by_name(name).await? {
            return Ok(user);
        }

        let create = UserCreate {
            name: name.to_string(),
            passwd: passwd.to_string(),
            email: email.to_string(),
            role: Role::default(),
        };

        match self.create_user(&create).await {
            Ok(user) => {
                info!("Provisioned user {} ({})", user.name, user.id);
                Ok(user)
            }
            Err(create_err) => {
                debug!("Create of user {} failed, re-reading: {}", name, create_err);
                match self.get_user_by_name(name).await? {
                    Some(user) => Ok(user),
                    None => {
                        warn!("Failed to provision user {}: {}", name, create_err);
                        Err(create_err)
                    }
                }
            }
        }
    }

    /// Copy email and role onto a user that has no local password.
    ///
    /// Users that own a local credential keep their assigned role and email;
    /// the record is returned unchanged.
    pub async fn backfill_if_unset(
        &self,
        user: &UserRecord,
        email: &str,
        role: Role,
    ) -> Result<UserRecord> {
        if user.has_local_password() {
            debug!("User {} has a local password, skipping backfill", user.name);
            return Ok(user.clone());
        }

        let query = r#"
            UPDATE $id SET
                email = $email,
                role = $role
        "#;

        let mut res = self.db
            .query(query)
            .bind(("id", user.id.clone()))
            .bind(("email", email.to_string()))
            .bind(("role", role))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        users.into_iter().next()
            .ok_or_else(|| anyhow::anyhow!("Failed to update user {}", user.name))
    }

    /// Get a user by name.
    pub async fn get_user_by_name(&self, name: &str) -> Result<Option<UserRecord>> {
        let query = "SELECT * FROM user WHERE name = $name LIMIT 1";

        let mut res = self.db
            .query(query)
            .bind(("name", name.to_string()))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Get a user by database ID.
    pub async fn get_user_by_id(&self, user_id: &RecordId) -> Result<Option<UserRecord>> {
        let query = "SELECT * FROM user WHERE id = $id LIMIT 1";

        let mut res = self.db
            .query(query)
            .bind(("id", user_id.clone()))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Create a new user. Fails if the name is already taken.
    pub async fn create_user(&self, create: &UserCreate) -> Result<UserRecord> {
        let query = r#"
            CREATE user CONTENT {
                name: $name,
                passwd: $passwd,
                email: $email,
                role: $role
            }
        "#;

        let mut res = self.db
            .query(query)
            .bind(("name", create.name.clone()))
            .bind(("passwd", create.passwd.clone()))
            .bind(("email", create.email.clone()))
            .bind(("role", create.role))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        users.into_iter().next()
            .ok_or_else(|| anyhow::anyhow!("Failed to create user {}", create.name))
    }

    /// Number of rows stored under `name`.
    #[cfg(test)]
    pub async fn count_by_name(&self, name: &str) -> Result<usize> {
        let query = "SELECT * FROM user WHERE name = $name";

        let mut res = self.db
            .query(query)
            .bind(("name", name.to_string()))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.len())
    }
}
