use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("SURREALDB_URL")
                .unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("SURREALDB_NAMESPACE")
                .unwrap_or_else(|_| "uic".to_string()),
            database: env::var("SURREALDB_DATABASE")
                .unwrap_or_else(|_| "sso".to_string()),
            username: env::var("SURREALDB_USERNAME").ok(),
            password: env::var("SURREALDB_PASSWORD").ok(),
        }
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    let db = surrealdb::engine::any::connect(config.url).await?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

/// Define the `user` and `login_session` tables.
///
/// The unique index on `user.name` is what keeps concurrent auto-provisioning
/// of the same principal down to a single row.
pub async fn ensure_schema(db: &Db) -> Result<()> {
    let schema_queries = [
        "DEFINE TABLE IF NOT EXISTS user SCHEMAFULL;
         DEFINE FIELD IF NOT EXISTS name ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS passwd ON TABLE user TYPE string DEFAULT '';
         DEFINE FIELD IF NOT EXISTS email ON TABLE user TYPE string DEFAULT '';
         DEFINE FIELD IF NOT EXISTS role ON TABLE user TYPE string DEFAULT 'deny';
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE user TYPE datetime DEFAULT time::now();
         DEFINE FIELD IF NOT EXISTS updated_at ON TABLE user TYPE datetime VALUE time::now();",

        "DEFINE TABLE IF NOT EXISTS login_session SCHEMAFULL;
         DEFINE FIELD IF NOT EXISTS uid ON TABLE login_session TYPE record<user>;
         DEFINE FIELD IF NOT EXISTS sig ON TABLE login_session TYPE string;
         DEFINE FIELD IF NOT EXISTS expired ON TABLE login_session TYPE int;",

        "DEFINE INDEX IF NOT EXISTS user_name ON TABLE user COLUMNS name UNIQUE;
         DEFINE INDEX IF NOT EXISTS login_session_uid ON TABLE login_session COLUMNS uid;",
    ];

    for query in schema_queries {
        db.query(query).await?.check()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let db = create_connection(DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

        ensure_schema(&db).await.unwrap();
        ensure_schema(&db).await.unwrap();
    }
}
