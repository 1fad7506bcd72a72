use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};

/// Connection settings for a MySQL endpoint.
///
/// The same shape is used for the control connection (catalog and global
/// variable queries) and for the streaming connection; the two usually point
/// at the same server but may target different logical endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct MySqlConnectionConfig {
    pub host: String,
    pub port: u16,
    /// The database to select after connecting.
    pub database: Option<String>,
    pub username: String,
    pub password: Option<SecretString>,
}

impl MySqlConnectionConfig {
    /// Creates MySQL connection options for connecting to the configured
    /// endpoint.
    pub fn with_db(&self) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username);

        if let Some(database) = &self.database {
            options = options.database(database);
        }

        if let Some(password) = &self.password {
            options = options.password(password.expose_secret());
        }

        options
    }
}

/// Connects to the source database with a connection pool.
pub async fn connect_to_source_database(
    config: &MySqlConnectionConfig,
    min_connections: u32,
    max_connections: u32,
) -> Result<MySqlPool, sqlx::Error> {
    let options = config.with_db();

    let pool = MySqlPoolOptions::new()
        .min_connections(min_connections)
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}
