//! Store connection management using sqlx
//!
//! A run owns exactly one `PgConnection`. It is opened by [`connect`] and
//! consumed by [`close`]; everything in between borrows it mutably.

use crate::error::{EtlError, Result};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use std::fmt;
use std::str::FromStr;
use tracing::{error, info, warn};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_DATABASE: &str = "postgres";
const DEFAULT_USER: &str = "postgres";

/// Connection parameters for the relational store
#[derive(Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    /// Full connection URL; takes precedence over the discrete fields
    pub url: Option<String>,
    /// Schema to create and read tables in, instead of the server default
    pub schema: Option<String>,
}

impl StoreConfig {
    pub fn new(host: impl Into<String>, port: u16, database: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            user: user.into(),
            password: None,
            url: None,
            schema: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Read `DATABASE_URL` or the standard `PG*` variables from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PGPORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| EtlError::Config(format!("PGPORT is not a valid port: '{}'", raw)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: lookup("PGHOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            database: lookup("PGDATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            user: lookup("PGUSER").unwrap_or_else(|| DEFAULT_USER.to_string()),
            password: lookup("PGPASSWORD"),
            url: lookup("DATABASE_URL").filter(|u| !u.trim().is_empty()),
            schema: lookup("DATABASE_SCHEMA").filter(|s| !s.trim().is_empty()),
        })
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        let mut options = match &self.url {
            Some(url) => PgConnectOptions::from_str(url)
                .map_err(|e| EtlError::Config(format!("Invalid DATABASE_URL: {}", e)))?,
            None => {
                let options = PgConnectOptions::new()
                    .host(&self.host)
                    .port(self.port)
                    .database(&self.database)
                    .username(&self.user);
                match &self.password {
                    Some(password) => options.password(password),
                    None => options,
                }
            }
        };
        if let Some(schema) = &self.schema {
            options = options.options([("search_path", schema.as_str())]);
        }
        Ok(options)
    }

    /// `host:port/database` for log lines; never includes credentials
    pub fn target(&self) -> String {
        match &self.url {
            Some(url) => url
                .rsplit('@')
                .next()
                .unwrap_or("database")
                .to_string(),
            None => format!("{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("target", &self.target())
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("schema", &self.schema)
            .finish()
    }
}

/// Open the run's single store connection
pub async fn connect(config: &StoreConfig) -> Result<PgConnection> {
    let options = config.connect_options()?;

    let mut conn = match PgConnection::connect_with(&options).await {
        Ok(conn) => conn,
        Err(e) => {
            error!(target_db = %config.target(), error = %e, "Database connection failed");
            return Err(EtlError::Connection(e));
        }
    };

    // Credentials can be accepted lazily by poolers; make sure a query goes through
    if let Err(e) = sqlx::query("SELECT 1").execute(&mut conn).await {
        error!(target_db = %config.target(), error = %e, "Database connection failed");
        return Err(EtlError::Connection(e));
    }

    info!(target_db = %config.target(), "Database connection successful");
    Ok(conn)
}

/// Release the connection. Close errors are logged, never propagated.
pub async fn close(conn: PgConnection) {
    match conn.close().await {
        Ok(()) => info!("Database connection closed"),
        Err(e) => warn!(error = %e, "Database connection closed with error"),
    }
}
