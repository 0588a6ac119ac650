//! Connection settings from command-line flags and the environment.
//!
//! A `.env` file in the current directory (or any parent) is loaded before
//! flags are parsed, so `PGHOST`, `PGUSER`, `PGPASSWORD_<DB>_<USER>` and
//! friends can live there.

use clap::Args;
use pgshape::{Channel, Endpoint};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Load `.env`, if there is one, returning its path.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => Some(path),
        Err(e) if e.not_found() => None,
        Err(e) => {
            eprintln!("warning: ignoring .env: {}", e);
            None
        }
    }
}

/// How to reach a database.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ConnectionArgs {
    /// Database host
    #[arg(long, env = "PGHOST", default_value = "localhost")]
    pub host: String,

    /// Database port
    #[arg(long, env = "PGPORT", default_value_t = 5432)]
    pub port: u16,

    /// Database user
    #[arg(long, env = "PGUSER")]
    pub user: String,

    /// Database name
    #[arg(long, env = "PGDATABASE")]
    pub dbname: String,

    /// Password; defaults to the value of PGPASSWORD_<DBNAME>_<USER>
    #[arg(long)]
    pub password: Option<String>,
}

/// Overrides for the destination side of `compare`. Unset flags fall back
/// to the source connection.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationArgs {
    /// Destination database host
    #[arg(long)]
    pub dst_host: Option<String>,

    /// Destination database port
    #[arg(long)]
    pub dst_port: Option<u16>,

    /// Destination database user
    #[arg(long)]
    pub dst_user: Option<String>,

    /// Destination database name
    #[arg(long)]
    pub dst_dbname: Option<String>,

    /// Destination password
    #[arg(long)]
    pub dst_password: Option<String>,
}

impl DestinationArgs {
    /// The source password is only reused when user and database are too.
    pub fn apply(&self, source: &ConnectionArgs) -> ConnectionArgs {
        let same_login = self.dst_user.is_none() && self.dst_dbname.is_none();
        ConnectionArgs {
            host: self.dst_host.clone().unwrap_or_else(|| source.host.clone()),
            port: self.dst_port.unwrap_or(source.port),
            user: self.dst_user.clone().unwrap_or_else(|| source.user.clone()),
            dbname: self
                .dst_dbname
                .clone()
                .unwrap_or_else(|| source.dbname.clone()),
            password: self
                .dst_password
                .clone()
                .or_else(|| source.password.clone().filter(|_| same_login)),
        }
    }
}

/// A `schema.table` name. The schema defaults to `public`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub schema: String,
    pub table: String,
}

impl FromStr for QualifiedName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (schema, table) = match s.split_once('.') {
            Some((schema, table)) => (schema, table),
            None => ("public", s),
        };
        if schema.is_empty() || table.is_empty() {
            return Err(format!("expected [schema.]table, got {:?}", s));
        }
        Ok(Self {
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Build the endpoint for one table.
pub fn endpoint(conn: &ConnectionArgs, name: &QualifiedName, channel: Channel) -> Endpoint {
    let endpoint = Endpoint::new(&conn.host, &conn.dbname, &conn.user)
        .with_port(conn.port)
        .with_table(&name.schema, &name.table)
        .with_channel(channel);
    match &conn.password {
        Some(password) => endpoint.with_password(password),
        None => endpoint,
    }
}
