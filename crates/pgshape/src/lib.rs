//! Compare Postgres table shapes and render column clauses for replication.
//!
//! This crate provides:
//! - Column type normalization from `information_schema.columns` metadata
//! - Positional table comparison (subset / equivalence)
//! - SQL fragment rendering for `COPY`, `INSERT` and `CREATE TABLE` templates
//! - Catalog introspection by shelling out to `psql`
//!
//! # Example
//!
//! ```
//! use pgshape::{Column, Table};
//!
//! let table = Table::new(vec![
//!     Column::new("id", "integer"),
//!     Column::new("name", "character varying").with_max_length(50),
//!     Column::new("payload", "json"),
//! ]);
//!
//! assert_eq!(table.render_column_list(), "id\n,name\n,payload");
//! assert_eq!(
//!     table.render_column_definitions(),
//!     "id integer\n,name varchar(50)\n,payload text"
//! );
//! ```
//!
//! Introspecting a live table:
//!
//! ```ignore
//! let endpoint = Endpoint::new("db.internal", "analytics", "reporter")
//!     .with_table("public", "events");
//! let psql = Psql::new(endpoint, reporter_for(true, std::io::stderr()));
//! match introspect(&psql)? {
//!     TableLookup::Found(table) => println!("{}", table.render_column_definitions()),
//!     TableLookup::Absent => eprintln!("no such table"),
//! }
//! ```

mod column;
mod error;
mod ident;
mod introspect;
mod psql;
mod report;
mod table;

pub use column::{BaseType, Column};
pub use error::Error;
pub use ident::{needs_quotes, quote_ident};
pub use introspect::{CatalogRow, TableLookup, catalog_query_sql, introspect, parse_catalog_csv};
pub use psql::{Endpoint, Env, ProcessEnv, Psql, SqlRunner};
pub use report::{Channel, Reporter, Silent, Verbose, reporter_for};
pub use table::Table;

/// Result type for pgshape operations.
pub type Result<T> = std::result::Result<T, Error>;
