//! Running SQL through the `psql` command-line client.
//!
//! Every call spawns one `psql -qAt -c <sql>` process and blocks until it
//! exits. Connection settings are passed through the standard `PG*`
//! environment variables rather than on the command line.

use crate::report::{Channel, Reporter};
use crate::{Error, Result};
use std::collections::HashMap;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

/// Options passed to every session so notices don't pollute the output.
const PG_OPTIONS: &str = "--client-min-messages=warning";

/// Something that can run SQL against one endpoint.
pub trait SqlRunner {
    /// The endpoint statements are sent to.
    fn endpoint(&self) -> &Endpoint;

    /// Where diagnostic output for this endpoint goes.
    fn reporter(&self) -> &dyn Reporter;

    /// Run `sql` and return its output with surrounding whitespace trimmed.
    ///
    /// A non-zero exit is an error.
    fn query(&self, sql: &str) -> Result<String>;

    /// Run `sql`, discarding all output, and return the exit code.
    fn execute_quiet(&self, sql: &str) -> Result<i32>;
}

/// Environment variable lookup.
pub trait Env: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the environment of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Env for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Env for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Connection settings and target table for one side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Explicit password. When unset it is looked up in the environment,
    /// see [`Endpoint::password_key`].
    pub password: Option<String>,
    pub dbname: String,
    pub schema: String,
    pub table: String,
    /// Channel used when reporting activity on this endpoint.
    pub channel: Channel,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, dbname: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 5432,
            user: user.into(),
            password: None,
            dbname: dbname.into(),
            schema: "public".to_string(),
            table: String::new(),
            channel: Channel::Source,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_table(mut self, schema: impl Into<String>, table: impl Into<String>) -> Self {
        self.schema = schema.into();
        self.table = table.into();
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    /// Name of the environment variable holding the password,
    /// `PGPASSWORD_<DBNAME>_<USER>` in upper case.
    pub fn password_key(&self) -> String {
        format!("PGPASSWORD_{}_{}", self.dbname, self.user).to_uppercase()
    }

    /// The explicit password, or the trimmed value of [`Endpoint::password_key`].
    pub fn resolve_password(&self, env: &dyn Env) -> Result<String> {
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            return Ok(password.to_string());
        }
        let key = self.password_key();
        match env.var(&key).map(|v| v.trim().to_string()) {
            Some(password) if !password.is_empty() => Ok(password),
            _ => Err(Error::MissingPassword { key }),
        }
    }

    /// Environment variables for a `psql` child process.
    pub fn child_env(&self, password: &str) -> Vec<(&'static str, String)> {
        vec![
            ("PGHOST", self.host.clone()),
            ("PGPORT", self.port.to_string()),
            ("PGUSER", self.user.clone()),
            ("PGPASSWORD", password.to_string()),
            ("PGDATABASE", self.dbname.clone()),
            ("PGOPTIONS", PG_OPTIONS.to_string()),
        ]
    }
}

/// Runs SQL by spawning `psql`.
pub struct Psql {
    endpoint: Endpoint,
    reporter: Box<dyn Reporter>,
    env: Box<dyn Env>,
    program: String,
    password: OnceLock<String>,
}

impl Psql {
    pub fn new(endpoint: Endpoint, reporter: Box<dyn Reporter>) -> Self {
        Self {
            endpoint,
            reporter,
            env: Box::new(ProcessEnv),
            program: "psql".to_string(),
            password: OnceLock::new(),
        }
    }

    /// Use a different environment for the password lookup.
    pub fn with_env(mut self, env: impl Env + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Use a different client binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn password(&self) -> Result<&str> {
        if let Some(password) = self.password.get() {
            return Ok(password.as_str());
        }
        let password = self.endpoint.resolve_password(self.env.as_ref())?;
        Ok(self.password.get_or_init(|| password).as_str())
    }

    fn command(&self, sql: &str) -> Result<Command> {
        let password = self.password()?;
        let mut cmd = Command::new(&self.program);
        cmd.args(["-qAt", "-c", sql])
            .envs(self.endpoint.child_env(password));
        Ok(cmd)
    }

    fn spawn_error(&self, source: std::io::Error) -> Error {
        Error::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl SqlRunner for Psql {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }

    fn query(&self, sql: &str) -> Result<String> {
        let span = tracing::debug_span!(
            "psql.query",
            sql = %sql,
            db = %self.endpoint.dbname,
            status = tracing::field::Empty,
            bytes = tracing::field::Empty,
        );
        let _guard = span.enter();

        self.reporter.report(self.endpoint.channel, sql);
        let output = self
            .command(sql)?
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| self.spawn_error(e))?;

        let status = output.status.code().unwrap_or(-1);
        span.record("status", status);
        span.record("bytes", output.stdout.len());
        if !output.status.success() {
            tracing::error!(status, "psql failed");
            return Err(Error::SqlFailed {
                sql: sql.to_string(),
                status,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn execute_quiet(&self, sql: &str) -> Result<i32> {
        let span = tracing::debug_span!(
            "psql.execute",
            sql = %sql,
            db = %self.endpoint.dbname,
            status = tracing::field::Empty,
        );
        let _guard = span.enter();

        self.reporter.report(self.endpoint.channel, sql);
        let status = self
            .command(sql)?
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| self.spawn_error(e))?;

        let code = status.code().unwrap_or(-1);
        span.record("status", code);
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Silent;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_password_key_is_upper_case() {
        let ep = Endpoint::new("localhost", "sales", "etl_user");
        assert_eq!(ep.password_key(), "PGPASSWORD_SALES_ETL_USER");
    }

    #[test]
    fn test_explicit_password_wins() {
        let ep = Endpoint::new("localhost", "sales", "etl").with_password("hunter2");
        let env = env(&[("PGPASSWORD_SALES_ETL", "other")]);
        assert_eq!(ep.resolve_password(&env).unwrap(), "hunter2");
    }

    #[test]
    fn test_password_from_env_is_trimmed() {
        let ep = Endpoint::new("localhost", "sales", "etl");
        let env = env(&[("PGPASSWORD_SALES_ETL", "  s3cret\n")]);
        assert_eq!(ep.resolve_password(&env).unwrap(), "s3cret");
    }

    #[test]
    fn test_missing_or_blank_password_is_an_error() {
        let ep = Endpoint::new("localhost", "sales", "etl");
        for env in [env(&[]), env(&[("PGPASSWORD_SALES_ETL", "   ")])] {
            match ep.resolve_password(&env) {
                Err(Error::MissingPassword { key }) => assert_eq!(key, "PGPASSWORD_SALES_ETL"),
                other => panic!("expected MissingPassword, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_child_env() {
        let ep = Endpoint::new("db.internal", "sales", "etl").with_port(6432);
        let vars: HashMap<_, _> = ep.child_env("pw").into_iter().collect();
        assert_eq!(vars["PGHOST"], "db.internal");
        assert_eq!(vars["PGPORT"], "6432");
        assert_eq!(vars["PGUSER"], "etl");
        assert_eq!(vars["PGPASSWORD"], "pw");
        assert_eq!(vars["PGDATABASE"], "sales");
        assert_eq!(vars["PGOPTIONS"], "--client-min-messages=warning");
    }

    #[test]
    fn test_query_without_password_fails_before_spawning() {
        let psql = Psql::new(Endpoint::new("localhost", "sales", "etl"), Box::new(Silent))
            .with_env(HashMap::<String, String>::new())
            .with_program("definitely-not-a-real-psql-binary");
        assert!(matches!(
            psql.query("select 1"),
            Err(Error::MissingPassword { .. })
        ));
    }

    #[test]
    fn test_missing_binary_is_a_spawn_error() {
        let psql = Psql::new(
            Endpoint::new("localhost", "sales", "etl").with_password("pw"),
            Box::new(Silent),
        )
        .with_program("definitely-not-a-real-psql-binary");
        match psql.execute_quiet("select 1") {
            Err(Error::Spawn { program, .. }) => {
                assert_eq!(program, "definitely-not-a-real-psql-binary")
            }
            other => panic!("expected Spawn error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    fn script(dir: &tempfile::TempDir, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join("fake-psql");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    fn with_password(program: &str) -> Psql {
        Psql::new(
            Endpoint::new("localhost", "sales", "etl").with_password("pw"),
            Box::new(Silent),
        )
        .with_program(program)
    }

    #[test]
    #[cfg(unix)]
    fn test_query_non_zero_exit_is_sql_failed() {
        match with_password("false").query("select 1") {
            Err(Error::SqlFailed { sql, status }) => {
                assert_eq!(sql, "select 1");
                assert_eq!(status, 1);
            }
            other => panic!("expected SqlFailed, got {:?}", other),
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_execute_quiet_returns_exit_code() {
        assert_eq!(with_password("false").execute_quiet("select 1").unwrap(), 1);
        assert_eq!(with_password("true").execute_quiet("select 1").unwrap(), 0);

        let dir = tempfile::tempdir().unwrap();
        let program = script(&dir, "echo noise\necho oops >&2\nexit 7");
        assert_eq!(with_password(&program).execute_quiet("select 1").unwrap(), 7);
    }

    #[test]
    #[cfg(unix)]
    fn test_query_passes_sql_and_trims_output() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(&dir, r#"printf '\n  %s|%s  \n\n' "$1" "$3""#);
        assert_eq!(
            with_password(&program).query("select 1").unwrap(),
            "-qAt|select 1"
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_query_sets_connection_env() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(
            &dir,
            r#"printf '%s|%s|%s|%s' "$PGDATABASE" "$PGUSER" "$PGPASSWORD" "$PGOPTIONS""#,
        );
        assert_eq!(
            with_password(&program).query("select 1").unwrap(),
            "sales|etl|pw|--client-min-messages=warning"
        );
    }
}
