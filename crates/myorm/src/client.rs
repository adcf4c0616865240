//! One logical database connection.
//!
//! A [`Client`] wraps a physical [`Link`] opened by a [`Driver`] and adds the
//! pieces the rest of the crate relies on: transaction bookkeeping, a terminal
//! closed state, and statement logging through a [`SqlLogger`].

use crate::config::Config;
use crate::error::{OrmError, OrmResult};
use crate::logger::{NoopLogger, SqlLogger, format_line, interpolate};
use crate::row::Row;
use crate::value::Value;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::Level;

/// Outcome of a mutating statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Identifier generated by the statement, when the engine reports one.
    pub last_insert_id: Option<i64>,
    pub rows_affected: u64,
}

/// A physical connection to the engine.
///
/// Implementations report a broken link with [`OrmError::Connection`]; any
/// other error leaves the link usable.
#[async_trait]
pub trait Link: Send {
    async fn execute(&mut self, sql: &str, args: &[Value]) -> OrmResult<ExecResult>;

    async fn query(&mut self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>>;

    async fn begin(&mut self) -> OrmResult<()>;

    async fn commit(&mut self) -> OrmResult<()>;

    async fn rollback(&mut self) -> OrmResult<()>;

    /// Release the link. Called at most once, by [`Client::free`].
    ///
    /// A link the pool discards is dropped without this call, so dropping a
    /// link must release the physical connection as well.
    async fn close(&mut self) -> OrmResult<()>;
}

/// Opens physical links.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn connect(&self, config: &Config) -> OrmResult<Box<dyn Link>>;
}

/// A connection with transaction state and statement logging.
pub struct Client {
    link: Box<dyn Link>,
    in_tx: bool,
    closed: bool,

    logger: Arc<dyn SqlLogger>,
    trace_id: String,
    log_prefix: String,
    log_level: Level,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("in_tx", &self.in_tx)
            .field("closed", &self.closed)
            .field("trace_id", &self.trace_id)
            .field("log_prefix", &self.log_prefix)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Wrap an already open link. Statements are not logged until a logger is set.
    pub fn new(link: Box<dyn Link>) -> Self {
        Self {
            link,
            in_tx: false,
            closed: false,
            logger: Arc::new(NoopLogger),
            trace_id: "-".to_string(),
            log_prefix: String::new(),
            log_level: Level::INFO,
        }
    }

    /// Open a link through `driver` and wrap it, logging at `config.log_level`.
    pub async fn connect(driver: &dyn Driver, config: &Config) -> OrmResult<Self> {
        let link = driver.connect(config).await?;
        Ok(Self::new(link).with_log_level(config.log_level))
    }

    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    pub fn set_logger(&mut self, logger: Arc<dyn SqlLogger>) -> &mut Self {
        self.logger = logger;
        self
    }

    /// Set the id stamped on every log line. An empty id resets it to `-`.
    pub fn set_trace_id(&mut self, trace_id: impl Into<String>) -> &mut Self {
        let trace_id = trace_id.into();
        self.trace_id = if trace_id.is_empty() {
            "-".to_string()
        } else {
            trace_id
        };
        self
    }

    pub fn set_log_prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.log_prefix = prefix.into();
        self
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn in_transaction(&self) -> bool {
        self.in_tx
    }

    /// Close the link. The client is unusable afterwards.
    pub async fn free(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.in_tx = false;
        if let Err(e) = self.link.close().await {
            tracing::warn!(target: "myorm.pool", error = %e, "closing link failed");
        }
    }

    // ==================== Statements ====================

    /// Run a statement that returns no rows.
    pub async fn exec(&mut self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        self.ensure_open()?;
        self.log(sql, args);
        let result = self.link.execute(sql, args).await;
        self.observe(result)
    }

    /// Run a statement and collect its rows.
    pub async fn query(&mut self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        self.ensure_open()?;
        self.log(sql, args);
        let result = self.link.query(sql, args).await;
        self.observe(result)
    }

    /// First row of the result, if any.
    pub async fn query_row(&mut self, sql: &str, args: &[Value]) -> OrmResult<Option<Row>> {
        Ok(self.query(sql, args).await?.into_iter().next())
    }

    // ==================== Transactions ====================

    pub async fn begin(&mut self) -> OrmResult<()> {
        self.ensure_open()?;
        if self.in_tx {
            return Err(OrmError::Transaction("already in transaction".to_string()));
        }
        let result = self.link.begin().await;
        self.observe(result)?;
        self.log("BEGIN", &[]);
        self.in_tx = true;
        Ok(())
    }

    /// Commit the active transaction. The client leaves the transaction
    /// whether or not the commit succeeds.
    pub async fn commit(&mut self) -> OrmResult<()> {
        self.ensure_open()?;
        if !std::mem::take(&mut self.in_tx) {
            return Err(OrmError::Transaction("not in transaction".to_string()));
        }
        self.log("COMMIT", &[]);
        let result = self.link.commit().await;
        self.observe(result)
    }

    /// Roll back the active transaction. See [`Client::commit`].
    pub async fn rollback(&mut self) -> OrmResult<()> {
        self.ensure_open()?;
        if !std::mem::take(&mut self.in_tx) {
            return Err(OrmError::Transaction("not in transaction".to_string()));
        }
        self.log("ROLLBACK", &[]);
        let result = self.link.rollback().await;
        self.observe(result)
    }

    fn ensure_open(&self) -> OrmResult<()> {
        if self.closed {
            return Err(OrmError::Closed);
        }
        Ok(())
    }

    /// A connection-class error poisons the client.
    fn observe<T>(&mut self, result: OrmResult<T>) -> OrmResult<T> {
        if let Err(e) = &result {
            if e.is_connection_error() {
                self.closed = true;
                self.in_tx = false;
            }
        }
        result
    }

    fn log(&self, sql: &str, args: &[Value]) {
        let line = format_line(&self.trace_id, &self.log_prefix, &interpolate(sql, args));
        self.logger.log(self.log_level, line.as_bytes());
    }
}
