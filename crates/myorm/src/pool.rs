//! Connection pool utilities
//!
//! [`Pool`] puts a `deadpool` managed pool in front of a
//! [`ConnectionFactory`]. Connections come back to the pool when the
//! [`PooledClient`] guard is dropped or handed to [`Pool::put`]; closed ones
//! and ones still inside a transaction never do.

use crate::client::{Client, Driver};
use crate::config::{Config, PoolConfig};
use crate::error::{OrmError, OrmResult};
use deadpool::managed::{self, Metrics, Object, RecycleError, RecycleResult};
use futures_core::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Creates new connections for the pool.
///
/// Implemented for every `Fn() -> impl Future<Output = OrmResult<Client>>`:
///
/// ```ignore
/// let pool = Pool::new(PoolConfig::default(), move || {
///     let driver = driver.clone();
///     let config = config.clone();
///     async move { Client::connect(driver.as_ref(), &config).await }
/// })?;
/// ```
pub trait ConnectionFactory: Send + Sync + 'static {
    fn connect(&self) -> BoxFuture<'_, OrmResult<Client>>;
}

impl<F, Fut> ConnectionFactory for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = OrmResult<Client>> + Send + 'static,
{
    fn connect(&self) -> BoxFuture<'_, OrmResult<Client>> {
        Box::pin(self())
    }
}

/// `deadpool` manager producing [`Client`]s.
pub struct ClientManager {
    factory: Arc<dyn ConnectionFactory>,
    max_idle_time: Duration,
}

impl fmt::Debug for ClientManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientManager")
            .field("max_idle_time", &self.max_idle_time)
            .finish_non_exhaustive()
    }
}

impl managed::Manager for ClientManager {
    type Type = Client;
    type Error = OrmError;

    async fn create(&self) -> Result<Client, OrmError> {
        let client = self.factory.connect().await?;
        tracing::debug!(target: "myorm.pool", "connection created");
        Ok(client)
    }

    async fn recycle(&self, client: &mut Client, metrics: &Metrics) -> RecycleResult<OrmError> {
        if client.is_closed() {
            return Err(RecycleError::Message("connection is closed".into()));
        }
        if client.in_transaction() {
            client.free().await;
            return Err(RecycleError::Message("connection left inside a transaction".into()));
        }
        if metrics.last_used() > self.max_idle_time {
            client.free().await;
            return Err(RecycleError::Message("connection idle for too long".into()));
        }
        Ok(())
    }
}

/// A borrowed connection. Dropping it returns the connection to the pool.
pub type PooledClient = Object<ClientManager>;

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub max_size: usize,
    /// Live connections, idle and borrowed.
    pub size: usize,
    pub idle: usize,
    pub in_use: usize,
}

/// Connection pool over a [`ConnectionFactory`].
#[derive(Clone)]
pub struct Pool {
    inner: managed::Pool<ClientManager>,
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool").field("status", &self.status()).finish()
    }
}

impl Pool {
    /// Create a pool that opens connections with `factory`.
    pub fn new(config: PoolConfig, factory: impl ConnectionFactory) -> OrmResult<Self> {
        if config.max_conns == 0 {
            return Err(OrmError::Config("max_conns must be at least 1".to_string()));
        }
        let manager = ClientManager {
            factory: Arc::new(factory),
            max_idle_time: config.max_idle_time,
        };
        let inner = managed::Pool::builder(manager)
            .max_size(config.max_conns)
            .build()?;
        Ok(Self { inner })
    }

    /// Create a pool that opens connections through `driver`.
    pub fn from_driver(
        driver: Arc<dyn Driver>,
        config: Config,
        pool_config: PoolConfig,
    ) -> OrmResult<Self> {
        Self::new(pool_config, move || {
            let driver = Arc::clone(&driver);
            let config = config.clone();
            async move { Client::connect(driver.as_ref(), &config).await }
        })
    }

    /// Borrow a connection, creating one when none is idle.
    ///
    /// Factory errors come back unchanged.
    pub async fn get(&self) -> OrmResult<PooledClient> {
        let client = self.inner.get().await?;
        tracing::debug!(target: "myorm.pool", in_use = self.status().in_use, "connection borrowed");
        Ok(client)
    }

    /// Return a borrowed connection.
    ///
    /// A closed connection is discarded and reported as [`OrmError::Closed`].
    /// One still inside a transaction is discarded too, so its uncommitted
    /// work never reaches the next borrower.
    pub fn put(&self, client: PooledClient) -> OrmResult<()> {
        if client.is_closed() {
            self.discard(client);
            return Err(OrmError::Closed);
        }
        if client.in_transaction() {
            self.discard(client);
            return Err(OrmError::Transaction(
                "connection returned inside an open transaction".to_string(),
            ));
        }
        drop(client);
        tracing::debug!(target: "myorm.pool", in_use = self.status().in_use, "connection returned");
        Ok(())
    }

    /// Remove a borrowed connection from the pool for good.
    ///
    /// The link is dropped without [`Link::close`](crate::Link::close); it has
    /// to release the physical connection on drop.
    pub fn discard(&self, client: PooledClient) {
        drop(Object::take(client));
        tracing::debug!(target: "myorm.pool", size = self.status().size, "connection discarded");
    }

    pub fn status(&self) -> PoolStatus {
        let status = self.inner.status();
        PoolStatus {
            max_size: status.max_size,
            size: status.size,
            idle: status.available,
            in_use: status.size.saturating_sub(status.available),
        }
    }
}
