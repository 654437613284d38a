//! Fixed-capacity connection pool

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::mysql::MySqlDriver;
use crate::traits::Driver;

/// A fixed set of [`Connection`]s handed out one holder at a time.
///
/// Every connection is created when the pool is built and lives until
/// [`Pool::shutdown`]; checkout and release only move it between the caller
/// and the idle stack. A semaphore with one permit per idle connection
/// provides the waiting, so `#checked out + #available == capacity`.
///
/// Cloning is cheap: all clones share the same connections.
///
/// # Example
///
/// ```ignore
/// use myq::{Config, Param, Pool};
///
/// let pool = Pool::connect(Config::new("localhost", "root", "", "app", 3306)).await?;
/// let users = pool
///     .query("SELECT * FROM users WHERE name IN (?)", &[Param::list(["a", "b"])])
///     .await?;
/// pool.shutdown().await;
/// ```
pub struct Pool<D: Driver = MySqlDriver> {
    pub(crate) inner: Arc<PoolInner<D>>,
}

impl<D: Driver> Clone for Pool<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub(crate) struct PoolInner<D: Driver> {
    pub(crate) driver: Arc<D>,
    pub(crate) config: Arc<Config>,
    idle: Mutex<Vec<Connection<D>>>,
    permits: Semaphore,
    capacity: usize,
    checked_out: AtomicUsize,
    closed: AtomicBool,
}

impl<D: Driver> PoolInner<D> {
    fn idle(&self) -> MutexGuard<'_, Vec<Connection<D>>> {
        // Critical sections never panic mid-update, so a poisoned stack is intact
        self.idle.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn release(&self, mut conn: Connection<D>) {
        self.checked_out.fetch_sub(1, Ordering::AcqRel);
        if self.closed.load(Ordering::Acquire) {
            match Handle::try_current() {
                Ok(handle) => {
                    debug!(connection = conn.id(), "pool closed, closing returned connection");
                    handle.spawn(async move { conn.close().await });
                }
                Err(_) => {
                    warn!(connection = conn.id(), "no runtime to close returned connection");
                }
            }
            return;
        }
        self.idle().push(conn);
        self.permits.add_permits(1);
    }
}

impl Pool<MySqlDriver> {
    /// Build a MySQL pool of `config.max_pool_size` disconnected connections.
    ///
    /// Sessions are opened lazily on first checkout.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_driver(MySqlDriver, config)
    }

    /// Build a MySQL pool and eagerly connect every connection.
    pub async fn connect(config: Config) -> Result<Self> {
        let pool = Self::new(config)?;
        pool.warm_up().await;
        Ok(pool)
    }
}

impl<D: Driver> Pool<D> {
    /// Build a pool over a custom driver. Connections start disconnected.
    pub fn with_driver(driver: D, config: Config) -> Result<Self> {
        config.validate()?;

        let driver = Arc::new(driver);
        let capacity = config.max_pool_size;
        let config = Arc::new(config);
        let connections = (0..capacity)
            .map(|id| Connection::new(id, Arc::clone(&driver), Arc::clone(&config)))
            .collect();

        Ok(Self {
            inner: Arc::new(PoolInner {
                driver,
                config,
                idle: Mutex::new(connections),
                permits: Semaphore::new(capacity),
                capacity,
                checked_out: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Try one connect on every idle connection.
    ///
    /// Failures are logged and leave the connection disconnected; checkout
    /// revives it later.
    pub async fn warm_up(&self) {
        let mut held = Vec::with_capacity(self.inner.capacity);
        while let Ok(permit) = self.inner.permits.try_acquire() {
            permit.forget();
            let popped = self.inner.idle().pop();
            match popped {
                Some(conn) => held.push(PooledConnection::new(conn, Arc::clone(&self.inner))),
                None => {
                    self.inner.permits.add_permits(1);
                    break;
                }
            }
        }

        let warmed = futures::future::join_all(held.iter_mut().map(|conn| async move {
            if conn.is_connected() {
                return true;
            }
            match conn.connect(0).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(connection = conn.id(), error = %e, "eager connect failed");
                    false
                }
            }
        }))
        .await;

        info!(
            connected = warmed.iter().filter(|ok| **ok).count(),
            capacity = self.inner.capacity,
            "connection pool warmed up"
        );
    }

    /// Borrow a connection, waiting until one is free.
    ///
    /// A statement abandoned by the previous holder is rolled back, then the
    /// connection is pinged and reconnected in place if the probe fails, so a
    /// connection known to be dead is never handed out. The configured
    /// checkout timeout, if any, bounds all of it: waiting, rollback and
    /// reconnect attempts.
    pub async fn checkout(&self) -> Result<PooledConnection<D>> {
        match self.inner.config.checkout_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, self.checkout_inner())
                .await
                .map_err(|_| Error::PoolTimeout(timeout))?,
            None => self.checkout_inner().await,
        }
    }

    async fn checkout_inner(&self) -> Result<PooledConnection<D>> {
        let permit = self
            .inner
            .permits
            .acquire()
            .await
            .map_err(|_| Error::PoolClosed)?;
        permit.forget();

        let popped = self.inner.idle().pop();
        let Some(conn) = popped else {
            // Shutdown drained the stack between acquire and pop
            return Err(Error::PoolClosed);
        };
        let mut conn = PooledConnection::new(conn, Arc::clone(&self.inner));

        conn.discard_pending().await;
        if !conn.is_alive().await {
            debug!(connection = conn.id(), "connection not alive, reconnecting");
            conn.connect(self.inner.config.connect_retries).await?;
        }
        Ok(conn)
    }

    /// Return a connection to the pool. Never waits.
    ///
    /// Dropping the [`PooledConnection`] does the same.
    pub fn release(&self, conn: PooledConnection<D>) {
        drop(conn);
    }

    /// Close every idle connection and refuse further checkouts.
    ///
    /// Connections still checked out are closed when returned. Calling this
    /// more than once is harmless.
    pub async fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.permits.close();

        let drained: Vec<Connection<D>> = std::mem::take(&mut *self.inner.idle());
        let count = drained.len();
        futures::future::join_all(drained.into_iter().map(|mut conn| async move {
            conn.close().await;
        }))
        .await;

        info!(closed = count, capacity = self.inner.capacity, "connection pool shut down");
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Connections currently idle in the pool.
    pub fn available(&self) -> usize {
        self.inner.idle().len()
    }

    /// Connections currently checked out.
    pub fn in_use(&self) -> usize {
        self.inner.checked_out.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}

/// A connection checked out of a [`Pool`].
///
/// Derefs to [`Connection`]; goes back to the pool when dropped, on every
/// exit path.
pub struct PooledConnection<D: Driver> {
    conn: Option<Connection<D>>,
    pool: Arc<PoolInner<D>>,
}

impl<D: Driver> PooledConnection<D> {
    fn new(conn: Connection<D>, pool: Arc<PoolInner<D>>) -> Self {
        pool.checked_out.fetch_add(1, Ordering::AcqRel);
        Self {
            conn: Some(conn),
            pool,
        }
    }
}

impl<D: Driver> Deref for PooledConnection<D> {
    type Target = Connection<D>;

    fn deref(&self) -> &Self::Target {
        self.conn
            .as_ref()
            .expect("BUG: PooledConnection used after return to pool")
    }
}

impl<D: Driver> DerefMut for PooledConnection<D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn
            .as_mut()
            .expect("BUG: PooledConnection used after return to pool")
    }
}

impl<D: Driver> Drop for PooledConnection<D> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
