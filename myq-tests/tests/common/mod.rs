//! Scripted in-process driver for pool and executor tests.
//!
//! Statements containing `bogus` fail; statements starting with SELECT,
//! SHOW or WITH return one row `{n: 1}`; anything else reports 2 affected
//! rows. Every call is recorded on the shared [`MockState`]. Statements
//! stay pending on their session until COMMIT moves them to `committed`;
//! ROLLBACK or close discards them.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use myq::{Config, Dialect, Driver, Error, MySqlDialect, Pool, ResultSet, Row, Session, Value};

#[derive(Default)]
pub struct MockState {
    pub connect_attempts: AtomicU32,
    pub fail_connect: AtomicBool,
    pub open_sessions: AtomicUsize,
    pub closes: AtomicUsize,
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub query_delay_ms: AtomicU64,
    /// Sessions opened before the current generation fail their ping
    pub generation: AtomicU64,
    pub executed: Mutex<Vec<String>>,
    pub batches: Mutex<Vec<(String, Vec<Vec<Value>>)>>,
    pub committed: Mutex<Vec<String>>,
}

impl MockState {
    /// Simulate the server dropping every open session.
    pub fn kill_sessions(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn committed(&self) -> Vec<String> {
        self.committed.lock().unwrap().clone()
    }
}

#[derive(Clone, Default)]
pub struct MockDriver {
    pub state: Arc<MockState>,
}

impl Dialect for MockDriver {
    fn escape(&self, value: &Value) -> String {
        MySqlDialect.escape(value)
    }
}

#[async_trait]
impl Driver for MockDriver {
    type Session = MockSession;

    async fn connect(&self, _config: &Config) -> myq::Result<MockSession> {
        self.state.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(Error::Driver("connection refused".into()));
        }
        self.state.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession {
            state: Arc::clone(&self.state),
            generation: self.state.generation.load(Ordering::SeqCst),
            pending: Vec::new(),
        })
    }
}

pub struct MockSession {
    state: Arc<MockState>,
    generation: u64,
    pending: Vec<String>,
}

impl MockSession {
    fn statement(stmt: &str) -> myq::Result<ResultSet> {
        if stmt.contains("bogus") {
            return Err(Error::Driver(format!("syntax error near '{}'", stmt)));
        }
        let upper = stmt.to_ascii_uppercase();
        if ["SELECT", "SHOW", "WITH"].iter().any(|kw| upper.starts_with(kw)) {
            Ok(ResultSet {
                columns: vec!["n".into()],
                rows: vec![Row::new([("n", Value::Int(1))])],
                ..ResultSet::default()
            })
        } else {
            Ok(ResultSet {
                affected_rows: 2,
                ..ResultSet::default()
            })
        }
    }
}

#[async_trait]
impl Session for MockSession {
    async fn ping(&mut self) -> myq::Result<()> {
        if self.generation < self.state.generation.load(Ordering::SeqCst) {
            return Err(Error::Driver("server has gone away".into()));
        }
        Ok(())
    }

    async fn query(&mut self, sql: &str) -> myq::Result<Vec<ResultSet>> {
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);

        // The server has the statement from here on, even if the caller gives up
        self.state.executed.lock().unwrap().push(sql.to_string());
        self.pending.push(sql.to_string());

        let delay = self.state.query_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let result = sql
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::statement)
            .collect();

        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn exec_batch(&mut self, sql: &str, rows: Vec<Vec<Value>>) -> myq::Result<ResultSet> {
        let affected_rows = rows.len() as u64;
        self.pending.push(sql.to_string());
        self.state
            .batches
            .lock()
            .unwrap()
            .push((sql.to_string(), rows));
        Ok(ResultSet {
            affected_rows,
            last_insert_id: Some(1),
            ..ResultSet::default()
        })
    }

    async fn commit(&mut self) -> myq::Result<()> {
        self.state.commits.fetch_add(1, Ordering::SeqCst);
        self.state
            .committed
            .lock()
            .unwrap()
            .extend(self.pending.drain(..));
        Ok(())
    }

    async fn rollback(&mut self) -> myq::Result<()> {
        self.state.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.pending.clear();
        Ok(())
    }

    async fn close(self) -> myq::Result<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        self.state.open_sessions.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn test_config(pool_size: usize) -> Config {
    Config::new("mock", "root", "", "test", 3306)
        .with_max_pool_size(pool_size)
        .with_retry_backoff(Duration::from_millis(1))
}

pub fn mock_pool(pool_size: usize) -> (Pool<MockDriver>, Arc<MockState>) {
    let driver = MockDriver::default();
    let state = Arc::clone(&driver.state);
    let pool = Pool::with_driver(driver, test_config(pool_size)).unwrap();
    (pool, state)
}
