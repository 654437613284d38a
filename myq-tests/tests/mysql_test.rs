//! End-to-end tests against a real MySQL server in a testcontainer.
//!
//! A single container is shared across all tests and started lazily by the
//! first test that needs it, so the suite only touches docker when run with
//! `cargo test -- --ignored`. Tests run sequentially with `serial_test` and
//! recreate their tables.
//!
//! Container cleanup:
//! - The `watchdog` feature handles cleanup on CTRL+C or SIGTERM signals
//! - For normal process exit, `shutdown_hooks` signals the container thread to stop
//! - The container lives inside the thread, so it's dropped when the thread exits

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use myq::{Config, Error, Param, Pool, Query, QueryResult};
use serial_test::serial;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::mysql::Mysql;

// Host port of the running container
static DB_PORT: OnceLock<u16> = OnceLock::new();
// Flag to signal the container thread to exit
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn cleanup_on_exit() {
    SHUTDOWN.store(true, Ordering::SeqCst);
    // Give the container thread time to clean up
    thread::sleep(Duration::from_millis(500));
}

fn start_container() -> u16 {
    shutdown_hooks::add_shutdown_hook(cleanup_on_exit);

    let (ready_tx, ready_rx) = std::sync::mpsc::channel();
    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let container: ContainerAsync<Mysql> = Mysql::default().start().await.unwrap();
            let port = container.get_host_port_ipv4(3306).await.unwrap();
            ready_tx.send(port).unwrap();

            while !SHUTDOWN.load(Ordering::Relaxed) {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        });
    });

    ready_rx.recv().unwrap()
}

fn db_config() -> Config {
    let port = *DB_PORT.get_or_init(start_container);
    Config::new("127.0.0.1", "root", "", "test", port)
        .with_max_pool_size(4)
        .with_connect_retries(5)
        .with_retry_backoff(Duration::from_millis(200))
}

async fn users_pool() -> Pool {
    let pool = Pool::connect(db_config()).await.unwrap();
    pool.query("DROP TABLE IF EXISTS users", &[]).await.unwrap();
    pool.query(
        "CREATE TABLE users (
            id INT PRIMARY KEY,
            name VARCHAR(64) NOT NULL,
            status VARCHAR(16) NOT NULL DEFAULT 'active'
        )",
        &[],
    )
    .await
    .unwrap();
    pool
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_batch_insert_then_select() {
    let pool = users_pool().await;

    let inserted = pool
        .query(
            "INSERT INTO users (id, name) VALUES (?)",
            &[
                Param::row([Param::from(1), Param::from("jasper")]),
                Param::row([Param::from(2), Param::from("jv")]),
            ],
        )
        .await
        .unwrap();
    assert_eq!(inserted.rows_affected(), Some(2));

    let result = pool
        .query(
            "SELECT id, name FROM users WHERE name IN (?) ORDER BY id",
            &[Param::list(["jasper", "jv"])],
        )
        .await
        .unwrap();
    let rows = result.into_rows().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get::<i64>("id").unwrap(), 1);
    assert_eq!(rows[0].get::<String>("name").unwrap(), "jasper");
    assert_eq!(rows[1].get::<String>("name").unwrap(), "jv");

    pool.shutdown().await;
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_update_with_mapping_is_committed() {
    let pool = users_pool().await;
    pool.query(
        "INSERT INTO users (id, name) VALUES (?)",
        &[
            Param::row([Param::from(1), Param::from("a")]),
            Param::row([Param::from(2), Param::from("b")]),
        ],
    )
    .await
    .unwrap();

    let updated = pool
        .query(
            "UPDATE users SET ? WHERE name IN (?)",
            &[Param::map([("status", "inactive")]), Param::list(["a", "b"])],
        )
        .await
        .unwrap();
    assert_eq!(updated.rows_affected(), Some(2));

    // A fresh pool sees the change only if it was committed
    let other = Pool::connect(db_config()).await.unwrap();
    let result = other
        .query(
            "SELECT COUNT(*) AS n FROM users WHERE status = ?",
            &[Param::from("inactive")],
        )
        .await
        .unwrap();
    assert_eq!(result.rows().unwrap()[0].get::<i64>("n").unwrap(), 2);

    other.shutdown().await;
    pool.shutdown().await;
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_multi_query_returns_each_result() {
    let pool = users_pool().await;

    let results = pool
        .multi_query(
            "INSERT INTO users (id, name) VALUES (?, ?); SELECT name FROM users WHERE id = ?",
            &[Param::from(7), Param::from("o'brien"), Param::from(7)],
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].rows_affected(), Some(1));
    match &results[1] {
        QueryResult::Rows(rows) => assert_eq!(rows[0].get::<String>("name").unwrap(), "o'brien"),
        other => panic!("expected rows, got {other:?}"),
    }

    pool.shutdown().await;
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_failed_statement_is_rolled_back() {
    let pool = users_pool().await;

    let err = Query::new("INSERT INTO users (id, name) VALUES (?, ?); SELECT * FROM missing_table")
        .bind(1)
        .bind("ghost")
        .execute_multi(&pool)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Query { .. }));

    let result = pool.query("SELECT COUNT(*) AS n FROM users", &[]).await.unwrap();
    assert_eq!(result.rows().unwrap()[0].get::<i64>("n").unwrap(), 0);
    assert_eq!(pool.available(), pool.capacity());

    pool.shutdown().await;
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_percent_and_null_values_round_trip() {
    let pool = users_pool().await;
    pool.query(
        "INSERT INTO users (id, name, status) VALUES (?, ?, ?)",
        &[Param::from(1), Param::from("50% off"), Param::from("x%s")],
    )
    .await
    .unwrap();

    let result = pool
        .query(
            "SELECT name, status, NULL AS nothing FROM users WHERE name LIKE '50%'",
            &[],
        )
        .await
        .unwrap();
    let row = &result.rows().unwrap()[0];
    assert_eq!(row.get::<String>("name").unwrap(), "50% off");
    assert_eq!(row.get::<String>("status").unwrap(), "x%s");
    assert_eq!(row.get::<Option<String>>("nothing").unwrap(), None);

    pool.shutdown().await;
}
