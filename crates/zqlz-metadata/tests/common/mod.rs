//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use zqlz_core::{Connection, QueryCancelHandle, QueryResult, Result, Value, ZqlzError};

/// Mock connection for testing metadata loading without a real database.
///
/// Responds to queries by SQL pattern: if a query contains a registered
/// pattern string the matching result is returned, otherwise an empty result.
/// Can fail every query, fail only queries matching a pattern, or drop the
/// first few queries with a connectivity error.
pub struct MockConnection {
    pub driver: String,
    pub should_fail: bool,
    pub query_responses: Vec<(String, QueryResult)>,
    pub failing_patterns: Vec<String>,
    pub transient_failures: AtomicUsize,
    pub delay: Option<Duration>,
    pub query_count: Arc<parking_lot::Mutex<usize>>,
    /// Log of all SQL queries executed, for assertion in tests
    pub query_log: Arc<parking_lot::Mutex<Vec<(String, Vec<Value>)>>>,
    pub cancel_handle: Arc<CountingCancelHandle>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            driver: "oracle".to_string(),
            should_fail: false,
            query_responses: vec![],
            failing_patterns: vec![],
            transient_failures: AtomicUsize::new(0),
            delay: None,
            query_count: Arc::new(parking_lot::Mutex::new(0)),
            query_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
            cancel_handle: Arc::new(CountingCancelHandle::default()),
        }
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Fail queries containing `pattern` with a statement error
    pub fn with_failing_query(mut self, pattern: impl Into<String>) -> Self {
        self.failing_patterns.push(pattern.into());
        self
    }

    /// Fail the next `count` queries with a connectivity error
    pub fn with_transient_failures(self, count: usize) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Register a response for queries containing the given SQL pattern.
    pub fn with_query_response(
        mut self,
        sql_contains: impl Into<String>,
        result: QueryResult,
    ) -> Self {
        self.query_responses.push((sql_contains.into(), result));
        self
    }

    pub fn query_count(&self) -> usize {
        *self.query_count.lock()
    }

    pub fn query_log(&self) -> Vec<(String, Vec<Value>)> {
        self.query_log.lock().clone()
    }

    /// Number of logged queries containing `pattern`
    pub fn queries_matching(&self, pattern: &str) -> usize {
        self.query_log
            .lock()
            .iter()
            .filter(|(sql, _)| sql.contains(pattern))
            .count()
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        &self.driver
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        *self.query_count.lock() += 1;
        self.query_log.lock().push((sql.to_string(), params.to_vec()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ZqlzError::Connection("connection reset by peer".into()));
        }

        if self.should_fail || self.failing_patterns.iter().any(|p| sql.contains(p.as_str())) {
            return Err(ZqlzError::Query("ORA-00942: table or view does not exist".into()));
        }

        for (pattern, result) in &self.query_responses {
            if sql.contains(pattern.as_str()) {
                return Ok(result.clone());
            }
        }

        Ok(QueryResult::empty())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }

    fn cancel_handle(&self) -> Option<Arc<dyn QueryCancelHandle>> {
        Some(self.cancel_handle.clone())
    }
}

#[derive(Default)]
pub struct CountingCancelHandle {
    pub calls: AtomicUsize,
}

impl QueryCancelHandle for CountingCancelHandle {
    fn cancel(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Build a query result from column names and rows
pub fn mock_query_result(columns: Vec<&str>, rows: Vec<Vec<Value>>) -> QueryResult {
    QueryResult::from_rows(columns.into_iter().map(String::from).collect(), rows)
}

/// Initialize test logging once per test binary
pub fn init_logging() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("zqlz_metadata=debug".parse().unwrap()),
            )
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
