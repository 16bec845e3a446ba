//! Connection trait and row cursors

use crate::{QueryResult, Result, Row, Value};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

/// Forward-only, non-restartable cursor over the rows of one query.
///
/// Each item is either the next row or the error that ended the stream.
pub type RowStream<'a> = BoxStream<'a, Result<Row>>;

/// Handle for cancelling a running query from any thread.
///
/// This trait allows database drivers to provide a way to interrupt
/// long-running queries. The handle is safe to call from any thread
/// and can be called multiple times (subsequent calls are no-ops).
pub trait QueryCancelHandle: Send + Sync {
    /// Cancel the currently running query on the associated connection.
    fn cancel(&self);
}

/// An open database session.
///
/// Metadata components receive a session from their caller and never open
/// or close one themselves.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "oracle", "hana", "postgresql")
    fn driver_name(&self) -> &str;

    /// Execute a query that returns rows (SELECT)
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Execute a query and return its rows as a forward-only cursor.
    ///
    /// Drivers with native cursors should override this. The default runs
    /// [`Connection::query`] and replays the buffered rows.
    async fn query_stream<'a>(&'a self, sql: &str, params: &[Value]) -> Result<RowStream<'a>> {
        let result = self.query(sql, params).await?;
        tracing::trace!(
            row_count = result.row_count(),
            "replaying buffered result as row stream"
        );
        Ok(stream::iter(result.rows.into_iter().map(Ok)).boxed())
    }

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;

    /// Get a handle that can be used to cancel running queries.
    ///
    /// Returns `None` if the driver does not support query cancellation.
    fn cancel_handle(&self) -> Option<Arc<dyn QueryCancelHandle>> {
        None
    }
}
