use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error as ThisError;
use tokio::sync::Notify;
use tokio::time::timeout;

use crate::connection::Connection;
use crate::Result;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum PoolError {
    #[error("connection pool timeout")]
    Timeout,
    #[error("connection pool is closed")]
    Closed,
}

/// Bounded pool of connections to a single server.
///
/// The sum of idle and lent-out connections never exceeds `max_conns`.
/// [`Pool::get`] prefers an idle connection, dials a new one while below the
/// bound, and otherwise waits up to `connect_timeout` for a connection to be
/// returned. Connections that hit an I/O error must go back through
/// [`Pool::discard`] so their slot is released.
pub struct Pool {
    address: String,
    max_conns: usize,
    connect_timeout: Duration,
    state: Mutex<PoolState>,
    returned: Notify,
}

struct PoolState {
    idle: VecDeque<Connection>,
    created: usize,
    closed: bool,
}

impl Pool {
    pub fn new(address: String, max_conns: usize, connect_timeout: Duration) -> Self {
        Self {
            address,
            max_conns,
            connect_timeout,
            state: Mutex::new(PoolState {
                idle: VecDeque::new(),
                created: 0,
                closed: false,
            }),
            returned: Notify::new(),
        }
    }

    pub async fn get(&self) -> Result<Connection> {
        loop {
            // Register interest before checking state, so a `put` racing
            // with the check is not missed.
            let returned = self.returned.notified();

            let should_dial = {
                let mut state = self.state.lock();
                if state.closed {
                    return Err(PoolError::Closed.into());
                }
                if let Some(conn) = state.idle.pop_front() {
                    return Ok(conn);
                }
                if state.created < self.max_conns {
                    state.created += 1;
                    true
                } else {
                    false
                }
            };

            if should_dial {
                return match Connection::connect(&self.address, self.connect_timeout).await {
                    Ok(conn) => Ok(conn),
                    Err(err) => {
                        self.state.lock().created -= 1;
                        self.returned.notify_one();
                        Err(err)
                    }
                };
            }

            if timeout(self.connect_timeout, returned).await.is_err() {
                return Err(PoolError::Timeout.into());
            }
        }
    }

    /// Returns a healthy connection for reuse. When no idle capacity is
    /// left (or the pool has been closed) the connection is dropped and its
    /// slot released.
    pub fn put(&self, conn: Connection) {
        let mut state = self.state.lock();
        if state.closed || state.idle.len() >= self.max_conns {
            state.created = state.created.saturating_sub(1);
            drop(state);
            drop(conn);
        } else {
            state.idle.push_back(conn);
            drop(state);
        }
        self.returned.notify_one();
    }

    /// Drops a broken connection and releases its slot.
    pub fn discard(&self, conn: Connection) {
        drop(conn);
        let mut state = self.state.lock();
        state.created = state.created.saturating_sub(1);
        drop(state);
        self.returned.notify_one();
    }

    /// Closes the pool: parked connections are dropped and pending waiters
    /// are woken with a closed-pool error.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.idle.clear();
        drop(state);
        self.returned.notify_waiters();
    }

    #[cfg(test)]
    fn created(&self) -> usize {
        self.state.lock().created
    }
}
