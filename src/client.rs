use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::RwLock;
use thiserror::Error as ThisError;

use crate::config::ClientConfig;
use crate::pool::Pool;
use crate::protocol::{Opcode, Request, Response};
use crate::ring::HashRing;
use crate::store::Ttl;
use crate::Result;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ClientError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("no available servers")]
    NoAvailableServers,
    #[error("server error: {0}")]
    Server(String),
    #[error("unexpected response type")]
    UnexpectedResponse,
    #[error("request failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

/// Cluster-facing client: routes each key to its server over a consistent
/// hash ring, borrows connections from per-server pools, and retries a
/// failed request up to `retry_attempts` additional times.
///
/// The client is cheap to share behind an `Arc` and safe to use from many
/// tasks concurrently.
pub struct Client {
    config: ClientConfig,
    shared: RwLock<Shared>,
}

// Ring and pool map live behind one lock so membership changes are atomic:
// a reader either sees a server in both or in neither.
struct Shared {
    ring: HashRing,
    pools: HashMap<String, Arc<Pool>>,
}

impl Client {
    /// Connects to a cluster with the default configuration.
    pub fn new(servers: Vec<String>) -> Result<Self> {
        Self::with_config(ClientConfig {
            servers,
            ..ClientConfig::default()
        })
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut ring = HashRing::new(config.virtual_nodes);
        let mut pools = HashMap::new();
        for server in &config.servers {
            ring.add(server);
            pools.insert(server.clone(), new_pool(&config, server));
        }

        Ok(Self {
            config,
            shared: RwLock::new(Shared { ring, pools }),
        })
    }

    /// Adds a server to the ring and pool map. Keys in the arcs adjacent to
    /// the new server's positions move to it; everything else stays put.
    pub fn add_server(&self, server: &str) {
        let mut shared = self.shared.write();
        shared.ring.add(server);
        if !shared.pools.contains_key(server) {
            shared
                .pools
                .insert(server.to_string(), new_pool(&self.config, server));
        }
    }

    /// Removes a server; its pool is closed and its keys are re-routed to
    /// the remaining servers. Data held by the removed server is lost from
    /// the cluster's point of view.
    pub fn remove_server(&self, server: &str) {
        let mut shared = self.shared.write();
        shared.ring.remove(server);
        if let Some(pool) = shared.pools.remove(server) {
            pool.close();
        }
    }

    /// The servers currently on the ring.
    pub fn servers(&self) -> Vec<String> {
        let shared = self.shared.read();
        shared.ring.members().into_iter().map(String::from).collect()
    }

    /// Closes every pool. The client must not be used afterwards.
    pub fn close(&self) {
        let shared = self.shared.read();
        for pool in shared.pools.values() {
            pool.close();
        }
    }

    fn route(&self, request: &Request) -> std::result::Result<Arc<Pool>, ClientError> {
        let shared = self.shared.read();

        // PING is not tied to a key; any live server answers it.
        let server = if request.opcode == u8::from(Opcode::Ping) {
            shared.ring.members().first().copied()
        } else {
            shared.ring.lookup(&request.key)
        };

        let server = server.ok_or(ClientError::NoAvailableServers)?;
        shared
            .pools
            .get(server)
            .cloned()
            .ok_or(ClientError::NoAvailableServers)
    }

    /// Sends a raw request to the server owning its key and returns the raw
    /// response. The typed accessors below are built on this.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let attempts = self.config.retry_attempts + 1;
        let mut last_error = None;

        for _ in 0..attempts {
            let pool = match self.route(&request) {
                Ok(pool) => pool,
                Err(err) => {
                    last_error = Some(err.into());
                    continue;
                }
            };

            let mut conn = match pool.get().await {
                Ok(conn) => conn,
                Err(err) => {
                    last_error = Some(err);
                    continue;
                }
            };

            if let Err(err) = conn.send(request.clone(), self.config.write_timeout).await {
                pool.discard(conn);
                last_error = Some(err);
                continue;
            }

            match conn.recv(self.config.read_timeout).await {
                Ok(response) => {
                    pool.put(conn);
                    return Ok(response);
                }
                Err(err) => {
                    pool.discard(conn);
                    last_error = Some(err);
                }
            }
        }

        Err(ClientError::Exhausted {
            attempts,
            last_error: last_error
                .map(|err| err.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        }
        .into())
    }

    pub async fn get(&self, key: &str) -> Result<Bytes> {
        self.execute_str(Request::new(Opcode::Get, key), "key not found")
            .await
    }

    pub async fn set(&self, key: &str, value: impl Into<Bytes>, ttl: Option<Duration>) -> Result<()> {
        let request = Request::new(Opcode::Set, key)
            .with_args(vec![value.into()])
            .with_ttl(ttl.map_or(0, |ttl| ttl.as_secs()));
        self.execute_ok(request).await
    }

    pub async fn del(&self, key: &str) -> Result<bool> {
        self.execute_bool(Request::new(Opcode::Del, key)).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.execute_bool(Request::new(Opcode::Exists, key)).await
    }

    pub async fn incr(&self, key: &str) -> Result<i64> {
        self.execute_int(Request::new(Opcode::Incr, key)).await
    }

    pub async fn decr(&self, key: &str) -> Result<i64> {
        self.execute_int(Request::new(Opcode::Decr, key)).await
    }

    pub async fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        let request = Request::new(Opcode::IncrBy, key)
            .with_args(vec![Bytes::from(delta.to_string())]);
        self.execute_int(request).await
    }

    pub async fn decr_by(&self, key: &str, delta: i64) -> Result<i64> {
        let request = Request::new(Opcode::DecrBy, key)
            .with_args(vec![Bytes::from(delta.to_string())]);
        self.execute_int(request).await
    }

    /// Sets the expiration of an existing key. Returns false when the key
    /// is absent.
    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let request = Request::new(Opcode::Expire, key).with_ttl(ttl.as_secs());
        self.execute_bool(request).await
    }

    pub async fn ttl(&self, key: &str) -> Result<Ttl> {
        let secs = self.execute_int(Request::new(Opcode::Ttl, key)).await?;
        Ok(Ttl::from_secs(secs))
    }

    pub async fn persist(&self, key: &str) -> Result<bool> {
        self.execute_bool(Request::new(Opcode::Persist, key)).await
    }

    pub async fn hget(&self, key: &str, field: &str) -> Result<Bytes> {
        let request =
            Request::new(Opcode::HGet, key).with_args(vec![Bytes::copy_from_slice(field.as_bytes())]);
        self.execute_str(request, "field not found").await
    }

    pub async fn hset(&self, key: &str, field: &str, value: impl Into<Bytes>) -> Result<()> {
        let request = Request::new(Opcode::HSet, key)
            .with_args(vec![Bytes::copy_from_slice(field.as_bytes()), value.into()]);
        self.execute_ok(request).await
    }

    pub async fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        let request =
            Request::new(Opcode::HDel, key).with_args(vec![Bytes::copy_from_slice(field.as_bytes())]);
        self.execute_bool(request).await
    }

    pub async fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        let request = Request::new(Opcode::HExists, key)
            .with_args(vec![Bytes::copy_from_slice(field.as_bytes())]);
        self.execute_bool(request).await
    }

    /// Every field-value pair of a hash. An absent key yields an empty map.
    pub async fn hget_all(&self, key: &str) -> Result<HashMap<String, Bytes>> {
        let items = self.execute_array(Request::new(Opcode::HGetAll, key)).await?;

        let mut pairs = HashMap::with_capacity(items.len() / 2);
        for pair in items.chunks_exact(2) {
            let field = String::from_utf8(pair[0].to_vec())
                .map_err(|_| ClientError::UnexpectedResponse)?;
            pairs.insert(field, pair[1].clone());
        }
        Ok(pairs)
    }

    pub async fn lpush(&self, key: &str, values: Vec<Bytes>) -> Result<i64> {
        self.execute_int(Request::new(Opcode::LPush, key).with_args(values))
            .await
    }

    pub async fn rpush(&self, key: &str, values: Vec<Bytes>) -> Result<i64> {
        self.execute_int(Request::new(Opcode::RPush, key).with_args(values))
            .await
    }

    pub async fn lpop(&self, key: &str) -> Result<Bytes> {
        self.execute_str(Request::new(Opcode::LPop, key), "list is empty")
            .await
    }

    pub async fn rpop(&self, key: &str) -> Result<Bytes> {
        self.execute_str(Request::new(Opcode::RPop, key), "list is empty")
            .await
    }

    pub async fn llen(&self, key: &str) -> Result<i64> {
        self.execute_int(Request::new(Opcode::LLen, key)).await
    }

    pub async fn sadd(&self, key: &str, members: Vec<Bytes>) -> Result<i64> {
        self.execute_int(Request::new(Opcode::SAdd, key).with_args(members))
            .await
    }

    pub async fn srem(&self, key: &str, members: Vec<Bytes>) -> Result<i64> {
        self.execute_int(Request::new(Opcode::SRem, key).with_args(members))
            .await
    }

    pub async fn smembers(&self, key: &str) -> Result<Vec<Bytes>> {
        self.execute_array(Request::new(Opcode::SMembers, key)).await
    }

    pub async fn sismember(&self, key: &str, member: impl Into<Bytes>) -> Result<bool> {
        let request = Request::new(Opcode::SIsMember, key).with_args(vec![member.into()]);
        self.execute_bool(request).await
    }

    /// Connectivity check against an arbitrary live server.
    pub async fn ping(&self) -> Result<()> {
        match self.execute(Request::new(Opcode::Ping, "")).await? {
            Response::Str(_) => Ok(()),
            Response::Error(message) => Err(ClientError::Server(message).into()),
            _ => Err(ClientError::UnexpectedResponse.into()),
        }
    }

    async fn execute_ok(&self, request: Request) -> Result<()> {
        match self.execute(request).await? {
            Response::Ok => Ok(()),
            Response::Error(message) => Err(ClientError::Server(message).into()),
            _ => Err(ClientError::UnexpectedResponse.into()),
        }
    }

    async fn execute_str(&self, request: Request, nil_error: &'static str) -> Result<Bytes> {
        match self.execute(request).await? {
            Response::Str(value) => Ok(value),
            Response::Nil => Err(ClientError::NotFound(nil_error).into()),
            Response::Error(message) => Err(ClientError::Server(message).into()),
            _ => Err(ClientError::UnexpectedResponse.into()),
        }
    }

    async fn execute_int(&self, request: Request) -> Result<i64> {
        match self.execute(request).await? {
            Response::Int(value) => Ok(value),
            Response::Error(message) => Err(ClientError::Server(message).into()),
            _ => Err(ClientError::UnexpectedResponse.into()),
        }
    }

    async fn execute_bool(&self, request: Request) -> Result<bool> {
        self.execute_int(request).await.map(|value| value == 1)
    }

    async fn execute_array(&self, request: Request) -> Result<Vec<Bytes>> {
        match self.execute(request).await? {
            Response::Array(items) => Ok(items),
            Response::Error(message) => Err(ClientError::Server(message).into()),
            _ => Err(ClientError::UnexpectedResponse.into()),
        }
    }
}

fn new_pool(config: &ClientConfig, server: &str) -> Arc<Pool> {
    Arc::new(Pool::new(
        server.to_string(),
        config.max_conns_per_server,
        config.connect_timeout,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(servers: &[&str]) -> Client {
        Client::with_config(ClientConfig {
            servers: servers.iter().map(|s| s.to_string()).collect(),
            retry_attempts: 0,
            connect_timeout: Duration::from_millis(200),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn rejects_empty_server_list() {
        assert!(Client::new(vec![]).is_err());
    }

    #[tokio::test]
    async fn routing_fails_with_no_servers() {
        let client = test_client(&["127.0.0.1:1"]);
        client.remove_server("127.0.0.1:1");

        let err = client.get("key").await.err().unwrap();
        let err = err.downcast_ref::<ClientError>().unwrap();

        match err {
            ClientError::Exhausted { last_error, .. } => {
                assert_eq!(last_error, "no available servers");
            }
            other => panic!("expected exhausted error, got {other:?}"),
        }
    }

    #[test]
    fn membership_changes_keep_ring_and_pools_aligned() {
        let client = test_client(&["127.0.0.1:7411", "127.0.0.1:7412"]);

        client.add_server("127.0.0.1:7413");
        let shared = client.shared.read();
        assert_eq!(shared.ring.members().len(), 3);
        assert_eq!(shared.pools.len(), 3);
        drop(shared);

        client.remove_server("127.0.0.1:7412");
        let shared = client.shared.read();
        assert_eq!(shared.ring.members().len(), 2);
        assert_eq!(shared.pools.len(), 2);
        assert!(!shared.pools.contains_key("127.0.0.1:7412"));
    }

    #[test]
    fn add_server_is_idempotent() {
        let client = test_client(&["127.0.0.1:7411"]);
        client.add_server("127.0.0.1:7411");

        let shared = client.shared.read();
        assert_eq!(shared.ring.members().len(), 1);
        assert_eq!(shared.pools.len(), 1);
    }
}
