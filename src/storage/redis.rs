use super::{DEFAULT_STORE_TIMEOUT, MAX_TTL, RouteStore, SetNxOutcome, StoreError, StoreResult, bounded};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;

// Returns 1 when deleted, 0 when absent, -1 when the key holds another value.
const DEL_IF_SAME_SCRIPT: &str = r#"
local current = redis.call("GET", KEYS[1])
if not current then
    return 0
end
if current == ARGV[1] then
    redis.call("DEL", KEYS[1])
    return 1
end
return -1
"#;

/// `RouteStore` backed by Redis (6.2 or newer for `GETEX` and `SET .. GET`).
///
/// Each operation is one round trip: conditional create runs as a
/// `MULTI`/`EXEC` block and compare-and-delete as a server-side script.
#[derive(Clone)]
pub struct RedisRouteStore {
    conn: ConnectionManager,
    timeout: Duration,
    del_if_same: redis::Script,
}

impl RedisRouteStore {
    /// Connects to `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url).map_err(|err| backend("Connect", url, err))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|err| backend("Connect", url, err))?;
        Ok(Self::new(conn))
    }

    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            timeout: DEFAULT_STORE_TIMEOUT,
            del_if_same: redis::Script::new(DEL_IF_SAME_SCRIPT),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn backend(operation: &'static str, key: &str, err: redis::RedisError) -> StoreError {
    StoreError::Backend {
        operation,
        key: key.to_string(),
        reason: err.to_string(),
    }
}

fn millis(ttl: Duration) -> u64 {
    // PX 0 is rejected by the server; the shortest expiry it accepts is 1ms.
    u64::try_from(ttl.min(MAX_TTL).as_millis())
        .unwrap_or(u64::MAX)
        .max(1)
}

#[async_trait]
impl RouteStore for RedisRouteStore {
    async fn load(&self, key: &str) -> StoreResult<String> {
        let mut conn = self.conn.clone();
        bounded("Load", key, self.timeout, async {
            let value: Option<String> = redis::cmd("GET")
                .arg(key)
                .query_async(&mut conn)
                .await
                .map_err(|err| backend("Load", key, err))?;
            value.ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
        })
        .await
    }

    async fn load_and_expire(&self, key: &str, ttl: Duration) -> StoreResult<String> {
        let mut conn = self.conn.clone();
        bounded("LoadAndExpire", key, self.timeout, async {
            let value: Option<String> = redis::cmd("GETEX")
                .arg(key)
                .arg("PX")
                .arg(millis(ttl))
                .query_async(&mut conn)
                .await
                .map_err(|err| backend("LoadAndExpire", key, err))?;
            value.ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
        })
        .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        bounded("Set", key, self.timeout, async {
            let _: () = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("PX")
                .arg(millis(ttl))
                .query_async(&mut conn)
                .await
                .map_err(|err| backend("Set", key, err))?;
            Ok(())
        })
        .await
    }

    async fn get_set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        bounded("GetSet", key, self.timeout, async {
            let previous: Option<String> = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("PX")
                .arg(millis(ttl))
                .arg("GET")
                .query_async(&mut conn)
                .await
                .map_err(|err| backend("GetSet", key, err))?;
            Ok(previous)
        })
        .await
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<SetNxOutcome> {
        let mut conn = self.conn.clone();
        bounded("SetNx", key, self.timeout, async {
            let (set, current): (Option<String>, Option<String>) = redis::pipe()
                .atomic()
                .cmd("SET")
                .arg(key)
                .arg(value)
                .arg("NX")
                .arg("PX")
                .arg(millis(ttl))
                .cmd("GET")
                .arg(key)
                .query_async(&mut conn)
                .await
                .map_err(|err| backend("SetNx", key, err))?;
            let current = current.ok_or_else(|| StoreError::Backend {
                operation: "SetNx",
                key: key.to_string(),
                reason: "key missing right after conditional set".to_string(),
            })?;
            Ok(SetNxOutcome {
                created: set.is_some(),
                current,
            })
        })
        .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        bounded("Expire", key, self.timeout, async {
            let _: i64 = redis::cmd("PEXPIRE")
                .arg(key)
                .arg(millis(ttl))
                .query_async(&mut conn)
                .await
                .map_err(|err| backend("Expire", key, err))?;
            Ok(())
        })
        .await
    }

    async fn del_if_same(&self, key: &str, expected: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        bounded("DelIfSame", key, self.timeout, async {
            let result: i64 = self
                .del_if_same
                .key(key)
                .arg(expected)
                .invoke_async(&mut conn)
                .await
                .map_err(|err| backend("DelIfSame", key, err))?;
            match result {
                1 => Ok(()),
                0 => Err(StoreError::NotFound {
                    key: key.to_string(),
                }),
                _ => Err(StoreError::ValueMismatch {
                    key: key.to_string(),
                    expected: expected.to_string(),
                }),
            }
        })
        .await
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        bounded("Del", key, self.timeout, async {
            let _: i64 = redis::cmd("DEL")
                .arg(key)
                .query_async(&mut conn)
                .await
                .map_err(|err| backend("Del", key, err))?;
            Ok(())
        })
        .await
    }
}
