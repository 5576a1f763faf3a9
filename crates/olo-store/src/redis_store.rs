use crate::error::{Error, Result};
use crate::model::{
    normalize_rag_tag, sort_newest_first, BackendKind, Bucket, ClearOutcome, Conversation,
    Message, MessageRole,
};
use crate::store::ConversationStore;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Keys deleted per DEL while clearing
const CLEAR_BATCH: usize = 500;

/// Redis-backed conversation store
///
/// Key layout under the namespace `ns`:
/// - `ns:<bucket>:conv:<id>` conversation JSON
/// - `ns:<bucket>:msgs:<id>` list of message JSON, append order
/// - `ns:<bucket>:conv:ids` set of conversation ids in the bucket
/// - `ns:rag:tags` set of registered RAG tags
///
/// One multiplexed connection is opened on first use and shared by every
/// operation after that.
pub struct RedisStore {
    client: redis::Client,
    connection: OnceCell<MultiplexedConnection>,
    namespace: String,
}

impl RedisStore {
    /// Create a new Redis store
    ///
    /// # Errors
    ///
    /// Returns error if the Redis URL is invalid
    pub fn new(redis_url: &str, namespace: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::Redis(format!("Invalid Redis URL: {}", e)))?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
            namespace: namespace.to_string(),
        })
    }

    /// Connect and PING
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.get_connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| Error::Redis(format!("Redis PING failed: {}", e)))?;
        Ok(())
    }

    fn conv_key(&self, bucket: Bucket, id: &str) -> String {
        format!("{}:{}:conv:{}", self.namespace, bucket, id)
    }

    fn msgs_key(&self, bucket: Bucket, id: &str) -> String {
        format!("{}:{}:msgs:{}", self.namespace, bucket, id)
    }

    fn ids_key(&self, bucket: Bucket) -> String {
        format!("{}:{}:conv:ids", self.namespace, bucket)
    }

    fn tags_key(&self) -> String {
        format!("{}:rag:tags", self.namespace)
    }

    /// Shared connection, opened on first call
    ///
    /// A failed connect leaves the cell empty so the next call retries.
    async fn get_connection(&self) -> Result<MultiplexedConnection> {
        let conn = self
            .connection
            .get_or_try_init(|| async {
                self.client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| Error::Redis(format!("Redis connection failed: {}", e)))
            })
            .await?;
        Ok(conn.clone())
    }

    /// Locate a conversation: its bucket and stored record
    async fn find(
        &self,
        conn: &mut MultiplexedConnection,
        id: &str,
    ) -> Result<Option<(Bucket, Conversation)>> {
        for bucket in Bucket::ALL {
            let raw: Option<String> = redis::cmd("GET")
                .arg(self.conv_key(bucket, id))
                .query_async(conn)
                .await
                .map_err(|e| Error::Redis(format!("Redis GET failed: {}", e)))?;

            if let Some(json) = raw {
                return match serde_json::from_str::<Conversation>(&json) {
                    Ok(conv) => Ok(Some((bucket, conv))),
                    Err(e) => {
                        warn!(id = %id, bucket = %bucket, error = %e, "Skipping corrupt conversation record");
                        Ok(None)
                    }
                };
            }
        }
        Ok(None)
    }
}

fn parse_messages(raw: Vec<String>) -> Vec<Message> {
    raw.into_iter()
        .filter_map(|json| match serde_json::from_str(&json) {
            Ok(msg) => Some(msg),
            Err(e) => {
                warn!(error = %e, "Skipping corrupt message record");
                None
            }
        })
        .collect()
}

#[async_trait]
impl ConversationStore for RedisStore {
    async fn list_conversations(&self, bucket: Bucket) -> Result<Vec<Conversation>> {
        let mut conn = self.get_connection().await?;

        let ids: Vec<String> = redis::cmd("SMEMBERS")
            .arg(self.ids_key(bucket))
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Redis(format!("Redis SMEMBERS failed: {}", e)))?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| self.conv_key(bucket, id)).collect();
        let blobs: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Redis(format!("Redis MGET failed: {}", e)))?;

        let mut list: Vec<Conversation> = blobs
            .into_iter()
            .flatten()
            .filter_map(|json| serde_json::from_str::<Conversation>(&json).ok())
            .collect();
        sort_newest_first(&mut list);
        Ok(list)
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        let mut conn = self.get_connection().await?;
        Ok(self.find(&mut conn, id).await?.map(|(_, conv)| conv))
    }

    async fn create_conversation(
        &self,
        rag_tag: Option<&str>,
        pipeline_id: Option<&str>,
    ) -> Result<Conversation> {
        let mut conn = self.get_connection().await?;
        let conv = Conversation::new(rag_tag, pipeline_id);
        let json = serde_json::to_string(&conv)?;

        redis::pipe()
            .atomic()
            .cmd("SADD")
            .arg(self.ids_key(conv.bucket))
            .arg(&conv.id)
            .ignore()
            .cmd("SET")
            .arg(self.conv_key(conv.bucket, &conv.id))
            .arg(&json)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::Redis(format!("Redis create conversation failed: {}", e)))?;

        debug!(id = %conv.id, bucket = %conv.bucket, "Conversation created in Redis");
        Ok(conv)
    }

    async fn update_conversation_title(
        &self,
        id: &str,
        title: &str,
    ) -> Result<Option<Conversation>> {
        let mut conn = self.get_connection().await?;
        let Some((bucket, mut conv)) = self.find(&mut conn, id).await? else {
            return Ok(None);
        };

        conv.title = title.to_string();
        let json = serde_json::to_string(&conv)?;
        redis::cmd("SET")
            .arg(self.conv_key(bucket, id))
            .arg(&json)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::Redis(format!("Redis SET failed: {}", e)))?;

        Ok(Some(conv))
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let mut conn = self.get_connection().await?;

        let buckets: Vec<Bucket> = match self.find(&mut conn, conversation_id).await? {
            Some((bucket, _)) => vec![bucket],
            None => Bucket::ALL.to_vec(),
        };

        for bucket in buckets {
            let raw: Vec<String> = redis::cmd("LRANGE")
                .arg(self.msgs_key(bucket, conversation_id))
                .arg(0)
                .arg(-1)
                .query_async(&mut conn)
                .await
                .map_err(|e| Error::Redis(format!("Redis LRANGE failed: {}", e)))?;
            if !raw.is_empty() {
                return Ok(parse_messages(raw));
            }
        }
        Ok(Vec::new())
    }

    async fn add_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Option<Message>> {
        let mut conn = self.get_connection().await?;
        let Some((bucket, _)) = self.find(&mut conn, conversation_id).await? else {
            return Ok(None);
        };

        let message = Message::new(role, content);
        let json = serde_json::to_string(&message)?;
        redis::cmd("RPUSH")
            .arg(self.msgs_key(bucket, conversation_id))
            .arg(&json)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::Redis(format!("Redis RPUSH failed: {}", e)))?;

        Ok(Some(message))
    }

    async fn register_rag_tag(&self, tag: &str) -> Result<()> {
        let Some(tag) = normalize_rag_tag(Some(tag)) else {
            return Ok(());
        };
        let mut conn = self.get_connection().await?;
        redis::cmd("SADD")
            .arg(self.tags_key())
            .arg(tag)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::Redis(format!("Redis SADD failed: {}", e)))?;
        Ok(())
    }

    async fn list_rag_tags(&self) -> Result<Vec<String>> {
        let mut conn = self.get_connection().await?;
        let mut tags: Vec<String> = redis::cmd("SMEMBERS")
            .arg(self.tags_key())
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Redis(format!("Redis SMEMBERS failed: {}", e)))?;
        tags.sort();
        Ok(tags)
    }

    async fn delete_conversation(&self, id: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;

        for bucket in Bucket::ALL {
            let exists: i64 = redis::cmd("EXISTS")
                .arg(self.conv_key(bucket, id))
                .query_async(&mut conn)
                .await
                .map_err(|e| Error::Redis(format!("Redis EXISTS failed: {}", e)))?;
            if exists == 0 {
                continue;
            }

            redis::pipe()
                .atomic()
                .cmd("DEL")
                .arg(self.conv_key(bucket, id))
                .arg(self.msgs_key(bucket, id))
                .ignore()
                .cmd("SREM")
                .arg(self.ids_key(bucket))
                .arg(id)
                .ignore()
                .query_async::<()>(&mut conn)
                .await
                .map_err(|e| Error::Redis(format!("Redis delete conversation failed: {}", e)))?;

            debug!(id = %id, bucket = %bucket, "Conversation deleted from Redis");
            return Ok(true);
        }
        Ok(false)
    }

    async fn clear_all(&self) -> Result<ClearOutcome> {
        let mut conn = self.get_connection().await?;
        let pattern = format!("{}:*", self.namespace);

        let mut keys: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(CLEAR_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| Error::Redis(format!("Redis SCAN failed: {}", e)))?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        keys.sort();
        keys.dedup();

        let mut deleted: u64 = 0;
        for chunk in keys.chunks(CLEAR_BATCH) {
            let n: u64 = redis::cmd("DEL")
                .arg(chunk)
                .query_async(&mut conn)
                .await
                .map_err(|e| Error::Redis(format!("Redis DEL failed: {}", e)))?;
            deleted += n;
        }

        info!(namespace = %self.namespace, keys_deleted = deleted, "Cleared Redis store");
        Ok(ClearOutcome {
            cleared: true,
            keys_deleted: deleted,
        })
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Redis
    }
}
