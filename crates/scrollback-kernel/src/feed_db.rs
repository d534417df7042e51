//! SQLite persistence for conversation feeds.
//!
//! Messages live in one append-only table keyed by an `AUTOINCREMENT` rowid,
//! which doubles as the sequence id: strictly increasing, never reused, so
//! ordering within a conversation is just `ORDER BY seq`.
//!
//! Every window resolution runs inside one deferred read transaction, so the
//! page fetch and both existence probes see the same snapshot.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{debug, info};

use scrollback_types::{
    Conversation, ConversationId, FeedError, FeedResult, Message, SequenceId,
};

use crate::store::{Boundary, Direction, FeedStore, SnapshotReader};

const SCHEMA: &str = r#"
-- Conversation metadata
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

-- Messages (append-only, immutable)
CREATE TABLE IF NOT EXISTS messages (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id TEXT NOT NULL,
    author TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_messages_feed ON messages(conversation_id, seq);
"#;

/// Map a SQLite failure onto the feed taxonomy.
fn store_err(e: rusqlite::Error) -> FeedError {
    FeedError::unavailable(format!("sqlite: {e}"))
}

/// Database handle for feed persistence.
pub struct FeedDb {
    conn: Mutex<Connection>,
}

impl FeedDb {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> FeedResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(store_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(store_err)?;
        info!(path = %path.display(), "opened feed database");
        Self::init(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> FeedResult<Self> {
        Self::init(Connection::open_in_memory().map_err(store_err)?)
    }

    fn init(conn: Connection) -> FeedResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(store_err)?;
        conn.execute_batch(SCHEMA).map_err(store_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Get a conversation by ID.
    pub fn get_conversation(&self, id: ConversationId) -> FeedResult<Option<Conversation>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, created_at FROM conversations WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )
        .optional()
        .map_err(store_err)?
        .map(|(id, name, created_at)| row_to_conversation(&id, name, created_at))
        .transpose()
    }
}

fn conversation_exists(tx: &Transaction<'_>, id: ConversationId) -> FeedResult<bool> {
    tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM conversations WHERE id = ?1)",
        params![id.to_string()],
        |row| row.get(0),
    )
    .map_err(store_err)
}

fn row_to_conversation(id: &str, name: String, created_at: i64) -> FeedResult<Conversation> {
    let id = ConversationId::parse(id)
        .map_err(|e| FeedError::invariant(format!("stored conversation id {id:?}: {e}")))?;
    Ok(Conversation {
        id,
        name,
        created_at: created_at as u64,
    })
}

impl FeedStore for FeedDb {
    fn create_conversation(&self, name: &str) -> FeedResult<Conversation> {
        let conversation = Conversation::new(name);
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO conversations (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![
                conversation.id.to_string(),
                conversation.name,
                conversation.created_at as i64,
            ],
        )
        .map_err(store_err)?;
        debug!(conversation = %conversation.id, "created conversation");
        Ok(conversation)
    }

    fn list_conversations(&self) -> FeedResult<Vec<Conversation>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, name, created_at FROM conversations ORDER BY created_at DESC, id DESC")
            .map_err(store_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .map_err(store_err)?;

        let mut conversations = Vec::new();
        for row in rows {
            let (id, name, created_at) = row.map_err(store_err)?;
            conversations.push(row_to_conversation(&id, name, created_at)?);
        }
        Ok(conversations)
    }

    fn create_message(
        &self,
        conversation: ConversationId,
        author: &str,
        body: &str,
    ) -> FeedResult<Message> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(store_err)?;
        if !conversation_exists(&tx, conversation)? {
            return Err(FeedError::NotFound(conversation));
        }

        let created_at = scrollback_types::now_millis();
        tx.execute(
            "INSERT INTO messages (conversation_id, author, body, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![conversation.to_string(), author, body, created_at as i64],
        )
        .map_err(store_err)?;
        let rowid = tx.last_insert_rowid();
        tx.commit().map_err(store_err)?;

        let sequence_id = SequenceId::from_i64(rowid)
            .ok_or_else(|| FeedError::invariant(format!("sqlite assigned rowid {rowid}")))?;
        Ok(Message {
            conversation_id: conversation,
            sequence_id,
            author: author.to_string(),
            body: body.to_string(),
            created_at,
        })
    }

    fn read<R>(
        &self,
        conversation: ConversationId,
        f: impl FnOnce(&dyn SnapshotReader) -> FeedResult<R>,
    ) -> FeedResult<R> {
        let mut conn = self.conn.lock();
        // Deferred: the snapshot starts at the first read and lasts until commit.
        let tx = conn.transaction().map_err(store_err)?;
        if !conversation_exists(&tx, conversation)? {
            return Err(FeedError::NotFound(conversation));
        }

        let out = f(&SqliteReader { tx: &tx, conversation })?;
        tx.commit().map_err(store_err)?;
        Ok(out)
    }
}

/// Snapshot reader over an open read transaction.
struct SqliteReader<'a> {
    tx: &'a Transaction<'a>,
    conversation: ConversationId,
}

impl SqliteReader<'_> {
    fn row_to_message(&self, row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, String, i64)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }
}

impl SnapshotReader for SqliteReader<'_> {
    fn fetch_ordered(
        &self,
        boundary: Option<Boundary>,
        limit: u32,
        direction: Direction,
    ) -> FeedResult<Vec<Message>> {
        let conversation = self.conversation.to_string();
        // Operator and direction come from enums, never from caller text;
        // every value is bound as a parameter.
        let rows = match boundary {
            Some(b) => {
                let sql = format!(
                    "SELECT seq, author, body, created_at FROM messages
                     WHERE conversation_id = ?1 AND seq {} ?2
                     ORDER BY seq {} LIMIT ?3",
                    b.op.as_ref(),
                    direction.as_sql(),
                );
                let mut stmt = self.tx.prepare_cached(&sql).map_err(store_err)?;
                let rows = stmt
                    .query_map(params![conversation, b.value.as_i64(), limit], |row| {
                        self.row_to_message(row)
                    })
                    .map_err(store_err)?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(store_err)?;
                rows
            }
            None => {
                let sql = format!(
                    "SELECT seq, author, body, created_at FROM messages
                     WHERE conversation_id = ?1
                     ORDER BY seq {} LIMIT ?2",
                    direction.as_sql(),
                );
                let mut stmt = self.tx.prepare_cached(&sql).map_err(store_err)?;
                let rows = stmt
                    .query_map(params![conversation, limit], |row| self.row_to_message(row))
                    .map_err(store_err)?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(store_err)?;
                rows
            }
        };

        rows.into_iter()
            .map(|(seq, author, body, created_at)| {
                let sequence_id = SequenceId::from_i64(seq).ok_or_else(|| {
                    FeedError::invariant(format!("stored sequence id {seq} out of range"))
                })?;
                Ok(Message {
                    conversation_id: self.conversation,
                    sequence_id,
                    author,
                    body,
                    created_at: created_at as u64,
                })
            })
            .collect()
    }

    fn exists_beyond(&self, boundary: Boundary) -> FeedResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM messages WHERE conversation_id = ?1 AND seq {} ?2 LIMIT 1)",
            boundary.op.as_ref(),
        );
        self.tx
            .prepare_cached(&sql)
            .and_then(|mut stmt| {
                stmt.query_row(
                    params![self.conversation.to_string(), boundary.value.as_i64()],
                    |row| row.get(0),
                )
            })
            .map_err(store_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(n: u64) -> SequenceId {
        SequenceId::new(n).unwrap()
    }

    fn seqs(messages: &[Message]) -> Vec<u64> {
        messages.iter().map(|m| m.sequence_id.get()).collect()
    }

    #[test]
    fn test_conversation_crud() {
        let db = FeedDb::in_memory().unwrap();
        let conv = db.create_conversation("Test Chat").unwrap();

        let loaded = db.get_conversation(conv.id).unwrap().unwrap();
        assert_eq!(loaded, conv);
        assert!(db.get_conversation(ConversationId::new()).unwrap().is_none());

        let all = db.list_conversations().unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_messages_append_with_increasing_seq() {
        let db = FeedDb::in_memory().unwrap();
        let conv = db.create_conversation("chat").unwrap();

        let m1 = db.create_message(conv.id, "amy", "first").unwrap();
        let m2 = db.create_message(conv.id, "claude", "second").unwrap();
        assert!(m2.sequence_id > m1.sequence_id);
        assert_eq!(m2.body, "second");
    }

    #[test]
    fn test_seq_is_shared_across_conversations_but_ordered_within() {
        let db = FeedDb::in_memory().unwrap();
        let a = db.create_conversation("a").unwrap();
        let b = db.create_conversation("b").unwrap();

        db.create_message(a.id, "amy", "a1").unwrap();
        db.create_message(b.id, "amy", "b1").unwrap();
        db.create_message(a.id, "amy", "a2").unwrap();

        let in_a = db
            .read(a.id, |r| r.fetch_ordered(None, 10, Direction::NewestFirst))
            .unwrap();
        assert_eq!(seqs(&in_a), vec![3, 1]);
        assert!(in_a.iter().all(|m| m.conversation_id == a.id));
    }

    #[test]
    fn test_fetch_and_probe() {
        let db = FeedDb::in_memory().unwrap();
        let conv = db.create_conversation("chat").unwrap();
        for i in 0..10 {
            db.create_message(conv.id, "amy", &format!("m{i}")).unwrap();
        }

        db.read(conv.id, |r| {
            let page = r.fetch_ordered(Some(Boundary::older_than(seq(6))), 3, Direction::NewestFirst)?;
            assert_eq!(seqs(&page), vec![5, 4, 3]);

            let page = r.fetch_ordered(None, 2, Direction::OldestFirst)?;
            assert_eq!(seqs(&page), vec![1, 2]);

            assert!(r.exists_beyond(Boundary::older_than(seq(2)))?);
            assert!(!r.exists_beyond(Boundary::older_than(seq(1)))?);
            assert!(r.exists_beyond(Boundary::at_or_newer(seq(10)))?);
            assert!(!r.exists_beyond(Boundary::newer_than(seq(10)))?);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_unknown_conversation_is_not_found() {
        let db = FeedDb::in_memory().unwrap();
        let missing = ConversationId::new();

        let err = db.create_message(missing, "amy", "hi").unwrap_err();
        assert_eq!(err, FeedError::NotFound(missing));

        let err = db.read(missing, |_| Ok(())).unwrap_err();
        assert_eq!(err, FeedError::NotFound(missing));
    }

    #[test]
    fn test_reopen_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.db");

        let conv = {
            let db = FeedDb::open(&path).unwrap();
            let conv = db.create_conversation("persisted").unwrap();
            db.create_message(conv.id, "amy", "still here").unwrap();
            conv
        };

        let db = FeedDb::open(&path).unwrap();
        let messages = db
            .read(conv.id, |r| r.fetch_ordered(None, 10, Direction::NewestFirst))
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, "still here");
    }
}
