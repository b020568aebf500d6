// SPDX-FileCopyrightText: 2026 Sendq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session persistence: full-snapshot save, load, list, delete.
//!
//! A session is saved as one `send_sessions` row plus its `queue_items`
//! rows keyed by position. Save replaces the whole snapshot in one
//! transaction, which keeps the store trivially consistent with the
//! engine's write-after-every-outcome model.

use std::str::FromStr;

use rusqlite::{params, types::Type};
use sendq_core::{ItemStatus, Priority, QueueItem, SendqError, Session};

use crate::database::Database;

/// Persist the full session snapshot, replacing any previous one.
pub async fn save_session(db: &Database, session: &Session) -> Result<(), SendqError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR REPLACE INTO send_sessions (id, created_at, cursor, paused, send_speed_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    session.id,
                    session.created_at,
                    session.cursor as i64,
                    session.paused,
                    session.send_speed_ms as i64,
                ],
            )?;
            tx.execute(
                "DELETE FROM queue_items WHERE session_id = ?1",
                params![session.id],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO queue_items
                     (session_id, position, recipient, body, priority, status,
                      attempt_count, campaign_id, variant_id, last_error)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                )?;
                for (position, item) in session.items.iter().enumerate() {
                    stmt.execute(params![
                        session.id,
                        position as i64,
                        item.recipient,
                        item.body,
                        item.priority.to_string(),
                        item.status.to_string(),
                        item.attempt_count as i64,
                        item.campaign_id,
                        item.variant_id,
                        item.last_error,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Load a session by id, with its items in send order.
pub async fn load_session(db: &Database, id: &str) -> Result<Option<Session>, SendqError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let row = conn.query_row(
                "SELECT id, created_at, cursor, paused, send_speed_ms
                 FROM send_sessions WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            );
            let (id, created_at, cursor, paused, send_speed_ms) = match row {
                Ok(r) => r,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let items = load_items(conn, &id)?;
            Ok(Some(Session {
                id,
                created_at,
                items,
                cursor: cursor as usize,
                paused,
                send_speed_ms: send_speed_ms as u64,
            }))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List sessions that still have non-terminal items, oldest first.
pub async fn list_incomplete_sessions(db: &Database) -> Result<Vec<Session>, SendqError> {
    db.connection()
        .call(move |conn| {
            let ids: Vec<String> = {
                let mut stmt = conn.prepare(
                    "SELECT s.id FROM send_sessions s
                     WHERE EXISTS (
                         SELECT 1 FROM queue_items qi
                         WHERE qi.session_id = s.id
                           AND qi.status NOT IN ('sent', 'exhausted')
                     )
                     ORDER BY s.created_at ASC",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                let mut ids = Vec::new();
                for row in rows {
                    ids.push(row?);
                }
                ids
            };

            let mut sessions = Vec::new();
            for id in ids {
                let (created_at, cursor, paused, send_speed_ms) = conn.query_row(
                    "SELECT created_at, cursor, paused, send_speed_ms
                     FROM send_sessions WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, bool>(2)?,
                            row.get::<_, i64>(3)?,
                        ))
                    },
                )?;
                let items = load_items(conn, &id)?;
                sessions.push(Session {
                    id,
                    created_at,
                    items,
                    cursor: cursor as usize,
                    paused,
                    send_speed_ms: send_speed_ms as u64,
                });
            }
            Ok(sessions)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a session; its items go with it via FK cascade.
pub async fn delete_session(db: &Database, id: &str) -> Result<(), SendqError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM send_sessions WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn load_items(conn: &rusqlite::Connection, session_id: &str) -> rusqlite::Result<Vec<QueueItem>> {
    let mut stmt = conn.prepare(
        "SELECT recipient, body, priority, status, attempt_count,
                campaign_id, variant_id, last_error
         FROM queue_items WHERE session_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![session_id], |row| {
        let priority_text: String = row.get(2)?;
        let status_text: String = row.get(3)?;
        Ok(QueueItem {
            recipient: row.get(0)?,
            body: row.get(1)?,
            priority: Priority::from_str(&priority_text).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
            })?,
            status: ItemStatus::from_str(&status_text).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e))
            })?,
            attempt_count: row.get::<_, i64>(4)? as u32,
            campaign_id: row.get(5)?,
            variant_id: row.get(6)?,
            last_error: row.get(7)?,
        })
    })?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_session() -> Session {
        Session::new(
            vec![
                QueueItem::new("+15550100", "hello a", Priority::Normal),
                QueueItem::new("+15550101", "hello b", Priority::Urgent)
                    .with_campaign("spring", Some("b".to_string())),
            ],
            1000,
        )
    }

    #[tokio::test]
    async fn save_and_load_round_trips() {
        let (db, _dir) = setup_db().await;
        let session = make_session();

        save_session(&db, &session).await.unwrap();
        let loaded = load_session(&db, &session.id).await.unwrap().unwrap();
        assert_eq!(loaded, session);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn load_nonexistent_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(load_session(&db, "no-such-id").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn save_replaces_previous_snapshot() {
        let (db, _dir) = setup_db().await;
        let mut session = make_session();
        save_session(&db, &session).await.unwrap();

        session.items[0].status = ItemStatus::Sent;
        session.cursor = 1;
        save_session(&db, &session).await.unwrap();

        let loaded = load_session(&db, &session.id).await.unwrap().unwrap();
        assert_eq!(loaded.cursor, 1);
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items[0].status, ItemStatus::Sent);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_incomplete_excludes_fully_terminal_sessions() {
        let (db, _dir) = setup_db().await;

        let mut done = make_session();
        done.items[0].status = ItemStatus::Sent;
        done.items[1].status = ItemStatus::Exhausted;
        done.cursor = 2;
        save_session(&db, &done).await.unwrap();

        let in_progress = make_session();
        save_session(&db, &in_progress).await.unwrap();

        let incomplete = list_incomplete_sessions(&db).await.unwrap();
        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].id, in_progress.id);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_cascades_to_items() {
        let (db, _dir) = setup_db().await;
        let session = make_session();
        save_session(&db, &session).await.unwrap();

        delete_session(&db, &session.id).await.unwrap();
        assert!(load_session(&db, &session.id).await.unwrap().is_none());

        let orphan_count: i64 = db
            .connection()
            .call({
                let id = session.id.clone();
                move |conn| {
                    Ok::<_, rusqlite::Error>(conn.query_row(
                        "SELECT COUNT(*) FROM queue_items WHERE session_id = ?1",
                        params![id],
                        |row| row.get(0),
                    )?)
                }
            })
            .await
            .unwrap();
        assert_eq!(orphan_count, 0);

        db.close().await.unwrap();
    }
}
