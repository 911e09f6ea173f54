//! Document persistence
//!
//! Rows carry content, opaque JSON metadata, an optional vector BLOB and the
//! embedding lifecycle status. Every upsert also links the document into the
//! triples table as `(id, "is_document", id)` in the same transaction.
//!
//! Status transitions out of `processing` are conditional on the row still
//! being `processing`, so a re-insert that lands while a drain is embedding
//! the old content is never overwritten by the stale vector.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde_json::{Map, Value};
use tessera_config::MatchPolicy;
use tessera_core::similarity::{decode_vector, encode_vector};
use tessera_core::tokenizer::search_text;
use tessera_core::{
    Document, DocumentInput, EmbeddingStatus, QueryResult, TesseraResult, Tokenizer,
    SELF_LINK_PREDICATE,
};
use tracing::{debug, info, warn};

use crate::connection::SqlitePool;
use crate::error::{SqliteError, SqliteResult};
use crate::graph::insert_triple;
use crate::schema::TableNames;
use crate::timestamp;

const DOCUMENT_COLUMNS: &str =
    "id, content, metadata, vector, status, revision, last_error, created_at, updated_at";

/// A validated document plus what ingestion decided about its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentWrite {
    /// The document
    pub input: DocumentInput,
    /// Embedding, if already computed
    pub vector: Option<Vec<f32>>,
    /// Status to store
    pub status: EmbeddingStatus,
}

impl DocumentWrite {
    /// Row awaiting a drain pass; empty documents have nothing to embed and
    /// are stored `completed`
    pub fn pending(input: DocumentInput) -> Self {
        let status = if input.has_content() {
            EmbeddingStatus::Pending
        } else {
            EmbeddingStatus::Completed
        };
        Self {
            input,
            vector: None,
            status,
        }
    }

    /// Row whose embedding was computed inline (`None` for empty content)
    pub fn embedded(input: DocumentInput, vector: Option<Vec<f32>>) -> Self {
        Self {
            input,
            vector,
            status: EmbeddingStatus::Completed,
        }
    }
}

/// Number of documents in each status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    /// Waiting for a drain
    pub pending: u64,
    /// Claimed by a drain
    pub processing: u64,
    /// Embedded
    pub completed: u64,
    /// Embedding failed
    pub failed: u64,
}

impl StatusCounts {
    /// All documents
    pub fn total(&self) -> u64 {
        self.pending + self.processing + self.completed + self.failed
    }

    fn slot(&mut self, status: EmbeddingStatus) -> &mut u64 {
        match status {
            EmbeddingStatus::Pending => &mut self.pending,
            EmbeddingStatus::Processing => &mut self.processing,
            EmbeddingStatus::Completed => &mut self.completed,
            EmbeddingStatus::Failed => &mut self.failed,
        }
    }
}

/// A document whose search text matched some query terms
#[derive(Debug, Clone, PartialEq)]
pub struct TextMatch {
    /// The document, unscored
    pub hit: QueryResult,
    /// How many distinct terms it contains
    pub matched: usize,
}

/// Document table access
#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
    tokenizer: Option<Arc<dyn Tokenizer>>,
}

impl DocumentStore {
    /// Store indexing raw lower-cased content
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            tokenizer: None,
        }
    }

    /// Builder-style: segment content with `tokenizer` before indexing
    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Tokenizer applied to stored content, if any
    pub fn tokenizer(&self) -> Option<&dyn Tokenizer> {
        self.tokenizer.as_deref()
    }

    /// Underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or replace `rows` and their self-links in one transaction
    ///
    /// Replacing bumps `revision` and keeps `created_at`.
    pub async fn upsert_batch(&self, rows: Vec<DocumentWrite>) -> TesseraResult<Vec<String>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let prepared = rows
            .into_iter()
            .map(|row| -> SqliteResult<PreparedRow> {
                let search = search_text(self.tokenizer(), &row.input.content);
                let metadata = serde_json::to_string(&row.input.metadata)?;
                Ok(PreparedRow {
                    search,
                    metadata,
                    vector: row.vector.as_deref().map(encode_vector),
                    status: row.status,
                    input: row.input,
                })
            })
            .collect::<SqliteResult<Vec<_>>>()?;

        let ids = self
            .pool
            .interact(move |conn, tables| {
                let now = timestamp::now();
                let tx = conn.transaction()?;
                let mut ids = Vec::with_capacity(prepared.len());
                {
                    let sql = format!(
                        "INSERT INTO {} (id, content, search_text, metadata, vector, status,
                                         revision, last_error, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, NULL, ?7, ?7)
                         ON CONFLICT(id) DO UPDATE SET
                             content = excluded.content,
                             search_text = excluded.search_text,
                             metadata = excluded.metadata,
                             vector = excluded.vector,
                             status = excluded.status,
                             revision = revision + 1,
                             last_error = NULL,
                             updated_at = excluded.updated_at",
                        tables.documents
                    );
                    let mut stmt = tx.prepare_cached(&sql)?;
                    for row in &prepared {
                        stmt.execute(params![
                            row.input.id,
                            row.input.content,
                            row.search,
                            row.metadata,
                            row.vector,
                            row.status.as_str(),
                            now,
                        ])?;
                        insert_triple(
                            &tx,
                            &tables.triples,
                            &row.input.id,
                            SELF_LINK_PREDICATE,
                            &row.input.id,
                            &now,
                        )?;
                        ids.push(row.input.id.clone());
                    }
                }
                tx.commit()?;
                Ok(ids)
            })
            .await?;

        info!(count = ids.len(), "Upserted documents");
        Ok(ids)
    }

    /// Fetch one document
    pub async fn get(&self, id: &str) -> TesseraResult<Option<Document>> {
        let id = id.to_string();
        let doc = self
            .pool
            .interact(move |conn, tables| fetch_document(conn, tables, &id))
            .await?;
        Ok(doc)
    }

    /// Fetch several documents in the order given, skipping unknown and
    /// repeated ids
    pub async fn get_many(&self, ids: &[String]) -> TesseraResult<Vec<Document>> {
        let mut seen = HashSet::new();
        let ids: Vec<String> = ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        let docs = self
            .pool
            .interact(move |conn, tables| {
                let mut docs = Vec::with_capacity(ids.len());
                for id in &ids {
                    if let Some(doc) = fetch_document(conn, tables, id)? {
                        docs.push(doc);
                    }
                }
                Ok(docs)
            })
            .await?;
        Ok(docs)
    }

    /// Number of documents per status
    pub async fn count_by_status(&self) -> TesseraResult<StatusCounts> {
        let counts = self
            .pool
            .interact(|conn, tables| {
                let sql = format!(
                    "SELECT status, COUNT(*) FROM {} GROUP BY status",
                    tables.documents
                );
                let mut stmt = conn.prepare_cached(&sql)?;
                let mut rows = stmt.query([])?;
                let mut counts = StatusCounts::default();
                while let Some(row) = rows.next()? {
                    let status: String = row.get(0)?;
                    let n: i64 = row.get(1)?;
                    *counts.slot(parse_status(&status)?) = u64::try_from(n).unwrap_or(0);
                }
                Ok(counts)
            })
            .await?;
        Ok(counts)
    }

    /// Atomically move up to `limit` of the oldest claimable rows to `processing`
    ///
    /// Claimable rows are `pending` ones plus `processing` ones untouched for
    /// longer than `lease`, which a drain abandoned part-way. Reclaiming
    /// refreshes `updated_at`, starting a new lease.
    pub async fn claim_pending(&self, limit: usize, lease: Duration) -> TesseraResult<Vec<Document>> {
        let limit = sql_limit(limit);
        let claimed = self
            .pool
            .interact(move |conn, tables| {
                let now = timestamp::now();
                let expired = timestamp::ago(lease);
                let tx = conn.transaction()?;
                let rows: Vec<(String, String)> = {
                    let sql = format!(
                        "SELECT id, status FROM {}
                         WHERE status = ?1 OR (status = ?2 AND updated_at <= ?3)
                         ORDER BY updated_at, id LIMIT ?4",
                        tables.documents
                    );
                    let mut stmt = tx.prepare_cached(&sql)?;
                    let rows = stmt.query_map(
                        params![
                            EmbeddingStatus::Pending.as_str(),
                            EmbeddingStatus::Processing.as_str(),
                            expired,
                            limit
                        ],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )?;
                    rows.collect::<Result<_, _>>()?
                };

                let mut claimed = Vec::with_capacity(rows.len());
                for (id, status) in &rows {
                    let from = parse_status(status)?;
                    if from == EmbeddingStatus::Processing {
                        warn!(%id, "Reclaiming document abandoned by an earlier drain");
                    }
                    transition(&tx, tables, id, from, EmbeddingStatus::Processing, &now)?;
                    if let Some(doc) = fetch_document(&tx, tables, id)? {
                        claimed.push(doc);
                    }
                }
                tx.commit()?;
                Ok(claimed)
            })
            .await?;

        debug!(claimed = claimed.len(), "Claimed pending documents");
        Ok(claimed)
    }

    /// `processing -> completed` with the computed vector
    ///
    /// Returns false if the row is no longer `processing`.
    pub async fn mark_completed(&self, id: &str, vector: &[f32]) -> TesseraResult<bool> {
        let id = id.to_string();
        let blob = encode_vector(vector);
        let updated = self
            .pool
            .interact(move |conn, tables| {
                let sql = format!(
                    "UPDATE {} SET vector = ?2, status = ?3, last_error = NULL, updated_at = ?4
                     WHERE id = ?1 AND status = ?5",
                    tables.documents
                );
                let n = conn.prepare_cached(&sql)?.execute(params![
                    id,
                    blob,
                    EmbeddingStatus::Completed.as_str(),
                    timestamp::now(),
                    EmbeddingStatus::Processing.as_str(),
                ])?;
                Ok(n > 0)
            })
            .await?;
        Ok(updated)
    }

    /// `processing -> failed`, recording `reason`
    ///
    /// Returns false if the row is no longer `processing`.
    pub async fn mark_failed(&self, id: &str, reason: &str) -> TesseraResult<bool> {
        let id = id.to_string();
        let reason = reason.to_string();
        let updated = self
            .pool
            .interact(move |conn, tables| {
                let sql = format!(
                    "UPDATE {} SET status = ?2, last_error = ?3, updated_at = ?4
                     WHERE id = ?1 AND status = ?5",
                    tables.documents
                );
                let n = conn.prepare_cached(&sql)?.execute(params![
                    id,
                    EmbeddingStatus::Failed.as_str(),
                    reason,
                    timestamp::now(),
                    EmbeddingStatus::Processing.as_str(),
                ])?;
                Ok(n > 0)
            })
            .await?;
        Ok(updated)
    }

    /// Documents whose search text contains the given lower-cased terms
    ///
    /// With [`MatchPolicy::All`] every term must occur; with
    /// [`MatchPolicy::Any`] at least one. Ordered by matched-term count
    /// descending, then id.
    pub async fn search_text_matches(
        &self,
        terms: &[String],
        policy: MatchPolicy,
        limit: usize,
    ) -> TesseraResult<Vec<TextMatch>> {
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let min_matched = match policy {
            MatchPolicy::All => terms.len(),
            MatchPolicy::Any => 1,
        };
        let mut values: Vec<SqlValue> = terms.iter().cloned().map(SqlValue::Text).collect();
        values.push(SqlValue::Integer(sql_limit(min_matched)));
        values.push(SqlValue::Integer(sql_limit(limit)));
        let term_count = terms.len();

        let matches = self
            .pool
            .interact(move |conn, tables| {
                let matched_expr = (1..=term_count)
                    .map(|i| format!("(instr(search_text, ?{i}) > 0)"))
                    .collect::<Vec<_>>()
                    .join(" + ");
                let sql = format!(
                    "SELECT id, content, metadata, matched FROM (
                         SELECT id, content, metadata, ({matched_expr}) AS matched FROM {}
                     )
                     WHERE matched >= ?{min}
                     ORDER BY matched DESC, id ASC
                     LIMIT ?{lim}",
                    tables.documents,
                    min = term_count + 1,
                    lim = term_count + 2,
                );
                let mut stmt = conn.prepare_cached(&sql)?;
                let mut rows = stmt.query(params_from_iter(values.iter()))?;
                let mut matches = Vec::new();
                while let Some(row) = rows.next()? {
                    let matched: i64 = row.get(3)?;
                    matches.push(TextMatch {
                        hit: read_hit(row, 0.0)?,
                        matched: usize::try_from(matched).unwrap_or(0),
                    });
                }
                Ok(matches)
            })
            .await?;
        Ok(matches)
    }

    /// `completed` documents ranked by cosine similarity to `query`
    ///
    /// With `threshold > 0`, rows whose distance `1 - similarity` exceeds
    /// `1 - threshold` are dropped.
    pub async fn nearest(
        &self,
        query: &[f32],
        limit: usize,
        threshold: Option<f32>,
    ) -> TesseraResult<Vec<QueryResult>> {
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let blob = encode_vector(query);
        let threshold = f64::from(threshold.unwrap_or(0.0));
        let limit = sql_limit(limit);

        let hits = self
            .pool
            .interact(move |conn, tables| {
                let sql = format!(
                    "SELECT id, content, metadata, similarity FROM (
                         SELECT id, content, metadata,
                                cosine_similarity(vector, ?1) AS similarity
                         FROM {}
                         WHERE status = ?2 AND vector IS NOT NULL
                     )
                     WHERE ?3 <= 0 OR 1.0 - similarity <= 1.0 - ?3
                     ORDER BY similarity DESC, id ASC
                     LIMIT ?4",
                    tables.documents
                );
                let mut stmt = conn.prepare_cached(&sql)?;
                let mut rows = stmt.query(params![
                    blob,
                    EmbeddingStatus::Completed.as_str(),
                    threshold,
                    limit
                ])?;
                let mut hits = Vec::new();
                while let Some(row) = rows.next()? {
                    let similarity: f64 = row.get(3)?;
                    hits.push(read_hit(row, similarity)?);
                }
                Ok(hits)
            })
            .await?;
        Ok(hits)
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("pool", &self.pool)
            .field("tokenizer", &self.tokenizer.is_some())
            .finish()
    }
}

struct PreparedRow {
    input: DocumentInput,
    search: String,
    metadata: String,
    vector: Option<Vec<u8>>,
    status: EmbeddingStatus,
}

fn sql_limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn transition(
    conn: &Connection,
    tables: &TableNames,
    id: &str,
    from: EmbeddingStatus,
    to: EmbeddingStatus,
    now: &str,
) -> SqliteResult<bool> {
    let sql = format!(
        "UPDATE {} SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status = ?4",
        tables.documents
    );
    let n = conn
        .prepare_cached(&sql)?
        .execute(params![id, to.as_str(), now, from.as_str()])?;
    Ok(n > 0)
}

fn fetch_document(conn: &Connection, tables: &TableNames, id: &str) -> SqliteResult<Option<Document>> {
    let sql = format!(
        "SELECT {DOCUMENT_COLUMNS} FROM {} WHERE id = ?1",
        tables.documents
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => Ok(Some(read_document(row)?)),
        None => Ok(None),
    }
}

fn read_document(row: &Row<'_>) -> SqliteResult<Document> {
    let metadata: String = row.get(2)?;
    let vector: Option<Vec<u8>> = row.get(3)?;
    let status: String = row.get(4)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    let vector = match vector {
        Some(bytes) => Some(decode_vector(&bytes).ok_or_else(|| {
            SqliteError::Serialization("vector blob length is not a multiple of 4".into())
        })?),
        None => None,
    };

    Ok(Document {
        id: row.get(0)?,
        content: row.get(1)?,
        metadata: parse_metadata(&metadata)?,
        vector,
        status: parse_status(&status)?,
        revision: row.get(5)?,
        last_error: row.get(6)?,
        created_at: timestamp::decode(&created_at)?,
        updated_at: timestamp::decode(&updated_at)?,
    })
}

/// `id, content, metadata` projected into a result
fn read_hit(row: &Row<'_>, score: f64) -> SqliteResult<QueryResult> {
    let metadata: String = row.get(2)?;
    Ok(QueryResult {
        id: row.get(0)?,
        content: row.get(1)?,
        metadata: parse_metadata(&metadata)?,
        score,
    })
}

fn parse_metadata(text: &str) -> SqliteResult<Map<String, Value>> {
    Ok(serde_json::from_str(text)?)
}

fn parse_status(text: &str) -> SqliteResult<EmbeddingStatus> {
    text.parse()
        .map_err(|e: tessera_core::TesseraError| SqliteError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> DocumentStore {
        DocumentStore::new(SqlitePool::memory().unwrap())
    }

    const LEASE: Duration = Duration::from_secs(300);

    fn doc(id: &str, content: &str) -> DocumentInput {
        DocumentInput::new(id, content)
    }

    #[tokio::test]
    async fn upsert_then_get() {
        let store = store();
        let input = doc("a", "Hello World").with_meta("source", "wiki");
        store
            .upsert_batch(vec![DocumentWrite::embedded(input, Some(vec![1.0, 2.0]))])
            .await
            .unwrap();

        let stored = store.get("a").await.unwrap().unwrap();
        assert_eq!(stored.content, "Hello World");
        assert_eq!(stored.metadata["source"], json!("wiki"));
        assert_eq!(stored.vector, Some(vec![1.0, 2.0]));
        assert_eq!(stored.status, EmbeddingStatus::Completed);
        assert_eq!(stored.revision, 1);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reinsert_bumps_revision_and_resets_status() {
        let store = store();
        store
            .upsert_batch(vec![DocumentWrite::embedded(doc("a", "v1"), Some(vec![1.0]))])
            .await
            .unwrap();
        let first = store.get("a").await.unwrap().unwrap();

        store
            .upsert_batch(vec![DocumentWrite::pending(doc("a", "v2"))])
            .await
            .unwrap();
        let second = store.get("a").await.unwrap().unwrap();

        assert_eq!(second.revision, 2);
        assert_eq!(second.content, "v2");
        assert_eq!(second.status, EmbeddingStatus::Pending);
        assert_eq!(second.vector, None);
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn upsert_creates_self_links() {
        let store = store();
        store
            .upsert_batch(vec![DocumentWrite::pending(doc("a", ""))])
            .await
            .unwrap();

        let linked = store
            .pool()
            .interact(|conn, tables| {
                let n: i64 = conn.query_row(
                    &format!(
                        "SELECT COUNT(*) FROM {} WHERE subject = 'a' AND predicate = ?1 AND object = 'a'",
                        tables.triples
                    ),
                    [SELF_LINK_PREDICATE],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .await
            .unwrap();
        assert_eq!(linked, 1);
    }

    #[tokio::test]
    async fn empty_content_is_never_pending() {
        let row = DocumentWrite::pending(doc("a", ""));
        assert_eq!(row.status, EmbeddingStatus::Completed);
        assert_eq!(DocumentWrite::pending(doc("b", "x")).status, EmbeddingStatus::Pending);
    }

    #[tokio::test]
    async fn get_many_keeps_order_and_skips_missing() {
        let store = store();
        store
            .upsert_batch(vec![
                DocumentWrite::pending(doc("a", "1")),
                DocumentWrite::pending(doc("b", "2")),
            ])
            .await
            .unwrap();

        let ids = ["b", "zzz", "a", "b"].map(String::from);
        let docs = store.get_many(&ids).await.unwrap();
        let got: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(got, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn claim_and_complete() {
        let store = store();
        store
            .upsert_batch(vec![
                DocumentWrite::pending(doc("a", "one")),
                DocumentWrite::pending(doc("b", "two")),
                DocumentWrite::pending(doc("c", "three")),
            ])
            .await
            .unwrap();

        let claimed = store.claim_pending(2, LEASE).await.unwrap();
        assert_eq!(claimed.len(), 2);
        assert!(claimed.iter().all(|d| d.status == EmbeddingStatus::Processing));

        assert!(store.mark_completed(&claimed[0].id, &[0.5]).await.unwrap());
        assert!(store.mark_failed(&claimed[1].id, "boom").await.unwrap());
        // Not processing any more
        assert!(!store.mark_completed(&claimed[1].id, &[0.5]).await.unwrap());

        let counts = store.count_by_status().await.unwrap();
        assert_eq!(
            counts,
            StatusCounts {
                pending: 1,
                processing: 0,
                completed: 1,
                failed: 1
            }
        );
        assert_eq!(counts.total(), 3);

        let failed = store.get(&claimed[1].id).await.unwrap().unwrap();
        assert_eq!(failed.last_error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn abandoned_claims_are_reclaimed_after_lease() {
        let store = store();
        store
            .upsert_batch(vec![
                DocumentWrite::pending(doc("a", "one")),
                DocumentWrite::pending(doc("b", "two")),
            ])
            .await
            .unwrap();
        assert_eq!(store.claim_pending(10, LEASE).await.unwrap().len(), 2);

        // Within the lease nothing is claimable
        assert!(store.claim_pending(10, LEASE).await.unwrap().is_empty());

        let reclaimed = store.claim_pending(10, Duration::ZERO).await.unwrap();
        let ids: Vec<&str> = reclaimed.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(reclaimed.iter().all(|d| d.status == EmbeddingStatus::Processing));

        // Reclaiming started a fresh lease
        assert!(store.claim_pending(10, LEASE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reinsert_during_processing_wins_over_stale_vector() {
        let store = store();
        store
            .upsert_batch(vec![DocumentWrite::pending(doc("a", "old"))])
            .await
            .unwrap();
        store.claim_pending(10, LEASE).await.unwrap();

        store
            .upsert_batch(vec![DocumentWrite::pending(doc("a", "new"))])
            .await
            .unwrap();
        assert!(!store.mark_completed("a", &[1.0]).await.unwrap());

        let current = store.get("a").await.unwrap().unwrap();
        assert_eq!(current.status, EmbeddingStatus::Pending);
        assert_eq!(current.vector, None);
    }

    #[tokio::test]
    async fn text_matching_policies() {
        let store = store();
        store
            .upsert_batch(vec![
                DocumentWrite::pending(doc("1", "Eino is great")),
                DocumentWrite::pending(doc("2", "Hello world")),
                DocumentWrite::pending(doc("3", "great world")),
            ])
            .await
            .unwrap();

        let terms = vec!["great".to_string(), "world".to_string()];
        let all = store
            .search_text_matches(&terms, MatchPolicy::All, 10)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].hit.id, "3");
        assert_eq!(all[0].matched, 2);

        let any = store
            .search_text_matches(&terms, MatchPolicy::Any, 10)
            .await
            .unwrap();
        let ids: Vec<&str> = any.iter().map(|m| m.hit.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[tokio::test]
    async fn nearest_only_sees_completed_vectors() {
        let store = store();
        store
            .upsert_batch(vec![
                DocumentWrite::embedded(doc("x", "x"), Some(vec![1.0, 0.0])),
                DocumentWrite::embedded(doc("y", "y"), Some(vec![0.0, 1.0])),
                DocumentWrite::pending(doc("p", "pending")),
            ])
            .await
            .unwrap();

        let hits = store.nearest(&[1.0, 0.1], 10, None).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y"]);
        assert!(hits[0].score > 0.99);

        let strict = store.nearest(&[1.0, 0.1], 10, Some(0.9)).await.unwrap();
        assert_eq!(strict.len(), 1);
    }
}
