//! 탐지 기록 스토리지 (HistoryStore 포트 구현).
//!
//! 탐지 목록은 JSON 텍스트, 주석 이미지는 BLOB으로 저장한다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use olivescan_core::error::CoreError;
use olivescan_core::models::detection::LeafDetection;
use olivescan_core::models::history::DetectionHistoryRecord;
use olivescan_core::ports::history::HistoryStore;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::SqliteHistoryStore;

const SELECT_COLUMNS: &str =
    "SELECT id, timestamp, image_uri, leaf_count, detections, result_image FROM detection_history";

impl SqliteHistoryStore {
    /// 전체 기록 조회 (최신순)
    pub(super) fn query_all(conn: &Connection) -> Result<Vec<DetectionHistoryRecord>, CoreError> {
        let mut stmt = conn
            .prepare_cached(&format!("{SELECT_COLUMNS} ORDER BY timestamp DESC, id DESC"))
            .map_err(|e| CoreError::Storage(format!("쿼리 준비 실패: {e}")))?;

        let records = stmt
            .query_map([], Self::map_row)
            .map_err(|e| CoreError::Storage(format!("쿼리 실행 실패: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::Storage(format!("기록 행 변환 실패: {e}")))?;

        Ok(records)
    }

    /// DB 행 → 기록
    fn map_row(row: &Row<'_>) -> rusqlite::Result<DetectionHistoryRecord> {
        let millis: i64 = row.get(1)?;
        let timestamp = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                Type::Integer,
                format!("타임스탬프 범위 초과: {millis}").into(),
            )
        })?;

        let detections_json: String = row.get(4)?;
        let detections: Vec<LeafDetection> = serde_json::from_str(&detections_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

        Ok(DetectionHistoryRecord {
            id: row.get(0)?,
            timestamp,
            image_uri: row.get(2)?,
            leaf_count: row.get(3)?,
            detections,
            result_image: row.get(5)?,
        })
    }

    /// 다른 연결(다른 프로세스)의 변경을 반영
    ///
    /// 구독자가 있고 `PRAGMA data_version`이 바뀌었을 때만 목록을 다시 읽는다.
    /// 스냅샷이 달라졌을 때만 구독자에게 발행하고 `true`를 돌려준다.
    pub async fn refresh(&self) -> Result<bool, CoreError> {
        let snapshots = Arc::clone(&self.snapshots);
        self.with_conn(move |conn| {
            if !snapshots.has_subscribers() || !snapshots.changed_elsewhere(conn)? {
                return Ok(false);
            }
            let records = snapshots.load(conn)?;
            Ok(snapshots.tx.send_if_modified(|current| {
                if *current == records {
                    false
                } else {
                    *current = records;
                    true
                }
            }))
        })
        .await
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn list_all(&self) -> Result<Vec<DetectionHistoryRecord>, CoreError> {
        self.with_conn(|conn| Self::query_all(conn)).await
    }

    fn subscribe(&self) -> watch::Receiver<Vec<DetectionHistoryRecord>> {
        let guard = match self.conn.lock() {
            Ok(guard) => guard,
            Err(e) => {
                warn!("잠금 획득 실패, 이전 스냅샷으로 구독: {e}");
                return self.snapshots.tx.subscribe();
            }
        };

        // 구독자가 없던 동안에는 발행을 건너뛰었으므로 다시 채운다
        if !self.snapshots.has_subscribers() {
            match self.snapshots.load(&guard) {
                Ok(records) => {
                    self.snapshots.tx.send_replace(records);
                }
                Err(e) => warn!("기록 스냅샷 로드 실패: {e}"),
            }
        }
        self.snapshots.tx.subscribe()
    }

    async fn get(&self, id: i64) -> Result<Option<DetectionHistoryRecord>, CoreError> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                rusqlite::params![id],
                Self::map_row,
            )
            .optional()
            .map_err(|e| CoreError::Storage(format!("기록 조회 실패: {e}")))
        })
        .await
    }

    async fn insert(&self, record: &DetectionHistoryRecord) -> Result<(), CoreError> {
        let detections = serde_json::to_string(&record.detections)?;
        let record = record.clone();
        let snapshots = Arc::clone(&self.snapshots);

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO detection_history
                    (id, timestamp, image_uri, leaf_count, detections, result_image)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    record.id,
                    record.timestamp.timestamp_millis(),
                    record.image_uri,
                    record.leaf_count,
                    detections,
                    record.result_image,
                ],
            )
            .map_err(|e| CoreError::Storage(format!("기록 저장 실패: {e}")))?;

            debug!(
                "기록 저장: id={}, leaves={}",
                record.id,
                record.detections.len()
            );
            snapshots.publish(conn)
        })
        .await
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, CoreError> {
        let snapshots = Arc::clone(&self.snapshots);

        self.with_conn(move |conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM detection_history WHERE id = ?1",
                    rusqlite::params![id],
                )
                .map_err(|e| CoreError::Storage(format!("기록 삭제 실패: {e}")))?;

            debug!("기록 삭제: id={}, affected={}", id, deleted);
            if deleted > 0 {
                snapshots.publish(conn)?;
            }
            Ok(deleted > 0)
        })
        .await
    }

    async fn clear(&self) -> Result<usize, CoreError> {
        let snapshots = Arc::clone(&self.snapshots);

        self.with_conn(move |conn| {
            let deleted = conn
                .execute("DELETE FROM detection_history", [])
                .map_err(|e| CoreError::Storage(format!("기록 초기화 실패: {e}")))?;

            debug!("기록 초기화: affected={}", deleted);
            snapshots.publish(conn)?;
            Ok(deleted)
        })
        .await
    }

    async fn count(&self) -> Result<usize, CoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM detection_history", [], |row| {
                    row.get(0)
                })
                .map_err(|e| CoreError::Storage(format!("기록 수 조회 실패: {e}")))?;
            Ok(count as usize)
        })
        .await
    }
}
