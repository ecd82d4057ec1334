//! SQLite 저장소 어댑터.
//!
//! `HistoryStore` 포트 구현.
//!
//! # 모듈 구조
//! - `history`: 탐지 기록 조회/저장/삭제 (HistoryStore 포트)

mod history;

use olivescan_core::error::CoreError;
use olivescan_core::models::history::DetectionHistoryRecord;
use rusqlite::Connection;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
#[cfg(test)]
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::info;

use crate::migration;

/// SQLite 탐지 기록 저장소: `HistoryStore` 포트 구현
///
/// 모든 쿼리는 블로킹 풀에서 연결 잠금을 잡고 실행된다.
/// 변경 후 스냅샷 발행도 같은 잠금 안에서 이루어져 구독자는 순서가 뒤바뀐 목록을 보지 않는다.
pub struct SqliteHistoryStore {
    pub(super) conn: Arc<Mutex<Connection>>,
    pub(super) snapshots: Arc<Snapshots>,
}

/// 구독자용 기록 스냅샷
///
/// 전체 목록(주석 이미지 포함)은 구독자가 있을 때만 읽는다.
/// 구독자가 없는 동안 건너뛴 변경은 다음 `subscribe`에서 다시 읽어 채운다.
pub(super) struct Snapshots {
    pub(super) tx: watch::Sender<Vec<DetectionHistoryRecord>>,
    /// 마지막으로 확인한 `PRAGMA data_version`
    data_version: AtomicI64,
    #[cfg(test)]
    loads: AtomicUsize,
}

impl Snapshots {
    fn new(data_version: i64) -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self {
            tx,
            data_version: AtomicI64::new(data_version),
            #[cfg(test)]
            loads: AtomicUsize::new(0),
        }
    }

    pub(super) fn has_subscribers(&self) -> bool {
        self.tx.receiver_count() > 0
    }

    /// 전체 목록 읽기 (연결 잠금 안에서 호출)
    pub(super) fn load(&self, conn: &Connection) -> Result<Vec<DetectionHistoryRecord>, CoreError> {
        #[cfg(test)]
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.data_version
            .store(data_version(conn)?, Ordering::Relaxed);
        SqliteHistoryStore::query_all(conn)
    }

    /// 다른 연결이 커밋했으면 새 `data_version`을 기록하고 `true`
    pub(super) fn changed_elsewhere(&self, conn: &Connection) -> Result<bool, CoreError> {
        let current = data_version(conn)?;
        Ok(self.data_version.swap(current, Ordering::Relaxed) != current)
    }

    /// 변경 후 최신 스냅샷 발행 (연결 잠금 안에서 호출)
    ///
    /// 구독자가 없으면 아무것도 읽지 않는다.
    pub(super) fn publish(&self, conn: &Connection) -> Result<(), CoreError> {
        if !self.has_subscribers() {
            return Ok(());
        }
        let records = self.load(conn)?;
        self.tx.send_replace(records);
        Ok(())
    }
}

/// 연결 밖에서 커밋될 때마다 바뀌는 값 (자기 연결의 커밋으로는 바뀌지 않는다)
fn data_version(conn: &Connection) -> Result<i64, CoreError> {
    conn.query_row("PRAGMA data_version", [], |row| row.get(0))
        .map_err(|e| CoreError::Storage(format!("data_version 조회 실패: {e}")))
}

impl SqliteHistoryStore {
    /// 파일 기반 SQLite 저장소 생성
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CoreError::Storage(format!(
                        "데이터 디렉토리 생성 실패: {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| CoreError::Storage(format!("SQLite 열기 실패: {e}")))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
            ",
        )
        .map_err(|e| CoreError::Storage(format!("PRAGMA 설정 실패: {e}")))?;

        let store = Self::from_connection(conn)?;
        info!("SQLite 저장소 초기화: {}", path.display());
        Ok(store)
    }

    /// 인메모리 SQLite 저장소 생성 (테스트용)
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Storage(format!("인메모리 SQLite 생성 실패: {e}")))?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, CoreError> {
        migration::run_migrations(&mut conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        let snapshots = Snapshots::new(data_version(&conn)?);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            snapshots: Arc::new(snapshots),
        })
    }

    #[cfg(test)]
    fn snapshot_loads(&self) -> usize {
        self.snapshots.loads.load(Ordering::Relaxed)
    }

    /// 블로킹 풀에서 연결을 잡고 작업 실행
    pub(super) async fn with_conn<F, T>(&self, op: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, CoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| CoreError::Storage(format!("잠금 획득 실패: {e}")))?;
            op(&mut guard)
        })
        .await
        .map_err(|e| CoreError::Internal(format!("저장소 작업 조인 실패: {e}")))?
    }
}
