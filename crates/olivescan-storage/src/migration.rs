//! 스키마 마이그레이션.
//!
//! 버전 기반 SQLite 스키마 관리.

use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info};

/// 현재 스키마 버전
pub const CURRENT_VERSION: u32 = 1;

/// 스키마 마이그레이션 실행
///
/// 쓰기 잠금(`BEGIN IMMEDIATE`)을 먼저 잡고 그 안에서 버전을 읽는다.
/// 같은 새 DB 파일을 여러 연결이 동시에 열어도 마이그레이션은 한 번만 적용된다.
/// 실패하면 트랜잭션은 롤백된다.
pub fn run_migrations(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current = get_version(&tx)?;
    info!("현재 스키마 버전: {current}, 목표: {CURRENT_VERSION}");

    if current < 1 {
        migrate_v1(&tx)?;
    }

    tx.commit()
}

/// 현재 스키마 버전 조회
pub fn get_version(conn: &Connection) -> Result<u32, rusqlite::Error> {
    let result: Result<u32, _> = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    );
    result.or(Ok(0))
}

/// V1: detection_history 테이블 생성 (호출자의 트랜잭션 안에서)
fn migrate_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("마이그레이션 V1 실행: detection_history 테이블");

    conn.execute_batch(
        "
        -- 탐지 기록 (id = 생성 시각 epoch 밀리초)
        CREATE TABLE IF NOT EXISTS detection_history (
            id INTEGER PRIMARY KEY,
            timestamp INTEGER NOT NULL,
            image_uri TEXT NOT NULL,
            leaf_count INTEGER NOT NULL,
            detections TEXT NOT NULL,
            result_image BLOB
        );

        CREATE INDEX IF NOT EXISTS idx_detection_history_timestamp
            ON detection_history(timestamp);

        INSERT OR IGNORE INTO schema_version (version) VALUES (1);
        ",
    )?;

    info!("마이그레이션 V1 완료");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM detection_history", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn migrations_are_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn concurrent_first_open_migrates_once() {
        use std::sync::{Arc, Barrier};

        for _ in 0..20 {
            let dir = tempfile::TempDir::new().unwrap();
            let path = Arc::new(dir.path().join("history.db"));
            let barrier = Arc::new(Barrier::new(4));

            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let path = Arc::clone(&path);
                    let barrier = Arc::clone(&barrier);
                    std::thread::spawn(move || {
                        let mut conn = Connection::open(path.as_path()).unwrap();
                        barrier.wait();
                        run_migrations(&mut conn)
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap().unwrap();
            }

            let conn = Connection::open(path.as_path()).unwrap();
            assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);
            let versions: i64 = conn
                .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
                .unwrap();
            assert_eq!(versions, 1);
        }
    }

    #[test]
    fn failed_migration_leaves_no_open_transaction() {
        let mut conn = Connection::open_in_memory().unwrap();
        // 같은 이름의 뷰가 있으면 V1의 CREATE TABLE이 실패한다
        conn.execute_batch("CREATE VIEW detection_history AS SELECT 1 AS id;")
            .unwrap();

        assert!(run_migrations(&mut conn).is_err());
        assert!(conn.is_autocommit());
        assert_eq!(get_version(&conn).unwrap(), 0);
    }
}
