//! 탐지 기록 저장소 포트.
//!
//! 구현: `olivescan-storage` crate (rusqlite)

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::CoreError;
use crate::models::history::DetectionHistoryRecord;

/// 탐지 기록 저장소
///
/// 목록은 항상 타임스탬프 내림차순이다.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// 전체 기록 조회 (최신순)
    async fn list_all(&self) -> Result<Vec<DetectionHistoryRecord>, CoreError>;

    /// 기록 변경 구독
    ///
    /// 수신기는 최신 전체 목록(최신순)을 보유하며 삽입/삭제/초기화마다 갱신된다.
    fn subscribe(&self) -> watch::Receiver<Vec<DetectionHistoryRecord>>;

    /// ID로 기록 조회
    async fn get(&self, id: i64) -> Result<Option<DetectionHistoryRecord>, CoreError>;

    /// 기록 추가: 같은 ID가 있으면 교체
    async fn insert(&self, record: &DetectionHistoryRecord) -> Result<(), CoreError>;

    /// ID로 삭제. 삭제된 행이 있으면 true
    async fn delete_by_id(&self, id: i64) -> Result<bool, CoreError>;

    /// 레코드 값으로 삭제 (레코드의 ID와 일치하는 행)
    async fn delete(&self, record: &DetectionHistoryRecord) -> Result<bool, CoreError> {
        self.delete_by_id(record.id).await
    }

    /// 전체 삭제. 삭제된 행 수 반환
    async fn clear(&self) -> Result<usize, CoreError>;

    /// 저장된 기록 수
    async fn count(&self) -> Result<usize, CoreError>;
}
