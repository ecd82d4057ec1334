//! 탐지 조율기.
//!
//! 이미지 읽기 → 탐지 → 성공 시 기록 저장.

use chrono::Utc;
use olivescan_core::config_manager::ConfigManager;
use olivescan_core::error::CoreError;
use olivescan_core::models::detection::{DetectionRequest, DetectionResult, ImagePayload};
use olivescan_core::models::history::DetectionHistoryRecord;
use olivescan_core::ports::detector::LeafDetector;
use olivescan_core::ports::history::HistoryStore;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 탐지 1회 결과
#[derive(Debug)]
pub struct DetectionOutcome {
    pub result: DetectionResult,
    /// 기록에 저장됐으면 해당 ID
    pub record_id: Option<i64>,
}

/// 탐지 조율기: 탐지 포트와 기록 포트를 묶는다
pub struct DetectionService {
    detector: Arc<dyn LeafDetector>,
    history: Arc<dyn HistoryStore>,
    config: ConfigManager,
    /// 실행 시점 서버 URL 재정의 (`--server`, 환경 변수). 설정 파일에는 쓰지 않는다.
    server_override: Option<String>,
}

impl DetectionService {
    pub fn new(
        detector: Arc<dyn LeafDetector>,
        history: Arc<dyn HistoryStore>,
        config: ConfigManager,
    ) -> Self {
        Self {
            detector,
            history,
            config,
            server_override: None,
        }
    }

    pub fn with_server_override(mut self, server: Option<String>) -> Self {
        self.server_override = server;
        self
    }

    /// 현재 유효한 서버 URL
    ///
    /// 재정의가 없으면 매 호출마다 설정에서 읽는다.
    pub fn server_url(&self) -> String {
        self.server_override
            .clone()
            .unwrap_or_else(|| self.config.server_url())
    }

    /// 이미지 1장 탐지
    ///
    /// `save`가 참이고 탐지가 성공하면 기록을 저장한다. 실패 결과는 저장하지 않는다.
    /// 이미지 파일 읽기 실패, 잘못된 서버 URL, 저장 실패는 `Err`로 돌려준다.
    pub async fn run(&self, image_path: &Path, save: bool) -> Result<DetectionOutcome, CoreError> {
        let image = ImagePayload::from_path(image_path)?;
        let request = DetectionRequest::new(image, self.server_url());

        let result = self.detector.detect(request).await?;
        debug!(
            success = result.success,
            leaf_count = result.leaf_count,
            "탐지 완료"
        );

        let record_id = if save && result.success {
            let record =
                DetectionHistoryRecord::from_result(image_uri(image_path), &result, Utc::now());
            self.history.insert(&record).await?;
            info!("탐지 기록 저장: id={}", record.id);
            Some(record.id)
        } else {
            None
        };

        Ok(DetectionOutcome { result, record_id })
    }
}

/// 기록에 남길 원본 이미지 참조 (가능하면 절대 경로)
fn image_uri(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use olivescan_core::models::detection::LeafDetection;
    use olivescan_storage::sqlite::SqliteHistoryStore;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// 고정 결과를 돌려주고 받은 요청 URL을 기록하는 탐지기
    struct StubDetector {
        result: Result<DetectionResult, CoreError>,
        seen_urls: Mutex<Vec<String>>,
    }

    impl StubDetector {
        fn returning(result: Result<DetectionResult, CoreError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                seen_urls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LeafDetector for StubDetector {
        async fn detect(&self, request: DetectionRequest) -> Result<DetectionResult, CoreError> {
            self.seen_urls.lock().unwrap().push(request.base_url);
            match &self.result {
                Ok(r) => Ok(r.clone()),
                Err(e) => Err(CoreError::Config(e.to_string())),
            }
        }
    }

    struct Fixture {
        dir: TempDir,
        config: ConfigManager,
        store: Arc<SqliteHistoryStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config = ConfigManager::with_path(dir.path().join("config.json")).unwrap();
            let store = Arc::new(SqliteHistoryStore::open_in_memory().unwrap());
            Self { dir, config, store }
        }

        fn image(&self) -> std::path::PathBuf {
            let path = self.dir.path().join("leaf.jpg");
            std::fs::write(&path, b"not decoded by the stub").unwrap();
            path
        }

        fn service(&self, detector: Arc<StubDetector>) -> DetectionService {
            DetectionService::new(detector, self.store.clone(), self.config.clone())
        }
    }

    fn two_leaves() -> DetectionResult {
        DetectionResult::succeeded(
            vec![
                LeafDetection::new("healthy", 0.9),
                LeafDetection::new("peacock_spot", 0.4),
            ],
            2,
            None,
        )
    }

    #[tokio::test]
    async fn successful_detection_is_saved() {
        let fx = Fixture::new();
        let service = fx.service(StubDetector::returning(Ok(two_leaves())));

        let outcome = service.run(&fx.image(), true).await.unwrap();

        assert!(outcome.result.success);
        let id = outcome.record_id.unwrap();
        let saved = fx.store.get(id).await.unwrap().unwrap();
        assert_eq!(saved.leaf_count, 2);
        assert_eq!(saved.detections, two_leaves().detections);
        assert!(saved.image_uri.ends_with("leaf.jpg"));
    }

    #[tokio::test]
    async fn no_save_flag_skips_history() {
        let fx = Fixture::new();
        let service = fx.service(StubDetector::returning(Ok(two_leaves())));

        let outcome = service.run(&fx.image(), false).await.unwrap();

        assert!(outcome.result.success);
        assert!(outcome.record_id.is_none());
        assert_eq!(fx.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_detection_is_not_saved() {
        let fx = Fixture::new();
        let service = fx.service(StubDetector::returning(Ok(DetectionResult::failed(
            "Server returned 500: boom",
        ))));

        let outcome = service.run(&fx.image(), true).await.unwrap();

        assert!(!outcome.result.success);
        assert!(outcome.record_id.is_none());
        assert_eq!(fx.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn uses_current_config_url() {
        let fx = Fixture::new();
        let detector = StubDetector::returning(Ok(two_leaves()));
        let service = fx.service(detector.clone());

        service.run(&fx.image(), false).await.unwrap();
        fx.config.set_server_url("http://192.168.1.20:5000").unwrap();
        service.run(&fx.image(), false).await.unwrap();

        let urls = detector.seen_urls.lock().unwrap().clone();
        assert_eq!(
            urls,
            vec!["http://10.0.2.2:5000", "http://192.168.1.20:5000"]
        );
    }

    #[tokio::test]
    async fn override_wins_over_config() {
        let fx = Fixture::new();
        let detector = StubDetector::returning(Ok(two_leaves()));
        let service = fx
            .service(detector.clone())
            .with_server_override(Some("http://localhost:8080".to_string()));

        service.run(&fx.image(), false).await.unwrap();

        assert_eq!(
            detector.seen_urls.lock().unwrap().as_slice(),
            ["http://localhost:8080"]
        );
        // 설정 파일은 그대로
        assert_eq!(fx.config.server_url(), "http://10.0.2.2:5000");
    }

    #[tokio::test]
    async fn config_error_propagates() {
        let fx = Fixture::new();
        let service = fx.service(StubDetector::returning(Err(CoreError::Config(
            "Invalid server URL: example.com".to_string(),
        ))));

        let err = service.run(&fx.image(), true).await.unwrap_err();
        assert_matches!(err, CoreError::Config(_));
        assert_eq!(fx.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_image_file() {
        let fx = Fixture::new();
        let detector = StubDetector::returning(Ok(two_leaves()));
        let service = fx.service(detector.clone());

        let err = service
            .run(&fx.dir.path().join("missing.jpg"), true)
            .await
            .unwrap_err();

        assert_matches!(err, CoreError::Image(_));
        assert!(detector.seen_urls.lock().unwrap().is_empty());
    }
}
