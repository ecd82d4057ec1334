//! 탐지 기록 모델.

use chrono::{DateTime, Utc};

use super::detection::{DetectionResult, LeafDetection};

/// 저장된 탐지 기록: 삽입 후 변경되지 않는다
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionHistoryRecord {
    /// 생성 시각 기반 ID (epoch 밀리초)
    pub id: i64,
    /// 생성 시각 (밀리초 정밀도)
    pub timestamp: DateTime<Utc>,
    /// 원본 이미지 참조 (경로 또는 URI)
    pub image_uri: String,
    pub leaf_count: u32,
    /// 신뢰도는 0 ~ 1
    pub detections: Vec<LeafDetection>,
    /// 주석 이미지 바이트
    pub result_image: Option<Vec<u8>>,
}

impl DetectionHistoryRecord {
    /// 탐지 결과에서 기록 생성
    ///
    /// ID와 타임스탬프는 `now`의 밀리초 값에서 파생된다.
    pub fn from_result(
        image_uri: impl Into<String>,
        result: &DetectionResult,
        now: DateTime<Utc>,
    ) -> Self {
        let id = now.timestamp_millis();
        Self {
            id,
            timestamp: truncate_to_millis(now),
            image_uri: image_uri.into(),
            leaf_count: result.leaf_count,
            detections: result.detections.clone(),
            result_image: result.result_image.as_ref().map(|img| img.bytes.clone()),
        }
    }
}

/// 밀리초 미만 절삭 (저장소 정밀도와 일치시킨다)
pub fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::detection::ResultImage;
    use chrono::TimeZone;

    #[test]
    fn from_result_derives_id_from_time() {
        let now = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let result = DetectionResult::succeeded(
            vec![LeafDetection::new("aculus_olearius", 0.91)],
            1,
            Some(ResultImage {
                bytes: vec![1, 2, 3],
                width: 1,
                height: 1,
            }),
        );

        let record = DetectionHistoryRecord::from_result("/tmp/leaf.jpg", &result, now);

        assert_eq!(record.id, 1_700_000_000_123);
        assert_eq!(record.timestamp.timestamp_subsec_nanos(), 123_000_000);
        assert_eq!(record.leaf_count, 1);
        assert_eq!(record.detections, result.detections);
        assert_eq!(record.result_image, Some(vec![1, 2, 3]));
    }

    #[test]
    fn from_failed_result_has_no_image() {
        let result = DetectionResult::failed("boom");
        let record = DetectionHistoryRecord::from_result("uri", &result, Utc::now());
        assert!(record.detections.is_empty());
        assert!(record.result_image.is_none());
    }
}
