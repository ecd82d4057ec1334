//! 터미널 출력.
//!
//! 사용자에게 보이는 문구는 모두 `Strings`에서 가져온다.

use chrono::Local;
use olivescan_core::config::AppConfig;
use olivescan_core::locale::{format_confidence, Language, Strings};
use olivescan_core::models::detection::{DetectionResult, LeafDetection};
use olivescan_core::models::history::DetectionHistoryRecord;
use std::path::Path;

/// 탐지 1건: `  healthy                87%`
pub fn detection_line(detection: &LeafDetection) -> String {
    format!(
        "  {:<24} {:>4}",
        detection.class_name,
        format_confidence(detection.confidence)
    )
}

/// 기록 목록 1줄: ID, 로컬 시각, 잎 수, 가장 확신도 높은 탐지
pub fn record_line(record: &DetectionHistoryRecord) -> String {
    let top = record
        .detections
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .map(|d| format!("{} ({})", d.class_name, format_confidence(d.confidence)))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{:>14}  {}  {:>3}  {}",
        record.id,
        record
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S"),
        record.leaf_count,
        top
    )
}

/// 성공한 탐지 결과 출력 (실패는 호출자가 에러로 보고한다)
pub fn print_detection(strings: &Strings, result: &DetectionResult, record_id: Option<i64>) {
    println!("{}", strings.detection_results);
    println!("{}: {}", strings.leaf_count, result.leaf_count);
    if result.detections.is_empty() {
        println!("{}", strings.no_detections);
    }
    for detection in &result.detections {
        println!("{}", detection_line(detection));
    }
    if let Some(image) = &result.result_image {
        println!(
            "{}: {}x{} ({})",
            strings.annotated_image,
            image.width,
            image.height,
            image.content_type().unwrap_or("?")
        );
    }
    if let Some(id) = record_id {
        println!("{} (#{id})", strings.saved_to_history);
    }
}

pub fn print_history(strings: &Strings, records: &[DetectionHistoryRecord]) {
    println!("{} ({})", strings.history, records.len());
    if records.is_empty() {
        println!("{}", strings.history_empty);
        return;
    }
    for record in records {
        println!("{}", record_line(record));
    }
}

pub fn print_record(strings: &Strings, record: &DetectionHistoryRecord) {
    println!("#{}", record.id);
    println!(
        "{}",
        record
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
    println!("{}: {}", strings.source_image, record.image_uri);
    println!("{}: {}", strings.leaf_count, record.leaf_count);
    if record.detections.is_empty() {
        println!("{}", strings.no_detections);
    }
    for detection in &record.detections {
        println!("{}", detection_line(detection));
    }
    if let Some(bytes) = &record.result_image {
        println!("{}: {} bytes", strings.annotated_image, bytes.len());
    }
}

pub fn print_config(strings: &Strings, config: &AppConfig, effective_server: &str, path: &Path) {
    println!("{}", strings.settings);
    if effective_server == config.server.base_url {
        println!("  {}: {}", strings.server_url, config.server.base_url);
    } else {
        println!(
            "  {}: {} (-> {effective_server})",
            strings.server_url, config.server.base_url
        );
    }
    println!(
        "  {}: {}",
        strings.language,
        language_label(config.general.language)
    );
    println!("  {}: {}", strings.config_file, path.display());
}

/// 언어 표시: `العربية (ar, RTL)`
pub fn language_label(language: Language) -> String {
    if language.is_rtl() {
        format!("{} ({}, RTL)", language.native_name(), language.code())
    } else {
        format!("{} ({})", language.native_name(), language.code())
    }
}
