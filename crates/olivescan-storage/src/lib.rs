//! # olivescan-storage
//!
//! 로컬 저장소 어댑터.
//! SQLite 기반 탐지 기록 저장과 스키마 마이그레이션을 관리한다.
//! 보존 정책은 없다 (기록은 사용자가 지울 때까지 유지).
//!
//! ## 모듈
//! - `sqlite`: 탐지 기록 저장소 (HistoryStore 구현)
//! - `migration`: 스키마 마이그레이션

pub mod migration;
pub mod sqlite;
