//! 설정 파일 관리.
//!
//! 플랫폼별 설정 디렉토리에 JSON 파일로 설정을 저장/로드하고,
//! 변경 사항을 구독자에게 전달한다. 전역 상태 없이 주입해서 사용한다.

use crate::config::{validate_server_url, AppConfig};
use crate::error::CoreError;
use crate::locale::Language;
use directories::ProjectDirs;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// 설정 파일 이름
const CONFIG_FILE_NAME: &str = "config.json";

/// 설정 관리자
///
/// 설정 파일의 로드/저장 및 런타임 설정 변경을 관리한다.
/// 복제본은 같은 상태를 공유한다.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 현재 설정 (스레드 안전)
    config: Arc<RwLock<AppConfig>>,
    /// 변경 알림 채널
    changes: Arc<watch::Sender<AppConfig>>,
    /// 설정 파일 경로
    config_path: PathBuf,
}

impl ConfigManager {
    /// 새 설정 관리자 생성 및 설정 로드
    ///
    /// 설정 파일이 없으면 기본 설정을 생성하고 저장한다.
    pub fn new() -> Result<Self, CoreError> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// 지정된 경로로 설정 관리자 생성
    pub fn with_path(config_path: PathBuf) -> Result<Self, CoreError> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CoreError::Config(format!(
                        "설정 디렉토리 생성 실패: {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
                info!("설정 디렉토리 생성: {}", parent.display());
            }
        }

        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let default_config = AppConfig::default_config();
            Self::save_to_file(&config_path, &default_config)?;
            info!("기본 설정 파일 생성: {}", config_path.display());
            default_config
        };

        let (changes, _) = watch::channel(config.clone());

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            changes: Arc::new(changes),
            config_path,
        })
    }

    /// 현재 설정 반환 (복제본)
    pub fn get(&self) -> AppConfig {
        self.config.read().clone()
    }

    /// 설정 변경 수신기 생성
    ///
    /// 수신기는 항상 최신 설정을 보유하며, 저장이 성공할 때마다 갱신된다.
    pub fn subscribe(&self) -> watch::Receiver<AppConfig> {
        self.changes.subscribe()
    }

    /// 설정 업데이트 및 파일 저장
    pub fn update(&self, new_config: AppConfig) -> Result<(), CoreError> {
        Self::save_to_file(&self.config_path, &new_config)?;
        debug!("설정 저장 완료: {}", self.config_path.display());

        *self.config.write() = new_config.clone();
        self.changes.send_replace(new_config);
        Ok(())
    }

    /// 특정 필드만 업데이트
    pub fn update_with<F>(&self, updater: F) -> Result<AppConfig, CoreError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.get();
        updater(&mut config);
        self.update(config.clone())?;
        Ok(config)
    }

    /// 현재 서버 URL
    pub fn server_url(&self) -> String {
        self.config.read().server.base_url.clone()
    }

    /// 서버 URL 변경
    ///
    /// 스킴이 없는 URL은 저장하지 않고 `CoreError::Config`를 반환한다.
    pub fn set_server_url(&self, base_url: &str) -> Result<(), CoreError> {
        let base_url = base_url.trim();
        validate_server_url(base_url)?;
        self.update_with(|c| c.server.base_url = base_url.to_string())?;
        info!("서버 URL 변경: {base_url}");
        Ok(())
    }

    /// 현재 표시 언어
    pub fn language(&self) -> Language {
        self.config.read().general.language
    }

    /// 표시 언어 변경
    pub fn set_language(&self, language: Language) -> Result<(), CoreError> {
        self.update_with(|c| c.general.language = language)?;
        info!("표시 언어 변경: {language}");
        Ok(())
    }

    /// 설정 파일 경로 반환
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 플랫폼별 기본 설정 파일 경로
    fn default_config_path() -> Result<PathBuf, CoreError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// 플랫폼별 설정 디렉토리 경로
    ///
    /// - macOS: `~/Library/Application Support/org.olivescan.olivescan/`
    /// - Windows: `%APPDATA%\olivescan\olivescan\config\`
    /// - Linux: `~/.config/olivescan/`
    pub fn config_dir() -> Result<PathBuf, CoreError> {
        Self::project_dirs().map(|p| p.config_dir().to_path_buf())
    }

    /// 데이터 디렉토리 경로 (기록 DB)
    pub fn data_dir() -> Result<PathBuf, CoreError> {
        Self::project_dirs().map(|p| p.data_dir().to_path_buf())
    }

    fn project_dirs() -> Result<ProjectDirs, CoreError> {
        ProjectDirs::from("org", "olivescan", "olivescan")
            .ok_or_else(|| CoreError::Config("홈 디렉토리를 찾을 수 없습니다".to_string()))
    }

    /// 파일에서 설정 로드
    fn load_from_file(path: &Path) -> Result<AppConfig, CoreError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("설정 파일 읽기 실패: {}: {}", path.display(), e))
        })?;

        let config: AppConfig = serde_json::from_str(&content).map_err(|e| {
            CoreError::Config(format!("설정 파일 파싱 실패: {}: {}", path.display(), e))
        })?;

        debug!("설정 파일 로드 완료: {}", path.display());
        Ok(config)
    }

    /// 파일에 설정 저장
    fn save_to_file(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| CoreError::Config(format!("설정 직렬화 실패: {}", e)))?;

        fs::write(path, content).map_err(|e| {
            CoreError::Config(format!("설정 파일 저장 실패: {}: {}", path.display(), e))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SERVER_URL;
    use tempfile::TempDir;

    #[test]
    fn create_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        // 새 관리자 생성 (기본 설정 파일 생성됨)
        let manager = ConfigManager::with_path(config_path.clone()).unwrap();
        assert!(config_path.exists());

        assert_eq!(manager.server_url(), DEFAULT_SERVER_URL);
        assert_eq!(manager.language(), Language::En);
    }

    #[test]
    fn update_and_persist_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let manager = ConfigManager::with_path(config_path.clone()).unwrap();
        manager.set_server_url("https://leaf.example.com").unwrap();
        manager.set_language(Language::Ar).unwrap();

        // 새 관리자로 다시 로드
        let manager2 = ConfigManager::with_path(config_path).unwrap();
        assert_eq!(manager2.server_url(), "https://leaf.example.com");
        assert_eq!(manager2.language(), Language::Ar);
    }

    #[test]
    fn invalid_server_url_not_saved() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("config.json")).unwrap();

        let result = manager.set_server_url("example.com");
        assert!(matches!(result, Err(CoreError::Config(_))));
        assert_eq!(manager.server_url(), DEFAULT_SERVER_URL);
    }

    #[test]
    fn clones_share_state() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("config.json")).unwrap();
        let other = manager.clone();

        manager.set_language(Language::Fr).unwrap();
        assert_eq!(other.language(), Language::Fr);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("config.json")).unwrap();
        let mut rx = manager.subscribe();
        assert_eq!(rx.borrow().general.language, Language::En);

        manager.set_language(Language::Fr).unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().general.language, Language::Fr);
    }

    #[test]
    fn corrupt_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, "{ not json").unwrap();

        let result = ConfigManager::with_path(config_path);
        assert!(matches!(result, Err(CoreError::Config(_))));
    }
}
