//! # olivescan-app
//!
//! OliveScan 바이너리 진입점.
//! 설정 로드, 어댑터 조립(DI), 탐지/기록/설정 명령 실행.

mod detection_service;
mod output;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use olivescan_core::config::validate_server_url;
use olivescan_core::config_manager::ConfigManager;
use olivescan_core::error::CoreError;
use olivescan_core::locale::{Language, Strings};
use olivescan_core::ports::history::HistoryStore;
use olivescan_network::detection_client::HttpLeafDetector;
use olivescan_storage::sqlite::SqliteHistoryStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::detection_service::DetectionService;

/// 서버 URL 환경 변수 (설정 파일보다 우선, `--server`보다 후순위)
const SERVER_URL_ENV: &str = "OLIVESCAN_SERVER_URL";
/// 기록 DB 파일 이름
const DB_FILE_NAME: &str = "olivescan.db";
/// `history watch`의 DB 재확인 간격
const WATCH_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// OliveScan: 올리브 잎 병해 탐지 클라이언트
#[derive(Parser, Debug)]
#[command(name = "olivescan")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 추론 서버 URL 재정의 (설정 파일에는 저장하지 않음)
    #[arg(long, short = 's', global = true)]
    server: Option<String>,

    /// 기록 DB 디렉토리 (기본: 설정값 또는 플랫폼 데이터 디렉토리)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 잎 사진을 서버에 보내 병해 탐지
    Detect {
        /// 이미지 파일 (JPEG/PNG 등)
        image: PathBuf,

        /// 결과를 기록에 저장하지 않음
        #[arg(long)]
        no_save: bool,

        /// 서버가 돌려준 주석 이미지를 파일로 저장
        #[arg(long, value_name = "PATH")]
        save_annotated: Option<PathBuf>,
    },

    /// 탐지 기록
    #[command(subcommand)]
    History(HistoryCommand),

    /// 설정
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum HistoryCommand {
    /// 전체 기록 (최신순)
    List,
    /// 기록 1건 상세
    Show {
        id: i64,
        /// 저장된 주석 이미지를 파일로 내보내기
        #[arg(long, value_name = "PATH")]
        save_annotated: Option<PathBuf>,
    },
    /// 기록 1건 삭제
    Delete { id: i64 },
    /// 전체 기록 삭제
    Clear,
    /// 기록이 바뀔 때마다 목록 출력 (Ctrl+C로 종료)
    Watch,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// 현재 설정
    Show,
    /// 추론 서버 URL 저장
    SetServer { url: String },
    /// 표시 언어 저장 (en, fr, ar)
    SetLanguage { code: String },
}

/// 데이터베이스 경로 결정
///
/// 우선순위: `--data-dir` → 설정 파일의 `storage.data_dir` → 플랫폼 기본 경로
///
/// # 플랫폼별 기본 경로:
/// - macOS: `~/Library/Application Support/org.olivescan.olivescan/olivescan.db`
/// - Windows: `%APPDATA%\olivescan\olivescan\data\olivescan.db`
/// - Linux: `~/.local/share/olivescan/olivescan.db`
fn resolve_db_path(cli_dir: Option<&Path>, config: &ConfigManager) -> PathBuf {
    cli_dir
        .map(Path::to_path_buf)
        .or_else(|| config.get().storage.data_dir)
        .or_else(|| ConfigManager::data_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DB_FILE_NAME)
}

/// 실행 시점 서버 URL 재정의: `--server` → 환경 변수
fn resolve_server_override(cli: Option<String>) -> Result<Option<String>, CoreError> {
    let server = cli.or_else(|| {
        std::env::var(SERVER_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
    });
    if let Some(url) = &server {
        validate_server_url(url)?;
    }
    Ok(server)
}

fn init_tracing(level: &str) {
    let log_filter = format!(
        "olivescan={level},olivescan_app={level},olivescan_core={level},olivescan_network={level},olivescan_storage={level}"
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    }
    .context("설정 로드 실패")?;
    debug!("설정 파일: {}", config.config_path().display());

    let strings = config.language().strings();

    match args.command {
        Command::Config(cmd) => run_config(cmd, &config, args.server),
        Command::Detect {
            image,
            no_save,
            save_annotated,
        } => {
            let store = open_store(args.data_dir.as_deref(), &config)?;
            let detector = Arc::new(HttpLeafDetector::new()?);
            let service = DetectionService::new(detector, store, config.clone())
                .with_server_override(resolve_server_override(args.server)?);
            run_detect(&service, strings, &image, !no_save, save_annotated.as_deref()).await
        }
        Command::History(cmd) => {
            let store = open_store(args.data_dir.as_deref(), &config)?;
            run_history(cmd, store, strings).await
        }
    }
}

fn open_store(cli_dir: Option<&Path>, config: &ConfigManager) -> Result<Arc<SqliteHistoryStore>> {
    let db_path = resolve_db_path(cli_dir, config);
    let store = SqliteHistoryStore::open(&db_path)
        .with_context(|| format!("기록 DB 열기 실패: {}", db_path.display()))?;
    Ok(Arc::new(store))
}

async fn run_detect(
    service: &DetectionService,
    strings: &Strings,
    image: &Path,
    save: bool,
    save_annotated: Option<&Path>,
) -> Result<()> {
    info!("탐지 시작: {} -> {}", image.display(), service.server_url());
    eprintln!("{}", strings.detecting);

    let outcome = service.run(image, save).await?;
    if !outcome.result.success {
        bail!(
            "{}: {}",
            strings.detection_failed,
            outcome.result.error.as_deref().unwrap_or("-")
        );
    }
    output::print_detection(strings, &outcome.result, outcome.record_id);

    if let (Some(path), Some(annotated)) = (save_annotated, &outcome.result.result_image) {
        write_annotated(path, &annotated.bytes)?;
        println!("{} {}", strings.annotated_image_saved, path.display());
    } else if save_annotated.is_some() {
        warn!("서버 응답에 표시 가능한 주석 이미지가 없음");
    }

    Ok(())
}

async fn run_history(
    cmd: HistoryCommand,
    store: Arc<SqliteHistoryStore>,
    strings: &Strings,
) -> Result<()> {
    match cmd {
        HistoryCommand::List => {
            let records = store.list_all().await?;
            output::print_history(strings, &records);
        }
        HistoryCommand::Show { id, save_annotated } => {
            let record = store
                .get(id)
                .await?
                .ok_or_else(|| not_found(strings, id))?;
            output::print_record(strings, &record);
            if let (Some(path), Some(bytes)) = (save_annotated, &record.result_image) {
                write_annotated(&path, bytes)?;
                println!("{} {}", strings.annotated_image_saved, path.display());
            }
        }
        HistoryCommand::Delete { id } => {
            if !store.delete_by_id(id).await? {
                return Err(not_found(strings, id));
            }
            println!("{} #{id}", strings.history_deleted);
        }
        HistoryCommand::Clear => {
            let removed = store.clear().await?;
            info!("기록 {removed}건 삭제");
            println!("{} ({removed})", strings.history_cleared);
        }
        HistoryCommand::Watch => watch_history(store, strings).await?,
    }
    Ok(())
}

/// 스냅샷이 바뀔 때마다 목록 출력
///
/// 다른 프로세스의 기록 변경은 주기적인 `refresh`로 반영한다.
async fn watch_history(store: Arc<SqliteHistoryStore>, strings: &Strings) -> Result<()> {
    eprintln!("{}", strings.history_watching);

    let refresher = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(WATCH_REFRESH_INTERVAL);
            loop {
                ticker.tick().await;
                if let Err(e) = store.refresh().await {
                    warn!("기록 새로고침 실패: {e}");
                }
            }
        })
    };

    let mut snapshots = WatchStream::new(store.subscribe());
    loop {
        tokio::select! {
            next = snapshots.next() => match next {
                Some(records) => output::print_history(strings, &records),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                debug!("기록 감시 종료");
                break;
            }
        }
    }

    refresher.abort();
    Ok(())
}

fn run_config(cmd: ConfigCommand, config: &ConfigManager, server: Option<String>) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let effective = resolve_server_override(server)?.unwrap_or_else(|| config.server_url());
            output::print_config(
                config.language().strings(),
                &config.get(),
                &effective,
                config.config_path(),
            );
        }
        ConfigCommand::SetServer { url } => {
            config.set_server_url(url.trim())?;
            println!("{}", config.language().strings().settings_saved);
        }
        ConfigCommand::SetLanguage { code } => {
            let language = Language::parse_code(&code).ok_or_else(|| CoreError::Validation {
                field: "language".to_string(),
                message: format!("지원하지 않는 언어 코드: {code} (en, fr, ar)"),
            })?;
            config.set_language(language)?;
            // 새 언어로 확인 메시지
            println!("{}", language.strings().settings_saved);
        }
    }
    Ok(())
}

fn write_annotated(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("디렉토리 생성 실패: {}", parent.display()))?;
        }
    }
    std::fs::write(path, bytes).with_context(|| format!("파일 쓰기 실패: {}", path.display()))
}

fn not_found(strings: &Strings, id: i64) -> anyhow::Error {
    anyhow::Error::new(CoreError::NotFound {
        resource_type: "DetectionHistory".to_string(),
        id: id.to_string(),
    })
    .context(format!("{} #{id}", strings.history_not_found))
}
