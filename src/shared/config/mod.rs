use std::path::PathBuf;

use log::{info, warn};

/// リモートバックエンド接続設定
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// バックエンドAPIのベースURL
    pub base_url: String,
    /// APIキー（全リクエストに付与する）
    pub api_key: String,
    /// リクエストタイムアウト（秒）
    pub timeout_seconds: u64,
    /// 一時的エラー時の最大リトライ回数
    pub max_retries: u32,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            api_key: String::new(),
            timeout_seconds: 30,
            max_retries: 3,
        }
    }
}

impl CloudConfig {
    /// 環境変数からリモートバックエンド設定を読み込む
    ///
    /// # 戻り値
    /// 環境変数が未設定の項目はデフォルト値で埋めた設定
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("CLOUD_API_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            api_key: std::env::var("CLOUD_API_KEY").unwrap_or_default(),
            timeout_seconds: std::env::var("CLOUD_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            max_retries: std::env::var("CLOUD_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
        }
    }
}

/// 為替レートプロバイダ設定
#[derive(Debug, Clone)]
pub struct RatesConfig {
    /// レート取得エンドポイントのベースURL（末尾に基準通貨コードを付けて使用）
    pub provider_url: String,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            provider_url: "https://api.exchangerate-api.com/v4/latest".to_string(),
        }
    }
}

impl RatesConfig {
    /// 環境変数から為替レートプロバイダ設定を読み込む
    pub fn from_env() -> Self {
        Self {
            provider_url: std::env::var("RATES_PROVIDER_URL")
                .unwrap_or_else(|_| Self::default().provider_url),
        }
    }
}

/// アプリケーションコア全体の設定
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// リモートバックエンド設定
    pub cloud: CloudConfig,
    /// 為替レートプロバイダ設定
    pub rates: RatesConfig,
    /// ローカルデータの保存先ディレクトリ
    pub data_dir: PathBuf,
    /// ログレベル
    pub log_level: String,
}

impl CoreConfig {
    /// 環境変数からアプリケーション設定を読み込む
    ///
    /// # 戻り値
    /// `.env`ファイル（存在する場合）と環境変数から組み立てた設定
    pub fn from_env() -> Self {
        // 環境変数を読み込み（.envファイルがある場合）
        if dotenv::dotenv().is_err() {
            // .envファイルがない場合は無視（本番環境では環境変数が直接設定される）
            warn!(".envファイルが見つかりません。環境変数が直接設定されていることを確認してください。");
        } else {
            info!(".envファイルを読み込みました");
        }

        Self {
            cloud: CloudConfig::from_env(),
            rates: RatesConfig::from_env(),
            data_dir: std::env::var("SUBFOLIO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_data_dir()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

/// デフォルトのローカルデータ保存先を取得する
///
/// # 戻り値
/// OSのデータディレクトリ配下の専用ディレクトリ（取得できない場合はカレントディレクトリ）
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("subfolio")
}

/// ログシステムを初期化
///
/// # 引数
/// * `log_level` - ログレベル文字列（error / warn / info / debug / trace）
pub fn init_logging(log_level: &str) {
    // ログレベルを設定
    let level = match log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    // env_loggerを初期化（二重初期化はテスト実行時に起こり得るため無視する）
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .try_init();

    info!("ログシステムを初期化しました: level={log_level}");
}
