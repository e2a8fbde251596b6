use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Duration, Utc};
use log::{debug, warn};
use serde::Deserialize;

use super::models::RateEntry;
use crate::shared::config::RatesConfig;
use crate::shared::errors::{AppError, AppResult};

/// キャッシュの有効期間（時間）
const RATE_CACHE_MAX_AGE_HOURS: i64 = 24;

/// キャッシュファイル名
const CACHE_FILE: &str = "rates_cache.json";

/// プロバイダのレスポンス形式
#[derive(Debug, Deserialize)]
struct ProviderResponse {
    rates: HashMap<String, f64>,
}

/// 為替レートキャッシュ
///
/// 基準通貨ごとのレート表を24時間キャッシュする。取得失敗時は
/// 期限切れのキャッシュへフォールバックし、それもない場合は
/// 1対1の縮退マッピングを返す。呼び出し側がレート欠如で
/// クラッシュすることはない。
pub struct RateCache {
    cache_path: PathBuf,
    provider_url: String,
    http: reqwest::Client,
    entries: Mutex<HashMap<String, RateEntry>>,
}

impl RateCache {
    /// 新しいレートキャッシュを作成する
    ///
    /// # 引数
    /// * `config` - 為替レートプロバイダ設定
    /// * `data_dir` - キャッシュファイルの保存先ディレクトリ
    pub fn new(config: &RatesConfig, data_dir: &Path) -> Self {
        let cache_path = data_dir.join(CACHE_FILE);
        let entries = load_cache_file(&cache_path);
        Self {
            cache_path,
            provider_url: config.provider_url.clone(),
            http: reqwest::Client::new(),
            entries: Mutex::new(entries),
        }
    }

    /// 基準通貨に対するレート表を取得する
    ///
    /// キャッシュが有効期限内ならそのまま返す。期限切れならプロバイダから
    /// 再取得して保存する。取得失敗時は期限切れキャッシュ、それもなければ
    /// `{基準通貨: 1.0}`の縮退マッピングを返す。
    ///
    /// # 引数
    /// * `base` - 基準通貨コード
    ///
    /// # 戻り値
    /// 通貨コードからレートへのマップ（決して失敗しない）
    pub async fn get_rates(&self, base: &str) -> HashMap<String, f64> {
        let now = Utc::now();
        let max_age = Duration::hours(RATE_CACHE_MAX_AGE_HOURS);
        let cached = self.entries.lock().unwrap().get(base).cloned();

        if let Some(entry) = &cached {
            if entry.is_fresh(now, max_age) {
                debug!("為替レートキャッシュが有効です: base={base}");
                return entry.rates.clone();
            }
        }

        match self.fetch_rates(base).await {
            Ok(rates) => {
                let entry = RateEntry::new(rates.clone(), now);
                self.entries
                    .lock()
                    .unwrap()
                    .insert(base.to_string(), entry);
                self.persist();
                rates
            }
            Err(e) => match cached {
                Some(entry) => {
                    // 期限切れキャッシュへフォールバック
                    warn!("為替レートの取得に失敗しました。期限切れキャッシュを使用します: {e}");
                    entry.rates
                }
                None => {
                    warn!("為替レートの取得に失敗し、キャッシュもありません。1対1レートへフォールバックします: {e}");
                    HashMap::from([(base.to_string(), 1.0)])
                }
            },
        }
    }

    /// プロバイダからレート表を取得する
    async fn fetch_rates(&self, base: &str) -> AppResult<HashMap<String, f64>> {
        let url = format!("{}/{}", self.provider_url.trim_end_matches('/'), base);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::remote(format!(
                "為替レートプロバイダがエラーを返しました: {}",
                response.status()
            )));
        }
        let body: ProviderResponse = response.json().await?;
        Ok(body.rates)
    }

    /// キャッシュをファイルへ保存する（ベストエフォート）
    fn persist(&self) {
        if let Some(parent) = self.cache_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("キャッシュディレクトリの作成に失敗しました: {e}");
                return;
            }
        }
        let entries = self.entries.lock().unwrap();
        match serde_json::to_string(&*entries) {
            Ok(text) => {
                if let Err(e) = fs::write(&self.cache_path, text) {
                    warn!("為替レートキャッシュの書き込みに失敗しました: {e}");
                }
            }
            Err(e) => warn!("為替レートキャッシュのシリアライズに失敗しました: {e}"),
        }
    }
}

/// キャッシュファイルを読み込む（存在しない・壊れている場合は空）
fn load_cache_file(path: &Path) -> HashMap<String, RateEntry> {
    match fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!("為替レートキャッシュの解析に失敗しました。空のキャッシュで開始します: {e}");
            HashMap::new()
        }),
        Err(_) => HashMap::new(),
    }
}

/// 通貨間の金額換算を行う
///
/// レートはプロバイダの固定基準通貨に対する相対値なので、換算は常に
/// その基準通貨を経由する算術になる。変換元と変換先が同じ場合、または
/// どちらかの通貨がレート表にない場合は金額をそのまま返す
/// （フェイルセーフ）。
///
/// # 引数
/// * `amount` - 金額
/// * `from` - 変換元通貨コード
/// * `to` - 変換先通貨コード
/// * `rates` - レート表
///
/// # 戻り値
/// 換算後の金額
pub fn convert(amount: f64, from: &str, to: &str, rates: &HashMap<String, f64>) -> f64 {
    if from == to {
        return amount;
    }
    match (rates.get(from), rates.get(to)) {
        (Some(from_rate), Some(to_rate)) => amount / from_rate * to_rate,
        _ => amount,
    }
}
