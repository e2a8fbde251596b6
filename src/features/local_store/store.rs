use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde_json::Value;

use super::schema;
use crate::models::AppState;

/// 状態ドキュメントのファイル名（唯一の保存キー）
const STATE_FILE: &str = "state.json";

/// 移行完了マーカーのファイル名
const MIGRATION_MARKER_FILE: &str = "migration_completed";

/// ローカル状態ストア
///
/// アプリケーション状態を単一のJSONドキュメントとして保存する。
/// 読み込みは決して失敗せず、保存はベストエフォート。ローカルストレージの
/// 障害が呼び出し側をクラッシュさせてはならない。
/// 移行完了マーカーは状態ドキュメントとは別ファイルで保持し、
/// `clear()`後も生き残る。
pub struct LocalStore {
    state_path: PathBuf,
    marker_path: PathBuf,
}

impl LocalStore {
    /// 新しいローカルストアを作成する
    ///
    /// # 引数
    /// * `data_dir` - データ保存先ディレクトリ
    pub fn new(data_dir: &Path) -> Self {
        Self {
            state_path: data_dir.join(STATE_FILE),
            marker_path: data_dir.join(MIGRATION_MARKER_FILE),
        }
    }

    /// ローカル状態を読み込む
    ///
    /// ファイルの欠如・読み込み失敗・JSON破損のいずれもデフォルト状態へ
    /// フォールバックする。旧スキーマのドキュメントはアップグレードして読む。
    ///
    /// # 戻り値
    /// 保存されていた状態、またはデフォルト状態
    pub fn load(&self) -> AppState {
        let text = match fs::read_to_string(&self.state_path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("ローカル状態ファイルが存在しません。初期状態で開始します");
                return AppState::default();
            }
            Err(e) => {
                warn!("ローカル状態の読み込みに失敗しました: {e}");
                return AppState::default();
            }
        };

        let raw: Value = match serde_json::from_str(&text) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("ローカル状態のJSON解析に失敗しました。初期状態へフォールバックします: {e}");
                return AppState::default();
            }
        };

        // 旧スキーマを現行形へアップグレードしてから型付きで読む
        match serde_json::from_value(schema::upgrade_to_current(raw)) {
            Ok(state) => state,
            Err(e) => {
                warn!("ローカル状態の形式が不正です。初期状態へフォールバックします: {e}");
                AppState::default()
            }
        }
    }

    /// ローカル状態を保存する（ベストエフォート）
    ///
    /// 失敗はログに記録して握りつぶす。ストレージ全体の障害が
    /// 呼び出し側の操作を失敗させてはならない。
    ///
    /// # 引数
    /// * `state` - 保存する状態
    pub fn save(&self, state: &AppState) {
        if let Some(parent) = self.state_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("データディレクトリの作成に失敗しました: {e}");
                return;
            }
        }
        let text = match serde_json::to_string_pretty(state) {
            Ok(text) => text,
            Err(e) => {
                warn!("ローカル状態のシリアライズに失敗しました: {e}");
                return;
            }
        };
        if let Err(e) = fs::write(&self.state_path, text) {
            warn!("ローカル状態の書き込みに失敗しました: {e}");
        }
    }

    /// ローカル状態ドキュメントを削除する
    ///
    /// 移行完了マーカーは削除しない。
    pub fn clear(&self) {
        match fs::remove_file(&self.state_path) {
            Ok(()) => debug!("ローカル状態をクリアしました"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("ローカル状態の削除に失敗しました: {e}"),
        }
    }

    /// 移行完了フラグを取得する
    pub fn migration_completed(&self) -> bool {
        self.marker_path.exists()
    }

    /// 移行完了フラグを設定する（ベストエフォート）
    ///
    /// # 引数
    /// * `completed` - 設定する値
    pub fn set_migration_completed(&self, completed: bool) {
        if completed {
            if let Some(parent) = self.marker_path.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    warn!("データディレクトリの作成に失敗しました: {e}");
                    return;
                }
            }
            if let Err(e) = fs::write(&self.marker_path, "1") {
                warn!("移行完了マーカーの書き込みに失敗しました: {e}");
            }
        } else {
            match fs::remove_file(&self.marker_path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("移行完了マーカーの削除に失敗しました: {e}"),
            }
        }
    }
}
