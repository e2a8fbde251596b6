use serde_json::Value;

use super::schema;
use crate::models::AppState;
use crate::shared::errors::{AppError, AppResult};

/// アプリケーション状態をエクスポート用JSONへ変換する
///
/// # 引数
/// * `state` - エクスポートする状態
///
/// # 戻り値
/// 整形済み（pretty-printed）のJSONドキュメント
pub fn export_state(state: &AppState) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(state)?)
}

/// エクスポートされたJSONドキュメントを検証して取り込む
///
/// 全サブスクリプションを検証してから状態を返す。1件でも不正なら
/// ドキュメント全体を拒否し、部分的な取り込みは行わない。
/// 設定はデフォルト値とマージされ、旧形式のドキュメントも受理する。
///
/// # 引数
/// * `json` - 取り込むJSONドキュメント
///
/// # 戻り値
/// 置き換え用の状態、または検証エラー
pub fn import_state(json: &str) -> AppResult<AppState> {
    let raw: Value = serde_json::from_str(json)
        .map_err(|e| AppError::validation(format!("JSONの解析に失敗しました: {e}")))?;

    let state: AppState = serde_json::from_value(schema::upgrade_to_current(raw))
        .map_err(|e| AppError::validation(format!("データ形式が正しくありません: {e}")))?;

    for (index, sub) in state.subscriptions.iter().enumerate() {
        let position = index + 1;
        if sub.id.trim().is_empty() {
            return Err(AppError::validation(format!(
                "{position}件目のサブスクリプションにIDがありません"
            )));
        }
        if sub.name.trim().is_empty() {
            return Err(AppError::validation(format!(
                "{position}件目のサブスクリプションに名前がありません"
            )));
        }
        if sub.amount <= 0.0 {
            return Err(AppError::validation(format!(
                "{position}件目のサブスクリプションの金額は正の数値である必要があります"
            )));
        }
        if sub.currency.trim().is_empty() {
            return Err(AppError::validation(format!(
                "{position}件目のサブスクリプションに通貨がありません"
            )));
        }
    }

    Ok(state)
}
