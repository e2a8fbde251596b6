/// リモートバックエンド機能モジュール
///
/// このモジュールは、認証済みスコープの永続化に関連する機能を提供します：
/// - `CloudBackend`トレイト（汎用バックエンドクライアントの契約）
/// - PostgRESTスタイルのREST APIクライアント実装
/// - ワイヤ形式の行モデル（subscriptions / settingsテーブル）
///
/// すべての操作はユーザーIDでスコープされ、書き込みは所有ユーザーの
/// 行以外へ到達できない。
pub mod client;
pub mod models;

#[cfg(test)]
pub(crate) mod testing;

use crate::models::{Settings, Subscription};
use crate::shared::errors::AppResult;

// 公開インターフェース
pub use client::CloudClient;

/// リモートバックエンドの契約
///
/// 全操作は不透明なユーザーIDでスコープされ、失敗し得る。
/// `get_settings`は「レコードなし」を他のエラーと区別して`None`で返す。
/// `bulk_insert_subscriptions`は移行時のみ使用され、部分的な失敗を
/// 成功として報告してはならない。
#[allow(async_fn_in_trait)]
pub trait CloudBackend {
    /// ユーザーのサブスクリプション一覧を取得する
    async fn list_subscriptions(&self, user_id: &str) -> AppResult<Vec<Subscription>>;

    /// サブスクリプションを1件挿入する
    async fn insert_subscription(&self, user_id: &str, sub: &Subscription) -> AppResult<()>;

    /// サブスクリプションを1件更新する（所有ユーザーの行のみ）
    async fn update_subscription(&self, user_id: &str, sub: &Subscription) -> AppResult<()>;

    /// サブスクリプションをIDで削除する（所有ユーザーの行のみ）
    async fn delete_subscription(&self, user_id: &str, id: &str) -> AppResult<()>;

    /// サブスクリプションを一括挿入する（移行専用）
    async fn bulk_insert_subscriptions(
        &self,
        user_id: &str,
        subs: &[Subscription],
    ) -> AppResult<()>;

    /// ユーザーの設定レコードを取得する（存在しない場合はNone）
    async fn get_settings(&self, user_id: &str) -> AppResult<Option<Settings>>;

    /// 設定レコードをupsertする（競合キーはuser_id、リトライに対して冪等）
    async fn upsert_settings(&self, user_id: &str, settings: &Settings) -> AppResult<()>;
}
