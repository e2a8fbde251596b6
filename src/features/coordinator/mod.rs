/// 楽観的ミューテーション機能モジュール
///
/// このモジュールは、状態変更の唯一の経路を提供します：
/// - 追加・更新・削除・表示切替・設定変更の楽観的適用
/// - 正のストア（ローカル／リモート）への非同期永続化
/// - 永続化失敗時のスナップショットへの巻き戻し
/// - 認証イベントの購読と照合の起動
mod command;
pub mod service;

// 公開インターフェース
pub use service::Coordinator;
