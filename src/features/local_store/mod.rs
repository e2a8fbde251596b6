/// ローカル状態ストア機能モジュール
///
/// このモジュールは、匿名スコープの永続化に関連する機能を提供します：
/// - 単一JSONドキュメントとしての状態の読み込み・保存・クリア
/// - 旧スキーマから現行スキーマへのアップグレード
/// - エクスポート/インポート（検証付きの全置き換え）
/// - 移行完了マーカーの管理
pub mod schema;
pub mod store;
pub mod transfer;

// 公開インターフェース
pub use store::LocalStore;
pub use transfer::{export_state, import_state};
