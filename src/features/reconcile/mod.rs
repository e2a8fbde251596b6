/// 状態照合機能モジュール
///
/// このモジュールは、ローカル／リモートのどちらのストアが正かを決める
/// 状態マシンを提供します：
/// - サインイン時の照合（リモート採用・自動移行・新規アカウント）
/// - サインアウト時のローカル復帰
/// - 競合解決ポリシー（両方マージ／クラウド優先／ローカル優先）
/// - リモート失敗時のフォールバック規則
pub mod models;
pub mod service;

// 公開インターフェース
pub use models::{ConflictPolicy, ReconcileOutcome, ReconcileState};
pub use service::{apply_conflict_policy, reconcile_signed_in, reconcile_signed_out};
