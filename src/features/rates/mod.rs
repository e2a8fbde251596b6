/// 為替レート機能モジュール
///
/// このモジュールは、通貨換算に関連する機能を提供します：
/// - 基準通貨ごとのレート表の時間制限付きキャッシュ
/// - 取得失敗時の期限切れキャッシュ／1対1マッピングへのフォールバック
/// - 基準通貨経由の通貨間換算
pub mod cache;
pub mod models;

// 公開インターフェース
pub use cache::{convert, RateCache};
pub use models::RateEntry;
