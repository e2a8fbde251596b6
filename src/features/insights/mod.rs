/// 集計機能モジュール
///
/// このモジュールは、読み取り専用の集計・射影を提供します：
/// - 月額／年額合計（基準通貨建て、非表示分を除外）
/// - 契約で確定している残り支払額の合計
/// - カテゴリ別内訳
/// - 今後の支払い予定（通知サブシステム向けの射影）
pub mod models;
pub mod service;

// 公開インターフェース
pub use models::{CategoryTotal, UpcomingPayment};
pub use service::{
    category_breakdown, locked_in_total, monthly_total, upcoming_payments, yearly_total,
};
