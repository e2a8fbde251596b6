use chrono::NaiveDate;
use serde::Serialize;

/// 今後の支払い予定（通知サブシステムが読み取り専用で消費する）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingPayment {
    pub subscription_id: String,
    pub name: String,
    pub amount: f64,
    pub currency: String,
    pub due_date: NaiveDate,
}

/// カテゴリ別の集計（月額換算、基準通貨建て）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: String,
    pub monthly_total: f64,
}
