use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use super::models::{CategoryTotal, UpcomingPayment};
use crate::features::rates::convert;
use crate::models::AppState;

/// 月額合計を計算する（基準通貨建て）
///
/// 非表示のサブスクリプションは集計から除外する。
///
/// # 引数
/// * `state` - アプリケーション状態
/// * `rates` - 為替レート表
///
/// # 戻り値
/// 基準通貨建ての月額合計
pub fn monthly_total(state: &AppState, rates: &HashMap<String, f64>) -> f64 {
    let primary = &state.settings.primary_currency;
    state
        .subscriptions
        .iter()
        .filter(|sub| !sub.hidden)
        .map(|sub| convert(sub.monthly_amount(), &sub.currency, primary, rates))
        .sum()
}

/// 年額合計を計算する（基準通貨建て）
pub fn yearly_total(state: &AppState, rates: &HashMap<String, f64>) -> f64 {
    let primary = &state.settings.primary_currency;
    state
        .subscriptions
        .iter()
        .filter(|sub| !sub.hidden)
        .map(|sub| convert(sub.yearly_amount(), &sub.currency, primary, rates))
        .sum()
}

/// 契約で確定している残り支払額の合計を計算する（基準通貨建て）
///
/// 契約終了日が未来のサブスクリプションについて、終了日までの
/// 丸ごと経過する月数分の支払いを合計する。
///
/// # 引数
/// * `state` - アプリケーション状態
/// * `rates` - 為替レート表
/// * `today` - 基準日
pub fn locked_in_total(state: &AppState, rates: &HashMap<String, f64>, today: NaiveDate) -> f64 {
    let primary = &state.settings.primary_currency;
    state
        .subscriptions
        .iter()
        .filter(|sub| !sub.hidden)
        .map(|sub| convert(sub.remaining_commitment(today), &sub.currency, primary, rates))
        .sum()
}

/// カテゴリ別の月額内訳を計算する（基準通貨建て）
///
/// # 戻り値
/// 金額の大きい順に並べたカテゴリ別集計
pub fn category_breakdown(state: &AppState, rates: &HashMap<String, f64>) -> Vec<CategoryTotal> {
    let primary = &state.settings.primary_currency;
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for sub in state.subscriptions.iter().filter(|sub| !sub.hidden) {
        let amount = convert(sub.monthly_amount(), &sub.currency, primary, rates);
        *totals.entry(sub.category.as_str()).or_insert(0.0) += amount;
    }

    let mut breakdown: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, monthly_total)| CategoryTotal {
            category: category.to_string(),
            monthly_total,
        })
        .collect();
    // 金額の降順、同額はカテゴリ名順で安定させる
    breakdown.sort_by(|a, b| {
        b.monthly_total
            .partial_cmp(&a.monthly_total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });
    breakdown
}

/// 今後の支払い予定を列挙する
///
/// 非表示でないサブスクリプションの次回請求日を計算し、期間内の
/// ものを日付順に返す。
///
/// # 引数
/// * `state` - アプリケーション状態
/// * `today` - 基準日
/// * `horizon_days` - 何日先まで列挙するか
///
/// # 戻り値
/// 日付順（同日は名前順）の支払い予定
pub fn upcoming_payments(
    state: &AppState,
    today: NaiveDate,
    horizon_days: i64,
) -> Vec<UpcomingPayment> {
    let horizon = today + Duration::days(horizon_days);
    let mut payments: Vec<UpcomingPayment> = state
        .subscriptions
        .iter()
        .filter(|sub| !sub.hidden)
        .filter_map(|sub| {
            let due_date = sub.next_billing_date(today);
            if due_date <= horizon {
                Some(UpcomingPayment {
                    subscription_id: sub.id.clone(),
                    name: sub.name.clone(),
                    amount: sub.amount,
                    currency: sub.currency.clone(),
                    due_date,
                })
            } else {
                None
            }
        })
        .collect();
    payments.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.name.cmp(&b.name)));
    payments
}
