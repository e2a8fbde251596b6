use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{BillingCycle, ChartViewMode, Settings, SortDirection, Subscription};

/// subscriptionsテーブルの1行
///
/// 列名はリモートスキーマをそのまま写している（日付列は歴史的経緯で
/// キャメルケース、それ以外はスネークケース）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub amount: f64,
    pub currency: String,
    pub frequency: BillingCycle,
    #[serde(rename = "startDate")]
    pub start_date: NaiveDate,
    #[serde(rename = "commitmentEndDate", default)]
    pub commitment_end_date: Option<NaiveDate>,
    pub category: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

impl SubscriptionRow {
    /// ドメインモデルから行を作成する
    ///
    /// # 引数
    /// * `user_id` - 所有ユーザーID
    /// * `sub` - サブスクリプション
    pub fn from_domain(user_id: &str, sub: &Subscription) -> Self {
        Self {
            id: sub.id.clone(),
            user_id: user_id.to_string(),
            name: sub.name.clone(),
            amount: sub.amount,
            currency: sub.currency.clone(),
            frequency: sub.frequency,
            start_date: sub.start_date,
            commitment_end_date: sub.commitment_end_date,
            category: sub.category.clone(),
            url: sub.url.clone(),
            hidden: sub.hidden,
        }
    }

    /// 行をドメインモデルへ変換する（user_id列は落とす）
    pub fn into_domain(self) -> Subscription {
        Subscription {
            id: self.id,
            name: self.name,
            amount: self.amount,
            currency: self.currency,
            frequency: self.frequency,
            start_date: self.start_date,
            commitment_end_date: self.commitment_end_date,
            category: self.category,
            url: self.url,
            hidden: self.hidden,
        }
    }
}

/// settingsテーブルの1行（user_id UNIQUE）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsRow {
    pub user_id: String,
    pub chart_view_mode: ChartViewMode,
    #[serde(default)]
    pub table_sort_settings_column: Option<String>,
    #[serde(default)]
    pub table_sort_settings_direction: Option<SortDirection>,
    pub primary_currency: String,
    pub notifications_enabled: bool,
    pub notifications_reminder_days: u32,
}

impl SettingsRow {
    /// ドメインモデルから行を作成する
    pub fn from_domain(user_id: &str, settings: &Settings) -> Self {
        Self {
            user_id: user_id.to_string(),
            chart_view_mode: settings.chart_view_mode,
            table_sort_settings_column: settings.table_sort_column.clone(),
            table_sort_settings_direction: settings.table_sort_direction,
            primary_currency: settings.primary_currency.clone(),
            notifications_enabled: settings.notifications_enabled,
            notifications_reminder_days: settings.notifications_reminder_days,
        }
    }

    /// 行をドメインモデルへ変換する
    ///
    /// ソート設定は列名と方向の両方が揃っている場合のみ採用する。
    pub fn into_domain(self) -> Settings {
        let (column, direction) = match (
            self.table_sort_settings_column,
            self.table_sort_settings_direction,
        ) {
            (Some(column), Some(direction)) => (Some(column), Some(direction)),
            _ => (None, None),
        };
        Settings {
            chart_view_mode: self.chart_view_mode,
            table_sort_column: column,
            table_sort_direction: direction,
            primary_currency: self.primary_currency,
            notifications_enabled: self.notifications_enabled,
            notifications_reminder_days: self.notifications_reminder_days,
        }
    }
}
