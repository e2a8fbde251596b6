use chrono::{Datelike, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::shared::errors::{AppError, AppResult};

/// ISO 4217通貨コードの形式（大文字3文字）
static CURRENCY_CODE: Lazy<Regex> = Lazy::new(|| Regex::new("^[A-Z]{3}$").unwrap());

/// 課金サイクル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

/// サブスクリプションデータモデル
///
/// `id`は作成時にクライアント側で生成され、以後変更されない。
/// `hidden`は集計・グラフから除外するためのフラグであり、保存対象からは除外しない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub currency: String,
    /// 課金サイクル（旧エクスポートの`cycle`/`billingCycle`キーも受理する）
    #[serde(alias = "cycle", alias = "billingCycle")]
    pub frequency: BillingCycle,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub commitment_end_date: Option<NaiveDate>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

fn default_category() -> String {
    "Other".to_string()
}

impl Subscription {
    /// 新しいサブスクリプションを作成する（IDはクライアント側で生成）
    ///
    /// # 引数
    /// * `name` - サービス名
    /// * `amount` - 金額
    /// * `currency` - 通貨コード（ISO 4217）
    /// * `frequency` - 課金サイクル
    /// * `start_date` - 初回請求日
    ///
    /// # 戻り値
    /// デフォルトカテゴリ・非表示フラグ無しで初期化されたサブスクリプション
    pub fn new(
        name: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
        frequency: BillingCycle,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            amount,
            currency: currency.into(),
            frequency,
            start_date,
            commitment_end_date: None,
            category: default_category(),
            url: None,
            hidden: false,
        }
    }

    /// サブスクリプションの内容を検証する
    ///
    /// # 戻り値
    /// 検証成功時はOk(())、失敗時はバリデーションエラー
    pub fn validate(&self) -> AppResult<()> {
        if self.id.trim().is_empty() {
            return Err(AppError::validation("IDが設定されていません"));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::validation("サービス名を入力してください"));
        }
        if self.name.len() > 100 {
            return Err(AppError::validation(
                "サービス名は100文字以内で入力してください",
            ));
        }
        if self.amount <= 0.0 {
            return Err(AppError::validation("金額は正の数値である必要があります"));
        }
        if self.amount > 9_999_999_999.0 {
            return Err(AppError::validation("金額は10桁以内で入力してください"));
        }
        if !CURRENCY_CODE.is_match(&self.currency) {
            return Err(AppError::validation(
                "通貨コードはISO 4217形式（大文字3文字）で入力してください",
            ));
        }
        if let Some(url) = &self.url {
            // 絶対URLのみ受理する
            if url::Url::parse(url).is_err() {
                return Err(AppError::validation("URLの形式が正しくありません"));
            }
        }
        Ok(())
    }

    /// 月額換算の金額を取得する
    pub fn monthly_amount(&self) -> f64 {
        match self.frequency {
            BillingCycle::Monthly => self.amount,
            BillingCycle::Yearly => self.amount / 12.0,
        }
    }

    /// 年額換算の金額を取得する
    pub fn yearly_amount(&self) -> f64 {
        match self.frequency {
            BillingCycle::Monthly => self.amount * 12.0,
            BillingCycle::Yearly => self.amount,
        }
    }

    /// 契約期間中の残り支払額を計算する
    ///
    /// 契約終了日までの「丸ごと経過する月数」に月額換算金額を掛ける。
    /// 端数の月は切り捨て、終了日が過去または未設定の場合は0を返す。
    ///
    /// # 引数
    /// * `today` - 基準日
    ///
    /// # 戻り値
    /// 残り支払額（サブスクリプションの通貨建て）
    pub fn remaining_commitment(&self, today: NaiveDate) -> f64 {
        match self.commitment_end_date {
            Some(end) => {
                let months = whole_months_between(today, end);
                self.monthly_amount() * f64::from(months)
            }
            None => 0.0,
        }
    }

    /// 次回の請求日を計算する
    ///
    /// 初回請求日から課金サイクル刻みで進めて、基準日以降の最初の日付を返す。
    /// 月末開始（例: 1月31日）の場合は各月の末日に丸められる。
    ///
    /// # 引数
    /// * `today` - 基準日
    ///
    /// # 戻り値
    /// 次回請求日（基準日当日も含む）
    pub fn next_billing_date(&self, today: NaiveDate) -> NaiveDate {
        if self.start_date >= today {
            return self.start_date;
        }
        let step = match self.frequency {
            BillingCycle::Monthly => 1,
            BillingCycle::Yearly => 12,
        };
        let elapsed = whole_months_between(self.start_date, today);
        let mut n = (elapsed / step) * step;
        let mut candidate = add_months(self.start_date, n);
        while candidate < today {
            n += step;
            candidate = add_months(self.start_date, n);
        }
        candidate
    }
}

/// 2つの日付の間に丸ごと経過する月数を計算する
///
/// 日付の「日」が基準日より手前の場合はその月を数えない（端数切り捨て）。
/// `to`が`from`以前の場合は0を返す。
pub(crate) fn whole_months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if to <= from {
        return 0;
    }
    let mut months =
        (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32);
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// 日付に月数を加算する（存在しない日は月末に丸める）
pub(crate) fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}
