use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// 為替レートキャッシュエントリ
///
/// レートはプロバイダの固定基準通貨に対する相対値。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub rates: HashMap<String, f64>,
    pub timestamp: DateTime<Utc>,
}

impl RateEntry {
    /// 新しいキャッシュエントリを作成する
    pub fn new(rates: HashMap<String, f64>, timestamp: DateTime<Utc>) -> Self {
        Self { rates, timestamp }
    }

    /// エントリが有効期限内かどうかを判定する
    ///
    /// # 引数
    /// * `now` - 現在時刻
    /// * `max_age` - 有効期間
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.timestamp < max_age
    }
}
