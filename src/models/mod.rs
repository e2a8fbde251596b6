use serde::{Deserialize, Serialize};

pub mod settings;
pub mod subscription;

pub use settings::{ChartViewMode, Settings, SortDirection};
pub use subscription::{BillingCycle, Subscription};

/// アプリケーション状態の集約
///
/// ローカル保存・エクスポート/インポート・バックアップの単位。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub subscriptions: Vec<Subscription>,
    pub settings: Settings,
}

impl AppState {
    /// IDでサブスクリプションを検索する
    pub fn find_subscription(&self, id: &str) -> Option<&Subscription> {
        self.subscriptions.iter().find(|sub| sub.id == id)
    }

    /// サブスクリプションを1件も保持していないかどうか
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
