use serde::{Deserialize, Serialize};

/// グラフの表示モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartViewMode {
    Monthly,
    Yearly,
}

impl Default for ChartViewMode {
    fn default() -> Self {
        ChartViewMode::Monthly
    }
}

/// テーブルのソート方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// ユーザー設定（スコープごとに1レコード）
///
/// 現行の正準形はフラットな形であり、旧来のネストした
/// `tableSortSettings`/`notifications`サブオブジェクトは読み込み時に
/// スキーマアップグレードで変換される（`features::local_store::schema`参照）。
/// 欠けているフィールドはデフォルト値で補完され、エラーにはならない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub chart_view_mode: ChartViewMode,
    pub table_sort_column: Option<String>,
    pub table_sort_direction: Option<SortDirection>,
    pub primary_currency: String,
    pub notifications_enabled: bool,
    pub notifications_reminder_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chart_view_mode: ChartViewMode::default(),
            table_sort_column: None,
            table_sort_direction: None,
            primary_currency: "USD".to_string(),
            notifications_enabled: false,
            notifications_reminder_days: 3,
        }
    }
}

impl Settings {
    /// ソート設定を対で取得する
    ///
    /// # 戻り値
    /// 列名と方向の両方が設定されている場合のみSome
    pub fn table_sort(&self) -> Option<(&str, SortDirection)> {
        match (&self.table_sort_column, self.table_sort_direction) {
            (Some(column), Some(direction)) => Some((column.as_str(), direction)),
            _ => None,
        }
    }
}
