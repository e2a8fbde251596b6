use serde_json::Value;

/// 保存ドキュメントを現行スキーマへアップグレードする
///
/// 旧バージョンは設定をネストしたサブオブジェクトで保存していた:
/// `tableSortSettings: {column, direction}` と
/// `notifications: {enabled, reminderDays}`。
/// この関数は読み込み時に一度だけ実行され、値を失わずにフラットな
/// 現行形へ変換する。既に現行形のドキュメントはそのまま通過する。
///
/// # 引数
/// * `document` - 解析済みのJSONドキュメント
///
/// # 戻り値
/// 現行スキーマのJSONドキュメント
pub fn upgrade_to_current(mut document: Value) -> Value {
    if let Some(settings) = document.get_mut("settings").and_then(Value::as_object_mut) {
        // 旧形式: tableSortSettings: {column, direction} | null
        if let Some(sort) = settings.remove("tableSortSettings") {
            if let Value::Object(sort) = sort {
                if let Some(column) = sort.get("column").cloned() {
                    settings.entry("tableSortColumn").or_insert(column);
                }
                if let Some(direction) = sort.get("direction").cloned() {
                    settings.entry("tableSortDirection").or_insert(direction);
                }
            }
        }

        // 旧形式: notifications: {enabled, reminderDays}
        if let Some(notifications) = settings.remove("notifications") {
            if let Value::Object(notifications) = notifications {
                if let Some(enabled) = notifications.get("enabled").cloned() {
                    settings.entry("notificationsEnabled").or_insert(enabled);
                }
                if let Some(days) = notifications.get("reminderDays").cloned() {
                    settings.entry("notificationsReminderDays").or_insert(days);
                }
            }
        }
    }

    document
}
