use serde::{Deserialize, Serialize};

/// 認証イベント
///
/// 外部のIDプロバイダから配信される。認証フロー自体はこのクレートの
/// 責務外であり、ここでは結果のイベントだけを扱う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuthEvent {
    /// サインイン完了（ユーザーIDが確定した）
    SignedIn { user_id: String },
    /// サインアウト
    SignedOut,
    /// トークン更新（ユーザーは変わらない）
    TokenRefreshed { user_id: String },
}

/// セッションコンテキスト
///
/// プロセス全体のグローバル状態の代わりに、コーディネータが保持する
/// 明示的なコンテキスト。セッション開始時に生成され、サインイン遷移で
/// ユーザーIDが設定され、サインアウトでクリアされる。
/// `migration_completed`はローカルストアのマーカーのキャッシュであり、
/// セッション開始時にマーカーから初期化される。
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    user_id: Option<String>,
    migration_completed: bool,
}

impl SessionContext {
    /// 新しいセッションコンテキストを作成する（匿名状態）
    pub fn new() -> Self {
        Self::default()
    }

    /// 認証済みセッションを開始する
    ///
    /// # 引数
    /// * `user_id` - IDプロバイダが解決したユーザーID
    pub fn begin(&mut self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        log::info!("認証済みセッションを開始します: user_id={user_id}");
        self.user_id = Some(user_id);
    }

    /// セッションを終了して匿名状態へ戻す
    pub fn end(&mut self) {
        if let Some(user_id) = self.user_id.take() {
            log::info!("セッションを終了しました: user_id={user_id}");
        }
    }

    /// 現在のユーザーIDを取得する
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// 認証済みかどうか
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// 移行完了フラグを取得する
    pub fn migration_completed(&self) -> bool {
        self.migration_completed
    }

    /// 移行完了フラグを設定する
    pub fn set_migration_completed(&mut self, completed: bool) {
        self.migration_completed = completed;
    }
}
