use log::warn;

use crate::models::{AppState, Settings, Subscription};

/// 永続化操作の種類
///
/// 楽観的に適用済みのキャッシュをどの操作でストアへ反映するかを表す。
#[derive(Debug)]
pub(crate) enum PersistOp {
    Insert(Subscription),
    Update(Subscription),
    Delete(String),
    Settings(Settings),
    /// 全置き換え（インポート時）。以前の行IDを消してから挿入する
    Replace {
        previous_ids: Vec<String>,
        state: AppState,
    },
}

/// 楽観的ミューテーションコマンド
///
/// 適用前の状態スナップショットを保持する値。永続化が失敗した場合は
/// `rollback`でキャッシュを適用前の状態へ正確に戻す。更新や切り替えは
/// 行を上書きするため、追加分を取り除くだけでは元に戻らない。
pub(crate) struct Command {
    snapshot: AppState,
    description: String,
}

impl Command {
    /// 適用前の状態を記録してコマンドを作成する
    ///
    /// # 引数
    /// * `state` - 適用前のキャッシュ状態
    /// * `description` - ログ用の操作説明
    pub fn capture(state: &AppState, description: impl Into<String>) -> Self {
        Self {
            snapshot: state.clone(),
            description: description.into(),
        }
    }

    /// キャッシュを適用前の状態へ巻き戻す
    ///
    /// # 引数
    /// * `cache` - 巻き戻す対象のキャッシュ
    pub fn rollback(self, cache: &mut AppState) {
        warn!("永続化に失敗したため巻き戻します: {}", self.description);
        *cache = self.snapshot;
    }
}
