use serde::{Deserialize, Serialize};

use crate::models::AppState;

/// 照合状態マシンの状態
///
/// どちらのストアが正かを決める状態遷移:
/// `Anonymous` → `Authenticating` → `CloudAuthoritative` |
/// `MigrationPending` → `Merged`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileState {
    /// 認証なし。ローカルストアが正
    Anonymous,
    /// ユーザーIDは確定したがデータ未読込
    Authenticating,
    /// リモートにデータがあり、リモートが正
    CloudAuthoritative,
    /// リモートは空でローカルにデータがあり、判断待ち
    MigrationPending,
    /// 移行後。リモートが正
    Merged,
}

/// 競合解決ポリシー
///
/// ローカルとリモートの両方にデータがある場合にユーザーが選択する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// 両方の和集合を採用する（ID衝突と設定はリモート優先）
    MergeBoth,
    /// リモートを採用し、ローカルを破棄する
    KeepCloud,
    /// ローカルの内容でリモートを上書きする
    UseLocal,
}

/// 照合の結果
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// リモートにデータがあり、そのまま採用した
    CloudAdopted(AppState),
    /// ローカルデータをリモートへ移行した
    Migrated(AppState),
    /// 双方とも空（新規アカウント）
    FreshAccount(AppState),
    /// 双方にデータがあり、ポリシー選択待ち
    ConflictPending { local: AppState, remote: AppState },
    /// リモート到達不能でローカルへフォールバックした（移行前のみ）
    LocalFallback(AppState),
}

impl ReconcileOutcome {
    /// 結果に対応する状態マシンの状態を取得する
    pub fn reconcile_state(&self) -> ReconcileState {
        match self {
            ReconcileOutcome::CloudAdopted(_) => ReconcileState::CloudAuthoritative,
            ReconcileOutcome::Migrated(_) => ReconcileState::Merged,
            ReconcileOutcome::FreshAccount(_) => ReconcileState::Merged,
            ReconcileOutcome::ConflictPending { .. } => ReconcileState::MigrationPending,
            ReconcileOutcome::LocalFallback(_) => ReconcileState::Anonymous,
        }
    }

    /// UIキャッシュへ採用すべき状態を取得する
    ///
    /// # 戻り値
    /// 競合待ちの場合は判断までローカル側を表示する
    pub fn adopted_state(&self) -> &AppState {
        match self {
            ReconcileOutcome::CloudAdopted(state)
            | ReconcileOutcome::Migrated(state)
            | ReconcileOutcome::FreshAccount(state)
            | ReconcileOutcome::LocalFallback(state) => state,
            ReconcileOutcome::ConflictPending { local, .. } => local,
        }
    }
}
