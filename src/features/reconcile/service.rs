use std::collections::HashSet;

use log::{info, warn};

use super::models::{ConflictPolicy, ReconcileOutcome};
use crate::features::auth::SessionContext;
use crate::features::cloud::CloudBackend;
use crate::features::local_store::LocalStore;
use crate::models::AppState;
use crate::shared::errors::{AppError, AppResult};

/// サインイン時の照合を実行する
///
/// どちらのストアが正かを決め、必要なら自動移行を行う。
/// `ctx.migration_completed`が既に設定されている場合はリモートを
/// そのまま採用するだけであり、再実行しても移行は重複しない（冪等）。
///
/// # 引数
/// * `cloud` - リモートバックエンド
/// * `local` - ローカルストア
/// * `ctx` - セッションコンテキスト（ユーザーID確定済みであること）
/// * `interactive` - 競合時にポリシー選択を呼び出し側へ委ねるか
///
/// # 戻り値
/// 照合の結果、または失敗時はエラー
pub async fn reconcile_signed_in<C: CloudBackend>(
    cloud: &C,
    local: &LocalStore,
    ctx: &mut SessionContext,
    interactive: bool,
) -> AppResult<ReconcileOutcome> {
    let user_id = ctx
        .user_id()
        .ok_or_else(|| AppError::configuration("ユーザーIDが設定されていません"))?
        .to_string();

    // リモート読み込み。移行前の失敗はローカルへフォールバックする
    let remote_subs = match cloud.list_subscriptions(&user_id).await {
        Ok(subs) => subs,
        Err(e) => return fallback_on_remote_error(local, ctx, e),
    };
    let remote_settings = match cloud.get_settings(&user_id).await {
        Ok(settings) => settings,
        Err(e) => return fallback_on_remote_error(local, ctx, e),
    };

    let remote_has_data = !remote_subs.is_empty() || remote_settings.is_some();
    let remote_state = AppState {
        subscriptions: remote_subs,
        settings: remote_settings.unwrap_or_default(),
    };

    // 移行済みならリモートが正。ローカルを蘇らせない
    if ctx.migration_completed() {
        return Ok(ReconcileOutcome::CloudAdopted(remote_state));
    }

    let local_state = local.load();

    if remote_has_data {
        if interactive && !local_state.is_empty() {
            // 双方にデータがある。判断はユーザーへ
            info!(
                "ローカルとリモートの両方にデータがあります: local={}件, remote={}件",
                local_state.subscriptions.len(),
                remote_state.subscriptions.len()
            );
            return Ok(ReconcileOutcome::ConflictPending {
                local: local_state,
                remote: remote_state,
            });
        }

        // クラウド優先: リモートにデータがある時点でローカルは使い捨てにできる
        info!(
            "リモートのデータを採用します: {}件",
            remote_state.subscriptions.len()
        );
        local.clear();
        local.set_migration_completed(true);
        ctx.set_migration_completed(true);
        return Ok(ReconcileOutcome::CloudAdopted(remote_state));
    }

    if !local_state.is_empty() {
        // 自動移行: ローカルデータをリモートへコピーする
        info!(
            "ローカルデータをリモートへ移行します: {}件, user_id={user_id}",
            local_state.subscriptions.len()
        );
        if let Err(e) = cloud
            .bulk_insert_subscriptions(&user_id, &local_state.subscriptions)
            .await
        {
            // 移行失敗: フラグもローカルも触らない
            return fallback_on_remote_error(local, ctx, e);
        }
        if let Err(e) = cloud.upsert_settings(&user_id, &local_state.settings).await {
            return fallback_on_remote_error(local, ctx, e);
        }

        // 一括書き込みの確認が取れてから初めてフラグ設定とクリアを行う
        local.set_migration_completed(true);
        ctx.set_migration_completed(true);
        local.clear();
        info!("移行が完了しました: user_id={user_id}");
        return Ok(ReconcileOutcome::Migrated(local_state));
    }

    // 双方とも空: 移行対象なし。フラグだけ立てる
    info!("新規アカウントです。移行対象はありません: user_id={user_id}");
    local.set_migration_completed(true);
    ctx.set_migration_completed(true);
    Ok(ReconcileOutcome::FreshAccount(local_state))
}

/// サインアウト時の照合を実行する
///
/// セッションを終了し、ローカルストアだけから再読み込みする。
/// 次のサインインまでリモートには触れない。
///
/// # 引数
/// * `local` - ローカルストア
/// * `ctx` - セッションコンテキスト
///
/// # 戻り値
/// ローカルの状態
pub fn reconcile_signed_out(local: &LocalStore, ctx: &mut SessionContext) -> AppState {
    ctx.end();
    local.load()
}

/// 競合解決ポリシーを適用する
///
/// どのポリシーでも、リモートへの書き込みが確認できてから
/// ローカルのクリアと移行完了フラグの設定を行い、以後はリモートが正になる。
/// 途中の失敗は状態を変えずにエラーとして返す（再試行可能）。
///
/// # 引数
/// * `cloud` - リモートバックエンド
/// * `local` - ローカルストア
/// * `ctx` - セッションコンテキスト
/// * `policy` - ユーザーが選択したポリシー
///
/// # 戻り値
/// 解決後の状態、または失敗時はエラー
pub async fn apply_conflict_policy<C: CloudBackend>(
    cloud: &C,
    local: &LocalStore,
    ctx: &mut SessionContext,
    policy: ConflictPolicy,
) -> AppResult<AppState> {
    let user_id = ctx
        .user_id()
        .ok_or_else(|| AppError::configuration("ユーザーIDが設定されていません"))?
        .to_string();

    let local_state = local.load();
    let remote_subs = cloud.list_subscriptions(&user_id).await?;
    let remote_settings = cloud.get_settings(&user_id).await?;

    let resolved = match policy {
        ConflictPolicy::KeepCloud => AppState {
            subscriptions: remote_subs,
            settings: remote_settings.unwrap_or_default(),
        },
        ConflictPolicy::MergeBoth => {
            // 和集合。ID衝突はリモート優先
            let remote_ids: HashSet<&str> =
                remote_subs.iter().map(|sub| sub.id.as_str()).collect();
            let local_only: Vec<_> = local_state
                .subscriptions
                .iter()
                .filter(|sub| !remote_ids.contains(sub.id.as_str()))
                .cloned()
                .collect();
            if !local_only.is_empty() {
                cloud
                    .bulk_insert_subscriptions(&user_id, &local_only)
                    .await?;
            }

            // 設定はリモート優先。リモートになければローカルを昇格させる
            let settings = match remote_settings {
                Some(settings) => settings,
                None => {
                    cloud
                        .upsert_settings(&user_id, &local_state.settings)
                        .await?;
                    local_state.settings.clone()
                }
            };

            let mut subscriptions = remote_subs;
            subscriptions.extend(local_only);
            AppState {
                subscriptions,
                settings,
            }
        }
        ConflictPolicy::UseLocal => {
            // リモートの行を消してからローカルの内容で置き換える
            for sub in &remote_subs {
                cloud.delete_subscription(&user_id, &sub.id).await?;
            }
            cloud
                .bulk_insert_subscriptions(&user_id, &local_state.subscriptions)
                .await?;
            cloud
                .upsert_settings(&user_id, &local_state.settings)
                .await?;
            local_state.clone()
        }
    };

    // 書き込み確認後にのみ、どちらのポリシーでもリモートが正になる
    local.set_migration_completed(true);
    ctx.set_migration_completed(true);
    local.clear();
    info!("競合を解決しました: policy={policy:?}, user_id={user_id}");
    Ok(resolved)
}

/// リモート失敗時のフォールバック処理
///
/// 移行前はローカルの状態へ落とす。移行完了後はローカルを正として
/// 提示してはならないため、エラーをそのまま返す。
fn fallback_on_remote_error(
    local: &LocalStore,
    ctx: &SessionContext,
    error: AppError,
) -> AppResult<ReconcileOutcome> {
    if ctx.migration_completed() {
        return Err(error);
    }
    warn!("リモート操作に失敗しました。ローカルの状態へフォールバックします: {error}");
    Ok(ReconcileOutcome::LocalFallback(local.load()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::cloud::testing::MemoryBackend;
    use crate::features::reconcile::models::ReconcileState;
    use crate::models::{BillingCycle, Settings, Subscription};
    use chrono::NaiveDate;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn sub(id: &str) -> Subscription {
        let mut sub = Subscription::new(
            format!("Service {id}"),
            10.0,
            "USD",
            BillingCycle::Monthly,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        sub.id = id.to_string();
        sub
    }

    fn local_with(dir: &TempDir, subs: Vec<Subscription>) -> LocalStore {
        let store = LocalStore::new(dir.path());
        store.save(&AppState {
            subscriptions: subs,
            settings: Settings::default(),
        });
        store
    }

    fn signed_in_ctx(local: &LocalStore) -> SessionContext {
        let mut ctx = SessionContext::new();
        ctx.set_migration_completed(local.migration_completed());
        ctx.begin("user-1");
        ctx
    }

    #[tokio::test]
    async fn test_cloud_first_adoption() {
        // リモート2件、ローカル3件 → デフォルトポリシーではリモートを採用
        let dir = TempDir::new().unwrap();
        let local = local_with(&dir, vec![sub("l1"), sub("l2"), sub("l3")]);
        let cloud = MemoryBackend::new();
        cloud.seed_subscriptions("user-1", vec![sub("r1"), sub("r2")]);
        let mut ctx = signed_in_ctx(&local);

        let outcome = reconcile_signed_in(&cloud, &local, &mut ctx, false)
            .await
            .unwrap();

        let ReconcileOutcome::CloudAdopted(state) = outcome else {
            panic!("リモート採用になるはず: {outcome:?}");
        };
        assert_eq!(state.subscriptions.len(), 2);
        // ローカルはクリアされ、フラグが立つ
        assert!(local.load().is_empty());
        assert!(local.migration_completed());
        assert!(ctx.migration_completed());
    }

    #[tokio::test]
    async fn test_auto_migration_moves_local_to_remote() {
        // リモート0件、ローカル3件 → 自動移行
        let dir = TempDir::new().unwrap();
        let local = local_with(&dir, vec![sub("l1"), sub("l2"), sub("l3")]);
        let cloud = MemoryBackend::new();
        let mut ctx = signed_in_ctx(&local);

        let outcome = reconcile_signed_in(&cloud, &local, &mut ctx, false)
            .await
            .unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Migrated(_)));
        // リモートがちょうど3件を受け取り、ユーザーにスコープされている
        assert_eq!(cloud.subscriptions_for("user-1").len(), 3);
        assert!(cloud.settings_for("user-1").is_some());
        assert!(local.load().is_empty());
        assert!(local.migration_completed());
    }

    #[tokio::test]
    async fn test_failed_bulk_write_leaves_local_intact() {
        let dir = TempDir::new().unwrap();
        let local = local_with(&dir, vec![sub("l1"), sub("l2"), sub("l3")]);
        let cloud = MemoryBackend::new();
        cloud.fail_bulk_insert.store(true, Ordering::Relaxed);
        let mut ctx = signed_in_ctx(&local);

        let outcome = reconcile_signed_in(&cloud, &local, &mut ctx, false)
            .await
            .unwrap();

        // ローカルへフォールバックし、クリアもフラグ設定も行われない
        assert!(matches!(outcome, ReconcileOutcome::LocalFallback(_)));
        assert_eq!(local.load().subscriptions.len(), 3);
        assert!(!local.migration_completed());
        assert!(!ctx.migration_completed());
    }

    #[tokio::test]
    async fn test_fresh_account_marks_migration_complete() {
        let dir = TempDir::new().unwrap();
        let local = LocalStore::new(dir.path());
        let cloud = MemoryBackend::new();
        let mut ctx = signed_in_ctx(&local);

        let outcome = reconcile_signed_in(&cloud, &local, &mut ctx, false)
            .await
            .unwrap();

        assert!(matches!(outcome, ReconcileOutcome::FreshAccount(_)));
        assert!(local.migration_completed());
        // 何も書き込まれていない
        assert_eq!(cloud.bulk_insert_calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        // 連続して実行しても移行は1回だけで、結果の状態は同じ
        let dir = TempDir::new().unwrap();
        let local = local_with(&dir, vec![sub("l1"), sub("l2")]);
        let cloud = MemoryBackend::new();
        let mut ctx = signed_in_ctx(&local);

        let first = reconcile_signed_in(&cloud, &local, &mut ctx, false)
            .await
            .unwrap();
        let second = reconcile_signed_in(&cloud, &local, &mut ctx, false)
            .await
            .unwrap();

        assert_eq!(cloud.bulk_insert_calls.load(Ordering::Relaxed), 1);
        assert_eq!(cloud.subscriptions_for("user-1").len(), 2);
        // 2回目はリモート採用の形になるが、中身の状態は等しい
        assert_eq!(first.adopted_state(), second.adopted_state());
    }

    #[tokio::test]
    async fn test_interactive_conflict_is_surfaced() {
        let dir = TempDir::new().unwrap();
        let local = local_with(&dir, vec![sub("l1")]);
        let cloud = MemoryBackend::new();
        cloud.seed_subscriptions("user-1", vec![sub("r1")]);
        let mut ctx = signed_in_ctx(&local);

        let outcome = reconcile_signed_in(&cloud, &local, &mut ctx, true)
            .await
            .unwrap();

        assert_eq!(outcome.reconcile_state(), ReconcileState::MigrationPending);
        let ReconcileOutcome::ConflictPending { local: l, remote: r } = outcome else {
            panic!("競合になるはず");
        };
        assert_eq!(l.subscriptions.len(), 1);
        assert_eq!(r.subscriptions.len(), 1);
        // 判断前は何も変更しない
        assert!(!local.migration_completed());
        assert!(!local.load().is_empty());
    }

    #[tokio::test]
    async fn test_conflict_policy_keep_cloud() {
        let dir = TempDir::new().unwrap();
        let local = local_with(&dir, vec![sub("l1")]);
        let cloud = MemoryBackend::new();
        cloud.seed_subscriptions("user-1", vec![sub("r1")]);
        let mut ctx = signed_in_ctx(&local);

        let state = apply_conflict_policy(&cloud, &local, &mut ctx, ConflictPolicy::KeepCloud)
            .await
            .unwrap();

        assert_eq!(state.subscriptions.len(), 1);
        assert_eq!(state.subscriptions[0].id, "r1");
        assert!(local.load().is_empty());
        assert!(local.migration_completed());
    }

    #[tokio::test]
    async fn test_conflict_policy_merge_both() {
        let dir = TempDir::new().unwrap();
        // ID衝突あり: "both"はリモート版が勝つ
        let mut local_both = sub("both");
        local_both.name = "ローカル版".to_string();
        let local = local_with(&dir, vec![sub("l1"), local_both]);

        let cloud = MemoryBackend::new();
        let mut remote_both = sub("both");
        remote_both.name = "リモート版".to_string();
        cloud.seed_subscriptions("user-1", vec![sub("r1"), remote_both]);
        let mut ctx = signed_in_ctx(&local);

        let state = apply_conflict_policy(&cloud, &local, &mut ctx, ConflictPolicy::MergeBoth)
            .await
            .unwrap();

        // 和集合は3件: r1, both(リモート版), l1
        assert_eq!(state.subscriptions.len(), 3);
        let both = state.find_subscription("both").unwrap();
        assert_eq!(both.name, "リモート版");
        // ローカル専用の行はリモートへも挿入されている
        assert_eq!(cloud.subscriptions_for("user-1").len(), 3);
        assert!(local.migration_completed());
    }

    #[tokio::test]
    async fn test_conflict_policy_use_local() {
        let dir = TempDir::new().unwrap();
        let local = local_with(&dir, vec![sub("l1"), sub("l2")]);
        let cloud = MemoryBackend::new();
        cloud.seed_subscriptions("user-1", vec![sub("r1")]);
        let mut ctx = signed_in_ctx(&local);

        let state = apply_conflict_policy(&cloud, &local, &mut ctx, ConflictPolicy::UseLocal)
            .await
            .unwrap();

        // リモートはローカルの内容で上書きされる
        assert_eq!(state.subscriptions.len(), 2);
        let remote_ids: Vec<_> = cloud
            .subscriptions_for("user-1")
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert!(remote_ids.contains(&"l1".to_string()));
        assert!(remote_ids.contains(&"l2".to_string()));
        assert!(!remote_ids.contains(&"r1".to_string()));
        assert!(cloud.settings_for("user-1").is_some());
        assert!(local.migration_completed());
    }

    #[tokio::test]
    async fn test_remote_failure_before_migration_falls_back_to_local() {
        let dir = TempDir::new().unwrap();
        let local = local_with(&dir, vec![sub("l1")]);
        let cloud = MemoryBackend::new();
        cloud.fail_reads.store(true, Ordering::Relaxed);
        let mut ctx = signed_in_ctx(&local);

        let outcome = reconcile_signed_in(&cloud, &local, &mut ctx, false)
            .await
            .unwrap();

        let ReconcileOutcome::LocalFallback(state) = outcome else {
            panic!("ローカルフォールバックになるはず");
        };
        assert_eq!(state.subscriptions.len(), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_after_migration_does_not_resurrect_local() {
        let dir = TempDir::new().unwrap();
        let local = local_with(&dir, vec![sub("stale")]);
        local.set_migration_completed(true);
        let cloud = MemoryBackend::new();
        cloud.fail_reads.store(true, Ordering::Relaxed);
        let mut ctx = signed_in_ctx(&local);

        // 移行済みなのでローカルを正として返さず、エラーを伝える
        let result = reconcile_signed_in(&cloud, &local, &mut ctx, false).await;
        assert!(matches!(result, Err(AppError::Remote(_))));
    }

    #[tokio::test]
    async fn test_signed_out_reloads_local_only() {
        let dir = TempDir::new().unwrap();
        let local = local_with(&dir, vec![sub("l1")]);
        let mut ctx = signed_in_ctx(&local);

        let state = reconcile_signed_out(&local, &mut ctx);

        assert!(!ctx.is_authenticated());
        assert_eq!(state.subscriptions.len(), 1);
    }
}
