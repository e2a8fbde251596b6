use log::{info, warn};
use tokio::sync::mpsc::UnboundedReceiver;

use super::command::{Command, PersistOp};
use crate::features::auth::{AuthEvent, SessionContext};
use crate::features::cloud::CloudBackend;
use crate::features::local_store::{self, LocalStore};
use crate::features::reconcile::{self, ConflictPolicy, ReconcileOutcome, ReconcileState};
use crate::models::{AppState, Settings, Subscription};
use crate::shared::errors::{AppError, AppResult};

/// 楽観的ミューテーションコーディネータ
///
/// インメモリのUIキャッシュを唯一の変更経路として保持し、すべての
/// 変更を「即時適用 → 非同期永続化 → 失敗時巻き戻し」の規律で扱う。
/// 永続化先はセッションコンテキストに従って選ばれる（認証済みなら
/// リモート、匿名ならローカル）。`&mut self`を通すことで、同一
/// クライアントのミューテーションは発行順に直列化される。
pub struct Coordinator<C: CloudBackend> {
    cache: AppState,
    local: LocalStore,
    cloud: C,
    ctx: SessionContext,
    reconcile_state: ReconcileState,
    pending_conflict: Option<(AppState, AppState)>,
    interactive_conflicts: bool,
}

impl<C: CloudBackend> Coordinator<C> {
    /// 新しいコーディネータを作成する
    ///
    /// セッション開始時点の状態をローカルストアから読み込み、
    /// 移行完了フラグをマーカーから初期化する。
    ///
    /// # 引数
    /// * `local` - ローカルストア
    /// * `cloud` - リモートバックエンド
    pub fn new(local: LocalStore, cloud: C) -> Self {
        let mut ctx = SessionContext::new();
        ctx.set_migration_completed(local.migration_completed());
        let cache = local.load();
        Self {
            cache,
            local,
            cloud,
            ctx,
            reconcile_state: ReconcileState::Anonymous,
            pending_conflict: None,
            interactive_conflicts: false,
        }
    }

    /// 競合時にポリシー選択を呼び出し側へ委ねるモードにする
    pub fn with_interactive_conflicts(mut self) -> Self {
        self.interactive_conflicts = true;
        self
    }

    /// 現在のUIキャッシュを取得する（非表示のものも含む全件）
    pub fn state(&self) -> &AppState {
        &self.cache
    }

    /// 現在のセッションコンテキストを取得する
    pub fn session(&self) -> &SessionContext {
        &self.ctx
    }

    /// 照合状態マシンの現在の状態を取得する
    ///
    /// 照合がエラーで終わった場合は`Authenticating`のまま残る
    /// （データ未読込の状態を表す）。
    pub fn reconcile_state(&self) -> ReconcileState {
        self.reconcile_state
    }

    /// 解決待ちの競合があるかどうか
    pub fn has_pending_conflict(&self) -> bool {
        self.pending_conflict.is_some()
    }

    /// 認証イベントを処理する
    ///
    /// サインインとトークン更新は照合を起動する。同じユーザーでの
    /// 再通知は何もしない（初回読み込みとリスナーの二重起動を吸収する）。
    ///
    /// # 引数
    /// * `event` - 認証イベント
    ///
    /// # 戻り値
    /// 成功時はOk(())、照合失敗時はエラー
    pub async fn handle_auth_event(&mut self, event: AuthEvent) -> AppResult<()> {
        match event {
            AuthEvent::SignedIn { user_id } | AuthEvent::TokenRefreshed { user_id } => {
                if self.ctx.user_id() == Some(user_id.as_str()) {
                    // 既に同じユーザーで照合済み
                    return Ok(());
                }
                self.ctx.begin(user_id);
                self.reconcile_state = ReconcileState::Authenticating;
                self.reconcile().await
            }
            AuthEvent::SignedOut => {
                self.cache = reconcile::reconcile_signed_out(&self.local, &mut self.ctx);
                self.reconcile_state = ReconcileState::Anonymous;
                self.pending_conflict = None;
                Ok(())
            }
        }
    }

    /// 認証イベントループを実行する
    ///
    /// チャンネルが閉じるまでイベントを消費する。送信側をドロップした
    /// 時点でループが終了するため、購読解除の漏れによる二重照合は
    /// 起こらない。照合エラーはログに記録して処理を継続する。
    ///
    /// # 引数
    /// * `events` - 認証イベントの受信側
    pub async fn run_auth_events(&mut self, mut events: UnboundedReceiver<AuthEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle_auth_event(event).await {
                warn!("認証イベントの処理に失敗しました: {e}");
            }
        }
        info!("認証イベントチャンネルが閉じられました");
    }

    /// 照合を実行してキャッシュへ反映する
    async fn reconcile(&mut self) -> AppResult<()> {
        let outcome = reconcile::reconcile_signed_in(
            &self.cloud,
            &self.local,
            &mut self.ctx,
            self.interactive_conflicts,
        )
        .await?;

        if let ReconcileOutcome::ConflictPending { local, remote } = &outcome {
            self.pending_conflict = Some((local.clone(), remote.clone()));
        }
        self.reconcile_state = outcome.reconcile_state();
        self.cache = outcome.adopted_state().clone();
        Ok(())
    }

    /// 解決待ちの競合にポリシーを適用する
    ///
    /// # 引数
    /// * `policy` - ユーザーが選択したポリシー
    ///
    /// # 戻り値
    /// 成功時はOk(())、競合がない場合や失敗時はエラー
    pub async fn resolve_conflict(&mut self, policy: ConflictPolicy) -> AppResult<()> {
        if self.pending_conflict.is_none() {
            return Err(AppError::validation("解決待ちの競合はありません"));
        }
        let resolved =
            reconcile::apply_conflict_policy(&self.cloud, &self.local, &mut self.ctx, policy)
                .await?;
        self.pending_conflict = None;
        self.reconcile_state = ReconcileState::Merged;
        self.cache = resolved;
        Ok(())
    }

    /// サブスクリプションを追加する
    ///
    /// # 引数
    /// * `sub` - 追加するサブスクリプション（IDはクライアント側で生成済み）
    pub async fn add_subscription(&mut self, sub: Subscription) -> AppResult<()> {
        sub.validate()?;
        if self.cache.find_subscription(&sub.id).is_some() {
            return Err(AppError::validation(
                "同じIDのサブスクリプションが既に存在します",
            ));
        }

        let command = Command::capture(&self.cache, format!("追加: {}", sub.id));
        self.cache.subscriptions.push(sub.clone());
        self.persist(command, PersistOp::Insert(sub)).await
    }

    /// サブスクリプションを更新する（ID以外の全フィールドを上書き）
    ///
    /// # 引数
    /// * `sub` - 更新後のサブスクリプション（IDで既存行を特定する）
    pub async fn update_subscription(&mut self, sub: Subscription) -> AppResult<()> {
        sub.validate()?;
        let index = self
            .cache
            .subscriptions
            .iter()
            .position(|existing| existing.id == sub.id)
            .ok_or_else(|| AppError::not_found("サブスクリプション"))?;

        let command = Command::capture(&self.cache, format!("更新: {}", sub.id));
        self.cache.subscriptions[index] = sub.clone();
        self.persist(command, PersistOp::Update(sub)).await
    }

    /// サブスクリプションをIDで削除する
    ///
    /// # 引数
    /// * `id` - 削除するサブスクリプションのID
    pub async fn delete_subscription(&mut self, id: &str) -> AppResult<()> {
        let index = self
            .cache
            .subscriptions
            .iter()
            .position(|existing| existing.id == id)
            .ok_or_else(|| AppError::not_found("サブスクリプション"))?;

        let command = Command::capture(&self.cache, format!("削除: {id}"));
        self.cache.subscriptions.remove(index);
        self.persist(command, PersistOp::Delete(id.to_string()))
            .await
    }

    /// サブスクリプションの非表示フラグを切り替える
    ///
    /// `hidden`だけを反転し、他のフィールドには触れない。
    ///
    /// # 引数
    /// * `id` - 対象サブスクリプションのID
    pub async fn toggle_hidden(&mut self, id: &str) -> AppResult<()> {
        let index = self
            .cache
            .subscriptions
            .iter()
            .position(|existing| existing.id == id)
            .ok_or_else(|| AppError::not_found("サブスクリプション"))?;

        let command = Command::capture(&self.cache, format!("表示切替: {id}"));
        self.cache.subscriptions[index].hidden = !self.cache.subscriptions[index].hidden;
        let updated = self.cache.subscriptions[index].clone();
        self.persist(command, PersistOp::Update(updated)).await
    }

    /// 設定を変更する
    ///
    /// # 引数
    /// * `settings` - 新しい設定
    pub async fn update_settings(&mut self, settings: Settings) -> AppResult<()> {
        let command = Command::capture(&self.cache, "設定変更");
        self.cache.settings = settings.clone();
        self.persist(command, PersistOp::Settings(settings)).await
    }

    /// エクスポート用JSONを生成する
    ///
    /// # 戻り値
    /// 整形済みJSONドキュメント（非表示のものも含む全件）
    pub fn export_state(&self) -> AppResult<String> {
        local_store::export_state(&self.cache)
    }

    /// JSONドキュメントを検証して状態を全置き換えする
    ///
    /// 検証に失敗した場合は何も変更しない。成功した場合はキャッシュと
    /// 現在の正のストアを置き換える。
    ///
    /// # 引数
    /// * `json` - インポートするJSONドキュメント
    pub async fn import_state(&mut self, json: &str) -> AppResult<()> {
        let imported = local_store::import_state(json)?;

        let previous_ids: Vec<String> = self
            .cache
            .subscriptions
            .iter()
            .map(|sub| sub.id.clone())
            .collect();
        let command = Command::capture(&self.cache, "インポート");
        self.cache = imported.clone();
        self.persist(
            command,
            PersistOp::Replace {
                previous_ids,
                state: imported,
            },
        )
        .await
    }

    /// 楽観的に適用済みの変更を正のストアへ永続化する
    ///
    /// 匿名スコープではローカル保存（ベストエフォート、巻き戻しなし）。
    /// 認証済みスコープではリモートへ書き込み、失敗時はキャッシュを
    /// スナップショットへ巻き戻してエラーを返す。
    async fn persist(&mut self, command: Command, op: PersistOp) -> AppResult<()> {
        let Some(user_id) = self.ctx.user_id().map(str::to_string) else {
            // ローカルストレージの障害は致命的エラーにしない
            self.local.save(&self.cache);
            return Ok(());
        };

        let result = match &op {
            PersistOp::Insert(sub) => self.cloud.insert_subscription(&user_id, sub).await,
            PersistOp::Update(sub) => self.cloud.update_subscription(&user_id, sub).await,
            PersistOp::Delete(id) => self.cloud.delete_subscription(&user_id, id).await,
            PersistOp::Settings(settings) => self.cloud.upsert_settings(&user_id, settings).await,
            PersistOp::Replace {
                previous_ids,
                state,
            } => Self::replace_remote(&self.cloud, &user_id, previous_ids, state).await,
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                command.rollback(&mut self.cache);
                Err(e)
            }
        }
    }

    /// リモートの内容を全置き換えする（インポート時）
    async fn replace_remote(
        cloud: &C,
        user_id: &str,
        previous_ids: &[String],
        state: &AppState,
    ) -> AppResult<()> {
        for id in previous_ids {
            cloud.delete_subscription(user_id, id).await?;
        }
        cloud
            .bulk_insert_subscriptions(user_id, &state.subscriptions)
            .await?;
        cloud.upsert_settings(user_id, &state.settings).await?;
        Ok(())
    }
}
