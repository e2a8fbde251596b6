use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response};

use super::models::{SettingsRow, SubscriptionRow};
use super::CloudBackend;
use crate::models::{Settings, Subscription};
use crate::shared::config::CloudConfig;
use crate::shared::errors::{AppError, AppResult};

/// PostgRESTスタイルのREST APIクライアント
///
/// すべてのリクエストにAPIキーを付与し、書き込みは必ず所有ユーザーの
/// フィルタ付きで発行する。一時的な接続エラーは指数バックオフで
/// リトライする。
pub struct CloudClient {
    http: Client,
    config: CloudConfig,
}

impl CloudClient {
    /// 新しいAPIクライアントを作成する
    ///
    /// # 引数
    /// * `config` - リモートバックエンド設定
    ///
    /// # 戻り値
    /// クライアント、またはベースURL不正・HTTPクライアント初期化失敗時はエラー
    pub fn new(config: CloudConfig) -> AppResult<Self> {
        url::Url::parse(&config.base_url)
            .map_err(|e| AppError::configuration(format!("ベースURLが不正です: {e}")))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::configuration(format!("HTTPクライアント初期化失敗: {e}")))?;

        Ok(Self { http, config })
    }

    /// テーブルのエンドポイントURLを組み立てる
    fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url.trim_end_matches('/'), table)
    }

    /// 認証ヘッダーを付与する
    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", self.config.api_key.as_str())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
    }

    /// リトライ機能付きでリクエストを送信する
    ///
    /// 接続エラーは指数バックオフで`max_retries`回まで再試行する。
    /// APIがエラーステータスを返した場合は即座にエラーにする。
    ///
    /// # 引数
    /// * `operation` - ログ・エラーメッセージ用の操作名
    /// * `make_request` - 試行ごとにリクエストを組み立てるクロージャ
    async fn send_with_retry<F>(&self, operation: &str, make_request: F) -> AppResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempts = 0;
        loop {
            match self.authorized(make_request()).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("{operation}: リクエスト成功");
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::remote(format!(
                        "{operation}に失敗しました: {status} {body}"
                    )));
                }
                Err(e) => {
                    if attempts < self.config.max_retries {
                        attempts += 1;
                        let delay = Duration::from_secs(2_u64.pow(attempts));
                        warn!(
                            "{operation}: リクエスト失敗、リトライします: attempt={attempts}/{}, delay={delay:?}",
                            self.config.max_retries
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(AppError::remote(format!(
                        "{operation}: APIサーバーへの接続に失敗しました: {e}"
                    )));
                }
            }
        }
    }
}

impl CloudBackend for CloudClient {
    async fn list_subscriptions(&self, user_id: &str) -> AppResult<Vec<Subscription>> {
        let user_filter = format!("eq.{user_id}");
        let response = self
            .send_with_retry("サブスクリプション一覧取得", || {
                self.http.get(self.endpoint("subscriptions")).query(&[
                    ("user_id", user_filter.as_str()),
                    ("select", "*"),
                    ("order", "startDate.asc"),
                ])
            })
            .await?;

        let rows: Vec<SubscriptionRow> = response.json().await?;
        Ok(rows.into_iter().map(SubscriptionRow::into_domain).collect())
    }

    async fn insert_subscription(&self, user_id: &str, sub: &Subscription) -> AppResult<()> {
        let rows = vec![SubscriptionRow::from_domain(user_id, sub)];
        self.send_with_retry("サブスクリプション作成", || {
            self.http
                .post(self.endpoint("subscriptions"))
                .header("Prefer", "return=minimal")
                .json(&rows)
        })
        .await?;
        Ok(())
    }

    async fn update_subscription(&self, user_id: &str, sub: &Subscription) -> AppResult<()> {
        // 行フィルタに所有ユーザーを必ず含める
        let id_filter = format!("eq.{}", sub.id);
        let user_filter = format!("eq.{user_id}");
        let row = SubscriptionRow::from_domain(user_id, sub);
        self.send_with_retry("サブスクリプション更新", || {
            self.http
                .patch(self.endpoint("subscriptions"))
                .query(&[("id", id_filter.as_str()), ("user_id", user_filter.as_str())])
                .header("Prefer", "return=minimal")
                .json(&row)
        })
        .await?;
        Ok(())
    }

    async fn delete_subscription(&self, user_id: &str, id: &str) -> AppResult<()> {
        let id_filter = format!("eq.{id}");
        let user_filter = format!("eq.{user_id}");
        self.send_with_retry("サブスクリプション削除", || {
            self.http
                .delete(self.endpoint("subscriptions"))
                .query(&[("id", id_filter.as_str()), ("user_id", user_filter.as_str())])
        })
        .await?;
        Ok(())
    }

    async fn bulk_insert_subscriptions(
        &self,
        user_id: &str,
        subs: &[Subscription],
    ) -> AppResult<()> {
        if subs.is_empty() {
            return Ok(());
        }
        // 1リクエストの配列挿入なので部分的な成功は起こらない
        let rows: Vec<SubscriptionRow> = subs
            .iter()
            .map(|sub| SubscriptionRow::from_domain(user_id, sub))
            .collect();
        self.send_with_retry("サブスクリプション一括挿入", || {
            self.http
                .post(self.endpoint("subscriptions"))
                .header("Prefer", "return=minimal")
                .json(&rows)
        })
        .await?;
        Ok(())
    }

    async fn get_settings(&self, user_id: &str) -> AppResult<Option<Settings>> {
        let user_filter = format!("eq.{user_id}");
        let response = self
            .send_with_retry("設定取得", || {
                self.http
                    .get(self.endpoint("settings"))
                    .query(&[("user_id", user_filter.as_str()), ("select", "*")])
            })
            .await?;

        // レコードなしはエラーではなくNone
        let rows: Vec<SettingsRow> = response.json().await?;
        Ok(rows.into_iter().next().map(SettingsRow::into_domain))
    }

    async fn upsert_settings(&self, user_id: &str, settings: &Settings) -> AppResult<()> {
        // 競合キーはuser_id。同時リトライでも行は1つに収束する
        let rows = vec![SettingsRow::from_domain(user_id, settings)];
        self.send_with_retry("設定保存", || {
            self.http
                .post(self.endpoint("settings"))
                .query(&[("on_conflict", "user_id")])
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(&rows)
        })
        .await?;
        Ok(())
    }
}
