//! サブスクリプション支出管理のコアライブラリ
//!
//! ユーザーの定期課金（名前・金額・通貨・課金サイクル・カテゴリ・契約終了日）を
//! 記録し、集計・カテゴリ内訳・今後の支払い予定を提供する。データは匿名スコープ
//! ではローカルのJSONドキュメントに、認証済みスコープではリモートバックエンドに
//! 保存され、サインイン時に一度だけローカル→リモートの移行が行われる。
//!
//! 中核は次の2つ:
//! - [`features::reconcile`] — セッション開始・認証遷移ごとにどちらのストアが
//!   正かを決め、競合時のマージ判断を提供する状態照合エンジン
//! - [`features::coordinator`] — すべての状態変更を「即時適用 → 非同期永続化 →
//!   失敗時巻き戻し」の規律で扱う楽観的ミューテーションコーディネータ
//!
//! UIの描画・認証フロー・通知スケジューリングはこのクレートの責務外であり、
//! 埋め込み側がコーディネータのAPIと認証イベントチャンネルを通じて連携する。

pub mod features;
pub mod models;
pub mod shared;

// 公開インターフェース
pub use features::auth::{auth_channel, AuthEvent, SessionContext};
pub use features::cloud::{CloudBackend, CloudClient};
pub use features::coordinator::Coordinator;
pub use features::insights::{CategoryTotal, UpcomingPayment};
pub use features::local_store::LocalStore;
pub use features::rates::{convert, RateCache};
pub use features::reconcile::{ConflictPolicy, ReconcileOutcome, ReconcileState};
pub use models::{AppState, BillingCycle, ChartViewMode, Settings, SortDirection, Subscription};
pub use shared::config::{init_logging, CloudConfig, CoreConfig, RatesConfig};
pub use shared::errors::{AppError, AppResult, ErrorSeverity};
