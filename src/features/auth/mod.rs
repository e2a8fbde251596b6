/// 認証連携機能モジュール
///
/// このモジュールは、外部IDプロバイダとの連携点を提供します：
/// - 認証イベント（サインイン／サインアウト／トークン更新）のモデル
/// - イベント購読用チャンネルの生成
/// - セッションコンテキスト（ユーザーIDと移行完了フラグ）
///
/// 認証フロー自体（OAuth等）は外部IDプロバイダの責務であり、
/// ここには含まれない。
pub mod models;

use tokio::sync::mpsc;

// 公開インターフェース
pub use models::{AuthEvent, SessionContext};

/// 認証イベント用のチャンネルを作成する
///
/// 送信側はIDプロバイダを購読する側（埋め込み層）が保持し、受信側は
/// コーディネータへ渡す。送信側をドロップするとチャンネルが閉じ、
/// コーディネータのイベントループが終了する（購読解除）。
///
/// # 戻り値
/// 送信側と受信側のペア
pub fn auth_channel() -> (
    mpsc::UnboundedSender<AuthEvent>,
    mpsc::UnboundedReceiver<AuthEvent>,
) {
    mpsc::unbounded_channel()
}
