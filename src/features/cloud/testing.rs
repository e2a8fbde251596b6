use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::CloudBackend;
use crate::models::{Settings, Subscription};
use crate::shared::errors::{AppError, AppResult};

/// テスト用のインメモリバックエンド
///
/// ユーザーIDごとの行を保持し、失敗スイッチで読み書きを
/// 強制的に失敗させられる。
#[derive(Default)]
pub(crate) struct MemoryBackend {
    subscriptions: Mutex<HashMap<String, Vec<Subscription>>>,
    settings: Mutex<HashMap<String, Settings>>,
    /// すべての読み込みを失敗させる
    pub fail_reads: AtomicBool,
    /// すべての書き込みを失敗させる
    pub fail_writes: AtomicBool,
    /// 一括挿入だけを失敗させる
    pub fail_bulk_insert: AtomicBool,
    /// 一括挿入の呼び出し回数
    pub bulk_insert_calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// ユーザーの行を事前投入する
    pub fn seed_subscriptions(&self, user_id: &str, subs: Vec<Subscription>) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(user_id.to_string(), subs);
    }

    pub fn seed_settings(&self, user_id: &str, settings: Settings) {
        self.settings
            .lock()
            .unwrap()
            .insert(user_id.to_string(), settings);
    }

    pub fn subscriptions_for(&self, user_id: &str) -> Vec<Subscription> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn settings_for(&self, user_id: &str) -> Option<Settings> {
        self.settings.lock().unwrap().get(user_id).cloned()
    }

    fn check_read(&self) -> AppResult<()> {
        if self.fail_reads.load(Ordering::Relaxed) {
            Err(AppError::remote("読み込み失敗（テスト設定）"))
        } else {
            Ok(())
        }
    }

    fn check_write(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            Err(AppError::remote("書き込み失敗（テスト設定）"))
        } else {
            Ok(())
        }
    }
}

impl CloudBackend for MemoryBackend {
    async fn list_subscriptions(&self, user_id: &str) -> AppResult<Vec<Subscription>> {
        self.check_read()?;
        Ok(self.subscriptions_for(user_id))
    }

    async fn insert_subscription(&self, user_id: &str, sub: &Subscription) -> AppResult<()> {
        self.check_write()?;
        self.subscriptions
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .push(sub.clone());
        Ok(())
    }

    async fn update_subscription(&self, user_id: &str, sub: &Subscription) -> AppResult<()> {
        self.check_write()?;
        let mut map = self.subscriptions.lock().unwrap();
        let rows = map.entry(user_id.to_string()).or_default();
        match rows.iter_mut().find(|row| row.id == sub.id) {
            Some(row) => {
                *row = sub.clone();
                Ok(())
            }
            None => Err(AppError::not_found("サブスクリプション")),
        }
    }

    async fn delete_subscription(&self, user_id: &str, id: &str) -> AppResult<()> {
        self.check_write()?;
        let mut map = self.subscriptions.lock().unwrap();
        let rows = map.entry(user_id.to_string()).or_default();
        rows.retain(|row| row.id != id);
        Ok(())
    }

    async fn bulk_insert_subscriptions(
        &self,
        user_id: &str,
        subs: &[Subscription],
    ) -> AppResult<()> {
        self.bulk_insert_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_bulk_insert.load(Ordering::Relaxed) {
            return Err(AppError::remote("一括挿入失敗（テスト設定）"));
        }
        self.check_write()?;
        self.subscriptions
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .extend(subs.iter().cloned());
        Ok(())
    }

    async fn get_settings(&self, user_id: &str) -> AppResult<Option<Settings>> {
        self.check_read()?;
        Ok(self.settings_for(user_id))
    }

    async fn upsert_settings(&self, user_id: &str, settings: &Settings) -> AppResult<()> {
        self.check_write()?;
        self.settings
            .lock()
            .unwrap()
            .insert(user_id.to_string(), settings.clone());
        Ok(())
    }
}
