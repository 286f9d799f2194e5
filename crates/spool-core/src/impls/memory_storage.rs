//! InMemoryStorage - 開発用・テスト用のストレージ
//!
//! プロセスが終われば消えるので、永続性が必要な場合は FileStorage を使います。

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::ports::{Storage, StorageError};

#[derive(Debug, Default)]
pub struct InMemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// テスト用: 保存済みの値を直接読む
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    /// テスト用: 値を直接書き込む（前回起動時の状態を再現する）
    pub fn insert(&self, key: &str, value: String) {
        self.values.lock().insert(key.to_string(), value);
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.insert(key, value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_load_remove() {
        let storage = InMemoryStorage::new();
        assert_eq!(storage.load("k").await.unwrap(), None);

        storage.save("k", "[]").await.unwrap();
        assert_eq!(storage.load("k").await.unwrap().as_deref(), Some("[]"));

        storage.remove("k").await.unwrap();
        assert_eq!(storage.load("k").await.unwrap(), None);
        // 存在しないキーの削除はエラーにしない
        storage.remove("k").await.unwrap();
    }
}
