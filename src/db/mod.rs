use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::{AppError, AppResult};
use crate::storage::{KeyValueStore, StoreScope};

pub mod migrations;

/// 数据库管理器
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// 创建新的数据库连接
    pub fn new(db_path: PathBuf) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 内存数据库（测试用）
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };
        db.initialize()?;
        Ok(db)
    }

    /// 初始化数据库表结构
    pub fn initialize(&self) -> Result<()> {
        self.with_connection(|conn| migrations::run_migrations(conn))
    }

    /// 获取数据库连接的引用（需要锁定）
    pub fn with_connection<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("数据库连接锁已损坏"))?;
        f(&conn)
    }
}

/// 基于 SQLite 的 local 作用域键值存储
///
/// 每个键一行，`set` 是单条 UPSERT，失败时旧值保持不变
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn scope(&self) -> StoreScope {
        StoreScope::Local
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        let raw: Option<String> = self
            .db
            .with_connection(|conn| {
                let value = conn
                    .query_row(
                        "SELECT value FROM kv_store WHERE key = ?1",
                        params![key],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(value)
            })
            .map_err(|e| AppError::database(10, format!("读取 {} 失败: {:#}", key, e)))?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> AppResult<()> {
        let text = serde_json::to_string(&value)?;

        self.db
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO kv_store (key, value, updated_at)
                     VALUES (?1, ?2, strftime('%s', 'now'))
                     ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    params![key, text],
                )?;
                Ok(())
            })
            .map_err(|e| AppError::database(11, format!("写入 {} 失败: {:#}", key, e)))?;

        debug!("[{}] {} updated ({} bytes)", self.scope().as_str(), key, text.len());
        Ok(())
    }
}
