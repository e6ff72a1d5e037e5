/// 键值存储模块
///
/// 捕获核心只依赖 get/set 两个操作：
/// - local 作用域保存 memories 列表
/// - sync 作用域保存 settings 记录
///
/// 没有事务，也没有比较并交换，读改写由调用方自行承担竞争风险

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};

use crate::error::{AppError, AppResult};

/// 存储作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    /// 本机存储（memories）
    Local,
    /// 同步存储（settings）
    Sync,
}

impl StoreScope {
    pub fn as_str(&self) -> &str {
        match self {
            StoreScope::Local => "local",
            StoreScope::Sync => "sync",
        }
    }
}

/// 键值存储接口
///
/// `set` 要么整体替换该键的值，要么失败并保留旧值
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> AppResult<()>;
}

/// 读取并反序列化指定键
pub async fn read_typed<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> AppResult<Option<T>> {
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// 序列化并写入指定键
pub async fn write_typed<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> AppResult<()> {
    let value = serde_json::to_value(value)?;
    store.set(key, value).await
}

/// 进程内存储
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> AppResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// JSON 文件存储
///
/// 整个文件是一个 JSON 对象，写入时先写临时文件再原子替换
pub struct JsonFileStore {
    file_path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// 创建新的文件存储（确保父目录存在）
    pub fn new(file_path: PathBuf) -> AppResult<Self> {
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("创建存储目录失败: {}", parent.display()))
                .map_err(|e| AppError::storage(1, format!("{:#}", e)))?;
        }

        Ok(Self {
            file_path,
            write_lock: Mutex::new(()),
        })
    }

    /// 获取文件路径
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn load_map(&self) -> Result<Map<String, Value>> {
        if !self.file_path.exists() {
            return Ok(Map::new());
        }

        let raw = fs::read_to_string(&self.file_path)
            .with_context(|| format!("读取存储文件失败: {}", self.file_path.display()))?;

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&raw).context("存储文件不是合法 JSON")? {
            Value::Object(map) => Ok(map),
            _ => anyhow::bail!("存储文件顶层必须是 JSON 对象"),
        }
    }

    fn replace_file(&self, map: &Map<String, Value>) -> Result<()> {
        let tmp_path = self.file_path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(map).context("序列化存储内容失败")?;

        fs::write(&tmp_path, content)
            .with_context(|| format!("写入临时文件失败: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.file_path).with_context(|| {
            format!("替换存储文件失败: {}", self.file_path.display())
        })?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        let map = self
            .load_map()
            .map_err(|e| AppError::storage(2, format!("{:#}", e)))?;
        Ok(map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut map = self
            .load_map()
            .map_err(|e| AppError::storage(2, format!("{:#}", e)))?;
        map.insert(key.to_string(), value);

        self.replace_file(&map)
            .map_err(|e| AppError::storage(3, format!("{:#}", e)))
    }
}
