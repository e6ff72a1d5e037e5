/// 数据库迁移
///
/// 负责创建 local 作用域键值表

use anyhow::Result;
use rusqlite::Connection;

/// 运行所有迁移
pub fn run_migrations(conn: &Connection) -> Result<()> {
    create_kv_store_table(conn)?;

    Ok(())
}

/// 创建 kv_store 表
fn create_kv_store_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        )",
        [],
    )?;

    Ok(())
}
