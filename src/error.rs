//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义应用级 `AppError` 枚举，命令行入口统一返回 `Result<T, AppError>`。
//! 流水线内部错误 `IconError`、文件 I/O 错误、设置文件错误都在这里汇合。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `IconError` / `std::io::Error` 提供 `From` 转换，`?` 即可上抛。

use crate::icon_pipeline::IconError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图标流水线错误（配置 / 解码 / 写入）
    #[error("{0}")]
    Icon(#[from] IconError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置文件读取或解析失败
    #[error("设置文件错误: {0}")]
    Settings(String),

    /// 命令行参数无效
    #[error("参数错误: {0}")]
    Input(String),
}
