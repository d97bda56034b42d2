//! # Iconize 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              命令行 (main.rs, clap)                       │
//! │   参数解析 ── 设置文件 ── Ctrl+C 取消 ── 进度 / 汇总输出    │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            库 (Rust)                              │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ settings ─── JSON 设置文件 → 流水线配置               │
//! │  │                                                       │
//! │  └─ icon_pipeline   SVG / 位图 → PNG + ICO 批处理          │
//! │      ├─ batch        工作池 · 进度 · 取消                 │
//! │      ├─ handler      单文件编排                           │
//! │      └─ render / pipeline / writer                       │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，命令行入口的返回类型 |
//! | [`settings`] | 设置文件读写，转换为 `PipelineConfig` / `OutputRequest` |
//! | [`icon_pipeline`] | 源图片识别、解码、正方形缩放、PNG / ICO 输出、批量调度 |

pub mod error;
pub mod icon_pipeline;
pub mod settings;
