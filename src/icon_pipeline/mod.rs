//! # 图标生成流水线（icon_pipeline）
//!
//! ## 设计思路
//!
//! 该模块将“格式识别 → 加载校验 → 解码 / 栅格化 → 正方形缩放 → 写出 PNG / ICO → 批量调度”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `batch`：工作池、进度回调、取消标志、整批结果
//! - `handler`：单文件处理编排
//! - `loader`：本地文件加载与体积校验
//! - `pipeline`：位图解码、像素限制、正方形缩放
//! - `render`：SVG 按尺寸栅格化
//! - `writer`：PNG / 打包 ICO / 单尺寸 ICO 落盘
//! - `config/error/source`：配置、错误、数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! main.rs（CLI 参数 + 设置文件）
//!    ↓
//! batch.rs（规划：格式识别 + 重名检测，派发到工作线程）
//!    ↓
//! handler.rs（单文件编排 + 阶段耗时日志）
//!    ├─ loader.rs（读取 + 体积校验）
//!    ├─ pipeline.rs / render.rs（位图缩放 / SVG 渲染）
//!    └─ writer.rs（resized/*.png、ico/*.ico）
//!    ↓
//! BatchResult（逐文件成功 / 跳过 / 失败 / 取消）
//! ```
//!
//! ## 输出布局
//!
//! ```text
//! <output>/resized/<stem>_<size>.png
//! <output>/ico/<stem>.ico
//! <output>/ico/<stem>_<size>.ico
//! ```

mod batch;
mod config;
mod error;
mod handler;
mod loader;
mod pipeline;
mod render;
mod source;
mod writer;

pub use batch::{BatchResult, BatchRunner, CancelToken, FileOutcome, FileReport, NoProgress, ProgressSink};
pub use config::{
    DEFAULT_SIZES, ICO_MAX_SIZE, OutputRequest, OutputRequestBuilder, PipelineConfig, ResizeProfile, TargetSize,
};
pub use error::IconError;
pub use handler::IconHandler;
pub use source::{SourceImage, SourceKind};
