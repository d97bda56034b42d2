//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理本地源文件的原始字节加载，并在“尽可能早”的阶段执行输入校验。
//! 目标是尽快失败，减少不必要内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! 存在性 + metadata 体积限制 + 读取，I/O 错误统一映射到 `IconError`。

use super::source::RawImageData;
use super::{IconError, IconHandler, SourceImage};

impl IconHandler {
    /// 从本地路径加载源图片原始字节。
    pub(super) fn load_from_file(&self, source: &SourceImage) -> Result<RawImageData, IconError> {
        let path = source.path();
        log::debug!("📁 开始读取源图片 - 路径: {}", path.display());

        if !path.is_file() {
            return Err(IconError::Decode(format!("文件不存在：{}", path.display())));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| IconError::Decode(format!("无法读取文件信息：{}", e)))?;

        if metadata.len() > self.config.max_file_size {
            return Err(IconError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                self.config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = std::fs::read(path)
            .map_err(|e| IconError::Decode(format!("无法读取图片文件：{}", e)))?;

        if bytes.is_empty() {
            return Err(IconError::Decode(format!("文件为空：{}", path.display())));
        }

        Ok(RawImageData {
            bytes,
            source_hint: source.display_name(),
        })
    }
}
