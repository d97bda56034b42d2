//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入”和“流水线中间结果”解耦：
//! - `SourceImage` 表示用户选中的源文件（路径 + 格式类别）
//! - `RawImageData` 表示已加载但未解码的字节
//! - `SquareVariant` 表示某个目标尺寸的正方形 RGBA 像素
//!
//! ## 实现思路
//!
//! 优先按扩展名识别；扩展名未知时读取文件头，用 `infer` 嗅探图片 MIME，
//! 再退化为 SVG 文本特征判断。

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use image::RgbaImage;

use super::{IconError, TargetSize};

const RASTER_EXTENSIONS: [&str; 9] = [
    "png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp", "gif", "ico",
];
const VECTOR_EXTENSIONS: [&str; 2] = ["svg", "svgz"];
const SNIFF_PROBE_BYTES: usize = 512;

/// 源图片类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Raster,
    Vector,
}

/// 一个待处理的源图片。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    path: PathBuf,
    kind: SourceKind,
}

impl SourceImage {
    /// 识别文件类别，无法识别时返回 `UnsupportedFormat`。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use iconize::icon_pipeline::{SourceImage, SourceKind};
    ///
    /// let source = SourceImage::detect("assets/logo.svg")?;
    /// assert_eq!(source.kind(), SourceKind::Vector);
    /// # Ok::<(), iconize::icon_pipeline::IconError>(())
    /// ```
    pub fn detect(path: impl Into<PathBuf>) -> Result<Self, IconError> {
        let path = path.into();

        if let Some(kind) = kind_from_extension(&path) {
            return Ok(Self { path, kind });
        }

        let kind = sniff_kind(&path)?;
        Ok(Self { path, kind })
    }

    /// 跳过识别，直接以给定类别构造。
    pub fn with_kind(path: impl Into<PathBuf>, kind: SourceKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// 输出文件名的基础部分（不含扩展名）。
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string())
    }

    /// 仅文件名，用于日志。
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }
}

fn kind_from_extension(path: &Path) -> Option<SourceKind> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    if VECTOR_EXTENSIONS.contains(&ext.as_str()) {
        Some(SourceKind::Vector)
    } else if RASTER_EXTENSIONS.contains(&ext.as_str()) {
        Some(SourceKind::Raster)
    } else {
        None
    }
}

fn sniff_kind(path: &Path) -> Result<SourceKind, IconError> {
    let mut probe = Vec::with_capacity(SNIFF_PROBE_BYTES);
    File::open(path)
        .and_then(|file| file.take(SNIFF_PROBE_BYTES as u64).read_to_end(&mut probe))
        .map_err(|e| {
            IconError::UnsupportedFormat(format!("无法读取文件头 {}：{}", path.display(), e))
        })?;

    if let Some(kind) = infer::get(&probe) {
        if kind.matcher_type() == infer::MatcherType::Image {
            return Ok(SourceKind::Raster);
        }
    }

    if looks_like_svg(&probe) {
        return Ok(SourceKind::Vector);
    }

    Err(IconError::UnsupportedFormat(format!(
        "无法识别的文件类型：{}",
        path.display()
    )))
}

fn looks_like_svg(probe: &[u8]) -> bool {
    let text = String::from_utf8_lossy(probe);
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && trimmed.contains("<svg"))
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 原始文件字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: String,
}

/// 某个目标尺寸的正方形 RGBA 图像。
pub(crate) struct SquareVariant {
    pub(crate) size: TargetSize,
    pub(crate) image: RgbaImage,
}
