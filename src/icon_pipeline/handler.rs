//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `IconHandler` 只负责单个源文件的流程编排，不关心并发与进度。
//! 处理链路固定为：
//! 1. 加载原始字节
//! 2. 解码（位图解码一次 / SVG 解析一次）
//! 3. 生成所需尺寸的正方形变体
//! 4. 按开关写出 PNG、打包 ICO、单尺寸 ICO
//!
//! ## 实现思路
//!
//! - 所有变体在写盘前全部生成完毕，解码类错误不会留下半成品文件。
//! - 每个缩放与写入步骤之间检查取消标志。
//! - 记录 `load/decode/resize/write/total` 阶段耗时，便于性能诊断。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use resvg::usvg;

use super::source::{RawImageData, SquareVariant};
use super::writer;
use super::{CancelToken, IconError, OutputRequest, PipelineConfig, SourceImage, SourceKind, TargetSize};

/// 单文件图标处理器。
///
/// 持有处理配置与 SVG 字体库；字体库只加载一次，在所有工作线程间共享。
pub struct IconHandler {
    pub(super) config: PipelineConfig,
    pub(super) fontdb: Arc<usvg::fontdb::Database>,
}

enum Decoded {
    Raster(image::RgbaImage),
    Vector(usvg::Tree),
}

impl IconHandler {
    /// 根据配置创建处理器。
    ///
    /// # 示例
    /// ```rust
    /// use iconize::icon_pipeline::{IconHandler, PipelineConfig};
    ///
    /// let mut config = PipelineConfig::default();
    /// config.load_system_fonts = false;
    /// let handler = IconHandler::new(config);
    /// assert!(handler.config().workers >= 1);
    /// ```
    pub fn new(config: PipelineConfig) -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        if config.load_system_fonts {
            let start = Instant::now();
            fontdb.load_system_fonts();
            log::debug!(
                "🔤 已加载系统字体 {} 个，耗时 {}ms",
                fontdb.len(),
                start.elapsed().as_millis()
            );
        }

        Self {
            config,
            fontdb: Arc::new(fontdb),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 处理单个源文件，返回本次写出的全部文件路径（按写出顺序）。
    pub fn process_source(
        &self,
        source: &SourceImage,
        request: &OutputRequest,
        cancel: &CancelToken,
    ) -> Result<Vec<PathBuf>, IconError> {
        let total_start = Instant::now();
        let stem = source.stem();
        check_cancelled(cancel)?;

        let load_start = Instant::now();
        let raw = self.load_from_file(source)?;
        let load_elapsed = load_start.elapsed();

        let decode_start = Instant::now();
        let decoded = self.decode(&raw, source)?;
        let decode_elapsed = decode_start.elapsed();

        let resize_start = Instant::now();
        let variants = self.build_variants(&decoded, &request.render_sizes(), cancel)?;
        let resize_elapsed = resize_start.elapsed();

        let write_start = Instant::now();
        let outputs = self.write_outputs(&stem, &variants, request, cancel)?;
        let write_elapsed = write_start.elapsed();

        log::info!(
            "✅ 图标生成完成 - {} 输出 {} 个文件 load={}ms decode={}ms resize={}ms write={}ms total={}ms",
            source.display_name(),
            outputs.len(),
            load_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            resize_elapsed.as_millis(),
            write_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(outputs)
    }

    fn decode(&self, raw: &RawImageData, source: &SourceImage) -> Result<Decoded, IconError> {
        match source.kind() {
            SourceKind::Raster => self.decode_raster(raw).map(Decoded::Raster),
            SourceKind::Vector => self.parse_svg(raw, source).map(Decoded::Vector),
        }
    }

    fn build_variants(
        &self,
        decoded: &Decoded,
        sizes: &[TargetSize],
        cancel: &CancelToken,
    ) -> Result<Vec<SquareVariant>, IconError> {
        let mut variants = Vec::with_capacity(sizes.len());
        for &size in sizes {
            check_cancelled(cancel)?;
            let variant = match decoded {
                Decoded::Raster(image) => self.square_variant(image, size)?,
                Decoded::Vector(tree) => self.render_svg_variant(tree, size)?,
            };
            variants.push(variant);
        }
        Ok(variants)
    }

    fn write_outputs(
        &self,
        stem: &str,
        variants: &[SquareVariant],
        request: &OutputRequest,
        cancel: &CancelToken,
    ) -> Result<Vec<PathBuf>, IconError> {
        let mut outputs = Vec::new();

        if request.resized() {
            writer::ensure_dir(&request.resized_dir())?;
            for variant in variants {
                check_cancelled(cancel)?;
                let path = request.resized_png_path(stem, variant.size);
                writer::write_png(&path, variant)?;
                outputs.push(path);
            }
        }

        let ico_variants: Vec<&SquareVariant> =
            variants.iter().filter(|v| v.size.is_ico_eligible()).collect();

        if request.packed() {
            check_cancelled(cancel)?;
            writer::ensure_dir(&request.ico_dir())?;
            let path = request.packed_ico_path(stem);
            writer::write_packed_ico(&path, &ico_variants)?;
            outputs.push(path);
        }

        if request.single() {
            writer::ensure_dir(&request.ico_dir())?;
            for variant in &ico_variants {
                check_cancelled(cancel)?;
                let png_path = request.resized_png_path(stem, variant.size);
                if !png_path.is_file() {
                    return Err(IconError::Write(format!(
                        "单尺寸 ICO 所需 PNG 不存在：{}",
                        png_path.display()
                    )));
                }
                let ico_path = request.single_ico_path(stem, variant.size);
                writer::write_single_ico_from_png(&png_path, &ico_path)?;
                outputs.push(ico_path);
            }
        }

        Ok(outputs)
    }
}

fn check_cancelled(cancel: &CancelToken) -> Result<(), IconError> {
    if cancel.is_cancelled() {
        return Err(IconError::Cancelled("用户已取消".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock error")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("iconize-handler-{tag}-{nanos}"));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn handler() -> IconHandler {
        let mut config = PipelineConfig::default();
        config.load_system_fonts = false;
        IconHandler::new(config)
    }

    fn write_png(path: &std::path::Path, width: u32, height: u32) {
        RgbaImage::from_fn(width, height, |x, y| Rgba([(x % 255) as u8, (y % 255) as u8, 90, 255]))
            .save_with_format(path, ImageFormat::Png)
            .expect("write source png");
    }

    #[test]
    fn packed_only_creates_only_ico_dir() {
        let dir = unique_temp_dir("packed");
        let input = dir.join("photo.png");
        write_png(&input, 120, 80);

        let out = dir.join("out");
        let request = OutputRequest::builder(&out)
            .resized(false)
            .single(false)
            .sizes([16, 32, 512])
            .build()
            .expect("request");

        let outputs = handler()
            .process_source(&SourceImage::with_kind(&input, SourceKind::Raster), &request, &CancelToken::new())
            .expect("process");

        assert_eq!(outputs, vec![out.join("ico").join("photo.ico")]);
        assert!(!out.join("resized").exists());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn cancelled_token_stops_before_loading() {
        let dir = unique_temp_dir("cancel");
        let input = dir.join("photo.png");
        write_png(&input, 32, 32);

        let out = dir.join("out");
        let request = OutputRequest::builder(&out).sizes([16]).build().expect("request");
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = handler().process_source(
            &SourceImage::with_kind(&input, SourceKind::Raster),
            &request,
            &cancel,
        );
        assert!(matches!(result, Err(IconError::Cancelled(_))));
        assert!(!out.exists());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn decode_failure_writes_nothing() {
        let dir = unique_temp_dir("corrupt");
        let input = dir.join("broken.png");
        std::fs::write(&input, b"\x89PNG\r\n\x1a\nnot really").expect("write corrupt");

        let out = dir.join("out");
        let request = OutputRequest::builder(&out).sizes([16, 32]).build().expect("request");

        let result = handler().process_source(
            &SourceImage::with_kind(&input, SourceKind::Raster),
            &request,
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(IconError::Decode(_))));
        assert!(!out.exists());

        let _ = std::fs::remove_dir_all(dir);
    }
}
