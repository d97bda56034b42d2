//! # SVG 栅格化模块
//!
//! ## 设计思路
//!
//! 矢量源按每个目标尺寸重新渲染，而不是渲染一张大图后再缩小，小尺寸图标更锐利。
//! SVG 只解析一次，`usvg::Tree` 在各尺寸间复用。
//!
//! ## 实现思路
//!
//! - 解析时把源文件所在目录设为 `resources_dir`，相对路径引用的图片可正常加载。
//! - 渲染时按较短边计算缩放比例并居中，保持宽高比，输出恰好为 `size x size`。
//! - `tiny_skia::Pixmap` 为预乘 alpha，写出前逐像素反预乘为普通 RGBA。

use std::sync::Arc;

use image::RgbaImage;
use resvg::{tiny_skia, usvg};

use super::source::{RawImageData, SquareVariant};
use super::{IconError, IconHandler, SourceImage, TargetSize};

impl IconHandler {
    /// 解析 SVG 字节为渲染树。
    pub(super) fn parse_svg(&self, raw: &RawImageData, source: &SourceImage) -> Result<usvg::Tree, IconError> {
        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fontdb);
        options.resources_dir = source.path().parent().map(|dir| dir.to_path_buf());

        let tree = usvg::Tree::from_data(&raw.bytes, &options)
            .map_err(|e| IconError::Decode(format!("SVG 解析失败（{}）：{}", raw.source_hint, e)))?;

        let size = tree.size();
        log::debug!(
            "🧩 SVG 解析成功 - 来源: {} 画布: {:.1}x{:.1}",
            raw.source_hint,
            size.width(),
            size.height()
        );

        Ok(tree)
    }

    /// 在目标尺寸下渲染一帧。
    pub(super) fn render_svg_variant(&self, tree: &usvg::Tree, size: TargetSize) -> Result<SquareVariant, IconError> {
        let image = render_svg_square(tree, size.get())?;
        Ok(SquareVariant { size, image })
    }
}

pub(crate) fn render_svg_square(tree: &usvg::Tree, size: u32) -> Result<RgbaImage, IconError> {
    let mut pixmap = tiny_skia::Pixmap::new(size, size)
        .ok_or_else(|| IconError::Decode(format!("无法分配 {}x{} 画布", size, size)))?;

    let svg_size = tree.size();
    let (svg_width, svg_height) = (svg_size.width(), svg_size.height());
    if svg_width <= 0.0 || svg_height <= 0.0 {
        return Err(IconError::Decode("SVG 画布尺寸无效".to_string()));
    }

    let target = size as f32;
    let scale = (target / svg_width).min(target / svg_height);
    let offset_x = (target - svg_width * scale) / 2.0;
    let offset_y = (target - svg_height * scale) / 2.0;
    let transform = tiny_skia::Transform::from_row(scale, 0.0, 0.0, scale, offset_x, offset_y);

    resvg::render(tree, transform, &mut pixmap.as_mut());

    let mut rgba = Vec::with_capacity((size as usize) * (size as usize) * 4);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        rgba.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }

    RgbaImage::from_raw(size, size, rgba)
        .ok_or_else(|| IconError::Decode("SVG 渲染输出缓冲长度异常".to_string()))
}
