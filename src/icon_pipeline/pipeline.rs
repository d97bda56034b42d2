//! # 解码与缩放流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → 正方形 RGBA”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸
//! 2. 按像素 / 内存上限快速拒绝
//! 3. 完整解码为 RGBA（只解码一次）
//! 4. 每个目标尺寸：等比缩放到长边 == 尺寸，再居中贴到透明正方形画布

use fast_image_resize as fr;
use image::imageops::FilterType;
use image::{ImageBuffer, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;

use super::source::{RawImageData, SquareVariant};
use super::{IconError, IconHandler, TargetSize};

impl IconHandler {
    /// 将原始字节解码为原始分辨率的 RGBA 图像。
    pub(super) fn decode_raster(&self, raw: &RawImageData) -> Result<RgbaImage, IconError> {
        image::guess_format(&raw.bytes)
            .map_err(|e| IconError::UnsupportedFormat(format!("不支持的图片格式：{}", e)))?;

        let (header_width, header_height) = Self::inspect_dimensions_from_memory(&raw.bytes)?;
        self.validate_pixel_limits(header_width, header_height)?;
        self.validate_decoded_memory_limits(header_width, header_height)?;

        let decoded = image::load_from_memory(&raw.bytes)
            .map_err(|e| IconError::Decode(format!("图片解码失败：{}", e)))?;

        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(IconError::Decode("解码结果尺寸为 0".to_string()));
        }

        log::debug!("🖼️ 位图解码成功 - 来源: {} 尺寸: {}x{}", raw.source_hint, width, height);

        Ok(rgba)
    }

    /// 生成指定尺寸的正方形变体。
    pub(super) fn square_variant(&self, image: &RgbaImage, size: TargetSize) -> Result<SquareVariant, IconError> {
        let image = fit_to_square(image, size.get(), self.config.resize_filter)?;
        Ok(SquareVariant { size, image })
    }

    /// 仅通过内存中的图片头信息读取宽高。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), IconError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| IconError::UnsupportedFormat(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| IconError::Decode(format!("无法读取图片尺寸：{}", e)))
    }

    /// 校验像素数量是否超过配置上限。
    fn validate_pixel_limits(&self, width: u32, height: u32) -> Result<(), IconError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| IconError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > self.config.max_decoded_pixels {
            return Err(IconError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, self.config.max_decoded_pixels
            )));
        }

        Ok(())
    }

    fn validate_decoded_memory_limits(&self, width: u32, height: u32) -> Result<(), IconError> {
        let estimated = (width as u64)
            .checked_mul(height as u64)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| IconError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

        if estimated > self.config.max_decoded_bytes {
            return Err(IconError::ResourceLimit(format!(
                "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
                estimated as f64 / 1024.0 / 1024.0,
                self.config.max_decoded_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(())
    }
}

/// 等比缩放后的宽高：长边等于 `size`，短边四舍五入且至少 1 像素。
pub(crate) fn fit_dimensions(width: u32, height: u32, size: u32) -> (u32, u32) {
    if width >= height {
        let scaled = (height as f64 * size as f64 / width as f64).round() as u32;
        (size, scaled.clamp(1, size))
    } else {
        let scaled = (width as f64 * size as f64 / height as f64).round() as u32;
        (scaled.clamp(1, size), size)
    }
}

/// 将任意尺寸图像缩放并补边为 `size x size`。
pub(crate) fn fit_to_square(image: &RgbaImage, size: u32, filter: FilterType) -> Result<RgbaImage, IconError> {
    let (width, height) = image.dimensions();
    let (target_width, target_height) = fit_dimensions(width, height, size);

    let resized = if (target_width, target_height) == (width, height) {
        image.clone()
    } else {
        match resize_with_fast_image_resize(image, target_width, target_height, filter) {
            Ok(resized) => resized,
            Err(err) => {
                log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::resize：{}", err);
                image::imageops::resize(image, target_width, target_height, filter)
            }
        }
    };

    if target_width == size && target_height == size {
        return Ok(resized);
    }

    let mut canvas = RgbaImage::new(size, size);
    let offset_x = ((size - target_width) / 2) as i64;
    let offset_y = ((size - target_height) / 2) as i64;
    image::imageops::replace(&mut canvas, &resized, offset_x, offset_y);
    Ok(canvas)
}

fn resize_with_fast_image_resize(
    image: &RgbaImage,
    target_width: u32,
    target_height: u32,
    filter: FilterType,
) -> Result<RgbaImage, IconError> {
    let (src_width, src_height) = image.dimensions();

    let src_image = fr::images::Image::from_vec_u8(
        src_width,
        src_height,
        image.as_raw().clone(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| IconError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(filter)));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| IconError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

    ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| IconError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))
}

fn to_fast_filter(filter: FilterType) -> fr::FilterType {
    match filter {
        FilterType::Nearest => fr::FilterType::Box,
        FilterType::Triangle => fr::FilterType::Bilinear,
        FilterType::CatmullRom => fr::FilterType::CatmullRom,
        FilterType::Gaussian => fr::FilterType::Mitchell,
        FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}
