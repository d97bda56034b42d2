//! # 输出写入模块
//!
//! ## 设计思路
//!
//! 所有落盘操作集中在这里：PNG、多尺寸打包 ICO、单尺寸 ICO。
//! 目录在第一次需要写入时才创建，未开启的输出不会留下空目录。
//!
//! ## 实现思路
//!
//! - PNG 使用 `image` 编码。
//! - ICO 使用 `ico` crate 打包，帧按尺寸升序写入。
//! - 单尺寸 ICO 从磁盘上已写好的 PNG 读回，而不是重新缩放。

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ico::{IconDir, IconDirEntry, IconImage, ResourceType};
use image::ImageFormat;

use super::source::SquareVariant;
use super::IconError;

/// 确保输出目录存在。
pub(crate) fn ensure_dir(dir: &Path) -> Result<(), IconError> {
    fs::create_dir_all(dir)
        .map_err(|e| IconError::Write(format!("创建输出目录 '{}' 失败：{}", dir.display(), e)))
}

/// 写出单个 PNG。
pub(crate) fn write_png(path: &Path, variant: &SquareVariant) -> Result<(), IconError> {
    variant
        .image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| IconError::Write(format!("保存 PNG '{}' 失败：{}", path.display(), e)))
}

/// 将多个尺寸打包为一个 ICO。
pub(crate) fn write_packed_ico(path: &Path, variants: &[&SquareVariant]) -> Result<(), IconError> {
    if variants.is_empty() {
        return Err(IconError::Write(format!("没有可写入 '{}' 的 ICO 帧", path.display())));
    }

    let mut icon_dir = IconDir::new(ResourceType::Icon);
    for variant in variants {
        let size = variant.size.get();
        let icon_image = IconImage::from_rgba_data(size, size, variant.image.as_raw().clone());
        let entry = IconDirEntry::encode(&icon_image)
            .map_err(|e| IconError::Write(format!("编码 {}px ICO 帧失败：{}", size, e)))?;
        icon_dir.add_entry(entry);
    }

    write_icon_dir(path, &icon_dir)
}

/// 把磁盘上的单个 PNG 包装为单尺寸 ICO。
pub(crate) fn write_single_ico_from_png(png_path: &Path, ico_path: &Path) -> Result<(), IconError> {
    let file = File::open(png_path)
        .map_err(|e| IconError::Write(format!("读取源 PNG '{}' 失败：{}", png_path.display(), e)))?;

    let icon_image = IconImage::read_png(BufReader::new(file))
        .map_err(|e| IconError::Write(format!("解析源 PNG '{}' 失败：{}", png_path.display(), e)))?;

    let mut icon_dir = IconDir::new(ResourceType::Icon);
    let entry = IconDirEntry::encode(&icon_image)
        .map_err(|e| IconError::Write(format!("编码 ICO 帧失败：{}", e)))?;
    icon_dir.add_entry(entry);

    write_icon_dir(ico_path, &icon_dir)
}

fn write_icon_dir(path: &Path, icon_dir: &IconDir) -> Result<(), IconError> {
    let file = File::create(path)
        .map_err(|e| IconError::Write(format!("创建 ICO '{}' 失败：{}", path.display(), e)))?;
    let mut writer = BufWriter::new(file);

    icon_dir
        .write(&mut writer)
        .and_then(|_| writer.flush())
        .map_err(|e| IconError::Write(format!("写入 ICO '{}' 失败：{}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon_pipeline::TargetSize;
    use image::{Rgba, RgbaImage};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir() -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock error")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("iconize-writer-test-{nanos}"));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn variant(size: u32) -> SquareVariant {
        SquareVariant {
            size: TargetSize::new(size).expect("size"),
            image: RgbaImage::from_pixel(size, size, Rgba([0, 128, 255, 255])),
        }
    }

    #[test]
    fn packed_ico_contains_every_frame() {
        let dir = unique_temp_dir();
        let path = dir.join("app.ico");
        let frames = [variant(16), variant(32), variant(48)];
        let refs: Vec<&SquareVariant> = frames.iter().collect();

        write_packed_ico(&path, &refs).expect("write ico");

        let icon_dir = IconDir::read(File::open(&path).expect("open ico")).expect("read ico");
        let sizes: Vec<(u32, u32)> = icon_dir
            .entries()
            .iter()
            .map(|entry| (entry.width(), entry.height()))
            .collect();
        assert_eq!(sizes, vec![(16, 16), (32, 32), (48, 48)]);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn single_ico_wraps_png_from_disk() {
        let dir = unique_temp_dir();
        let png_path = dir.join("app_24.png");
        let ico_path = dir.join("app_24.ico");

        write_png(&png_path, &variant(24)).expect("write png");
        write_single_ico_from_png(&png_path, &ico_path).expect("write single ico");

        let icon_dir = IconDir::read(File::open(&ico_path).expect("open ico")).expect("read ico");
        assert_eq!(icon_dir.entries().len(), 1);
        let decoded = icon_dir.entries()[0].decode().expect("decode frame");
        assert_eq!((decoded.width(), decoded.height()), (24, 24));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_png_is_write_error() {
        let dir = unique_temp_dir();
        let result = write_single_ico_from_png(&dir.join("nope.png"), &dir.join("nope.ico"));
        assert!(matches!(result, Err(IconError::Write(_))));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn empty_frame_list_is_rejected() {
        let dir = unique_temp_dir();
        let result = write_packed_ico(&dir.join("empty.ico"), &[]);
        assert!(matches!(result, Err(IconError::Write(_))));
        assert!(!dir.join("empty.ico").exists());
        let _ = std::fs::remove_dir_all(dir);
    }
}
