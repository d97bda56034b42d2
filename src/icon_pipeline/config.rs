//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到两个结构：
//! - `OutputRequest`：这一批要产出什么、写到哪里（输出开关 + 尺寸 + 目录）
//! - `PipelineConfig`：怎么产出（滤镜档位、输入上限、并发度、SVG 字体）
//!
//! ## 实现思路
//!
//! - `OutputRequest` 只能通过 `OutputRequestBuilder::build` 构造，
//!   “单尺寸 ICO 依赖 PNG 输出”等约束在构造期校验，处理循环里不再分支判断。
//! - `ResizeProfile` 负责档位字符串解析与反向输出，映射到具体滤镜。
//! - `Default` 提供与原工具一致的尺寸集合与 Lanczos 滤镜。

use std::fmt;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;

use super::IconError;

/// 默认 PNG 输出尺寸。
pub const DEFAULT_SIZES: [u32; 10] = [16, 24, 32, 48, 64, 96, 128, 192, 256, 512];

/// ICO 单帧允许的最大边长。
pub const ICO_MAX_SIZE: u32 = 256;

const MIN_TARGET_SIZE: u32 = 1;
const MAX_TARGET_SIZE: u32 = 4096;

/// 目标尺寸（正方形边长，像素）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetSize(u32);

impl TargetSize {
    pub fn new(size: u32) -> Result<Self, IconError> {
        if !(MIN_TARGET_SIZE..=MAX_TARGET_SIZE).contains(&size) {
            return Err(IconError::Configuration(format!(
                "目标尺寸 {} 超出范围（{}~{}）",
                size, MIN_TARGET_SIZE, MAX_TARGET_SIZE
            )));
        }
        Ok(Self(size))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// 是否可以写入 ICO 容器。
    pub fn is_ico_eligible(self) -> bool {
        self.0 <= ICO_MAX_SIZE
    }

}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 缩放质量档位（面向用户语义）。
///
/// - `Quality`：Lanczos3，默认档位
/// - `Balanced`：CatmullRom
/// - `Speed`：Triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeProfile {
    Quality,
    Balanced,
    Speed,
}

impl ResizeProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use iconize::icon_pipeline::ResizeProfile;
    ///
    /// let p = ResizeProfile::from_str("balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), iconize::icon_pipeline::IconError>(())
    /// ```
    pub fn from_str(profile: &str) -> Result<Self, IconError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(IconError::Configuration(format!(
                "未知缩放档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }

    pub fn filter(self) -> FilterType {
        match self {
            Self::Quality => FilterType::Lanczos3,
            Self::Balanced => FilterType::CatmullRom,
            Self::Speed => FilterType::Triangle,
        }
    }
}

/// 流水线处理配置。
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 读取源文件时允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 缩放滤镜策略。
    pub resize_filter: FilterType,
    /// 并发处理的文件数上限。
    pub workers: usize,
    /// 渲染 SVG 前是否加载系统字体（含文字的 SVG 需要）。
    pub load_system_fonts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            resize_filter: ResizeProfile::Quality.filter(),
            workers: default_workers(),
            load_system_fonts: true,
        }
    }
}

impl PipelineConfig {
    pub fn apply_profile(&mut self, profile: ResizeProfile) {
        self.resize_filter = profile.filter();
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, 8)
}

/// 一批处理的输出请求。
///
/// 只能通过 [`OutputRequest::builder`] 构造，构造成功即保证配置约束成立。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRequest {
    resized: bool,
    packed: bool,
    single: bool,
    skip_existing: bool,
    sizes: Vec<TargetSize>,
    output_base: PathBuf,
}

impl OutputRequest {
    /// # 示例
    /// ```rust
    /// use iconize::icon_pipeline::{IconError, OutputRequest};
    ///
    /// let result = OutputRequest::builder("out").resized(false).single(true).build();
    /// assert!(matches!(result, Err(IconError::Configuration(_))));
    /// ```
    pub fn builder(output_base: impl Into<PathBuf>) -> OutputRequestBuilder {
        OutputRequestBuilder {
            resized: true,
            packed: true,
            single: true,
            skip_existing: false,
            sizes: DEFAULT_SIZES.to_vec(),
            output_base: output_base.into(),
        }
    }

    pub fn resized(&self) -> bool {
        self.resized
    }

    pub fn packed(&self) -> bool {
        self.packed
    }

    pub fn single(&self) -> bool {
        self.single
    }

    pub fn skip_existing(&self) -> bool {
        self.skip_existing
    }

    /// 升序、去重后的目标尺寸。
    pub fn sizes(&self) -> &[TargetSize] {
        &self.sizes
    }

    /// 可写入 ICO 的尺寸子集（升序）。
    pub fn ico_sizes(&self) -> Vec<TargetSize> {
        self.sizes.iter().copied().filter(|s| s.is_ico_eligible()).collect()
    }

    /// 本次需要在内存中生成的尺寸：开启 PNG 输出时为全部尺寸，否则只需 ICO 子集。
    pub fn render_sizes(&self) -> Vec<TargetSize> {
        if self.resized {
            self.sizes.clone()
        } else {
            self.ico_sizes()
        }
    }

    pub fn output_base(&self) -> &Path {
        &self.output_base
    }

    pub fn resized_dir(&self) -> PathBuf {
        self.output_base.join("resized")
    }

    pub fn ico_dir(&self) -> PathBuf {
        self.output_base.join("ico")
    }

    pub fn resized_png_path(&self, stem: &str, size: TargetSize) -> PathBuf {
        self.resized_dir().join(format!("{}_{}.png", stem, size))
    }

    pub fn packed_ico_path(&self, stem: &str) -> PathBuf {
        self.ico_dir().join(format!("{}.ico", stem))
    }

    pub fn single_ico_path(&self, stem: &str, size: TargetSize) -> PathBuf {
        self.ico_dir().join(format!("{}_{}.ico", stem, size))
    }

    /// 某个主干名在本次请求下会写出的全部路径，用于规划阶段的重名检测。
    pub fn planned_outputs(&self, stem: &str) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if self.resized {
            paths.extend(self.sizes.iter().map(|&size| self.resized_png_path(stem, size)));
        }
        if self.packed {
            paths.push(self.packed_ico_path(stem));
        }
        if self.single {
            paths.extend(
                self.ico_sizes()
                    .into_iter()
                    .map(|size| self.single_ico_path(stem, size)),
            );
        }
        paths
    }
}

/// `OutputRequest` 构造器，默认三种输出全部开启并使用默认尺寸。
#[derive(Debug, Clone)]
pub struct OutputRequestBuilder {
    resized: bool,
    packed: bool,
    single: bool,
    skip_existing: bool,
    sizes: Vec<u32>,
    output_base: PathBuf,
}

impl OutputRequestBuilder {
    pub fn resized(mut self, enabled: bool) -> Self {
        self.resized = enabled;
        self
    }

    pub fn packed(mut self, enabled: bool) -> Self {
        self.packed = enabled;
        self
    }

    pub fn single(mut self, enabled: bool) -> Self {
        self.single = enabled;
        self
    }

    pub fn skip_existing(mut self, enabled: bool) -> Self {
        self.skip_existing = enabled;
        self
    }

    pub fn sizes(mut self, sizes: impl IntoIterator<Item = u32>) -> Self {
        self.sizes = sizes.into_iter().collect();
        self
    }

    /// 校验全部约束并生成 `OutputRequest`。
    pub fn build(self) -> Result<OutputRequest, IconError> {
        if !self.resized && !self.packed && !self.single {
            return Err(IconError::Configuration(
                "至少需要开启一种输出（resized / packed / single）".to_string(),
            ));
        }

        if self.single && !self.resized {
            return Err(IconError::Configuration(
                "单尺寸 ICO 依赖 PNG 输出，请同时开启 resized".to_string(),
            ));
        }

        if self.output_base.as_os_str().is_empty() {
            return Err(IconError::Configuration("输出目录不能为空".to_string()));
        }

        let mut sizes = self
            .sizes
            .into_iter()
            .map(TargetSize::new)
            .collect::<Result<Vec<_>, _>>()?;
        sizes.sort_unstable();
        sizes.dedup();

        if sizes.is_empty() {
            return Err(IconError::Configuration("目标尺寸列表为空".to_string()));
        }

        if (self.packed || self.single) && !sizes.iter().any(|s| s.is_ico_eligible()) {
            return Err(IconError::Configuration(format!(
                "ICO 输出至少需要一个不超过 {} 的尺寸",
                ICO_MAX_SIZE
            )));
        }

        Ok(OutputRequest {
            resized: self.resized,
            packed: self.packed,
            single: self.single,
            skip_existing: self.skip_existing,
            sizes,
            output_base: self.output_base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_without_resized_is_rejected() {
        let result = OutputRequest::builder("out")
            .resized(false)
            .packed(true)
            .single(true)
            .build();
        assert!(matches!(result, Err(IconError::Configuration(_))));
    }

    #[test]
    fn all_flags_off_is_rejected() {
        let result = OutputRequest::builder("out")
            .resized(false)
            .packed(false)
            .single(false)
            .build();
        assert!(matches!(result, Err(IconError::Configuration(_))));
    }

    #[test]
    fn sizes_are_sorted_and_deduplicated() {
        let request = OutputRequest::builder("out")
            .sizes([64, 16, 32, 16])
            .build()
            .expect("valid request");
        let sizes: Vec<u32> = request.sizes().iter().map(|s| s.get()).collect();
        assert_eq!(sizes, vec![16, 32, 64]);
    }

    #[test]
    fn out_of_range_size_is_rejected() {
        let result = OutputRequest::builder("out").sizes([0, 16]).build();
        assert!(matches!(result, Err(IconError::Configuration(_))));

        let result = OutputRequest::builder("out").sizes([5000]).build();
        assert!(matches!(result, Err(IconError::Configuration(_))));
    }

    #[test]
    fn ico_output_needs_an_eligible_size() {
        let result = OutputRequest::builder("out")
            .single(false)
            .sizes([512])
            .build();
        assert!(matches!(result, Err(IconError::Configuration(_))));

        let request = OutputRequest::builder("out")
            .packed(false)
            .single(false)
            .sizes([512])
            .build()
            .expect("png only request");
        assert!(request.ico_sizes().is_empty());
    }

    #[test]
    fn render_sizes_follow_enabled_outputs() {
        let request = OutputRequest::builder("out")
            .resized(false)
            .single(false)
            .sizes([16, 256, 512])
            .build()
            .expect("packed only request");
        let sizes: Vec<u32> = request.render_sizes().iter().map(|s| s.get()).collect();
        assert_eq!(sizes, vec![16, 256]);
    }

    #[test]
    fn output_paths_follow_layout() {
        let request = OutputRequest::builder("/tmp/base").build().expect("default request");
        let size = TargetSize::new(32).expect("valid size");
        assert_eq!(
            request.resized_png_path("logo", size),
            PathBuf::from("/tmp/base/resized/logo_32.png")
        );
        assert_eq!(request.packed_ico_path("logo"), PathBuf::from("/tmp/base/ico/logo.ico"));
        assert_eq!(
            request.single_ico_path("logo", size),
            PathBuf::from("/tmp/base/ico/logo_32.ico")
        );
    }

    #[test]
    fn planned_outputs_cover_enabled_outputs() {
        let request = OutputRequest::builder("/tmp/base")
            .sizes([16, 512])
            .build()
            .expect("request");
        assert_eq!(
            request.planned_outputs("logo"),
            vec![
                PathBuf::from("/tmp/base/resized/logo_16.png"),
                PathBuf::from("/tmp/base/resized/logo_512.png"),
                PathBuf::from("/tmp/base/ico/logo.ico"),
                PathBuf::from("/tmp/base/ico/logo_16.ico"),
            ]
        );

        let packed_only = OutputRequest::builder("/tmp/base")
            .resized(false)
            .single(false)
            .sizes([16])
            .build()
            .expect("packed only request");
        assert_eq!(
            packed_only.planned_outputs("logo"),
            vec![PathBuf::from("/tmp/base/ico/logo.ico")]
        );
    }

    #[test]
    fn profile_parse_roundtrip() {
        for name in ["quality", "balanced", "speed"] {
            let profile = ResizeProfile::from_str(name).expect("known profile");
            assert_eq!(profile.as_str(), name);
        }
        assert_eq!(
            ResizeProfile::from_str(" Quality ").expect("trimmed").filter(),
            FilterType::Lanczos3
        );
        assert!(matches!(
            ResizeProfile::from_str("ultra"),
            Err(IconError::Configuration(_))
        ));
    }

    #[test]
    fn default_workers_are_bounded() {
        let config = PipelineConfig::default();
        assert!((1..=8).contains(&config.workers));
    }
}
