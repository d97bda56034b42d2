//! 设置文件模块
//!
//! # 设计思路
//!
//! 配置按三层叠加，后者覆盖前者：内置默认值 → JSON 设置文件 → 命令行参数。
//! 设置文件只描述“用户偏好”，真正的运行期类型由 `pipeline_config` /
//! `output_request` 转换并校验。
//!
//! # 实现思路
//!
//! - 全字段 `#[serde(default)]`，旧文件缺字段也能读。
//! - 隐式查找的设置文件损坏时回退默认值并告警；显式指定的文件损坏直接报错。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::icon_pipeline::{DEFAULT_SIZES, OutputRequest, PipelineConfig, ResizeProfile};

/// 当前目录下默认查找的设置文件名。
pub const SETTINGS_FILE_NAME: &str = "iconize.json";

const DEFAULT_OUTPUT_DIR_NAME: &str = "processed_images";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 输出根目录，未设置时为 `~/processed_images`。
    pub output_dir: Option<String>,
    pub sizes: Vec<u32>,
    pub resized: bool,
    pub packed: bool,
    pub single: bool,
    pub skip_existing: bool,
    /// quality / balanced / speed
    pub profile: String,
    /// 未设置时按 CPU 核数决定。
    pub workers: Option<usize>,
    pub load_system_fonts: bool,
    pub max_file_size_mb: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: None,
            sizes: DEFAULT_SIZES.to_vec(),
            resized: true,
            packed: true,
            single: true,
            skip_existing: false,
            profile: ResizeProfile::Quality.as_str().to_string(),
            workers: None,
            load_system_fonts: true,
            max_file_size_mb: 50,
        }
    }
}

impl Settings {
    /// 转换为流水线配置。
    pub fn pipeline_config(&self) -> Result<PipelineConfig, AppError> {
        let mut config = PipelineConfig::default();
        config.apply_profile(ResizeProfile::from_str(&self.profile)?);
        if let Some(workers) = self.workers {
            if workers == 0 {
                return Err(AppError::Settings("workers 必须大于 0".to_string()));
            }
            config.workers = workers;
        }
        if self.max_file_size_mb == 0 {
            return Err(AppError::Settings("max_file_size_mb 必须大于 0".to_string()));
        }
        config.max_file_size = self.max_file_size_mb.saturating_mul(1024 * 1024);
        config.load_system_fonts = self.load_system_fonts;
        Ok(config)
    }

    /// 转换为经过校验的输出请求。
    pub fn output_request(&self) -> Result<OutputRequest, AppError> {
        let request = OutputRequest::builder(self.output_path())
            .resized(self.resized)
            .packed(self.packed)
            .single(self.single)
            .skip_existing(self.skip_existing)
            .sizes(self.sizes.iter().copied())
            .build()?;
        Ok(request)
    }

    pub fn output_path(&self) -> PathBuf {
        match self.output_dir.as_deref() {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_OUTPUT_DIR_NAME)
}

/// 读取设置文件，缺失或损坏时回退默认值。
pub fn load_settings_from_path(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }

    match load_settings_strict(path) {
        Ok(settings) => settings,
        Err(err) => {
            log::warn!("⚠️ 设置文件无效，使用默认设置: {err}");
            Settings::default()
        }
    }
}

/// 读取设置文件，任何错误都上抛。
pub fn load_settings_strict(path: &Path) -> Result<Settings, AppError> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::Settings(format!("读取 '{}' 失败: {}", path.display(), e)))?;
    serde_json::from_str::<Settings>(&content)
        .map_err(|e| AppError::Settings(format!("解析 '{}' 失败: {}", path.display(), e)))
}

/// 保存设置文件（格式化 JSON）。
pub fn save_settings_to_path(path: &Path, settings: &Settings) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;
    fs::write(path, content)?;
    Ok(())
}
