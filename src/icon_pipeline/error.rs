//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载图标流水线中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! - `Configuration` 只会在批处理开始前出现，直接中止整批。
//! - 其余错误都在单文件边界被捕获，记录到 `BatchResult` 后继续下一个文件。

/// 图标流水线统一错误类型。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IconError {
    #[error("不支持的格式：{0}")]
    UnsupportedFormat(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("写入错误：{0}")]
    Write(String),

    #[error("配置错误：{0}")]
    Configuration(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("输出文件名冲突：{0}")]
    NameCollision(String),

    #[error("已取消：{0}")]
    Cancelled(String),
}

impl IconError {
    /// 稳定错误码，供日志与汇总输出使用。
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "E_UNSUPPORTED",
            Self::Decode(_) => "E_DECODE",
            Self::Write(_) => "E_WRITE",
            Self::Configuration(_) => "E_CONFIG",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
            Self::NameCollision(_) => "E_NAME_COLLISION",
            Self::Cancelled(_) => "E_CANCELLED",
        }
    }

    /// 出错阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "detect",
            Self::Decode(_) | Self::ResourceLimit(_) => "decode",
            Self::Write(_) => "write",
            Self::Configuration(_) => "config",
            Self::NameCollision(_) => "plan",
            Self::Cancelled(_) => "cancel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_stages_are_stable() {
        let err = IconError::Decode("bad".to_string());
        assert_eq!(err.code(), "E_DECODE");
        assert_eq!(err.stage(), "decode");

        let err = IconError::Configuration("x".to_string());
        assert_eq!(err.code(), "E_CONFIG");
        assert_eq!(err.stage(), "config");
    }

    #[test]
    fn display_keeps_reason() {
        let err = IconError::Write("磁盘已满".to_string());
        assert!(err.to_string().contains("磁盘已满"));
    }
}
