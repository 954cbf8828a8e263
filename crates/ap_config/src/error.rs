// crates/ap_config/src/error.rs

//! 配置错误类型

use thiserror::Error;

/// 配置验证错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置项取值非法
    #[error("无效的配置项 {field}: {message}")]
    Invalid {
        /// 出错的配置字段
        field: &'static str,
        /// 非法原因
        message: String,
    },
}

impl ConfigError {
    /// 创建非法取值错误
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}
