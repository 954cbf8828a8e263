// crates/ap_foundation/src/error.rs

//! 基础错误类型
//!
//! 定义整个项目的基础错误类型，仅包含与基础设施相关的错误。
//! 高层错误（网格、物理、IO）各自定义领域错误枚举，最终可转换为
//! [`PlumeError::Internal`] 或具体的基础错误向下兼容。
//!
//! # 设计原则
//!
//! 1. **纯净性**：仅包含 IO、索引、输入等基础错误，无网格、输运等高层概念
//! 2. **零依赖**：不依赖项目内其他 crate，可独立使用
//! 3. **易用性**：提供便捷构造函数和标准库类型转换

use std::{fmt, io, path::PathBuf};

/// 统一结果类型别名
///
/// 用于简化函数签名，等价于 `Result<T, PlumeError>`。
pub type PlumeResult<T> = Result<T, PlumeError>;

/// Foundation 层基础错误
///
/// 包含所有基础设施级别的错误，是错误体系的根基。
#[derive(Debug)]
pub enum PlumeError {
    /// IO 操作失败
    Io {
        /// 描述性错误信息
        message: String,
        /// 底层 IO 错误源
        source: Option<io::Error>,
    },

    /// 文件不存在
    FileNotFound {
        /// 未找到的文件路径
        path: PathBuf,
    },

    /// 数组或集合大小不匹配
    ///
    /// 在需要严格大小一致性的操作中触发（如浓度数组对齐）。
    SizeMismatch {
        /// 数据名称（用于调试）
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 索引访问越界
    IndexOutOfBounds {
        /// 索引类别（如 "Cell", "Layer"）
        index_type: &'static str,
        /// 访问的索引值
        index: usize,
        /// 容器长度（上界）
        len: usize,
    },

    /// 输入数据验证失败
    ///
    /// 用于参数校验、前置条件检查等场景。
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    /// 内部实现错误
    ///
    /// 当程序进入不应到达的状态时使用，通常表示不变量被破坏。
    Internal {
        /// 内部错误描述
        message: String,
    },

    /// 功能或资源未找到
    NotFound {
        /// 资源名称或标识
        resource: String,
    },
}

// ============================================================================
// 便捷构造方法
// ============================================================================

impl PlumeError {
    /// 创建 IO 错误
    #[inline]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带源的 IO 错误
    #[inline]
    pub fn io_with_source(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// 创建文件未找到错误
    #[inline]
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// 创建大小不匹配错误
    #[inline]
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 创建索引越界错误
    #[inline]
    pub fn index_out_of_bounds(index_type: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            index_type,
            index,
            len,
        }
    }

    /// 创建无效输入错误
    #[inline]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 创建内部错误
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// 创建资源未找到错误
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// 验证数组大小是否匹配，不匹配则返回 [`PlumeError::SizeMismatch`]
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> PlumeResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 验证索引是否在有效范围内，越界则返回 [`PlumeError::IndexOutOfBounds`]
    #[inline]
    pub fn check_index(index_type: &'static str, index: usize, len: usize) -> PlumeResult<()> {
        if index >= len {
            Err(Self::index_out_of_bounds(index_type, index, len))
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// 标准库错误转换实现
// ============================================================================

impl From<io::Error> for PlumeError {
    /// 将 [`std::io::Error`] 转换为 [`PlumeError::Io`]
    fn from(err: io::Error) -> Self {
        Self::io_with_source("IO 操作失败", err)
    }
}

// ============================================================================
// 核心 Trait 实现
// ============================================================================

impl fmt::Display for PlumeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { message, .. } => write!(f, "IO错误: {}", message),
            Self::FileNotFound { path } => write!(f, "文件不存在: {}", path.display()),
            Self::SizeMismatch {
                name,
                expected,
                actual,
            } => {
                write!(f, "数组大小不匹配: {} 期望{}, 实际{}", name, expected, actual)
            }
            Self::IndexOutOfBounds {
                index_type,
                index,
                len,
            } => {
                write!(f, "索引越界: {} 索引{} 超出范围 0..{}", index_type, index, len)
            }
            Self::InvalidInput { message } => write!(f, "无效的输入数据: {}", message),
            Self::Internal { message } => write!(f, "内部错误: {}", message),
            Self::NotFound { resource } => write!(f, "资源未找到: {}", resource),
        }
    }
}

impl std::error::Error for PlumeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => source.as_ref().map(|e| e as _),
            _ => None,
        }
    }
}

// ============================================================================
// 测试
// ============================================================================
