//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载自动尺寸链路中的所有失败来源，调用侧可按分支匹配。
//! 读取失败的文案以 errno 风格代码开头（如 `ENOENT`）并带上原始路径/URL，
//! 方便上层工具按失败原因做字符串匹配。
//!
//! 不适用的元素（无 `src`、宽高已确定）不会产生错误，直接跳过。

use std::io;

/// 自动尺寸统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum AutosizeError {
    /// 本地文件或远程资源读取失败。
    #[error("{code}: 图片读取失败：{reason}（来源：'{location}'）")]
    SourceRead {
        code: &'static str,
        location: String,
        reason: String,
    },

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    /// 并发处理任务异常退出（panic 或被取消）。
    #[error("任务错误：{0}")]
    Task(String),
}

impl AutosizeError {
    /// 由本地 I/O 错误构造读取失败。
    pub(crate) fn from_io(error: &io::Error, location: impl Into<String>) -> Self {
        Self::SourceRead {
            code: io_error_code(error),
            location: location.into(),
            reason: error.to_string(),
        }
    }
}

/// 将 `io::ErrorKind` 映射为 errno 风格代码。
fn io_error_code(error: &io::Error) -> &'static str {
    match error.kind() {
        io::ErrorKind::NotFound => "ENOENT",
        io::ErrorKind::PermissionDenied => "EACCES",
        io::ErrorKind::IsADirectory => "EISDIR",
        io::ErrorKind::TimedOut => "ETIMEDOUT",
        _ => "EIO",
    }
}
