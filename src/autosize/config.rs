//! # 配置模块
//!
//! ## 设计思路
//!
//! 一次处理运行（一个 HTML 文档）共享同一份只读配置。
//! 两个核心选项决定触发策略与路径解析：
//! - `root`：本地相对 `src` 的基准目录
//! - `process_empty_size`：是否把缺失/空的宽高也视为“待计算”
//!
//! 其余字段控制加载阶段的资源上限与网络参数。
//!
//! ## 实现思路
//!
//! - `Default` 提供与原插件一致的默认值（`root` 为当前目录，仅处理 `auto`）。
//! - 通过 `serde` 反序列化，键名使用 camelCase，兼容 `{"root": ..., "processEmptySize": true}`。
//! - `validate` 在构建 `ImageAutosizer` 时执行，尽早拒绝无效参数。

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::AutosizeError;

const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;
const DEFAULT_MAX_REDIRECTS: usize = 5;
const DEFAULT_USER_AGENT: &str = concat!("img-autosize/", env!("CARGO_PKG_VERSION"));

/// 图片自动尺寸配置。
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutosizeConfig {
    /// 本地图片的基准目录；未设置时相对当前工作目录解析。
    pub root: Option<PathBuf>,
    /// 为 `true` 时，缺失或为空的 `width`/`height` 同样触发计算。
    pub process_empty_size: bool,
    /// 读取/下载原始字节时允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 整体下载超时（秒），`None` 表示不限时。
    pub download_timeout: Option<u64>,
    /// 建立连接超时（秒），`None` 表示使用 HTTP 客户端默认行为。
    pub connect_timeout: Option<u64>,
    /// 最大重定向次数。
    pub max_redirects: usize,
    /// 远程请求使用的 User-Agent。
    pub user_agent: String,
}

impl Default for AutosizeConfig {
    fn default() -> Self {
        Self {
            root: None,
            process_empty_size: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            download_timeout: None,
            connect_timeout: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl AutosizeConfig {
    /// 以指定根目录创建配置，其余字段取默认值。
    ///
    /// # 示例
    /// ```rust
    /// use img_autosize::AutosizeConfig;
    ///
    /// let config = AutosizeConfig::with_root("./public");
    /// assert!(!config.process_empty_size);
    /// ```
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    /// 从 JSON 文本解析配置。
    ///
    /// # 示例
    /// ```rust
    /// use img_autosize::AutosizeConfig;
    ///
    /// let config = AutosizeConfig::from_json(r#"{"root": "./img", "processEmptySize": true}"#)?;
    /// assert!(config.process_empty_size);
    /// # Ok::<(), img_autosize::AutosizeError>(())
    /// ```
    pub fn from_json(json: &str) -> Result<Self, AutosizeError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AutosizeError::InvalidFormat(format!("配置解析失败：{}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置取值范围。
    pub fn validate(&self) -> Result<(), AutosizeError> {
        if self.max_file_size == 0 {
            return Err(AutosizeError::InvalidFormat("maxFileSize 必须大于 0".to_string()));
        }
        if matches!(self.download_timeout, Some(0)) {
            return Err(AutosizeError::InvalidFormat("downloadTimeout 必须大于 0 秒".to_string()));
        }
        if matches!(self.connect_timeout, Some(0)) {
            return Err(AutosizeError::InvalidFormat("connectTimeout 必须大于 0 秒".to_string()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(AutosizeError::InvalidFormat("userAgent 不能为空".to_string()));
        }

        Ok(())
    }

    /// 本地路径解析使用的基准目录。
    pub(crate) fn root_dir(&self) -> &Path {
        self.root.as_deref().unwrap_or_else(|| Path::new("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_only_processes_auto() {
        let config = AutosizeConfig::default();

        assert!(!config.process_empty_size);
        assert_eq!(config.root_dir(), Path::new("."));
        assert!(config.download_timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_json_accepts_camel_case_keys() {
        let config = AutosizeConfig::from_json(
            r#"{"root": "./test/img", "processEmptySize": true, "maxRedirects": 2}"#,
        )
        .expect("config should parse");

        assert_eq!(config.root_dir(), Path::new("./test/img"));
        assert!(config.process_empty_size);
        assert_eq!(config.max_redirects, 2);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn from_json_rejects_zero_timeouts() {
        let result = AutosizeConfig::from_json(r#"{"downloadTimeout": 0}"#);

        assert!(matches!(result, Err(AutosizeError::InvalidFormat(_))));
    }

    #[test]
    fn from_json_rejects_malformed_input() {
        let result = AutosizeConfig::from_json(r#"{"processEmptySize": "yes"}"#);

        assert!(matches!(result, Err(AutosizeError::InvalidFormat(_))));
    }
}
