//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageAutosizer` 只负责单个元素的流程编排，固定为：
//! 1. 按配置对 `width`/`height` 分类，判断是否需要处理
//! 2. 由 `src` 推导来源并加载原始字节
//! 3. 解码自然尺寸
//! 4. 计算写回值并一次性写入属性
//!
//! ## 实现思路
//!
//! - 配置以 `Arc` 共享、只读；HTTP 客户端可廉价克隆，便于并发任务各持一份。
//! - 所有 I/O 与解码完成后才修改元素，写宽与写高之间没有挂起点，不会出现半写状态。
//! - 任何失败直接向上返回，由调用方中止整次运行。

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::decoder::decode_dimensions;
use super::policy::{SizeAssignment, SizeHint, assign, is_eligible};
use super::{AutosizeConfig, AutosizeError, Dimensions, ImageElement, ImageSource};

/// 图片自动尺寸处理器。
#[derive(Clone)]
pub struct ImageAutosizer {
    pub(super) config: Arc<AutosizeConfig>,
    pub(super) client: reqwest::Client,
}

impl ImageAutosizer {
    /// 根据配置创建处理器，同时构建复用的 HTTP 客户端。
    ///
    /// # 示例
    /// ```rust
    /// use img_autosize::{AutosizeConfig, ImageAutosizer};
    ///
    /// let autosizer = ImageAutosizer::new(AutosizeConfig::with_root("./public"))?;
    /// # Ok::<(), img_autosize::AutosizeError>(())
    /// ```
    pub fn new(config: AutosizeConfig) -> Result<Self, AutosizeError> {
        config.validate()?;
        let client = Self::build_http_client(&config)?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    pub fn config(&self) -> &AutosizeConfig {
        &self.config
    }

    fn build_http_client(config: &AutosizeConfig) -> Result<reqwest::Client, AutosizeError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects));

        if let Some(secs) = config.download_timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.connect_timeout {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }

        builder
            .build()
            .map_err(|e| AutosizeError::InvalidFormat(format!("无法创建 HTTP 客户端：{}", e)))
    }

    /// 处理单个元素：需要时补全宽高。
    ///
    /// 返回 `true` 表示元素被修改；不适用的元素原样保留并返回 `false`。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use img_autosize::{AutosizeConfig, ImageAutosizer, ImageElement};
    ///
    /// # async fn demo() -> Result<(), img_autosize::AutosizeError> {
    /// let autosizer = ImageAutosizer::new(AutosizeConfig::with_root("./test/img"))?;
    /// let mut element = ImageElement::from_pairs([("src", "100x201.jpg"), ("width", "auto")]);
    /// autosizer.process(&mut element).await?;
    /// assert_eq!(element.get("width"), Some("100"));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn process(&self, element: &mut ImageElement) -> Result<bool, AutosizeError> {
        let process_empty_size = self.config.process_empty_size;
        let width = SizeHint::classify(element.get("width"), process_empty_size);
        let height = SizeHint::classify(element.get("height"), process_empty_size);
        let src = element.get("src");

        if !is_eligible(src, width, height) {
            log::debug!(
                "⏭️ 跳过 <img> - src={:?} width={:?} height={:?}",
                src,
                width,
                height
            );
            return Ok(false);
        }

        let source = ImageSource::resolve(src.unwrap_or_default(), &self.config);
        let start = Instant::now();
        let natural = self.measure_source(&source).await?;
        let assignment = assign(natural, width, height);

        if let Some(value) = assignment.width {
            element.set("width", value.to_string());
        }
        if let Some(value) = assignment.height {
            element.set("height", value.to_string());
        }

        log::info!(
            "📐 已补全尺寸 - 来源={} 自然尺寸={} width={:?} height={:?} 耗时={}ms",
            Self::describe_source(&source),
            natural,
            assignment.width,
            assignment.height,
            start.elapsed().as_millis()
        );

        Ok(assignment != SizeAssignment::default())
    }

    /// 读取 `src` 指向图片的自然尺寸。
    pub async fn measure(&self, src: &str) -> Result<Dimensions, AutosizeError> {
        self.measure_source(&ImageSource::resolve(src, &self.config))
            .await
    }

    async fn measure_source(&self, source: &ImageSource) -> Result<Dimensions, AutosizeError> {
        let load_start = Instant::now();
        let raw = match source {
            ImageSource::Url(url) => self.load_from_url(url).await?,
            ImageSource::DataUri(uri) => self.load_from_data_uri(uri)?,
            ImageSource::FilePath(path) => self.load_from_file(path).await?,
        };
        let load_elapsed = load_start.elapsed();

        let decode_start = Instant::now();
        let dimensions = decode_dimensions(&raw.bytes)?;

        log::debug!(
            "✅ 尺寸读取完成 - 来源: {} ({}) load={}ms decode={}ms",
            raw.source_hint,
            Self::describe_source(source),
            load_elapsed.as_millis(),
            decode_start.elapsed().as_millis()
        );

        Ok(dimensions)
    }

    fn describe_source(source: &ImageSource) -> String {
        match source {
            ImageSource::Url(url) => Self::redact_url_for_log(url),
            other => other.to_string(),
        }
    }

    /// 处理整段 HTML，返回补全后的文本。
    pub async fn process_html(&self, html: &str) -> Result<String, AutosizeError> {
        crate::document::autosize_html(self, html).await
    }
}
