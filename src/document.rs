//! # 文档处理模块
//!
//! ## 设计思路
//!
//! 这里不构建 DOM，只做两件事：
//! - 用 `html5ever` 分词器找出真正的 `<img>` 起始标签，解析为 [`ImageElement`]
//! - 对被修改的标签重新序列化，其余字节原样保留
//!
//! ## 实现思路
//!
//! - 分词器负责 HTML 的引号、注释与原始文本规则：`<script>`/`<style>`/`<textarea>`
//!   等元素内的 `<img` 文本不会被当作标签。
//! - 输入逐字符喂给分词器，标签在读到结尾 `>` 时产出，此时已喂入的字节数即标签终点；
//!   起点是上一个标记之后第一个 `<` + 字母。
//! - 每个 `<img>` 作为独立任务放入 `JoinSet` 并发处理，任务各自持有元素。
//! - 任一任务失败立即返回该错误，`JoinSet` 被丢弃时其余任务随之中止（快速失败）。

use std::cell::{Cell, RefCell};
use std::ops::Range;
use std::time::Instant;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use tokio::task::JoinSet;

use crate::autosize::{AutosizeError, ImageAutosizer, ImageElement};

/// 收集 `<img>` 起始标签及其在原文中的字节区间。
struct TagCollector<'a> {
    html: &'a str,
    /// 已喂入分词器的字节数。
    fed: Cell<usize>,
    /// 上一个非文本标记的结束位置。
    boundary: Cell<usize>,
    tags: RefCell<Vec<(Range<usize>, ImageElement)>>,
}

impl<'a> TagCollector<'a> {
    fn new(html: &'a str) -> Self {
        Self {
            html,
            fed: Cell::new(0),
            boundary: Cell::new(0),
            tags: RefCell::new(Vec::new()),
        }
    }

    fn collect_tag(&self, tag: Tag) -> TokenSinkResult<()> {
        let end = self.fed.get();
        let after_previous = self.boundary.replace(end);

        if tag.kind == TagKind::EndTag {
            return TokenSinkResult::Continue;
        }

        if &*tag.name == "img" {
            match tag_start(&self.html[after_previous..end]) {
                Some(offset) => {
                    let element = element_from_tag(&tag);
                    self.tags
                        .borrow_mut()
                        .push((after_previous + offset..end, element));
                }
                None => log::warn!("⚠️ 无法定位 <img> 起点 - 结束于字节 {}", end),
            }
        }

        match &*tag.name {
            "title" | "textarea" => TokenSinkResult::RawData(RawKind::Rcdata),
            "style" | "xmp" | "iframe" | "noembed" | "noframes" | "noscript" => {
                TokenSinkResult::RawData(RawKind::Rawtext)
            }
            "script" => TokenSinkResult::RawData(RawKind::ScriptData),
            "plaintext" => TokenSinkResult::Plaintext,
            _ => TokenSinkResult::Continue,
        }
    }
}

impl TokenSink for TagCollector<'_> {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => self.collect_tag(tag),
            Token::CommentToken(_) | Token::DoctypeToken(_) => {
                self.boundary.set(self.fed.get());
                TokenSinkResult::Continue
            }
            _ => TokenSinkResult::Continue,
        }
    }
}

/// 标签文本之前只可能是纯文本，纯文本中不会出现 `<` + ASCII 字母。
fn tag_start(segment: &str) -> Option<usize> {
    segment
        .as_bytes()
        .windows(2)
        .position(|pair| pair[0] == b'<' && pair[1].is_ascii_alphabetic())
}

fn element_from_tag(tag: &Tag) -> ImageElement {
    let mut element = ImageElement::new();
    for attr in &tag.attrs {
        element.push(&attr.name.local, Some(attr.value.to_string()));
    }
    element.set_self_closing(tag.self_closing);
    element
}

/// 查找文档中所有 `<img>` 起始标签，返回其字节区间与解析后的元素。
///
/// 属性名为小写，属性值已解码字符引用（`&amp;` → `&`）。
///
/// # 示例
/// ```rust
/// use img_autosize::document::find_img_tags;
///
/// let tags = find_img_tags(r#"<p><img src="a.png" width=auto></p><!-- <img src="b.png"> -->"#);
/// assert_eq!(tags.len(), 1);
/// assert_eq!(tags[0].1.get("width"), Some("auto"));
/// ```
pub fn find_img_tags(html: &str) -> Vec<(Range<usize>, ImageElement)> {
    let tokenizer = Tokenizer::new(TagCollector::new(html), TokenizerOpts::default());
    let input = BufferQueue::default();

    for (index, ch) in html.char_indices() {
        let next = index + ch.len_utf8();
        tokenizer.sink.fed.set(next);
        input.push_back(StrTendril::from_slice(&html[index..next]));
        let _ = tokenizer.feed(&input);
    }
    tokenizer.end();

    tokenizer.sink.tags.take()
}

/// 处理整段 HTML：补全所有符合条件的 `<img>` 宽高。
///
/// 未修改的标签与其他内容逐字节保留；任一图片失败则整次处理失败。
pub async fn autosize_html(autosizer: &ImageAutosizer, html: &str) -> Result<String, AutosizeError> {
    let start = Instant::now();
    let tags = find_img_tags(html);
    let mut ranges = Vec::with_capacity(tags.len());
    let mut tasks = JoinSet::new();

    for (index, (range, mut element)) in tags.into_iter().enumerate() {
        ranges.push(range);
        let autosizer = autosizer.clone();
        tasks.spawn(async move {
            let changed = autosizer.process(&mut element).await?;
            Ok::<_, AutosizeError>((index, changed.then_some(element)))
        });
    }

    let mut replacements: Vec<Option<ImageElement>> = vec![None; ranges.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, updated) = joined.map_err(|e| AutosizeError::Task(e.to_string()))??;
        replacements[index] = updated;
    }

    let total = ranges.len();
    let updated_count = replacements.iter().filter(|r| r.is_some()).count();
    if updated_count == 0 {
        log::debug!("文档中没有需要补全的 <img>（共 {} 个）", total);
        return Ok(html.to_string());
    }

    let mut output = String::with_capacity(html.len() + updated_count * 32);
    let mut cursor = 0;
    for (range, replacement) in ranges.into_iter().zip(replacements) {
        if let Some(element) = replacement {
            output.push_str(&html[cursor..range.start]);
            output.push_str(&element.to_string());
            cursor = range.end;
        }
    }
    output.push_str(&html[cursor..]);

    log::info!(
        "✅ 文档处理完成 - img={} 更新={} total={}ms",
        total,
        updated_count,
        start.elapsed().as_millis()
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autosize::AutosizeConfig;

    #[test]
    fn find_img_tags_parses_all_quoting_styles() {
        let tags = find_img_tags(r#"<IMG SRC='a.png' width=auto height="10" ismap/>"#);

        assert_eq!(tags.len(), 1);
        let (range, element) = &tags[0];
        assert_eq!(range.start, 0);
        assert_eq!(element.get("src"), Some("a.png"));
        assert_eq!(element.get("width"), Some("auto"));
        assert_eq!(element.get("height"), Some("10"));
        assert!(element.contains("ismap"));
        assert!(element.is_self_closing());
    }

    #[test]
    fn find_img_tags_skips_comments_and_lookalike_tags() {
        let html = r#"<!-- <img src="x.png"> --><image href="y.png"><imgx><img>"#;
        let tags = find_img_tags(html);

        assert_eq!(tags.len(), 1);
        assert_eq!(&html[tags[0].0.clone()], "<img>");
        assert!(tags[0].1.attributes().is_empty());
    }

    #[test]
    fn find_img_tags_allows_gt_inside_quoted_values() {
        let tags = find_img_tags(r#"<img alt="a > b" src="c.png">"#);

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].1.get("alt"), Some("a > b"));
        assert_eq!(tags[0].1.get("src"), Some("c.png"));
    }

    #[test]
    fn find_img_tags_ignores_markup_inside_raw_text_elements() {
        let html = concat!(
            "<script>var s = '<img src=\"runtime.png\" width=\"auto\">';</script>",
            "<style>/* <img src=a.png> */</style>",
            "<textarea><img src=b.png width=auto></textarea>",
            "<img src=\"real.png\">",
        );
        let tags = find_img_tags(html);

        assert_eq!(tags.len(), 1);
        assert_eq!(&html[tags[0].0.clone()], r#"<img src="real.png">"#);
    }

    #[test]
    fn find_img_tags_keeps_quotes_inside_unquoted_values() {
        let html = r#"<img alt=it's src=a.png width=auto><p title='x'>hello</p>"#;
        let tags = find_img_tags(html);

        assert_eq!(tags.len(), 1);
        let (range, element) = &tags[0];
        assert_eq!(&html[range.clone()], "<img alt=it's src=a.png width=auto>");
        assert_eq!(element.get("alt"), Some("it's"));
        assert_eq!(element.get("src"), Some("a.png"));
        assert_eq!(element.get("width"), Some("auto"));
    }

    #[test]
    fn find_img_tags_locates_ranges_after_text_with_angle_brackets() {
        let html = "a < b <3 </> é<img src=\"a.png\"><?pi <img x> ?><img src='b.png'>";
        let tags = find_img_tags(html);

        assert_eq!(tags.len(), 2);
        assert_eq!(&html[tags[0].0.clone()], "<img src=\"a.png\">");
        assert_eq!(&html[tags[1].0.clone()], "<img src='b.png'>");
    }

    #[test]
    fn find_img_tags_decodes_character_references() {
        let tags = find_img_tags(r#"<img src="a&amp;b.png" alt="&quot;x&quot;">"#);

        assert_eq!(tags[0].1.get("src"), Some("a&b.png"));
        assert_eq!(tags[0].1.get("alt"), Some(r#""x""#));
    }

    #[tokio::test]
    async fn document_without_eligible_images_is_returned_verbatim() {
        let autosizer = ImageAutosizer::new(AutosizeConfig::default()).expect("autosizer init failed");
        let html = "<div><img></div>\n<img src='foo.jpg' width='100%' height=100>";

        assert_eq!(autosizer.process_html(html).await.expect("process"), html);
    }

    #[tokio::test]
    async fn script_text_mentioning_img_does_not_abort_the_document() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let autosizer = ImageAutosizer::new(AutosizeConfig::with_root(dir.path()))
            .expect("autosizer init failed");
        let html = r#"<script>var s = '<img src="runtime.png" width="auto">';</script>"#;

        assert_eq!(autosizer.process_html(html).await.expect("process"), html);
    }
}
