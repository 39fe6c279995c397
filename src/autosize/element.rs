//! # 图片元素模型
//!
//! `ImageElement` 是 `<img>` 标签属性的有序列表。
//! 属性名按 ASCII 忽略大小写匹配；新增属性追加到末尾，保证序列化结果可复现。

use std::fmt;

/// 单个属性：`name` 或 `name="value"`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// `None` 表示无值属性（如 `<img ismap>`）。
    pub value: Option<String>,
}

/// 一个 `<img>` 元素的属性集合。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageElement {
    attributes: Vec<Attribute>,
    self_closing: bool,
}

impl ImageElement {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 `(name, value)` 列表构建元素。
    ///
    /// # 示例
    /// ```rust
    /// use img_autosize::ImageElement;
    ///
    /// let element = ImageElement::from_pairs([("src", "a.png"), ("width", "auto")]);
    /// assert_eq!(element.get("WIDTH"), Some("auto"));
    /// ```
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut element = Self::new();
        for (name, value) in pairs {
            element.push(name, Some(value.to_string()));
        }
        element
    }

    /// 读取属性值；属性不存在或无值时返回 `None`。
    pub fn get(&self, name: &str) -> Option<&str> {
        self.find(name).and_then(|attr| attr.value.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// 设置属性值：已存在则原位替换，否则追加到末尾。
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = Some(value.into());
        if let Some(attr) = self
            .attributes
            .iter_mut()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
        {
            attr.value = value;
            return;
        }
        self.push(name, value);
    }

    /// 追加属性，不检查重名（用于按原文顺序还原标签）。
    pub(crate) fn push(&mut self, name: &str, value: Option<String>) {
        self.attributes.push(Attribute {
            name: name.to_string(),
            value,
        });
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    pub(crate) fn set_self_closing(&mut self, self_closing: bool) {
        self.self_closing = self_closing;
    }

    fn find(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }
}

/// 序列化为 `<img ...>` 起始标签，属性值统一使用双引号并转义 `&`、`"`。
impl fmt::Display for ImageElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<img")?;
        for attr in &self.attributes {
            match &attr.value {
                Some(value) => write!(f, " {}=\"{}\"", attr.name, escape_attribute(value))?,
                None => write!(f, " {}", attr.name)?,
            }
        }
        if self.self_closing {
            f.write_str(" />")
        } else {
            f.write_str(">")
        }
    }
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place_and_appends_new() {
        let mut element = ImageElement::from_pairs([("src", "a.gif"), ("HEIGHT", "auto")]);

        element.set("height", "83");
        element.set("width", "140");

        assert_eq!(element.to_string(), r#"<img src="a.gif" HEIGHT="83" width="140">"#);
    }

    #[test]
    fn display_keeps_valueless_and_self_closing() {
        let mut element = ImageElement::new();
        element.push("src", Some("a.png".to_string()));
        element.push("ismap", None);
        element.set_self_closing(true);

        assert_eq!(element.to_string(), r#"<img src="a.png" ismap />"#);
        assert_eq!(element.get("ismap"), None);
        assert!(element.contains("ismap"));
    }

    #[test]
    fn display_escapes_quotes_and_ampersands() {
        let element = ImageElement::from_pairs([("alt", r#"say "hi""#), ("src", "a&b.png")]);

        assert_eq!(
            element.to_string(),
            r#"<img alt="say &quot;hi&quot;" src="a&amp;b.png">"#
        );
    }
}
