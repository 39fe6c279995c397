//! # 加载模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（URL / data URI / 本地文件）的原始字节加载。
//! 读取失败一律视为整次运行失败：不重试、不吞错，错误中保留原始路径/URL。
//!
//! ## 实现思路
//!
//! - 文件：metadata 体积限制 + 异步读取，`io::Error` 映射为 errno 风格代码。
//! - URL：状态码校验 + Content-Length 预检 + 流式下载与累计体积限制。
//! - data URI：base64 或百分号编码载荷，解码前估算体积。

use base64::{Engine as _, engine::general_purpose};
use std::path::Path;

use super::source::RawImageData;
use super::{AutosizeError, ImageAutosizer};

const BUFFER_INITIAL_CAPACITY: usize = 16 * 1024;

impl ImageAutosizer {
    /// 从本地路径加载图片原始字节。
    pub(super) async fn load_from_file(&self, path: &Path) -> Result<RawImageData, AutosizeError> {
        let location = path.display().to_string();
        log::debug!("📁 读取本地图片 - 路径: {}", location);

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| AutosizeError::from_io(&e, location.as_str()))?;

        if metadata.is_dir() {
            return Err(AutosizeError::SourceRead {
                code: "EISDIR",
                location,
                reason: "路径是目录".to_string(),
            });
        }

        if metadata.len() > self.config.max_file_size {
            return Err(AutosizeError::ResourceLimit(format!(
                "文件过大：{}（{:.2} MB，限制：{:.2} MB）",
                location,
                metadata.len() as f64 / 1024.0 / 1024.0,
                self.config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AutosizeError::from_io(&e, location.as_str()))?;

        Ok(RawImageData {
            bytes,
            source_hint: "file",
        })
    }

    /// 从 URL 下载图片原始字节。
    ///
    /// 使用流式读取，累计体积超过上限时立即中止。
    pub(super) async fn load_from_url(&self, url: &str) -> Result<RawImageData, AutosizeError> {
        log::debug!("🌐 开始下载图片 - URL: {}", Self::redact_url_for_log(url));

        let parsed = reqwest::Url::parse(url)
            .map_err(|e| AutosizeError::InvalidFormat(format!("URL 格式错误：{}（{}）", e, url)))?;

        let response = self
            .client
            .get(parsed)
            .header(
                reqwest::header::ACCEPT,
                "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(|e| Self::map_reqwest_error(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AutosizeError::SourceRead {
                code: "EHTTP",
                location: url.to_string(),
                reason: format!("HTTP {}: {}", status.as_u16(), Self::status_message(status.as_u16())),
            });
        }

        let total_len = response.content_length();
        if let Some(size) = total_len {
            if size > self.config.max_file_size {
                return Err(AutosizeError::ResourceLimit(format!(
                    "远程文件过大：{:.2} MB（限制：{:.2} MB）",
                    size as f64 / 1024.0 / 1024.0,
                    self.config.max_file_size as f64 / 1024.0 / 1024.0
                )));
            }
        }

        let initial_capacity = total_len
            .map(|len| len.min(self.config.max_file_size).min(usize::MAX as u64) as usize)
            .filter(|len| *len > 0)
            .unwrap_or(BUFFER_INITIAL_CAPACITY);
        let mut buffer = Vec::with_capacity(initial_capacity);
        let mut response = response;
        let mut total: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Self::map_reqwest_error(e, url))?
        {
            total = total.saturating_add(chunk.len() as u64);
            if total > self.config.max_file_size {
                return Err(AutosizeError::ResourceLimit(
                    "下载后文件超过大小限制".to_string(),
                ));
            }
            buffer.extend_from_slice(&chunk);
        }

        log::debug!("✅ 下载完成 - {} bytes", total);

        Ok(RawImageData {
            bytes: buffer,
            source_hint: "url",
        })
    }

    /// 解析 `data:` URI 内联图片。
    pub(super) fn load_from_data_uri(&self, uri: &str) -> Result<RawImageData, AutosizeError> {
        let (header, payload) = uri
            .split_once(',')
            .ok_or_else(|| AutosizeError::InvalidFormat("data URI 缺少 ',' 分隔符".to_string()))?;

        let is_base64 = header
            .rsplit(';')
            .next()
            .is_some_and(|param| param.trim().eq_ignore_ascii_case("base64"));

        let bytes = if is_base64 {
            Self::parse_base64_with_limit(payload, self.config.max_file_size)?
        } else {
            percent_decode(payload)
        };

        if bytes.len() as u64 > self.config.max_file_size {
            return Err(AutosizeError::ResourceLimit(format!(
                "data URI 解码后体积过大：{:.2} MB（限制：{:.2} MB）",
                bytes.len() as f64 / 1024.0 / 1024.0,
                self.config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(RawImageData {
            bytes,
            source_hint: "data-uri",
        })
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, AutosizeError> {
        let len = base64_data.trim().len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| AutosizeError::ResourceLimit("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| AutosizeError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
    }

    fn parse_base64_with_limit(data: &str, max_file_size: u64) -> Result<Vec<u8>, AutosizeError> {
        let normalized = data.trim();

        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(normalized)?;
        if estimated_len > max_file_size {
            return Err(AutosizeError::ResourceLimit(format!(
                "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
                estimated_len as f64 / 1024.0 / 1024.0,
                max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        general_purpose::STANDARD
            .decode(normalized)
            .map_err(|e| AutosizeError::Decode(format!("Base64 解码失败：{}", e)))
    }

    /// 统一映射 reqwest 错误，保留完整 URL 供调用方匹配。
    fn map_reqwest_error(e: reqwest::Error, url: &str) -> AutosizeError {
        let code = if e.is_timeout() {
            "ETIMEDOUT"
        } else if e.is_connect() {
            "ECONNREFUSED"
        } else {
            "EIO"
        };

        AutosizeError::SourceRead {
            code,
            location: url.to_string(),
            reason: format!("请求失败：{}", e),
        }
    }

    /// 常见 HTTP 状态码文案。
    fn status_message(code: u16) -> &'static str {
        match code {
            404 => "未找到",
            403 => "访问被拒绝",
            500..=599 => "服务器错误",
            _ => "请求失败",
        }
    }

    /// 日志中去掉 query 与 fragment，避免泄露令牌。
    pub(crate) fn redact_url_for_log(url: &str) -> String {
        match reqwest::Url::parse(url) {
            Ok(mut parsed) => {
                parsed.set_query(None);
                parsed.set_fragment(None);
                parsed.to_string()
            }
            Err(_) => url
                .split(['?', '#'])
                .next()
                .unwrap_or(url)
                .to_string(),
        }
    }
}

/// 解码 `%XX` 序列；非法序列按原样保留。
fn percent_decode(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let (hi, lo) = (bytes[i + 1], bytes[i + 2]);
            if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() {
                let hex = [hi, lo];
                if let Some(byte) = std::str::from_utf8(&hex)
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autosize::AutosizeConfig;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn autosizer() -> ImageAutosizer {
        ImageAutosizer::new(AutosizeConfig::default()).expect("autosizer init failed")
    }

    #[tokio::test]
    async fn load_from_file_reports_enoent_with_path() {
        let result = autosizer()
            .load_from_file(Path::new("test/img/notExists.jpg"))
            .await;

        let message = match result {
            Err(err @ AutosizeError::SourceRead { code: "ENOENT", .. }) => err.to_string(),
            other => panic!("expected ENOENT, got {:?}", other.map(|raw| raw.bytes.len())),
        };
        assert!(message.contains("notExists.jpg"));
    }

    #[tokio::test]
    async fn load_from_file_rejects_oversized_file() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![0u8; 64]).expect("write failed");

        let mut config = AutosizeConfig::default();
        config.max_file_size = 16;
        let autosizer = ImageAutosizer::new(config).expect("autosizer init failed");

        assert!(matches!(
            autosizer.load_from_file(&path).await,
            Err(AutosizeError::ResourceLimit(_))
        ));
    }

    #[test]
    fn data_uri_base64_and_percent_payloads() {
        let autosizer = autosizer();

        let raw = autosizer
            .load_from_data_uri("data:text/plain;base64,SGVsbG8=")
            .expect("base64 payload should decode");
        assert_eq!(raw.bytes, b"Hello");

        let raw = autosizer
            .load_from_data_uri("data:image/svg+xml,%3Csvg%3E")
            .expect("percent payload should decode");
        assert_eq!(raw.bytes, b"<svg>");
    }

    #[test]
    fn data_uri_without_comma_is_invalid() {
        assert!(matches!(
            autosizer().load_from_data_uri("data:image/png;base64"),
            Err(AutosizeError::InvalidFormat(_))
        ));
    }

    #[test]
    fn parse_base64_with_limit_rejects_large_payload_before_decode() {
        let huge = "A".repeat(1024 * 1024);
        let result = ImageAutosizer::parse_base64_with_limit(&huge, 32);

        assert!(matches!(result, Err(AutosizeError::ResourceLimit(_))));
    }

    #[test]
    fn percent_decode_keeps_malformed_sequences() {
        assert_eq!(percent_decode("a%2"), b"a%2");
        assert_eq!(percent_decode("%zz%41"), b"%zzA");
    }

    #[test]
    fn redact_url_for_log_removes_query_and_fragment() {
        let redacted = ImageAutosizer::redact_url_for_log(
            "https://example.com:8443/path/img.png?token=abc123#hash",
        );

        assert_eq!(redacted, "https://example.com:8443/path/img.png");
    }

    #[tokio::test]
    async fn load_from_url_reports_http_status_with_url() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
        let addr = listener.local_addr().expect("read local addr failed");

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept failed");

            let mut req_buf = [0u8; 1024];
            let _ = stream.read(&mut req_buf);

            stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .expect("write response failed");
            stream.flush().expect("flush failed");
        });

        let url = format!("http://127.0.0.1:{}/missing.png", addr.port());
        let result = autosizer().load_from_url(&url).await;

        server.join().expect("server thread failed");

        match result {
            Err(err @ AutosizeError::SourceRead { code: "EHTTP", .. }) => {
                assert!(err.to_string().contains(&url));
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("404 must fail"),
        }
    }

    #[tokio::test]
    async fn load_from_url_rejects_oversized_content_length() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
        let addr = listener.local_addr().expect("read local addr failed");

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept failed");

            let mut req_buf = [0u8; 1024];
            let _ = stream.read(&mut req_buf);

            let body = [0u8; 64];
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream
                .write_all(response.as_bytes())
                .expect("write headers failed");
            let _ = stream.write_all(&body);
            let _ = stream.flush();
        });

        let mut config = AutosizeConfig::default();
        config.max_file_size = 16;
        let autosizer = ImageAutosizer::new(config).expect("autosizer init failed");

        let url = format!("http://127.0.0.1:{}/big.png", addr.port());
        let result = autosizer.load_from_url(&url).await;

        server.join().expect("server thread failed");

        assert!(matches!(result, Err(AutosizeError::ResourceLimit(_))));
    }
}
