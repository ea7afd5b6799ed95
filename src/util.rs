// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 通用工具：HTTP 日期、目录列表页面与文件大小格式化。

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::fs::Metadata;

const IMF_FIXDATE: &str = "%a, %d %b %Y %H:%M:%S GMT";
const RFC850_DATE: &str = "%A, %d-%b-%y %H:%M:%S GMT";
const ASCTIME_DATE: &str = "%a %b %d %H:%M:%S %Y";

// 目录列表中链接需要转义的字符
const HREF_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// 格式化为 IMF-fixdate，例如 `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn format_http_date(date: &DateTime<Utc>) -> String {
    date.format(IMF_FIXDATE).to_string()
}

/// 解析 HTTP 日期，接受 IMF-fixdate、RFC 850 与 asctime 三种格式。
pub fn parse_http_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(text, RFC850_DATE) {
        return Some(date.and_utc());
    }
    // asctime 的日期用空格补齐（"Nov  6"），先合并空白
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&collapsed, ASCTIME_DATE)
        .ok()
        .map(|date| date.and_utc())
}

pub fn format_file_size(size: u64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < units.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.1} {}", size, units[unit_index])
}

/// 目录在前、文件在后，同组内按名字排序
pub fn sort_dir_entries(entries: &mut [Metadata]) {
    entries.sort_by(|a, b| b.is_dir().cmp(&a.is_dir()).then_with(|| a.name().cmp(b.name())));
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

pub struct HtmlBuilder {
    title: String,
    css: String,
    body: String,
}

impl HtmlBuilder {
    /// 根据目录项生成列表页面，`path` 为请求的 URL 路径
    pub fn from_dir(path: &str, entries: &mut [Metadata]) -> Self {
        sort_dir_entries(entries);

        // 链接一律使用绝对路径，请求路径是否带结尾的 `/` 都能正确解析
        let trimmed = path.trim_end_matches('/');
        let base = format!("{}/", trimmed);
        let up = match trimmed.rfind('/') {
            Some(i) => &trimmed[..=i],
            None => "/",
        };
        let shown = escape_html(trimmed);
        let mut body = String::new();
        body.push_str(&format!("<h1>{}的文件列表</h1><hr>", shown));
        body.push_str("<table>");
        body.push_str(
            r#"
            <tr>
                <td>文件名</td>
                <td>大小</td>
                <td>修改时间</td>
            </tr>
            "#,
        );
        body.push_str(&format!(
            r#"
            <tr>
                <td><a href="{}">..</a></td>
                <td></td>
                <td></td>
            </tr>
            "#,
            utf8_percent_encode(up, HREF_ESCAPE)
        ));
        for entry in entries.iter() {
            let local_time: DateTime<Local> = entry.modified().into();
            let formatted_time = local_time.format("%Y-%m-%d %H:%M:%S %Z").to_string();
            let (name, size) = if entry.is_dir() {
                ([entry.name(), "/"].concat(), "文件夹".to_string())
            } else {
                (entry.name().to_string(), format_file_size(entry.len()))
            };
            body.push_str(&format!(
                r#"
                <tr>
                    <td><a href="{}">{}</a></td>
                    <td>{}</td>
                    <td>{}</td>
                </tr>
                "#,
                utf8_percent_encode(&[base.as_str(), name.as_str()].concat(), HREF_ESCAPE),
                escape_html(&name),
                size,
                formatted_time
            ));
        }
        body.push_str("</table>");

        let css = r"
            table {
                border-collapse: collapse;
                width: 100%;
            }

            td {
                padding: 8px;
                white-space: pre-wrap;
                border: none;
            }"
        .to_string();
        HtmlBuilder {
            title: format!("{}的文件列表", shown),
            css,
            body,
        }
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
            <html>
                <head>
                    <meta charset="utf-8">
                    <title>{}</title>
                    <style>{}</style>
                </head>
                <body>
                {}
                </body>
            </html>"##,
            self.title, self.css, self.body
        )
    }
}

/// 目录列表的 JSON 形式
pub fn json_listing(entries: &mut [Metadata]) -> serde_json::Value {
    sort_dir_entries(entries);
    let items: Vec<_> = entries
        .iter()
        .map(|entry| {
            let modified = DateTime::<Utc>::from(entry.modified()).to_rfc3339();
            let size = if entry.is_dir() {
                "-".to_string()
            } else {
                format_file_size(entry.len())
            };
            serde_json::json!({
                "name": entry.name(),
                "type": if entry.is_dir() { "dir" } else { "file" },
                "size": size,
                "raw_size": entry.len(),
                "date": modified
            })
        })
        .collect();
    serde_json::Value::Array(items)
}
