use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::qa_client::NewsItem;

static ANCHOR_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<a\s").expect("anchor pattern"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[^>]+>").expect("tag pattern"));

/// Force every anchor in remote markup to open in a new tab without a
/// referrer. The href and everything else inside the tag are untouched.
pub fn rewrite_anchor_targets(html: &str) -> String {
    ANCHOR_OPEN
        .replace_all(html, r#"<a target="_blank" rel="noopener noreferrer" "#)
        .into_owned()
}

/// Render one structured news item as an HTML card.
pub fn news_card(item: &NewsItem) -> String {
    let mut card = String::from("<div>");
    card.push_str(&format!("<h3>{}</h3>", item.title));
    if !item.content.is_empty() {
        card.push_str(&format!("<p>{}</p>", item.content));
    }
    card.push_str(&format!(
        r#"<a href="{}" target="_blank" rel="noopener noreferrer">اقرأ المزيد</a>"#,
        item.link
    ));
    if let Some(search_url) = &item.search_url {
        card.push_str(&format!(
            r#" <a href="{}" target="_blank" rel="noopener noreferrer">المزيد من النتائج</a>"#,
            search_url
        ));
    }
    if let Some(image_url) = &item.image_url {
        card.push_str(&format!(
            r#"<br><img src="{}" alt="Image" style="width: 100%; height: auto; margin-top: 10px;">"#,
            image_url
        ));
    }
    if let Some(date) = &item.date {
        card.push_str(&format!("<p>{}</p>", format_news_date(date)));
    }
    card.push_str("</div>");
    card
}

// The backend is inconsistent about date formats; normalize the ones that
// parse and pass the rest through.
fn format_news_date(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d").to_string();
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%d/%m/%Y") {
        return d.format("%Y-%m-%d").to_string();
    }
    raw.to_string()
}

/// What the renderer does with markup coming back from the service. The
/// service's HTML is untrusted; callers pick a policy up front rather than
/// the log deciding implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SanitizePolicy {
    /// Print remote markup verbatim.
    #[default]
    Raw,
    /// Remove tags and print only the text content.
    StripTags,
}

impl SanitizePolicy {
    pub fn apply(self, text: &str) -> String {
        match self {
            SanitizePolicy::Raw => text.to_string(),
            SanitizePolicy::StripTags => strip_tags(text),
        }
    }
}

pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
