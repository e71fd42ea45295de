//! Plain HTTP page fetcher with an HTML-to-text extractor.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use scraper::{ElementRef, Html, Selector};

use crate::capability::{FetchedPage, PREVIEW_LIMIT, PageFetcher, truncate_preview};
use crate::error::CapabilityError;

const BROWSER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";
const PARAGRAPH_LIMIT: usize = 5;
const CONTAINERS: [&str; 3] = ["article", "main", "[role='main']"];
const SKIPPED: [&str; 5] = ["script", "style", "noscript", "aside", "nav"];

pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, CapabilityError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CapabilityError::Status {
                status: status.as_u16(),
                body: String::new(),
            });
        }

        let html = response.text().await?;
        let page = extract_page(&html);
        if page.content.is_empty() {
            return Err(CapabilityError::Malformed(format!("no readable text at {url}")));
        }
        Ok(page)
    }
}

/// Pull title, body preview and publish date out of an HTML document.
pub fn extract_page(html: &str) -> FetchedPage {
    let document = Html::parse_document(html);

    let title = ["title", "h1"]
        .into_iter()
        .filter_map(|css| first(&document, css))
        .map(readable_text)
        .find(|title| !title.is_empty())
        .unwrap_or_else(|| "Unknown Title".to_string());

    let body = CONTAINERS
        .into_iter()
        .filter_map(|css| first(&document, css))
        .map(readable_text)
        .find(|text| !text.is_empty())
        .unwrap_or_else(|| paragraphs(&document));

    let publish_date = first(&document, "meta[property='article:published_time']")
        .and_then(|meta| meta.value().attr("content"))
        .map(|date| date.trim().to_string())
        .filter(|date| !date.is_empty());

    FetchedPage {
        title,
        content: truncate_preview(&body, PREVIEW_LIMIT),
        publish_date,
    }
}

fn first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

fn paragraphs(document: &Html) -> String {
    let Ok(selector) = Selector::parse("p") else {
        return String::new();
    };
    document
        .select(&selector)
        .take(PARAGRAPH_LIMIT)
        .map(readable_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Visible text under `element` with whitespace collapsed. Scripts, styles and
/// side content are left out.
fn readable_text(element: ElementRef<'_>) -> String {
    let mut fragments = Vec::new();
    collect_text(element, &mut fragments);
    fragments
        .iter()
        .flat_map(|fragment| fragment.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

fn collect_text<'a>(element: ElementRef<'a>, fragments: &mut Vec<&'a str>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            fragments.push(&**text);
        } else if let Some(child) = ElementRef::wrap(child) {
            if !SKIPPED.contains(&child.value().name()) {
                collect_text(child, fragments);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_article_container() {
        let html = r#"
            <html><head><title>Grid &amp; Storage</title>
            <meta property="article:published_time" content="2024-03-02T10:00:00Z">
            <script>var x = "<p>ignored</p>";</script></head>
            <body><nav><p>Menu</p></nav>
            <article><h2>Lead</h2><p>Battery   prices fell.</p></article></body></html>
        "#;
        let page = extract_page(html);
        assert_eq!(page.title, "Grid & Storage");
        assert_eq!(page.content, "Lead Battery prices fell.");
        assert_eq!(page.publish_date.as_deref(), Some("2024-03-02T10:00:00Z"));
    }

    #[test]
    fn falls_back_to_heading_and_paragraphs() {
        let html = "<h1>Headline</h1><pre>code</pre><p>One.</p><p class=\"x\">Two.</p>";
        let page = extract_page(html);
        assert_eq!(page.title, "Headline");
        assert_eq!(page.content, "One. Two.");
        assert_eq!(page.publish_date, None);
    }

    #[test]
    fn decodes_entities_and_keeps_body_after_nested_articles() {
        let html = "<title>Rock&#8217;s &mdash; Roll</title>\
            <article><p>AT&#38;T&rsquo;s deal</p>\
            <aside><article>Related</article></aside>\
            <p>Main body continues here.</p></article>";
        let page = extract_page(html);
        assert_eq!(page.title, "Rock\u{2019}s \u{2014} Roll");
        assert_eq!(page.content, "AT&T\u{2019}s deal Main body continues here.");
    }

    #[test]
    fn main_region_used_without_article() {
        let html = "<nav>Home | World</nav><main><h1>Markets</h1><p>Stocks &amp; bonds rallied.</p></main>";
        let page = extract_page(html);
        assert_eq!(page.title, "Markets");
        assert_eq!(page.content, "Markets Stocks & bonds rallied.");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let html = format!("<article>{}</article>", "a".repeat(1500));
        let page = extract_page(&html);
        assert_eq!(page.content.chars().count(), PREVIEW_LIMIT + 3);
        assert!(page.content.ends_with("..."));
        assert_eq!(page.title, "Unknown Title");
    }

    #[tokio::test]
    async fn fetch_reads_remote_page() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/story")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<title>Story</title><p>Body text.</p>")
            .create_async()
            .await;

        let page = HttpPageFetcher::new()
            .fetch(&format!("{}/story", server.url()))
            .await
            .unwrap();
        assert_eq!(page.title, "Story");
        assert_eq!(page.content, "Body text.");
    }
}
