use std::time::Duration;

use reqwest::{Client, StatusCode};
use rss::Channel;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = "RssAggregator/1.0 (Feed Scraper)";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),
    #[error("malformed feed document: {0}")]
    Parse(#[from] rss::Error),
}

/// One `<item>` as it appears in the document. Every field is optional there.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub pub_date: Option<String>,
}

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    /// Fetch `url` and parse it as an RSS channel, keeping document order.
    pub async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>, FetchError> {
        debug!(url, "fetching feed");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response.bytes().await?;
        Self::parse(&bytes)
    }

    pub fn parse(document: &[u8]) -> Result<Vec<FeedItem>, FetchError> {
        let channel = Channel::read_from(document)?;

        Ok(channel
            .items()
            .iter()
            .map(|item| FeedItem {
                title: item.title().map(str::to_string),
                link: item.link().map(str::to_string),
                description: item.description().map(str::to_string),
                pub_date: item.pub_date().map(str::to_string),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0">
            <channel>
                <title>Tech News</title>
                <link>https://technews.example.com</link>
                <description>Latest tech news</description>
                <item>
                    <title>Breaking: New Technology Announced</title>
                    <link>https://technews.example.com/article/1</link>
                    <description>Something happened</description>
                    <pubDate>Mon, 09 Dec 2024 12:00:00 +0000</pubDate>
                </item>
                <item>
                    <title>Review: Latest Gadget</title>
                    <link>https://technews.example.com/article/2</link>
                </item>
            </channel>
        </rss>
    "#;

    fn test_fetcher() -> Fetcher {
        Fetcher::new(Duration::from_secs(5)).unwrap()
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parse_items_in_document_order() {
            let items = Fetcher::parse(SAMPLE_RSS.as_bytes()).unwrap();

            assert_eq!(items.len(), 2);
            assert_eq!(
                items[0].title.as_deref(),
                Some("Breaking: New Technology Announced")
            );
            assert_eq!(
                items[1].link.as_deref(),
                Some("https://technews.example.com/article/2")
            );
        }

        #[test]
        fn test_parse_keeps_raw_pub_date() {
            let items = Fetcher::parse(SAMPLE_RSS.as_bytes()).unwrap();
            assert_eq!(
                items[0].pub_date.as_deref(),
                Some("Mon, 09 Dec 2024 12:00:00 +0000")
            );
        }

        #[test]
        fn test_parse_missing_fields_are_none() {
            let items = Fetcher::parse(SAMPLE_RSS.as_bytes()).unwrap();
            assert!(items[1].description.is_none());
            assert!(items[1].pub_date.is_none());
        }

        #[test]
        fn test_parse_empty_channel() {
            let xml = r#"<rss version="2.0"><channel><title>Empty</title><link>x</link><description>y</description></channel></rss>"#;
            let items = Fetcher::parse(xml.as_bytes()).unwrap();
            assert!(items.is_empty());
        }

        #[test]
        fn test_parse_not_xml() {
            let result = Fetcher::parse(b"this is not a feed");
            assert!(matches!(result, Err(FetchError::Parse(_))));
        }

        #[test]
        fn test_parse_invalid_utf8() {
            let invalid_bytes = vec![0xFF, 0xFE, 0x00, 0x01];
            assert!(Fetcher::parse(&invalid_bytes).is_err());
        }
    }

    mod fetch_tests {
        use super::*;

        #[tokio::test]
        async fn test_fetch_success() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/feed.xml"))
                .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_RSS))
                .mount(&server)
                .await;

            let items = test_fetcher()
                .fetch(&format!("{}/feed.xml", server.uri()))
                .await
                .unwrap();
            assert_eq!(items.len(), 2);
        }

        #[tokio::test]
        async fn test_fetch_non_success_status() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/feed.xml"))
                .respond_with(ResponseTemplate::new(503))
                .mount(&server)
                .await;

            let result = test_fetcher()
                .fetch(&format!("{}/feed.xml", server.uri()))
                .await;
            assert!(matches!(
                result,
                Err(FetchError::Status(StatusCode::SERVICE_UNAVAILABLE))
            ));
        }

        #[tokio::test]
        async fn test_fetch_malformed_body() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/feed.xml"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
                .mount(&server)
                .await;

            let result = test_fetcher()
                .fetch(&format!("{}/feed.xml", server.uri()))
                .await;
            assert!(matches!(result, Err(FetchError::Parse(_))));
        }

        #[tokio::test]
        async fn test_fetch_connection_refused() {
            let result = test_fetcher().fetch("http://127.0.0.1:1/feed.xml").await;
            assert!(matches!(result, Err(FetchError::Request(_))));
        }
    }
}
