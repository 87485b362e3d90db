use crate::error::{AdError, Result};
use crate::models::{Ad, AdContent, TrackingEvent, Vast, VideoClicks, Wrapper};
use crate::parser;
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

/// Default bound on how many wrapper hops to follow before giving up
pub const DEFAULT_MAX_WRAPPER_DEPTH: usize = 5;

/// Retrieves VAST documents during wrapper resolution.
///
/// Resolution only needs "URL in, XML text out", so the transport is a trait:
/// production uses [`HttpFetcher`], tests use an in-memory map.
#[async_trait]
pub trait VastFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Fetches VAST documents over HTTP with a bounded timeout. Also accepts
/// `file://` URLs and plain paths so the CLI can work against local samples.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(3))
            .build()
            .map_err(|e| AdError::HttpError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn fetch_url(&self, url: &str) -> Result<String> {
        // Random request ID for correlating log lines
        let req_id: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect();

        let url = url::Url::parse(url)?;

        log::debug!("[{req_id}] Fetching VAST from {url}");
        let start_time = std::time::Instant::now();

        let response = self.client.get(url).send().await.map_err(|e| {
            log::warn!("[{req_id}] Request failed after {:?}", start_time.elapsed());
            AdError::HttpError(format!("Failed to fetch URL: {e}"))
        })?;

        if !response.status().is_success() {
            return Err(AdError::HttpError(format!(
                "Failed to fetch URL: HTTP status {}",
                response.status()
            )));
        }

        let xml = response
            .text()
            .await
            .map_err(|e| AdError::HttpError(format!("Failed to read response body: {e}")))?;

        log::debug!("[{req_id}] Fetched {} bytes in {:?}", xml.len(), start_time.elapsed());

        Ok(xml)
    }
}

#[async_trait]
impl VastFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(tokio::fs::read_to_string(path).await?);
        }
        if std::path::Path::new(url).exists() {
            return Ok(tokio::fs::read_to_string(url).await?);
        }
        self.fetch_url(url).await
    }
}

/// Resolve every wrapper ad in `vast` into the inline ads it points at.
///
/// Wrappers are replaced in place, so ads survive in document order. A
/// wrapper chain deeper than `max_depth` is truncated silently, a repeated
/// tag URI breaks the cycle, and a fetch or parse failure drops only that
/// branch. The call itself never fails; it degrades to fewer resolved ads.
///
/// Each resolved inline ad inherits the impression URLs, error URL and
/// linear trackers of the wrappers above it, so wrapper-level tracking
/// fires no matter where in the chain the playable ad came from.
pub async fn resolve_wrappers(vast: Vast, fetcher: &dyn VastFetcher, max_depth: usize) -> Vast {
    let mut visited = HashSet::new();
    let ads = resolve_ads(vast.ads, fetcher, max_depth, &mut visited).await;
    Vast {
        version: vast.version,
        ads,
    }
}

/// Recursive step. Boxed because async recursion needs a nameable future.
fn resolve_ads<'a>(
    ads: Vec<Ad>,
    fetcher: &'a dyn VastFetcher,
    depth: usize,
    visited: &'a mut HashSet<String>,
) -> Pin<Box<dyn Future<Output = Vec<Ad>> + Send + 'a>> {
    Box::pin(async move {
        let mut resolved = Vec::new();

        for ad in ads {
            let wrapper = match ad.content {
                Some(AdContent::Wrapper(ref wrapper)) => wrapper.clone(),
                _ => {
                    // Inline and empty ads pass through unchanged
                    resolved.push(ad);
                    continue;
                }
            };

            if depth == 0 {
                log::warn!(
                    "Maximum wrapper depth exceeded, dropping wrapper: {}",
                    wrapper.vast_ad_tag_uri
                );
                continue;
            }

            if !visited.insert(wrapper.vast_ad_tag_uri.clone()) {
                log::warn!(
                    "Cycle detected in wrapper chain, skipping: {}",
                    wrapper.vast_ad_tag_uri
                );
                continue;
            }

            let xml = match fetcher.fetch(&wrapper.vast_ad_tag_uri).await {
                Ok(xml) => xml,
                Err(e) => {
                    log::warn!("Failed to fetch wrapped VAST {}: {e}", wrapper.vast_ad_tag_uri);
                    continue;
                }
            };

            let Some(next) = parser::parse(&xml) else {
                // parse() already logged the reason
                continue;
            };

            let mut inner = resolve_ads(next.ads, fetcher, depth - 1, visited).await;
            for inner_ad in &mut inner {
                merge_wrapper_tracking(&wrapper, inner_ad);
            }
            resolved.append(&mut inner);
        }

        resolved
    })
}

/// Fold a wrapper's trackers into an inline ad resolved from it.
fn merge_wrapper_tracking(wrapper: &Wrapper, ad: &mut Ad) {
    let Some(AdContent::InLine(inline)) = &mut ad.content else {
        return;
    };

    inline.impressions.extend(wrapper.impressions.iter().cloned());

    if inline.error.is_none() {
        inline.error = wrapper.error.clone();
    }

    // Wrapper-level linear trackers apply to every inline linear creative
    let mut tracking_events: Vec<TrackingEvent> = Vec::new();
    let mut click_tracking: Vec<String> = Vec::new();
    for creative in &wrapper.creatives {
        if let Some(linear) = &creative.linear {
            tracking_events.extend(linear.tracking_events.iter().cloned());
            if let Some(clicks) = &linear.video_clicks {
                click_tracking.extend(clicks.click_tracking.iter().cloned());
            }
        }
    }

    if tracking_events.is_empty() && click_tracking.is_empty() {
        return;
    }

    for creative in &mut inline.creatives {
        if let Some(linear) = &mut creative.linear {
            linear.tracking_events.extend(tracking_events.iter().cloned());
            if !click_tracking.is_empty() {
                linear
                    .video_clicks
                    .get_or_insert_with(VideoClicks::default)
                    .click_tracking
                    .extend(click_tracking.iter().cloned());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapFetcher {
        docs: HashMap<String, String>,
    }

    #[async_trait]
    impl VastFetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.docs
                .get(url)
                .cloned()
                .ok_or_else(|| AdError::HttpError(format!("no document at {url}")))
        }
    }

    fn wrapper_doc(next_url: &str) -> String {
        format!(
            r#"<VAST version="2.0">
              <Ad id="w">
                <Wrapper>
                  <AdSystem>Upstream</AdSystem>
                  <VASTAdTagURI><![CDATA[{next_url}]]></VASTAdTagURI>
                  <Impression><![CDATA[https://ads.example.com/wrap-imp?{next_url}]]></Impression>
                  <Creatives>
                    <Creative>
                      <Linear>
                        <TrackingEvents>
                          <Tracking event="start"><![CDATA[https://ads.example.com/wrap-start]]></Tracking>
                        </TrackingEvents>
                      </Linear>
                    </Creative>
                  </Creatives>
                </Wrapper>
              </Ad>
            </VAST>"#
        )
    }

    fn inline_doc() -> String {
        r#"<VAST version="2.0">
          <Ad id="final">
            <InLine>
              <AdSystem>RadioAds</AdSystem>
              <AdTitle>Spot</AdTitle>
              <Impression><![CDATA[https://ads.example.com/imp]]></Impression>
              <Creatives>
                <Creative>
                  <Linear>
                    <Duration>00:00:30</Duration>
                  </Linear>
                </Creative>
              </Creatives>
            </InLine>
          </Ad>
        </VAST>"#
            .to_string()
    }

    /// A chain of `hops` wrapper documents ending in an inline ad. Returns
    /// the root document and the fetcher serving the rest of the chain.
    fn wrapper_chain(hops: usize) -> (String, MapFetcher) {
        let mut docs = HashMap::new();
        for i in 1..hops {
            let next = if i + 1 < hops {
                format!("https://chain.example.com/{}", i + 1)
            } else {
                "https://chain.example.com/final".to_string()
            };
            docs.insert(format!("https://chain.example.com/{i}"), wrapper_doc(&next));
        }
        docs.insert("https://chain.example.com/final".to_string(), inline_doc());

        let root = if hops > 1 {
            wrapper_doc("https://chain.example.com/1")
        } else {
            wrapper_doc("https://chain.example.com/final")
        };
        (root, MapFetcher { docs })
    }

    #[tokio::test]
    async fn resolves_single_wrapper() {
        let (root, fetcher) = wrapper_chain(1);
        let vast = parser::parse(&root).unwrap();
        let resolved = resolve_wrappers(vast, &fetcher, DEFAULT_MAX_WRAPPER_DEPTH).await;

        assert_eq!(resolved.ads.len(), 1);
        let inline = resolved.ads[0].inline().unwrap();
        assert_eq!(inline.ad_title, "Spot");
        // Inline impression plus the wrapper's own
        assert_eq!(inline.impressions.len(), 2);
        // Wrapper tracker merged into the inline linear
        let linear = inline.creatives[0].linear.as_ref().unwrap();
        assert!(linear.tracking_events.iter().any(|t| t.event == "start"));
    }

    #[tokio::test]
    async fn depth_bound_truncates_long_chains() {
        let (root5, fetcher5) = wrapper_chain(5);
        let vast5 = parser::parse(&root5).unwrap();
        let resolved5 = resolve_wrappers(vast5, &fetcher5, 5).await;
        assert_eq!(resolved5.ads.len(), 1);

        let (root6, fetcher6) = wrapper_chain(6);
        let vast6 = parser::parse(&root6).unwrap();
        let resolved6 = resolve_wrappers(vast6, &fetcher6, 5).await;
        assert!(resolved6.ads.len() < resolved5.ads.len());
        assert!(resolved6.ads.is_empty());
    }

    #[tokio::test]
    async fn self_referential_wrapper_terminates() {
        let url = "https://loop.example.com/a";
        let doc = wrapper_doc(url);
        let mut docs = HashMap::new();
        docs.insert(url.to_string(), doc.clone());
        let fetcher = MapFetcher { docs };

        let vast = parser::parse(&doc).unwrap();
        let resolved = resolve_wrappers(vast, &fetcher, DEFAULT_MAX_WRAPPER_DEPTH).await;
        assert!(resolved.ads.is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_drops_only_that_branch() {
        let xml = format!(
            r#"<VAST version="2.0">
              <Ad id="w">
                <Wrapper>
                  <AdSystem>Upstream</AdSystem>
                  <VASTAdTagURI><![CDATA[https://gone.example.com/missing]]></VASTAdTagURI>
                </Wrapper>
              </Ad>
              {}
            </VAST>"#,
            // Sibling inline ad lifted from the inline fixture
            inline_doc()
                .lines()
                .skip(1)
                .take_while(|l| !l.contains("</VAST>"))
                .collect::<Vec<_>>()
                .join("\n")
        );

        let fetcher = MapFetcher { docs: HashMap::new() };
        let vast = parser::parse(&xml).unwrap();
        let resolved = resolve_wrappers(vast, &fetcher, DEFAULT_MAX_WRAPPER_DEPTH).await;

        assert_eq!(resolved.ads.len(), 1);
        assert_eq!(resolved.ads[0].id.as_deref(), Some("final"));
    }

    #[tokio::test]
    async fn unparseable_wrapped_document_is_dropped() {
        let url = "https://bad.example.com/garbage";
        let mut docs = HashMap::new();
        docs.insert(url.to_string(), "<not-xml>".to_string());
        let fetcher = MapFetcher { docs };

        let vast = parser::parse(&wrapper_doc(url)).unwrap();
        let resolved = resolve_wrappers(vast, &fetcher, DEFAULT_MAX_WRAPPER_DEPTH).await;
        assert!(resolved.ads.is_empty());
    }
}
