use async_trait::async_trait;
use log::{debug, warn};
use regex::Regex;
use serde_json::Value;
use std::convert::Infallible;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::models::destination::DestinationKey;
use crate::services::coalescer::Coalescer;
use crate::services::ttl_cache::TtlCache;

const SEARCH_RESULT_LIMIT: u32 = 5;
const THUMBNAIL_WIDTH: u32 = 800;

#[derive(Debug, Error)]
pub enum ImageLookupError {
    #[error("Image request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Image source returned status {0}")]
    Status(u16),
    #[error("Invalid image source url: {0}")]
    InvalidUrl(String),
}

/// One strategy for finding pictures of a place. Returns candidate URLs in
/// preference order; filtering happens in the resolver.
#[async_trait]
pub trait ImageSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn candidates(&self, name: &str, country: &str)
        -> Result<Vec<String>, ImageLookupError>;
}

/// Rejects URLs that look like maps, flags, crests and other non-photos.
pub fn is_probable_photo(url: &str) -> bool {
    static NOT_A_PHOTO: OnceLock<Regex> = OnceLock::new();
    let re = NOT_A_PHOTO.get_or_init(|| {
        Regex::new(
            r"(?i)(\.svg|(^|[^a-z])(maps?|locator|location|logo|flag|coat[_ -]of[_ -]arms|emblem|seal|diagram|icon|symbol|chart|blank)([^a-z]|$))",
        )
        .expect("valid regex")
    });
    !re.is_match(url)
}

/// Page summary thumbnail for the article named after the destination.
pub struct WikipediaSummarySource {
    http: reqwest::Client,
    base_url: String,
}

impl WikipediaSummarySource {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn summary_url(&self, title: &str) -> Result<Url, ImageLookupError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| ImageLookupError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ImageLookupError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["api", "rest_v1", "page", "summary", title]);
        Ok(url)
    }
}

#[async_trait]
impl ImageSource for WikipediaSummarySource {
    fn name(&self) -> &'static str {
        "wikipedia-summary"
    }

    async fn candidates(
        &self,
        name: &str,
        _country: &str,
    ) -> Result<Vec<String>, ImageLookupError> {
        let title = name.trim().replace(' ', "_");
        let response = self.http.get(self.summary_url(&title)?).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(ImageLookupError::Status(response.status().as_u16()));
        }

        let page: Value = response.json().await?;
        if page.get("type").and_then(Value::as_str) == Some("disambiguation") {
            return Ok(Vec::new());
        }

        Ok(["thumbnail", "originalimage"]
            .iter()
            .filter_map(|field| page.pointer(&format!("/{}/source", field)))
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }
}

/// Full-text search over articles, taking each hit's lead image.
pub struct WikipediaSearchSource {
    http: reqwest::Client,
    base_url: String,
}

impl WikipediaSearchSource {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageSource for WikipediaSearchSource {
    fn name(&self) -> &'static str {
        "wikipedia-search"
    }

    async fn candidates(
        &self,
        name: &str,
        country: &str,
    ) -> Result<Vec<String>, ImageLookupError> {
        let query = format!("{} {}", name.trim(), country.trim());
        let url = Url::parse_with_params(
            &format!("{}/w/api.php", self.base_url),
            &[
                ("action", "query"),
                ("format", "json"),
                ("generator", "search"),
                ("gsrsearch", query.trim()),
                ("gsrlimit", &SEARCH_RESULT_LIMIT.to_string()),
                ("prop", "pageimages"),
                ("piprop", "thumbnail"),
                ("pithumbsize", &THUMBNAIL_WIDTH.to_string()),
            ],
        )
        .map_err(|e| ImageLookupError::InvalidUrl(e.to_string()))?;

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ImageLookupError::Status(response.status().as_u16()));
        }

        let body: Value = response.json().await?;
        let Some(pages) = body.pointer("/query/pages").and_then(Value::as_object) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<(u64, String)> = pages
            .values()
            .filter_map(|page| {
                let source = page.pointer("/thumbnail/source")?.as_str()?;
                let index = page.get("index").and_then(Value::as_u64).unwrap_or(u64::MAX);
                Some((index, source.to_string()))
            })
            .collect();
        hits.sort_by_key(|(index, _)| *index);
        Ok(hits.into_iter().map(|(_, url)| url).collect())
    }
}

/// Finds a representative photo for a destination, trying each source in
/// order. Hits and misses are both cached; lookup errors count as misses.
pub struct ImageResolver {
    sources: Arc<Vec<Arc<dyn ImageSource>>>,
    cache: Arc<TtlCache<String, Option<String>>>,
    lookups: Coalescer<String, Option<String>, Infallible>,
}

impl ImageResolver {
    pub fn new(sources: Vec<Arc<dyn ImageSource>>, cache: TtlCache<String, Option<String>>) -> Self {
        Self {
            sources: Arc::new(sources),
            cache: Arc::new(cache),
            lookups: Coalescer::new(),
        }
    }

    pub fn wikipedia(http: reqwest::Client, base_url: &str, ttl: Duration) -> Self {
        Self::new(
            vec![
                Arc::new(WikipediaSummarySource::new(http.clone(), base_url)) as Arc<dyn ImageSource>,
                Arc::new(WikipediaSearchSource::new(http, base_url)),
            ],
            TtlCache::new(ttl),
        )
    }

    pub async fn resolve(&self, name: &str, country: &str) -> Option<String> {
        if name.trim().is_empty() {
            return None;
        }
        let key = DestinationKey::new(name, country).to_string();
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        // The TTL cache is the source of truth; a settled lookup left behind
        // by an abandoned caller must not outlive it.
        self.lookups.evict(&key);
        let work = self.lookup(key.clone(), name, country);
        let found = self
            .lookups
            .request(key.clone(), move || work)
            .await
            .unwrap_or(None);

        self.lookups.evict(&key);
        found
    }

    /// The shared upstream run. It writes the cache itself so the entry
    /// lands even if every caller has gone away.
    fn lookup(
        &self,
        key: String,
        name: &str,
        country: &str,
    ) -> impl Future<Output = Result<Option<String>, Infallible>> + Send + 'static {
        let sources = Arc::clone(&self.sources);
        let cache = Arc::clone(&self.cache);
        let (name, country) = (name.to_string(), country.to_string());
        async move {
            let found = first_photo(&sources, &name, &country).await;
            cache.insert(key, found.clone());
            Ok(found)
        }
    }
}

async fn first_photo(sources: &[Arc<dyn ImageSource>], name: &str, country: &str) -> Option<String> {
    for source in sources {
        match source.candidates(name, country).await {
            Ok(urls) => {
                if let Some(url) = urls.into_iter().find(|u| is_probable_photo(u)) {
                    debug!("Image for {}, {} found via {}", name, country, source.name());
                    return Some(url);
                }
            }
            Err(e) => warn!(
                "Image source {} failed for {}, {}: {}",
                source.name(),
                name,
                country,
                e
            ),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ttl_cache::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        name: &'static str,
        urls: Result<Vec<&'static str>, u16>,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(name: &'static str, urls: Result<Vec<&'static str>, u16>) -> Arc<Self> {
            Arc::new(Self {
                name,
                urls,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ImageSource for FixedSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn candidates(&self, _name: &str, _country: &str) -> Result<Vec<String>, ImageLookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.urls {
                Ok(urls) => Ok(urls.iter().map(|u| u.to_string()).collect()),
                Err(status) => Err(ImageLookupError::Status(*status)),
            }
        }
    }

    fn resolver(sources: Vec<Arc<dyn ImageSource>>) -> ImageResolver {
        ImageResolver::new(sources, TtlCache::new(Duration::from_secs(3600)))
    }

    #[test]
    fn test_is_probable_photo() {
        assert!(is_probable_photo(
            "https://upload.wikimedia.org/wikipedia/commons/a/af/Tour_Eiffel_Wikimedia_Commons.jpg"
        ));
        assert!(is_probable_photo("https://upload.wikimedia.org/Lake_Bled_from_the_Mountain.jpg"));
        assert!(!is_probable_photo(
            "https://upload.wikimedia.org/thumb/Grandes_Armes_de_Paris_Coat_of_arms.svg.png"
        ));
        assert!(!is_probable_photo("https://upload.wikimedia.org/Flag_of_France.jpg"));
        assert!(!is_probable_photo("https://upload.wikimedia.org/Paris_locator_map.png"));
        assert!(!is_probable_photo("https://upload.wikimedia.org/Portugal_Porto_location_map.jpg"));
    }

    #[tokio::test]
    async fn test_rejected_candidates_fall_through_to_search() {
        let summary = FixedSource::new(
            "summary",
            Ok(vec!["https://upload.wikimedia.org/Blason_Paris_Coat_of_arms.jpg"]),
        );
        let search = FixedSource::new("search", Ok(vec![]));
        let resolver = resolver(vec![summary.clone() as Arc<dyn ImageSource>, search.clone()]);

        assert_eq!(resolver.resolve("Paris", "France").await, None);
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);

        // the miss is cached
        assert_eq!(resolver.resolve("paris", "FRANCE").await, None);
        assert_eq!(summary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_source_errors_degrade_to_next_source() {
        let broken = FixedSource::new("broken", Err(503));
        let search = FixedSource::new(
            "search",
            Ok(vec![
                "https://upload.wikimedia.org/Porto_map.png",
                "https://upload.wikimedia.org/Ribeira_Porto.jpg",
            ]),
        );
        let resolver = resolver(vec![broken as Arc<dyn ImageSource>, search]);

        assert_eq!(
            resolver.resolve("Porto", "Portugal").await.as_deref(),
            Some("https://upload.wikimedia.org/Ribeira_Porto.jpg")
        );
    }

    #[tokio::test]
    async fn test_abandoned_lookup_still_expires() {
        let source = FixedSource::new("summary", Ok(vec!["https://upload.wikimedia.org/Bled.jpg"]));
        let clock = Arc::new(ManualClock::new());
        let resolver = ImageResolver::new(
            vec![source.clone() as Arc<dyn ImageSource>],
            TtlCache::with_clock(Duration::from_secs(3600), clock.clone()),
        );
        let key = DestinationKey::new("Bled", "Slovenia").to_string();

        // run the shared lookup without the caller's follow-up, as when the
        // request is dropped right after the lookup settles
        let work = resolver.lookup(key.clone(), "Bled", "Slovenia");
        resolver.lookups.request(key.clone(), move || work).await.unwrap();
        assert!(resolver.lookups.get(&key).is_some());
        assert!(resolver.resolve("Bled", "Slovenia").await.is_some());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(7200));
        assert!(resolver.resolve("Bled", "Slovenia").await.is_some());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_hits_are_cached() {
        let source = FixedSource::new("summary", Ok(vec!["https://upload.wikimedia.org/Bled.jpg"]));
        let resolver = resolver(vec![source.clone() as Arc<dyn ImageSource>]);

        let first = resolver.resolve("Bled", "Slovenia").await;
        let second = resolver.resolve("Bled", "Slovenia").await;
        assert_eq!(first, second);
        assert!(first.is_some());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
