use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{SecondsFormat, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::{LiveFetchError, PulseError};
use crate::models::{EntitySets, Provenance};
use crate::period::{self, Period, Window};
use crate::snapshot::SnapshotCache;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const TRIGGER_TIMEOUT: Duration = Duration::from_secs(5);
const RESULT_CACHE_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub window: Window,
    pub sets: EntitySets,
    pub provenance: Provenance,
}

struct CacheEntry {
    outcome: FetchOutcome,
    expires_at: Instant,
}

/// Fetches entity sets for a reporting period: live query first, snapshot
/// fallback second, with a short-lived per-period result cache so repeated
/// renders within one session do not refetch.
pub struct PeriodDataFetcher {
    client: reqwest::Client,
    config: Config,
    snapshot: SnapshotCache,
    cache_ttl: Duration,
    cache: RwLock<HashMap<Period, CacheEntry>>,
}

impl PeriodDataFetcher {
    pub fn new(config: Config) -> Result<Self, PulseError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|err| PulseError::Configuration(err.to_string()))?;
        let snapshot = SnapshotCache::new(config.snapshot_path.clone());

        Ok(Self {
            client,
            config,
            snapshot,
            cache_ttl: RESULT_CACHE_TTL,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub async fn fetch(&self, period: Period) -> Result<FetchOutcome, PulseError> {
        if let Some(hit) = self.cached(period).await {
            debug!(%period, provenance = %hit.provenance, "serving period from result cache");
            return Ok(hit);
        }

        let window = period::resolve(period, Utc::now());
        let outcome = match self.fetch_live(period, &window).await {
            Ok(sets) => {
                debug!(%period, leads = sets.leads.len(), deals = sets.deals.len(), "live fetch ok");
                FetchOutcome {
                    window,
                    sets,
                    provenance: Provenance::Live,
                }
            }
            Err(live) => {
                warn!(%period, error = %live, "live fetch failed, falling back to snapshot");
                match self.snapshot.load()? {
                    Some(sets) => FetchOutcome {
                        window,
                        sets,
                        provenance: Provenance::Cached,
                    },
                    None => return Err(PulseError::SnapshotUnavailable { live }),
                }
            }
        };

        self.store(period, outcome.clone()).await;
        Ok(outcome)
    }

    async fn fetch_live(
        &self,
        period: Period,
        window: &Window,
    ) -> Result<EntitySets, LiveFetchError> {
        let url = format!(
            "{}/api/dashboard/data",
            self.config.api_base.trim_end_matches('/')
        );
        let start_utc = window
            .start
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();
        let end_utc = window
            .end
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.config.service_key)
            .query(&[
                ("range_label", period.label()),
                ("start_utc", start_utc.as_str()),
                ("end_utc", end_utc.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LiveFetchError::Status(status.as_u16()));
        }

        response
            .json::<EntitySets>()
            .await
            .map_err(LiveFetchError::from)
    }

    async fn cached(&self, period: Period) -> Option<FetchOutcome> {
        let cache = self.cache.read().await;
        cache.get(&period).and_then(|entry| {
            if entry.expires_at > Instant::now() {
                Some(entry.outcome.clone())
            } else {
                None
            }
        })
    }

    async fn store(&self, period: Period, outcome: FetchOutcome) {
        let mut cache = self.cache.write().await;
        cache.insert(
            period,
            CacheEntry {
                outcome,
                expires_at: Instant::now() + self.cache_ttl,
            },
        );
    }

    /// Force-refresh hook: drops every cached period result regardless of
    /// expiry.
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    /// Best-effort signal to the external AI pipeline. The response is
    /// ignored and failures are swallowed; rendering never depends on it.
    pub async fn trigger_refresh(&self) {
        let url = format!(
            "{}/api/ai/trigger",
            self.config.api_base.trim_end_matches('/')
        );
        match self
            .client
            .post(&url)
            .timeout(TRIGGER_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => debug!(status = %response.status(), "refresh trigger sent"),
            Err(err) => warn!(error = %err, "refresh trigger unreachable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    // Nothing listens on this port, so live fetches fail fast with a
    // transport error.
    const DEAD_API: &str = "http://127.0.0.1:9";

    fn config(api_base: &str, snapshot_path: PathBuf) -> Config {
        Config {
            supabase_url: "https://example.supabase.co".to_string(),
            service_key: "service-key".to_string(),
            api_base: api_base.to_string(),
            snapshot_path,
        }
    }

    fn write_empty_snapshot(path: &Path) {
        std::fs::write(
            path,
            r#"{"leads": [], "deals": [], "metrics": [], "ai_table": []}"#,
        )
        .unwrap();
    }

    #[tokio::test]
    async fn live_failure_falls_back_to_snapshot_with_cached_provenance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_snapshot.json");
        write_empty_snapshot(&path);

        let fetcher = PeriodDataFetcher::new(config(DEAD_API, path)).unwrap();
        let outcome = fetcher.fetch(Period::Today).await.unwrap();

        assert_eq!(outcome.provenance, Provenance::Cached);
        assert!(outcome.sets.leads.is_empty());
        assert!(outcome.sets.deals.is_empty());
    }

    #[tokio::test]
    async fn missing_snapshot_surfaces_a_distinct_no_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_snapshot.json");

        let fetcher = PeriodDataFetcher::new(config(DEAD_API, path)).unwrap();
        let err = fetcher.fetch(Period::Today).await.unwrap_err();

        assert!(matches!(err, PulseError::SnapshotUnavailable { .. }));
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_not_treated_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_snapshot.json");
        std::fs::write(&path, "{broken").unwrap();

        let fetcher = PeriodDataFetcher::new(config(DEAD_API, path)).unwrap();
        let err = fetcher.fetch(Period::Today).await.unwrap_err();

        assert!(matches!(err, PulseError::SnapshotParse(_)));
    }

    #[tokio::test]
    async fn result_cache_serves_repeat_requests_until_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_snapshot.json");
        write_empty_snapshot(&path);

        let fetcher = PeriodDataFetcher::new(config(DEAD_API, path.clone())).unwrap();
        fetcher.fetch(Period::ThisMonth).await.unwrap();

        // With the snapshot gone, only the result cache can answer.
        std::fs::remove_file(&path).unwrap();
        let outcome = fetcher.fetch(Period::ThisMonth).await.unwrap();
        assert_eq!(outcome.provenance, Provenance::Cached);

        fetcher.clear_cache().await;
        let err = fetcher.fetch(Period::ThisMonth).await.unwrap_err();
        assert!(matches!(err, PulseError::SnapshotUnavailable { .. }));
    }

    #[tokio::test]
    async fn expired_entries_are_not_served() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_snapshot.json");
        write_empty_snapshot(&path);

        let fetcher = PeriodDataFetcher::new(config(DEAD_API, path.clone()))
            .unwrap()
            .with_cache_ttl(Duration::ZERO);
        fetcher.fetch(Period::Yesterday).await.unwrap();

        std::fs::remove_file(&path).unwrap();
        let err = fetcher.fetch(Period::Yesterday).await.unwrap_err();
        assert!(matches!(err, PulseError::SnapshotUnavailable { .. }));
    }

    #[tokio::test]
    async fn cache_entries_are_per_period() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_snapshot.json");
        write_empty_snapshot(&path);

        let fetcher = PeriodDataFetcher::new(config(DEAD_API, path.clone())).unwrap();
        fetcher.fetch(Period::Today).await.unwrap();

        std::fs::remove_file(&path).unwrap();
        let err = fetcher.fetch(Period::LastMonth).await.unwrap_err();
        assert!(matches!(err, PulseError::SnapshotUnavailable { .. }));
        // The Today entry is untouched by the LastMonth miss.
        assert!(fetcher.fetch(Period::Today).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_trigger_swallows_unreachable_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher =
            PeriodDataFetcher::new(config(DEAD_API, dir.path().join("data_snapshot.json")))
                .unwrap();
        fetcher.trigger_refresh().await;
    }
}
