// Pricing module - NBP reference rates with lookback and fallback

mod calendar;
pub mod fallback;
pub mod nbp;

use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::models::LOCAL_CURRENCY;

pub use calendar::reference_date;
pub use fallback::is_fiat_currency;
pub use nbp::{NbpClient, DEFAULT_NBP_API_URL};

/// Calendar days searched before the reference date when it has no rate
pub const DEFAULT_LOOKBACK_DAYS: i64 = 7;

/// Process-wide rate cache shared by every resolver built with `RateResolver::new`
static GLOBAL_RATE_CACHE: Lazy<RateCache> = Lazy::new(RateCache::new);

pub fn global_cache() -> RateCache {
    GLOBAL_RATE_CACHE.clone()
}

/// One published rate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatePoint {
    pub date: NaiveDate,
    pub mid: Decimal,
}

/// Where a resolved rate came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RateOrigin {
    /// The local currency itself (always 1)
    Local,
    /// Published for the reference date
    Exact,
    /// Latest rate in the lookback window before the reference date
    Widened,
    /// Built-in approximate table
    Fallback,
}

impl RateOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateOrigin::Local => "LOCAL",
            RateOrigin::Exact => "EXACT",
            RateOrigin::Widened => "WIDENED",
            RateOrigin::Fallback => "FALLBACK",
        }
    }

    pub fn is_approximate(&self) -> bool {
        matches!(self, RateOrigin::Fallback)
    }
}

/// PLN per one unit of `currency`, with provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedRate {
    pub currency: String,
    pub rate: Decimal,
    pub reference_date: NaiveDate,
    /// Publication date of the rate used; `None` for the built-in table
    pub effective_date: Option<NaiveDate>,
    pub origin: RateOrigin,
}

impl ResolvedRate {
    fn local(reference_date: NaiveDate) -> Self {
        Self {
            currency: LOCAL_CURRENCY.to_string(),
            rate: Decimal::ONE,
            reference_date,
            effective_date: Some(reference_date),
            origin: RateOrigin::Local,
        }
    }
}

/// Anything that can answer "rates for this currency between these dates"
pub trait RateSource {
    fn fetch_rates(
        &self,
        currency: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<RatePoint>>> + Send;
}

impl<T: RateSource> RateSource for &T {
    fn fetch_rates(
        &self,
        currency: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<RatePoint>>> + Send {
        (**self).fetch_rates(currency, start, end)
    }
}

/// A source that is never reachable; every lookup ends in the fallback table
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

impl RateSource for OfflineSource {
    async fn fetch_rates(
        &self,
        currency: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<RatePoint>> {
        Err(anyhow!("offline mode: not querying {} rates", currency))
    }
}

/// The source chosen at startup: live NBP, or offline
#[derive(Debug, Clone)]
pub enum ConfiguredSource {
    Nbp(NbpClient),
    Offline,
}

impl RateSource for ConfiguredSource {
    async fn fetch_rates(
        &self,
        currency: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RatePoint>> {
        match self {
            ConfiguredSource::Nbp(client) => client.fetch_rates(currency, start, end).await,
            ConfiguredSource::Offline => OfflineSource.fetch_rates(currency, start, end).await,
        }
    }
}

type CacheKey = (String, NaiveDate);

/// Resolved rates keyed by (currency, reference date).
///
/// Cloning shares the underlying map. The first rate stored for a key wins.
#[derive(Debug, Clone, Default)]
pub struct RateCache {
    entries: Arc<Mutex<HashMap<CacheKey, ResolvedRate>>>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, ResolvedRate>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, currency: &str, reference_date: NaiveDate) -> Option<ResolvedRate> {
        self.lock()
            .get(&(currency.to_string(), reference_date))
            .cloned()
    }

    /// Store a rate unless one is already cached; returns the cached value
    pub fn insert(&self, rate: ResolvedRate) -> ResolvedRate {
        let key = (rate.currency.clone(), rate.reference_date);
        self.lock().entry(key).or_insert(rate).clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
        info!("Rate cache cleared");
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves PLN reference rates: exact date, then lookback window, then table
pub struct RateResolver<S> {
    source: S,
    cache: RateCache,
    lookback_days: i64,
}

impl<S: RateSource> RateResolver<S> {
    /// Resolver backed by the process-wide cache
    pub fn new(source: S) -> Self {
        Self::with_cache(source, global_cache())
    }

    pub fn with_cache(source: S, cache: RateCache) -> Self {
        Self {
            source,
            cache,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }

    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days.max(1);
        self
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    /// Rate for a transaction dated `date`. Never fails.
    pub async fn resolve(&self, currency: &str, date: NaiveDate) -> ResolvedRate {
        let code = currency.trim().to_uppercase();
        let reference = reference_date(date);

        if code == LOCAL_CURRENCY {
            return ResolvedRate::local(reference);
        }

        if let Some(hit) = self.cache.get(&code, reference) {
            debug!("Using cached {} rate for {}", code, reference);
            return hit;
        }

        let resolved = self.lookup(&code, reference).await;
        self.cache.insert(resolved)
    }

    async fn lookup(&self, code: &str, reference: NaiveDate) -> ResolvedRate {
        if !fallback::is_nbp_currency(code) {
            debug!("{} is not published by NBP", code);
            return fallback_rate(code, reference);
        }

        match self.source.fetch_rates(code, reference, reference).await {
            Ok(points) => {
                if let Some(point) = latest_on_or_before(points, reference) {
                    return quoted(code, reference, point, RateOrigin::Exact);
                }
            }
            Err(e) => {
                warn!("Rate source unavailable for {} on {}: {}", code, reference, e);
                return fallback_rate(code, reference);
            }
        }

        let start = reference - Duration::days(self.lookback_days);
        let end = reference - Duration::days(1);
        debug!("No {} rate on {}, widening to {}..{}", code, reference, start, end);

        match self.source.fetch_rates(code, start, end).await {
            Ok(points) => {
                if let Some(point) = latest_on_or_before(points, end) {
                    return quoted(code, reference, point, RateOrigin::Widened);
                }
            }
            Err(e) => warn!("Rate source unavailable for {} {}..{}: {}", code, start, end, e),
        }

        fallback_rate(code, reference)
    }
}

fn latest_on_or_before(points: Vec<RatePoint>, end: NaiveDate) -> Option<RatePoint> {
    points
        .into_iter()
        .filter(|p| p.date <= end && p.mid > Decimal::ZERO)
        .max_by_key(|p| p.date)
}

fn quoted(code: &str, reference: NaiveDate, point: RatePoint, origin: RateOrigin) -> ResolvedRate {
    ResolvedRate {
        currency: code.to_string(),
        rate: point.mid,
        reference_date: reference,
        effective_date: Some(point.date),
        origin,
    }
}

fn fallback_rate(code: &str, reference: NaiveDate) -> ResolvedRate {
    let rate = match fallback::approximate_rate(code) {
        Some(rate) => {
            warn!("Using approximate {} rate {} for {}", code, rate, reference);
            rate
        }
        None => {
            warn!("No rate available for {}; valuing it at 0 PLN", code);
            Decimal::ZERO
        }
    };

    ResolvedRate {
        currency: code.to_string(),
        rate,
        reference_date: reference,
        effective_date: None,
        origin: RateOrigin::Fallback,
    }
}
