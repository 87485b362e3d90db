use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Context reported by the client alongside an impression or click
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    pub timestamp: DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub screen: Option<String>,
    pub timezone: Option<String>,
    pub locale: Option<String>,
}

impl EventMetadata {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            ip: None,
            user_agent: None,
            referrer: None,
            screen: None,
            timezone: None,
            locale: None,
        }
    }

    /// Viewer fingerprint derived from the network address and user agent
    fn fingerprint(&self) -> String {
        format!(
            "{}|{}",
            self.ip.as_deref().unwrap_or("-"),
            self.user_agent.as_deref().unwrap_or("-")
        )
    }
}

/// A named signal that contributed to the risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FraudFlag {
    HighImpressionVelocity,
    HighClickVelocity,
    MissingUserAgent,
    SuspiciousUserAgent,
    MissingReferrer,
    DuplicateClick,
}

impl fmt::Display for FraudFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FraudFlag::HighImpressionVelocity => "high_impression_velocity",
            FraudFlag::HighClickVelocity => "high_click_velocity",
            FraudFlag::MissingUserAgent => "missing_user_agent",
            FraudFlag::SuspiciousUserAgent => "suspicious_user_agent",
            FraudFlag::MissingReferrer => "missing_referrer",
            FraudFlag::DuplicateClick => "duplicate_click",
        };
        f.write_str(name)
    }
}

/// The verdict for a candidate tracking event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudCheck {
    pub is_valid: bool,
    pub risk_score: f64,
    pub flags: Vec<FraudFlag>,
    pub reason: Option<String>,
}

impl FraudCheck {
    fn clean() -> Self {
        Self {
            is_valid: true,
            risk_score: 0.0,
            flags: Vec::new(),
            reason: None,
        }
    }
}

/// Scoring policy. All weights and thresholds are configuration; the shipped
/// defaults reject only when several signals stack up.
#[derive(Debug, Clone)]
pub struct FraudConfig {
    /// Length of the rolling velocity window
    pub velocity_window_secs: i64,
    /// Impressions allowed per fingerprint per ad inside the window
    pub max_impressions_per_window: u32,
    /// Clicks allowed per fingerprint per ad inside the window
    pub max_clicks_per_window: u32,
    pub impression_velocity_weight: f64,
    pub click_velocity_weight: f64,
    pub missing_user_agent_weight: f64,
    pub suspicious_user_agent_weight: f64,
    pub missing_referrer_weight: f64,
    pub duplicate_click_weight: f64,
    /// Scores at or above this reject the event
    pub reject_threshold: f64,
    /// Case-insensitive substrings marking automated user agents
    pub suspicious_agents: Vec<String>,
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            velocity_window_secs: 60,
            max_impressions_per_window: 10,
            max_clicks_per_window: 3,
            impression_velocity_weight: 0.4,
            click_velocity_weight: 0.5,
            missing_user_agent_weight: 0.3,
            suspicious_user_agent_weight: 0.5,
            missing_referrer_weight: 0.2,
            // A repeat click on the same impression rejects on its own
            duplicate_click_weight: 0.8,
            reject_threshold: 0.7,
            suspicious_agents: vec![
                "bot".into(),
                "crawler".into(),
                "spider".into(),
                "curl".into(),
                "wget".into(),
                "python".into(),
                "headless".into(),
                "phantomjs".into(),
            ],
        }
    }
}

/// Validates candidate tracking events and records the ones that persisted.
///
/// Validation must be side-effect free: counters only move through the
/// `record_*` methods, which callers invoke after a confirmed persist.
pub trait FraudDetection: Send + Sync {
    fn validate_impression(&self, ad_id: &str, meta: &EventMetadata) -> FraudCheck;
    fn validate_click(&self, ad_id: &str, impression_id: &str, meta: &EventMetadata) -> FraudCheck;
    fn record_impression(&self, ad_id: &str, meta: &EventMetadata);
    fn record_click(&self, ad_id: &str, impression_id: &str, meta: &EventMetadata);
}

#[derive(Debug, Default)]
struct ViewerHistory {
    impressions: Vec<DateTime<Utc>>,
    clicks: Vec<DateTime<Utc>>,
}

/// Process-local fraud history over concurrent maps.
///
/// Histories are keyed by `(ad_id, fingerprint)`, click counts by
/// `(ad_id, impression_id)`. State lives for the life of the process; in a
/// horizontally scaled deployment each instance scores independently, which
/// is why the service sits behind the [`FraudDetection`] trait.
pub struct InMemoryFraudDetection {
    config: FraudConfig,
    history: DashMap<String, ViewerHistory>,
    click_counts: DashMap<String, u32>,
}

impl InMemoryFraudDetection {
    pub fn new(config: FraudConfig) -> Self {
        Self {
            config,
            history: DashMap::new(),
            click_counts: DashMap::new(),
        }
    }

    fn history_key(&self, ad_id: &str, meta: &EventMetadata) -> String {
        format!("{ad_id}|{}", meta.fingerprint())
    }

    fn click_key(ad_id: &str, impression_id: &str) -> String {
        format!("{ad_id}|{impression_id}")
    }

    fn window_start(&self, meta: &EventMetadata) -> DateTime<Utc> {
        meta.timestamp - Duration::seconds(self.config.velocity_window_secs)
    }

    /// Signals shared by impressions and clicks
    fn score_common(&self, meta: &EventMetadata, check: &mut FraudCheck) {
        match meta.user_agent.as_deref().map(str::trim) {
            None | Some("") => {
                check.risk_score += self.config.missing_user_agent_weight;
                check.flags.push(FraudFlag::MissingUserAgent);
            }
            Some(agent) => {
                let lowered = agent.to_lowercase();
                if self
                    .config
                    .suspicious_agents
                    .iter()
                    .any(|needle| lowered.contains(needle))
                {
                    check.risk_score += self.config.suspicious_user_agent_weight;
                    check.flags.push(FraudFlag::SuspiciousUserAgent);
                }
            }
        }

        if meta.referrer.as_deref().map_or(true, |r| r.trim().is_empty()) {
            check.risk_score += self.config.missing_referrer_weight;
            check.flags.push(FraudFlag::MissingReferrer);
        }
    }

    fn finalize(&self, mut check: FraudCheck) -> FraudCheck {
        check.risk_score = check.risk_score.min(1.0);
        if check.risk_score >= self.config.reject_threshold {
            check.is_valid = false;
            let flags: Vec<String> = check.flags.iter().map(ToString::to_string).collect();
            check.reason = Some(format!(
                "risk score {:.2} at or above threshold {:.2} ({})",
                check.risk_score,
                self.config.reject_threshold,
                flags.join(", ")
            ));
        }
        check
    }

    /// Drop histories with no activity inside twice the velocity window
    pub fn prune_expired(&self) {
        let cutoff = Utc::now() - Duration::seconds(self.config.velocity_window_secs * 2);
        self.history.retain(|_, h| {
            h.impressions.last().is_some_and(|t| *t > cutoff)
                || h.clicks.last().is_some_and(|t| *t > cutoff)
        });
    }
}

impl Default for InMemoryFraudDetection {
    fn default() -> Self {
        Self::new(FraudConfig::default())
    }
}

impl FraudDetection for InMemoryFraudDetection {
    fn validate_impression(&self, ad_id: &str, meta: &EventMetadata) -> FraudCheck {
        let mut check = FraudCheck::clean();
        self.score_common(meta, &mut check);

        if let Some(history) = self.history.get(&self.history_key(ad_id, meta)) {
            let window_start = self.window_start(meta);
            let recent = history
                .impressions
                .iter()
                .filter(|t| **t > window_start)
                .count() as u32;
            if recent >= self.config.max_impressions_per_window {
                let ratio =
                    f64::from(recent) / f64::from(self.config.max_impressions_per_window.max(1));
                check.risk_score += self.config.impression_velocity_weight * ratio.min(2.0);
                check.flags.push(FraudFlag::HighImpressionVelocity);
            }
        }

        self.finalize(check)
    }

    fn validate_click(&self, ad_id: &str, impression_id: &str, meta: &EventMetadata) -> FraudCheck {
        let mut check = FraudCheck::clean();
        self.score_common(meta, &mut check);

        if let Some(history) = self.history.get(&self.history_key(ad_id, meta)) {
            let window_start = self.window_start(meta);
            let recent = history.clicks.iter().filter(|t| **t > window_start).count() as u32;
            if recent >= self.config.max_clicks_per_window {
                let ratio = f64::from(recent) / f64::from(self.config.max_clicks_per_window.max(1));
                check.risk_score += self.config.click_velocity_weight * ratio.min(2.0);
                check.flags.push(FraudFlag::HighClickVelocity);
            }
        }

        if let Some(count) = self.click_counts.get(&Self::click_key(ad_id, impression_id)) {
            if *count >= 1 {
                check.risk_score += self.config.duplicate_click_weight;
                check.flags.push(FraudFlag::DuplicateClick);
            }
        }

        self.finalize(check)
    }

    fn record_impression(&self, ad_id: &str, meta: &EventMetadata) {
        let window_start = self.window_start(meta);
        let mut history = self
            .history
            .entry(self.history_key(ad_id, meta))
            .or_default();
        history.impressions.retain(|t| *t > window_start);
        history.impressions.push(meta.timestamp);
    }

    fn record_click(&self, ad_id: &str, impression_id: &str, meta: &EventMetadata) {
        let window_start = self.window_start(meta);
        let mut history = self
            .history
            .entry(self.history_key(ad_id, meta))
            .or_default();
        history.clicks.retain(|t| *t > window_start);
        history.clicks.push(meta.timestamp);
        drop(history);

        *self
            .click_counts
            .entry(Self::click_key(ad_id, impression_id))
            .or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn browser_meta() -> EventMetadata {
        EventMetadata {
            timestamp: Utc::now(),
            ip: Some("203.0.113.7".into()),
            user_agent: Some("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) Safari/605.1".into()),
            referrer: Some("https://radio.example.com/station/jazz".into()),
            screen: Some("1440x900".into()),
            timezone: Some("Europe/Berlin".into()),
            locale: Some("de-DE".into()),
        }
    }

    #[test]
    fn clean_impression_is_valid() {
        let fraud = InMemoryFraudDetection::default();
        let check = fraud.validate_impression("ad-1", &browser_meta());
        assert!(check.is_valid);
        assert!(check.flags.is_empty());
        assert_eq!(check.risk_score, 0.0);
        assert!(check.reason.is_none());
    }

    #[test]
    fn missing_user_agent_is_flagged_but_not_fatal_alone() {
        let fraud = InMemoryFraudDetection::default();
        let mut meta = browser_meta();
        meta.user_agent = None;

        let check = fraud.validate_impression("ad-1", &meta);
        assert!(check.flags.contains(&FraudFlag::MissingUserAgent));
        assert!(check.is_valid);
    }

    #[test]
    fn headless_agent_without_referrer_is_rejected() {
        let fraud = InMemoryFraudDetection::default();
        let mut meta = browser_meta();
        meta.user_agent = Some("HeadlessChrome/119.0".into());
        meta.referrer = None;

        let check = fraud.validate_impression("ad-1", &meta);
        assert!(!check.is_valid);
        assert!(check.flags.contains(&FraudFlag::SuspiciousUserAgent));
        assert!(check.flags.contains(&FraudFlag::MissingReferrer));
        assert!(check.reason.as_deref().unwrap().contains("risk score"));
    }

    #[test]
    fn impression_velocity_trips_after_window_cap() {
        let fraud = InMemoryFraudDetection::default();
        let meta = browser_meta();
        for _ in 0..10 {
            fraud.record_impression("ad-1", &meta);
        }

        let check = fraud.validate_impression("ad-1", &meta);
        assert!(check.flags.contains(&FraudFlag::HighImpressionVelocity));

        // A different ad for the same viewer is unaffected
        let other = fraud.validate_impression("ad-2", &meta);
        assert!(!other.flags.contains(&FraudFlag::HighImpressionVelocity));
    }

    #[test]
    fn repeat_click_on_same_impression_is_rejected() {
        let fraud = InMemoryFraudDetection::default();
        let meta = browser_meta();

        let first = fraud.validate_click("ad-1", "imp-1", &meta);
        assert!(first.is_valid);
        fraud.record_click("ad-1", "imp-1", &meta);

        let second = fraud.validate_click("ad-1", "imp-1", &meta);
        assert!(second.flags.contains(&FraudFlag::DuplicateClick));
        assert!(!second.is_valid);

        // A click on a different impression of the same ad is fine
        let other = fraud.validate_click("ad-1", "imp-2", &meta);
        assert!(!other.flags.contains(&FraudFlag::DuplicateClick));
    }

    #[test]
    fn click_velocity_trips_after_window_cap() {
        let fraud = InMemoryFraudDetection::default();
        let meta = browser_meta();
        for i in 0..5 {
            fraud.record_click("ad-1", &format!("imp-{i}"), &meta);
        }

        // 5 clicks against a cap of 3 scores past the rejection threshold
        let check = fraud.validate_click("ad-1", "imp-99", &meta);
        assert!(check.flags.contains(&FraudFlag::HighClickVelocity));
        assert!(!check.is_valid);
    }

    #[test]
    fn validation_does_not_mutate_history() {
        let fraud = InMemoryFraudDetection::default();
        let meta = browser_meta();
        for _ in 0..100 {
            let _ = fraud.validate_impression("ad-1", &meta);
        }
        let check = fraud.validate_impression("ad-1", &meta);
        assert!(!check.flags.contains(&FraudFlag::HighImpressionVelocity));
    }

    #[test]
    fn prune_drops_idle_histories() {
        let fraud = InMemoryFraudDetection::default();
        let mut stale = browser_meta();
        stale.timestamp = Utc::now() - Duration::seconds(600);
        fraud.record_impression("ad-1", &stale);

        fraud.record_impression("ad-2", &browser_meta());
        fraud.prune_expired();

        assert_eq!(fraud.history.len(), 1);
    }
}
