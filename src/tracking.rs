use crate::error::Result;
use crate::fraud::{EventMetadata, FraudCheck, FraudDetection};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Persists tracking events to the backing ad service.
///
/// `track_impression` returns the impression identifier the backend minted,
/// or an empty string when it declined the event without erroring.
#[async_trait]
pub trait AdRepository: Send + Sync {
    async fn track_impression(&self, ad_id: &str, meta: &EventMetadata) -> Result<String>;
    async fn track_click(
        &self,
        ad_id: &str,
        impression_id: &str,
        meta: &EventMetadata,
    ) -> Result<bool>;
}

/// Result of an impression track. Never an `Err`: rejections, persistence
/// failures and repository errors all land here with `success: false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpressionOutcome {
    pub success: bool,
    pub impression_id: Option<String>,
    pub fraud: Option<FraudCheck>,
    pub error: Option<String>,
}

/// Result of a click track, same contract as [`ImpressionOutcome`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickOutcome {
    pub success: bool,
    pub fraud: Option<FraudCheck>,
    pub error: Option<String>,
}

/// Validate → persist → record pipeline for impressions.
///
/// Rejection is side-effect free: nothing is persisted or recorded, the
/// caller just gets the fraud detail back for telemetry. Only a confirmed
/// persist moves the fraud counters, so unpersisted events never poison
/// later validations.
pub struct TrackAdImpression {
    repository: Arc<dyn AdRepository>,
    fraud: Arc<dyn FraudDetection>,
}

impl TrackAdImpression {
    pub fn new(repository: Arc<dyn AdRepository>, fraud: Arc<dyn FraudDetection>) -> Self {
        Self { repository, fraud }
    }

    pub async fn execute(&self, ad_id: &str, meta: &EventMetadata) -> ImpressionOutcome {
        let check = self.fraud.validate_impression(ad_id, meta);
        if !check.is_valid {
            log::info!(
                "Impression for ad {ad_id} rejected: {}",
                check.reason.as_deref().unwrap_or("unspecified")
            );
            return ImpressionOutcome {
                success: false,
                impression_id: None,
                error: Some(
                    check
                        .reason
                        .clone()
                        .unwrap_or_else(|| "rejected by fraud detection".to_string()),
                ),
                fraud: Some(check),
            };
        }

        match self.repository.track_impression(ad_id, meta).await {
            Ok(impression_id) if impression_id.is_empty() => ImpressionOutcome {
                success: false,
                impression_id: None,
                fraud: Some(check),
                error: Some("repository returned no impression id".to_string()),
            },
            Ok(impression_id) => {
                self.fraud.record_impression(ad_id, meta);
                ImpressionOutcome {
                    success: true,
                    impression_id: Some(impression_id),
                    fraud: Some(check),
                    error: None,
                }
            }
            Err(e) => {
                log::warn!("Failed to persist impression for ad {ad_id}: {e}");
                ImpressionOutcome {
                    success: false,
                    impression_id: None,
                    fraud: Some(check),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Validate → persist → record pipeline for clicks.
///
/// A click without an originating impression id is a structural failure,
/// reported before fraud validation and without touching the repository.
pub struct TrackAdClick {
    repository: Arc<dyn AdRepository>,
    fraud: Arc<dyn FraudDetection>,
}

impl TrackAdClick {
    pub fn new(repository: Arc<dyn AdRepository>, fraud: Arc<dyn FraudDetection>) -> Self {
        Self { repository, fraud }
    }

    pub async fn execute(
        &self,
        ad_id: &str,
        impression_id: &str,
        meta: &EventMetadata,
    ) -> ClickOutcome {
        if impression_id.trim().is_empty() {
            return ClickOutcome {
                success: false,
                fraud: None,
                error: Some("click requires an originating impression id".to_string()),
            };
        }

        let check = self.fraud.validate_click(ad_id, impression_id, meta);
        if !check.is_valid {
            log::info!(
                "Click for ad {ad_id} rejected: {}",
                check.reason.as_deref().unwrap_or("unspecified")
            );
            return ClickOutcome {
                success: false,
                error: Some(
                    check
                        .reason
                        .clone()
                        .unwrap_or_else(|| "rejected by fraud detection".to_string()),
                ),
                fraud: Some(check),
            };
        }

        match self.repository.track_click(ad_id, impression_id, meta).await {
            Ok(true) => {
                self.fraud.record_click(ad_id, impression_id, meta);
                ClickOutcome {
                    success: true,
                    fraud: Some(check),
                    error: None,
                }
            }
            Ok(false) => ClickOutcome {
                success: false,
                fraud: Some(check),
                error: Some("repository declined the click".to_string()),
            },
            Err(e) => {
                log::warn!("Failed to persist click for ad {ad_id}: {e}");
                ClickOutcome {
                    success: false,
                    fraud: Some(check),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
