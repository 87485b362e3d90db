use serde::{Deserialize, Serialize};

/// A parsed VAST document (Video Ad Serving Template)
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Vast {
    /// The VAST version (e.g., "2.0", "3.0", "4.0", etc.)
    pub version: String,

    /// The Ad elements within the VAST document, in document order
    pub ads: Vec<Ad>,
}

/// An Ad within a VAST document
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Ad {
    /// The ad ID
    pub id: Option<String>,

    /// The ad sequence number (for ad pods)
    pub sequence: Option<u32>,

    /// The ad payload. `None` when the document carried an `<Ad>` with
    /// neither `<InLine>` nor `<Wrapper>`, which is tolerated.
    pub content: Option<AdContent>,
}

/// An ad is either playable in place or a pointer to another VAST document.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub enum AdContent {
    InLine(InLine),
    Wrapper(Wrapper),
}

impl Ad {
    pub fn inline(&self) -> Option<&InLine> {
        match &self.content {
            Some(AdContent::InLine(inline)) => Some(inline),
            _ => None,
        }
    }

    pub fn wrapper(&self) -> Option<&Wrapper> {
        match &self.content {
            Some(AdContent::Wrapper(wrapper)) => Some(wrapper),
            _ => None,
        }
    }
}

/// An InLine ad, which contains all the media files and tracking information
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct InLine {
    /// The ad system name and version
    pub ad_system: AdSystem,

    /// The ad title
    pub ad_title: String,

    /// Impression tracking URLs
    pub impressions: Vec<Impression>,

    /// The description of the ad
    pub description: Option<String>,

    /// The advertiser name
    pub advertiser: Option<String>,

    /// Error tracking URL
    pub error: Option<String>,

    /// Pricing information
    pub pricing: Option<Pricing>,

    /// Creative elements
    pub creatives: Vec<Creative>,
}

/// A Wrapper ad, which references another VAST document. Its impression and
/// tracking URLs must fire regardless of how resolution turns out, so they
/// are merged into the inline ads it resolves to.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Wrapper {
    /// The ad system name and version
    pub ad_system: AdSystem,

    /// The URL of the next VAST document
    pub vast_ad_tag_uri: String,

    /// Impression tracking URLs
    pub impressions: Vec<Impression>,

    /// Error tracking URL
    pub error: Option<String>,

    /// Creative elements carrying wrapper-level trackers
    pub creatives: Vec<Creative>,
}

/// The ad system information
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AdSystem {
    /// The ad system name
    pub name: String,

    /// The ad system version
    pub version: Option<String>,
}

/// An impression tracking URL
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Impression {
    /// The impression ID
    pub id: Option<String>,

    /// The impression tracking URL
    pub url: String,
}

/// Pricing information
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Pricing {
    /// The pricing model (e.g., "CPM", "CPC", etc.)
    pub model: String,

    /// The pricing currency (e.g., "USD", "EUR", etc.)
    pub currency: String,

    /// The price value
    pub value: String,
}

/// A creative element
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Creative {
    /// The creative ID
    pub id: Option<String>,

    /// The creative sequence number
    pub sequence: Option<u32>,

    /// The creative ad ID
    pub ad_id: Option<String>,

    /// Linear (audio/video) payload
    pub linear: Option<Linear>,

    /// CompanionAds payload
    pub companion_ads: Option<CompanionAds>,

    /// NonLinearAds payload
    pub non_linear_ads: Option<NonLinearAds>,
}

/// A linear ad
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Linear {
    /// The duration of the ad in seconds
    pub duration_secs: Option<f64>,

    /// When the ad becomes skippable
    pub skip_offset: Option<Offset>,

    /// Media files
    pub media_files: Vec<MediaFile>,

    /// Video clicks
    pub video_clicks: Option<VideoClicks>,

    /// Tracking events
    pub tracking_events: Vec<TrackingEvent>,
}

/// A time offset as it appears on the wire. Clock (`HH:MM:SS[.ms]`) and bare
/// second values normalize to `Seconds`; a percentage (`"25%"`) is kept as a
/// `Fraction` of the sibling duration, which only the caller knows.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
pub enum Offset {
    Seconds(f64),
    Fraction(f64),
}

impl Offset {
    /// Parse an offset string in any of the three wire formats.
    pub fn parse(raw: &str) -> Option<Offset> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Some(percent) = raw.strip_suffix('%') {
            return percent
                .trim()
                .parse::<f64>()
                .ok()
                .map(|value| Offset::Fraction(value / 100.0));
        }
        parse_duration(raw).map(Offset::Seconds)
    }

    /// Resolve the offset against the duration it is relative to.
    pub fn as_seconds(&self, duration_secs: f64) -> f64 {
        match self {
            Offset::Seconds(secs) => *secs,
            Offset::Fraction(fraction) => fraction * duration_secs,
        }
    }
}

/// Parse a duration in `HH:MM:SS[.ms]` or bare-seconds form into seconds.
pub fn parse_duration(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.contains(':') {
        let mut secs = 0.0;
        for part in raw.split(':') {
            let value = part.trim().parse::<f64>().ok()?;
            secs = secs * 60.0 + value;
        }
        Some(secs)
    } else {
        raw.parse::<f64>().ok()
    }
}

/// A media file
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct MediaFile {
    /// The media file URL
    pub url: String,

    /// The media file MIME type
    pub mime_type: String,

    /// The media file bitrate
    pub bitrate: Option<u32>,

    /// The media file width
    pub width: Option<u32>,

    /// The media file height
    pub height: Option<u32>,

    /// The media file delivery type (progressive or streaming)
    pub delivery: Option<String>,
}

/// Video click-through and click-tracking URLs
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct VideoClicks {
    /// The click-through URL
    pub click_through: Option<String>,

    /// Click tracking URLs
    pub click_tracking: Vec<String>,
}

/// A tracking event fired by the player at a lifecycle moment
/// (e.g., "start", "firstQuartile", "midpoint", "complete", "skip")
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TrackingEvent {
    /// The event type
    pub event: String,

    /// The tracking URL
    pub url: String,
}

/// How a companion or non-linear creative is rendered
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Resource {
    pub kind: ResourceKind,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
pub enum ResourceKind {
    Static,
    IFrame,
    Html,
}

/// Companion ads
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct CompanionAds {
    /// The companion ads
    pub companions: Vec<Companion>,
}

/// A companion ad
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Companion {
    /// The companion ID
    pub id: Option<String>,

    /// The companion width
    pub width: Option<u32>,

    /// The companion height
    pub height: Option<u32>,

    /// The companion resource
    pub resource: Option<Resource>,

    /// The companion click-through URL
    pub click_through: Option<String>,

    /// Companion tracking events
    pub tracking_events: Vec<TrackingEvent>,
}

/// Non-linear (overlay) ads
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct NonLinearAds {
    /// The non-linear ads
    pub non_linears: Vec<NonLinear>,

    /// Tracking events shared by the overlays
    pub tracking_events: Vec<TrackingEvent>,
}

/// A non-linear overlay ad
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct NonLinear {
    /// The non-linear ID
    pub id: Option<String>,

    /// The non-linear width
    pub width: Option<u32>,

    /// The non-linear height
    pub height: Option<u32>,

    /// The non-linear resource
    pub resource: Option<Resource>,

    /// The non-linear click-through URL
    pub click_through: Option<String>,
}
