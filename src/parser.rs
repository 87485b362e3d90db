use crate::error::{AdError, Result};
use crate::models::*;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::str::from_utf8;

/// Parse a VAST XML string, degrading to `None` on any failure.
///
/// Ad serving must never crash playback over a bad ad response: malformed
/// XML, a missing `<VAST>` root or a truncated document all yield `None`
/// ("no ad available") and a warning in the log.
pub fn parse(xml: &str) -> Option<Vast> {
    match parse_vast(xml) {
        Ok(vast) => Some(vast),
        Err(e) => {
            log::warn!("Discarding unparseable VAST document: {e}");
            None
        }
    }
}

/// Parse a VAST XML string into a [`Vast`] struct
pub fn parse_vast(xml: &str) -> Result<Vast> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"VAST" => {
                // Extract version from attributes, defaulting to 2.0 when absent
                let mut version = String::from("2.0");
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"version" {
                        if let Ok(value) = from_utf8(&attr.value) {
                            version = value.to_string();
                        }
                    }
                }

                let ads = parse_ads(&mut reader)?;
                return Ok(Vast { version, ads });
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Err(AdError::MissingElement("VAST root".to_string()))
}

/// Parse Ad elements from the VAST XML
fn parse_ads(reader: &mut Reader<&[u8]>) -> Result<Vec<Ad>> {
    let mut ads = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"Ad" => {
                let ad = parse_ad_element(reader, e)?;
                ads.push(ad);
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"VAST" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(ads)
}

/// Parse a single Ad element
fn parse_ad_element(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Ad> {
    let mut ad = Ad {
        id: None,
        sequence: None,
        content: None,
    };

    for attr in start.attributes().flatten() {
        match attr.key.as_ref() {
            b"id" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    ad.id = Some(value.to_string());
                }
            }
            b"sequence" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    if let Ok(seq) = value.parse::<u32>() {
                        ad.sequence = Some(seq);
                    }
                }
            }
            _ => (),
        }
    }

    let mut buf = Vec::new();

    // An Ad carries at most one of InLine or Wrapper; neither is tolerated
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"InLine" => {
                    ad.content = Some(AdContent::InLine(parse_inline_element(reader)?));
                }
                b"Wrapper" => {
                    ad.content = Some(AdContent::Wrapper(parse_wrapper_element(reader)?));
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Ad" => break,
            Ok(Event::Eof) => {
                return Err(AdError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(ad)
}

/// Parse an InLine element
fn parse_inline_element(reader: &mut Reader<&[u8]>) -> Result<InLine> {
    let mut inline = InLine {
        ad_system: AdSystem {
            name: String::new(),
            version: None,
        },
        ad_title: String::new(),
        impressions: Vec::new(),
        description: None,
        advertiser: None,
        error: None,
        pricing: None,
        creatives: Vec::new(),
    };

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"AdSystem" => {
                    inline.ad_system = parse_ad_system(reader, e)?;
                }
                b"AdTitle" => {
                    inline.ad_title = read_text_element(reader)?;
                }
                b"Impression" => {
                    let impression = parse_impression(reader, e)?;
                    inline.impressions.push(impression);
                }
                b"Description" => {
                    inline.description = Some(read_text_element(reader)?);
                }
                b"Advertiser" => {
                    inline.advertiser = Some(read_text_element(reader)?);
                }
                b"Error" => {
                    inline.error = Some(read_text_element(reader)?);
                }
                b"Pricing" => {
                    inline.pricing = Some(parse_pricing(reader, e)?);
                }
                b"Creatives" => {
                    inline.creatives = parse_creatives(reader)?;
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"InLine" => break,
            Ok(Event::Eof) => {
                return Err(AdError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(inline)
}

/// Parse a Wrapper element
fn parse_wrapper_element(reader: &mut Reader<&[u8]>) -> Result<Wrapper> {
    let mut wrapper = Wrapper {
        ad_system: AdSystem {
            name: String::new(),
            version: None,
        },
        vast_ad_tag_uri: String::new(),
        impressions: Vec::new(),
        error: None,
        creatives: Vec::new(),
    };

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"AdSystem" => {
                    wrapper.ad_system = parse_ad_system(reader, e)?;
                }
                b"VASTAdTagURI" => {
                    wrapper.vast_ad_tag_uri = read_text_element(reader)?;
                }
                b"Impression" => {
                    let impression = parse_impression(reader, e)?;
                    wrapper.impressions.push(impression);
                }
                b"Error" => {
                    wrapper.error = Some(read_text_element(reader)?);
                }
                b"Creatives" => {
                    wrapper.creatives = parse_creatives(reader)?;
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Wrapper" => break,
            Ok(Event::Eof) => {
                return Err(AdError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(wrapper)
}

/// Helper function to read the text content of an XML element
fn read_text_element(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Text(e)) => {
                text = e.unescape()?.into_owned();
            }
            Ok(Event::CData(e)) => {
                if let Ok(value) = from_utf8(&e) {
                    text = value.to_string();
                }
            }
            Ok(Event::End(_)) => break,
            Ok(Event::Eof) => {
                return Err(AdError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(text.trim().to_string())
}

/// Helper function to skip an XML element and all its children
fn skip_element(reader: &mut Reader<&[u8]>, name: &[u8]) -> Result<()> {
    let mut buf = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => {
                depth += 1;
            }
            Ok(Event::End(ref e)) => {
                if depth == 0 && e.name().as_ref() == name {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => {
                return Err(AdError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(())
}

/// Parse AdSystem element
fn parse_ad_system(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<AdSystem> {
    let mut ad_system = AdSystem {
        name: String::new(),
        version: None,
    };

    for attr in start.attributes().flatten() {
        if attr.key.as_ref() == b"version" {
            if let Ok(value) = from_utf8(&attr.value) {
                ad_system.version = Some(value.to_string());
            }
        }
    }

    ad_system.name = read_text_element(reader)?;

    Ok(ad_system)
}

/// Parse Impression element
fn parse_impression(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Impression> {
    let mut impression = Impression {
        id: None,
        url: String::new(),
    };

    for attr in start.attributes().flatten() {
        if attr.key.as_ref() == b"id" {
            if let Ok(value) = from_utf8(&attr.value) {
                impression.id = Some(value.to_string());
            }
        }
    }

    impression.url = read_text_element(reader)?;

    Ok(impression)
}

/// Parse Pricing element
fn parse_pricing(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Pricing> {
    let mut pricing = Pricing {
        model: String::new(),
        currency: String::new(),
        value: String::new(),
    };

    for attr in start.attributes().flatten() {
        match attr.key.as_ref() {
            b"model" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    pricing.model = value.to_string();
                }
            }
            b"currency" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    pricing.currency = value.to_string();
                }
            }
            _ => (),
        }
    }

    pricing.value = read_text_element(reader)?;

    Ok(pricing)
}

/// Parse Creatives element
fn parse_creatives(reader: &mut Reader<&[u8]>) -> Result<Vec<Creative>> {
    let mut creatives = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"Creative" => {
                let creative = parse_creative(reader, e)?;
                creatives.push(creative);
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Creatives" => break,
            Ok(Event::Eof) => {
                return Err(AdError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(creatives)
}

/// Parse Creative element
fn parse_creative(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Creative> {
    let mut creative = Creative {
        id: None,
        sequence: None,
        ad_id: None,
        linear: None,
        companion_ads: None,
        non_linear_ads: None,
    };

    for attr in start.attributes().flatten() {
        match attr.key.as_ref() {
            b"id" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    creative.id = Some(value.to_string());
                }
            }
            b"sequence" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    if let Ok(seq) = value.parse::<u32>() {
                        creative.sequence = Some(seq);
                    }
                }
            }
            b"adId" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    creative.ad_id = Some(value.to_string());
                }
            }
            _ => (),
        }
    }

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"Linear" => {
                    creative.linear = Some(parse_linear(reader, e)?);
                }
                b"CompanionAds" => {
                    creative.companion_ads = Some(parse_companion_ads(reader)?);
                }
                b"NonLinearAds" => {
                    creative.non_linear_ads = Some(parse_non_linear_ads(reader)?);
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Creative" => break,
            Ok(Event::Eof) => {
                return Err(AdError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(creative)
}

/// Parse Linear element
fn parse_linear(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Linear> {
    let mut linear = Linear {
        duration_secs: None,
        skip_offset: None,
        media_files: Vec::new(),
        video_clicks: None,
        tracking_events: Vec::new(),
    };

    for attr in start.attributes().flatten() {
        if attr.key.as_ref() == b"skipoffset" {
            if let Ok(value) = from_utf8(&attr.value) {
                linear.skip_offset = Offset::parse(value);
            }
        }
    }

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"Duration" => {
                    linear.duration_secs = parse_duration(&read_text_element(reader)?);
                }
                b"MediaFiles" => {
                    linear.media_files = parse_media_files(reader)?;
                }
                b"VideoClicks" => {
                    linear.video_clicks = Some(parse_video_clicks(reader)?);
                }
                b"TrackingEvents" => {
                    linear.tracking_events = parse_tracking_events(reader)?;
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Linear" => break,
            Ok(Event::Eof) => {
                return Err(AdError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(linear)
}

/// Parse MediaFiles element
fn parse_media_files(reader: &mut Reader<&[u8]>) -> Result<Vec<MediaFile>> {
    let mut media_files = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"MediaFile" => {
                let media_file = parse_media_file(reader, e)?;
                media_files.push(media_file);
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"MediaFiles" => break,
            Ok(Event::Eof) => {
                return Err(AdError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(media_files)
}

/// Parse MediaFile element
fn parse_media_file(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<MediaFile> {
    let mut media_file = MediaFile {
        url: String::new(),
        mime_type: String::new(),
        bitrate: None,
        width: None,
        height: None,
        delivery: None,
    };

    for attr in start.attributes().flatten() {
        match attr.key.as_ref() {
            b"type" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    media_file.mime_type = value.to_string();
                }
            }
            b"bitrate" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    if let Ok(bitrate) = value.parse::<u32>() {
                        media_file.bitrate = Some(bitrate);
                    }
                }
            }
            b"width" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    if let Ok(width) = value.parse::<u32>() {
                        media_file.width = Some(width);
                    }
                }
            }
            b"height" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    if let Ok(height) = value.parse::<u32>() {
                        media_file.height = Some(height);
                    }
                }
            }
            b"delivery" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    media_file.delivery = Some(value.to_string());
                }
            }
            _ => (),
        }
    }

    media_file.url = read_text_element(reader)?;

    Ok(media_file)
}

/// Parse VideoClicks element
fn parse_video_clicks(reader: &mut Reader<&[u8]>) -> Result<VideoClicks> {
    let mut video_clicks = VideoClicks::default();

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"ClickThrough" => {
                    video_clicks.click_through = Some(read_text_element(reader)?);
                }
                b"ClickTracking" => {
                    video_clicks.click_tracking.push(read_text_element(reader)?);
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"VideoClicks" => break,
            Ok(Event::Eof) => {
                return Err(AdError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(video_clicks)
}

/// Parse TrackingEvents element
fn parse_tracking_events(reader: &mut Reader<&[u8]>) -> Result<Vec<TrackingEvent>> {
    let mut tracking_events = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"Tracking" => {
                let tracking_event = parse_tracking_event(reader, e)?;
                tracking_events.push(tracking_event);
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"TrackingEvents" => break,
            Ok(Event::Eof) => {
                return Err(AdError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(tracking_events)
}

/// Parse Tracking element
fn parse_tracking_event(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<TrackingEvent> {
    let mut tracking_event = TrackingEvent {
        event: String::new(),
        url: String::new(),
    };

    for attr in start.attributes().flatten() {
        if attr.key.as_ref() == b"event" {
            if let Ok(value) = from_utf8(&attr.value) {
                tracking_event.event = value.to_string();
            }
        }
    }

    tracking_event.url = read_text_element(reader)?;

    Ok(tracking_event)
}

/// Parse CompanionAds element
fn parse_companion_ads(reader: &mut Reader<&[u8]>) -> Result<CompanionAds> {
    let mut companion_ads = CompanionAds::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"Companion" => {
                let companion = parse_companion(reader, e)?;
                companion_ads.companions.push(companion);
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"CompanionAds" => break,
            Ok(Event::Eof) => {
                return Err(AdError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(companion_ads)
}

/// Parse a Companion element
fn parse_companion(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Companion> {
    let mut companion = Companion {
        id: None,
        width: None,
        height: None,
        resource: None,
        click_through: None,
        tracking_events: Vec::new(),
    };

    for attr in start.attributes().flatten() {
        match attr.key.as_ref() {
            b"id" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    companion.id = Some(value.to_string());
                }
            }
            b"width" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    companion.width = value.parse::<u32>().ok();
                }
            }
            b"height" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    companion.height = value.parse::<u32>().ok();
                }
            }
            _ => (),
        }
    }

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"StaticResource" | b"IFrameResource" | b"HTMLResource" => {
                    companion.resource = Some(parse_resource(reader, e.name().as_ref())?);
                }
                b"CompanionClickThrough" => {
                    companion.click_through = Some(read_text_element(reader)?);
                }
                b"TrackingEvents" => {
                    companion.tracking_events = parse_tracking_events(reader)?;
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Companion" => break,
            Ok(Event::Eof) => {
                return Err(AdError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(companion)
}

/// Parse NonLinearAds element
fn parse_non_linear_ads(reader: &mut Reader<&[u8]>) -> Result<NonLinearAds> {
    let mut non_linear_ads = NonLinearAds::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"NonLinear" => {
                    let non_linear = parse_non_linear(reader, e)?;
                    non_linear_ads.non_linears.push(non_linear);
                }
                b"TrackingEvents" => {
                    non_linear_ads.tracking_events = parse_tracking_events(reader)?;
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"NonLinearAds" => break,
            Ok(Event::Eof) => {
                return Err(AdError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(non_linear_ads)
}

/// Parse a NonLinear overlay element
fn parse_non_linear(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<NonLinear> {
    let mut non_linear = NonLinear {
        id: None,
        width: None,
        height: None,
        resource: None,
        click_through: None,
    };

    for attr in start.attributes().flatten() {
        match attr.key.as_ref() {
            b"id" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    non_linear.id = Some(value.to_string());
                }
            }
            b"width" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    non_linear.width = value.parse::<u32>().ok();
                }
            }
            b"height" => {
                if let Ok(value) = from_utf8(&attr.value) {
                    non_linear.height = value.parse::<u32>().ok();
                }
            }
            _ => (),
        }
    }

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"StaticResource" | b"IFrameResource" | b"HTMLResource" => {
                    non_linear.resource = Some(parse_resource(reader, e.name().as_ref())?);
                }
                b"NonLinearClickThrough" => {
                    non_linear.click_through = Some(read_text_element(reader)?);
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"NonLinear" => break,
            Ok(Event::Eof) => {
                return Err(AdError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(AdError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(non_linear)
}

/// Read a resource element, classifying it by its tag name
fn parse_resource(reader: &mut Reader<&[u8]>, name: &[u8]) -> Result<Resource> {
    let kind = match name {
        b"StaticResource" => ResourceKind::Static,
        b"IFrameResource" => ResourceKind::IFrame,
        _ => ResourceKind::Html,
    };

    Ok(Resource {
        kind,
        value: read_text_element(reader)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_INLINE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<VAST version="3.0">
  <Ad id="ad-1">
    <InLine>
      <AdSystem version="1.0">RadioAds</AdSystem>
      <AdTitle>Morning Spot</AdTitle>
      <Impression id="imp-a"><![CDATA[https://ads.example.com/imp?1]]></Impression>
      <Creatives>
        <Creative id="cr-1">
          <Linear skipoffset="25%">
            <Duration>00:00:30</Duration>
            <TrackingEvents>
              <Tracking event="start"><![CDATA[https://ads.example.com/start]]></Tracking>
              <Tracking event="complete"><![CDATA[https://ads.example.com/complete]]></Tracking>
            </TrackingEvents>
            <VideoClicks>
              <ClickThrough><![CDATA[https://advertiser.example.com]]></ClickThrough>
              <ClickTracking><![CDATA[https://ads.example.com/click]]></ClickTracking>
            </VideoClicks>
            <MediaFiles>
              <MediaFile type="audio/mpeg" delivery="progressive" bitrate="128" width="0" height="0"><![CDATA[https://cdn.example.com/spot.mp3]]></MediaFile>
            </MediaFiles>
          </Linear>
        </Creative>
      </Creatives>
    </InLine>
  </Ad>
</VAST>"#;

    #[test]
    fn parses_minimal_inline_document() {
        let vast = parse(MINIMAL_INLINE).unwrap();
        assert_eq!(vast.version, "3.0");
        assert_eq!(vast.ads.len(), 1);

        let inline = vast.ads[0].inline().unwrap();
        assert_eq!(inline.ad_system.name, "RadioAds");
        assert_eq!(inline.ad_title, "Morning Spot");
        assert_eq!(inline.impressions[0].url, "https://ads.example.com/imp?1");

        let linear = inline.creatives[0].linear.as_ref().unwrap();
        assert_eq!(linear.duration_secs, Some(30.0));
        assert_eq!(linear.skip_offset, Some(Offset::Fraction(0.25)));
        assert_eq!(linear.tracking_events.len(), 2);
        assert_eq!(linear.media_files[0].mime_type, "audio/mpeg");
        assert_eq!(linear.media_files[0].bitrate, Some(128));
        assert_eq!(
            linear.video_clicks.as_ref().unwrap().click_through.as_deref(),
            Some("https://advertiser.example.com")
        );
    }

    #[test]
    fn fractional_duration_is_normalized() {
        let xml = MINIMAL_INLINE.replace("00:00:30", "00:01:30.5");
        let vast = parse(&xml).unwrap();
        let linear = vast.ads[0].inline().unwrap().creatives[0].linear.as_ref().unwrap();
        assert_eq!(linear.duration_secs, Some(90.5));
    }

    #[test]
    fn malformed_input_returns_none() {
        assert!(parse("").is_none());
        assert!(parse("<not-xml>").is_none());
        assert!(parse("plain text").is_none());
        assert!(parse("<root><child/></root>").is_none());
    }

    #[test]
    fn version_defaults_when_absent() {
        let vast = parse("<VAST><Ad id=\"a\"></Ad></VAST>").unwrap();
        assert_eq!(vast.version, "2.0");
        // Neither InLine nor Wrapper is tolerated
        assert_eq!(vast.ads[0].content, None);
    }

    #[test]
    fn parses_wrapper_ad() {
        let xml = r#"<VAST version="2.0">
          <Ad id="w-1">
            <Wrapper>
              <AdSystem>Upstream</AdSystem>
              <VASTAdTagURI><![CDATA[https://ads.example.com/next.xml]]></VASTAdTagURI>
              <Impression><![CDATA[https://ads.example.com/wrap-imp]]></Impression>
            </Wrapper>
          </Ad>
        </VAST>"#;

        let vast = parse(xml).unwrap();
        let wrapper = vast.ads[0].wrapper().unwrap();
        assert_eq!(wrapper.vast_ad_tag_uri, "https://ads.example.com/next.xml");
        assert_eq!(wrapper.impressions.len(), 1);
    }

    #[test]
    fn parses_non_linear_and_companion_creatives() {
        let xml = r#"<VAST version="4.0">
          <Ad id="ad-2">
            <InLine>
              <AdSystem>RadioAds</AdSystem>
              <AdTitle>Overlay</AdTitle>
              <Creatives>
                <Creative>
                  <NonLinearAds>
                    <NonLinear id="nl-1" width="300" height="50">
                      <StaticResource><![CDATA[https://cdn.example.com/banner.png]]></StaticResource>
                      <NonLinearClickThrough><![CDATA[https://advertiser.example.com]]></NonLinearClickThrough>
                    </NonLinear>
                    <TrackingEvents>
                      <Tracking event="creativeView"><![CDATA[https://ads.example.com/view]]></Tracking>
                    </TrackingEvents>
                  </NonLinearAds>
                </Creative>
                <Creative>
                  <CompanionAds>
                    <Companion id="c-1" width="300" height="250">
                      <HTMLResource><![CDATA[<div>ad</div>]]></HTMLResource>
                      <CompanionClickThrough><![CDATA[https://advertiser.example.com/c]]></CompanionClickThrough>
                    </Companion>
                  </CompanionAds>
                </Creative>
              </Creatives>
            </InLine>
          </Ad>
        </VAST>"#;

        let vast = parse(xml).unwrap();
        let inline = vast.ads[0].inline().unwrap();

        let non_linear_ads = inline.creatives[0].non_linear_ads.as_ref().unwrap();
        assert_eq!(non_linear_ads.non_linears.len(), 1);
        let overlay = &non_linear_ads.non_linears[0];
        assert_eq!(overlay.width, Some(300));
        assert_eq!(overlay.resource.as_ref().unwrap().kind, ResourceKind::Static);
        assert_eq!(non_linear_ads.tracking_events[0].event, "creativeView");

        let companions = &inline.creatives[1].companion_ads.as_ref().unwrap().companions;
        assert_eq!(companions.len(), 1);
        assert_eq!(companions[0].resource.as_ref().unwrap().kind, ResourceKind::Html);
        assert_eq!(
            companions[0].click_through.as_deref(),
            Some("https://advertiser.example.com/c")
        );
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let xml = r#"<VAST version="2.0">
          <Ad id="a">
            <InLine>
              <AdSystem>X</AdSystem>
              <AdTitle>T</AdTitle>
              <Mystery><Nested><Deep>stuff</Deep></Nested></Mystery>
              <Impression><![CDATA[https://ads.example.com/i]]></Impression>
            </InLine>
          </Ad>
        </VAST>"#;

        let vast = parse(xml).unwrap();
        let inline = vast.ads[0].inline().unwrap();
        assert_eq!(inline.ad_title, "T");
        assert_eq!(inline.impressions.len(), 1);
    }
}
