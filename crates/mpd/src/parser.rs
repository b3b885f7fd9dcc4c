// Event-driven MPD parser built on quick-xml.
//
// Tags are matched by local name, so namespace-prefixed documents parse the
// same as ones using the default namespace. Unknown elements are skipped,
// never rejected, to stay forward-compatible with newer manifest profiles.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;
use url::Url;

use crate::error::MpdError;
use crate::model::{
    AdaptationSet, ManifestDocument, Period, Representation, SegmentBase, SegmentList,
    SegmentTemplate, TimelineEntry,
};

/// Parse a raw MPD document retrieved from `document_url`.
///
/// The retrieval URL becomes the root base for relative addressing, so a
/// manifest with no `<BaseURL>` element anywhere still resolves.
pub fn parse(raw: &str, document_url: &Url) -> Result<ManifestDocument, MpdError> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().check_end_names = true;
    let mut buf = Vec::new();
    let mut parser = MpdParser::new(document_url.clone());

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref el) => parser.open(el)?,
            Event::Empty(ref el) => {
                parser.open(el)?;
                let name = el.local_name().as_ref().to_vec();
                parser.close(&name);
            }
            Event::End(ref el) => {
                let name = el.local_name();
                parser.close(name.as_ref());
            }
            Event::Text(ref text) => {
                let text = text.unescape()?;
                parser.text(&text);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    parser.finish()
}

/// Mutable parse state: the node currently being built at each tree level.
struct MpdParser {
    doc: ManifestDocument,
    saw_mpd: bool,
    period: Option<Period>,
    adaptation: Option<AdaptationSet>,
    representation: Option<Representation>,
    template: Option<SegmentTemplate>,
    timeline: Option<Vec<TimelineEntry>>,
    list: Option<SegmentList>,
    segment_base: Option<SegmentBase>,
    in_base_url: bool,
    base_url_text: String,
}

impl MpdParser {
    fn new(document_url: Url) -> Self {
        Self {
            doc: ManifestDocument::new(document_url),
            saw_mpd: false,
            period: None,
            adaptation: None,
            representation: None,
            template: None,
            timeline: None,
            list: None,
            segment_base: None,
            in_base_url: false,
            base_url_text: String::new(),
        }
    }

    fn open(&mut self, el: &BytesStart<'_>) -> Result<(), MpdError> {
        match el.local_name().as_ref() {
            b"MPD" => {
                self.saw_mpd = true;
                for attr in el.attributes() {
                    let attr = attr?;
                    if attr.key.local_name().as_ref() == b"mediaPresentationDuration" {
                        self.doc.media_presentation_duration =
                            parse_iso_duration(&attr.unescape_value()?);
                    }
                }
            }
            b"Period" => {
                let mut period = Period::default();
                for attr in el.attributes() {
                    let attr = attr?;
                    if attr.key.local_name().as_ref() == b"duration" {
                        period.duration = parse_iso_duration(&attr.unescape_value()?);
                    }
                }
                self.period = Some(period);
            }
            b"AdaptationSet" => {
                let mut set = AdaptationSet::default();
                for attr in el.attributes() {
                    let attr = attr?;
                    let value = attr.unescape_value()?;
                    match attr.key.local_name().as_ref() {
                        b"mimeType" => set.mime_type = Some(value.to_string()),
                        b"contentType" => set.content_type = Some(value.to_string()),
                        _ => {}
                    }
                }
                self.adaptation = Some(set);
            }
            b"Representation" => {
                let mut rep = Representation::default();
                for attr in el.attributes() {
                    let attr = attr?;
                    let value = attr.unescape_value()?;
                    match attr.key.local_name().as_ref() {
                        b"id" => rep.id = value.to_string(),
                        b"mimeType" => rep.mime_type = Some(value.to_string()),
                        // Informational; a bad value should not sink the parse.
                        b"bandwidth" => rep.bandwidth = value.parse().ok(),
                        _ => {}
                    }
                }
                self.representation = Some(rep);
            }
            b"SegmentTemplate" => {
                let mut template = SegmentTemplate::default();
                for attr in el.attributes() {
                    let attr = attr?;
                    let value = attr.unescape_value()?;
                    match attr.key.local_name().as_ref() {
                        b"initialization" => template.initialization = Some(value.to_string()),
                        b"media" => template.media = Some(value.to_string()),
                        b"startNumber" => {
                            template.start_number = u64_attr("startNumber", &value)?
                        }
                        b"duration" => template.duration = Some(u64_attr("duration", &value)?),
                        b"timescale" => template.timescale = u64_attr("timescale", &value)?,
                        _ => {}
                    }
                }
                self.template = Some(template);
            }
            b"SegmentTimeline" => self.timeline = Some(Vec::new()),
            b"S" => {
                let mut entry = TimelineEntry::default();
                let mut d = None;
                for attr in el.attributes() {
                    let attr = attr?;
                    let value = attr.unescape_value()?;
                    match attr.key.local_name().as_ref() {
                        b"t" => entry.t = Some(u64_attr("t", &value)?),
                        b"d" => d = Some(u64_attr("d", &value)?),
                        b"r" => entry.r = u64_attr("r", &value)?,
                        _ => {}
                    }
                }
                entry.d = d.ok_or(MpdError::InvalidAttribute {
                    attr: "d",
                    value: String::new(),
                })?;
                if let Some(timeline) = self.timeline.as_mut() {
                    timeline.push(entry);
                }
            }
            b"SegmentList" => self.list = Some(SegmentList::default()),
            b"SegmentURL" => {
                for attr in el.attributes() {
                    let attr = attr?;
                    if attr.key.local_name().as_ref() == b"media"
                        && let Some(list) = self.list.as_mut()
                    {
                        list.segment_urls.push(attr.unescape_value()?.to_string());
                    }
                }
            }
            b"SegmentBase" => self.segment_base = Some(SegmentBase::default()),
            b"Initialization" => {
                for attr in el.attributes() {
                    let attr = attr?;
                    if attr.key.local_name().as_ref() == b"sourceURL" {
                        let value = attr.unescape_value()?.to_string();
                        if let Some(list) = self.list.as_mut() {
                            list.initialization = Some(value);
                        } else if let Some(base) = self.segment_base.as_mut() {
                            base.initialization = Some(value);
                        }
                    }
                }
            }
            b"RepresentationIndex" => {
                for attr in el.attributes() {
                    let attr = attr?;
                    if attr.key.local_name().as_ref() == b"sourceURL"
                        && let Some(base) = self.segment_base.as_mut()
                    {
                        base.index = Some(attr.unescape_value()?.to_string());
                    }
                }
            }
            b"BaseURL" => {
                self.in_base_url = true;
                self.base_url_text.clear();
            }
            other => {
                debug!(tag = %String::from_utf8_lossy(other), "ignoring manifest element");
            }
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"BaseURL" => {
                self.in_base_url = false;
                if let Some(value) = clean_base_url(&self.base_url_text) {
                    let target = if let Some(rep) = self.representation.as_mut() {
                        &mut rep.base_urls
                    } else if let Some(set) = self.adaptation.as_mut() {
                        &mut set.base_urls
                    } else if let Some(period) = self.period.as_mut() {
                        &mut period.base_urls
                    } else {
                        &mut self.doc.base_urls
                    };
                    target.push(value);
                }
            }
            b"SegmentTimeline" => {
                if let (Some(template), Some(timeline)) =
                    (self.template.as_mut(), self.timeline.take())
                {
                    template.timeline = Some(timeline);
                }
            }
            b"SegmentTemplate" => {
                if let Some(template) = self.template.take() {
                    if let Some(rep) = self.representation.as_mut() {
                        rep.segment_template = Some(template);
                    } else if let Some(set) = self.adaptation.as_mut() {
                        set.segment_template = Some(template);
                    }
                }
            }
            b"SegmentList" => {
                if let Some(list) = self.list.take() {
                    if let Some(rep) = self.representation.as_mut() {
                        rep.segment_list = Some(list);
                    } else if let Some(set) = self.adaptation.as_mut() {
                        set.segment_list = Some(list);
                    }
                }
            }
            b"SegmentBase" => {
                if let (Some(base), Some(rep)) =
                    (self.segment_base.take(), self.representation.as_mut())
                {
                    rep.segment_base = Some(base);
                }
            }
            b"Representation" => {
                if let (Some(rep), Some(set)) =
                    (self.representation.take(), self.adaptation.as_mut())
                {
                    set.representations.push(rep);
                }
            }
            b"AdaptationSet" => {
                if let (Some(set), Some(period)) = (self.adaptation.take(), self.period.as_mut()) {
                    period.adaptation_sets.push(set);
                }
            }
            b"Period" => {
                if let Some(period) = self.period.take() {
                    self.doc.periods.push(period);
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_base_url {
            self.base_url_text.push_str(text);
        }
    }

    fn finish(self) -> Result<ManifestDocument, MpdError> {
        if !self.saw_mpd {
            return Err(MpdError::NotAnMpd);
        }

        // Every representation must resolve to at least one URL later on:
        // an own or inherited segment structure, or an explicitly declared
        // BaseURL to treat as a flat file.
        let doc_base = !self.doc.base_urls.is_empty();
        for period in &self.doc.periods {
            let period_base = doc_base || !period.base_urls.is_empty();
            for set in &period.adaptation_sets {
                let set_base = period_base || !set.base_urls.is_empty();
                for rep in &set.representations {
                    let has_template = rep
                        .segment_template
                        .as_ref()
                        .or(set.segment_template.as_ref())
                        .is_some_and(|t| t.media.is_some() || t.initialization.is_some());
                    let has_list =
                        rep.segment_list.is_some() || set.segment_list.is_some();
                    let has_base = set_base || !rep.base_urls.is_empty();
                    if !(has_template || has_list || rep.segment_base.is_some() || has_base) {
                        return Err(MpdError::NoAddressing(rep.id.clone()));
                    }
                }
            }
        }

        Ok(self.doc)
    }
}

fn u64_attr(attr: &'static str, value: &str) -> Result<u64, MpdError> {
    value.parse().map_err(|_| MpdError::InvalidAttribute {
        attr,
        value: value.to_string(),
    })
}

/// Drop BaseURL values of `""` and `"/"`: both are no-ops that would
/// otherwise reset relative resolution to the host root.
fn clean_base_url(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "/" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_iso_duration(value: &str) -> Option<f64> {
    let duration = iso8601_duration::Duration::parse(value).ok()?;
    duration.to_std().map(|d| d.as_secs_f64())
}
