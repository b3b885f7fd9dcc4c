// MPEG-DASH manifest object model.
//
// Nodes carry only the fields declared on them in the document. BaseURL
// stacking, MIME fallback and SegmentTemplate cascading are resolved during
// the addressing walk, which threads an explicit effective context down the
// tree instead of mutating parent state.

use std::path::PathBuf;

use url::Url;

/// Root of a parsed MPD document.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    /// The URL the manifest itself was retrieved from. Relative addressing
    /// resolves against this when no BaseURL is declared anywhere.
    pub document_url: Url,
    /// BaseURL values declared directly under `<MPD>`, in document order.
    pub base_urls: Vec<String>,
    /// `mediaPresentationDuration` in seconds, if declared.
    pub media_presentation_duration: Option<f64>,
    pub periods: Vec<Period>,
}

impl ManifestDocument {
    pub fn new(document_url: Url) -> Self {
        Self {
            document_url,
            base_urls: Vec::new(),
            media_presentation_duration: None,
            periods: Vec::new(),
        }
    }
}

/// One `<Period>` of the presentation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Period {
    pub base_urls: Vec<String>,
    /// `duration` in seconds, if declared.
    pub duration: Option<f64>,
    pub adaptation_sets: Vec<AdaptationSet>,
}

/// Groups representations sharing a MIME/content type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdaptationSet {
    pub base_urls: Vec<String>,
    pub mime_type: Option<String>,
    pub content_type: Option<String>,
    /// Default template inherited by child representations unless overridden.
    pub segment_template: Option<SegmentTemplate>,
    /// Default segment list inherited by child representations.
    pub segment_list: Option<SegmentList>,
    pub representations: Vec<Representation>,
}

/// A single encoded variant of the content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Representation {
    pub id: String,
    pub mime_type: Option<String>,
    /// Informational only; also feeds the `$Bandwidth$` template token.
    pub bandwidth: Option<u64>,
    pub base_urls: Vec<String>,
    pub segment_template: Option<SegmentTemplate>,
    pub segment_list: Option<SegmentList>,
    pub segment_base: Option<SegmentBase>,
}

/// URL pattern with substitution tokens, plus either an explicit timeline or
/// attributes from which number-based expansion can be bounded.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentTemplate {
    pub initialization: Option<String>,
    pub media: Option<String>,
    pub start_number: u64,
    /// Per-segment duration in `timescale` units.
    pub duration: Option<u64>,
    pub timescale: u64,
    pub timeline: Option<Vec<TimelineEntry>>,
}

impl Default for SegmentTemplate {
    fn default() -> Self {
        Self {
            initialization: None,
            media: None,
            start_number: 1,
            duration: None,
            timescale: 1,
            timeline: None,
        }
    }
}

/// One `<S>` element of a `<SegmentTimeline>`: a run of `r + 1` segments of
/// duration `d`, starting at time `t` (or wherever the previous run ended).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineEntry {
    pub t: Option<u64>,
    pub d: u64,
    pub r: u64,
}

/// Explicit `<SegmentList>` of media URLs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentList {
    pub initialization: Option<String>,
    pub segment_urls: Vec<String>,
}

/// `<SegmentBase>` single-file addressing: the media resource is the
/// effective base URL itself, optionally with separate init/index resources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentBase {
    pub initialization: Option<String>,
    pub index: Option<String>,
}

/// One concrete download produced by addressing: an absolute source URL and
/// a destination path relative to the output root.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTarget {
    pub url: Url,
    /// `<host>/<decoded path segments...>`, sanitized against traversal.
    pub rel_path: PathBuf,
    /// Owning representation id, carried for filtering and reporting.
    pub repr_id: String,
    /// Effective MIME type of the owning representation, if known.
    pub mime_type: Option<String>,
}
