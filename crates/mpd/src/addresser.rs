// Flattens a parsed manifest into a deduplicated list of fetch targets.
//
// One walk over the tree threads the effective context (stacked base URLs,
// inherited MIME type, inherited segment structure) downward and pattern
// matches each representation's addressing rule. A representation whose
// rule cannot be expanded is skipped with a warning; the run only fails
// later if nothing at all was addressed.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, warn};
use url::Url;

use crate::error::AddressError;
use crate::model::{
    AdaptationSet, FetchTarget, ManifestDocument, Representation, SegmentTemplate,
};
use crate::template::{self, TemplateContext};

/// Expand every representation of `doc` into fetch targets, deduplicated by
/// absolute URL in first-seen order.
///
/// `segment_count_override` bounds number-based templates when the manifest
/// declares no duration/timescale of its own.
pub fn address(doc: &ManifestDocument, segment_count_override: Option<u64>) -> Vec<FetchTarget> {
    let mut seen: HashSet<Url> = HashSet::new();
    let mut out = Vec::new();

    let root = vec![doc.document_url.clone()];
    let doc_bases = stack_bases(&root, &doc.base_urls);
    let doc_declared = !doc.base_urls.is_empty();

    for period in &doc.periods {
        let period_bases = stack_bases(&doc_bases, &period.base_urls);
        let period_declared = doc_declared || !period.base_urls.is_empty();
        let total_duration = period.duration.or(doc.media_presentation_duration);

        for set in &period.adaptation_sets {
            let set_bases = stack_bases(&period_bases, &set.base_urls);
            let set_declared = period_declared || !set.base_urls.is_empty();

            for rep in &set.representations {
                let rep_bases = stack_bases(&set_bases, &rep.base_urls);
                let rep_declared = set_declared || !rep.base_urls.is_empty();

                match expand_representation(
                    rep,
                    set,
                    &rep_bases,
                    rep_declared,
                    total_duration,
                    segment_count_override,
                ) {
                    Ok(targets) => {
                        for target in targets {
                            if seen.insert(target.url.clone()) {
                                out.push(target);
                            }
                        }
                    }
                    Err(error) => {
                        warn!(repr_id = %rep.id, %error, "skipping representation: addressing failed");
                    }
                }
            }
        }
    }

    out
}

/// Expand a single representation against its effective base URLs.
///
/// The addressing rule is resolved in order: segment list, segment
/// template, segment base, then flat file via a declared BaseURL.
pub fn expand_representation(
    rep: &Representation,
    set: &AdaptationSet,
    bases: &[Url],
    has_declared_base: bool,
    total_duration: Option<f64>,
    segment_count_override: Option<u64>,
) -> Result<Vec<FetchTarget>, AddressError> {
    let mime = rep.mime_type.clone().or_else(|| set.mime_type.clone());
    let list = rep.segment_list.as_ref().or(set.segment_list.as_ref());
    let template = rep
        .segment_template
        .as_ref()
        .or(set.segment_template.as_ref())
        .filter(|t| t.media.is_some() || t.initialization.is_some());

    let mut out = Vec::new();
    let mut push = |url: Url, out: &mut Vec<FetchTarget>| {
        out.push(FetchTarget {
            rel_path: destination_path(&url),
            repr_id: rep.id.clone(),
            mime_type: mime.clone(),
            url,
        });
    };

    let mut structured = false;
    for base in bases {
        if let Some(list) = list {
            structured = true;
            if let Some(init) = &list.initialization {
                push(join(base, init)?, &mut out);
            }
            for media in &list.segment_urls {
                push(join(base, media)?, &mut out);
            }
        }

        if let Some(template) = template {
            structured = true;
            for url in
                expand_template(template, rep, base, total_duration, segment_count_override)?
            {
                push(url, &mut out);
            }
        }

        if let Some(segment_base) = &rep.segment_base {
            structured = true;
            if let Some(init) = &segment_base.initialization {
                push(join(base, init)?, &mut out);
            }
            if let Some(index) = &segment_base.index {
                push(join(base, index)?, &mut out);
            }
            // Byte-range playback is out of scope: the media resource is
            // fetched once, whole.
            push(base.clone(), &mut out);
        }
    }

    if !structured && has_declared_base {
        for base in bases {
            debug!(repr_id = %rep.id, url = %base, "treating base URL as a flat file");
            push(base.clone(), &mut out);
        }
    }

    Ok(out)
}

/// Expand one segment template against one base URL.
fn expand_template(
    template: &SegmentTemplate,
    rep: &Representation,
    base: &Url,
    total_duration: Option<f64>,
    segment_count_override: Option<u64>,
) -> Result<Vec<Url>, AddressError> {
    let mut urls = Vec::new();
    let ctx = TemplateContext {
        representation_id: &rep.id,
        bandwidth: rep.bandwidth,
        number: None,
        time: None,
    };

    if let Some(init) = &template.initialization {
        urls.push(join(base, &template::expand(init, &ctx)?)?);
    }

    let Some(media) = &template.media else {
        return Ok(urls);
    };

    if let Some(timeline) = &template.timeline {
        // Time-based: walk the timeline in document order; an entry with
        // repeat count r expands to r + 1 segments.
        let mut current_time: u64 = 0;
        for entry in timeline {
            if let Some(t) = entry.t {
                current_time = t;
            }
            for _ in 0..=entry.r {
                let expanded = template::expand(
                    media,
                    &TemplateContext {
                        time: Some(current_time),
                        ..ctx
                    },
                )?;
                urls.push(join(base, &expanded)?);
                current_time += entry.d;
            }
        }
    } else {
        // Number-based: segment numbers run from startNumber through
        // startNumber + count - 1.
        let count = segment_count(template, total_duration)
            .or(segment_count_override)
            .ok_or_else(|| AddressError::Unbounded(rep.id.clone()))?;
        let end = template
            .start_number
            .checked_add(count)
            .ok_or_else(|| AddressError::NumberOverflow(rep.id.clone()))?;
        for number in template.start_number..end {
            let expanded = template::expand(
                media,
                &TemplateContext {
                    number: Some(number),
                    ..ctx
                },
            )?;
            urls.push(join(base, &expanded)?);
        }
    }

    Ok(urls)
}

/// Segment count from the manifest's own duration declarations:
/// ceil(presentation seconds x timescale / per-segment duration).
fn segment_count(template: &SegmentTemplate, total_duration: Option<f64>) -> Option<u64> {
    let segment_duration = template.duration.filter(|d| *d > 0)?;
    let total = total_duration.filter(|t| *t > 0.0)?;
    let count = (total * template.timescale as f64 / segment_duration as f64).ceil();
    Some(count as u64)
}

/// Stack one level of declared BaseURLs onto the parent effective bases.
/// Multiple BaseURLs per level combine left-to-right with each parent base.
fn stack_bases(parents: &[Url], locals: &[String]) -> Vec<Url> {
    if locals.is_empty() {
        return parents.to_vec();
    }
    let mut out = Vec::with_capacity(parents.len() * locals.len());
    for parent in parents {
        for local in locals {
            match parent.join(local) {
                Ok(url) => out.push(url),
                Err(error) => {
                    warn!(base = %parent, value = %local, %error, "ignoring unresolvable BaseURL");
                }
            }
        }
    }
    out
}

fn join(base: &Url, part: &str) -> Result<Url, AddressError> {
    base.join(part).map_err(|source| AddressError::Url {
        value: part.to_string(),
        source,
    })
}

/// Derive the destination path for a fetch URL: the host followed by each
/// percent-decoded path segment, with traversal attempts neutralized. A
/// query string survives as a final encoded path component so distinct
/// query variants of one path land in distinct files.
pub fn destination_path(url: &Url) -> PathBuf {
    let mut path = PathBuf::new();
    if let Some(host) = url.host_str() {
        path.push(host);
    }

    for segment in url.path_segments().into_iter().flatten() {
        if segment.is_empty() {
            continue;
        }
        let decoded = match urlencoding::decode(segment) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => segment.to_string(),
        };
        if let Some(safe) = sanitize_segment(&decoded) {
            path.push(safe);
        }
    }

    if let Some(query) = url.query()
        && !query.is_empty()
    {
        path.push(urlencoding::encode(query).into_owned());
    }

    path
}

/// Reject `.`/`..` components and strip path separators that survive
/// percent-decoding, so a hostile manifest cannot write outside the output
/// root.
fn sanitize_segment(segment: &str) -> Option<String> {
    if segment == "." || segment == ".." {
        warn!(segment, "dropping traversal path segment from destination");
        return None;
    }
    if segment.contains('/') || segment.contains('\\') {
        warn!(segment, "neutralizing path separator in destination segment");
        return Some(segment.replace(['/', '\\'], "_"));
    }
    Some(segment.to_string())
}
