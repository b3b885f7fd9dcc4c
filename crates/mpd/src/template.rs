// Segment URL template token substitution.
//
// Supported tokens: $RepresentationID$, $Bandwidth$, $Number$ (with an
// optional zero-padded width form like $Number%05d$), $Time$, and the $$
// escape for a literal dollar sign.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::TemplateError;

static NUMBER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$Number(?:%0(\d+)d)?\$").expect("literal pattern"));

/// Values available for substitution when expanding one segment URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateContext<'a> {
    pub representation_id: &'a str,
    pub bandwidth: Option<u64>,
    pub number: Option<u64>,
    pub time: Option<u64>,
}

/// Expand `pattern` with the given context. Fails if the pattern demands a
/// `$Number$` or `$Time$` value the context does not provide.
pub fn expand(pattern: &str, ctx: &TemplateContext<'_>) -> Result<String, TemplateError> {
    let mut out = pattern.replace("$RepresentationID$", ctx.representation_id);

    if out.contains("$Bandwidth$") {
        let bandwidth = ctx.bandwidth.map(|b| b.to_string()).unwrap_or_default();
        out = out.replace("$Bandwidth$", &bandwidth);
    }

    if NUMBER_TOKEN.is_match(&out) {
        let number = ctx.number.ok_or(TemplateError::NumberUnavailable)?;
        out = NUMBER_TOKEN
            .replace_all(&out, |caps: &regex::Captures<'_>| {
                match caps.get(1).and_then(|w| w.as_str().parse::<usize>().ok()) {
                    Some(width) => format!("{number:0width$}"),
                    None => number.to_string(),
                }
            })
            .into_owned();
    }

    if out.contains("$Time$") {
        let time = ctx.time.ok_or(TemplateError::TimeUnavailable)?;
        out = out.replace("$Time$", &time.to_string());
    }

    Ok(out.replace("$$", "$"))
}
