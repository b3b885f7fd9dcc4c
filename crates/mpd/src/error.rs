use thiserror::Error;

/// Errors raised while parsing an MPD document. All of these are fatal: the
/// document is rejected before any network access happens.
#[derive(Debug, Error)]
pub enum MpdError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("malformed attribute value {attr}=\"{value}\"")]
    InvalidAttribute { attr: &'static str, value: String },

    #[error("document contains no MPD element")]
    NotAnMpd,

    #[error("representation '{0}' has no resolvable addressing rule")]
    NoAddressing(String),
}

/// Errors raised while expanding a representation's addressing rule into
/// fetch targets. Fatal only for that representation: the addresser skips
/// it with a warning and carries on.
#[derive(Debug, Error)]
pub enum AddressError {
    #[error(
        "segment template for representation '{0}' cannot be bounded: \
         no timeline, no declared duration, and no segment-count override"
    )]
    Unbounded(String),

    #[error("segment numbers for representation '{0}' overflow the numeric range")]
    NumberOverflow(String),

    #[error("cannot resolve URL '{value}': {source}")]
    Url {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Errors from substituting tokens into a segment URL template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template uses $Number$ but no segment number is available")]
    NumberUnavailable,

    #[error("template uses $Time$ but no segment time is available")]
    TimeUnavailable,
}
