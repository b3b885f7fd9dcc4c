// MPEG-DASH MPD manifest parser and segment addressing implementation
pub mod addresser;
pub mod error;
pub mod model;
pub mod parser;
pub mod template;

// Export common types for ease of use
pub use addresser::{address, destination_path, expand_representation};
pub use error::{AddressError, MpdError, TemplateError};
pub use model::{
    AdaptationSet, FetchTarget, ManifestDocument, Period, Representation, SegmentBase, SegmentList,
    SegmentTemplate, TimelineEntry,
};
pub use parser::parse;
