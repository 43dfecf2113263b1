//! Core types: event records, date normalization, keys, aggregation

pub mod aggregate;
pub mod dates;
pub mod key;
pub mod months;
pub mod record;
pub mod source;
pub mod time;
pub mod tracing;

pub use aggregate::{Aggregator, dedupe};
pub use dates::DateSpan;
pub use key::{CanonicalKey, StableId, date_component, decorate_title, normalize_title, strip_decoration};
pub use record::{NormalizeError, Normalized, NormalizedEvent, RawEventRecord, normalize_record, normalize_records};
pub use source::SourceTag;
pub use time::EventTime;
pub use crate::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
