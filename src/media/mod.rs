//! Media probing and decode-integrity checking (`spec.md` §4.5).

mod decode_integrity;
mod integrity_cache;
mod listing;
mod probe;

pub use decode_integrity::{
    probe_full, probe_sampled, sample_windows, DecodeIntegrityResult, IntegrityVerdict,
    SAMPLE_WINDOW_SECONDS,
};
pub use integrity_cache::{DecodeCacheEntry, IntegrityCache};
pub use listing::list_media_files;
pub use probe::{probe_language_tags, probe_stream_layout, LanguageTagReport, StreamLayout};
