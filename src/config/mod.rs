//! Configuration: on-disk paths, user settings, and usage statistics
//! (`spec.md` §4.8, §6).

pub(crate) mod io;
mod paths;
mod settings;
mod statistics;

pub use paths::{
    cache_home, config_home, decode_integrity_cache_path, langkit_cache_dir, langkit_config_dir,
    pprof_dir, settings_path, statistics_path, tools_dir,
};
pub use settings::{
    ApiKeys, AppSettings, IntermediaryPolicy, QueueSettings, ThrottleSettings, TimeoutSettings,
};
pub use statistics::{Statistics, StatisticsSnapshot, COUNT_APP_START, COUNT_PROCESS_START};
