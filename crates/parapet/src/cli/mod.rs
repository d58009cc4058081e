pub mod completions;
pub mod log_cmd;
pub mod rules_cmd;
pub mod watch;

use std::path::Path;

use parapet_core::config::SensorConfig;
use parapet_core::rules::Ruleset;

use crate::assets;

/// Resolve the effective ruleset: explicit path, then config, then the
/// bundled default.
pub fn load_ruleset(path_arg: Option<&str>, config: &SensorConfig) -> Ruleset {
    match path_arg.or(config.ruleset_path.as_deref()) {
        Some(path) => Ruleset::load_path(Path::new(path)),
        None => Ruleset::from_json(assets::DEFAULT_RULESET),
    }
}
