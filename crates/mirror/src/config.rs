use std::{collections::HashMap, fs, time::Duration};

/// Tuning knobs for the mirror pipeline. File values come from
/// `mirror.toml` (flat string map), environment variables win over both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub remote_timeout_ms: u64,
    pub persist_fallback_channel: bool,
    pub event_buffer: usize,
    pub lane_buffer: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote_timeout_ms: 5_000,
            persist_fallback_channel: false,
            event_buffer: 1_024,
            lane_buffer: 256,
        }
    }
}

impl Settings {
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("mirror.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            apply(&mut settings, &file_cfg);
        }
    }

    let mut env_cfg = HashMap::new();
    for key in [
        "remote_timeout_ms",
        "persist_fallback_channel",
        "event_buffer",
        "lane_buffer",
    ] {
        if let Ok(v) = std::env::var(format!("MIRROR__{}", key.to_ascii_uppercase())) {
            env_cfg.insert(key.to_string(), v);
        }
    }
    apply(&mut settings, &env_cfg);

    settings
}

fn apply(settings: &mut Settings, cfg: &HashMap<String, String>) {
    if let Some(v) = cfg.get("remote_timeout_ms") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.remote_timeout_ms = parsed;
        }
    }
    if let Some(v) = cfg.get("persist_fallback_channel") {
        if let Ok(parsed) = v.parse::<bool>() {
            settings.persist_fallback_channel = parsed;
        }
    }
    if let Some(v) = cfg.get("event_buffer") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.event_buffer = parsed;
        }
    }
    if let Some(v) = cfg.get("lane_buffer") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.lane_buffer = parsed;
        }
    }
}
