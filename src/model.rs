use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Episode {
    pub title: String,
    pub thumbnail: String,
    pub members: String,
    /// Length in whole seconds.
    pub duration: u64,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_scrub_seconds")]
    pub scrub_seconds: u16,
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
    #[serde(default)]
    pub log_filter: Option<String>,
}

fn default_scrub_seconds() -> u16 {
    10
}

fn default_tick_millis() -> u64 {
    250
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scrub_seconds: default_scrub_seconds(),
            tick_millis: default_tick_millis(),
            log_filter: None,
        }
    }
}
