//! General application configuration.

use serde::{Deserialize, Serialize};

fn default_db_path() -> String {
    ".docket/docket.db".to_string()
}

fn default_agent() -> String {
    "docket-sync".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Store location, relative to the project root unless absolute.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Agent name recorded on task history rows written by sync.
    #[serde(default = "default_agent")]
    pub agent: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            agent: default_agent(),
        }
    }
}
