use serde::Serialize;

/// Configuration values taken from command-line flags
///
/// Only flags the user actually passed are serialized, so unset flags never
/// mask values from files or the environment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    pub concurrency: ConcurrencyOverrides,
    pub backend: BackendOverrides,
    pub output: OutputOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConcurrencyOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_threaded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_isolated_process: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BackendOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OutputOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}
