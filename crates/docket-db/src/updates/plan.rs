//! Epic/feature update builder.

use serde::Serialize;

/// Metadata fields discovery may change on an epic or feature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<Option<String>>,
}

impl PlanUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.file_path.is_none()
    }
}

pub struct PlanUpdateBuilder(PlanUpdate);

impl PlanUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(PlanUpdate::default())
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.0.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.0.description = Some(description);
        self
    }

    #[must_use]
    pub fn file_path(mut self, file_path: Option<String>) -> Self {
        self.0.file_path = Some(file_path);
        self
    }

    #[must_use]
    pub fn build(self) -> PlanUpdate {
        self.0
    }
}

impl Default for PlanUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
