use serde::Deserialize;

use crate::tiers::repo_types::TierId;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSupporterRequest {
    pub support_tier_id: TierId,
    #[serde(default)]
    pub message: Option<String>,
}

impl AddSupporterRequest {
    /// Blank messages are stored as absent.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}
