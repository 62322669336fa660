use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct NewTier {
    pub title: String,
    pub description: String,
    pub cost: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct PatchTierRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cost: Option<i32>,
}
