use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};
use uuid::Uuid;

/// JSON upload used by dashboard clients: the image as plain base64 or a
/// `data:` URL.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Base64ImageRequest {
    pub image_data: String,
}

/// Freshness buckets, ordered from freshest to rotten.
///
/// `Display` yields the customer-facing sentence, serde the short grade.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessLabel {
    #[strum(to_string = "It is really fresh, so you can eat it now!")]
    ReallyFresh,
    #[strum(to_string = "It is good, you can still enjoy it.")]
    Good,
    #[strum(to_string = "It is fair, consider eating it soon.")]
    Fair,
    #[strum(to_string = "It is poor, you might want to eat it quickly.")]
    Poor,
    #[strum(to_string = "It is rotten, do not eat it.")]
    Rotten,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RecognizeResponse {
    pub request_id: Uuid,
    pub freshness_percentage: u8,
    pub freshness_label: String,
    pub grade: FreshnessLabel,
    pub price: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CheckoutResponse {
    #[serde(flatten)]
    pub recognition: RecognizeResponse,
    pub image_data_url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_loaded_at: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}
