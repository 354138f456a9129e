use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dto::common::{non_blank, parse_instant};
use crate::error::Result;
use crate::models::Promotion;

/// Request payload for recording a promotion
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AddPromotionRequest {
    #[validate(custom(function = "validate_rank"))]
    #[validate(length(max = 100, message = "Rank must be at most 100 characters"))]
    pub rank: String,

    /// ISO-8601 instant or calendar date
    pub promoted_on: String,

    #[validate(length(max = 255))]
    pub awarded_by: Option<String>,

    #[validate(length(max = 2000))]
    pub note: Option<String>,

    #[validate(url)]
    #[validate(length(max = 500))]
    pub proof_url: Option<String>,
}

fn validate_rank(rank: &str) -> std::result::Result<(), validator::ValidationError> {
    if rank.trim().is_empty() {
        let mut error = validator::ValidationError::new("required");
        error.message = Some("Rank is required".into());
        return Err(error);
    }
    Ok(())
}

impl AddPromotionRequest {
    pub fn new(rank: impl Into<String>, promoted_on: impl Into<String>) -> Self {
        Self {
            rank: rank.into(),
            promoted_on: promoted_on.into(),
            awarded_by: None,
            note: None,
            proof_url: None,
        }
    }

    /// Validates the request and builds the ledger entry with the given id
    pub fn into_promotion(self, promotion_id: String) -> Result<Promotion> {
        self.validate()?;
        let promoted_on = parse_instant("promoted_on", &self.promoted_on)?;

        Ok(Promotion {
            promotion_id: Some(promotion_id),
            rank: self.rank.trim().to_string(),
            promoted_on,
            awarded_by: non_blank(self.awarded_by),
            note: non_blank(self.note),
            proof_url: non_blank(self.proof_url),
        })
    }
}
