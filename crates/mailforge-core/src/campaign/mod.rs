//! Campaign details, lifecycle status and storage.

mod model;
mod repository;

pub use model::{Campaign, CampaignDetails, CampaignId, CampaignStatus, CampaignType};
pub use repository::CampaignRepository;
