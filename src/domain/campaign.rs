use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type CampaignId = String;

/// Kind of micro-task a campaign asks workers to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskCategory {
    #[serde(rename = "Visit Website")]
    VisitWebsite,
    #[serde(rename = "YouTube Subscribe")]
    YoutubeSubscribe,
    #[serde(rename = "Facebook Like")]
    FacebookLike,
    #[serde(rename = "Instagram Follow")]
    InstagramFollow,
    #[serde(rename = "TikTok Follow")]
    TiktokFollow,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 5] = [
        TaskCategory::VisitWebsite,
        TaskCategory::YoutubeSubscribe,
        TaskCategory::FacebookLike,
        TaskCategory::InstagramFollow,
        TaskCategory::TiktokFollow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::VisitWebsite => "Visit Website",
            TaskCategory::YoutubeSubscribe => "YouTube Subscribe",
            TaskCategory::FacebookLike => "Facebook Like",
            TaskCategory::InstagramFollow => "Instagram Follow",
            TaskCategory::TiktokFollow => "TikTok Follow",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "visitwebsite" | "website" => Some(TaskCategory::VisitWebsite),
            "youtubesubscribe" | "youtube" => Some(TaskCategory::YoutubeSubscribe),
            "facebooklike" | "facebook" => Some(TaskCategory::FacebookLike),
            "instagramfollow" | "instagram" => Some(TaskCategory::InstagramFollow),
            "tiktokfollow" | "tiktok" => Some(TaskCategory::TiktokFollow),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a user fills in to launch a campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignDraft {
    pub category: TaskCategory,
    pub title: String,
    pub description: String,
    pub url: String,
    /// Paid to each worker who completes the task
    pub reward: Cents,
    /// Number of completions the creator pays for
    pub quantity: u32,
}

impl CampaignDraft {
    /// Upfront cost of the campaign: reward times quantity.
    pub fn total_cost(&self) -> Cents {
        self.reward.saturating_mul(i64::from(self.quantity))
    }
}

/// A published campaign on the shared task board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    #[serde(rename = "type")]
    pub category: TaskCategory,
    pub title: String,
    pub description: String,
    pub url: String,
    pub reward: Cents,
    pub quantity: u32,
    pub completions: u32,
    pub views: u32,
}

impl Campaign {
    pub fn publish(draft: CampaignDraft) -> Self {
        Self {
            id: format!("utask_{}", Uuid::new_v4().simple()),
            category: draft.category,
            title: draft.title,
            description: draft.description,
            url: draft.url,
            reward: draft.reward,
            quantity: draft.quantity,
            completions: 0,
            views: 0,
        }
    }

    /// Still accepting completions.
    pub fn is_available(&self) -> bool {
        self.completions < self.quantity
    }

    pub fn remaining(&self) -> u32 {
        self.quantity.saturating_sub(self.completions)
    }

    pub fn total_cost(&self) -> Cents {
        self.reward.saturating_mul(i64::from(self.quantity))
    }

    pub fn completion_description(&self) -> String {
        format!("Completed: {}", self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> CampaignDraft {
        CampaignDraft {
            category: TaskCategory::InstagramFollow,
            title: "Follow Us on Instagram".into(),
            description: "Daily updates".into(),
            url: "https://www.instagram.com/example".into(),
            reward: 250,
            quantity: 40,
        }
    }

    #[test]
    fn test_total_cost() {
        assert_eq!(draft().total_cost(), 10000);
    }

    #[test]
    fn test_publish_starts_empty() {
        let campaign = Campaign::publish(draft());
        assert!(campaign.id.starts_with("utask_"));
        assert_eq!(campaign.completions, 0);
        assert_eq!(campaign.views, 0);
        assert!(campaign.is_available());
        assert_eq!(campaign.remaining(), 40);
    }

    #[test]
    fn test_full_campaign_unavailable() {
        let mut campaign = Campaign::publish(draft());
        campaign.completions = 40;
        assert!(!campaign.is_available());
        assert_eq!(campaign.remaining(), 0);
    }

    #[test]
    fn test_category_names() {
        for category in TaskCategory::ALL {
            assert_eq!(TaskCategory::from_str(category.as_str()), Some(category));
        }
        assert_eq!(
            TaskCategory::from_str("tiktok"),
            Some(TaskCategory::TiktokFollow)
        );

        let json = serde_json::to_value(TaskCategory::YoutubeSubscribe).unwrap();
        assert_eq!(json, "YouTube Subscribe");
    }
}
