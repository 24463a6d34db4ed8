use serde::{Deserialize, Serialize};

use super::JobSubscription;

/// Where a profile is in the joining-fee flow. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unpaid,
    PendingVerification,
    Verified,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::PendingVerification => "PENDING_VERIFICATION",
            PaymentStatus::Verified => "VERIFIED",
        }
    }

    /// The next status in the progression, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            PaymentStatus::Unpaid => Some(PaymentStatus::PendingVerification),
            PaymentStatus::PendingVerification => Some(PaymentStatus::Verified),
            PaymentStatus::Verified => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            PaymentStatus::Unpaid => 0,
            PaymentStatus::PendingVerification => 1,
            PaymentStatus::Verified => 2,
        }
    }

    /// Whether this status comes later in the progression than `other`.
    pub fn is_after(&self, other: PaymentStatus) -> bool {
        self.rank() > other.rank()
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub job_subscription: Option<JobSubscription>,
}

impl Profile {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            phone: phone.into(),
            payment_status: PaymentStatus::Unpaid,
            job_subscription: None,
        }
    }

    /// Move to `target` when it is the next step; returns whether it moved.
    pub fn advance_to(&mut self, target: PaymentStatus) -> bool {
        if self.payment_status.next() == Some(target) {
            self.payment_status = target;
            true
        } else {
            false
        }
    }

    pub fn is_verified(&self) -> bool {
        self.payment_status == PaymentStatus::Verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_profile_is_unpaid() {
        let profile = Profile::new("ali", "ali@example.com", "0300");
        assert_eq!(profile.payment_status, PaymentStatus::Unpaid);
        assert!(profile.job_subscription.is_none());
        assert!(!profile.is_verified());
    }

    #[test]
    fn test_status_only_moves_forward() {
        let mut profile = Profile::new("ali", "ali@example.com", "0300");

        assert!(!profile.advance_to(PaymentStatus::Verified));
        assert!(profile.advance_to(PaymentStatus::PendingVerification));
        assert!(!profile.advance_to(PaymentStatus::Unpaid));
        assert!(profile.advance_to(PaymentStatus::Verified));
        assert!(!profile.advance_to(PaymentStatus::Verified));
        assert!(profile.is_verified());
    }

    #[test]
    fn test_status_order() {
        assert!(PaymentStatus::Verified.is_after(PaymentStatus::PendingVerification));
        assert!(PaymentStatus::PendingVerification.is_after(PaymentStatus::Unpaid));
        assert!(!PaymentStatus::PendingVerification.is_after(PaymentStatus::Verified));
        assert!(!PaymentStatus::Unpaid.is_after(PaymentStatus::Unpaid));
    }

    #[test]
    fn test_serialized_shape() {
        let profile = Profile::new("ali", "ali@example.com", "0300");
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["paymentStatus"], "UNPAID");
        assert!(json["jobSubscription"].is_null());
    }
}
