//! String-backed enums shared by several tables.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Lifecycle of a payment order (and of the renewal it pays for).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl PaymentStatus {
    /// Legal next states. Terminal states have none.
    pub fn allowed_next(self) -> &'static [PaymentStatus] {
        use PaymentStatus::*;
        match self {
            Pending => &[Processing, Failed, Cancelled],
            Processing => &[Success, Failed, Cancelled],
            Success | Failed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "processing" => Ok(PaymentStatus::Processing),
            "success" | "succeeded" | "paid" => Ok(PaymentStatus::Success),
            "failed" => Ok(PaymentStatus::Failed),
            "cancelled" | "canceled" => Ok(PaymentStatus::Cancelled),
            other => Err(ModelError::Validation(format!("unknown payment status '{other}'"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    #[sea_orm(string_value = "wechat")]
    Wechat,
    #[sea_orm(string_value = "alipay")]
    Alipay,
    #[sea_orm(string_value = "stripe")]
    Stripe,
}

impl PaymentProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentProvider::Wechat => "wechat",
            PaymentProvider::Alipay => "alipay",
            PaymentProvider::Stripe => "stripe",
        }
    }
}

impl std::fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl std::str::FromStr for PaymentProvider {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wechat" | "wxpay" => Ok(PaymentProvider::Wechat),
            "alipay" => Ok(PaymentProvider::Alipay),
            "stripe" => Ok(PaymentProvider::Stripe),
            other => Err(ModelError::Validation(format!("unknown payment provider '{other}'"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::PaymentStatus::*;
    use super::*;

    #[test]
    fn transition_table_matches_lifecycle() {
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Success));
        assert!(Processing.can_transition_to(Success));
        assert!(Processing.can_transition_to(Failed));
        assert!(!Processing.can_transition_to(Pending));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for s in [Success, Failed, Cancelled] {
            assert!(s.is_terminal());
            for next in [Pending, Processing, Success, Failed, Cancelled] {
                assert!(!s.can_transition_to(next), "{s} -> {next} must be illegal");
            }
        }
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn parses_gateway_spellings() {
        assert_eq!("SUCCEEDED".parse::<PaymentStatus>().unwrap(), Success);
        assert_eq!("canceled".parse::<PaymentStatus>().unwrap(), Cancelled);
        assert!("refunded".parse::<PaymentStatus>().is_err());
        assert_eq!("wxpay".parse::<PaymentProvider>().unwrap(), PaymentProvider::Wechat);
    }

    #[test]
    fn serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&Processing).unwrap(), "\"processing\"");
        assert_eq!(serde_json::from_str::<PaymentProvider>("\"alipay\"").unwrap(), PaymentProvider::Alipay);
    }
}
