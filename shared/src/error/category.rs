//! Coarse grouping of error codes by their thousands digit

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Auth,
    /// Flash-sale admission and order outcomes
    Order,
    Shop,
    /// Database and shared-store failures, logged at error level
    System,
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        match self.code() / 1000 {
            0 => ErrorCategory::General,
            1 => ErrorCategory::Auth,
            4 => ErrorCategory::Order,
            6 => ErrorCategory::Shop,
            _ => ErrorCategory::System,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_code_ranges() {
        assert_eq!(ErrorCode::AlreadyExists.category(), ErrorCategory::General);
        assert_eq!(ErrorCode::NotAuthenticated.category(), ErrorCategory::Auth);
        assert_eq!(ErrorCode::DuplicatePurchase.category(), ErrorCategory::Order);
        assert_eq!(ErrorCode::ShopNotFound.category(), ErrorCategory::Shop);
        assert_eq!(ErrorCode::StoreUnavailable.category(), ErrorCategory::System);
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::System);
    }
}
