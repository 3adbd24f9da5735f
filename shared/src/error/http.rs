//! HTTP status for each error code

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::ValidationFailed | Self::SeckillNotStarted | Self::SeckillEnded => {
                StatusCode::BAD_REQUEST
            }
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::VoucherNotFound | Self::ShopNotFound => StatusCode::NOT_FOUND,
            // Final answers for this user and voucher; retrying changes nothing
            Self::AlreadyExists | Self::VoucherOutOfStock | Self::DuplicatePurchase => {
                StatusCode::CONFLICT
            }
            Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_outcome_statuses() {
        assert_eq!(ErrorCode::VoucherOutOfStock.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::DuplicatePurchase.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::SeckillEnded.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::StoreUnavailable.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
