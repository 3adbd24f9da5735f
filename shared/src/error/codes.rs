//! Stable numeric error codes
//!
//! Clients branch on purchase outcomes (`VoucherOutOfStock`,
//! `DuplicatePurchase`, `StoreUnavailable`), so a value once published is
//! never renumbered.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    ValidationFailed = 2,
    /// Publishing a voucher that is already on sale
    AlreadyExists = 4,

    /// Missing or expired session token
    NotAuthenticated = 1001,

    VoucherNotFound = 4100,
    VoucherOutOfStock = 4101,
    DuplicatePurchase = 4102,
    SeckillNotStarted = 4103,
    SeckillEnded = 4104,

    ShopNotFound = 6001,

    DatabaseError = 9002,
    /// Shared store unreachable or a gate script timed out
    StoreUnavailable = 9501,
}

impl ErrorCode {
    const ALL: [ErrorCode; 11] = [
        ErrorCode::ValidationFailed,
        ErrorCode::AlreadyExists,
        ErrorCode::NotAuthenticated,
        ErrorCode::VoucherNotFound,
        ErrorCode::VoucherOutOfStock,
        ErrorCode::DuplicatePurchase,
        ErrorCode::SeckillNotStarted,
        ErrorCode::SeckillEnded,
        ErrorCode::ShopNotFound,
        ErrorCode::DatabaseError,
        ErrorCode::StoreUnavailable,
    ];

    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Whether the client may retry the same request later
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::StoreUnavailable)
    }

    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::NotAuthenticated => "Authentication required",
            ErrorCode::VoucherNotFound => "Voucher not found",
            ErrorCode::VoucherOutOfStock => "Voucher is out of stock",
            ErrorCode::DuplicatePurchase => "Voucher already purchased by this user",
            ErrorCode::SeckillNotStarted => "Flash sale has not started",
            ErrorCode::SeckillEnded => "Flash sale has ended",
            ErrorCode::ShopNotFound => "Shop not found",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::StoreUnavailable => "Service busy, please retry later",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// A numeric value that names no [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid error code: {0}")]
pub struct InvalidErrorCode(pub u16);

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|c| c.code() == value)
            .ok_or(InvalidErrorCode(value))
    }
}
