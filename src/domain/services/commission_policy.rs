//! Commission arithmetic and the follow-up of booking status changes.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::entities::{BookingStatus, CommissionStatus};

/// `price * rate / 100`, rounded half away from zero to cents.
pub fn commission_amount(price: Decimal, rate_percent: Decimal) -> Decimal {
    (price * rate_percent / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether a commission rate lies within 0..=100.
pub fn is_valid_rate(rate_percent: Decimal) -> bool {
    rate_percent >= Decimal::ZERO && rate_percent <= Decimal::ONE_HUNDRED
}

/// The commission status implied by a booking moving to `booking_status`,
/// or `None` when the commission stays as it is.
///
/// Cancelling a booking voids any unpaid commission; completing it approves
/// a pending one. Paid commissions are never touched.
pub fn follow_booking_status(
    booking_status: BookingStatus,
    current: CommissionStatus,
) -> Option<CommissionStatus> {
    match (booking_status, current) {
        (BookingStatus::Cancelled, CommissionStatus::Pending | CommissionStatus::Approved) => {
            Some(CommissionStatus::Cancelled)
        }
        (BookingStatus::Completed, CommissionStatus::Pending) => Some(CommissionStatus::Approved),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use test_case::test_case;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test_case("100.00", "10.00", "10.00")]
    #[test_case("80.00", "12.50", "10.00")]
    #[test_case("19.99", "15.00", "3.00"; "2.9985 rounds up")]
    #[test_case("0.05", "10.00", "0.01"; "midpoint rounds away from zero")]
    #[test_case("250.00", "0", "0.00")]
    #[test_case("250.00", "100", "250.00")]
    fn test_commission_amount(price: &str, rate: &str, expected: &str) {
        assert_eq!(commission_amount(d(price), d(rate)), d(expected));
    }

    #[test]
    fn test_rate_bounds() {
        assert!(is_valid_rate(d("0")));
        assert!(is_valid_rate(d("100")));
        assert!(!is_valid_rate(d("100.01")));
        assert!(!is_valid_rate(d("-1")));
    }

    #[test_case(BookingStatus::Cancelled, CommissionStatus::Pending, Some(CommissionStatus::Cancelled))]
    #[test_case(BookingStatus::Cancelled, CommissionStatus::Approved, Some(CommissionStatus::Cancelled))]
    #[test_case(BookingStatus::Cancelled, CommissionStatus::Paid, None)]
    #[test_case(BookingStatus::Completed, CommissionStatus::Pending, Some(CommissionStatus::Approved))]
    #[test_case(BookingStatus::Completed, CommissionStatus::Approved, None)]
    #[test_case(BookingStatus::Confirmed, CommissionStatus::Pending, None)]
    #[test_case(BookingStatus::Pending, CommissionStatus::Cancelled, None)]
    fn test_follow_booking_status(
        booking: BookingStatus,
        current: CommissionStatus,
        expected: Option<CommissionStatus>,
    ) {
        assert_eq!(follow_booking_status(booking, current), expected);
    }
}
