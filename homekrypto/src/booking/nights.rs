//! Night counting and stay-length policy.

use chrono::NaiveDate;

use super::errors::{BookingError, BookingResult};

/// Shortest bookable stay
pub const DEFAULT_MIN_NIGHTS: u32 = 7;

/// Longest bookable stay
pub const DEFAULT_MAX_NIGHTS: u32 = 365;

/// Stay-length limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayPolicy {
    pub min_nights: u32,
    pub max_nights: u32,
}

impl Default for StayPolicy {
    fn default() -> Self {
        Self {
            min_nights: DEFAULT_MIN_NIGHTS,
            max_nights: DEFAULT_MAX_NIGHTS,
        }
    }
}

/// Count whole nights between `check_in` and `check_out`
///
/// # Errors
///
/// * `BookingError::CheckInInPast` - `check_in` is before `today`
/// * `BookingError::CheckOutNotAfterCheckIn` - `check_out <= check_in`
/// * `BookingError::MinimumStay` - Fewer nights than `policy.min_nights`, with the shortfall
/// * `BookingError::MaximumStay` - More nights than `policy.max_nights`
pub fn count_nights(
    check_in: NaiveDate,
    check_out: NaiveDate,
    today: NaiveDate,
    policy: &StayPolicy,
) -> BookingResult<u32> {
    if check_in < today {
        return Err(BookingError::CheckInInPast { check_in, today });
    }

    if check_out <= check_in {
        return Err(BookingError::CheckOutNotAfterCheckIn {
            check_in,
            check_out,
        });
    }

    let days = (check_out - check_in).num_days();
    let nights = u32::try_from(days).unwrap_or(u32::MAX);

    if nights < policy.min_nights {
        return Err(BookingError::MinimumStay {
            min_nights: policy.min_nights,
            nights,
            shortfall: policy.min_nights - nights,
        });
    }

    if nights > policy.max_nights {
        return Err(BookingError::MaximumStay {
            max_nights: policy.max_nights,
            nights,
        });
    }

    Ok(nights)
}
