//! Price composition and HKT conversion.
//!
//! Both functions are pure: the property, the night count, the ownership
//! status and the rate are all explicit inputs.

use super::errors::{BookingError, BookingResult};
use crate::ownership::OwnershipStatus;
use crate::price_feed::HktRate;
use crate::property::Property;

/// Nights a free week must cover
pub const FREE_WEEK_NIGHTS: u32 = 7;

/// USD components of a quote
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComposedPrice {
    pub nights: u32,
    pub nightly_rate: f64,
    pub base_price: f64,
    pub cleaning_fee: f64,
    pub total_usd: f64,
    pub is_owner_booking: bool,
}

/// Check `1 <= guests <= max_guests`
pub fn validate_guests(guests: u32, max_guests: u32) -> BookingResult<()> {
    if guests == 0 {
        return Err(BookingError::TooFewGuests);
    }

    if guests > max_guests {
        return Err(BookingError::TooManyGuests {
            max_guests,
            requested: guests,
        });
    }

    Ok(())
}

/// Whether a stay qualifies as a free owner week
pub fn is_owner_booking(ownership: &OwnershipStatus, nights: u32) -> bool {
    ownership.has_free_week() && nights >= FREE_WEEK_NIGHTS
}

/// Compose the USD price of a stay
///
/// Owner bookings pay the cleaning fee only; everyone else pays
/// `nights * nightly_rate + cleaning_fee`.
///
/// # Errors
///
/// * `BookingError::InvalidTotal` - Non-owner total is not positive, or any total is not finite
pub fn compose_price(
    property: &Property,
    nights: u32,
    ownership: &OwnershipStatus,
) -> BookingResult<ComposedPrice> {
    let owner = is_owner_booking(ownership, nights);
    let base_price = if owner {
        0.0
    } else {
        f64::from(nights) * property.nightly_rate
    };
    let total_usd = base_price + property.cleaning_fee;

    if !total_usd.is_finite() || (!owner && total_usd <= 0.0) {
        return Err(BookingError::InvalidTotal(total_usd));
    }

    Ok(ComposedPrice {
        nights,
        nightly_rate: property.nightly_rate,
        base_price,
        cleaning_fee: property.cleaning_fee,
        total_usd,
        is_owner_booking: owner,
    })
}

/// Convert a USD total into HKT
///
/// # Errors
///
/// * `BookingError::PriceUnavailable` - No rate, or a rate that is not positive and finite
pub fn convert_to_hkt(total_usd: f64, rate: Option<&HktRate>) -> BookingResult<f64> {
    let rate = rate
        .filter(|r| r.is_usable())
        .ok_or(BookingError::PriceUnavailable)?;

    let total_hkt = total_usd / rate.usd_per_hkt;
    if !total_hkt.is_finite() {
        return Err(BookingError::PriceUnavailable);
    }

    Ok(total_hkt)
}
