//! Shipping cost resolution
//!
//! Flat options always cost their fixed price. Distance-based options cost
//! `basePrice + pricePerKm * distance` up to their maximum distance; past that
//! the resolver returns [`ShippingQuote::Unavailable`] instead of a price.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::error::ShippingError;
use crate::model::ShippingOption;

/// Outcome of pricing a shipping option
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ShippingQuote {
    /// Delivery is possible at this price
    #[serde(rename = "ok")]
    Price { price: Decimal },

    /// The destination lies beyond the option's maximum distance
    Unavailable,
}

impl ShippingQuote {
    pub fn price(self) -> Option<Decimal> {
        match self {
            ShippingQuote::Price { price } => Some(price),
            ShippingQuote::Unavailable => None,
        }
    }
}

/// Prices `option_id` for a delivery `distance_km` away
///
/// An unknown option id costs nothing. A distance-based option without a
/// distance is an error rather than a silent fallback to its flat price.
pub fn resolve_shipping_cost(
    options: &[ShippingOption],
    option_id: &str,
    distance_km: Option<f64>,
) -> Result<ShippingQuote, ShippingError> {
    let Some(option) = options.iter().find(|o| o.id == option_id) else {
        tracing::debug!(option_id, "unknown shipping option, charging nothing");
        return Ok(ShippingQuote::Price { price: Decimal::ZERO });
    };

    if !option.is_distance_based {
        return Ok(ShippingQuote::Price { price: option.price });
    }

    let distance =
        distance_km.ok_or_else(|| ShippingError::DistanceRequired(option.id.clone()))?;
    if !distance.is_finite() || distance < 0.0 {
        return Err(ShippingError::InvalidDistance(distance));
    }

    if !option.is_complete() {
        return Err(ShippingError::IncompleteDistanceOption(option.id.clone()));
    }
    let (Some(base_price), Some(price_per_km), Some(max_distance)) =
        (option.base_price, option.price_per_km, option.max_distance)
    else {
        return Err(ShippingError::IncompleteDistanceOption(option.id.clone()));
    };

    if distance > max_distance {
        return Ok(ShippingQuote::Unavailable);
    }

    let distance =
        Decimal::try_from(distance).map_err(|_| ShippingError::InvalidDistance(distance))?;
    let price = (base_price + price_per_km * distance)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    Ok(ShippingQuote::Price { price })
}
