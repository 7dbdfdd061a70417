// SPDX-License-Identifier: Apache-2.0

use crate::ids::CityId;
use serde::{Deserialize, Serialize};

pub const MIN_CHARGEABLE_WEIGHT_KG: u32 = 1;

/// Couriers charge per started kilogram with a one kilogram floor.
#[must_use]
pub fn chargeable_weight_kg(total_weight_kg: f64) -> u32 {
    if !total_weight_kg.is_finite() || total_weight_kg <= 0.0 {
        return MIN_CHARGEABLE_WEIGHT_KG;
    }
    let rounded = total_weight_kg.ceil();
    if rounded >= f64::from(u32::MAX) {
        return u32::MAX;
    }
    (rounded as u32).max(MIN_CHARGEABLE_WEIGHT_KG)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct RateQuery {
    pub courier: String,
    pub origin_city: CityId,
    pub destination_city: CityId,
    pub weight_kg: u32,
}

impl RateQuery {
    #[must_use]
    pub fn new(courier: String, origin_city: CityId, destination_city: CityId, weight_kg: u32) -> Self {
        Self {
            courier,
            origin_city,
            destination_city,
            weight_kg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct RateOption {
    pub service: String,
    pub description: String,
    pub cost: f64,
}

impl RateOption {
    #[must_use]
    pub fn new(service: String, description: String, cost: f64) -> Self {
        Self {
            service,
            description,
            cost,
        }
    }
}
