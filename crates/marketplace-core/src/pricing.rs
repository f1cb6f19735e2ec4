//! Prices for the paid flows.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Pricing configuration. Prices are in major currency units.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Hours granted by one package purchase.
    /// Default: 60
    #[serde(default = "default_package_hours")]
    pub package_hours: u32,

    /// Package price.
    /// Default: 1000 (INR)
    #[serde(default = "default_package_price")]
    pub package_price: u64,

    /// Internship confirmation fee.
    /// Default: 500 (INR)
    #[serde(default = "default_internship_fee")]
    pub internship_fee: u64,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// Minor units per major unit (paise per rupee).
    #[serde(default = "default_minor_units")]
    pub minor_units: u64,
}

fn default_package_hours() -> u32 {
    60
}

fn default_package_price() -> u64 {
    1000
}

fn default_internship_fee() -> u64 {
    500
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_minor_units() -> u64 {
    100
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            package_hours: default_package_hours(),
            package_price: default_package_price(),
            internship_fee: default_internship_fee(),
            currency: default_currency(),
            minor_units: default_minor_units(),
        }
    }
}

impl PricingConfig {
    /// Convert a major-unit price to the minor units the gateway expects.
    pub fn to_minor(&self, major: u64) -> u64 {
        major.saturating_mul(self.minor_units)
    }

    pub fn package_amount(&self) -> u64 {
        self.to_minor(self.package_price)
    }

    pub fn package_hours(&self) -> Decimal {
        Decimal::from(self.package_hours)
    }

    pub fn internship_amount(&self) -> u64 {
        self.to_minor(self.internship_fee)
    }
}
