use crate::error::AppError;
use crate::geo::{haversine_km, Coordinate};
use crate::models::delivery::{PackageSpec, PaymentMode, Pricing};

/// Flat fee charged on every trip, in currency units.
pub const BASE_FEE: u64 = 500;

/// Currency units charged per kilometre of straight-line distance.
const PER_KM_FEE: f64 = 100.0;

/// Pure and deterministic: the same inputs always produce the same pricing.
pub fn quote(
    pickup: &Coordinate,
    dropoff: &Coordinate,
    package: &PackageSpec,
    payment_mode: PaymentMode,
    order_payable: u64,
) -> Result<Pricing, AppError> {
    pickup.validate()?;
    dropoff.validate()?;

    let distance_fee = (haversine_km(pickup, dropoff) * PER_KM_FEE).round() as u64;
    let size_fee = package.size.size_fee();

    let cod_amount = match payment_mode {
        PaymentMode::CashOnDelivery => order_payable,
        PaymentMode::Prepaid => 0,
    };

    Ok(Pricing {
        base_fee: BASE_FEE,
        distance_fee,
        size_fee,
        total: BASE_FEE + distance_fee + size_fee,
        payment_mode,
        cod_amount,
    })
}
