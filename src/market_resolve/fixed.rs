// ============================================================================
// Fixed-Point Arithmetic - ray-scaled prices and wide mul/div
// ============================================================================
//
// Prices are ray-scaled integers: 1e27 == 1.0. Amounts are u128 in the
// collateral's smallest unit. Products of two amounts can exceed u128, so
// mul_div works in U256 and only narrows the final quotient.
//
// ============================================================================

use alloy_primitives::U256;
use rust_decimal::Decimal;

/// Collateral or share amount in smallest units
pub type Amount = u128;

/// Ray-scaled fixed point value
pub type Ray = u128;

/// 1.0 in ray units
pub const RAY: Ray = 1_000_000_000_000_000_000_000_000_000;

/// Number of decimal places in a ray
pub const RAY_DECIMALS: u32 = 27;

/// (a * b / d, a * b % d) in 256 bits, or None on division by zero
fn wide_div_rem(a: u128, b: u128, d: u128) -> Option<(U256, U256)> {
    if d == 0 {
        return None;
    }
    let product = U256::from(a) * U256::from(b);
    let divisor = U256::from(d);
    Some((product / divisor, product % divisor))
}

/// floor(a * b / d), or None on division by zero or a quotient wider than u128
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Option<u128> {
    let (quotient, _) = wide_div_rem(a, b, d)?;
    u128::try_from(quotient).ok()
}

/// ceil(a * b / d), or None on division by zero or overflow
pub fn mul_div_ceil(a: u128, b: u128, d: u128) -> Option<u128> {
    let (quotient, rem) = wide_div_rem(a, b, d)?;
    let quotient = u128::try_from(quotient).ok()?;
    if rem.is_zero() {
        Some(quotient)
    } else {
        quotient.checked_add(1)
    }
}

/// numerator / denominator as a ray, floored
pub fn ray_ratio(numerator: u128, denominator: u128) -> Option<Ray> {
    mul_div_floor(numerator, RAY, denominator)
}

/// amount * ray, floored back to an amount
pub fn ray_mul_floor(amount: Amount, ray: Ray) -> Option<Amount> {
    mul_div_floor(amount, ray, RAY)
}

/// amount * ray, rounded up
pub fn ray_mul_ceil(amount: Amount, ray: Ray) -> Option<Amount> {
    mul_div_ceil(amount, ray, RAY)
}

/// Render a ray value as a decimal for display (formatEther-style scaling)
pub fn ray_to_decimal(value: Ray) -> Option<Decimal> {
    let signed = i128::try_from(value).ok()?;
    Decimal::try_from_i128_with_scale(signed, RAY_DECIMALS)
        .ok()
        .map(|d| d.normalize())
}

/// Render a smallest-unit amount as a decimal with the token's decimals
pub fn amount_to_decimal(amount: Amount, decimals: u8) -> Option<Decimal> {
    let signed = i128::try_from(amount).ok()?;
    Decimal::try_from_i128_with_scale(signed, decimals as u32)
        .ok()
        .map(|d| d.normalize())
}
