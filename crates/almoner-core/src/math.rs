// crates/almoner-core/src/math.rs
//
// Integer arithmetic shared by the ledgers. Nothing here uses floating
// point; every operation either returns an exact floor or an overflow error.

pub use primitive_types::U256;

use crate::error::AlmonerError;
use crate::Amount;

/// Basis-point denominator: 10_000 bps = 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Integer square root (floor) using the Babylonian method.
pub fn isqrt(value: u128) -> u128 {
    if value <= 1 {
        return value;
    }
    let mut x0 = value / 2;
    let mut x1 = (x0 + value / x0) / 2;
    while x1 < x0 {
        x0 = x1;
        x1 = (x0 + value / x0) / 2;
    }
    x0
}

/// `floor(amount * bps / 10_000)` without an intermediate overflow.
///
/// Splits `amount` into quotient and remainder by the denominator so the
/// largest intermediate is `9_999 * bps`.
pub fn bps_share(amount: Amount, bps: u32) -> Amount {
    let denom = BPS_DENOMINATOR as u128;
    let bps = bps as u128;
    (amount / denom) * bps + (amount % denom) * bps / denom
}

/// `floor(a * b / c)` with a 256-bit intermediate product.
///
/// # Errors
/// Returns `AlmonerError::Overflow` if the quotient does not fit in `u128`
/// or `c` is zero.
pub fn mul_div(a: u128, b: u128, c: u128, context: &'static str) -> Result<u128, AlmonerError> {
    let wide = mul_div_wide(U256::from(a), U256::from(b), U256::from(c), context)?;
    narrow(wide, context)
}

/// Convert a `U256` back to `u128`.
///
/// # Errors
/// Returns `AlmonerError::Overflow` if the value needs more than 128 bits.
pub fn narrow(value: U256, context: &'static str) -> Result<u128, AlmonerError> {
    if value.bits() > 128 {
        return Err(AlmonerError::Overflow(context));
    }
    Ok(value.low_u128())
}

/// `floor(a * b / c)` over `U256`.
///
/// # Errors
/// Returns `AlmonerError::Overflow` if `a * b` exceeds 256 bits or `c` is
/// zero.
pub fn mul_div_wide(a: U256, b: U256, c: U256, context: &'static str) -> Result<U256, AlmonerError> {
    if c.is_zero() {
        return Err(AlmonerError::Overflow(context));
    }
    a.checked_mul(b)
        .map(|product| product / c)
        .ok_or(AlmonerError::Overflow(context))
}
