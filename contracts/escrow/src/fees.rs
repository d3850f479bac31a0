//! Basis-point fee math.
//!
//! Fees are always floored, so the protocol never overcharges: whatever
//! remainder the division leaves stays with the payer. `fee + net == gross`
//! holds for every split.

/// Basis-point denominator (1 bp = 0.01%).
pub const BASIS_POINTS: i128 = 10_000;

/// Maximum fee rate an admin may configure, in basis points (50%).
pub const MAX_FEE_RATE: i128 = 5_000;

pub fn is_valid_rate(fee_rate: i128) -> bool {
    (0..=MAX_FEE_RATE).contains(&fee_rate)
}

/// `fee = floor(amount * fee_rate / BASIS_POINTS)`
///
/// Returns 0 when `fee_rate` is 0 or on overflow.
pub fn calculate_fee(amount: i128, fee_rate: i128) -> i128 {
    if fee_rate == 0 {
        return 0;
    }
    amount
        .checked_mul(fee_rate)
        .and_then(|x| x.checked_div(BASIS_POINTS))
        .unwrap_or(0)
}

/// Split `amount` into `(fee, net)`.
pub fn split_amount(amount: i128, fee_rate: i128) -> (i128, i128) {
    let fee = calculate_fee(amount, fee_rate);
    (fee, amount - fee)
}
