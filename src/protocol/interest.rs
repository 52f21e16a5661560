use super::{
    error::ProtocolError,
    parameters::RATE_BASE,
    types::{Amount, InterestRate},
};

/// Returns `(interest, principal + interest)` for a rate in whole percent.
/// The interest portion is floored to the smallest currency unit.
pub fn calculate_interest(
    principal: Amount,
    rate: InterestRate,
    max_rate: InterestRate,
) -> Result<(Amount, Amount), ProtocolError> {
    if rate > max_rate {
        return Err(ProtocolError::InterestRate_Too_High);
    }

    let interest = principal
        .checked_mul(u128::from(rate))
        .ok_or(ProtocolError::Arithmetic_Overflow)?
        / RATE_BASE;
    let total = principal
        .checked_add(interest)
        .ok_or(ProtocolError::Arithmetic_Overflow)?;

    Ok((interest, total))
}
