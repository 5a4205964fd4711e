//! Pure repayment-schedule arithmetic. No state, no clock: callers pass
//! the activation time and receive the full installment sequence.

use chrono::{DateTime, Duration, Utc};

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::types::{AmountDue, Installment, InstallmentStatus};

/// generate the installment sequence for a loan activating at `start_time`.
///
/// Principal is split as floor(principal / count) per installment with the
/// final installment absorbing the division remainder, so the components
/// always sum to the principal exactly. Interest is declining-balance:
/// each installment's interest is computed on the principal still
/// outstanding at its start, floored to whole units. The platform fee is
/// carved out of interest, never out of principal.
pub fn build_schedule(
    principal: Money,
    duration_secs: u64,
    installment_count: u32,
    interest_rate: Rate,
    platform_fee_rate: Rate,
    start_time: DateTime<Utc>,
) -> Result<Vec<Installment>> {
    if installment_count == 0 {
        return Err(LoanError::InvalidScheduleParameters {
            message: "installment count must be positive".to_string(),
        });
    }

    if duration_secs == 0 {
        return Err(LoanError::InvalidScheduleParameters {
            message: "duration must be positive".to_string(),
        });
    }

    if principal.is_zero() {
        return Err(LoanError::InvalidScheduleParameters {
            message: "principal must be positive".to_string(),
        });
    }

    let period_secs = (duration_secs / installment_count as u64) as i64;
    let base_principal = principal.div_floor(installment_count);

    let mut installments = Vec::with_capacity(installment_count as usize);
    let mut outstanding = principal;
    let mut allocated = Money::ZERO;

    for index in 1..=installment_count {
        let is_last = index == installment_count;

        let principal_component = if is_last {
            principal - allocated
        } else {
            base_principal
        };

        let interest_component = outstanding.mul_rate_floor(interest_rate);
        let fee_component = interest_component.mul_rate_floor(platform_fee_rate);

        installments.push(Installment {
            index,
            due_at: start_time + Duration::seconds(period_secs * index as i64),
            principal_component,
            interest_component,
            fee_component,
            status: InstallmentStatus::Pending,
            paid_by: None,
            paid_at: None,
        });

        allocated += principal_component;
        outstanding -= principal_component;
    }

    Ok(installments)
}

/// pure lookup of the amount due for a 1-based installment index
pub fn amount_due(schedule: &[Installment], index: u32) -> Result<AmountDue> {
    let installment = schedule
        .get(index.checked_sub(1).map(|i| i as usize).unwrap_or(usize::MAX))
        .ok_or_else(|| LoanError::InvalidScheduleParameters {
            message: format!("installment {} not in schedule of {}", index, schedule.len()),
        })?;

    Ok(AmountDue {
        amount: installment.amount_due(),
        fee_portion: installment.fee_component,
    })
}
