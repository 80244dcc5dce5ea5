//! Finance and health calculators shown alongside course and exam pages.

use serde::Serialize;

use crate::error::DekhoError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmiBreakdown {
    pub monthly_emi: f64,
    pub total_payment: f64,
    pub total_interest: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SipProjection {
    pub invested: f64,
    pub estimated_returns: f64,
    pub total_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bmi {
    pub value: f64,
    pub category: BmiCategory,
}

fn positive(name: &str, value: f64) -> Result<f64, DekhoError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(DekhoError::validation(format!("{name} must be a positive number")))
    }
}

fn non_negative(name: &str, value: f64) -> Result<f64, DekhoError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(DekhoError::validation(format!("{name} must not be negative")))
    }
}

/// Inputs can be individually valid yet overflow once compounded.
fn finite(name: &str, value: f64) -> Result<f64, DekhoError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DekhoError::validation(format!("{name} is out of range")))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Equated monthly instalment for a loan.
pub fn emi(principal: f64, annual_rate_pct: f64, months: u32) -> Result<EmiBreakdown, DekhoError> {
    let principal = positive("principal", principal)?;
    let annual_rate_pct = non_negative("rate", annual_rate_pct)?;
    if months == 0 {
        return Err(DekhoError::validation("tenure must be at least one month"));
    }

    let n = f64::from(months);
    let r = annual_rate_pct / 12.0 / 100.0;
    let monthly = if r == 0.0 {
        principal / n
    } else {
        let growth = (1.0 + r).powf(n);
        principal * r * growth / (growth - 1.0)
    };
    let monthly = finite("monthly instalment", monthly)?;
    let total = finite("total payment", monthly * n)?;

    Ok(EmiBreakdown {
        monthly_emi: round2(monthly),
        total_payment: round2(total),
        total_interest: round2(total - principal),
    })
}

/// Future value of a monthly SIP with contributions at the start of each month.
pub fn sip(monthly: f64, annual_rate_pct: f64, years: u32) -> Result<SipProjection, DekhoError> {
    let monthly = positive("monthly investment", monthly)?;
    let annual_rate_pct = non_negative("rate", annual_rate_pct)?;
    if years == 0 {
        return Err(DekhoError::validation("duration must be at least one year"));
    }

    let n = f64::from(years) * 12.0;
    let i = annual_rate_pct / 12.0 / 100.0;
    let total = if i == 0.0 {
        monthly * n
    } else {
        monthly * ((1.0 + i).powf(n) - 1.0) / i * (1.0 + i)
    };
    let total = finite("projected value", total)?;
    let invested = finite("invested amount", monthly * n)?;

    Ok(SipProjection {
        invested: round2(invested),
        estimated_returns: round2(total - invested),
        total_value: round2(total),
    })
}

pub fn bmi(weight_kg: f64, height_cm: f64) -> Result<Bmi, DekhoError> {
    let weight_kg = positive("weight", weight_kg)?;
    let height_m = positive("height", height_cm)? / 100.0;

    let value = weight_kg / (height_m * height_m);
    let category = match value {
        v if v < 18.5 => BmiCategory::Underweight,
        v if v < 25.0 => BmiCategory::Normal,
        v if v < 30.0 => BmiCategory::Overweight,
        _ => BmiCategory::Obese,
    };

    Ok(Bmi {
        value: (value * 10.0).round() / 10.0,
        category,
    })
}

pub fn percentage(obtained: f64, total: f64) -> Result<f64, DekhoError> {
    let obtained = non_negative("obtained marks", obtained)?;
    let total = positive("total marks", total)?;
    if obtained > total {
        return Err(DekhoError::validation("obtained marks exceed total"));
    }
    Ok(round2(obtained / total * 100.0))
}
