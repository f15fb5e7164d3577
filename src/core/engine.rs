use super::types::{Inputs, Projection};

/// Fully diluted pool before any additional dilution is applied.
pub const TOTAL_SHARES: f64 = 100_000.0;
/// Italian flat rate on capital gains.
pub const CAPITAL_GAINS_TAX_RATE: f64 = 0.26;
/// Italian top marginal rate on employment income, applied to the exercise spread.
pub const EMPLOYMENT_INCOME_TAX_RATE: f64 = 0.43;
pub const WEEKS_PER_YEAR: f64 = 52.0;

/// Derives the full output record from the current inputs. Pure and total:
/// any finite input set produces a finite record, with zero or invalid
/// denominators reported as 0 rather than NaN/Infinity.
pub fn run_projection(inputs: &Inputs) -> Projection {
    let diluted_shares = TOTAL_SHARES * (1.0 + inputs.dilution);
    let stock_options = (TOTAL_SHARES * inputs.percentage_of_stock).round();
    let final_share_value = safe_div(inputs.valuation, diluted_shares);

    // Negative taxable bases clamp to zero; options never produce a refund.
    let exercise_taxable_amount =
        (final_share_value - inputs.strike_price).max(0.0) * stock_options;
    let exercise_tax = exercise_taxable_amount * EMPLOYMENT_INCOME_TAX_RATE;
    let capital_gains_taxable_amount =
        (inputs.sold_value_per_share - final_share_value).max(0.0) * stock_options;
    let capital_gains_tax = capital_gains_taxable_amount * CAPITAL_GAINS_TAX_RATE;
    let total_tax = exercise_tax + capital_gains_tax;

    let gross_equity_value = (final_share_value - inputs.strike_price) * stock_options;
    let cost_of_buying_options = inputs.strike_price * stock_options;
    let gross_sold_stock_value = inputs.sold_value_per_share * stock_options;
    let effective_tax_rate = safe_div(total_tax, gross_sold_stock_value) * 100.0;

    let net_equity_value = gross_equity_value - exercise_tax;
    let net_sold_value = gross_sold_stock_value - total_tax - cost_of_buying_options;
    let yearly_sold_value = safe_div(net_sold_value, inputs.sold_after_years);

    let yearly_hourly_comp = inputs.hourly_pay * inputs.weekly_hours * WEEKS_PER_YEAR;
    let standard_yearly_comp = inputs.standard_hourly_pay * inputs.weekly_hours * WEEKS_PER_YEAR;

    let weighted_net_sold_value = inputs.exit_probability * net_sold_value;
    let weighted_yearly_net_sold_value = inputs.exit_probability * yearly_sold_value;
    let total_yearly_comp = yearly_hourly_comp + yearly_sold_value * inputs.exit_probability;
    let compensation_difference = total_yearly_comp - standard_yearly_comp;

    Projection {
        diluted_shares,
        stock_options,
        final_share_value,
        exercise_taxable_amount,
        exercise_tax,
        capital_gains_taxable_amount,
        capital_gains_tax,
        total_tax,
        gross_equity_value,
        cost_of_buying_options,
        gross_sold_stock_value,
        effective_tax_rate,
        net_equity_value,
        net_sold_value,
        yearly_sold_value,
        yearly_hourly_comp,
        standard_yearly_comp,
        weighted_net_sold_value,
        weighted_yearly_net_sold_value,
        total_yearly_comp,
        compensation_difference,
    }
}

// Zero or non-finite denominators yield 0, keeping the projection total.
fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 && denominator.is_finite() {
        numerator / denominator
    } else {
        0.0
    }
}
