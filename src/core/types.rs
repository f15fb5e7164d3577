use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Inputs {
    pub weekly_hours: f64,
    pub hourly_pay: f64,
    pub standard_hourly_pay: f64,
    pub percentage_of_stock: f64,
    pub strike_price: f64,
    pub sold_value_per_share: f64,
    pub valuation: f64,
    pub dilution: f64,
    pub exit_probability: f64,
    pub sold_after_years: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub diluted_shares: f64,
    pub stock_options: f64,
    pub final_share_value: f64,
    pub exercise_taxable_amount: f64,
    pub exercise_tax: f64,
    pub capital_gains_taxable_amount: f64,
    pub capital_gains_tax: f64,
    pub total_tax: f64,
    pub gross_equity_value: f64,
    pub cost_of_buying_options: f64,
    pub gross_sold_stock_value: f64,
    pub effective_tax_rate: f64,
    pub net_equity_value: f64,
    pub net_sold_value: f64,
    pub yearly_sold_value: f64,
    pub yearly_hourly_comp: f64,
    pub standard_yearly_comp: f64,
    pub weighted_net_sold_value: f64,
    pub weighted_yearly_net_sold_value: f64,
    pub total_yearly_comp: f64,
    pub compensation_difference: f64,
}
