//! Built-in financial calculators
//!
//! Pure functions over an argument map. Rates are percentages (12 means 12%),
//! money values are rounded to two decimals. Every calculator returns
//! `Result<Value, ValidationError>` and is registered through
//! [`FunctionTool::calculator`], which adds the success/failure envelope.

use serde_json::{json, Map, Value};

use super::{FunctionTool, ToolRegistry, ToolSpec, ValidationError};

type Calculator = fn(&Map<String, Value>) -> Result<Value, ValidationError>;

/// Longest accepted horizon. Schedules emit one row per month or year.
const MAX_YEARS: u32 = 100;

/// Register every calculator in this module.
pub fn register(registry: &mut ToolRegistry) {
    for (spec, calculate) in catalog() {
        registry.register(FunctionTool::calculator(spec, calculate));
    }
}

fn catalog() -> Vec<(ToolSpec, Calculator)> {
    vec![
        // ── Math ────────────────────────────────────────────────────────────
        (
            spec(
                "calculate_sip_future_value",
                "Future value of a monthly SIP (systematic investment plan).",
                &[
                    ("monthly_investment", "number", "Amount invested every month"),
                    ("annual_return", "number", "Expected annual return in percent"),
                    ("years", "integer", "Investment horizon in years"),
                ],
                &["monthly_investment", "annual_return", "years"],
            ),
            sip_future_value as Calculator,
        ),
        (
            spec(
                "calculate_emi",
                "Monthly EMI, total payment and total interest for a loan.",
                &[
                    ("principal", "number", "Loan amount"),
                    ("annual_rate", "number", "Annual interest rate in percent"),
                    ("years", "integer", "Loan tenure in years"),
                ],
                &["principal", "annual_rate", "years"],
            ),
            emi as Calculator,
        ),
        (
            spec(
                "generate_amortization_schedule",
                "Month-by-month interest, principal and balance for a loan.",
                &[
                    ("principal", "number", "Loan amount"),
                    ("annual_rate", "number", "Annual interest rate in percent"),
                    ("years", "integer", "Loan tenure in years"),
                ],
                &["principal", "annual_rate", "years"],
            ),
            amortization_schedule as Calculator,
        ),
        (
            spec(
                "inflation_adjusted_value",
                "What a present amount will cost after inflation.",
                &[
                    ("present_value", "number", "Amount in today's money"),
                    ("inflation_rate", "number", "Annual inflation in percent"),
                    ("years", "integer", "Number of years"),
                ],
                &["present_value", "inflation_rate", "years"],
            ),
            inflation_adjusted_value as Calculator,
        ),
        (
            spec(
                "real_rate_of_return",
                "Inflation-adjusted (real) rate of return.",
                &[
                    ("nominal_return", "number", "Nominal annual return in percent"),
                    ("inflation_rate", "number", "Annual inflation in percent"),
                ],
                &["nominal_return", "inflation_rate"],
            ),
            real_rate_of_return as Calculator,
        ),
        (
            spec(
                "retirement_corpus_required",
                "Corpus needed to fund yearly expenses through retirement.",
                &[
                    ("annual_expense", "number", "Yearly expense in retirement"),
                    ("years_after_retirement", "integer", "Years the corpus must last"),
                    ("annual_return", "number", "Return on the corpus in percent"),
                ],
                &["annual_expense", "years_after_retirement", "annual_return"],
            ),
            retirement_corpus_required as Calculator,
        ),
        (
            spec(
                "required_sip_for_goal",
                "Monthly SIP needed to reach a target amount.",
                &[
                    ("target_amount", "number", "Goal amount"),
                    ("annual_return", "number", "Expected annual return in percent"),
                    ("years", "integer", "Years to the goal"),
                ],
                &["target_amount", "annual_return", "years"],
            ),
            required_sip_for_goal as Calculator,
        ),
        (
            spec(
                "calculate_cagr",
                "Compound annual growth rate between two values.",
                &[
                    ("initial_value", "number", "Starting value"),
                    ("final_value", "number", "Ending value"),
                    ("years", "integer", "Years between the two values"),
                ],
                &["initial_value", "final_value", "years"],
            ),
            cagr as Calculator,
        ),
        // ── Expense ─────────────────────────────────────────────────────────
        (
            spec(
                "calculate_savings_rate",
                "Monthly savings and savings rate from income and expenses.",
                &[
                    ("monthly_income", "number", "Take-home income per month"),
                    ("monthly_expenses", "number", "Spending per month"),
                ],
                &["monthly_income", "monthly_expenses"],
            ),
            savings_rate as Calculator,
        ),
        (
            spec(
                "calculate_emergency_fund",
                "Recommended emergency fund size.",
                &[
                    ("monthly_expenses", "number", "Spending per month"),
                    ("months", "integer", "Months of expenses to cover (default 6)"),
                ],
                &["monthly_expenses"],
            ),
            emergency_fund as Calculator,
        ),
        (
            spec(
                "estimate_investment_capacity",
                "Monthly surplus available for investing and remaining emergency-fund gap.",
                &[
                    ("monthly_income", "number", "Take-home income per month"),
                    ("monthly_expenses", "number", "Spending per month"),
                    ("emergency_fund_goal", "number", "Target emergency fund (default 0)"),
                    ("current_emergency_savings", "number", "Emergency savings so far (default 0)"),
                ],
                &["monthly_income", "monthly_expenses"],
            ),
            investment_capacity as Calculator,
        ),
        (
            spec(
                "check_retirement_affordability",
                "How much of the required retirement corpus is already funded.",
                &[
                    ("current_savings", "number", "Retirement savings today"),
                    ("required_corpus", "number", "Corpus needed at retirement"),
                ],
                &["current_savings", "required_corpus"],
            ),
            retirement_affordability as Calculator,
        ),
        // ── Investment ──────────────────────────────────────────────────────
        (
            spec(
                "simulate_lump_sum_growth",
                "Year-by-year value of a one-time investment.",
                &[
                    ("initial_investment", "number", "Amount invested once"),
                    ("annual_return", "number", "Expected annual return in percent"),
                    ("years", "integer", "Number of years"),
                ],
                &["initial_investment", "annual_return", "years"],
            ),
            lump_sum_growth as Calculator,
        ),
        (
            spec(
                "simulate_sip_growth",
                "Year-by-year invested amount and value of a monthly SIP.",
                &[
                    ("monthly_investment", "number", "Amount invested every month"),
                    ("annual_return", "number", "Expected annual return in percent"),
                    ("years", "integer", "Number of years"),
                ],
                &["monthly_investment", "annual_return", "years"],
            ),
            sip_growth as Calculator,
        ),
        (
            spec(
                "simulate_step_up_sip",
                "Year-by-year growth of a SIP whose contribution rises every year.",
                &[
                    ("monthly_investment", "number", "Starting monthly contribution"),
                    ("annual_step_up_percent", "number", "Yearly increase of the contribution in percent"),
                    ("annual_return", "number", "Expected annual return in percent"),
                    ("years", "integer", "Number of years"),
                ],
                &["monthly_investment", "annual_step_up_percent", "annual_return", "years"],
            ),
            step_up_sip as Calculator,
        ),
        (
            spec(
                "simulate_portfolio_allocation",
                "Year-by-year value of an equity/debt split portfolio.",
                &[
                    ("initial_investment", "number", "Amount invested once"),
                    ("equity_percent", "number", "Share of equity, 0-100"),
                    ("equity_return", "number", "Annual equity return in percent"),
                    ("debt_return", "number", "Annual debt return in percent"),
                    ("years", "integer", "Number of years"),
                ],
                &["initial_investment", "equity_percent", "equity_return", "debt_return", "years"],
            ),
            portfolio_allocation as Calculator,
        ),
    ]
}

fn spec(name: &str, description: &str, params: &[(&str, &str, &str)], required: &[&str]) -> ToolSpec {
    let properties: Map<String, Value> = params
        .iter()
        .map(|(field, kind, doc)| {
            (
                field.to_string(),
                json!({ "type": kind, "description": doc }),
            )
        })
        .collect();

    ToolSpec {
        name: name.to_string(),
        description: description.to_string(),
        parameters: json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument access
// ─────────────────────────────────────────────────────────────────────────────

/// Typed, validated view over a tool argument map
struct Args<'a>(&'a Map<String, Value>);

impl Args<'_> {
    /// Required non-negative number. Numeric strings are accepted.
    fn amount(&self, field: &str) -> Result<f64, ValidationError> {
        self.optional_amount(field)?
            .ok_or_else(|| ValidationError::new(format!("{} is required.", field)))
    }

    fn amount_or(&self, field: &str, default: f64) -> Result<f64, ValidationError> {
        Ok(self.optional_amount(field)?.unwrap_or(default))
    }

    fn optional_amount(&self, field: &str) -> Result<Option<f64>, ValidationError> {
        let value = match self.0.get(field) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        let value = value
            .filter(|v| v.is_finite())
            .ok_or_else(|| ValidationError::new(format!("{} must be a number.", field)))?;
        if value < 0.0 {
            return Err(ValidationError::new(format!("{} must be non-negative.", field)));
        }
        Ok(Some(value))
    }

    /// Required non-negative whole number
    fn whole(&self, field: &str) -> Result<u32, ValidationError> {
        to_whole(field, self.amount(field)?)
    }

    fn whole_or(&self, field: &str, default: u32) -> Result<u32, ValidationError> {
        match self.optional_amount(field)? {
            Some(v) => to_whole(field, v),
            None => Ok(default),
        }
    }

    /// Horizon in years, at most [`MAX_YEARS`]
    fn years(&self, field: &str) -> Result<u32, ValidationError> {
        let value = self.whole(field)?;
        if value > MAX_YEARS {
            return Err(ValidationError::new(format!(
                "{} must be at most {}.",
                field, MAX_YEARS
            )));
        }
        Ok(value)
    }

    /// Horizon that must be at least one year
    fn positive_years(&self, field: &str) -> Result<u32, ValidationError> {
        let value = self.years(field)?;
        if value == 0 {
            return Err(ValidationError::new(format!("{} must be at least 1.", field)));
        }
        Ok(value)
    }
}

fn to_whole(field: &str, value: f64) -> Result<u32, ValidationError> {
    if value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(ValidationError::new(format!("{} must be a whole number.", field)));
    }
    Ok(value as u32)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ─────────────────────────────────────────────────────────────────────────────
// Math
// ─────────────────────────────────────────────────────────────────────────────

fn sip_future_value(args: &Map<String, Value>) -> Result<Value, ValidationError> {
    let args = Args(args);
    let monthly = args.amount("monthly_investment")?;
    let annual_return = args.amount("annual_return")?;
    let years = args.years("years")?;

    let future_value = sip_value(monthly, annual_return / 100.0 / 12.0, years * 12);
    let total_invested = monthly * f64::from(years * 12);

    Ok(json!({
        "total_invested": round2(total_invested),
        "future_value": round2(future_value),
        "total_gain": round2(future_value - total_invested),
    }))
}

/// Future value of `months` contributions made at the start of each month
fn sip_value(monthly: f64, monthly_rate: f64, months: u32) -> f64 {
    let n = f64::from(months);
    if monthly_rate == 0.0 {
        monthly * n
    } else {
        monthly * (((1.0 + monthly_rate).powf(n) - 1.0) / monthly_rate) * (1.0 + monthly_rate)
    }
}

fn emi_amount(principal: f64, monthly_rate: f64, months: u32) -> f64 {
    let n = f64::from(months);
    if monthly_rate == 0.0 {
        principal / n
    } else {
        let growth = (1.0 + monthly_rate).powf(n);
        principal * monthly_rate * growth / (growth - 1.0)
    }
}

fn emi(args: &Map<String, Value>) -> Result<Value, ValidationError> {
    let args = Args(args);
    let principal = args.amount("principal")?;
    let annual_rate = args.amount("annual_rate")?;
    let months = args.positive_years("years")? * 12;

    let emi = emi_amount(principal, annual_rate / 100.0 / 12.0, months);
    let total_payment = emi * f64::from(months);

    Ok(json!({
        "emi": round2(emi),
        "total_payment": round2(total_payment),
        "total_interest": round2(total_payment - principal),
    }))
}

fn amortization_schedule(args: &Map<String, Value>) -> Result<Value, ValidationError> {
    let args = Args(args);
    let principal = args.amount("principal")?;
    let annual_rate = args.amount("annual_rate")?;
    let months = args.positive_years("years")? * 12;

    let rate = annual_rate / 100.0 / 12.0;
    let emi = emi_amount(principal, rate, months);
    let mut balance = principal;

    let schedule: Vec<Value> = (1..=months)
        .map(|month| {
            let interest = balance * rate;
            let principal_paid = emi - interest;
            balance -= principal_paid;
            json!({
                "month": month,
                "interest": round2(interest),
                "principal_paid": round2(principal_paid),
                "remaining_balance": round2(balance.max(0.0)),
            })
        })
        .collect();

    Ok(json!({ "emi": round2(emi), "schedule": schedule }))
}

fn inflation_adjusted_value(args: &Map<String, Value>) -> Result<Value, ValidationError> {
    let args = Args(args);
    let present_value = args.amount("present_value")?;
    let inflation = args.amount("inflation_rate")?;
    let years = args.years("years")?;

    let future_value = present_value * (1.0 + inflation / 100.0).powf(f64::from(years));
    Ok(json!({ "future_value": round2(future_value) }))
}

fn real_rate_of_return(args: &Map<String, Value>) -> Result<Value, ValidationError> {
    let args = Args(args);
    let nominal = args.amount("nominal_return")?;
    let inflation = args.amount("inflation_rate")?;

    let real = ((1.0 + nominal / 100.0) / (1.0 + inflation / 100.0) - 1.0) * 100.0;
    Ok(json!({ "real_return_percent": round2(real) }))
}

fn retirement_corpus_required(args: &Map<String, Value>) -> Result<Value, ValidationError> {
    let args = Args(args);
    let expense = args.amount("annual_expense")?;
    let years = f64::from(args.years("years_after_retirement")?);
    let rate = args.amount("annual_return")? / 100.0;

    let corpus = if rate == 0.0 {
        expense * years
    } else {
        expense * ((1.0 - (1.0 + rate).powf(-years)) / rate)
    };
    Ok(json!({ "required_corpus": round2(corpus) }))
}

fn required_sip_for_goal(args: &Map<String, Value>) -> Result<Value, ValidationError> {
    let args = Args(args);
    let target = args.amount("target_amount")?;
    let annual_return = args.amount("annual_return")?;
    let months = args.positive_years("years")? * 12;

    let per_unit = sip_value(1.0, annual_return / 100.0 / 12.0, months);
    Ok(json!({ "required_monthly_investment": round2(target / per_unit) }))
}

fn cagr(args: &Map<String, Value>) -> Result<Value, ValidationError> {
    let args = Args(args);
    let initial = args.amount("initial_value")?;
    let final_value = args.amount("final_value")?;
    let years = args.positive_years("years")?;
    if initial == 0.0 {
        return Err(ValidationError::new("initial_value must be greater than zero."));
    }

    let rate = ((final_value / initial).powf(1.0 / f64::from(years)) - 1.0) * 100.0;
    Ok(json!({ "cagr_percent": round2(rate) }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Expense
// ─────────────────────────────────────────────────────────────────────────────

fn savings_rate(args: &Map<String, Value>) -> Result<Value, ValidationError> {
    let args = Args(args);
    let income = args.amount("monthly_income")?;
    let expenses = args.amount("monthly_expenses")?;
    if expenses > income {
        return Err(ValidationError::new("Expenses cannot exceed income."));
    }
    if income == 0.0 {
        return Err(ValidationError::new("monthly_income must be greater than zero."));
    }

    let savings = income - expenses;
    Ok(json!({
        "monthly_savings": round2(savings),
        "savings_rate_percent": round2(savings / income * 100.0),
    }))
}

fn emergency_fund(args: &Map<String, Value>) -> Result<Value, ValidationError> {
    let args = Args(args);
    let expenses = args.amount("monthly_expenses")?;
    let months = args.whole_or("months", 6)?;

    Ok(json!({
        "recommended_emergency_fund": round2(expenses * f64::from(months)),
        "months_covered": months,
    }))
}

fn investment_capacity(args: &Map<String, Value>) -> Result<Value, ValidationError> {
    let args = Args(args);
    let income = args.amount("monthly_income")?;
    let expenses = args.amount("monthly_expenses")?;
    let goal = args.amount_or("emergency_fund_goal", 0.0)?;
    let current = args.amount_or("current_emergency_savings", 0.0)?;

    let surplus = income - expenses;
    if surplus <= 0.0 {
        return Err(ValidationError::new("No surplus available for investment."));
    }

    Ok(json!({
        "monthly_surplus": round2(surplus),
        "emergency_gap": round2((goal - current).max(0.0)),
        "available_for_investment": round2(surplus),
    }))
}

fn retirement_affordability(args: &Map<String, Value>) -> Result<Value, ValidationError> {
    let args = Args(args);
    let savings = args.amount("current_savings")?;
    let required = args.amount("required_corpus")?;
    if required == 0.0 {
        return Err(ValidationError::new("required_corpus must be greater than zero."));
    }

    let funded = savings / required * 100.0;
    Ok(json!({
        "funded_percent": round2(funded),
        "is_on_track": funded >= 100.0,
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Investment simulations
// ─────────────────────────────────────────────────────────────────────────────

fn lump_sum_growth(args: &Map<String, Value>) -> Result<Value, ValidationError> {
    let args = Args(args);
    let initial = args.amount("initial_investment")?;
    let growth = 1.0 + args.amount("annual_return")? / 100.0;
    let years = args.years("years")?;

    let mut value = initial;
    let yearly_data: Vec<Value> = (1..=years)
        .map(|year| {
            value *= growth;
            json!({ "year": year, "value": round2(value) })
        })
        .collect();

    Ok(json!({ "initial_investment": initial, "yearly_data": yearly_data }))
}

/// Yearly contributions compounded annually, with the contribution growing by
/// `step_up` (a fraction) after each year.
fn contribution_schedule(monthly: f64, step_up: f64, annual_return: f64, years: u32) -> Vec<Value> {
    let mut monthly = monthly;
    let mut invested = 0.0;
    let mut value = 0.0;

    (1..=years)
        .map(|year| {
            let contribution = monthly * 12.0;
            invested += contribution;
            value = (value + contribution) * (1.0 + annual_return);
            monthly *= 1.0 + step_up;
            json!({
                "year": year,
                "invested": round2(invested),
                "value": round2(value),
            })
        })
        .collect()
}

fn sip_growth(args: &Map<String, Value>) -> Result<Value, ValidationError> {
    let args = Args(args);
    let monthly = args.amount("monthly_investment")?;
    let annual_return = args.amount("annual_return")? / 100.0;
    let years = args.years("years")?;

    Ok(json!({ "yearly_data": contribution_schedule(monthly, 0.0, annual_return, years) }))
}

fn step_up_sip(args: &Map<String, Value>) -> Result<Value, ValidationError> {
    let args = Args(args);
    let monthly = args.amount("monthly_investment")?;
    let step_up = args.amount("annual_step_up_percent")? / 100.0;
    let annual_return = args.amount("annual_return")? / 100.0;
    let years = args.years("years")?;

    Ok(json!({ "yearly_data": contribution_schedule(monthly, step_up, annual_return, years) }))
}

fn portfolio_allocation(args: &Map<String, Value>) -> Result<Value, ValidationError> {
    let args = Args(args);
    let initial = args.amount("initial_investment")?;
    let equity_share = args.amount("equity_percent")? / 100.0;
    let equity_growth = 1.0 + args.amount("equity_return")? / 100.0;
    let debt_growth = 1.0 + args.amount("debt_return")? / 100.0;
    let years = args.years("years")?;
    if equity_share > 1.0 {
        return Err(ValidationError::new("equity_percent must be between 0 and 100."));
    }

    let mut equity = initial * equity_share;
    let mut debt = initial - equity;
    let yearly_data: Vec<Value> = (1..=years)
        .map(|year| {
            equity *= equity_growth;
            debt *= debt_growth;
            json!({
                "year": year,
                "equity": round2(equity),
                "debt": round2(debt),
                "value": round2(equity + debt),
            })
        })
        .collect();

    Ok(json!({ "yearly_data": yearly_data }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("args must be an object"),
        }
    }

    #[test]
    fn test_sip_future_value() {
        let out = sip_future_value(&args(json!({
            "monthly_investment": 1000, "annual_return": 12, "years": 1
        })))
        .unwrap();
        assert_eq!(out["total_invested"], 12000.0);
        // 1000 * ((1.01^12 - 1) / 0.01) * 1.01
        assert_eq!(out["future_value"], 12809.33);
        assert_eq!(out["total_gain"], 809.33);
    }

    #[test]
    fn test_sip_zero_return() {
        let out = sip_future_value(&args(json!({
            "monthly_investment": 500, "annual_return": 0, "years": 2
        })))
        .unwrap();
        assert_eq!(out["future_value"], 12000.0);
    }

    #[test]
    fn test_emi() {
        let out = emi(&args(json!({ "principal": 120000, "annual_rate": 0, "years": 1 }))).unwrap();
        assert_eq!(out["emi"], 10000.0);
        assert_eq!(out["total_interest"], 0.0);

        let out = emi(&args(json!({ "principal": 100000, "annual_rate": 12, "years": 1 }))).unwrap();
        assert_eq!(out["emi"], 8884.88);
    }

    #[test]
    fn test_amortization_pays_down_to_zero() {
        let out = amortization_schedule(&args(json!({
            "principal": 100000, "annual_rate": 10, "years": 2
        })))
        .unwrap();
        let schedule = out["schedule"].as_array().unwrap();
        assert_eq!(schedule.len(), 24);
        assert_eq!(schedule[23]["remaining_balance"], 0.0);
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let out = inflation_adjusted_value(&args(json!({
            "present_value": "100", "inflation_rate": "10", "years": "2"
        })))
        .unwrap();
        assert_eq!(out["future_value"], 121.0);
    }

    #[test]
    fn test_validation_errors() {
        let err = emi(&args(json!({ "principal": -1, "annual_rate": 5, "years": 1 }))).unwrap_err();
        assert_eq!(err.to_string(), "principal must be non-negative.");

        let err = emi(&args(json!({ "annual_rate": 5, "years": 1 }))).unwrap_err();
        assert_eq!(err.to_string(), "principal is required.");

        let err = emi(&args(json!({ "principal": 1, "annual_rate": 5, "years": 0 }))).unwrap_err();
        assert_eq!(err.to_string(), "years must be at least 1.");

        let err = sip_growth(&args(json!({
            "monthly_investment": 1, "annual_return": 5, "years": 1.5
        })))
        .unwrap_err();
        assert_eq!(err.to_string(), "years must be a whole number.");
    }

    #[test]
    fn test_horizon_is_capped() {
        let err = sip_future_value(&args(json!({
            "monthly_investment": 1000, "annual_return": 12, "years": 400000000
        })))
        .unwrap_err();
        assert_eq!(err.to_string(), "years must be at most 100.");

        let err = amortization_schedule(&args(json!({
            "principal": 100000, "annual_rate": 10, "years": 300000000
        })))
        .unwrap_err();
        assert_eq!(err.to_string(), "years must be at most 100.");

        for simulate in [lump_sum_growth as Calculator, sip_growth, portfolio_allocation] {
            assert!(simulate(&args(json!({
                "initial_investment": 1, "monthly_investment": 1, "annual_return": 5,
                "equity_percent": 50, "equity_return": 5, "debt_return": 5,
                "years": 300000000
            })))
            .is_err());
        }

        let out = amortization_schedule(&args(json!({
            "principal": 100000, "annual_rate": 10, "years": 100
        })))
        .unwrap();
        assert_eq!(out["schedule"].as_array().unwrap().len(), 1200);
    }

    #[test]
    fn test_savings_rate() {
        let out = savings_rate(&args(json!({ "monthly_income": 5000, "monthly_expenses": 4000 }))).unwrap();
        assert_eq!(out["monthly_savings"], 1000.0);
        assert_eq!(out["savings_rate_percent"], 20.0);

        let err = savings_rate(&args(json!({ "monthly_income": 1, "monthly_expenses": 2 }))).unwrap_err();
        assert_eq!(err.to_string(), "Expenses cannot exceed income.");
    }

    #[test]
    fn test_emergency_fund_default_months() {
        let out = emergency_fund(&args(json!({ "monthly_expenses": 2000 }))).unwrap();
        assert_eq!(out["recommended_emergency_fund"], 12000.0);
        assert_eq!(out["months_covered"], 6);
    }

    #[test]
    fn test_investment_capacity() {
        let out = investment_capacity(&args(json!({
            "monthly_income": 6000, "monthly_expenses": 4000,
            "emergency_fund_goal": 10000, "current_emergency_savings": 12000
        })))
        .unwrap();
        assert_eq!(out["available_for_investment"], 2000.0);
        assert_eq!(out["emergency_gap"], 0.0);

        assert!(investment_capacity(&args(json!({
            "monthly_income": 4000, "monthly_expenses": 4000
        })))
        .is_err());
    }

    #[test]
    fn test_retirement_helpers() {
        let out = retirement_affordability(&args(json!({
            "current_savings": 500000, "required_corpus": 1000000
        })))
        .unwrap();
        assert_eq!(out["funded_percent"], 50.0);
        assert_eq!(out["is_on_track"], false);

        let out = retirement_corpus_required(&args(json!({
            "annual_expense": 10000, "years_after_retirement": 10, "annual_return": 0
        })))
        .unwrap();
        assert_eq!(out["required_corpus"], 100000.0);
    }

    #[test]
    fn test_cagr_and_real_return() {
        let out = cagr(&args(json!({ "initial_value": 100, "final_value": 121, "years": 2 }))).unwrap();
        assert_eq!(out["cagr_percent"], 10.0);

        let out = real_rate_of_return(&args(json!({ "nominal_return": 10, "inflation_rate": 10 }))).unwrap();
        assert_eq!(out["real_return_percent"], 0.0);
    }

    #[test]
    fn test_required_sip_inverts_future_value() {
        let out = required_sip_for_goal(&args(json!({
            "target_amount": 12809.33, "annual_return": 12, "years": 1
        })))
        .unwrap();
        assert_eq!(out["required_monthly_investment"], 1000.0);
    }

    #[test]
    fn test_simulations_produce_yearly_rows() {
        let out = lump_sum_growth(&args(json!({
            "initial_investment": 1000, "annual_return": 10, "years": 2
        })))
        .unwrap();
        assert_eq!(out["yearly_data"][1]["value"], 1210.0);

        let out = step_up_sip(&args(json!({
            "monthly_investment": 100, "annual_step_up_percent": 10,
            "annual_return": 0, "years": 2
        })))
        .unwrap();
        assert_eq!(out["yearly_data"][1]["invested"], 2520.0);

        let out = portfolio_allocation(&args(json!({
            "initial_investment": 1000, "equity_percent": 60,
            "equity_return": 10, "debt_return": 5, "years": 1
        })))
        .unwrap();
        assert_eq!(out["yearly_data"][0]["value"], 1080.0);
    }
}
