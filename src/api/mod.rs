use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    BreakEvenConfig, BreakEvenResult, BreakEvenVariable, Inputs, Projection, run_projection,
    solve_break_even,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum AnalysisMode {
    Projection,
    BreakEven,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiAnalysisMode {
    #[serde(alias = "derive")]
    Projection,
    #[serde(alias = "breakEven", alias = "break_even")]
    BreakEven,
}

impl From<ApiAnalysisMode> for AnalysisMode {
    fn from(value: ApiAnalysisMode) -> Self {
        match value {
            ApiAnalysisMode::Projection => AnalysisMode::Projection,
            ApiAnalysisMode::BreakEven => AnalysisMode::BreakEven,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ResponseMode {
    Projection,
    BreakEven,
}

impl From<AnalysisMode> for ResponseMode {
    fn from(value: AnalysisMode) -> Self {
        match value {
            AnalysisMode::Projection => ResponseMode::Projection,
            AnalysisMode::BreakEven => ResponseMode::BreakEven,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiBreakEvenVariable {
    Valuation,
    #[serde(alias = "soldValuePerShare", alias = "sold_value_per_share")]
    SoldValuePerShare,
    #[serde(alias = "exitProbability", alias = "exit_probability")]
    ExitProbability,
}

impl From<ApiBreakEvenVariable> for BreakEvenVariable {
    fn from(value: ApiBreakEvenVariable) -> Self {
        match value {
            ApiBreakEvenVariable::Valuation => BreakEvenVariable::Valuation,
            ApiBreakEvenVariable::SoldValuePerShare => BreakEvenVariable::SoldValuePerShare,
            ApiBreakEvenVariable::ExitProbability => BreakEvenVariable::ExitProbability,
        }
    }
}

impl From<BreakEvenVariable> for ApiBreakEvenVariable {
    fn from(value: BreakEvenVariable) -> Self {
        match value {
            BreakEvenVariable::Valuation => ApiBreakEvenVariable::Valuation,
            BreakEvenVariable::SoldValuePerShare => ApiBreakEvenVariable::SoldValuePerShare,
            BreakEvenVariable::ExitProbability => ApiBreakEvenVariable::ExitProbability,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    weekly_hours: Option<f64>,
    hourly_pay: Option<f64>,
    standard_hourly_pay: Option<f64>,
    percentage_of_stock: Option<f64>,
    strike_price: Option<f64>,
    sold_value_per_share: Option<f64>,
    valuation: Option<f64>,
    dilution: Option<f64>,
    exit_probability: Option<f64>,
    sold_after_years: Option<f64>,

    analysis_mode: Option<ApiAnalysisMode>,
    break_even_variable: Option<ApiBreakEvenVariable>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Parser, Debug)]
#[command(
    name = "optcomp",
    about = "Stock option grant vs hourly wage estimator under Italian tax rules"
)]
struct Cli {
    #[arg(long, default_value_t = 40.0, help = "Hours worked per week")]
    weekly_hours: f64,
    #[arg(
        long,
        default_value_t = 20.0,
        help = "Net hourly pay in the equity-bearing role"
    )]
    hourly_pay: f64,
    #[arg(
        long,
        default_value_t = 25.0,
        help = "Net hourly pay in the comparison role"
    )]
    standard_hourly_pay: f64,
    #[arg(
        long,
        default_value_t = 1.0,
        help = "Granted equity as percent of the fully diluted pool"
    )]
    percentage_of_stock: f64,
    #[arg(long, default_value_t = 0.0, help = "Exercise price per share")]
    strike_price: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Assumed sale price per share at exit"
    )]
    sold_value_per_share: f64,
    #[arg(
        long,
        default_value_t = 10_000_000.0,
        help = "Company valuation at the exit event"
    )]
    valuation: f64,
    #[arg(
        long,
        default_value_t = 30.0,
        help = "Expected additional dilution in percent"
    )]
    dilution: f64,
    #[arg(
        long,
        default_value_t = 20.0,
        help = "Probability of a liquidity event in percent"
    )]
    exit_probability: f64,
    #[arg(
        long,
        default_value_t = 4.0,
        help = "Years until sale assumed for annualization"
    )]
    sold_after_years: f64,
}

#[derive(Copy, Clone, Debug)]
struct ApiOptions {
    mode: AnalysisMode,
    break_even_variable: BreakEvenVariable,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: u32,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: Inputs,
    options: ApiOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BreakEvenSummary {
    variable: ApiBreakEvenVariable,
    search_min: f64,
    search_max: f64,
    solved_value: Option<f64>,
    iterations: u32,
    converged: bool,
    feasible: bool,
    message: String,
    solved_projection: Option<Projection>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    mode: ResponseMode,
    projection: Projection,
    break_even: Option<BreakEvenSummary>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(cli: Cli) -> Result<Inputs, String> {
    for (name, value) in [
        ("--weekly-hours", cli.weekly_hours),
        ("--hourly-pay", cli.hourly_pay),
        ("--standard-hourly-pay", cli.standard_hourly_pay),
        ("--percentage-of-stock", cli.percentage_of_stock),
        ("--strike-price", cli.strike_price),
        ("--sold-value-per-share", cli.sold_value_per_share),
        ("--valuation", cli.valuation),
        ("--dilution", cli.dilution),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    if !(0.0..=100.0).contains(&cli.exit_probability) {
        return Err("--exit-probability must be between 0 and 100".to_string());
    }

    if !cli.sold_after_years.is_finite() || cli.sold_after_years <= 0.0 {
        return Err("--sold-after-years must be > 0".to_string());
    }

    Ok(Inputs {
        weekly_hours: cli.weekly_hours,
        hourly_pay: cli.hourly_pay,
        standard_hourly_pay: cli.standard_hourly_pay,
        percentage_of_stock: cli.percentage_of_stock / 100.0,
        strike_price: cli.strike_price,
        sold_value_per_share: cli.sold_value_per_share,
        valuation: cli.valuation,
        dilution: cli.dilution / 100.0,
        exit_probability: cli.exit_probability / 100.0,
        sold_after_years: cli.sold_after_years,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("Stock option calculator listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let projection = run_projection(&request.inputs);
    let break_even = match request.options.mode {
        AnalysisMode::Projection => None,
        AnalysisMode::BreakEven => {
            let config = break_even_config(&request.options);
            match solve_break_even(&request.inputs, config) {
                Ok(result) => Some(break_even_summary(result)),
                Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
            }
        }
    };

    let response = ProjectResponse {
        mode: request.options.mode.into(),
        projection,
        break_even,
    };
    json_response(StatusCode::OK, response)
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();
    let mut options = ApiOptions {
        mode: AnalysisMode::Projection,
        break_even_variable: BreakEvenVariable::Valuation,
        search_min: None,
        search_max: None,
        tolerance: None,
        max_iterations: 64,
    };

    if let Some(v) = payload.weekly_hours {
        cli.weekly_hours = v;
    }
    if let Some(v) = payload.hourly_pay {
        cli.hourly_pay = v;
    }
    if let Some(v) = payload.standard_hourly_pay {
        cli.standard_hourly_pay = v;
    }
    if let Some(v) = payload.percentage_of_stock {
        cli.percentage_of_stock = v;
    }
    if let Some(v) = payload.strike_price {
        cli.strike_price = v;
    }
    if let Some(v) = payload.sold_value_per_share {
        cli.sold_value_per_share = v;
    }
    if let Some(v) = payload.valuation {
        cli.valuation = v;
    }
    if let Some(v) = payload.dilution {
        cli.dilution = v;
    }
    if let Some(v) = payload.exit_probability {
        cli.exit_probability = v;
    }
    if let Some(v) = payload.sold_after_years {
        cli.sold_after_years = v;
    }

    if let Some(v) = payload.analysis_mode {
        options.mode = v.into();
    }
    if let Some(v) = payload.break_even_variable {
        options.break_even_variable = v.into();
    }
    if let Some(v) = payload.search_min {
        options.search_min = Some(v);
    }
    if let Some(v) = payload.search_max {
        options.search_max = Some(v);
    }
    if let Some(v) = payload.tolerance {
        options.tolerance = Some(v);
    }
    if let Some(v) = payload.max_iterations {
        options.max_iterations = v;
    }

    let inputs = build_inputs(cli)?;
    Ok(ApiRequest { inputs, options })
}

fn default_cli_for_api() -> Cli {
    Cli {
        weekly_hours: 40.0,
        hourly_pay: 20.0,
        standard_hourly_pay: 25.0,
        percentage_of_stock: 1.0,
        strike_price: 0.0,
        sold_value_per_share: 0.0,
        valuation: 10_000_000.0,
        dilution: 30.0,
        exit_probability: 20.0,
        sold_after_years: 4.0,
    }
}

fn break_even_config(options: &ApiOptions) -> BreakEvenConfig {
    let (default_min, default_max) = match options.break_even_variable {
        BreakEvenVariable::Valuation => (0.0, 1_000_000_000.0),
        BreakEvenVariable::SoldValuePerShare => (0.0, 10_000.0),
        BreakEvenVariable::ExitProbability => (0.0, 100.0),
    };
    // Exit probability crosses the API boundary in percent, the solver works
    // in fractions.
    let scale = match options.break_even_variable {
        BreakEvenVariable::ExitProbability => 1.0 / 100.0,
        _ => 1.0,
    };

    let search_min = options.search_min.unwrap_or(default_min) * scale;
    let search_max = options.search_max.unwrap_or(default_max) * scale;
    let tolerance = options
        .tolerance
        .map(|t| t * scale)
        .unwrap_or((search_max - search_min).abs() * 1e-6);

    BreakEvenConfig {
        variable: options.break_even_variable,
        search_min,
        search_max,
        tolerance,
        max_iterations: options.max_iterations,
    }
}

fn break_even_summary(result: BreakEvenResult) -> BreakEvenSummary {
    let scale = match result.variable {
        BreakEvenVariable::ExitProbability => 100.0,
        _ => 1.0,
    };

    BreakEvenSummary {
        variable: result.variable.into(),
        search_min: result.search_min * scale,
        search_max: result.search_max * scale,
        solved_value: result.solved_value.map(|v| v * scale),
        iterations: result.iterations.len() as u32,
        converged: result.converged,
        feasible: result.feasible,
        message: result.message,
        solved_projection: result.solved_projection,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn build_inputs_converts_percent_units_to_fractions() {
        let mut cli = sample_cli();
        cli.percentage_of_stock = 8.0;
        cli.dilution = 30.0;
        cli.exit_probability = 20.0;

        let inputs = build_inputs(cli).expect("valid inputs");
        assert_approx(inputs.percentage_of_stock, 0.08);
        assert_approx(inputs.dilution, 0.30);
        assert_approx(inputs.exit_probability, 0.20);
    }

    #[test]
    fn build_inputs_rejects_negative_values() {
        let mut cli = sample_cli();
        cli.hourly_pay = -1.0;

        let err = build_inputs(cli).expect_err("must reject negative pay");
        assert!(err.contains("--hourly-pay"));
    }

    #[test]
    fn build_inputs_rejects_out_of_range_exit_probability() {
        let mut cli = sample_cli();
        cli.exit_probability = 150.0;

        let err = build_inputs(cli).expect_err("must reject probability above 100");
        assert!(err.contains("--exit-probability"));
    }

    #[test]
    fn build_inputs_rejects_nonpositive_sold_after_years() {
        let mut cli = sample_cli();
        cli.sold_after_years = 0.0;

        let err = build_inputs(cli).expect_err("must reject zero holding period");
        assert!(err.contains("--sold-after-years"));
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "weeklyHours": 12,
          "hourlyPay": 12,
          "standardHourlyPay": 24,
          "percentageOfStock": 8,
          "strikePrice": 10,
          "soldValuePerShare": 30,
          "valuation": 5000000,
          "dilution": 30,
          "exitProbability": 20,
          "soldAfterYears": 4
        }"#;
        let request = api_request_from_json(json).expect("json should parse");
        let inputs = request.inputs;

        assert_approx(inputs.weekly_hours, 12.0);
        assert_approx(inputs.hourly_pay, 12.0);
        assert_approx(inputs.standard_hourly_pay, 24.0);
        assert_approx(inputs.percentage_of_stock, 0.08);
        assert_approx(inputs.strike_price, 10.0);
        assert_approx(inputs.sold_value_per_share, 30.0);
        assert_approx(inputs.valuation, 5_000_000.0);
        assert_approx(inputs.dilution, 0.30);
        assert_approx(inputs.exit_probability, 0.20);
        assert_approx(inputs.sold_after_years, 4.0);
        assert_eq!(request.options.mode, AnalysisMode::Projection);
    }

    #[test]
    fn api_request_from_json_parses_break_even_options() {
        let json = r#"{
          "analysisMode": "break-even",
          "breakEvenVariable": "exitProbability",
          "searchMin": 0,
          "searchMax": 100,
          "tolerance": 0.01,
          "maxIterations": 50
        }"#;
        let request = api_request_from_json(json).expect("json should parse");

        assert_eq!(request.options.mode, AnalysisMode::BreakEven);
        assert_eq!(
            request.options.break_even_variable,
            BreakEvenVariable::ExitProbability
        );
        assert_eq!(request.options.search_min, Some(0.0));
        assert_eq!(request.options.search_max, Some(100.0));
        assert_eq!(request.options.tolerance, Some(0.01));
        assert_eq!(request.options.max_iterations, 50);
    }

    #[test]
    fn api_request_rejects_invalid_inputs() {
        let json = r#"{"weeklyHours": -5}"#;
        let err = api_request_from_json(json).expect_err("must reject negative hours");
        assert!(err.contains("--weekly-hours"));
    }

    #[test]
    fn break_even_config_scales_exit_probability_to_fractions() {
        let options = ApiOptions {
            mode: AnalysisMode::BreakEven,
            break_even_variable: BreakEvenVariable::ExitProbability,
            search_min: Some(0.0),
            search_max: Some(100.0),
            tolerance: Some(0.01),
            max_iterations: 50,
        };

        let config = break_even_config(&options);
        assert_approx(config.search_min, 0.0);
        assert_approx(config.search_max, 1.0);
        assert_approx(config.tolerance, 0.000_1);
        assert_eq!(config.max_iterations, 50);
    }

    #[test]
    fn project_response_serialization_contains_expected_fields() {
        let request = api_request_from_json("{}").expect("defaults should parse");
        let response = ProjectResponse {
            mode: request.options.mode.into(),
            projection: run_projection(&request.inputs),
            break_even: None,
        };

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"mode\":\"projection\""));
        assert!(json.contains("\"projection\""));
        assert!(json.contains("\"stockOptions\""));
        assert!(json.contains("\"effectiveTaxRate\""));
        assert!(json.contains("\"compensationDifference\""));
    }

    #[test]
    fn break_even_summary_reports_exit_probability_in_percent() {
        let json = r#"{
          "weeklyHours": 40,
          "hourlyPay": 10,
          "standardHourlyPay": 20,
          "percentageOfStock": 1,
          "strikePrice": 0,
          "soldValuePerShare": 500,
          "valuation": 0,
          "dilution": 0,
          "exitProbability": 50,
          "soldAfterYears": 4,
          "analysisMode": "break-even",
          "breakEvenVariable": "exit-probability",
          "tolerance": 0.01
        }"#;
        let request = api_request_from_json(json).expect("json should parse");
        let config = break_even_config(&request.options);
        let result = solve_break_even(&request.inputs, config).expect("must solve");
        let summary = break_even_summary(result);

        assert!(summary.feasible);
        assert!(summary.converged);
        let solved = summary.solved_value.expect("value expected");
        assert!(
            (solved - 100.0 * 20_800.0 / 92_500.0).abs() <= 0.02,
            "unexpected break-even probability {solved}"
        );
        assert!(summary.solved_projection.is_some());

        let json = serde_json::to_string(&summary).expect("summary should serialize");
        assert!(json.contains("\"variable\":\"exit-probability\""));
        assert!(json.contains("\"solvedValue\""));
    }
}
