use chrono::NaiveDate;

use crate::domain::global_params::GlobalParams;
use crate::services::simulation_types::SimulationOutput;

/// Last calendar day of the (possibly fractional) completion week, counting
/// week 1 from the start date. Week 0 maps to the start date.
pub fn completion_date(params: &GlobalParams, week: f64) -> NaiveDate {
    let whole_weeks = week.max(0.0).ceil() as i64;
    if whole_weeks == 0 {
        return params.start_date;
    }
    params.start_date + chrono::Duration::days(whole_weeks * 7 - 1)
}

pub fn format_simulation_report(
    output: &SimulationOutput,
    params: &GlobalParams,
    data_source: &str,
) -> String {
    let mut lines = Vec::new();
    lines.push("Simulation Report".to_string());
    lines.push(format!("Data source: {data_source}"));
    lines.push(format!("Start date: {}", params.start_date));
    lines.push(format!("Iterations: {}", output.list_of_simulations.len()));
    lines.push(format!("Base seed: {}", output.base_seed));
    lines.push(format!("Tasks: {}", output.task_ids.len()));
    lines.push(String::new());
    lines.push("Percentiles:".to_string());
    lines.push("Percentile | Weeks | Date".to_string());
    lines.push("-----------|-------|-----".to_string());
    for (label, week) in output.completion_week_percentiles.entries() {
        lines.push(format!(
            "{} | {week:.2} | {}",
            label.to_uppercase(),
            completion_date(params, week)
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::simulation_types::CompletionWeekPercentiles;
    use crate::test_support::{build_params, on_date};

    fn build_output() -> SimulationOutput {
        SimulationOutput {
            base_seed: 42,
            task_ids: vec!["T1".to_string(), "T2".to_string()],
            list_of_simulations: Vec::new(),
            completion_week_percentiles: CompletionWeekPercentiles {
                p50: 4.0,
                p75: 4.5,
                p90: 5.0,
                p95: 6.25,
                p99: 8.0,
            },
            percentile_details: Vec::new(),
        }
    }

    #[test]
    fn completion_date_is_last_day_of_week() {
        let params = build_params(on_date(2026, 2, 2));
        assert_eq!(completion_date(&params, 0.0), on_date(2026, 2, 2));
        assert_eq!(completion_date(&params, 1.0), on_date(2026, 2, 8));
        assert_eq!(completion_date(&params, 1.2), on_date(2026, 2, 15));
        assert_eq!(completion_date(&params, 4.0), on_date(2026, 3, 1));
    }

    #[test]
    fn format_simulation_report_includes_header_and_table() {
        let params = build_params(on_date(2026, 2, 2));
        let report = format_simulation_report(&build_output(), &params, "input.yaml");

        assert!(report.contains("Simulation Report"));
        assert!(report.contains("Data source: input.yaml"));
        assert!(report.contains("Start date: 2026-02-02"));
        assert!(report.contains("Base seed: 42"));
        assert!(report.contains("Tasks: 2"));
        assert!(report.contains("Percentile | Weeks | Date"));
        assert!(report.contains("P50 | 4.00 | 2026-03-01"));
        assert!(report.contains("P95 | 6.25 | 2026-03-22"));
        assert!(report.contains("P99 | 8.00 | 2026-03-29"));
    }
}
