use chrono::NaiveDate;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    core::{
        panel::PanelId,
        rollup::{DailyReport, HourlyReport},
        shift::Shift,
    },
    report::electrical::{PanelStatus, PeriodReport},
    statistics::WindowStats,
};

const STATS_HEADER: [&str; 7] = ["Count", "Total", "Average", "Current", "Min", "Max", "cos φ"];

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

fn stats_cells(stats: &WindowStats) -> Vec<Cell> {
    let dim_if_empty = |cell: Cell| if stats.is_empty() { cell.add_attribute(Attribute::Dim) } else { cell };
    vec![
        dim_if_empty(Cell::new(stats.count).set_alignment(CellAlignment::Right)),
        dim_if_empty(Cell::new(stats.total_energy).set_alignment(CellAlignment::Right)),
        dim_if_empty(Cell::new(stats.average_energy).set_alignment(CellAlignment::Right)),
        dim_if_empty(Cell::new(stats.average_current).set_alignment(CellAlignment::Right)),
        dim_if_empty(Cell::new(stats.min_current).set_alignment(CellAlignment::Right)),
        dim_if_empty(Cell::new(stats.max_current).set_alignment(CellAlignment::Right)),
        dim_if_empty(Cell::new(format!("{:.3}", stats.average_power_factor)).set_alignment(CellAlignment::Right)),
    ]
}

pub fn build_shift_table(panel_id: &PanelId, report_date: NaiveDate, shift: Shift, stats: &WindowStats) -> Table {
    let mut table = new_table();
    table.set_header(["Panel", "Date", "Shift"].into_iter().chain(STATS_HEADER));
    let mut row = vec![
        Cell::new(panel_id.display_name()),
        Cell::new(report_date).add_attribute(Attribute::Dim),
        Cell::new(shift.number()),
    ];
    row.extend(stats_cells(stats));
    table.add_row(row);
    table
}

pub fn build_daily_table(reports: &[DailyReport]) -> Table {
    let mut table = new_table();
    table.set_header(["Panel", "Date", "Shift"].into_iter().chain(STATS_HEADER));
    for report in reports {
        for shift in Shift::ALL {
            let mut row = vec![
                Cell::new(report.panel_id.display_name()),
                Cell::new(report.report_date).add_attribute(Attribute::Dim),
                Cell::new(shift.number()),
            ];
            row.extend(stats_cells(report.shift(shift)));
            table.add_row(row);
        }
    }
    table
}

pub fn build_hourly_table(panel_id: &PanelId, report_date: NaiveDate, reports: &[HourlyReport]) -> Table {
    let mut table = new_table();
    table.set_header(["Panel", "Date", "Hour"].into_iter().chain(STATS_HEADER));
    for report in reports {
        let mut row = vec![
            Cell::new(panel_id.display_name()),
            Cell::new(report_date).add_attribute(Attribute::Dim),
            Cell::new(format!("{:02}:00", report.hour)),
        ];
        row.extend(stats_cells(&report.stats));
        table.add_row(row);
    }
    table
}

/// Per-panel breakdown of the period.
pub fn build_period_panels_table(report: &PeriodReport) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Panel", "Energy", "Share", "Load", "Peak", "Peak time", "Voltage", "Current", "cos φ", "Data", "Status",
    ]);
    for panel in &report.panels {
        table.add_row(vec![
            Cell::new(&panel.panel_name),
            Cell::new(panel.energy).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", panel.contribution_percent)).set_alignment(CellAlignment::Right),
            Cell::new(panel.average_load).set_alignment(CellAlignment::Right),
            Cell::new(panel.peak_demand).set_alignment(CellAlignment::Right),
            Cell::new(panel.peak_demand_time.map_or_else(String::new, |time| time.to_rfc3339()))
                .add_attribute(Attribute::Dim),
            Cell::new(panel.average_voltage).set_alignment(CellAlignment::Right),
            Cell::new(panel.average_current).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", panel.average_power_factor)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", panel.data_completeness_percent)).set_alignment(CellAlignment::Right),
            Cell::new(panel.status).fg(match panel.status {
                PanelStatus::Online => Color::Green,
                PanelStatus::Offline => Color::Red,
            }),
        ]);
    }
    table
}

/// Plant-wide totals of the period side by side with the previous period.
pub fn build_period_summary_table(report: &PeriodReport) -> Table {
    let summary = &report.summary;
    let comparison = &report.comparison;
    let change_color = |percent: f64| if percent > 0.0 { Color::Red } else { Color::Green };

    let mut table = new_table();
    table.set_header(vec!["Metric", "Value", "Previous", "Change"]);
    table.add_row(vec![
        Cell::new("Energy"),
        Cell::new(summary.total_energy).set_alignment(CellAlignment::Right),
        Cell::new(comparison.previous_total_energy)
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Dim),
        Cell::new(format!("{:+.1}%", comparison.energy_change_percent))
            .set_alignment(CellAlignment::Right)
            .fg(change_color(comparison.energy_change_percent)),
    ]);
    table.add_row(vec![
        Cell::new("Peak demand"),
        Cell::new(summary.peak_demand).set_alignment(CellAlignment::Right),
        Cell::new(comparison.previous_peak_demand)
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Dim),
        Cell::new(format!("{:+.1}%", comparison.peak_demand_change_percent))
            .set_alignment(CellAlignment::Right)
            .fg(change_color(comparison.peak_demand_change_percent)),
    ]);
    for (metric, value) in [
        ("Average load", summary.average_load.to_string()),
        ("Installed capacity", summary.installed_capacity.to_string()),
        ("Utilization", format!("{:.1}%", summary.utilization_percent)),
        ("Load factor", format!("{:.1}%", summary.load_factor_percent)),
        ("Power factor", format!("{:.3}", summary.average_power_factor)),
        (
            "Voltage",
            format!("{} ({} … {})", summary.voltage.average, summary.voltage.min, summary.voltage.max),
        ),
    ] {
        table.add_row(vec![Cell::new(metric), Cell::new(value).set_alignment(CellAlignment::Right)]);
    }
    table
}
