use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{Bar, BarChart, Line, Plot, PlotPoints, Points};

use crate::color::ColorMap;
use crate::data::aggregate::{Kpis, MetricsSnapshot};
use crate::data::model::Dimension;
use crate::state::AppState;
use crate::ui::{format_count, format_currency, group_thousands};

const CHART_HEIGHT: f32 = 240.0;

// ---------------------------------------------------------------------------
// Dashboard (central panel)
// ---------------------------------------------------------------------------

/// Render the KPI widgets and the six charts for the current metrics.
pub fn dashboard(ui: &mut Ui, state: &AppState) {
    let session = match &state.session {
        Some(session) => session,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open a sales dataset to begin  (File → Open…)");
            });
            return;
        }
    };

    ui.heading("Shopping Mall Sales Dashboard");
    ui.label("Analyze sales data from shopping malls with interactive filters and KPIs.");

    if let Some(warning) = &session.warning {
        ui.label(RichText::new(warning.to_string()).color(Color32::from_rgb(230, 160, 30)));
    }

    ui.add_space(8.0);
    ui.heading("Key Performance Indicators");
    kpi_row(ui, &session.metrics.kpis);

    ui.add_space(8.0);
    ui.heading("Sales Analysis");
    sales_charts(ui, &session.metrics, state);
}

fn kpi_row(ui: &mut Ui, kpis: &Kpis) {
    ui.columns(5, |cols: &mut [Ui]| {
        metric(&mut cols[0], "Total Sales", format_currency(kpis.total_sales));
        metric(&mut cols[1], "Total Transactions", format_count(kpis.transaction_count));
        metric(
            &mut cols[2],
            "Average Order Value",
            format_currency(kpis.average_order_value),
        );
        metric(&mut cols[3], "Unique Customers", format_count(kpis.unique_customers));
        metric(&mut cols[4], "Total Items Sold", group_thousands(kpis.total_quantity));
    });
}

fn metric(ui: &mut Ui, label: &str, value: String) {
    ui.group(|ui: &mut Ui| {
        ui.vertical(|ui: &mut Ui| {
            ui.label(RichText::new(label).weak());
            ui.label(RichText::new(value).size(22.0).strong());
        });
    });
}

fn sales_charts(ui: &mut Ui, metrics: &MetricsSnapshot, state: &AppState) {
    let colors = |dim: Dimension| state.color_maps.get(&dim);

    let genders: Vec<(String, f64)> = metrics
        .by_gender
        .iter()
        .map(|(g, v)| (g.to_string(), *v))
        .collect();
    let age_groups: Vec<(String, f64)> = metrics
        .by_age_group
        .iter()
        .map(|(a, v)| (a.to_string(), *v))
        .collect();
    let payment_pct: Vec<(String, f64)> = metrics
        .payment_shares()
        .into_iter()
        .map(|(method, share)| (method, share * 100.0))
        .collect();

    ui.columns(2, |cols: &mut [Ui]| {
        bar_chart(
            &mut cols[0],
            "Sales by Category",
            &metrics.by_category,
            colors(Dimension::Category),
            "Sales ($)",
        );
        bar_chart(
            &mut cols[1],
            "Sales by Shopping Mall",
            &metrics.by_mall,
            colors(Dimension::Mall),
            "Sales ($)",
        );
    });

    ui.columns(2, |cols: &mut [Ui]| {
        monthly_trend(&mut cols[0], metrics);
        bar_chart(
            &mut cols[1],
            "Payment Method Distribution",
            &payment_pct,
            colors(Dimension::PaymentMethod),
            "% of transactions",
        );
    });

    ui.columns(2, |cols: &mut [Ui]| {
        bar_chart(
            &mut cols[0],
            "Sales by Gender",
            &genders,
            colors(Dimension::Gender),
            "Sales ($)",
        );
        bar_chart(
            &mut cols[1],
            "Sales by Age Group",
            &age_groups,
            colors(Dimension::AgeGroup),
            "Sales ($)",
        );
    });
}

// ---------------------------------------------------------------------------
// Chart helpers
// ---------------------------------------------------------------------------

/// Label for an x-axis grid mark that sits on a bar/point index.
fn index_label(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

fn bar_chart(
    ui: &mut Ui,
    title: &str,
    entries: &[(String, f64)],
    colors: Option<&ColorMap>,
    y_label: &str,
) {
    ui.strong(title);
    if entries.is_empty() {
        ui.label(RichText::new("No data").weak());
        return;
    }

    let labels: Vec<String> = entries.iter().map(|(label, _)| label.clone()).collect();
    let bars: Vec<Bar> = entries
        .iter()
        .enumerate()
        .map(|(i, (label, value))| {
            let bar = Bar::new(i as f64, *value).name(label).width(0.6);
            match colors {
                Some(cm) => bar.fill(cm.color_for(label)),
                None => bar,
            }
        })
        .collect();

    Plot::new(title)
        .height(CHART_HEIGHT)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .include_y(0.0)
        .y_axis_label(y_label)
        .x_axis_formatter(move |mark, _range| index_label(&labels, mark.value))
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars));
        });
}

fn monthly_trend(ui: &mut Ui, metrics: &MetricsSnapshot) {
    ui.strong("Monthly Sales Trend");
    if metrics.by_month.is_empty() {
        ui.label(RichText::new("No data").weak());
        return;
    }

    let labels: Vec<String> = metrics.by_month.iter().map(|(m, _)| m.to_string()).collect();
    let points: Vec<[f64; 2]> = metrics
        .by_month
        .iter()
        .enumerate()
        .map(|(i, (_, sales))| [i as f64, *sales])
        .collect();

    Plot::new("Monthly Sales Trend")
        .height(CHART_HEIGHT)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .include_y(0.0)
        .y_axis_label("Sales ($)")
        .x_axis_formatter(move |mark, _range| index_label(&labels, mark.value))
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(PlotPoints::from(points.clone()))
                    .name("Sales")
                    .color(Color32::LIGHT_BLUE)
                    .width(2.0),
            );
            plot_ui.points(
                Points::new(PlotPoints::from(points))
                    .radius(3.0)
                    .color(Color32::LIGHT_BLUE),
            );
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_labels_only_on_whole_positions() {
        let labels = vec!["2023-01".to_string(), "2023-02".to_string()];
        assert_eq!(index_label(&labels, 0.0), "2023-01");
        assert_eq!(index_label(&labels, 1.0), "2023-02");
        assert_eq!(index_label(&labels, 0.5), "");
        assert_eq!(index_label(&labels, 2.0), "");
        assert_eq!(index_label(&labels, -1.0), "");
    }
}
