use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::model::{DateRange, Dimension};
use crate::state::AppState;
use crate::ui::format_count;

/// A filter edit collected while drawing, applied once the frame's borrows end.
enum FilterChange {
    DateRange(DateRange),
    Toggle(Dimension, String),
    All(Dimension),
    None(Dimension),
    Reset,
}

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(session) = &state.session else {
        ui.label("No dataset loaded.");
        return;
    };

    // Clone what we need so we can mutate state after drawing.
    let bounds = session.dataset.date_bounds();
    let universes = session.dataset.universes().clone();
    let filters = session.filters.clone();
    let color_maps = &state.color_maps;
    let mut changes: Vec<FilterChange> = Vec::new();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Date range ----
            ui.strong("Select Date Range");
            let mut range = filters.date_range;
            egui::Grid::new("date_range").num_columns(2).show(ui, |ui: &mut Ui| {
                ui.label("From");
                ui.add(DatePickerButton::new(&mut range.start).id_salt("date_from"));
                ui.end_row();
                ui.label("To");
                ui.add(DatePickerButton::new(&mut range.end).id_salt("date_to"));
                ui.end_row();
            });
            ui.label(
                RichText::new(format!("Data covers {} to {}", bounds.start, bounds.end)).weak(),
            );
            if range != filters.date_range {
                changes.push(FilterChange::DateRange(range));
            }
            if ui.small_button("Reset all filters").clicked() {
                changes.push(FilterChange::Reset);
            }
            ui.separator();

            // ---- Per-dimension multiselects (collapsible) ----
            for dim in Dimension::ALL {
                let all_values = universes.labels(dim);

                // Show count of selected / total in the header
                let header_text = format!(
                    "{dim}  ({}/{})",
                    filters.selection_len(dim),
                    all_values.len()
                );

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(dim.label())
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                changes.push(FilterChange::All(dim));
                            }
                            if ui.small_button("None").clicked() {
                                changes.push(FilterChange::None(dim));
                            }
                        });

                        for label in &all_values {
                            let mut text = RichText::new(label);
                            if let Some(cm) = color_maps.get(&dim) {
                                text = text.color(cm.color_for(label));
                            }
                            let mut checked = filters.is_selected(dim, label);
                            if ui.checkbox(&mut checked, text).changed() {
                                changes.push(FilterChange::Toggle(dim, label.clone()));
                            }
                        }
                    });
            }
        });

    // Each change replaces the filter state and recomputes.
    for change in changes {
        match change {
            FilterChange::DateRange(range) => state.set_date_range(range),
            FilterChange::Toggle(dim, label) => state.toggle_filter_value(dim, &label),
            FilterChange::All(dim) => state.select_all(dim),
            FilterChange::None(dim) => state.select_none(dim),
            FilterChange::Reset => state.reset_filters(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(session) = &state.session {
            ui.label(format!(
                "{} transactions loaded, {} visible",
                format_count(session.dataset.len()),
                format_count(session.visible_indices.len())
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open sales data")
        .add_filter("Supported files", &["json", "jsonl", "ndjson", "csv", "parquet", "pq"])
        .add_filter("JSON", &["json", "jsonl", "ndjson"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        log::info!("Opening {}", path.display());
        state.open_path(&path);
    }
}
