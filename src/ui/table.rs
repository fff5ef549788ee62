use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::loader::DATE_FORMAT;
use crate::state::AppState;
use crate::ui::{format_count, format_currency};

const HEADERS: [&str; 11] = [
    "Invoice",
    "Date",
    "Customer",
    "Gender",
    "Age",
    "Age Group",
    "Category",
    "Quantity",
    "Total Price",
    "Payment Method",
    "Shopping Mall",
];

// ---------------------------------------------------------------------------
// Preview of the filtered rows
// ---------------------------------------------------------------------------

/// Render the first rows of the filtered view.
pub fn preview_table(ui: &mut Ui, state: &AppState) {
    let Some(session) = &state.session else {
        return;
    };
    let rows = state.preview();

    ui.add_space(8.0);
    ui.heading("Filtered Data");
    ui.label(
        RichText::new(format!(
            "Showing first {} of {} matching transactions",
            format_count(rows.len()),
            format_count(session.visible_indices.len())
        ))
        .weak(),
    );

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .vscroll(false)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .columns(Column::auto().at_least(60.0), HEADERS.len())
        .header(20.0, |mut header| {
            for title in HEADERS {
                header.col(|ui: &mut Ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, rows.len(), |mut row| {
                let rec = rows[row.index()];
                let cells = [
                    rec.invoice_no.clone().unwrap_or_default(),
                    rec.invoice_date.format(DATE_FORMAT).to_string(),
                    rec.customer_id.clone(),
                    rec.gender.to_string(),
                    rec.age.to_string(),
                    rec.age_group.to_string(),
                    rec.category.clone(),
                    rec.quantity.to_string(),
                    format_currency(rec.total_price),
                    rec.payment_method.clone(),
                    rec.shopping_mall.clone(),
                ];
                for cell in cells {
                    row.col(|ui: &mut Ui| {
                        ui.label(cell);
                    });
                }
            });
        });
}
