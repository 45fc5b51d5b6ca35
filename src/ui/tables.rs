use eframe::egui::{self, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::aggregate::CategoryCounts;
use crate::data::model::Table;

/// Rows drawn per table; the rest is reachable through CSV export.
const MAX_DISPLAY_ROWS: usize = 2000;

// ---------------------------------------------------------------------------
// Table widgets
// ---------------------------------------------------------------------------

/// Render `table` as a striped grid, columns in table order.
pub fn data_table(ui: &mut Ui, id: &str, table: &Table) {
    let n_rows = table.len().min(MAX_DISPLAY_ROWS);
    if table.len() > n_rows {
        ui.weak(format!("showing first {n_rows} of {} rows", table.len()));
    }

    ui.push_id(id, |ui: &mut Ui| {
        egui::ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .max_scroll_height(320.0)
                .columns(Column::auto().at_least(60.0), table.columns.len())
                .header(20.0, |mut header| {
                    for col in &table.columns {
                        header.col(|ui: &mut Ui| {
                            ui.strong(col);
                        });
                    }
                })
                .body(|body| {
                    body.rows(18.0, n_rows, |mut row| {
                        let record = &table.rows[row.index()];
                        for col in &table.columns {
                            row.col(|ui: &mut Ui| {
                                ui.label(record.get(col).to_csv_field());
                            });
                        }
                    });
                });
        });
    });
}

/// Two-column value/count listing.
pub fn counts_table(ui: &mut Ui, id: &str, counts: &CategoryCounts) {
    egui::Grid::new(id).striped(true).show(ui, |ui: &mut Ui| {
        ui.strong(&counts.field);
        ui.strong("count");
        ui.end_row();
        for (value, n) in &counts.entries {
            ui.label(value.to_string());
            ui.label(n.to_string());
            ui.end_row();
        }
        ui.weak("total");
        ui.weak(counts.total().to_string());
        ui.end_row();
    });
}
