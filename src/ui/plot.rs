use eframe::egui::Ui;
use egui_plot::{Bar, BarChart, Legend, Plot};

use crate::color::CategoryColors;
use crate::data::aggregate::{CategoryCounts, SubtypeSummary};

// ---------------------------------------------------------------------------
// Bar charts (records per category, subtype counts)
// ---------------------------------------------------------------------------

fn bar_chart(ui: &mut Ui, id: &str, y_label: &str, bars: &[(String, usize)]) {
    if bars.is_empty() {
        ui.label("Nothing to chart.");
        return;
    }
    let colors = CategoryColors::new(bars.iter().map(|(l, _)| l.as_str()));

    let bars: Vec<Bar> = bars
        .iter()
        .enumerate()
        .map(|(i, (label, count))| {
            Bar::new(i as f64, *count as f64)
                .name(label)
                .fill(colors.color_for(label))
                .width(0.7)
        })
        .collect();

    Plot::new(id)
        .height(220.0)
        .legend(Legend::default())
        .y_axis_label(y_label)
        .show_x(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(y_label));
        });
}

/// Records per distinct value of one field.
pub fn counts_chart(ui: &mut Ui, id: &str, counts: &CategoryCounts) {
    let bars: Vec<(String, usize)> = counts
        .entries
        .iter()
        .map(|(v, n)| (v.to_string(), *n))
        .collect();
    bar_chart(ui, id, "records", &bars);
}

/// Subtype counts for one musical-type family, with any missing-column
/// diagnostics listed under the chart.
pub fn subtype_chart(ui: &mut Ui, id: &str, summary: &SubtypeSummary) {
    ui.label(format!(
        "{}: {} record(s), {} with at least one subtype",
        summary.family, summary.category_rows, summary.matched_rows
    ));
    bar_chart(ui, id, "records", &summary.counts);
    for d in &summary.diagnostics {
        ui.colored_label(ui.visuals().warn_fg_color, d.to_string());
    }
}
