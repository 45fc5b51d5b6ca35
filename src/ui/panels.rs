use eframe::egui::{self, Color32, RichText, Ui};

use crate::data::schema::DatasetKind;
use crate::state::{AppState, ExportTarget, Interaction, SidebarView};

// ---------------------------------------------------------------------------
// Left side panel – overview toggles and export
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    let mut actions = Vec::new();

    ui.heading("Views");
    ui.label("Tick a box to see all data of a given category. Filtering happens in the main window.");
    ui.separator();

    for view in SidebarView::ALL {
        let mut checked = state.session.shows(view);
        if ui.checkbox(&mut checked, view.label()).changed() {
            actions.push(Interaction::ToggleSidebar(view));
        }
    }

    ui.separator();
    ui.heading("Export");
    ui.label("File name (\".csv\" is added if missing)");
    let mut name = state.session.export_name.clone();
    if ui.text_edit_singleline(&mut name).changed() {
        actions.push(Interaction::SetExportName(name));
    }

    let mut export = None;
    if ui.button("Download complete dataset as CSV").clicked() {
        export = Some(ExportTarget::Complete);
    }
    if ui.button("Download filtered results as CSV").clicked() {
        export = Some(ExportTarget::Filtered);
    }

    for action in actions {
        state.interact(action);
    }

    if let Some(target) = export {
        let dir = rfd::FileDialog::new()
            .set_title("Choose export folder")
            .pick_folder();
        if let Some(dir) = dir {
            // Success and failure both land in the status line.
            if let Err(e) = state.export(target, &dir) {
                log::debug!("export into {} not completed: {e}", dir.display());
            }
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
            if ui.button("Refresh data").clicked() {
                state.refresh();
                ui.close_menu();
            }
            if ui.button("Open observations snapshot…").clicked() {
                open_snapshot_dialog(state, DatasetKind::Observations);
                ui.close_menu();
            }
            if ui.button("Open relationships snapshot…").clicked() {
                open_snapshot_dialog(state, DatasetKind::Relationships);
                ui.close_menu();
            }
        });

        ui.separator();

        let active = state.session.active();
        for kind in [DatasetKind::Observations, DatasetKind::Relationships] {
            let label = match kind {
                DatasetKind::Observations => "Observations",
                DatasetKind::Relationships => "Relationships",
            };
            if ui.selectable_label(active == kind, label).clicked() && active != kind {
                state.interact(Interaction::SelectDataset(kind));
            }
        }

        ui.separator();

        let (loaded, view) = match active {
            DatasetKind::Observations => (&state.observations, &state.observation_view),
            DatasetKind::Relationships => (&state.relationships, &state.relationship_view),
        };
        if let Some(ds) = loaded {
            ui.label(format!(
                "{} {active} loaded from {}, {} after filters",
                ds.full.len(),
                ds.source,
                view.result().map(|t| t.len()).unwrap_or(0)
            ));
        }

        if let Some(msg) = &state.status_message {
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                ui.visuals().text_color()
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_snapshot_dialog(state: &mut AppState, kind: DatasetKind) {
    let file = rfd::FileDialog::new()
        .set_title(format!("Open {kind} snapshot"))
        .add_filter("Supported files", &["json", "csv", "parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        log::info!("Using {kind} snapshot {}", path.display());
        match kind {
            DatasetKind::Observations => state.config.data.observations_file = Some(path),
            DatasetKind::Relationships => state.config.data.relationships_file = Some(path),
        }
        state.load_all();
    }
}
