use eframe::egui::{self, RichText, ScrollArea, Ui};

use crate::data::catalog::{builtin_specs, find_spec};
use crate::data::filter::StageOutput;
use crate::data::schema::{DatasetKind, Schema};
use crate::state::{
    AppState, DatasetView, Interaction, LoadedDataset, ObservationOrder, Session, SidebarView,
};

use super::{plot, tables};

// ---------------------------------------------------------------------------
// Central panel – overviews, filter cascade, results, subtype charts
// ---------------------------------------------------------------------------

/// Render the central panel for the active dataset.
pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    let kind = state.session.active();
    let (loaded, view) = match kind {
        DatasetKind::Observations => (&state.observations, &state.observation_view),
        DatasetKind::Relationships => (&state.relationships, &state.relationship_view),
    };
    let Some(ds) = loaded else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No data loaded  (File → Refresh data, or open a snapshot)");
        });
        return;
    };

    let mut actions = Vec::new();
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            overviews(ui, ds, view, &state.session);

            ui.heading("Filter views");
            ui.label("Choose one or more values per stage. A stage with nothing chosen keeps every row.");
            if kind == DatasetKind::Observations {
                order_picker(ui, &state.session, &mut actions);
            }
            if ui.button("Reset filters").clicked() {
                actions.push(Interaction::ResetFilters);
            }
            ui.separator();

            for stage in &view.stages {
                stage_widget(ui, &ds.schema, stage, &state.session, &mut actions);
            }

            if kind == DatasetKind::Observations {
                detail_picker(ui, view, &state.session, &mut actions);
            }

            ui.separator();
            ui.heading(format!("Resulting {kind}"));
            if let Some(result) = view.result() {
                tables::data_table(ui, "result_table", result);
            }
        });

    for action in actions {
        state.interact(action);
    }
}

fn overviews(ui: &mut Ui, ds: &LoadedDataset, view: &DatasetView, session: &Session) {
    let kind = ds.schema.kind;
    let mut any = false;

    if session.shows(SidebarView::AllMetadata) {
        ui.heading(format!("All {kind} with all metadata"));
        tables::data_table(ui, "all_metadata", &ds.full);
        any = true;
    }
    if session.shows(SidebarView::SelectedMetadata) {
        ui.heading("Selected metadata");
        tables::data_table(ui, "selected_metadata", &ds.selection);
        any = true;
    }
    if session.shows(SidebarView::TotalsPerObserver) {
        if let Some(counts) = &view.observer_counts {
            ui.heading(format!("Total {kind} per observer"));
            tables::counts_table(ui, "observer_counts_table", counts);
            plot::counts_chart(ui, "observer_counts_chart", counts);
            any = true;
        }
    }
    if session.shows(SidebarView::TotalsPerType) {
        if let Some(counts) = &view.type_counts {
            ui.heading(format!("Total {kind} per type"));
            tables::counts_table(ui, "type_counts_table", counts);
            plot::counts_chart(ui, "type_counts_chart", counts);
            any = true;
        }
    }
    if any {
        ui.separator();
    }
}

fn order_picker(ui: &mut Ui, session: &Session, actions: &mut Vec<Interaction>) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Select order:");
        for order in ObservationOrder::ALL {
            if ui.radio(session.order == order, order.label()).clicked() && session.order != order {
                actions.push(Interaction::SetOrder(order));
            }
        }
    });
}

fn stage_widget(
    ui: &mut Ui,
    schema: &Schema,
    stage: &StageOutput,
    session: &Session,
    actions: &mut Vec<Interaction>,
) {
    let title = schema.label_for(&stage.field).unwrap_or(stage.field.as_str());
    let chosen = session.selections.get(&stage.key);
    let n_chosen = chosen.map(|c| c.len()).unwrap_or(0);

    egui::CollapsingHeader::new(
        RichText::new(format!(
            "{title}  ({n_chosen}/{} chosen, {} rows)",
            stage.options.len(),
            stage.full.len()
        ))
        .strong(),
    )
    .id_salt(&stage.key)
    .default_open(true)
    .show(ui, |ui: &mut Ui| {
        if n_chosen > 0 && ui.small_button("Clear").clicked() {
            actions.push(Interaction::ClearStage {
                key: stage.key.clone(),
            });
        }
        ui.horizontal_wrapped(|ui: &mut Ui| {
            for value in &stage.options {
                let mut checked = chosen.is_some_and(|c| c.contains(value));
                if ui.checkbox(&mut checked, value.to_string()).changed() {
                    actions.push(Interaction::ToggleValue {
                        key: stage.key.clone(),
                        value: value.clone(),
                    });
                }
            }
        });
        tables::data_table(ui, &format!("{}_table", stage.key), &stage.selection);
    });
}

/// Pick a musical-type family by name, then narrow by its subtypes.
fn detail_picker(
    ui: &mut Ui,
    view: &DatasetView,
    session: &Session,
    actions: &mut Vec<Interaction>,
) {
    ui.separator();
    ui.heading("Musical type details");
    let names: Vec<String> = builtin_specs().into_iter().map(|s| s.name).collect();
    ui.label(format!("Enter a musical type ({})", names.join(" / ")));

    ui.horizontal(|ui: &mut Ui| {
        let mut input = session.detail_input.clone();
        if ui.text_edit_singleline(&mut input).changed() {
            actions.push(Interaction::SetDetailInput(input));
        }
        if ui.button("Submit").clicked() {
            actions.push(Interaction::SubmitDetailFamily);
        }
    });

    if !session.detail_submitted {
        return;
    }
    let Some(spec) = session.detail_family.as_deref().and_then(find_spec) else {
        ui.colored_label(
            ui.visuals().warn_fg_color,
            format!("Unknown musical type '{}'", session.detail_input.trim()),
        );
        return;
    };

    ui.label("Select the details (rows with any of them are kept)");
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for label in spec.labels() {
            let mut checked = session.detail_labels.contains(label);
            if ui.checkbox(&mut checked, label).changed() {
                actions.push(Interaction::ToggleDetailLabel(label.to_string()));
            }
        }
    });

    if let Some(detail) = &view.detail {
        for d in &detail.diagnostics {
            ui.colored_label(ui.visuals().warn_fg_color, d.to_string());
        }
    }
    if let Some(summary) = &view.subtypes {
        plot::subtype_chart(ui, "subtype_chart", summary);
    }
}
