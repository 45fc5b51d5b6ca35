use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::Config;
use crate::data::aggregate::{CategoryCounts, SubtypeSummary, counts_by_field, subtype_counts};
use crate::data::cache::FetchCache;
use crate::data::catalog::find_spec;
use crate::data::error::{ExportError, ViewerError};
use crate::data::export::save_csv;
use crate::data::filter::{FilterStage, IndicatorOutput, StageOutput, indicator_step, run_pipeline};
use crate::data::loader::Source;
use crate::data::model::{Table, Value};
use crate::data::schema::{DatasetKind, Schema};

// ---------------------------------------------------------------------------
// Session: everything one user has chosen so far
// ---------------------------------------------------------------------------

/// Stage order presets for the observation cascade (logical field names).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ObservationOrder {
    #[default]
    ObserverThenType,
    TypeThenObserver,
    PieceThenType,
}

impl ObservationOrder {
    pub const ALL: [ObservationOrder; 3] = [
        ObservationOrder::ObserverThenType,
        ObservationOrder::TypeThenObserver,
        ObservationOrder::PieceThenType,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ObservationOrder::ObserverThenType => "Observer then Type",
            ObservationOrder::TypeThenObserver => "Type then Observer",
            ObservationOrder::PieceThenType => "Piece then Type",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            ObservationOrder::ObserverThenType => "observer-type",
            ObservationOrder::TypeThenObserver => "type-observer",
            ObservationOrder::PieceThenType => "piece-type",
        }
    }

    pub fn fields(self) -> &'static [&'static str] {
        match self {
            ObservationOrder::ObserverThenType => &["observer", "musical_type", "piece"],
            ObservationOrder::TypeThenObserver => &["musical_type", "observer", "piece"],
            ObservationOrder::PieceThenType => &["piece", "musical_type", "observer"],
        }
    }
}

const RELATIONSHIP_FIELDS: &[&str] = &[
    "observer",
    "relationship_type",
    "model_musical_type",
    "derivative_musical_type",
];

/// Overview panels toggled from the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SidebarView {
    AllMetadata,
    SelectedMetadata,
    TotalsPerObserver,
    TotalsPerType,
}

impl SidebarView {
    pub const ALL: [SidebarView; 4] = [
        SidebarView::AllMetadata,
        SidebarView::SelectedMetadata,
        SidebarView::TotalsPerObserver,
        SidebarView::TotalsPerType,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SidebarView::AllMetadata => "Show all metadata fields",
            SidebarView::SelectedMetadata => "Show selected metadata",
            SidebarView::TotalsPerObserver => "Show totals per observer",
            SidebarView::TotalsPerType => "Show totals per type",
        }
    }
}

/// One user action.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    SelectDataset(DatasetKind),
    SetOrder(ObservationOrder),
    ToggleValue { key: String, value: Value },
    ClearStage { key: String },
    ToggleSidebar(SidebarView),
    SetExportName(String),
    SetDetailInput(String),
    SubmitDetailFamily,
    ToggleDetailLabel(String),
    ResetFilters,
}

/// Session-scoped UI state. Handlers take a session and return the next one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub active: Option<DatasetKind>,
    pub order: ObservationOrder,
    /// Chosen values per filter-stage key.
    pub selections: BTreeMap<String, BTreeSet<Value>>,
    pub sidebar: BTreeSet<SidebarView>,
    pub export_name: String,
    /// Musical-type name typed into the subtype detail picker.
    pub detail_input: String,
    /// Set once the detail picker has been submitted.
    pub detail_submitted: bool,
    /// Family resolved from `detail_input` on submit.
    pub detail_family: Option<String>,
    pub detail_labels: BTreeSet<String>,
}

impl Session {
    pub fn apply(mut self, interaction: Interaction) -> Session {
        match interaction {
            Interaction::SelectDataset(kind) => self.active = Some(kind),
            Interaction::SetOrder(order) => self.order = order,
            Interaction::ToggleValue { key, value } => {
                let chosen = self.selections.entry(key).or_default();
                if !chosen.remove(&value) {
                    chosen.insert(value);
                }
            }
            Interaction::ClearStage { key } => {
                self.selections.remove(&key);
            }
            Interaction::ToggleSidebar(view) => {
                if !self.sidebar.remove(&view) {
                    self.sidebar.insert(view);
                }
            }
            Interaction::SetExportName(name) => self.export_name = name,
            Interaction::SetDetailInput(text) => self.detail_input = text,
            Interaction::SubmitDetailFamily => {
                self.detail_submitted = true;
                let family = find_spec(&self.detail_input).map(|s| s.name);
                if family != self.detail_family {
                    self.detail_labels.clear();
                }
                self.detail_family = family;
            }
            Interaction::ToggleDetailLabel(label) => {
                if self.detail_family.is_some() && !self.detail_labels.remove(&label) {
                    self.detail_labels.insert(label);
                }
            }
            Interaction::ResetFilters => {
                self.selections.clear();
                self.detail_labels.clear();
            }
        }
        self
    }

    pub fn active(&self) -> DatasetKind {
        self.active.unwrap_or(DatasetKind::Observations)
    }

    pub fn shows(&self, view: SidebarView) -> bool {
        self.sidebar.contains(&view)
    }

    /// Filter stages for `kind`, in the order the user chose.
    pub fn stages(&self, kind: DatasetKind, schema: &Schema) -> Result<Vec<FilterStage>, ViewerError> {
        let (prefix, fields) = match kind {
            DatasetKind::Observations => (
                format!("{kind}/{}", self.order.slug()),
                self.order.fields(),
            ),
            DatasetKind::Relationships => (kind.to_string(), RELATIONSHIP_FIELDS),
        };
        fields
            .iter()
            .map(|name| -> Result<FilterStage, ViewerError> {
                let key = format!("{prefix}/{name}");
                Ok(FilterStage {
                    field: schema.column(name)?.to_string(),
                    chosen: self.selections.get(&key).cloned().unwrap_or_default(),
                    key,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Loaded data and derived views
// ---------------------------------------------------------------------------

/// A dataset after schema binding.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub source: Source,
    pub schema: Schema,
    pub selection: Table,
    pub full: Table,
}

/// Everything the presentation layer draws for one dataset.
#[derive(Debug, Clone, Default)]
pub struct DatasetView {
    pub stages: Vec<StageOutput>,
    pub detail: Option<IndicatorOutput>,
    pub subtypes: Option<SubtypeSummary>,
    /// Counts per observer over the unfiltered table.
    pub observer_counts: Option<CategoryCounts>,
    /// Counts per musical or relationship type over the unfiltered table.
    pub type_counts: Option<CategoryCounts>,
}

impl DatasetView {
    /// Full-detail rows left after every stage.
    pub fn result(&self) -> Option<&Table> {
        match &self.detail {
            Some(d) => Some(&d.full),
            None => self.stages.last().map(|s| &s.full),
        }
    }
}

/// Which table an export writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTarget {
    Complete,
    Filtered,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: Config,
    pub session: Session,
    cache: FetchCache<Table>,
    pub observations: Option<LoadedDataset>,
    pub relationships: Option<LoadedDataset>,
    pub observation_view: DatasetView,
    pub relationship_view: DatasetView,
    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let session = Session {
            export_name: config.export.default_file_name.clone(),
            ..Session::default()
        };
        Self {
            cache: FetchCache::new(config.data.cache_ttl()),
            config,
            session,
            observations: None,
            relationships: None,
            observation_view: DatasetView::default(),
            relationship_view: DatasetView::default(),
            status_message: None,
        }
    }

    pub fn source_for(&self, kind: DatasetKind) -> Source {
        let data = &self.config.data;
        let (file, url) = match kind {
            DatasetKind::Observations => (&data.observations_file, &data.observations_url),
            DatasetKind::Relationships => (&data.relationships_file, &data.relationships_url),
        };
        match file {
            Some(path) => Source::File(path.clone()),
            None => Source::Url(url.clone()),
        }
    }

    /// Load both datasets through the cache.
    pub fn load_all(&mut self) {
        let mut errors = Vec::new();
        for kind in [DatasetKind::Observations, DatasetKind::Relationships] {
            if let Err(e) = self.load(kind) {
                log::error!("Failed to load {kind}: {e:#}");
                errors.push(format!("{kind}: {e:#}"));
            }
        }
        self.status_message = if errors.is_empty() {
            None
        } else {
            Some(format!("Error: {}", errors.join("; ")))
        };
        self.recompute();
    }

    fn load(&mut self, kind: DatasetKind) -> anyhow::Result<()> {
        let source = self.source_for(kind);
        let timeout = self.config.data.request_timeout();
        let table = self
            .cache
            .get_or_load(&source.key(), || source.load(timeout))?;
        self.set_dataset(kind, source, Table::clone(&table))?;
        Ok(())
    }

    /// Drop cached data for both sources and fetch again.
    pub fn refresh(&mut self) {
        for kind in [DatasetKind::Observations, DatasetKind::Relationships] {
            let key = self.source_for(kind).key();
            self.cache.invalidate(&key);
        }
        self.load_all();
    }

    /// Ingest a newly loaded table: validate against the schema and split
    /// it into its selection and full views.
    pub fn set_dataset(
        &mut self,
        kind: DatasetKind,
        source: Source,
        table: Table,
    ) -> Result<(), ViewerError> {
        let schema = Schema::for_kind(kind);
        let (selection, full) = schema.bind(table)?;
        let loaded = LoadedDataset {
            source,
            schema,
            selection,
            full,
        };
        match kind {
            DatasetKind::Observations => self.observations = Some(loaded),
            DatasetKind::Relationships => self.relationships = Some(loaded),
        }
        Ok(())
    }

    /// Apply one user action and recompute every derived view. The status
    /// line only reports the outcome of the latest action.
    pub fn interact(&mut self, interaction: Interaction) {
        let session = std::mem::take(&mut self.session);
        self.session = session.apply(interaction);
        self.status_message = None;
        self.recompute();
    }

    /// Rebuild the derived views from the loaded data and the session.
    pub fn recompute(&mut self) {
        self.observation_view = match &self.observations {
            Some(ds) => build_view(ds, &self.session).unwrap_or_else(|e| {
                log::error!("observations pipeline failed: {e}");
                self.status_message = Some(format!("Error: {e}"));
                DatasetView::default()
            }),
            None => DatasetView::default(),
        };
        self.relationship_view = match &self.relationships {
            Some(ds) => build_view(ds, &self.session).unwrap_or_else(|e| {
                log::error!("relationships pipeline failed: {e}");
                self.status_message = Some(format!("Error: {e}"));
                DatasetView::default()
            }),
            None => DatasetView::default(),
        };
    }

    /// Write the complete or filtered table of the active dataset into
    /// `dir`, named after the session's export name.
    pub fn export(&mut self, target: ExportTarget, dir: &Path) -> Result<usize, ExportError> {
        let name = crate::data::export::export_file_name(
            &self.session.export_name,
            &self.config.export.default_file_name,
        );
        let path = dir.join(name);
        let (loaded, view) = match self.session.active() {
            DatasetKind::Observations => (&self.observations, &self.observation_view),
            DatasetKind::Relationships => (&self.relationships, &self.relationship_view),
        };
        let empty = Table::default();
        let table = match target {
            ExportTarget::Complete => loaded.as_ref().map(|d| &d.full),
            ExportTarget::Filtered => view.result(),
        }
        .unwrap_or(&empty);
        let result = save_csv(table, &path);
        self.status_message = match &result {
            Ok(n) => Some(format!("Exported {n} rows to {}", path.display())),
            Err(e) => {
                log::error!("{e}");
                Some(format!("Error: {e}"))
            }
        };
        result
    }
}

fn build_view(ds: &LoadedDataset, session: &Session) -> Result<DatasetView, ViewerError> {
    let kind = ds.schema.kind;
    let stages = run_pipeline(&ds.selection, &ds.full, &session.stages(kind, &ds.schema)?)?;

    let type_field = match kind {
        DatasetKind::Observations => "musical_type",
        DatasetKind::Relationships => "relationship_type",
    };
    let observer_counts = Some(counts_by_field(&ds.full, ds.schema.column("observer")?)?);
    let type_counts = Some(counts_by_field(&ds.full, ds.schema.column(type_field)?)?);

    let mut view = DatasetView {
        stages,
        detail: None,
        subtypes: None,
        observer_counts,
        type_counts,
    };

    if kind == DatasetKind::Observations {
        if let Some(spec) = session.detail_family.as_deref().and_then(find_spec) {
            let (selection, full) = match view.stages.last() {
                Some(last) => (&last.selection, &last.full),
                None => (&ds.selection, &ds.full),
            };
            let detail = indicator_step(selection, full, &spec, &session.detail_labels)?;
            view.subtypes = Some(subtype_counts(&detail.full, &spec.category_column, &spec));
            view.detail = Some(detail);
        }
    }

    Ok(view)
}
