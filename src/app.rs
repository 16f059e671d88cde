//! Application state
//!
//! [`Gallery`] owns the catalog and hands it by reference to the viewer and
//! the exporter. UI layers call into it with commands instead of reaching
//! for shared globals.

use crate::catalog::{Catalog, CatalogConfig};
use crate::export::{AssetSource, ExportReport, Exporter, OutputDelivery};
use crate::trigger::ExportTrigger;
use crate::viewer::{ViewerCommand, ViewerState};
use crate::{ExportError, ExportOptions};

pub struct Gallery {
    catalog: Catalog,
    viewer: ViewerState,
    trigger: ExportTrigger,
    exporter: Exporter,
}

impl Gallery {
    pub fn new(config: &CatalogConfig, options: ExportOptions) -> Self {
        let catalog = Catalog::from_config(config);
        let viewer = ViewerState::new(catalog.len());
        Gallery {
            catalog,
            viewer,
            trigger: ExportTrigger::new(),
            exporter: Exporter::new(options),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn viewer(&self) -> &ViewerState {
        &self.viewer
    }

    pub fn trigger(&self) -> &ExportTrigger {
        &self.trigger
    }

    pub fn trigger_mut(&mut self) -> &mut ExportTrigger {
        &mut self.trigger
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    pub fn handle(&mut self, command: ViewerCommand) {
        self.viewer.handle(command);
    }

    /// Handle a click on the download control.
    ///
    /// Returns `None` when the control is disabled; otherwise runs the export
    /// with the control as its progress sink.
    pub fn download(
        &mut self,
        source: &dyn AssetSource,
        delivery: &mut dyn OutputDelivery,
    ) -> Option<Result<ExportReport, ExportError>> {
        if !self.trigger.is_enabled() {
            return None;
        }
        self.trigger.start();
        Some(
            self.exporter
                .export(&self.catalog, source, &mut self.trigger, delivery),
        )
    }
}

impl Default for Gallery {
    fn default() -> Self {
        Self::new(&CatalogConfig::default(), ExportOptions::default())
    }
}
