//! Virus-scan gating: partition descriptors by their latest scan status.

use std::sync::Arc;
use tracing::warn;

use crate::error::Error;
use crate::models::{ModelDescriptor, ScanResult};

/// Result of gating a batch of descriptors.
///
/// The three sets are pairwise disjoint and together cover the input.
#[derive(Debug, Default)]
pub struct ScanPartition {
    /// Scan passed; downloadable without confirmation.
    pub safe: Vec<Arc<ModelDescriptor>>,
    /// Scan determinable but not passed; needs user confirmation.
    pub flagged: Vec<(Arc<ModelDescriptor>, ScanResult)>,
    /// No file records, so no determinable status; dropped with a
    /// diagnostic.
    pub skipped: Vec<Arc<ModelDescriptor>>,
}

/// Classify each descriptor by the scan status of its latest version.
pub fn partition(models: &[Arc<ModelDescriptor>]) -> ScanPartition {
    let mut result = ScanPartition::default();

    for model in models {
        let status = model.scan_status(0);
        let has_files = model
            .latest_version()
            .map(|v| !v.files.is_empty())
            .unwrap_or(false);

        if status == ScanResult::Passed {
            result.safe.push(Arc::clone(model));
        } else if has_files {
            result.flagged.push((Arc::clone(model), status));
        } else {
            warn!(
                "skipping: {}",
                Error::NoScanInfo(model.name().to_string())
            );
            result.skipped.push(Arc::clone(model));
        }
    }

    result
}
