//! Decision-request capabilities for choices the download flow cannot
//! make on its own.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{ModelDescriptor, ScanResult};

/// Decisions delegated to the caller during a download run.
///
/// The CLI implements this with terminal prompts; tests supply scripted
/// answers. Both are consulted only before dispatch, never while
/// transfers are in flight.
pub trait DownloadPrompter: Send + Sync {
    /// Present models whose scan did not pass and return the indices of
    /// those to download anyway. Indices not returned are dropped from
    /// the run.
    fn confirm_flagged(
        &self,
        flagged: &[(Arc<ModelDescriptor>, ScanResult)],
    ) -> Result<Vec<usize>>;

    /// Pick a destination folder for a model whose category maps to no
    /// folder of its own.
    fn choose_folder(&self, model: &ModelDescriptor, folders: &[String]) -> Result<String>;
}
