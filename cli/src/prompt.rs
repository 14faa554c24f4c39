//! Terminal implementations of the core decision capabilities.

use dialoguer::{MultiSelect, Select};
use std::sync::Arc;

use civitgrab_core::{DownloadPrompter, Error, ModelDescriptor, Result, ScanResult};

pub struct TerminalPrompter;

impl DownloadPrompter for TerminalPrompter {
    fn confirm_flagged(
        &self,
        flagged: &[(Arc<ModelDescriptor>, ScanResult)],
    ) -> Result<Vec<usize>> {
        println!(
            "\nWARNING: {} model(s) did not pass the virus scan:\n",
            flagged.len()
        );
        for (index, (model, status)) in flagged.iter().enumerate() {
            println!("  {}. {} - virus scan: {}", index + 1, model.name(), status);
        }
        println!();

        let choice = Select::new()
            .with_prompt("Download flagged models anyway?")
            .items(&["none", "all", "choose individually"])
            .default(0)
            .interact()
            .map_err(prompt_error)?;

        match choice {
            0 => Ok(Vec::new()),
            1 => Ok((0..flagged.len()).collect()),
            _ => {
                let items: Vec<String> = flagged
                    .iter()
                    .map(|(model, status)| format!("{} ({})", model.name(), status))
                    .collect();
                MultiSelect::new()
                    .with_prompt("Select models to download")
                    .items(&items)
                    .interact()
                    .map_err(prompt_error)
            }
        }
    }

    fn choose_folder(&self, model: &ModelDescriptor, folders: &[String]) -> Result<String> {
        println!("\nModel '{}' has no folder for its category.", model.name());
        println!("Model page: {}", model.page_url());

        let mut options: Vec<String> = folders.to_vec();
        options.push("temp".to_string());

        let index = Select::new()
            .with_prompt("Choose a destination folder")
            .items(&options)
            .default(0)
            .interact()
            .map_err(prompt_error)?;

        Ok(options[index].clone())
    }
}

fn prompt_error(e: dialoguer::Error) -> Error {
    Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
}
