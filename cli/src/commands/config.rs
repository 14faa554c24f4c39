use anyhow::Result;
use civitgrab_core::Config;

pub fn execute(config: &Config) -> Result<()> {
    println!("Models base path: {}\n", config.base_path().display());

    println!("{:<20} {}", "CATEGORY", "FOLDER");
    println!("{}", "-".repeat(60));
    for (name, path) in config.folder_paths() {
        println!("{:<20} {}", name, path.display());
    }

    Ok(())
}
