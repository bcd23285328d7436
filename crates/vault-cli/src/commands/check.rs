//! The check command: validate settings and layout without touching files

use colored::Colorize;
use vault_core::SettingsResolver;

use crate::error::Result;

pub fn run_check(resolver: &SettingsResolver) -> Result<i32> {
    println!("{} Checking vault-sync settings...", "=>".blue().bold());

    if let Some(path) = resolver.settings_path() {
        println!("   settings: {}", path.display());
    }
    let settings = resolver.resolve()?;
    let timing = settings.timing()?;
    let layout = settings.layout();

    println!("   local:    {}", layout.local.display());
    println!("   cloud:    {}", layout.cloud.display());
    println!("   history:  {}", layout.history.display());
    println!(
        "   timing:   window {:?}, stabilize {:?}, cooldown {:?}, poll {:?}",
        timing.stability_window, timing.stabilize_wait, timing.cooldown, timing.poll_interval
    );
    println!("   workers:  {}", settings.workers);

    layout.validate()?;
    if !layout.history.exists() {
        println!(
            "{} history root does not exist yet and will be created on the first pass",
            "NOTE".yellow().bold()
        );
    }

    println!("{} Settings and layout are valid.", "OK".green().bold());
    Ok(0)
}
