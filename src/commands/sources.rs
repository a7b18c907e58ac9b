use anyhow::Result;
use calbridge_core::{CalendarConfig, Registry};
use owo_colors::OwoColorize;

pub fn run(config: &CalendarConfig) -> Result<()> {
    println!("{}", "Calendars".bold());
    if config.calendars.is_empty() {
        println!("   {}", "(none configured)".dimmed());
    }
    for (name, entry) in &config.calendars {
        let kind = entry.kind().unwrap_or(name.as_str());
        let sources = entry.sources();
        if sources.is_empty() {
            println!("   {} {}", name.green(), format!("({kind})").dimmed());
        } else {
            println!(
                "   {} {} {}",
                name.green(),
                format!("({kind})").dimmed(),
                sources.join(", ")
            );
        }
    }

    println!();
    println!("{}", "Sources".bold());
    if config.sources.is_empty() {
        println!("   {}", "(none configured)".dimmed());
    }
    for (name, entry) in &config.sources {
        println!("   {} {}", name.green(), format!("({})", entry.kind()).dimmed());
    }

    let registry = Registry::with_defaults();
    let kinds: Vec<&str> = registry.source_names().collect();
    println!();
    println!("{} {}", "Source kinds:".bold(), kinds.join(", "));

    Ok(())
}
