use anyhow::Result;
use calbridge_core::{CalendarBuilder, CalendarConfig, Converter, Options, Registry};
use serde_json::Value;

pub fn run(
    config: CalendarConfig,
    calendar: &str,
    format: &str,
    sources: &[String],
    options: Vec<(String, Value)>,
) -> Result<()> {
    let builder = CalendarBuilder::new(config, Registry::with_defaults());
    let extra = sources.iter().map(|name| (name.as_str(), Options::new()));
    let mut calendar = builder.build(calendar, extra)?;

    if calendar.sources().is_empty() {
        anyhow::bail!(
            "Calendar '{}' has no sources.\n\n\
            List sources for it in your config:\n  \
            [calendar.calendars]\n  \
            {} = {{ sources = [\"my_source\"] }}\n\n\
            or attach one with --source <name>",
            calendar.name(),
            calendar.name()
        );
    }

    let options: Options = options.into_iter().collect();
    let output = Converter::for_builder(&builder).convert(&mut calendar, format, &options)?;
    println!("{output}");

    Ok(())
}

/// Parse `KEY=VALUE`; VALUE is JSON when it parses, a plain string otherwise.
pub fn parse_option(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
