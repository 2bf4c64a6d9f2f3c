//! `srcpool check`: validate a sources file and summarize it

use comfy_table::{Table, presets::UTF8_FULL};
use srcpool_core::SourcesFile;

/// Render one row per source. Passwords are never printed.
pub fn render(file: &SourcesFile) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Source",
        "Target",
        "Pool size",
        "Autocommit",
        "Connect timeout",
        "Read timeout",
    ]);

    for (name, config) in &file.sources {
        table.add_row(vec![
            name.clone(),
            config.display_target(),
            config.max_connections.to_string(),
            config.autocommit.to_string(),
            format!("{}s", config.connect_timeout_secs),
            format!("{}s", config.read_timeout_secs),
        ]);
    }

    table
}
