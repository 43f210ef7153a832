use std::str::FromStr;

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Default,
    Json,
    Pretty,
    Compact,
}

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Installs the global tracing subscriber. Calling this more than once is a
/// no-op, so tests can call it freely.
pub fn init(level: &str, mode: Mode) -> Result<()> {
    INITIALIZED.get_or_try_init(|| {
        let env_filter =
            EnvFilter::from_str(level).map_err(|e| anyhow::anyhow!("failed to parse log level: {e}"))?;

        let builder = tracing_subscriber::fmt()
            .with_line_number(true)
            .with_file(true)
            .with_env_filter(env_filter);

        match mode {
            Mode::Default => builder.try_init(),
            Mode::Json => builder.json().try_init(),
            Mode::Pretty => builder.pretty().try_init(),
            Mode::Compact => builder.compact().try_init(),
        }
        .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))
    })?;

    Ok(())
}
