use {
    anyhow::Result,
    std::{
        fs::File,
        path::Path,
        sync::Arc,
    },
    tracing::Level,
    tracing_subscriber::{
        fmt::{
            layer,
            writer::MakeWriterExt,
        },
        layer::SubscriberExt,
        util::SubscriberInitExt,
    },
};

/// Install the global subscriber: a plain file writer alongside a pretty
/// stdout writer, both capped at the same level.
pub fn setup_logging(
    path: impl AsRef<Path>,
    min_level: Level,
) -> Result<()> {
    let log_file = Arc::new(File::create(path)?);

    tracing_subscriber::registry()
        .with(
            layer()
                .with_writer(log_file.with_max_level(min_level))
                .with_ansi(false),
        )
        .with(
            layer()
                .with_writer(std::io::stdout.with_max_level(min_level))
                .pretty()
                .with_line_number(true)
                .with_thread_ids(false)
                .with_target(false),
        )
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_the_log_file_and_installs_a_subscriber() -> Result<()> {
        let path = std::env::temp_dir().join("ddpg_rl_logging_test.log");
        setup_logging(&path, Level::INFO)?;
        tracing::info!("logging is up");
        assert!(path.exists());
        Ok(())
    }
}
