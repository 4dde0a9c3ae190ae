use anyhow::Result;

use crate::cli::output::{OutputFormat, StatusInfo, get_formatter};
use crate::models::Config;
use crate::services::{PineconeIndex, VectorIndex};

pub async fn handle_status(format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let status = match PineconeIndex::new(&config.vector_store) {
        Ok(index) => match index.stats().await {
            Ok(stats) => StatusInfo {
                connected: true,
                stats,
                namespace: config.vector_store.namespace.clone(),
                error: None,
            },
            Err(error) => StatusInfo {
                error: Some(error.to_string()),
                ..Default::default()
            },
        },
        Err(error) => StatusInfo {
            error: Some(error.to_string()),
            ..Default::default()
        },
    };

    print!("{}", formatter.format_status(&status));

    if verbose && status.connected && status.stats.total_vectors == 0 {
        eprintln!();
        eprintln!("Hint: the index is empty. Populate it with: pdfrag index run");
    }

    Ok(())
}
