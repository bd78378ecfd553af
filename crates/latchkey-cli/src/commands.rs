use crate::ReaderKind;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use latchkey_core::constants::DEFAULT_CONFIG_FILE;
use latchkey_core::{DeviceConfig, Error as CoreError};
use latchkey_engine::{AccessController, CacheStatus, DecisionEngine, SystemClock, classify};
use latchkey_hardware::DoorPanel;
use latchkey_hardware::console::{ConsoleIndicator, ConsoleLock, LineCardReader};
use latchkey_hardware::devices::AnyCardReader;
use latchkey_network::{AuthorityConfig, HttpAuthorityClient};
use latchkey_storage::{CardCache, CardRecord, FileCardCache};
use std::path::Path;
use tracing::{info, warn};

/// Run the door control loop.
pub async fn run(config_path: Option<&Path>, reader: ReaderKind, port: &str) -> Result<()> {
    let config = load_provisioned(config_path)?;
    info!(
        device_id = %config.device_id,
        authority = %config.authority_url,
        cache = %config.cache_path.display(),
        "Configuration loaded"
    );

    let reader = open_reader(reader, port, &config)?;
    let authority = HttpAuthorityClient::new(AuthorityConfig::from(&config))
        .context("invalid authority URL")?;
    let engine = DecisionEngine::from_config(
        &config,
        FileCardCache::new(&config.cache_path),
        authority,
        SystemClock,
    )?;

    let mut controller = AccessController::new(
        reader,
        DoorPanel::new(ConsoleLock::new(), ConsoleIndicator),
        engine,
    )
    .with_unlock(config.unlock_duration())
    .with_poll_interval(config.poll_interval());

    let summary = controller.run(shutdown_signal()).await;
    println!(
        "{} cards presented: {} granted, {} denied",
        summary.events, summary.grants, summary.denials
    );
    Ok(())
}

/// Write the device configuration, keeping any other settings already in
/// the file.
pub fn provision(
    config_path: Option<&Path>,
    device_id: &str,
    authority_url: Option<String>,
) -> Result<()> {
    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let config = provisioned_config(path, device_id, authority_url)?;
    config.save(path)?;

    println!(
        "Device {} provisioned, configuration written to {}",
        config.device_id,
        path.display()
    );
    Ok(())
}

/// Print every cached card with its age and freshness.
pub async fn cards(config_path: Option<&Path>) -> Result<()> {
    let config = DeviceConfig::load_unvalidated(config_path)?;
    let cache = FileCardCache::new(&config.cache_path);
    let records = cache.records().await?;

    if records.is_empty() {
        println!("No cached cards in {}", config.cache_path.display());
        return Ok(());
    }

    let now = Utc::now();
    for record in &records {
        println!("{}", describe(record, now, &config));
    }
    println!("{} cards", records.len());
    Ok(())
}

fn load_provisioned(config_path: Option<&Path>) -> Result<DeviceConfig> {
    match DeviceConfig::load(config_path) {
        Ok(config) => Ok(config),
        Err(CoreError::MissingConfig(key)) if key == "device_id" => bail!(
            "device is not provisioned; run `latchkey provision --device-id <ID>` first"
        ),
        Err(e) => Err(e).context("failed to load configuration"),
    }
}

fn provisioned_config(
    path: &Path,
    device_id: &str,
    authority_url: Option<String>,
) -> Result<DeviceConfig> {
    let device_id = device_id.trim();
    if device_id.is_empty() {
        bail!("device id is required");
    }

    let mut config = if path.exists() {
        DeviceConfig::load_unvalidated(Some(path))?
    } else {
        DeviceConfig::default()
    };
    config.device_id = device_id.to_string();
    if let Some(url) = authority_url {
        config.authority_url = url;
    }

    config.validate()?;
    Ok(config)
}

fn open_reader(kind: ReaderKind, port: &str, config: &DeviceConfig) -> Result<AnyCardReader> {
    match kind {
        ReaderKind::Stdin => {
            println!("Type a card code in hex and press Enter");
            Ok(AnyCardReader::Stdin(LineCardReader::stdin(
                config.poll_interval(),
            )))
        }
        #[cfg(feature = "hardware-serial")]
        ReaderKind::Serial => {
            let reader = latchkey_hardware::serial::SerialCardReader::open(
                port,
                latchkey_hardware::rdm6300::DEFAULT_REPEAT_WINDOW,
            )
            .with_context(|| format!("failed to open serial reader on {port}"))?;
            Ok(AnyCardReader::Serial(reader))
        }
        #[cfg(not(feature = "hardware-serial"))]
        ReaderKind::Serial => {
            bail!("serial reader on {port} requires the `hardware-serial` feature")
        }
    }
}

fn describe(record: &CardRecord, now: DateTime<Utc>, config: &DeviceConfig) -> String {
    let age = record.age_at(now);
    let status = match classify(Some(record.last_verified_at), now, config.cache_ttl()) {
        CacheStatus::Fresh { .. } => "fresh",
        _ => "stale",
    };
    format!(
        "{:<16} {}  {:>4}d {:>2}h  {}",
        record.card_id.as_str(),
        record.last_verified_at.format("%Y-%m-%d %H:%M:%S"),
        age.num_days(),
        age.num_hours() % 24,
        status
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Ctrl-C handler unavailable");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use latchkey_core::CardId;
    use tempfile::TempDir;

    #[test]
    fn test_provision_rejects_empty_device_id() {
        let dir = TempDir::new().unwrap();
        let err = provisioned_config(&dir.path().join("latchkey.json"), "  ", None).unwrap_err();
        assert_eq!(err.to_string(), "device id is required");
    }

    #[test]
    fn test_provision_keeps_existing_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latchkey.json");
        DeviceConfig::new("old-door")
            .unlock_secs(9)
            .save(&path)
            .unwrap();

        let config =
            provisioned_config(&path, "new-door", Some("http://localhost:8080/check".into()))
                .unwrap();

        assert_eq!(config.device_id, "new-door");
        assert_eq!(config.unlock_secs, 9);
        assert_eq!(config.authority_url, "http://localhost:8080/check");
    }

    #[test]
    fn test_unprovisioned_run_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latchkey.json");
        DeviceConfig::default().save(&path).unwrap();

        let err = load_provisioned(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("latchkey provision"));
    }

    #[test]
    fn test_describe_marks_stale_records() {
        let now = DateTime::from_timestamp(1_760_832_000, 0).unwrap();
        let config = DeviceConfig::new("lab-door");
        let fresh = CardRecord::new(CardId::from_raw_code(0xffee), now - TimeDelta::hours(1));
        let stale = CardRecord::new(CardId::from_raw_code(0xa1b2), now - TimeDelta::days(8));

        assert!(describe(&fresh, now, &config).ends_with("fresh"));
        let line = describe(&stale, now, &config);
        assert!(line.starts_with("01a1b2"));
        assert!(line.contains("   8d  0h"));
        assert!(line.ends_with("stale"));
    }
}
