use std::env;
use std::path::PathBuf;
use std::time::Duration;

use modelmux_catalog::{CatalogPass, CatalogService, Model, ModelCatalogResolver};
use modelmux_settings::SettingsStore;
use snafu::{OptionExt, Snafu};
use tokio::sync::watch;

const SETTINGS_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
struct RunnerArgs {
    settings_path: Option<PathBuf>,
    watch: bool,
}

#[derive(Debug, Snafu)]
enum RunnerError {
    #[snafu(display("missing value for argument '{arg}'"))]
    MissingArgumentValue {
        stage: &'static str,
        arg: &'static str,
    },
    #[snafu(display("unknown argument '{raw}'"))]
    UnknownArgument { stage: &'static str, raw: String },
}

type RunnerResult<T> = Result<T, RunnerError>;

/// Resolves the model catalog for the configured connections and prints it,
/// either once or continuously while watching the settings file for edits.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(error) = run().await {
        eprintln!("modelmux: {error}");
        eprintln!("usage: modelmux [--settings <path>] [--watch]");
        std::process::exit(1);
    }
}

async fn run() -> RunnerResult<()> {
    let args = parse_args(env::args().skip(1))?;
    let settings_path = args
        .settings_path
        .clone()
        .unwrap_or_else(SettingsStore::default_config_path);

    let resolver = ModelCatalogResolver::new();

    if args.watch {
        watch_catalog(resolver, settings_path).await;
    } else {
        resolve_once(&resolver, &SettingsStore::new(settings_path)).await;
    }

    Ok(())
}

fn parse_args(args: impl IntoIterator<Item = String>) -> RunnerResult<RunnerArgs> {
    let mut settings_path = None;
    let mut watch = false;
    let mut pending = args.into_iter();

    while let Some(argument) = pending.next() {
        match argument.as_str() {
            "--settings" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-settings-value",
                    arg: "--settings",
                })?;
                settings_path = Some(PathBuf::from(value));
            }
            "--watch" => {
                watch = true;
            }
            _ => {
                return UnknownArgumentSnafu {
                    stage: "parse-args",
                    raw: argument,
                }
                .fail();
            }
        }
    }

    Ok(RunnerArgs {
        settings_path,
        watch,
    })
}

async fn resolve_once(resolver: &ModelCatalogResolver, store: &SettingsStore) {
    let connections = store.connections();
    tracing::info!(connection_count = connections.len(), "resolving model catalog");

    match resolver.resolve(&connections).await {
        CatalogPass::Completed(catalog) => {
            if let Some(warning) = &catalog.warning {
                tracing::warn!(warning = %warning, "catalog degraded to empty model list");
            }
            print_catalog(&catalog.models);
        }
        CatalogPass::Superseded { started, newest } => {
            tracing::debug!(started, newest, "resolution pass superseded");
        }
    }
}

/// Polls the settings file and republishes the catalog on every connection
/// change until the process is interrupted.
async fn watch_catalog(resolver: ModelCatalogResolver, settings_path: PathBuf) {
    let (conn_tx, conn_rx) = watch::channel(SettingsStore::new(settings_path.clone()).connections());
    let (service, mut catalog_rx) = CatalogService::new(resolver, conn_rx);
    tokio::spawn(service.run());

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SETTINGS_POLL_INTERVAL);
        loop {
            interval.tick().await;
            let current = SettingsStore::new(settings_path.clone()).connections();
            let changed = *conn_tx.borrow() != current;
            if changed && conn_tx.send(current).is_err() {
                break;
            }
        }
    });

    while catalog_rx.changed().await.is_ok() {
        let models = catalog_rx.borrow().clone();
        println!("catalog updated ({} models)", models.len());
        print_catalog(&models);
    }
}

fn print_catalog(models: &[Model]) {
    if models.is_empty() {
        println!("no models resolved");
        return;
    }

    for model in models {
        println!("{}\t{}\t{}", model.id, model.name, model.connection_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> RunnerResult<RunnerArgs> {
        parse_args(raw.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn parses_settings_path_and_watch_flag() {
        let parsed = args(&["--settings", "/tmp/s.json", "--watch"]).expect("valid args");
        assert_eq!(parsed.settings_path, Some(PathBuf::from("/tmp/s.json")));
        assert!(parsed.watch);

        let parsed = args(&[]).expect("no args is valid");
        assert_eq!(parsed.settings_path, None);
        assert!(!parsed.watch);
    }

    #[test]
    fn rejects_unknown_and_dangling_arguments() {
        assert!(matches!(
            args(&["--frobnicate"]),
            Err(RunnerError::UnknownArgument { .. })
        ));
        assert!(matches!(
            args(&["--settings"]),
            Err(RunnerError::MissingArgumentValue { .. })
        ));
    }
}
