use anyhow::{bail, Context, Result};
use lithium_facilities::{
    aggregate::{capacity_by_status, count_by_region, count_by_status, count_by_technology, summary},
    cli::{Cli, Commands},
    config::Config,
    geojson::record_from_value,
    import::{import_file, sync_from_remote},
    remote::SnapshotCache,
    store::ImportMode,
    ConsoleUi, Directory, Document, FacilityStore, Phase, Ui, UiApp,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::io::Read;
use std::time::Instant;
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = Config::from_args(&cli.global)?;

    match cli.command {
        Commands::Import { file, merge } => {
            let start = Instant::now();
            let mut store = config.open_store()?;
            let mode = if merge { ImportMode::Merge } else { ImportMode::Replace };
            let stats = import_file(&mut store, &file, mode)?;
            println!(
                "\nImported {} facilities into {:?} ({} skipped) in {:.1}s",
                stats.imported,
                config.db_path,
                stats.skipped,
                start.elapsed().as_secs_f64()
            );
        }

        Commands::Sync { no_cache } => {
            let remote = config
                .remote_directory()?
                .context("sync needs --remote or LITHIUM_REMOTE")?;
            let cache = if no_cache { None } else { Some(config.snapshot_cache()?) };
            let mut store = config.open_store()?;
            let stats = sync_from_remote(&remote, &mut store, cache.as_ref(), &mut ConsoleUi::new())?;
            println!("Synced {} facilities into {:?}", stats.imported, config.db_path);
        }

        command => match config.remote_directory()? {
            Some(remote) => {
                let cache = config.snapshot_cache()?;
                run(Directory::new(remote, config.session()), command, Some(&cache))?
            }
            None => run(Directory::new(config.open_store()?, config.session()), command, None)?,
        },
    }

    Ok(())
}

/// Fill the view, falling back to the offline snapshot when the store is
/// unreachable.
fn load<S: FacilityStore>(directory: &mut Directory<S>, snapshot: Option<&SnapshotCache>) -> Result<()> {
    match directory.load() {
        Ok(_) => {
            if let Some(cache) = snapshot {
                if let Err(e) = cache.save(directory.view().records()) {
                    warn!(error = %e, "could not refresh snapshot");
                }
            }
            Ok(())
        }
        Err(e) => match snapshot.map(SnapshotCache::load).transpose()?.flatten() {
            Some(records) => {
                warn!(error = %e, "directory unavailable, using offline snapshot");
                directory.seed(records);
                Ok(())
            }
            None => Err(e).context("Failed to load facilities"),
        },
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json(source: &str) -> Result<Value> {
    let text = if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        text
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to open: {}", source))?
    };
    serde_json::from_str(&text).context("Invalid JSON")
}

fn run<S: FacilityStore>(
    mut directory: Directory<S>,
    command: Commands,
    snapshot: Option<&SnapshotCache>,
) -> Result<()> {
    match command {
        Commands::List {
            status,
            search,
            all,
            json,
        } => {
            load(&mut directory, snapshot)?;
            let view = directory.view_mut();
            view.set_filter(status);
            view.set_search(search.as_deref().unwrap_or_default());

            let rows: Vec<_> = view
                .list_rows()
                .into_iter()
                .filter(|row| all || row.visible)
                .collect();
            if json {
                print_json(&rows)?;
            } else {
                for row in &rows {
                    println!(
                        "{}\t{}\t{}\t{}\t{}",
                        row.id, row.company, row.status, row.capacity, row.address
                    );
                }
            }
            if directory.view().has_no_match() {
                eprintln!("No facilities match the current filters.");
            }
        }

        Commands::Show { id } => {
            let mut record = directory.get(&id)?;
            record.timeline = record.sorted_timeline().into_iter().cloned().collect();
            print_json(&record)?;
        }

        Commands::Summary => {
            load(&mut directory, snapshot)?;
            let view = directory.view();
            let records = view.records();
            print_json(&json!({
                "summary": summary(records),
                "statusCounts": count_by_status(records),
                "capacityByStatus": capacity_by_status(records),
                "byTechnology": count_by_technology(records),
                "byRegion": count_by_region(records),
                "charts": [view.capacity_series(), view.technology_series(), view.region_series()],
            }))?;
        }

        Commands::Markers { sized } => {
            load(&mut directory, snapshot)?;
            directory.view_mut().set_size_by_capacity(sized);
            let view = directory.view();
            let center = view
                .visible_bounds()
                .map(|b| b.center())
                .unwrap_or(lithium_facilities::view::DEFAULT_CENTER);
            print_json(&json!({
                "center": {"lon": center.0, "lat": center.1},
                "markers": view.markers(),
            }))?;
        }

        Commands::Create { json } => {
            let record = record_from_value(read_json(&json)?)?;
            let created = directory.create(record)?;
            print_json(&created)?;
        }

        Commands::Update { id, json } => {
            let patch: Value = serde_json::from_str(&json).context("Invalid JSON patch")?;
            let updated = directory.update(&id, &patch)?;
            print_json(&updated)?;
        }

        Commands::Delete { id } => {
            directory.delete(&id)?;
            println!("Deleted {}", id);
        }

        Commands::DocAdd {
            id,
            name,
            url,
            file,
            size,
        } => {
            let document = match (url, file) {
                (Some(url), _) => Document::link(&name, &url)?,
                (None, Some(path)) => Document::file(&name, &path, size)?,
                (None, None) => bail!("doc-add needs --url or --file"),
            };
            let added = directory.add_document(&id, document)?;
            print_json(&added)?;
        }

        Commands::DocRm { id, doc_id } => {
            directory.remove_document(&id, &doc_id)?;
            println!("Removed document {} from {}", doc_id, id);
        }

        Commands::Browse => {
            let mut app = UiApp::new()?;
            app.set_phase(Phase::Loading);
            if let Err(e) = load(&mut directory, snapshot) {
                app.log(format!("{:#}", e));
            }
            app.set_phase(Phase::Complete);
            app.run(&mut directory)?;
            app.restore()?;
        }

        Commands::Import { .. } | Commands::Sync { .. } => {
            bail!("import and sync run against the local store only")
        }
    }

    Ok(())
}
