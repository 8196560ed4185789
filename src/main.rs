use anyhow::Result;
use rayon::prelude::*;
use revscraper::{
    config::{Config, SeriesConfig},
    fetch,
    grid::read::{nominate_triangle_sheet, read_grid, sheet_names},
    nonrev,
    panel::{self, Audit},
    triangle::{extract_triangle, Extraction, IdentityLexicon},
};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// A spreadsheet on disk, ready for extraction.
struct Downloaded {
    series: SeriesConfig,
    path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) config + dirs ────────────────────────────────────────────
    let config_path =
        std::env::var("REVSCRAPER_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load(Path::new(&config_path))?;
    info!(
        series = config.series.len(),
        nonrev = config.nonrev.len(),
        "loaded config"
    );

    let scratch_dir = PathBuf::from("scratch");
    let out_dir = PathBuf::from("out");
    for d in [&scratch_dir, &out_dir] {
        fs::create_dir_all(d)?;
    }

    let lexicon = Arc::new(IdentityLexicon::from_config(&config));
    let mut audit = Audit::default();

    // ─── 3) discover + download every triangle file ──────────────────
    let client = fetch::build_client()?;
    let (tx, mut rx) = mpsc::channel::<Result<Downloaded, (SeriesConfig, String)>>(32);
    let dl_sem = Arc::new(Semaphore::new(3));
    let mut dl_handles = Vec::with_capacity(config.series.len());

    for series in config.series.clone() {
        let client = client.clone();
        let scratch_dir = scratch_dir.clone();
        let tx = tx.clone();
        let sem = dl_sem.clone();

        dl_handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await.expect("semaphore is never closed");
            let code = series.identity.code.clone();
            match acquire_file(&client, &series, &scratch_dir).await {
                Ok(path) => {
                    info!(code = %code, path = %path.display(), "acquired");
                    let _ = tx.send(Ok(Downloaded { series, path })).await;
                }
                Err(err) => {
                    error!(code = %code, "acquisition failed: {err:#}");
                    let _ = tx.send(Err((series, err.to_string()))).await;
                }
            }
        }));
    }
    // drop the original sender so `rx.recv()` ends once all downloads finish
    drop(tx);

    let mut downloaded: Vec<Downloaded> = Vec::new();
    while let Some(msg) = rx.recv().await {
        match msg {
            Ok(dl) => downloaded.push(dl),
            Err((series, reason)) => {
                audit.record_skipped(&series.identity.code, &series.url, reason);
            }
        }
    }
    for h in dl_handles {
        let _ = h.await;
    }
    info!("{} files downloaded", downloaded.len());

    // ─── 4) extract every sheet; one bad sheet never aborts the rest ─
    let results: Vec<(SeriesConfig, String, Result<Extraction, String>)> = downloaded
        .par_iter()
        .map(|dl| {
            let source = dl.path.display().to_string();
            let result = extract_file(dl, &lexicon).map_err(|e| format!("{e:#}"));
            (dl.series.clone(), source, result)
        })
        .collect();

    let mut batches = Vec::with_capacity(results.len() + config.nonrev.len());
    for (series, source, result) in results {
        let code = &series.identity.code;
        match result {
            Ok(extraction) => {
                audit.record_extracted(
                    code,
                    &source,
                    extraction.batch.num_rows(),
                    extraction.stats,
                );
                batches.push(extraction.batch);
            }
            Err(reason) => {
                error!(code = %code, "extraction failed: {reason}");
                audit.record_skipped(code, &source, reason);
            }
        }
    }

    // ─── 5) non-revised series ───────────────────────────────────────
    for series in &config.nonrev {
        let code = &series.identity.code;
        match nonrev::fetch_series(&client, code).await {
            Ok(observations) => match nonrev::to_batch(&observations, &series.identity, &lexicon) {
                Ok(batch) => {
                    audit.record_extracted(code, "timeseries api", batch.num_rows(), Default::default());
                    batches.push(batch);
                }
                Err(err) => {
                    error!(code = %code, "reshaping series failed: {err:#}");
                    audit.record_skipped(code, "timeseries api", err.to_string());
                }
            },
            Err(err) => {
                error!(code = %code, "fetching series failed: {err:#}");
                audit.record_skipped(code, "timeseries api", err.to_string());
            }
        }
    }

    // ─── 6) assemble + persist ───────────────────────────────────────
    let panel = panel::assemble_panel(&batches)?;
    panel::write_panel(&panel, &out_dir.join("realtimedata.parquet"))?;
    audit.write(&out_dir.join("audit.json"))?;
    info!(
        rows = panel.num_rows(),
        skipped = audit.skipped_count(),
        "all done"
    );
    Ok(())
}

/// Find the current edition's link on the series landing page, download it,
/// and unpack the triangle spreadsheet when the link is a zip archive.
async fn acquire_file(
    client: &reqwest::Client,
    series: &SeriesConfig,
    scratch_dir: &Path,
) -> Result<PathBuf> {
    let links = fetch::pages::find_files(client, &series.url).await?;
    let link = links
        .first()
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("no spreadsheet links on {}", series.url))?;

    let file_name = link
        .rsplit('/')
        .next()
        .unwrap_or(link)
        .split('?')
        .next()
        .unwrap_or(link)
        .to_string();
    let dest = scratch_dir.join(&file_name);
    fetch::files::download(client, link, &dest).await?;

    if file_name.to_lowercase().ends_with(".zip") {
        fetch::zips::extract_member(&dest, &series.identity.code, &series.identity.short_name)
    } else {
        Ok(dest)
    }
}

/// Read the nominated triangle sheet from a workbook and run the extraction
/// pipeline on it.
fn extract_file(dl: &Downloaded, lexicon: &IdentityLexicon) -> Result<Extraction, anyhow::Error> {
    let names = sheet_names(&dl.path)?;
    let sheet = nominate_triangle_sheet(&names)
        .ok_or_else(|| anyhow::anyhow!("no triangle sheet in {}", dl.path.display()))?;
    let grid = read_grid(&dl.path, sheet)?;
    let extraction = extract_triangle(
        &grid,
        &dl.series.identity,
        dl.series.frequency,
        lexicon,
    )?;
    Ok(extraction)
}
