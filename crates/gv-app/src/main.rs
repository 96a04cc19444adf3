//! Command-line viewer for partitioned datasets

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gv_core::{DataRange, Event, EventMask, GridModel};
use gv_data::{
    ColumnProjection, DirFetcher, HttpFetcher, PartFetcher, SourceConfig, SourceModel,
};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SourceConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => SourceConfig::default(),
    };
    if let Some(header) = &args.header {
        config.partitioned.header = header.clone();
    }

    if args.is_remote() {
        run(HttpFetcher::new(args.source.clone()), &args, &config).await
    } else {
        run(DirFetcher::new(&args.source), &args, &config).await
    }
}

async fn run<F: PartFetcher>(fetcher: F, args: &Args, config: &SourceConfig) -> Result<()> {
    let model = Arc::new(
        SourceModel::open_partitioned(fetcher, config)
            .await
            .with_context(|| format!("opening {}", args.source))?,
    );

    let failures = Arc::new(AtomicUsize::new(0));
    let counter = failures.clone();
    model.publisher().add_subscriber(move |event: &Event| {
        if event.is(EventMask::FETCH_ERROR) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let view = ColumnProjection::new(model.clone(), args.columns.clone());
    let range = DataRange::new(args.rows, args.cols);

    view.load_data(range);
    model.wait_idle().await;

    if args.reload {
        info!("Reloading");
        view.reload();
        model.wait_idle().await;
    }

    let failed = failures.load(Ordering::SeqCst);
    if failed > 0 {
        warn!("{} block fetches failed; their cells are left blank", failed);
    }

    print_window(&view, range)
}

fn print_window(view: &impl GridModel, range: DataRange) -> Result<()> {
    let total = view.total();
    if total.is_empty() {
        info!("Dataset is empty");
        return Ok(());
    }

    let rows = [range.rows[0], range.rows[1].min(total.total_rows.saturating_sub(1))];
    let cols = [range.cols[0], range.cols[1].min(total.total_cols.saturating_sub(1))];

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let names: Vec<String> = (cols[0]..=cols[1])
        .filter_map(|c| view.column(c).map(|info| info.name))
        .collect();
    writeln!(out, "row\t{}", names.join("\t"))?;

    for row in rows[0]..=rows[1] {
        let values: Vec<String> = (cols[0]..=cols[1])
            .map(|col| {
                view.cell(col, row)
                    .map(|cell| cell.value.to_string())
                    .unwrap_or_default()
            })
            .collect();
        writeln!(out, "{}\t{}", row, values.join("\t"))?;
    }
    Ok(())
}
