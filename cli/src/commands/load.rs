use std::time::Duration;

use harload_core::api::{
    load_entries, AppConfig, CliError, HarSupply, LoadSettings, LoadTest, ProxyConfig, RunReport,
};
use harload_plugins::factory::build_sink;

use super::cli::LoadArgs;

pub async fn handle_load(args: LoadArgs, cfg: AppConfig) -> Result<i32, CliError> {
    run_load(args, cfg, ProxyConfig::from_env()).await
}

/// Runs one load test with the flags of `args` layered over `cfg`.
pub async fn run_load(
    args: LoadArgs,
    mut cfg: AppConfig,
    proxy: ProxyConfig,
) -> Result<i32, CliError> {
    args.apply(&mut cfg);

    let har_file = args.har.display().to_string();
    let entries = load_entries(&args.har)?;
    let settings = LoadSettings::from_config(har_file.clone(), &cfg.load, proxy)?;
    let sink = build_sink(&cfg.sink)
        .await
        .map_err(|e| CliError::Config(format!("result sink: {e:#}")))?;

    tracing::info!(
        har_file = %har_file,
        entries = entries.len(),
        repeat = cfg.load.repeat,
        "har archive loaded"
    );
    let supply = HarSupply::new(har_file, entries, cfg.load.repeat);
    let test = LoadTest::new(settings).with_flush_interval(cfg.sink.flush_interval);

    let cancel = test.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping load test");
            cancel.cancel();
        }
    });

    let outcome = test.run(Box::new(supply), sink).await?;
    interrupt.abort();
    println!("{}", outcome.notice());

    let report = outcome.join(cfg.load.grace).await;
    println!("{}", summary(&report, cfg.load.grace));
    Ok(0)
}

/// One-line account of what the run did.
pub fn summary(report: &RunReport, grace: Duration) -> String {
    let mut line = format!(
        "{} requests ({} failed) by {} workers in {:.1}s",
        report.processed(),
        report.failed(),
        report.workers.len() + report.unfinished_workers,
        report.elapsed.as_secs_f64()
    );
    if report.unfinished_workers > 0 {
        line.push_str(&format!(
            ", {} still in flight after {}",
            report.unfinished_workers,
            humantime::format_duration(grace)
        ));
    }
    match report.results_forwarded {
        Some(n) => line.push_str(&format!(", {n} results forwarded")),
        None => line.push_str(&format!(
            ", sink did not drain within {}",
            humantime::format_duration(grace)
        )),
    }
    line
}
