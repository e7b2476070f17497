use std::sync::Arc;

use anyhow::Result;

use harload_core::api::{NullSink, ResultSink, SinkConfig};

use crate::sink::{FanoutSink, InfluxSink, JsonlSink};

/// Builds the result sink described by `cfg`. Several configured sinks are
/// combined with [`FanoutSink`]; none at all yields [`NullSink`].
pub async fn build_sink(cfg: &SinkConfig) -> Result<Arc<dyn ResultSink>> {
    let mut sinks: Vec<Arc<dyn ResultSink>> = Vec::new();

    if let Some(url) = non_blank(cfg.influx_url.as_deref()) {
        let sink = InfluxSink::new(
            url,
            cfg.influx_database.as_deref(),
            cfg.influx_batch_size,
            cfg.influx_timeout,
        )?;
        tracing::info!(target: "harload.sink", url = %sink.write_url(), "influx sink enabled");
        sinks.push(Arc::new(sink));
    }

    if let Some(path) = non_blank(cfg.jsonl_path.as_deref()) {
        let sink = JsonlSink::open(path).await?;
        tracing::info!(target: "harload.sink", path = %sink.path(), "jsonl sink enabled");
        sinks.push(Arc::new(sink));
    }

    Ok(match sinks.len() {
        0 => Arc::new(NullSink),
        1 => sinks.remove(0),
        _ => Arc::new(FanoutSink::new(sinks)),
    })
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}
