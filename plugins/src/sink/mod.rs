mod fanout;
pub mod influx;
mod jsonl;

pub use fanout::FanoutSink;
pub use influx::{InfluxSink, SinkHttpError, SinkHttpErrorKind};
pub use jsonl::JsonlSink;
