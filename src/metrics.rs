// Prometheus Metrics for GIF parsing
// Tracks parse outcomes, rejection reasons and input shape

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

use crate::ParseError;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref GIFS_PARSED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("gif_parse_total", "Total number of GIF buffers parsed")
            .namespace("gif_harden"),
        &["status"]
    ).unwrap();

    pub static ref PARSE_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("gif_parse_failures_total", "GIF parse failures by error")
            .namespace("gif_harden"),
        &["error"]
    ).unwrap();

    pub static ref READ_PAST_BUFFER_TOTAL: Counter = Counter::new(
        "gif_harden_gif_read_past_buffer_total",
        "Inputs that tried to make the parser read past the end of the buffer"
    ).unwrap();

    pub static ref ALLOCATION_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("gif_allocation_failures_total", "Refused allocations during parsing")
            .namespace("gif_harden"),
        &["kind"]
    ).unwrap();

    pub static ref PARSE_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("gif_parse_duration_seconds", "Parse duration in seconds")
            .namespace("gif_harden")
            .buckets(vec![0.00001, 0.0001, 0.001, 0.01, 0.1, 1.0]),
        &["status"]
    ).unwrap();

    pub static ref INPUT_SIZE_BYTES: HistogramVec = HistogramVec::new(
        HistogramOpts::new("gif_input_size_bytes", "Input size distribution in bytes")
            .namespace("gif_harden")
            .buckets(vec![1024.0, 10240.0, 102400.0, 1048576.0, 10485760.0, 67108864.0]),
        &["status"]
    ).unwrap();

    pub static ref FRAMES_PER_GIF: HistogramVec = HistogramVec::new(
        HistogramOpts::new("gif_frames", "Frames per successfully parsed GIF")
            .namespace("gif_harden")
            .buckets(vec![1.0, 2.0, 10.0, 50.0, 100.0, 1000.0, 10000.0]),
        &["status"]
    ).unwrap();
}

/// Initialize and register all metrics with the Prometheus registry
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    REGISTRY.register(Box::new(GIFS_PARSED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PARSE_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(READ_PAST_BUFFER_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ALLOCATION_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PARSE_DURATION_SECONDS.clone()))?;
    REGISTRY.register(Box::new(INPUT_SIZE_BYTES.clone()))?;
    REGISTRY.register(Box::new(FRAMES_PER_GIF.clone()))?;
    Ok(())
}

/// Record a successful parse
pub fn record_gif_parsed(input_size: usize, frames: usize, duration_secs: f64) {
    GIFS_PARSED_TOTAL.with_label_values(&["success"]).inc();
    INPUT_SIZE_BYTES
        .with_label_values(&["success"])
        .observe(input_size as f64);
    FRAMES_PER_GIF
        .with_label_values(&["success"])
        .observe(frames as f64);
    PARSE_DURATION_SECONDS
        .with_label_values(&["success"])
        .observe(duration_secs);
}

/// Record a rejected input
pub fn record_gif_failed(error: ParseError) {
    GIFS_PARSED_TOTAL.with_label_values(&["failure"]).inc();
    PARSE_FAILURES_TOTAL.with_label_values(&[error.name()]).inc();
    match error {
        ParseError::ReadPastBuffer => READ_PAST_BUFFER_TOTAL.inc(),
        ParseError::AllocationFailed => ALLOCATION_FAILURES_TOTAL.with_label_values(&["alloc"]).inc(),
        ParseError::ReallocationFailed => ALLOCATION_FAILURES_TOTAL.with_label_values(&["realloc"]).inc(),
        _ => {}
    }
}

/// Render the registry in the Prometheus text exposition format
pub fn gather_text() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_failure_counts_by_error() {
        let before = PARSE_FAILURES_TOTAL.with_label_values(&["frame_data_empty"]).get();
        record_gif_failed(ParseError::FrameDataEmpty);
        let after = PARSE_FAILURES_TOTAL.with_label_values(&["frame_data_empty"]).get();
        assert!(after >= before + 1.0);
    }

    #[test]
    fn test_read_past_buffer_counter() {
        let before = READ_PAST_BUFFER_TOTAL.get();
        record_gif_failed(ParseError::ReadPastBuffer);
        assert!(READ_PAST_BUFFER_TOTAL.get() >= before + 1.0);
    }

    #[test]
    fn test_gather_after_init() {
        // Registration can only succeed once per process.
        let _ = init_metrics();
        record_gif_parsed(128, 1, 0.0001);
        let text = gather_text().unwrap();
        assert!(text.contains("gif_harden_gif_parse_total"));
    }
}
