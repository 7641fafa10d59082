use gif_harden::{inspect_file, GifHardenError, GifSummary, ParseFailure};
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Smallest well-formed GIF89a: 1x1 canvas, one frame, one data byte.
const HEALTH_CHECK_GIF: &[u8] = &[
    b'G', b'I', b'F', b'8', b'9', b'a', 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x01, 0x44, 0x00, 0x3B,
];

struct Options {
    print_metrics: bool,
    serve_metrics: Option<u16>,
    files: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("gif_harden_cli");

    // Handle special flags
    if args.len() == 2 {
        match args[1].as_str() {
            "--version" | "-v" => {
                println!("gif_harden_cli v{}", VERSION);
                println!("Hardened GIF89a container parsing with Rust");
                return;
            }
            "--health-check" | "--health" => match gif_harden::parse(HEALTH_CHECK_GIF) {
                Ok(_) => {
                    println!("OK");
                    process::exit(0);
                }
                Err(e) => {
                    eprintln!("FAILED: {}", e);
                    process::exit(1);
                }
            },
            "--help" | "-h" => {
                print_help(program);
                return;
            }
            _ => {}
        }
    }

    let options = match parse_args(&args[1.min(args.len())..]) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("Try '{} --help' for more information.", program);
            process::exit(2);
        }
    };

    if options.files.is_empty() {
        eprintln!("Usage: {} [OPTIONS] <FILE>...", program);
        eprintln!("Try '{} --help' for more information.", program);
        process::exit(2);
    }

    #[cfg(feature = "metrics")]
    let server = start_metrics(&options);

    let mut failures = 0;
    for path in &options.files {
        match inspect_file(path) {
            Ok(summary) => print_summary(path, &summary),
            Err(e) => {
                failures += 1;
                print_failure(path, &e);
            }
        }
    }

    #[cfg(feature = "metrics")]
    {
        if options.print_metrics {
            match gif_harden::metrics::gather_text() {
                Ok(text) => print!("{}", text),
                Err(e) => eprintln!("Failed to encode metrics: {}", e),
            }
        }
        if let Some(handle) = server {
            // Keep serving until the process is killed.
            let _ = handle.join();
        }
    }

    if cfg!(not(feature = "metrics")) && (options.print_metrics || options.serve_metrics.is_some()) {
        eprintln!("Metrics support was not compiled in (enable the `metrics` feature)");
    }

    if failures > 0 {
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        print_metrics: false,
        serve_metrics: None,
        files: Vec::new(),
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--metrics" => options.print_metrics = true,
            "--serve-metrics" => {
                let port = iter
                    .next()
                    .ok_or_else(|| "--serve-metrics requires a PORT".to_string())?;
                let port = port
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port: {}", port))?;
                options.serve_metrics = Some(port);
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option: {}", flag)),
            file => options.files.push(file.to_string()),
        }
    }
    Ok(options)
}

#[cfg(feature = "metrics")]
fn start_metrics(options: &Options) -> Option<std::thread::JoinHandle<()>> {
    if !options.print_metrics && options.serve_metrics.is_none() {
        return None;
    }
    if let Err(e) = gif_harden::metrics::init_metrics() {
        eprintln!("Failed to register metrics: {}", e);
        return None;
    }
    let port = options.serve_metrics?;
    match gif_harden::metrics_server::start_metrics_server(port) {
        Ok(handle) => {
            eprintln!("Serving metrics on http://0.0.0.0:{}/metrics", port);
            Some(handle)
        }
        Err(e) => {
            eprintln!("Failed to start metrics server: {}", e);
            None
        }
    }
}

fn print_summary(path: &str, summary: &GifSummary) {
    println!(
        "{}: {}x{}, {} frame(s), {} global colors, repeat {}, total delay {}cs, {} trailing byte(s)",
        path,
        summary.width,
        summary.height,
        summary.frames.len(),
        summary.global_colors,
        summary.repeat_count,
        summary.total_delay,
        summary.leftover_bytes,
    );
    for (index, frame) in summary.frames.iter().enumerate() {
        println!(
            "  frame {}: {}x{} at ({}, {}), delay {}cs, {} local colors{}, {} compressed byte(s)",
            index,
            frame.width,
            frame.height,
            frame.left,
            frame.top,
            frame.delay,
            frame.local_colors,
            if frame.interlaced { ", interlaced" } else { "" },
            frame.compressed_bytes,
        );
    }
}

fn print_failure(path: &str, error: &GifHardenError) {
    match error {
        GifHardenError::Parse(ParseFailure { error, position }) => {
            let offset = position.map_or_else(|| "-".to_string(), |p| p.to_string());
            eprintln!(
                "{}: rejected: {} (code {}, {}) at byte offset {}",
                path,
                error,
                error.code(),
                error.name(),
                offset
            );
        }
        GifHardenError::IoError(e) => eprintln!("{}: {}", path, e),
    }
}

fn print_help(program_name: &str) {
    println!("GIF Harden CLI v{}", VERSION);
    println!("Bounds-checked GIF89a container parsing for untrusted input");
    println!();
    println!("USAGE:");
    println!("    {} [OPTIONS] <FILE>...", program_name);
    println!();
    println!("OPTIONS:");
    println!("    -h, --help               Print this help message");
    println!("    -v, --version            Print version information");
    println!("    --health-check           Parse a built-in GIF and report OK");
    println!("    --metrics                Print Prometheus metrics after parsing");
    println!("    --serve-metrics PORT     Serve /metrics on PORT after parsing");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG                 Log filter, e.g. gif_harden=debug");
    println!();
    println!("EXIT STATUS:");
    println!("    0 if every file parsed, 1 if any was rejected, 2 on usage errors");
    println!();
    println!("EXAMPLES:");
    println!("    {} animation.gif", program_name);
    println!("    RUST_LOG=gif_harden=trace {} broken.gif", program_name);
    println!();
}
