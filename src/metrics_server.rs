// Prometheus Metrics HTTP Server
// Serves metrics on /metrics endpoint for Prometheus scraping

use crate::metrics::gather_text;
use std::thread;
use tiny_http::{Header, Response, Server};
use tracing::{error, info};

const ROOT_INFO: &str = r#"
gif_harden Metrics Server

Available endpoints:
  /metrics - Prometheus metrics (text format)
  /health  - Health check
"#;

/// Start the metrics HTTP server on the specified port.
/// Requests are served from a background thread; the handle is returned so
/// callers that have nothing else to do can join it.
pub fn start_metrics_server(port: u16) -> Result<thread::JoinHandle<()>, Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", port);
    let server = Server::http(&addr).map_err(|e| e.to_string())?;
    let content_type = Header::from_bytes(&b"Content-Type"[..], &b"text/plain; version=0.0.4"[..])
        .map_err(|_| "invalid content type header".to_string())?;

    info!(%addr, "metrics server listening");

    let handle = thread::spawn(move || {
        for request in server.incoming_requests() {
            let response = match request.url() {
                "/metrics" => match gather_text() {
                    Ok(text) => Response::from_string(text).with_header(content_type.clone()),
                    Err(e) => {
                        error!(error = %e, "failed to encode metrics");
                        Response::from_string("Failed to encode metrics").with_status_code(500)
                    }
                },
                "/health" => Response::from_string("OK"),
                "/" => Response::from_string(ROOT_INFO),
                _ => Response::from_string("Not Found").with_status_code(404),
            };

            if let Err(e) = request.respond(response) {
                error!(error = %e, "failed to send response");
            }
        }
    });

    Ok(handle)
}

/// Start metrics server with default port (8080)
pub fn start_default_metrics_server() -> Result<thread::JoinHandle<()>, Box<dyn std::error::Error>> {
    start_metrics_server(8080)
}
