use std::fmt::Write;

use crate::parser::Request;

/// Serialize a [`Request`] to a JSON string.
///
/// When `pretty` is `true` the output is indented for readability.
pub fn format_json(request: &Request, pretty: bool) -> String {
    let rendered = if pretty {
        serde_json::to_string_pretty(request)
    } else {
        serde_json::to_string(request)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

/// Render a [`Request`] in a human-readable debug format.
pub fn format_debug(request: &Request) -> String {
    let mut out = String::with_capacity(256);

    out.push_str("=== HTTP Request ===\n");
    let _ = writeln!(out, "Method:  {}", request.method());
    let _ = writeln!(out, "Target:  {}", request.target());
    if let Some(line) = &request.request_line {
        let _ = writeln!(out, "Version: {}", line.version.as_str());
    }

    let _ = writeln!(out, "\n--- Headers ({}) ---", request.headers.len());
    for (name, value) in request.headers.iter() {
        let _ = writeln!(out, "  {name}: {value}");
    }

    if request.body.is_empty() {
        out.push_str("\n--- No Body ---\n");
    } else {
        let _ = writeln!(out, "\n--- Body ({} bytes) ---", request.body.len());
        match request.body_as_str() {
            Some(s) => out.push_str(s),
            None => {
                let _ = write!(out, "<binary data: {} bytes>", request.body.len());
            }
        }
        out.push('\n');
    }

    out.push_str("====================\n");
    out
}

/// Render only the request line and headers (no body).
pub fn format_headers_only(request: &Request) -> String {
    let mut out = String::with_capacity(64 + request.headers.len() * 40);

    if let Some(line) = &request.request_line {
        let _ = writeln!(out, "{line}");
    }
    for (name, value) in request.headers.iter() {
        let _ = writeln!(out, "{name}: {value}");
    }

    out
}
