//! Static HTML report generation from a price sheet.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use token_pricer::sheet::SheetEntry;
use token_pricer::ReportData;

/// Render a static HTML report to `out_path`. Embeds the full sheet JSON for verification.
pub fn render_report(data: &ReportData, out_path: impl AsRef<Path>) -> Result<(), ReportError> {
    let html = build_html(data)?;
    let mut f = std::fs::File::create(out_path.as_ref()).map_err(ReportError::Io)?;
    f.write_all(html.as_bytes()).map_err(ReportError::Io)?;
    Ok(())
}

/// Build HTML string from report data (for testing or in-memory use).
pub fn build_html(data: &ReportData) -> Result<String, ReportError> {
    let json_embed = serde_json::to_string(&data).map_err(ReportError::Json)?;
    let json_escaped = escape_json_in_html(&json_embed);
    let sheet = &data.sheet;
    let network = escape_html(&sheet.network);
    let block = sheet
        .block
        .map(|b| b.to_string())
        .unwrap_or_else(|| "latest".to_string());

    let mut rows = String::new();
    for entry in &sheet.entries {
        rows.push_str(&entry_row(entry));
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8"/>
<meta name="viewport" content="width=device-width,initial-scale=1"/>
<title>Price Sheet - {network} @ {block}</title>
<style>
:root {{ font-family: system-ui, sans-serif; background: #0f1419; color: #e6edf3; }}
body {{ max-width: 960px; margin: 0 auto; padding: 1.5rem; }}
h1 {{ font-size: 1.4rem; margin-bottom: 0.5rem; }}
h2 {{ font-size: 1.1rem; margin-top: 1.5rem; color: #8b949e; }}
.mono {{ font-family: ui-monospace, monospace; font-size: 0.9em; word-break: break-all; }}
.card {{ background: #161b22; border: 1px solid #30363d; border-radius: 6px; padding: 1rem; margin: 0.5rem 0; }}
.grid {{ display: grid; grid-template-columns: auto 1fr; gap: 0.25rem 1rem; }}
.label {{ color: #8b949e; }}
.hash {{ font-size: 0.85em; }}
.footer {{ margin-top: 2rem; font-size: 0.85rem; color: #8b949e; }}
table {{ width: 100%; border-collapse: collapse; }}
th, td {{ text-align: left; padding: 0.3rem 0.5rem; border-bottom: 1px solid #30363d; vertical-align: top; }}
.failed {{ color: #f85149; }}
.ok {{ color: #3fb950; }}
</style>
</head>
<body>
<h1>Price Sheet</h1>
<p>Network <span class="mono">{network}</span>, block <span class="mono">{block}</span></p>
<p>Generated: {created}</p>

<h2>Summary</h2>
<div class="card">
  <div class="grid">
    <span class="label">Tokens</span><span class="mono">{token_count}</span>
    <span class="label">Priced</span><span class="mono">{priced}</span>
    <span class="label">Unpriced</span><span class="mono">{unpriced}</span>
  </div>
</div>

<h2>Reproducibility</h2>
<div class="card">
  <div class="mono hash">SHA-256: {hash}</div>
  <p class="footer">Anyone can verify this sheet by re-running <code>token-pricer verify --sheet &lt;file&gt;</code> and comparing the hash.</p>
</div>

<h2>Prices</h2>
<div class="card">
<table>
<thead><tr><th>Token</th><th>USD price</th><th>Source</th><th>Attempts</th></tr></thead>
<tbody>
{rows}</tbody>
</table>
</div>

<h2>Price sheet (embedded)</h2>
<div class="card">
  <p class="footer">The full price sheet is embedded below for verification. Do not edit.</p>
  <script type="application/json" id="price-sheet">{json_embed}</script>
</div>

<div class="footer">
  <p>Generated by token-pricer. Read-only tool; prices come from on-chain oracle calls at the stated block.</p>
</div>
</body>
</html>"#,
        network = network,
        block = block,
        created = escape_html(&sheet.created_utc_rfc3339),
        token_count = sheet.entries.len(),
        priced = sheet.priced_count(),
        unpriced = sheet.entries.len() - sheet.priced_count(),
        hash = escape_html(&data.sheet_hash_sha256),
        rows = rows,
        json_embed = json_escaped,
    );
    Ok(html)
}

fn entry_row(entry: &SheetEntry) -> String {
    let price = match &entry.usd_price {
        Some(p) => format!(r#"<span class="ok">{}</span>"#, escape_html(p)),
        None => r#"<span class="failed">unpriced</span>"#.to_string(),
    };
    let source = entry
        .oracle
        .map(|o| o.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut attempts = String::new();
    for a in &entry.attempts {
        let outcome = match &a.usd_price {
            Some(p) if !a.reverted => escape_html(p),
            _ => "failed".to_string(),
        };
        let _ = write!(attempts, "{}: {}<br/>", a.oracle, outcome);
    }
    format!(
        "<tr><td class=\"mono\">{}</td><td>{}</td><td>{}</td><td class=\"mono\">{}</td></tr>\n",
        escape_html(&entry.token),
        price,
        escape_html(&source),
        attempts
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_json_in_html(s: &str) -> String {
    escape_html(s)
}

#[derive(Debug)]
pub enum ReportError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Io(e) => write!(f, "io: {}", e),
            ReportError::Json(e) => write!(f, "json: {}", e),
        }
    }
}

impl std::error::Error for ReportError {}
