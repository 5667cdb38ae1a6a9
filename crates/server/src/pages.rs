//! Server-rendered HTML for the browser flow.

use vidcompress_core::format::human_bytes;
use vidcompress_transcoder::record::ResultRecord;

const STYLE: &str = "\
body{font-family:ui-sans-serif,system-ui;margin:40px;max-width:800px;line-height:1.6}
.form-group{margin:12px 0}
label{display:block;margin-bottom:6px;font-weight:600}
input,select{width:100%;padding:8px;border:1px solid #d1d5db;border-radius:6px}
button,.button{background:#111827;color:#fff;border:0;padding:12px 20px;border-radius:8px;cursor:pointer;text-decoration:none}
pre{background:#f3f4f6;padding:12px;border-radius:6px;overflow:auto}
.grid{display:grid;grid-template-columns:repeat(auto-fit,minmax(160px,1fr));gap:8px}
.card{border:1px solid #e5e7eb;border-radius:8px;padding:8px}
table{border-collapse:collapse}td{padding:4px 12px 4px 0}";

pub fn upload_page() -> String {
    format!(
        r#"<!doctype html>
<meta charset="utf-8">
<title>Video Compress</title>
<style>{STYLE}</style>
<h1>Video Compress</h1>
<form method="post" action="/compress" enctype="multipart/form-data">
  <div class="form-group">
    <label>Video file</label>
    <input type="file" name="file" accept="video/*" required>
  </div>
  <div class="grid">
    <div class="card">
      <label>Speed mode</label>
      <select name="speed">
        <option value="ai" selected>Automatic (by file size)</option>
        <option value="turbo">Turbo preview</option>
        <option value="ultra_fast">Ultra Fast</option>
        <option value="super_fast">Super Fast</option>
        <option value="fast">Fast</option>
        <option value="balanced">Balanced</option>
        <option value="quality">Quality</option>
        <option value="max">Max compression</option>
      </select>
    </div>
    <div class="card">
      <label>Resolution</label>
      <select name="resolution">
        <option value="original" selected>Original</option>
        <option value="360p">360p</option>
        <option value="480p">480p</option>
        <option value="720p">720p</option>
        <option value="1080p">1080p</option>
        <option value="1440p">1440p</option>
        <option value="2160p">2160p</option>
      </select>
    </div>
    <div class="card">
      <label>Video codec</label>
      <select name="codec">
        <option value="h264" selected>H.264</option>
        <option value="h265">H.265/HEVC</option>
        <option value="copy">Copy video stream</option>
      </select>
    </div>
    <div class="card">
      <label>Hardware</label>
      <select name="hw">
        <option value="none" selected>CPU only</option>
        <option value="videotoolbox">macOS VideoToolbox</option>
      </select>
    </div>
    <div class="card">
      <label>Audio</label>
      <select name="audio">
        <option value="aac" selected>AAC</option>
        <option value="opus">Opus</option>
        <option value="copy">Copy audio</option>
      </select>
    </div>
    <div class="card">
      <label>Container</label>
      <select name="outExt">
        <option value=".mp4" selected>.mp4</option>
        <option value=".mov">.mov</option>
      </select>
    </div>
    <div class="card">
      <label>Frame rate cap</label>
      <input type="number" name="fps" min="1" max="60" placeholder="source">
    </div>
  </div>
  <p><button type="submit">Compress</button></p>
</form>
<p><a href="/api-docs">API documentation</a></p>
"#
    )
}

/// Minimal escaping for text placed in element content or attributes.
pub fn escape_html(s: &str) -> String {
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

pub fn result_page(record: &ResultRecord, original_name: &str, download_name: &str) -> String {
    let saved = if record.input_bytes > 0 {
        100.0 - (record.output_bytes as f64 / record.input_bytes as f64) * 100.0
    } else {
        0.0
    };
    let name = escape_html(download_name);
    format!(
        r#"<!doctype html>
<meta charset="utf-8">
<title>Compressed: {original}</title>
<style>{STYLE}</style>
<h1>Done</h1>
<p>{original} was compressed.</p>
<table>
  <tr><td>Mode</td><td>{mode} ({decider})</td></tr>
  <tr><td>Resolution</td><td>{resolution}</td></tr>
  <tr><td>Codecs</td><td>{codec} / {audio}</td></tr>
  <tr><td>Hardware</td><td>{hw}</td></tr>
  <tr><td>Input</td><td>{input}</td></tr>
  <tr><td>Output</td><td>{output} ({saved:.1}% smaller)</td></tr>
  <tr><td>Encode time</td><td>{elapsed_ms} ms</td></tr>
  <tr><td>Throughput</td><td>{throughput:.2} MB/s</td></tr>
</table>
<p><a class="button" href="/dl/{id}?name={name}">Download {name}</a></p>
<p><a href="/meta/{id}">JSON metadata</a> &middot; <a href="/">Compress another</a></p>
"#,
        original = escape_html(original_name),
        mode = record.mode,
        decider = record.mode_decider,
        resolution = escape_html(&record.resolution),
        codec = record.codec.as_str(),
        audio = record.audio.as_str(),
        hw = record.hw.as_str(),
        input = human_bytes(record.input_bytes),
        output = human_bytes(record.output_bytes),
        elapsed_ms = record.elapsed_ms,
        throughput = record.throughput_mb_s,
        id = record.id,
    )
}

pub fn api_docs_page() -> String {
    format!(
        r#"<!doctype html>
<meta charset="utf-8">
<title>Video Compress API</title>
<style>{STYLE}</style>
<h1>API</h1>
<h3>POST /compress</h3>
<p>Multipart form. <code>file</code> is required. Optional fields:
<code>speed</code> (ai, turbo, ultra_fast, super_fast, fast, balanced, quality, max),
<code>resolution</code> (original, 360p to 2160p),
<code>codec</code> (h264, h265, copy),
<code>audio</code> (aac, opus, copy),
<code>hw</code> (none, videotoolbox),
<code>fps</code> (1 to 60),
<code>outExt</code> (.mp4, .mov).</p>
<p>Send <code>Accept: application/octet-stream</code> or <code>api=1</code> to receive the
file directly. The response carries <code>X-Mode</code>, <code>X-Mode-Decider</code>,
<code>X-Encode-Duration-Ms</code>, <code>X-Throughput-MBps</code>, <code>X-Input-Bytes</code>,
<code>X-Output-Bytes</code>, <code>X-Resolution</code>, <code>X-Video-Codec</code>,
<code>X-Audio-Codec</code> and <code>X-HW</code>.</p>
<pre>
curl -H "Accept: application/octet-stream" \
     -F "file=@input.mp4" -F "speed=ai" \
     http://localhost:8080/compress -o output.mp4
</pre>
<h3>GET /dl/{{id}}</h3>
<p>Download a result produced through the browser flow.</p>
<h3>GET /meta/{{id}}</h3>
<p>JSON metadata for a stored result.</p>
<h3>GET /health</h3>
<p>Service status and detected encoders.</p>
<p>Errors are JSON: <code>{{"error": {{"code", "message", "details"}}}}</code>.</p>
"#
    )
}
