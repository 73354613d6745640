//! Self-contained HTML dashboard.
//!
//! The page is static markup plus one `<script>` block holding the audit as a
//! JSON document. Everything the page draws (stat cards, charts, the three
//! tables and the heat-map) is derived from that document in the browser, so
//! the Rust side only has to serialize data, never build markup per host.
//!
//! The criticality thresholds are embedded from [`CRITICALITY_TIERS`], the
//! same table the textual reports use.

use serde::Serialize;

use crate::criticality::{CRITICALITY_TIERS, Criticality, Tier};
use crate::export::json::AuditInfo;
use crate::export::{ArtifactKind, Exporter, RenderError, RunMetadata, TOOL_NAME, format_duration};
use crate::model::AuditModel;

const CHART_JS: &str = "https://cdnjs.cloudflare.com/ajax/libs/Chart.js/3.9.1/chart.min.js";
const TOP_SEGMENTS: usize = 10;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SegmentRow {
    network: String,
    host_count: usize,
    port_count: usize,
    criticality: Criticality,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HostRow {
    ip: String,
    segment: String,
    ports: Vec<u16>,
    services: Vec<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceRow {
    category: &'static str,
    service: &'static str,
    port: u16,
    ip: String,
    segment: String,
}

#[derive(Serialize)]
struct CategorySlice {
    category: &'static str,
    count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardData {
    audit_info: AuditInfo,
    scan_duration: String,
    tiers: &'static [Tier],
    categories: Vec<CategorySlice>,
    top_segments: Vec<SegmentRow>,
    segments: Vec<SegmentRow>,
    hosts: Vec<HostRow>,
    services: Vec<ServiceRow>,
}

impl DashboardData {
    fn new(model: &AuditModel, meta: &RunMetadata) -> Self {
        let segment_row = |s: &crate::model::Segment| SegmentRow {
            network: s.network.to_string(),
            host_count: s.host_count(),
            port_count: s.port_count(),
            criticality: s.criticality(),
        };

        let hosts = model
            .segments()
            .iter()
            .flat_map(|segment| {
                segment.hosts.iter().map(move |host| HostRow {
                    ip: host.ip.to_string(),
                    segment: segment.network.to_string(),
                    ports: host.ports.iter().map(|p| p.port).collect(),
                    services: host.ports.iter().map(|p| p.service).collect(),
                })
            })
            .collect();

        let services = model
            .categories()
            .iter()
            .flat_map(|(category, findings)| {
                findings.iter().map(move |f| ServiceRow {
                    category: category.as_str(),
                    service: f.service,
                    port: f.port,
                    ip: f.ip.to_string(),
                    segment: f.segment.to_string(),
                })
            })
            .collect();

        Self {
            audit_info: AuditInfo::new(model, meta),
            scan_duration: format_duration(meta.scan_duration),
            tiers: &CRITICALITY_TIERS,
            categories: model
                .stats()
                .category_counts
                .iter()
                .map(|(category, count)| CategorySlice {
                    category: category.as_str(),
                    count: *count,
                })
                .collect(),
            top_segments: model
                .top_segments(TOP_SEGMENTS)
                .into_iter()
                .map(segment_row)
                .collect(),
            segments: model.segments().iter().map(segment_row).collect(),
            hosts,
            services,
        }
    }
}

/// Makes serialized JSON safe inside an inline `<script>` element.
///
/// JSON strings may legally contain `</script>`, `<!--` and the JavaScript
/// line terminators U+2028/U+2029; all are replaced by `\u` escapes, which
/// leave the decoded value unchanged.
fn script_safe(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes text placed in HTML element content.
fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub struct DashboardExporter;

impl Exporter for DashboardExporter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Dashboard
    }

    fn render(&self, model: &AuditModel, meta: &RunMetadata) -> Result<Vec<u8>, RenderError> {
        let data = DashboardData::new(model, meta);
        let json = script_safe(&serde_json::to_string(&data)?);
        let title = html_escape(&format!("Dashboard de Auditoría - {}", meta.display_time()));

        let html = format!(
            r#"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<script src="{chart_js}"></script>
<style>
{STYLE}
</style>
</head>
<body>
<div class="container">
  <header>
    <h1>Auditoría de Segmentación de Red</h1>
    <p class="subtitle">{title} &middot; {tool}</p>
  </header>

  <section class="stats">
    <div class="card"><span class="value" id="stat-scanned"></span><span class="label">Segmentos Escaneados</span></div>
    <div class="card"><span class="value" id="stat-active"></span><span class="label">Segmentos Activos</span></div>
    <div class="card"><span class="value" id="stat-hosts"></span><span class="label">Hosts Activos</span></div>
    <div class="card"><span class="value" id="stat-rate"></span><span class="label">Tasa de Actividad</span></div>
  </section>

  <section class="charts">
    <div class="panel"><h2>Servicios por Categoría</h2><canvas id="services-chart"></canvas></div>
    <div class="panel"><h2>Top 10 Segmentos</h2><canvas id="segments-chart"></canvas></div>
  </section>

  <section class="panel">
    <h2>Mapa de Calor de Segmentos</h2>
    <div id="heatmap" class="heatmap"></div>
    <div id="legend" class="legend"></div>
  </section>

  <section class="panel">
    <nav class="tabs">
      <button class="tab active" data-tab="segments">Segmentos</button>
      <button class="tab" data-tab="hosts">Hosts</button>
      <button class="tab" data-tab="services">Servicios</button>
    </nav>
    <div class="tab-body active" id="tab-segments">
      <table><thead><tr><th>Segmento</th><th>Hosts</th><th>Puertos</th><th>Criticidad</th></tr></thead><tbody></tbody></table>
    </div>
    <div class="tab-body" id="tab-hosts">
      <table><thead><tr><th>IP</th><th>Segmento</th><th>Puertos</th><th>Servicios</th></tr></thead><tbody></tbody></table>
    </div>
    <div class="tab-body" id="tab-services">
      <table><thead><tr><th>Categoría</th><th>Servicio</th><th>Puerto</th><th>IP</th><th>Segmento</th></tr></thead><tbody></tbody></table>
    </div>
  </section>

  <footer>Duración del escaneo: <span id="scan-duration"></span></footer>
</div>

<script id="audit-data" type="application/json">{json}</script>
<script>
{SCRIPT}
</script>
</body>
</html>
"#,
            chart_js = CHART_JS,
            tool = TOOL_NAME,
        );

        Ok(html.into_bytes())
    }
}

const STYLE: &str = r#"* { box-sizing: border-box; margin: 0; padding: 0; }
body { font-family: "Segoe UI", Tahoma, Geneva, Verdana, sans-serif; background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); min-height: 100vh; color: #333; }
.container { max-width: 1400px; margin: 0 auto; padding: 20px; }
header { text-align: center; color: #fff; margin-bottom: 30px; }
header h1 { font-size: 2.4em; text-shadow: 2px 2px 4px rgba(0,0,0,0.3); }
.subtitle { opacity: 0.9; margin-top: 8px; }
.stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); gap: 20px; margin-bottom: 30px; }
.card { background: rgba(255,255,255,0.95); border-radius: 15px; padding: 25px; text-align: center; box-shadow: 0 8px 32px rgba(0,0,0,0.1); }
.card .value { display: block; font-size: 2.5em; font-weight: bold; color: #667eea; }
.card .label { color: #666; text-transform: uppercase; letter-spacing: 1px; font-size: 0.9em; }
.charts { display: grid; grid-template-columns: repeat(auto-fit, minmax(450px, 1fr)); gap: 20px; margin-bottom: 30px; }
.panel { background: rgba(255,255,255,0.95); border-radius: 15px; padding: 25px; box-shadow: 0 8px 32px rgba(0,0,0,0.1); margin-bottom: 30px; }
.panel h2 { margin-bottom: 15px; color: #444; }
.heatmap { display: grid; grid-template-columns: repeat(auto-fill, minmax(120px, 1fr)); gap: 6px; }
.cell { border-radius: 6px; padding: 8px; font-size: 0.8em; color: #fff; text-align: center; }
.legend { display: flex; gap: 15px; margin-top: 15px; flex-wrap: wrap; }
.legend span { display: inline-flex; align-items: center; gap: 6px; font-size: 0.9em; }
.legend i { width: 14px; height: 14px; border-radius: 3px; display: inline-block; }
.level-critical { background: #c0392b; }
.level-high { background: #e67e22; }
.level-medium { background: #f1c40f; color: #333; }
.level-low { background: #27ae60; }
.level-none { background: #bdc3c7; color: #333; }
.tabs { display: flex; gap: 10px; margin-bottom: 15px; }
.tab { border: none; background: #eee; padding: 10px 20px; border-radius: 8px; cursor: pointer; font-size: 1em; }
.tab.active { background: #667eea; color: #fff; }
.tab-body { display: none; max-height: 600px; overflow-y: auto; }
.tab-body.active { display: block; }
table { width: 100%; border-collapse: collapse; }
th, td { padding: 10px; text-align: left; border-bottom: 1px solid #eee; }
th { background: #f5f5ff; position: sticky; top: 0; }
footer { text-align: center; color: #fff; opacity: 0.85; padding: 10px; }"#;

const SCRIPT: &str = r#"const data = JSON.parse(document.getElementById('audit-data').textContent);
const info = data.auditInfo;

function levelFor(hosts) {
  const tier = data.tiers.find(t => hosts >= t.minHosts);
  return tier ? tier.level : 'none';
}

function cell(text) {
  const td = document.createElement('td');
  td.textContent = text;
  return td;
}

function fillTable(id, rows, columns) {
  const body = document.querySelector('#' + id + ' tbody');
  for (const row of rows) {
    const tr = document.createElement('tr');
    for (const column of columns) {
      tr.appendChild(cell(column(row)));
    }
    body.appendChild(tr);
  }
}

document.getElementById('stat-scanned').textContent = info.totalSegmentsScanned;
document.getElementById('stat-active').textContent = info.activeSegments;
document.getElementById('stat-hosts').textContent = info.activeHosts;
document.getElementById('stat-rate').textContent = info.activityRate.toFixed(2) + '%';
document.getElementById('scan-duration').textContent = data.scanDuration;

const palette = ['#667eea', '#764ba2', '#f093fb', '#f5576c', '#4facfe', '#43e97b', '#fa709a'];

if (window.Chart) {
  new Chart(document.getElementById('services-chart'), {
    type: 'doughnut',
    data: {
      labels: data.categories.map(c => c.category),
      datasets: [{ data: data.categories.map(c => c.count), backgroundColor: palette }]
    },
    options: { responsive: true, plugins: { legend: { position: 'bottom' } } }
  });

  new Chart(document.getElementById('segments-chart'), {
    type: 'bar',
    data: {
      labels: data.topSegments.map(s => s.network),
      datasets: [{ label: 'Hosts activos', data: data.topSegments.map(s => s.hostCount), backgroundColor: '#667eea' }]
    },
    options: { responsive: true, scales: { y: { beginAtZero: true, ticks: { precision: 0 } } } }
  });
}

const heatmap = document.getElementById('heatmap');
for (const segment of data.segments) {
  const div = document.createElement('div');
  div.className = 'cell level-' + levelFor(segment.hostCount);
  div.textContent = segment.network + ' (' + segment.hostCount + ')';
  div.title = segment.portCount + ' puertos abiertos';
  heatmap.appendChild(div);
}

const legend = document.getElementById('legend');
for (const tier of data.tiers) {
  const span = document.createElement('span');
  const swatch = document.createElement('i');
  swatch.className = 'level-' + tier.level;
  span.appendChild(swatch);
  span.appendChild(document.createTextNode(tier.level.toUpperCase() + ' (>= ' + tier.minHosts + ' hosts)'));
  legend.appendChild(span);
}

fillTable('tab-segments', data.segments, [s => s.network, s => s.hostCount, s => s.portCount, s => s.criticality.toUpperCase()]);
fillTable('tab-hosts', data.hosts, [h => h.ip, h => h.segment, h => h.ports.join(', '), h => h.services.join(', ')]);
fillTable('tab-services', data.services, [s => s.category, s => s.service, s => s.port, s => s.ip, s => s.segment]);

for (const button of document.querySelectorAll('.tab')) {
  button.addEventListener('click', () => {
    document.querySelectorAll('.tab').forEach(b => b.classList.remove('active'));
    document.querySelectorAll('.tab-body').forEach(b => b.classList.remove('active'));
    button.classList.add('active');
    document.getElementById('tab-' + button.dataset.tab).classList.add('active');
  });
}"#;

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
