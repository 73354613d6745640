#![cfg(test)]
use chrono::{TimeZone, Utc};
use segmentor_core::export::{
    CsvExporter, DashboardExporter, Exporter, JsonExporter, MarkdownExporter, RunMetadata,
    SummaryExporter,
};
use segmentor_core::finding::Finding;
use segmentor_core::knowledge_base::Category;
use segmentor_core::model::AuditModel;
use segmentor_core::parser::{gnmap, xml};
use serde_json::Value;
use std::net::Ipv4Addr;
use std::time::Duration;

const GNMAP: &str = "\
# Nmap 7.94 scan initiated Mon May  6 10:00:00 2024 as: nmap -n -sS --open -iL targets.txt
Host: 10.0.2.20 ()\tStatus: Up
Host: 10.0.2.20 ()\tPorts: 443/open/tcp//https///, 22/open/tcp//ssh///\tIgnored State: filtered (20)
Host: 10.0.2.3 ()\tPorts: 3306/open/tcp//mysql///, 8080/open/tcp//http-proxy///
Host: 10.0.10.7 ()\tPorts: 53/open/tcp//domain///, 445/open/tcp//microsoft-ds///
Host: 10.0.10.8 ()\tPorts: 9999/open/tcp//abyss///, 25/closed/tcp//smtp///
Host: 10.0.2.3 ()\tPorts: 3306/open/tcp//mysql///
# Nmap done at Mon May  6 10:05:00 2024 -- 512 IP addresses (4 hosts up) scanned in 300.00 seconds
";

const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<nmaprun scanner="nmap" args="nmap -n -sS --open" version="7.94">
  <host><status state="up"/><address addr="10.0.2.20" addrtype="ipv4"/>
    <ports><port protocol="tcp" portid="443"><state state="open"/></port><port protocol="tcp" portid="22"><state state="open"/></port></ports>
  </host>
  <host><status state="up"/><address addr="10.0.2.3" addrtype="ipv4"/>
    <ports><port protocol="tcp" portid="3306"><state state="open"/></port><port protocol="tcp" portid="8080"><state state="open"/></port></ports>
  </host>
  <host><status state="up"/><address addr="10.0.10.7" addrtype="ipv4"/>
    <ports><port protocol="tcp" portid="53"><state state="open"/></port><port protocol="tcp" portid="445"><state state="open"/></port></ports>
  </host>
  <host><status state="up"/><address addr="10.0.10.8" addrtype="ipv4"/>
    <ports><port protocol="tcp" portid="9999"><state state="open"/></port><port protocol="tcp" portid="25"><state state="closed"/></port></ports>
  </host>
</nmaprun>"#;

fn meta() -> RunMetadata {
    let start = Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 5, 6, 10, 6, 0).unwrap();
    RunMetadata::new(start, end, Duration::from_secs(300))
}

fn model() -> AuditModel {
    let findings: Vec<Finding> = gnmap::parse(GNMAP.lines()).collect();
    AuditModel::build(findings, 512)
}

#[test]
fn xml_and_grepable_sources_agree() {
    let from_gnmap = model();
    let from_xml = AuditModel::build(xml::parse(XML).unwrap(), 512);
    assert_eq!(from_gnmap, from_xml);
}

#[test]
fn csv_round_trips_every_finding() {
    let model = model();
    let bytes = CsvExporter.render(&model, &meta()).unwrap();

    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<&str>>(),
        vec!["Segment", "IP", "Port", "Service", "Category", "Timestamp"]
    );

    let mut rows: Vec<(Ipv4Addr, u16, String)> = Vec::new();
    for record in reader.records() {
        let record = record.unwrap();
        let ip: Ipv4Addr = record[1].parse().unwrap();
        let port: u16 = record[2].parse().unwrap();
        let category = Category::from_name(&record[4]).unwrap();
        let expected = Finding::new(ip, port);

        assert_eq!(record[0], expected.segment.to_string());
        assert_eq!(&record[3], expected.service);
        assert_eq!(category, expected.category);
        assert_eq!(&record[5], "2024-05-06T10:00:00Z");
        rows.push((ip, port, record[3].to_string()));
    }

    let mut from_model: Vec<(Ipv4Addr, u16, String)> = model
        .findings()
        .map(|f| (f.ip, f.port, f.service.to_string()))
        .collect();
    rows.sort();
    from_model.sort();
    assert_eq!(rows, from_model);
    assert_eq!(rows.len(), 7);
}

#[test]
fn json_single_host_is_well_formed() {
    let model = AuditModel::build(vec![Finding::new(Ipv4Addr::new(172, 16, 0, 9), 5900)], 768);
    let bytes = JsonExporter.render(&model, &meta()).unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(json["auditInfo"]["totalSegmentsScanned"], 768);
    assert_eq!(json["auditInfo"]["activeSegments"], 1);
    assert_eq!(json["auditInfo"]["activeHosts"], 1);

    let segments = json["segments"].as_array().unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0]["network"], "172.16.0.0/24");

    let hosts = segments[0]["hosts"].as_array().unwrap();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0]["ip"], "172.16.0.9");
    assert_eq!(hosts[0]["openPorts"][0]["port"], 5900);
    assert_eq!(hosts[0]["openPorts"][0]["service"], "VNC");
    assert_eq!(hosts[0]["openPorts"][0]["category"], "ADMINISTRATION");
}

#[test]
fn exporters_agree_on_counts() {
    let model = model();
    let meta = meta();

    let csv_rows = String::from_utf8(CsvExporter.render(&model, &meta).unwrap())
        .unwrap()
        .lines()
        .count()
        - 1;

    let json: Value = serde_json::from_slice(&JsonExporter.render(&model, &meta).unwrap()).unwrap();
    let json_ports: usize = json["segments"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|s| s["hosts"].as_array().unwrap().iter())
        .map(|h| h["openPorts"].as_array().unwrap().len())
        .sum();
    let json_categories: u64 = json["serviceCategories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["count"].as_u64().unwrap())
        .sum();

    assert_eq!(csv_rows, model.stats().total_findings);
    assert_eq!(json_ports, csv_rows);
    assert_eq!(json_categories as usize, csv_rows);
    assert_eq!(json["auditInfo"]["activeHosts"], 4);
    assert_eq!(json["auditInfo"]["activeSegments"], 2);

    let md = String::from_utf8(MarkdownExporter.render(&model, &meta).unwrap()).unwrap();
    assert!(md.contains("| Hosts activos | 4 |"));
    assert!(md.contains("### 10.0.2.0/24 (2 hosts, criticidad LOW)"));
    assert!(md.contains("### OTHER (1 servicios)"));

    let summary = String::from_utf8(SummaryExporter.render(&model, &meta).unwrap()).unwrap();
    assert!(summary.contains("Hosts activos:         4"));
}

fn dashboard_data(html: &str) -> Value {
    let start_tag = r#"<script id="audit-data" type="application/json">"#;
    let start = html.find(start_tag).unwrap() + start_tag.len();
    let end = start + html[start..].find("</script>").unwrap();
    serde_json::from_str(&html[start..end]).unwrap()
}

fn strings(values: &Value, key: &str) -> Vec<String> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v[key].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn segments_sort_numerically_in_every_artifact() {
    let model = model();
    let meta = meta();

    let networks = vec!["10.0.2.0/24".to_string(), "10.0.10.0/24".to_string()];
    let hosts: Vec<String> = ["10.0.2.3", "10.0.2.20", "10.0.10.7", "10.0.10.8"]
        .iter()
        .map(|ip| ip.to_string())
        .collect();

    let md = String::from_utf8(MarkdownExporter.render(&model, &meta).unwrap()).unwrap();
    let first = md.find("### 10.0.2.0/24").unwrap();
    let second = md.find("### 10.0.10.0/24").unwrap();
    assert!(first < second);

    let json: Value = serde_json::from_slice(&JsonExporter.render(&model, &meta).unwrap()).unwrap();
    assert_eq!(strings(&json["segments"], "network"), networks);
    let json_hosts: Vec<String> = json["segments"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|s| strings(&s["hosts"], "ip"))
        .collect();
    assert_eq!(json_hosts, hosts);
    let ports: Vec<u64> = json["segments"][0]["hosts"][1]["openPorts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["port"].as_u64().unwrap())
        .collect();
    assert_eq!(ports, vec![22, 443]);

    let html = String::from_utf8(DashboardExporter.render(&model, &meta).unwrap()).unwrap();
    let data = dashboard_data(&html);
    assert_eq!(strings(&data["segments"], "network"), networks);
    assert_eq!(strings(&data["hosts"], "ip"), hosts);
    assert_eq!(strings(&data["topSegments"], "network"), networks);

    // CSV groups rows by category; inside a category rows follow the model order.
    let csv = CsvExporter.render(&model, &meta).unwrap();
    let mut reader = csv::Reader::from_reader(csv.as_slice());
    let rows: Vec<(Category, Ipv4Addr, u16)> = reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            (Category::from_name(&r[4]).unwrap(), r[1].parse().unwrap(), r[2].parse().unwrap())
        })
        .collect();
    let expected: Vec<(Category, Ipv4Addr, u16)> = model
        .categories()
        .iter()
        .flat_map(|(category, findings)| findings.iter().map(move |f| (*category, f.ip, f.port)))
        .collect();
    assert_eq!(rows, expected);

    let rank = |c: &Category| Category::ALL.iter().position(|a| a == c).unwrap();
    for pair in rows.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(rank(&a.0) <= rank(&b.0));
        if a.0 == b.0 {
            assert!((a.1, a.2) < (b.1, b.2), "{a:?} listed before {b:?}");
        }
    }
    assert_eq!(rows[0], (Category::Administration, Ipv4Addr::new(10, 0, 2, 20), 22));
}

#[test]
fn rendering_twice_is_byte_identical() {
    let meta = meta();
    let exporters: Vec<Box<dyn Exporter>> = vec![
        Box::new(CsvExporter),
        Box::new(JsonExporter),
        Box::new(MarkdownExporter),
        Box::new(DashboardExporter),
        Box::new(SummaryExporter),
    ];

    for exporter in &exporters {
        let first = exporter.render(&model(), &meta).unwrap();
        let second = exporter.render(&model(), &meta).unwrap();
        assert_eq!(first, second, "{} output changed between renders", exporter.kind());
    }
}
