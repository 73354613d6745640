//! Combines the reports of several scanner jobs into one report per format.
//!
//! Grepable output is line based, so the parts are concatenated. XML reports
//! are merged by copying every `<host>` element into a single `<nmaprun>`
//! document; everything outside the hosts (scan info, run stats) is dropped.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

const HOST: &[u8] = b"host";

/// Concatenates grepable reports in the given order.
pub fn merge_gnmap<S: AsRef<str>>(parts: &[S]) -> String {
    let mut merged = String::new();
    for part in parts {
        let part = part.as_ref();
        merged.push_str(part);
        if !part.is_empty() && !part.ends_with('\n') {
            merged.push('\n');
        }
    }
    merged
}

/// Merges XML reports into one `<nmaprun>` document holding all their hosts.
pub fn merge_xml<S: AsRef<str>>(parts: &[S]) -> Result<String, quick_xml::Error> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("nmaprun");
    root.push_attribute(("scanner", "nmap"));
    writer.write_event(Event::Start(root))?;

    for part in parts {
        copy_hosts(part.as_ref(), &mut writer)?;
    }

    writer.write_event(Event::End(BytesEnd::new("nmaprun")))?;
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

fn copy_hosts(xml: &str, writer: &mut Writer<Vec<u8>>) -> Result<(), quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    // Nesting depth inside the current <host>, 0 when outside.
    let mut depth = 0usize;

    loop {
        let event = reader.read_event()?;
        let inside = match &event {
            Event::Eof => break,
            Event::Start(e) if depth == 0 => {
                if e.name().as_ref() == HOST {
                    depth = 1;
                }
                depth > 0
            }
            Event::Start(_) => {
                depth += 1;
                true
            }
            Event::End(_) if depth > 0 => {
                depth -= 1;
                true
            }
            _ => depth > 0,
        };
        if inside {
            writer.write_event(event)?;
        }
    }

    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::xml;

    const FIRST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<nmaprun scanner="nmap" args="nmap -sS">
<scaninfo type="syn" protocol="tcp" numservices="1"/>
<hosthint><status state="up"/><address addr="10.0.0.1" addrtype="ipv4"/></hosthint>
<host><status state="up" reason="syn-ack"/><address addr="10.0.0.1" addrtype="ipv4"/><hostnames/><ports><port protocol="tcp" portid="22"><state state="open"/></port></ports></host>
<runstats><finished time="1"/></runstats>
</nmaprun>"#;

    const SECOND: &str = r#"<?xml version="1.0"?>
<nmaprun scanner="nmap">
<host><status state="up"/><address addr="10.0.1.7" addrtype="ipv4"/><ports><port protocol="tcp" portid="3306"><state state="open"/></port><port protocol="tcp" portid="80"><state state="open"/></port></ports></host>
</nmaprun>"#;

    #[test]
    fn gnmap_parts_are_concatenated_in_order() {
        let merged = merge_gnmap(&["Host: 10.0.0.1 ()\tPorts: 22/open/tcp//ssh///", "# Nmap done\n", ""]);
        assert_eq!(merged, "Host: 10.0.0.1 ()\tPorts: 22/open/tcp//ssh///\n# Nmap done\n");
    }

    #[test]
    fn xml_hosts_of_every_part_survive() {
        let merged = merge_xml(&[FIRST, SECOND]).unwrap();

        assert_eq!(merged.matches("<host>").count(), 2);
        assert!(!merged.contains("runstats"));
        assert!(!merged.contains("hosthint"));

        let mut findings: Vec<(String, u16)> = xml::parse(&merged)
            .unwrap()
            .into_iter()
            .map(|f| (f.ip.to_string(), f.port))
            .collect();
        findings.sort();
        assert_eq!(
            findings,
            vec![
                ("10.0.0.1".to_string(), 22),
                ("10.0.1.7".to_string(), 80),
                ("10.0.1.7".to_string(), 3306)
            ]
        );
    }

    #[test]
    fn merging_nothing_gives_an_empty_run() {
        let merged = merge_xml::<&str>(&[]).unwrap();
        assert!(merged.contains("<nmaprun"));
        assert!(xml::parse(&merged).unwrap().is_empty());
    }

    #[test]
    fn broken_part_is_an_error() {
        assert!(merge_xml(&["<nmaprun><host></nmaprun>"]).is_err());
    }
}
