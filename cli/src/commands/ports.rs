use segmentor_common::config::Config;
use segmentor_core::knowledge_base;

use crate::terminal::{format, print};

pub fn ports(cfg: &Config) {
    print::header(
        &format!("{} critical ports", knowledge_base::PORTS.len()),
        cfg.quiet,
    );
    format::print_port_table(cfg);
}
