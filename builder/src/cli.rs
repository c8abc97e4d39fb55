// SPDX-FileCopyrightText: 2026 Engine Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use bpaf::{batteries::verbose_by_slice, construct, long, OptionParser, Parser};
use tracing::level_filters::LevelFilter;

#[derive(Debug, Clone)]
pub struct Options {
    pub verbosity_level: LevelFilter,
    pub release: bool,
}

pub fn options() -> OptionParser<Options> {
    let verbosity_level = verbose_by_slice(
        3,
        [
            LevelFilter::OFF,
            LevelFilter::ERROR,
            LevelFilter::WARN,
            LevelFilter::INFO,
            LevelFilter::DEBUG,
            LevelFilter::TRACE,
        ],
    );

    let release = long("release")
        .help("Builds the engine with optimizations instead of sanitizers")
        .switch();

    construct!(Options {
        verbosity_level,
        release
    })
    .to_options()
}
