use std::sync::Arc;

use clap::{value_parser, Arg, ArgAction, Command};
use cpal::SupportedStreamConfig;

use crate::{
    audio::sink::AudioSink,
    modules::{console, send, InitContext, Module},
};

pub fn parse_args(
    output: SupportedStreamConfig,
    sink: Arc<AudioSink>,
) -> Box<Arc<dyn Module + Send + Sync + 'static>> {
    let m = Command::new("spirit-box")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .subcommands([
            Command::new("console")
                .alias("c")
                .about("Opens the interactive transmitter dashboard.")
                .args([
                    Arg::new("frequency")
                        .short('f')
                        .long("frequency")
                        .help("Carrier tone for keyed signals. (Hz)")
                        .value_parser(value_parser!(u32))
                        .default_value("600"),
                    Arg::new("fps")
                        .long("fps")
                        .help("Dashboard redraw rate.")
                        .value_parser(value_parser!(u32))
                        .default_value("30"),
                    Arg::new("hidden")
                        .long("hidden")
                        .help("Arms the embedded data layer from the start.")
                        .action(ArgAction::SetTrue),
                ]),
            Command::new("send")
                .alias("s")
                .about("Keys one message out and exits.")
                .args([
                    Arg::new("text")
                        .help("The message to key out.")
                        .required(true),
                    Arg::new("frequency")
                        .short('f')
                        .long("frequency")
                        .help("Carrier tone for keyed signals. (Hz)")
                        .value_parser(value_parser!(u32))
                        .default_value("600"),
                    Arg::new("timeline")
                        .long("timeline")
                        .help("Prints the signal timeline as JSON instead of keying it.")
                        .action(ArgAction::SetTrue),
                ]),
        ])
        .get_matches();

    let ic = |x| InitContext {
        args: x,
        output,
        sink,
    };

    match m.subcommand() {
        Some(("console", m)) => Box::new(console::Console::new(ic(m.to_owned()))),
        Some(("send", m)) => Box::new(send::SendText::new(ic(m.to_owned()))),
        _ => panic!("Invalid Subcommand"),
    }
}
