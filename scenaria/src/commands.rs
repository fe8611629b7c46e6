use crate::CLAP_STYLING;
use clap::{Arg, arg, command};
use scenaria_sources::sparql::DEFAULT_ENDPOINT;

/// Options shared by every exploration mode.
fn source_args() -> Vec<Arg> {
    vec![
        arg!(--"endpoint" <URL>)
            .required(false)
            .help("SPARQL endpoint serving DBpedia wiki-links")
            .default_value(DEFAULT_ENDPOINT),
        arg!(--"delay-ms" <MILLIS>)
            .required(false)
            .help("Minimum delay between endpoint queries in milliseconds")
            .value_parser(clap::value_parser!(u64))
            .default_value("500"),
        arg!(--"timeout" <SECONDS>)
            .required(false)
            .help("Request timeout in seconds")
            .value_parser(clap::value_parser!(u64))
            .default_value("30"),
        arg!(--"deadline" <SECONDS>)
            .required(false)
            .help("Stop exploring after this many seconds and report partial results")
            .value_parser(clap::value_parser!(u64)),
        arg!(-o --"output" <PATH>)
            .required(false)
            .help("Save scenarios as JSON (default: display to screen only)"),
    ]
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("scenaria")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("scenaria")
        .about("Explore learning scenarios through the Wikipedia link graph")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress progress and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Show debug logging")
                .required(false)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            command!("path")
                .about(
                    "Build scenario paths from two anchor keywords, extending each by the \
                links it shares with everything chosen so far.",
                )
                .arg(
                    Arg::new("first")
                        .short('1')
                        .long("first")
                        .value_name("KEYWORD")
                        .required(true)
                        .help("The first anchor keyword"),
                )
                .arg(
                    Arg::new("second")
                        .short('2')
                        .long("second")
                        .value_name("KEYWORD")
                        .required(false)
                        .help("The second anchor keyword (default: choose from a sample of links)"),
                )
                .arg(
                    arg!(--"max-depth" <DEPTH>)
                        .required(false)
                        .help("Maximum scenario length, anchors included")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("7"),
                )
                .arg(
                    arg!(--"fanout" <COUNT>)
                        .required(false)
                        .help("Number of third anchors to build scenarios from")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("3"),
                )
                .args(source_args()),
        )
        .subcommand(
            command!("tree")
                .about(
                    "Build scenario trees from a start keyword, following the links most \
                similar to it in a word-vector model.",
                )
                .arg(
                    arg!(-s --"start" <KEYWORD>)
                        .required(true)
                        .help("The keyword every scenario starts from"),
                )
                .arg(
                    arg!(-m --"model" <PATH>)
                        .required(true)
                        .help("Path to a word2vec model"),
                )
                .arg(
                    arg!(--"text-model")
                        .required(false)
                        .help("Read the model in word2vec text format (default: binary)")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"max-depth" <DEPTH>)
                        .required(false)
                        .help("Deepest level below the start keyword")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("6"),
                )
                .arg(
                    arg!(--"fanout" <COUNT>)
                        .required(false)
                        .help("Number of trees to grow from the start keyword")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("3"),
                )
                .args(source_args()),
        )
}
