use colored::Colorize;
use scenaria::commands::command_argument_builder;
use scenaria::handlers::{handle_path, handle_tree, init_tracing};

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    init_tracing(chosen_command.get_flag("verbose"));

    let result = match chosen_command.subcommand() {
        Some(("path", primary_command)) => handle_path(primary_command, quiet).await,
        Some(("tree", primary_command)) => handle_tree(primary_command, quiet).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
