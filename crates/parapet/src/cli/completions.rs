use clap::CommandFactory;
use clap_complete::Shell;

/// Generate shell completions to stdout.
pub fn run(shell: Shell) -> i32 {
    let mut cmd = crate::Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
    0
}
