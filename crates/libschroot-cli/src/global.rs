use clap::Parser;

/// Message verbosity, common to all front-ends.
#[derive(Parser, Debug, Default)]
pub struct GlobalOpts {
    /// Print only essential messages
    #[arg(short, long)]
    pub quiet: bool,

    /// Print all messages
    #[arg(short, long)]
    pub verbose: bool,
}
