use clap::Parser;

/// Interactive OpenID Connect console client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print the authorization URL instead of launching the system browser
    #[arg(long)]
    pub no_browser: bool,
}
