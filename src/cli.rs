use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "bmp-aggregator", about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, short = 'c', default_value = "aggregator.yml")]
    pub config: String,

    /// Log filter override (e.g. "info", "bmp_aggregator=debug")
    #[arg(long)]
    pub log_level: Option<String>,
}
