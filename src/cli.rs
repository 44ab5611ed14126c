use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "watchtime", version, about = "Per-user daily video watch-time tracking server")]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = TracingFormat::default())]
    pub tracing: TracingFormat,

    /// Override the listen port from configuration
    #[arg(long, env = "WATCHTIME_PORT")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable, colored output
    Pretty,
    /// One JSON object per line
    Json,
}

impl Default for TracingFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            TracingFormat::Pretty
        } else {
            TracingFormat::Json
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tracing_format() {
        let args = Args::parse_from(["watchtime", "--tracing", "json", "--port", "9000"]);
        assert_eq!(args.tracing, TracingFormat::Json);
        assert_eq!(args.port, Some(9000));
    }
}
