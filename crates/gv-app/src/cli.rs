//! Command-line arguments

use std::path::PathBuf;
use clap::Parser;

/// Print a window of a partitioned JSON dataset.
#[derive(Parser, Debug)]
#[command(name = "gridview", about = "Fetch and print a window of a partitioned dataset.")]
pub struct Args {
    /// Dataset location: a directory or an http(s) base URL.
    pub source: String,

    /// Header file name, relative to the source.
    #[arg(long)]
    pub header: Option<String>,

    /// JSON file with block size and dataset settings.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Inclusive row span, `min:max`.
    #[arg(long, default_value = "0:19", value_parser = parse_span)]
    pub rows: [usize; 2],

    /// Inclusive logical column span, `min:max`.
    #[arg(long, default_value = "0:9", value_parser = parse_span)]
    pub cols: [usize; 2],

    /// Physical column order, e.g. `3,0,1`. Defaults to all columns.
    #[arg(long, value_delimiter = ',')]
    pub columns: Option<Vec<usize>>,

    /// Fetch everything again after the first pass.
    #[arg(long)]
    pub reload: bool,
}

impl Args {
    pub fn is_remote(&self) -> bool {
        self.source.starts_with("http://") || self.source.starts_with("https://")
    }
}

/// Parse `min:max` (or a single index) into an inclusive span
pub fn parse_span(value: &str) -> Result<[usize; 2], String> {
    let parse = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid index '{}': {}", s, e))
    };

    let span = match value.split_once(':') {
        Some((min, max)) => [parse(min)?, parse(max)?],
        None => {
            let index = parse(value)?;
            [index, index]
        }
    };
    if span[0] > span[1] {
        return Err(format!("span {} is empty", value));
    }
    Ok(span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_span() {
        assert_eq!(parse_span("0:19"), Ok([0, 19]));
        assert_eq!(parse_span(" 4 "), Ok([4, 4]));
        assert!(parse_span("9:1").is_err());
        assert!(parse_span("a:1").is_err());
    }

    #[test]
    fn test_args() {
        let args = Args::parse_from([
            "gridview",
            "https://example.com/data",
            "--rows",
            "100:120",
            "--columns",
            "3,0,1",
        ]);
        assert!(args.is_remote());
        assert_eq!(args.rows, [100, 120]);
        assert_eq!(args.cols, [0, 9]);
        assert_eq!(args.columns, Some(vec![3, 0, 1]));
    }
}
