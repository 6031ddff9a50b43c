use clap::{Args, Parser, Subcommand};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "dbcopy", version, about = "Follow database dumps landing in an S3 bucket", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wait for name.bz2.crypt and print its size
    Wait(WaitArgs),
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// S3 bucket
    #[arg(short, long, env = "DBCOPY_BUCKET")]
    pub bucket: String,

    /// Bucket region; discovered from the bucket when omitted
    #[arg(long, env = "DBCOPY_REGION")]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible stores (MinIO, R2, ...)
    #[arg(long, env = "DBCOPY_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Address buckets by path instead of by virtual host
    #[arg(long)]
    pub force_path_style: bool,
}

#[derive(Args, Debug, Clone)]
pub struct WaitArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// wait timeout, e.g. 1h, 30m, 1h30m, 90s
    #[arg(short, long, default_value = "1h", value_parser = parse_duration)]
    pub timeout: Duration,

    /// job name; markers are name.started, name.ok and name.error
    pub name: String,
}

/// Parse `1h`, `30m`, `1h30m`, `1.5h`, `90s`, `500ms` or bare seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err("empty duration".to_string());
    }

    let total = match text.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => parse_units(raw, text)?,
    };
    if total.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }
    Ok(total)
}

fn parse_units(raw: &str, text: &str) -> Result<Duration, String> {
    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut total = Duration::ZERO;
    let mut rest = text;

    while !rest.is_empty() {
        let split = rest
            .find(|c: char| !is_number(c))
            .ok_or_else(|| format!("missing unit in duration {:?}", raw))?;
        let (number, tail) = rest.split_at(split);
        let unit_len = tail.find(is_number).unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);

        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid duration {:?}", raw))?;
        let secs = match unit {
            "h" => value * 3600.0,
            "m" => value * 60.0,
            "s" => value,
            "ms" => value / 1000.0,
            other => return Err(format!("unknown unit {:?} in duration {:?}", other, raw)),
        };
        total += Duration::try_from_secs_f64(secs)
            .map_err(|_| format!("duration {:?} out of range", raw))?;
        rest = next;
    }
    Ok(total)
}
