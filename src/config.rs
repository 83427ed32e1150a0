use std::{env, path::PathBuf, time::Duration};

use crate::services::alert_monitor::DedupPolicy;

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    pub data_file: PathBuf,
    pub static_dir: PathBuf,

    pub check_interval: Duration,
    pub item_delay: Duration,
    pub request_timeout: Duration,

    pub buff_cookie: String,
    pub buff_base_url: String,
    pub buff_game: String,

    pub discord_webhook_url: String,

    pub dedup: DedupPolicy,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let host = var_or("HOST", "0.0.0.0");
    let port = parse_var::<u16>("PORT").unwrap_or(3000);

    let data_file = PathBuf::from(var_or("DATA_FILE", "items.json"));
    let static_dir = PathBuf::from(var_or("STATIC_DIR", "public"));

    let check_interval = Duration::from_secs(parse_var::<u64>("CHECK_INTERVAL_SECONDS").unwrap_or(60).max(1));
    let item_delay = Duration::from_millis(parse_var::<u64>("ITEM_DELAY_MS").unwrap_or(2000));
    let request_timeout =
        Duration::from_secs(parse_var::<u64>("REQUEST_TIMEOUT_SECONDS").unwrap_or(10).max(1));

    let buff_cookie = var_or("BUFF_COOKIE", "");
    let buff_base_url = var_or("BUFF_BASE_URL", "https://buff.163.com")
        .trim_end_matches('/')
        .to_string();
    let buff_game = var_or("BUFF_GAME", "csgo");

    let discord_webhook_url = var_or("DISCORD_WEBHOOK_URL", "");

    let dedup = match var_or("ALERT_DEDUP", "off").trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => DedupPolicy::Enabled {
            cooldown: parse_var::<u64>("ALERT_COOLDOWN_SECONDS").map(Duration::from_secs),
        },
        _ => DedupPolicy::Disabled,
    };

    Settings {
        host,
        port,
        data_file,
        static_dir,
        check_interval,
        item_delay,
        request_timeout,
        buff_cookie,
        buff_base_url,
        buff_game,
        discord_webhook_url,
        dedup,
    }
}
