use std::error::Error;

use crate::core::config::Config;
use crate::roast::service::LOCAL_USER;
use crate::store::{UsageStatus, UsageTracker};

pub fn describe_usage(status: &UsageStatus) -> String {
    match (status.limit, status.remaining()) {
        (Some(limit), Some(0)) => {
            format!("Used {} of {limit} free roasts today. Limit reached.", status.used)
        }
        (Some(limit), Some(remaining)) => format!(
            "Used {} of {limit} free roasts today, {remaining} left.",
            status.used
        ),
        _ => format!("Premium: unlimited roasts ({} today).", status.used),
    }
}

pub fn show_usage() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let tracker = UsageTracker::in_dir(&config.data_dir()?);
    let status = tracker.status_today(
        LOCAL_USER,
        config.free_daily_limit(),
        config.is_premium(),
    )?;
    println!("{}", describe_usage(&status));
    Ok(())
}
