// Plain-text renderings of the alert log for the operator.

use std::path::Path;

use chrono::NaiveDate;
use hazard_vision::core_modules::alert_store::DATE_FORMAT;
use hazard_vision::core_modules::zone_summary::RECENT_INCIDENT_COUNT;
use hazard_vision::{AlertStore, ZoneSummary};

pub fn print_dates(dates: &[NaiveDate]) {
    if dates.is_empty() {
        println!("No archives available.");
        return;
    }
    for (i, date) in dates.iter().enumerate() {
        println!(" [{}] {}", i + 1, date.format(DATE_FORMAT));
    }
}

pub fn print_zones(date: NaiveDate, zones: &[String]) {
    println!("Zones recorded on {}:", date.format(DATE_FORMAT));
    if zones.is_empty() {
        println!("No zone recorded for this date.");
        return;
    }
    for (i, zone) in zones.iter().enumerate() {
        println!(" [{}] {zone}", i + 1);
    }
}

pub fn print_summary(date: NaiveDate, zone: &str, summary: &ZoneSummary) {
    println!("REPORT: {}", zone.to_uppercase());
    println!("Report date : {}", date.format(DATE_FORMAT));
    println!("Source file : {}", AlertStore::zone_file_name(zone));
    println!();
    println!("Total incidents : {}", summary.total);
    println!("HIGH risks      : {}", summary.high);
    println!("MEDIUM risks    : {}", summary.medium);
    println!("LOW risks       : {}", summary.low);
    println!();
    println!("--- LAST {RECENT_INCIDENT_COUNT} RECORDED INCIDENTS ---");
    if summary.recent.is_empty() {
        println!("No incident.");
    }
    for record in &summary.recent {
        println!("{record}");
    }
}

pub fn print_raw(text: &str) {
    println!("--- START OF FILE ---");
    print!("{text}");
    println!("--- END OF FILE ---");
}

pub fn print_info(model_path: &Path, log_root: &Path) {
    let log_root = std::fs::canonicalize(log_root).unwrap_or_else(|_| log_root.to_path_buf());
    println!("OS        : {} {}", std::env::consts::OS, std::env::consts::ARCH);
    let opencv_version = opencv::core::get_version_string().unwrap_or_else(|_| "unknown".to_string());
    println!("OpenCV    : {opencv_version}");
    println!("Model     : {}", model_path.display());
    println!("Log root  : {}", log_root.display());
}
