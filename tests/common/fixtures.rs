use std::path::{Path, PathBuf};

use faq_cascade::RawRecord;

pub const OFFICE_Q: &str = "What is the office address?";
pub const OFFICE_A: &str = "123 Main St";

/// A small bank covering each stage.
pub fn faq_records() -> Vec<RawRecord> {
    vec![
        RawRecord::new("faq-1", OFFICE_Q, OFFICE_A),
        RawRecord::new("faq-2", "What are your opening hours?", "09:00-17:00 on weekdays"),
        RawRecord::new("faq-3", "How do I apply for a job?", "See the careers page"),
        RawRecord::new("faq-4", "Hvor ligger kontoret på Østbanen?", "Østbanen 4, 2. etasje"),
    ]
}

/// Writes `records` as the JSON array the file fetcher reads.
pub fn write_bank_file(dir: &Path, records: &[RawRecord]) -> PathBuf {
    let path = dir.join("faq.json");
    let json = serde_json::to_vec_pretty(records).expect("records serialize");
    std::fs::write(&path, json).expect("bank file written");
    path
}
