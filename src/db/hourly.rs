use bson::{Document, doc};
use chrono::NaiveDate;

use crate::{
    core::rollup::HourlyReport,
    db::{
        report::{Reports, StoredReport},
        report_filter,
    },
    prelude::*,
};

impl StoredReport for HourlyReport {
    const COLLECTION_NAME: &str = "hourlyReports";

    fn sort() -> Document {
        doc! { "reportDate": 1, "hour": 1 }
    }

    fn key_filter(&self) -> Document {
        let mut filter = report_filter(&self.panel_id, self.report_date);
        filter.insert("hour", i64::from(self.hour));
        filter
    }
}

pub type HourlyReports = Reports<HourlyReport>;

impl HourlyReports {
    /// Delete the hourly reports of all panels strictly before the date.
    #[instrument(skip_all, fields(before = %report_date))]
    pub async fn delete_before(&self, report_date: NaiveDate) -> Result<u64> {
        self.delete_many(doc! { "reportDate": { "$lt": report_date.to_string() } }).await
    }
}
