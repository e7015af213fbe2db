use bson::{Document, doc};

use crate::{
    core::rollup::DailyElectricalReport,
    db::{
        report::{Reports, StoredReport},
        report_filter,
    },
};

impl StoredReport for DailyElectricalReport {
    const COLLECTION_NAME: &str = "dailyElectricalReports";

    fn sort() -> Document {
        doc! { "reportDate": 1, "panelId": 1 }
    }

    fn key_filter(&self) -> Document {
        report_filter(&self.panel_id, self.report_date)
    }
}

pub type ElectricalReports = Reports<DailyElectricalReport>;
