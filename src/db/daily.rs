use bson::{Document, deserialize_from_document, doc, serialize_to_bson};
use chrono::NaiveDate;
use futures_util::TryStreamExt;
use mongodb::Collection;
use serde::Deserialize;

use crate::{
    core::{panel::PanelId, rollup::DailyReport, shift::Shift},
    db::report_filter,
    prelude::*,
    statistics::WindowStats,
};

/// Stored daily report, one sub-document per shift.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyDocument {
    panel_id: PanelId,
    report_date: NaiveDate,

    #[serde(default)]
    shift1: WindowStats,

    #[serde(default)]
    shift2: WindowStats,

    #[serde(default)]
    shift3: WindowStats,
}

impl From<DailyDocument> for DailyReport {
    fn from(document: DailyDocument) -> Self {
        Self {
            panel_id: document.panel_id,
            report_date: document.report_date,
            shifts: [document.shift1, document.shift2, document.shift3],
        }
    }
}

#[must_use]
pub struct DailyReports(pub(super) Collection<Document>);

impl DailyReports {
    pub(super) const COLLECTION_NAME: &'static str = "dailyReports";

    /// Build the single atomic update that touches only the target shift.
    ///
    /// On insert, the other shifts are initialized with zeros.
    fn shift_update(shift: Shift, stats: &WindowStats) -> Result<Document> {
        let mut set_on_insert = doc! { "createdAt": bson::DateTime::now() };
        let zero = serialize_to_bson(&WindowStats::ZERO)?;
        for other in Shift::ALL.into_iter().filter(|other| *other != shift) {
            set_on_insert.insert(other.document_key(), zero.clone());
        }
        let mut set = Document::new();
        set.insert(shift.document_key(), serialize_to_bson(stats)?);
        Ok(doc! { "$set": set, "$setOnInsert": set_on_insert })
    }

    #[instrument(skip_all, fields(panel_id = %panel_id, report_date = %report_date, shift = shift.number()))]
    pub async fn upsert_shift(
        &self,
        panel_id: &PanelId,
        report_date: NaiveDate,
        shift: Shift,
        stats: &WindowStats,
    ) -> Result {
        debug!(count = stats.count, "upserting the shift…");
        self.0
            .update_one(report_filter(panel_id, report_date), Self::shift_update(shift, stats)?)
            .upsert(true)
            .await
            .with_context(|| format!("failed to upsert {shift} of `{panel_id}` on {report_date}"))?;
        Ok(())
    }

    #[instrument(skip_all, fields(panel_id = %panel_id, report_date = %report_date))]
    pub async fn get(&self, panel_id: &PanelId, report_date: NaiveDate) -> Result<Option<DailyReport>> {
        self.0
            .find_one(report_filter(panel_id, report_date))
            .await
            .context("failed to fetch the daily report")?
            .map(deserialize_from_document::<DailyDocument>)
            .transpose()
            .context("failed to deserialize the daily report")
            .map(|document| document.map(DailyReport::from))
    }

    pub async fn find(&self, filter: Document) -> Result<Vec<DailyReport>> {
        self.0
            .find(filter)
            .sort(doc! { "reportDate": 1 })
            .await
            .context("failed to query the daily reports")?
            .map_err(Error::from)
            .and_then(|document| async move {
                Ok(DailyReport::from(deserialize_from_document::<DailyDocument>(document)?))
            })
            .try_collect()
            .await
    }
}
