pub mod daily;
pub mod electrical;
pub mod hourly;
pub mod report;
pub mod sample;

use std::fmt::Debug;

use async_trait::async_trait;
use bson::{Document, doc};
use chrono::NaiveDate;
use mongodb::{Client, Collection, Database, IndexModel, options::IndexOptions};

use crate::{
    core::{
        date::DateRange,
        panel::PanelId,
        rollup::{DailyElectricalReport, DailyReport, HourlyReport},
        shift::Shift,
    },
    db::{
        daily::DailyReports,
        electrical::ElectricalReports,
        hourly::HourlyReports,
        report::{Reports, StoredReport},
        sample::Samples,
    },
    prelude::*,
    statistics::WindowStats,
    store::RollupStore,
};

#[must_use]
#[derive(Clone)]
pub struct Db {
    client: Client,
    database: Database,
}

impl Db {
    /// Connect to the database with the specified URI and make sure the indexes exist.
    ///
    /// The URI *must* specify the database name.
    #[instrument(skip_all)]
    pub async fn with_uri(uri: impl AsRef<str> + Debug) -> Result<Self> {
        let client = Client::with_uri_str(uri).await.context("failed to connect to MongoDB")?;
        let database = client
            .default_database()
            .context("MongoDB URI does not define the default database")?;
        let this = Self { client, database };
        this.initialize_indexes().await?;
        Ok(this)
    }

    #[instrument(skip_all)]
    async fn initialize_indexes(&self) -> Result {
        info!("ensuring the unique indexes…");
        self.create_unique_index(DailyReports::COLLECTION_NAME, doc! { "panelId": 1, "reportDate": 1 })
            .await?;
        self.create_unique_index(
            HourlyReport::COLLECTION_NAME,
            doc! { "panelId": 1, "reportDate": 1, "hour": 1 },
        )
        .await?;
        self.create_unique_index(
            DailyElectricalReport::COLLECTION_NAME,
            doc! { "panelId": 1, "reportDate": 1 },
        )
        .await?;
        Ok(())
    }

    async fn create_unique_index(&self, collection_name: &str, keys: Document) -> Result {
        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.database
            .collection::<Document>(collection_name)
            .create_index(index)
            .await
            .with_context(|| format!("failed to create the unique index on `{collection_name}`"))?;
        Ok(())
    }

    pub fn samples(&self) -> Samples {
        Samples(self.database.collection(Samples::COLLECTION_NAME))
    }

    pub fn daily_reports(&self) -> DailyReports {
        DailyReports(self.collection(DailyReports::COLLECTION_NAME))
    }

    pub fn hourly_reports(&self) -> HourlyReports {
        Reports::new(self.collection(HourlyReport::COLLECTION_NAME))
    }

    pub fn electrical_reports(&self) -> ElectricalReports {
        Reports::new(self.collection(DailyElectricalReport::COLLECTION_NAME))
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    #[instrument(skip_all)]
    pub async fn shutdown(self) {
        info!("disconnecting from MongoDB…");
        self.client.shutdown().await;
    }
}

/// Equality filter of the report natural key.
fn report_filter(panel_id: &PanelId, report_date: NaiveDate) -> Document {
    doc! { "panelId": panel_id.as_str(), "reportDate": report_date.to_string() }
}

/// Inclusive date range filter for a single panel, or for all panels.
fn range_filter(panel_id: Option<&PanelId>, range: DateRange) -> Document {
    let mut filter = doc! {
        "reportDate": { "$gte": range.min.to_string(), "$lte": range.max.to_string() },
    };
    if let Some(panel_id) = panel_id {
        filter.insert("panelId", panel_id.as_str());
    }
    filter
}

#[async_trait]
impl RollupStore for Db {
    async fn upsert_daily(
        &self,
        panel_id: &PanelId,
        report_date: NaiveDate,
        shift: Shift,
        stats: &WindowStats,
    ) -> Result {
        self.daily_reports().upsert_shift(panel_id, report_date, shift, stats).await
    }

    async fn upsert_hourly(&self, report: &HourlyReport) -> Result {
        self.hourly_reports().upsert(report).await
    }

    async fn upsert_electrical(&self, report: &DailyElectricalReport) -> Result {
        self.electrical_reports().upsert(report).await
    }

    async fn get_daily(&self, panel_id: &PanelId, report_date: NaiveDate) -> Result<Option<DailyReport>> {
        self.daily_reports().get(panel_id, report_date).await
    }

    async fn get_daily_range(&self, panel_id: &PanelId, range: DateRange) -> Result<Vec<DailyReport>> {
        self.daily_reports().find(range_filter(Some(panel_id), range)).await
    }

    async fn get_daily_all(&self, panel_id: &PanelId) -> Result<Vec<DailyReport>> {
        self.daily_reports().find(doc! { "panelId": panel_id.as_str() }).await
    }

    async fn get_hourly_range(&self, panel_id: &PanelId, range: DateRange) -> Result<Vec<HourlyReport>> {
        self.hourly_reports().find(range_filter(Some(panel_id), range)).await
    }

    async fn get_electrical_range(&self, range: DateRange) -> Result<Vec<DailyElectricalReport>> {
        self.electrical_reports().find(range_filter(None, range)).await
    }

    async fn delete_hourly_before(&self, report_date: NaiveDate) -> Result<u64> {
        self.hourly_reports().delete_before(report_date).await
    }
}
