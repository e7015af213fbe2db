use async_trait::async_trait;
use bson::doc;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::Collection;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::{
    core::{
        panel::PanelId,
        sample::{PhaseCurrents, Sample},
    },
    db::Db,
    ops::Interval,
    prelude::*,
    quantity::{current::Amperes, power::Kilowatts, voltage::Volts},
    source::SampleSource,
};

/// Raw panel reading as written by the poller.
#[serde_as]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleDocument {
    pub panel_id: PanelId,

    #[serde_as(as = "bson::serde_helpers::datetime::FromChrono04DateTime")]
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub real_power: Option<Kilowatts>,

    #[serde(default)]
    pub voltage_line_line: Option<Volts>,

    #[serde(default)]
    pub current_phase_r: Option<Amperes>,

    #[serde(default)]
    pub current_phase_s: Option<Amperes>,

    #[serde(default)]
    pub current_phase_t: Option<Amperes>,

    #[serde(default)]
    pub avg_current: Option<Amperes>,

    #[serde(default, rename = "cosPhi")]
    pub power_factor: Option<f64>,

    #[serde(default)]
    pub frequency: Option<f64>,
}

impl From<SampleDocument> for Sample {
    fn from(document: SampleDocument) -> Self {
        Self {
            panel_id: document.panel_id,
            timestamp: document.timestamp,
            real_power: document.real_power,
            voltage: document.voltage_line_line,
            phase_currents: PhaseCurrents {
                r: document.current_phase_r,
                s: document.current_phase_s,
                t: document.current_phase_t,
            },
            average_current: document.avg_current,
            power_factor: document.power_factor,
            frequency: document.frequency,
        }
    }
}

/// Read-only raw samples collection.
#[must_use]
pub struct Samples(pub(super) Collection<SampleDocument>);

impl Samples {
    pub(super) const COLLECTION_NAME: &'static str = "samples";

    #[instrument(skip_all, fields(panel_id = %panel_id, ?window))]
    pub async fn find(&self, panel_id: &PanelId, window: Interval) -> Result<Vec<Sample>> {
        debug!("querying samples…");
        let filter = doc! {
            "panelId": panel_id.as_str(),
            "timestamp": {
                "$gte": bson::DateTime::from_chrono(window.start),
                "$lt": bson::DateTime::from_chrono(window.end),
            },
        };
        let samples: Vec<Sample> = self
            .0
            .find(filter)
            .sort(doc! { "timestamp": 1 })
            .await
            .context("failed to query the samples")?
            .map_ok(Sample::from)
            .try_collect()
            .await
            .context("failed to fetch the samples")?;
        debug!(n_samples = samples.len(), "fetched");
        Ok(samples)
    }
}

#[async_trait]
impl SampleSource for Db {
    async fn fetch_samples(&self, panel_id: &PanelId, window: Interval) -> Result<Vec<Sample>> {
        self.samples().find(panel_id, window).await
    }
}
