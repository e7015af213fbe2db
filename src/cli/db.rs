use clap::Parser;

use crate::{db::Db, prelude::*};

#[derive(Parser)]
pub struct DbArgs {
    /// MongoDB connection string, including the database name.
    #[clap(long = "mongodb-uri", env = "MONGODB_URI")]
    uri: String,
}

impl DbArgs {
    pub async fn connect(&self) -> Result<Db> {
        Db::with_uri(&self.uri).await
    }
}
