use anyhow::Result;

use crate::core::AppConfig;
use crate::core::db::{async_db, initialize_db};

pub async fn run(config: &AppConfig) -> Result<()> {
    let db_path = config.db_path();
    println!("Migrating db at {}...", db_path.display());
    let db = async_db(&db_path).await?;
    db.call(|conn| {
        initialize_db(conn)?;
        Ok(())
    })
    .await?;
    println!("Finished migrating db");
    Ok(())
}
