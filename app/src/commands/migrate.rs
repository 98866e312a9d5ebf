use circuit::{CircuitError, Migrator, DB};
use console::style;
use sea_orm_migration::MigratorTrait;

pub async fn run() -> Result<(), CircuitError> {
    println!("{} Running migrations...", style("->").cyan());
    let db = DB::connection()?;
    Migrator::up(db.inner(), None).await?;
    println!("{} Migrations completed", style("✓").green());
    Ok(())
}

pub async fn rollback(step: u32) -> Result<(), CircuitError> {
    println!("{} Rolling back {} migration(s)...", style("->").cyan(), step);
    let db = DB::connection()?;
    Migrator::down(db.inner(), Some(step)).await?;
    println!("{} Rollback completed", style("✓").green());
    Ok(())
}

pub async fn status() -> Result<(), CircuitError> {
    let db = DB::connection()?;
    Migrator::status(db.inner()).await?;
    Ok(())
}

pub async fn fresh() -> Result<(), CircuitError> {
    println!(
        "{} Dropping all tables and re-running migrations...",
        style("WARNING:").yellow().bold()
    );
    let db = DB::connection()?;
    Migrator::fresh(db.inner()).await?;
    println!("{} Database refreshed", style("✓").green());
    Ok(())
}
