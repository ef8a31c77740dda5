//! Example: list the most popular stations in the catalog.
//!
//! Run with: cargo run -p ushki-directory --example top_stations

use ushki_directory::{RadioBrowserClient, StationDirectory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let client = RadioBrowserClient::new()?;
    let stations = client.top_stations(15, 0).await?;

    println!("Top {} stations:\n", stations.len());
    for (i, station) in stations.iter().enumerate() {
        println!(
            "{:2}. {} [{}] {} clicks  {}",
            i + 1,
            station.name,
            station.country_label(),
            station.clickcount,
            station.tag_list(2).join(", "),
        );
    }

    Ok(())
}
