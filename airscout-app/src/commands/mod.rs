mod download;
mod geocode;
mod outcome;
mod report;

use crate::cli::Command;
use airscout_config::AirscoutConfig;
use anyhow::Result;
use tokio_util::sync::CancellationToken;

pub async fn run(command: Command, cfg: &AirscoutConfig, cancel: &CancellationToken) -> Result<()> {
    match command {
        Command::Geocode { places, region, out } => geocode::run(cfg, places, region, out).await,
        Command::Archive {
            cities,
            dest,
            name_after_city,
        } => download::archive(cfg, cities, dest.dest, name_after_city, cancel).await,
        Command::Portal {
            start,
            end,
            pollutant,
            places,
            region,
            registry,
            dest,
        } => {
            let request = download::PortalRequest {
                start,
                end,
                pollutant,
                places,
                region,
                registry,
                dest: dest.dest,
            };
            download::portal(cfg, request, cancel).await
        }
        Command::Report { kind, format } => report::run(kind, format.into()),
    }
}
