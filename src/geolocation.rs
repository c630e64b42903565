//! Position sources.
//!
//! A lookup may block on the network, so [`Locator`] runs it on a worker
//! thread and posts the outcome back as a controller [`Event`].

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use serde::Deserialize;
use thiserror::Error;

use crate::controller::Event;
use crate::models::Coords;
use crate::settings::GeolocationSettings;

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("lookup failed: {0}")]
    Lookup(String),

    #[error("response had no coordinates")]
    MissingCoords,
}

pub trait PositionSource: Send + Sync {
    fn locate(&self) -> Result<Coords, GeoError>;
}

/// Always answers with the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coords);

impl PositionSource for FixedPosition {
    fn locate(&self) -> Result<Coords, GeoError> {
        Ok(self.0)
    }
}

#[derive(Deserialize, Debug)]
struct IpApiResponse {
    status: Option<String>,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

fn coords_from_response(resp: IpApiResponse) -> Result<Coords, GeoError> {
    if let Some(status) = resp.status.as_deref() {
        if status != "success" {
            return Err(GeoError::Lookup(
                resp.message.unwrap_or_else(|| status.to_string()),
            ));
        }
    }
    match (resp.lat, resp.lon) {
        (Some(lat), Some(lon)) => Ok(Coords::new(lat, lon)),
        _ => Err(GeoError::MissingCoords),
    }
}

/// Approximate position from the public IP address.
pub struct IpLookup {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl IpLookup {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, GeoError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(IpLookup {
            endpoint: endpoint.into(),
            client,
        })
    }
}

impl PositionSource for IpLookup {
    fn locate(&self) -> Result<Coords, GeoError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .send()?
            .error_for_status()?
            .json::<IpApiResponse>()?;
        coords_from_response(resp)
    }
}

pub fn source_from_settings(settings: &GeolocationSettings) -> Result<Arc<dyn PositionSource>, GeoError> {
    match settings.fallback {
        Some(coords) => {
            tracing::info!("Using configured position instead of a lookup");
            Ok(Arc::new(FixedPosition(coords)))
        }
        None => Ok(Arc::new(IpLookup::new(settings.endpoint.clone())?)),
    }
}

#[derive(Clone)]
pub struct Locator {
    source: Arc<dyn PositionSource>,
    events: Sender<Event>,
}

impl Locator {
    pub fn new(source: Arc<dyn PositionSource>, events: Sender<Event>) -> Self {
        Locator { source, events }
    }

    pub fn request(&self) {
        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        thread::spawn(move || {
            let event = match source.locate() {
                Ok(coords) => Event::PositionAcquired(coords),
                Err(e) => Event::PositionFailed(e.to_string()),
            };
            if events.send(event).is_err() {
                tracing::debug!("Position arrived after the app closed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unreachable;

    impl PositionSource for Unreachable {
        fn locate(&self) -> Result<Coords, GeoError> {
            Err(GeoError::Lookup("offline".to_string()))
        }
    }

    #[test]
    fn test_parse_success_response() {
        let resp: IpApiResponse =
            serde_json::from_str(r#"{"status":"success","lat":51.5,"lon":-0.12,"city":"London"}"#)
                .unwrap();
        let coords = coords_from_response(resp).unwrap();
        assert_eq!(coords, Coords::new(51.5, -0.12));
    }

    #[test]
    fn test_parse_failed_response() {
        let resp: IpApiResponse =
            serde_json::from_str(r#"{"status":"fail","message":"private range"}"#).unwrap();
        let err = coords_from_response(resp).unwrap_err();
        assert_eq!(err.to_string(), "lookup failed: private range");
    }

    #[test]
    fn test_locator_posts_position() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let locator = Locator::new(Arc::new(FixedPosition(Coords::new(51.5, -0.12))), tx);
        locator.request();
        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event, Event::PositionAcquired(Coords::new(51.5, -0.12)));
    }

    #[test]
    fn test_locator_posts_failure() {
        let (tx, rx) = crossbeam_channel::unbounded();
        Locator::new(Arc::new(Unreachable), tx).request();
        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event, Event::PositionFailed("lookup failed: offline".to_string()));
    }

    #[test]
    fn test_fallback_setting_skips_lookup() {
        let settings = GeolocationSettings {
            fallback: Some(Coords::new(10.0, 20.0)),
            ..Default::default()
        };
        let source = source_from_settings(&settings).unwrap();
        assert_eq!(source.locate().unwrap(), Coords::new(10.0, 20.0));
    }
}
