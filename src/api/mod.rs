//! Client for the UM Warszawa public transport API.

pub mod formatting;
pub mod session;

use reqwest::Url;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::analyzers::timetable::TimetableSource;
use crate::error::{InsightError, Result};
use crate::fetch::auth::UrlParam;
use crate::fetch::{HttpClient, fetch_json, parse_url};
use crate::model::{StopRecord, TimetableEntry, VehicleObservation};
use formatting::{format_active_vehicles, format_stop_coordinates, format_timetable, format_values, validate_response};

pub const API_URL: &str = "https://api.um.warszawa.pl/api/action/";

/// Endpoint names under [`API_URL`].
pub mod table {
    pub const VEHICLES: &str = "busestrams_get";
    pub const TIMETABLES: &str = "dbtimetable_get";
    pub const STOPS: &str = "dbstore_get";
}

/// Dataset identifiers passed as `resource_id` or `id`.
pub mod resource {
    pub const ACTIVE_VEHICLES: &str = "f2e5503e-927d-4ad3-9500-4ab9e55deb59";
    pub const TIMETABLE_FOR_LINE: &str = "e923fa0e-d96c-43f9-ae6e-60518c9f3238";
    pub const LINES_ON_STOP: &str = "88cd555f-6f31-43ca-9de4-66c479ad5942";
    pub const STOP_BY_NAME: &str = "b27f4c17-5c50-4a5b-89dd-236b282bc499";
    pub const STOP_COORDINATES: &str = "ab75c33d-3a26-4342-b36a-6e5fef0a3ac3";
}

/// Vehicle type filter of the positions endpoint; `1` selects buses.
const BUS_TYPE: &str = "1";

pub struct UmWawApi<C> {
    client: UrlParam<C>,
    base_url: String,
}

impl<C: HttpClient> UmWawApi<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self {
            client: UrlParam::api_key(client, api_key),
            base_url: API_URL.to_string(),
        }
    }

    /// Points the client at another deployment of the same API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// URL of an endpoint call, without the API key.
    pub fn request_url(&self, table: &str, params: &[(&str, &str)]) -> Result<Url> {
        let base = parse_url(&self.base_url)?;
        let endpoint = base
            .join(&format!("{table}/"))
            .map_err(|e| InsightError::InvalidInput(format!("invalid endpoint '{table}': {e}")))?;

        Url::parse_with_params(endpoint.as_str(), params)
            .map_err(|e| InsightError::InvalidInput(format!("invalid request parameters: {e}")))
    }

    fn get(&self, table: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = self.request_url(table, params)?;
        let shown = url.to_string();

        let response = fetch_json(&self.client, url)?;
        validate_response(&shown, &response)?;
        Ok(response)
    }

    /// Current positions of every active bus.
    #[instrument(skip(self))]
    pub fn active_vehicles(&self) -> Result<Vec<VehicleObservation>> {
        let response = self.get(
            table::VEHICLES,
            &[("resource_id", resource::ACTIVE_VEHICLES), ("type", BUS_TYPE)],
        )?;
        let vehicles = format_active_vehicles(&response)?;
        debug!(vehicles = vehicles.len(), "Active vehicles received");
        Ok(vehicles)
    }

    /// Coordinates of every stop post.
    #[instrument(skip(self))]
    pub fn stop_coordinates(&self) -> Result<Vec<StopRecord>> {
        let response = self.get(table::STOPS, &[("id", resource::STOP_COORDINATES)])?;
        format_stop_coordinates(&response)
    }

    #[instrument(skip(self))]
    pub fn timetable_for_line_on_stop(
        &self,
        stop_id: &str,
        stop_number: &str,
        line: &str,
    ) -> Result<Vec<TimetableEntry>> {
        let response = self.get(
            table::TIMETABLES,
            &[
                ("id", resource::TIMETABLE_FOR_LINE),
                ("busstopId", stop_id),
                ("busstopNr", stop_number),
                ("line", line),
            ],
        )?;
        format_timetable(&response)
    }

    /// Stop group ids whose name matches `name`.
    pub fn stop_ids_by_name(&self, name: &str) -> Result<Vec<String>> {
        let response = self.get(table::TIMETABLES, &[("id", resource::STOP_BY_NAME), ("name", name)])?;
        format_values(&response, "zespol", "bus stop name")
    }

    /// Lines that call at one stop post.
    pub fn lines_on_stop(&self, stop_id: &str, stop_number: &str) -> Result<Vec<String>> {
        let response = self.get(
            table::TIMETABLES,
            &[
                ("id", resource::LINES_ON_STOP),
                ("busstopId", stop_id),
                ("busstopNr", stop_number),
            ],
        )?;
        format_values(&response, "linia", "bus stop id or number")
    }
}

impl<C: HttpClient> TimetableSource for UmWawApi<C> {
    fn timetable(&self, stop_id: &str, stop_number: &str, line: &str) -> Result<Vec<TimetableEntry>> {
        self.timetable_for_line_on_stop(stop_id, stop_number, line)
    }
}
