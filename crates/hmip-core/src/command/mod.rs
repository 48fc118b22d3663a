// ── Command API ──
//
// Every write operation against the home is a `Command` variant. Each
// variant knows its endpoint and body; `Home::execute` sends it and turns
// the answer into a `CommandResult`. Commands never touch the local graph:
// the cloud confirms changes through push events.

pub mod requests;

use chrono::NaiveDateTime;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;

use hmip_api::ApiRequest;

use crate::error::CoreError;
use requests::{
    AbsenceDurationRequest, AbsencePeriodRequest, DeleteGroupRequest, IntrusionAlertRequest,
    LocationRequest, PinRequest, PowerMeterUnitPriceRequest, TimezoneRequest, VacationRequest,
    ZoneActivationDelayRequest, ZoneDevices, ZoneFlags, ZonesActivationRequest,
    ZonesDeviceAssignmentRequest,
};

/// Wire format of absence and vacation end times.
const END_TIME_FORMAT: &str = "%Y_%m_%d %H:%M";

/// All write operations against a home.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Security ─────────────────────────────────────────────────────
    SetSecurityZonesActivation {
        internal: bool,
        external: bool,
    },
    SetIntrusionAlertThroughSmokeDetectors {
        activate: bool,
    },
    SetZoneActivationDelay {
        delay_secs: f64,
    },
    SetZonesDeviceAssignment {
        internal_devices: Vec<String>,
        external_devices: Vec<String>,
    },

    // ── Heating ──────────────────────────────────────────────────────
    ActivateAbsenceWithPeriod {
        end_time: NaiveDateTime,
    },
    ActivateAbsenceWithDuration {
        minutes: u32,
    },
    DeactivateAbsence,
    ActivateVacation {
        end_time: NaiveDateTime,
        temperature: f64,
    },
    DeactivateVacation,

    // ── Home settings ────────────────────────────────────────────────
    SetLocation {
        city: String,
        latitude: String,
        longitude: String,
    },
    SetTimezone {
        timezone_id: String,
    },
    SetPowerMeterUnitPrice {
        price: f64,
    },
    /// `new_pin: None` clears the PIN. `old_pin` is required once one is set.
    SetPin {
        new_pin: Option<SecretString>,
        old_pin: Option<SecretString>,
    },

    // ── Groups ───────────────────────────────────────────────────────
    DeleteGroup {
        group_id: String,
    },
}

fn body(request: &impl Serialize) -> Result<Value, CoreError> {
    serde_json::to_value(request)
        .map_err(|e| CoreError::Internal(format!("failed to encode command body: {e}")))
}

impl Command {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::SetSecurityZonesActivation { .. } => "home/security/setZonesActivation",
            Self::SetIntrusionAlertThroughSmokeDetectors { .. } => {
                "home/security/setIntrusionAlertThroughSmokeDetectors"
            }
            Self::SetZoneActivationDelay { .. } => "home/security/setZoneActivationDelay",
            Self::SetZonesDeviceAssignment { .. } => "home/security/setZonesDeviceAssignment",
            Self::ActivateAbsenceWithPeriod { .. } => "home/heating/activateAbsenceWithPeriod",
            Self::ActivateAbsenceWithDuration { .. } => "home/heating/activateAbsenceWithDuration",
            Self::DeactivateAbsence => "home/heating/deactivateAbsence",
            Self::ActivateVacation { .. } => "home/heating/activateVacation",
            Self::DeactivateVacation => "home/heating/deactivateVacation",
            Self::SetLocation { .. } => "home/setLocation",
            Self::SetTimezone { .. } => "home/setTimezone",
            Self::SetPowerMeterUnitPrice { .. } => "home/setPowerMeterUnitPrice",
            Self::SetPin { .. } => "home/setPin",
            Self::DeleteGroup { .. } => "home/group/deleteGroup",
        }
    }

    /// The request this command sends.
    pub fn request(&self) -> Result<ApiRequest, CoreError> {
        let request = ApiRequest::new(self.endpoint());
        let payload = match self {
            Self::SetSecurityZonesActivation { internal, external } => body(&ZonesActivationRequest {
                zones_activation: ZoneFlags {
                    external: *external,
                    internal: *internal,
                },
            })?,
            Self::SetIntrusionAlertThroughSmokeDetectors { activate } => body(&IntrusionAlertRequest {
                intrusion_alert_through_smoke_detectors: *activate,
            })?,
            Self::SetZoneActivationDelay { delay_secs } => body(&ZoneActivationDelayRequest {
                zone_activation_delay: *delay_secs,
            })?,
            Self::SetZonesDeviceAssignment {
                internal_devices,
                external_devices,
            } => body(&ZonesDeviceAssignmentRequest {
                zones_device_assignment: ZoneDevices {
                    internal: internal_devices.clone(),
                    external: external_devices.clone(),
                },
            })?,
            Self::ActivateAbsenceWithPeriod { end_time } => body(&AbsencePeriodRequest {
                end_time: end_time.format(END_TIME_FORMAT).to_string(),
            })?,
            Self::ActivateAbsenceWithDuration { minutes } => {
                body(&AbsenceDurationRequest { duration: *minutes })?
            }
            Self::ActivateVacation {
                end_time,
                temperature,
            } => body(&VacationRequest {
                end_time: end_time.format(END_TIME_FORMAT).to_string(),
                temperature: *temperature,
            })?,
            Self::DeactivateAbsence | Self::DeactivateVacation => return Ok(request),
            Self::SetLocation {
                city,
                latitude,
                longitude,
            } => body(&LocationRequest {
                city: city.clone(),
                latitude: latitude.clone(),
                longitude: longitude.clone(),
            })?,
            Self::SetTimezone { timezone_id } => body(&TimezoneRequest {
                timezone_id: timezone_id.clone(),
            })?,
            Self::SetPowerMeterUnitPrice { price } => body(&PowerMeterUnitPriceRequest {
                power_meter_unit_price: *price,
            })?,
            Self::SetPin { new_pin, old_pin } => {
                let pin = new_pin
                    .as_ref()
                    .map(|p| p.expose_secret().to_owned())
                    .unwrap_or_default();
                return Ok(request
                    .with_body(body(&PinRequest { pin })?)
                    .with_pin(old_pin.clone()));
            }
            Self::DeleteGroup { group_id } => body(&DeleteGroupRequest {
                group_id: group_id.clone(),
            })?,
        };
        Ok(request.with_body(payload))
    }
}

/// Outcome of an executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Ok,
    /// The cloud answered with an `errorCode`.
    Rejected { error_code: String },
}

impl CommandResult {
    pub(crate) fn from_response(response: &Value) -> Self {
        match response.get("errorCode").filter(|c| !c.is_null()) {
            Some(code) => Self::Rejected {
                error_code: code.as_str().map_or_else(|| code.to_string(), str::to_owned),
            },
            None => Self::Ok,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn end_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 12, 24)
            .unwrap()
            .and_hms_opt(18, 30, 0)
            .unwrap()
    }

    #[test]
    fn zone_activation_uses_upper_case_keys() {
        let req = Command::SetSecurityZonesActivation {
            internal: false,
            external: true,
        }
        .request()
        .unwrap();

        assert_eq!(req.path, "home/security/setZonesActivation");
        assert_eq!(
            req.body.unwrap(),
            json!({ "zonesActivation": { "EXTERNAL": true, "INTERNAL": false } })
        );
    }

    #[test]
    fn absence_and_vacation_format_end_time() {
        let req = Command::ActivateAbsenceWithPeriod { end_time: end_time() }
            .request()
            .unwrap();
        assert_eq!(req.body.unwrap(), json!({ "endTime": "2024_12_24 18:30" }));

        let req = Command::ActivateVacation {
            end_time: end_time(),
            temperature: 17.5,
        }
        .request()
        .unwrap();
        assert_eq!(req.path, "home/heating/activateVacation");
        assert_eq!(
            req.body.unwrap(),
            json!({ "endtime": "2024_12_24 18:30", "temperature": 17.5 })
        );
    }

    #[test]
    fn deactivations_have_no_body() {
        let req = Command::DeactivateAbsence.request().unwrap();
        assert_eq!(req.path, "home/heating/deactivateAbsence");
        assert!(req.body.is_none());
    }

    #[test]
    fn set_pin_sends_old_pin_as_header() {
        let req = Command::SetPin {
            new_pin: None,
            old_pin: Some(SecretString::from("1234")),
        }
        .request()
        .unwrap();

        assert_eq!(req.body.unwrap(), json!({ "pin": "" }));
        assert_eq!(req.pin.unwrap().expose_secret(), "1234");
    }

    #[test]
    fn zones_device_assignment_body() {
        let req = Command::SetZonesDeviceAssignment {
            internal_devices: vec!["A".into()],
            external_devices: vec!["B".into(), "C".into()],
        }
        .request()
        .unwrap();

        assert_eq!(
            req.body.unwrap(),
            json!({ "zonesDeviceAssignment": { "INTERNAL": ["A"], "EXTERNAL": ["B", "C"] } })
        );
    }

    #[test]
    fn response_error_code_means_rejected() {
        assert_eq!(CommandResult::from_response(&Value::Null), CommandResult::Ok);
        assert_eq!(
            CommandResult::from_response(&json!({ "errorCode": "INVALID_NUMBER_PARAMETER_VALUE" })),
            CommandResult::Rejected {
                error_code: "INVALID_NUMBER_PARAMETER_VALUE".into()
            }
        );
    }
}
