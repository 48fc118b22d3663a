// ── Typed request bodies for Command payloads ──
//
// Field names follow the cloud's wire format. Most are camelCase; the
// zone maps use upper-case keys and the vacation end time is `endtime`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ZoneFlags {
    #[serde(rename = "EXTERNAL")]
    pub external: bool,
    #[serde(rename = "INTERNAL")]
    pub internal: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonesActivationRequest {
    pub zones_activation: ZoneFlags,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationRequest {
    pub city: String,
    pub latitude: String,
    pub longitude: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrusionAlertRequest {
    pub intrusion_alert_through_smoke_detectors: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsencePeriodRequest {
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AbsenceDurationRequest {
    pub duration: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct VacationRequest {
    #[serde(rename = "endtime")]
    pub end_time: String,
    pub temperature: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PinRequest {
    pub pin: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneActivationDelayRequest {
    pub zone_activation_delay: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteGroupRequest {
    pub group_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimezoneRequest {
    pub timezone_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerMeterUnitPriceRequest {
    pub power_meter_unit_price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneDevices {
    #[serde(rename = "INTERNAL")]
    pub internal: Vec<String>,
    #[serde(rename = "EXTERNAL")]
    pub external: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonesDeviceAssignmentRequest {
    pub zones_device_assignment: ZoneDevices,
}
