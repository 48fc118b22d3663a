// ── Full snapshot application ──
//
// Builds a complete home graph from the `home/getCurrentState` document.
// The result is either a full graph or an error; nothing is published on
// failure, so the previous graph stays in place.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, error};

use super::HomeGraph;
use crate::error::CoreError;
use crate::model::{Client, HomeState, Members};
use crate::registry;

fn section<'a>(document: &'a Value, key: &'static str) -> Result<Option<&'a Map<String, Value>>, CoreError> {
    match document.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(CoreError::malformed("snapshot", format!("`{key}` is not an object"))),
    }
}

/// Build a graph from a snapshot document.
///
/// Meta groups are held back until every other group exists, so they can
/// reference groups that appear later in the document. A meta group that
/// references another meta group sees only the ones built before it.
pub fn build_graph(document: &Value) -> Result<HomeGraph, CoreError> {
    if let Some(code) = document.get("errorCode").filter(|c| !c.is_null()) {
        error!(error_code = %code, "cloud rejected the snapshot request");
        return Err(CoreError::Api {
            code: code.as_str().map_or_else(|| code.to_string(), str::to_owned),
        });
    }

    let home_record = document
        .get("home")
        .ok_or_else(|| CoreError::malformed("snapshot", "missing `home`"))?;
    let home: HomeState =
        serde_json::from_value(home_record.clone()).map_err(|e| CoreError::malformed("home", e))?;

    let mut devices = IndexMap::new();
    for record in section(document, "devices")?.into_iter().flat_map(Map::values) {
        let device = registry::parse_device(record).map_err(|e| CoreError::malformed("device", e))?;
        devices.insert(device.id.clone(), Arc::new(device));
    }

    let mut groups = IndexMap::new();
    let mut metas = Vec::new();
    for record in section(document, "groups")?.into_iter().flat_map(Map::values) {
        if registry::is_meta_group(record) {
            metas.push(record);
            continue;
        }
        let group = registry::parse_group(record, &Members::new(&devices, &groups))
            .map_err(|e| CoreError::malformed("group", e))?;
        groups.insert(group.id.clone(), Arc::new(group));
    }
    for record in metas {
        let group = registry::parse_group(record, &Members::new(&devices, &groups))
            .map_err(|e| CoreError::malformed("meta group", e))?;
        groups.insert(group.id.clone(), Arc::new(group));
    }

    let mut clients = IndexMap::new();
    for record in section(document, "clients")?.into_iter().flat_map(Map::values) {
        let client: Client = serde_json::from_value(record.clone()).map_err(|e| CoreError::malformed("client", e))?;
        clients.insert(client.id.clone(), Arc::new(client));
    }

    debug!(
        devices = devices.len(),
        groups = groups.len(),
        clients = clients.len(),
        "snapshot parsed"
    );

    Ok(HomeGraph::new(home, devices, groups, clients))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{DeviceKind, GroupKind};
    use serde_json::json;

    fn document() -> Value {
        json!({
            "home": { "id": "home-1", "connected": true },
            "devices": {
                "A": { "id": "A", "type": "HEATING_THERMOSTAT" },
                "B": { "id": "B", "type": "SHUTTER_CONTACT" },
                "C": { "id": "C", "type": "FANCY_NEW_GADGET" }
            },
            "groups": {
                "M": { "id": "M", "type": "META", "groups": ["G"], "channels": [{ "deviceId": "A" }] },
                "G": { "id": "G", "type": "HEATING", "channels": [{ "deviceId": "A" }, { "deviceId": "B" }] }
            },
            "clients": {
                "K": { "id": "K", "label": "phone", "homeId": "home-1" }
            }
        })
    }

    #[test]
    fn builds_full_graph_in_snapshot_order() {
        let graph = build_graph(&document()).unwrap();

        assert!(graph.is_ready());
        let ids: Vec<&str> = graph.devices().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert!(matches!(graph.search_device_by_id("C").unwrap().kind, DeviceKind::Generic));

        let g = graph.search_group_by_id("G").unwrap();
        assert_eq!(g.device_ids, vec!["A", "B"]);
        assert!(matches!(g.kind, GroupKind::Heating(_)));

        // meta listed first in the document still resolves G
        let m = graph.search_group_by_id("M").unwrap();
        assert_eq!(m.group_ids, vec!["G"]);
        assert_eq!(graph.meta_members(m)[0].id, "G");

        assert_eq!(graph.search_client_by_id("K").unwrap().label, "phone");
        assert!(graph.dangling_references().is_empty());
    }

    #[test]
    fn meta_group_resolves_two_later_groups() {
        let graph = build_graph(&json!({
            "home": { "id": "home-1" },
            "devices": {
                "A": { "id": "A", "type": "HEATING_THERMOSTAT" },
                "B": { "id": "B", "type": "SHUTTER_CONTACT" }
            },
            "groups": {
                "M": { "id": "M", "type": "META", "groups": ["G1", "G2"] },
                "G1": { "id": "G1", "type": "HEATING", "channels": [{ "deviceId": "A" }] },
                "G2": { "id": "G2", "type": "SECURITY", "channels": [{ "deviceId": "B" }] }
            }
        }))
        .unwrap();

        let m = graph.search_group_by_id("M").unwrap();
        assert_eq!(m.group_ids, vec!["G1", "G2"]);
        let member_groups = graph.meta_members(m);
        let members: Vec<&str> = member_groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(members, vec!["G1", "G2"]);
        assert!(graph.dangling_references().is_empty());
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let a = build_graph(&document()).unwrap();
        let b = build_graph(&document()).unwrap();
        let ids = |g: &HomeGraph| g.groups().map(|x| x.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
        assert_eq!(a.device_count(), b.device_count());
        assert_eq!(**a.home().unwrap(), **b.home().unwrap());
    }

    #[test]
    fn error_code_aborts() {
        let err = build_graph(&json!({ "errorCode": "INVALID_AUTHORIZATION" })).unwrap_err();
        assert_eq!(err.api_error_code(), Some("INVALID_AUTHORIZATION"));
    }

    #[test]
    fn missing_home_is_malformed() {
        let err = build_graph(&json!({ "devices": {} })).unwrap_err();
        assert!(matches!(err, CoreError::Malformed { .. }));
    }

    #[test]
    fn missing_sections_are_empty() {
        let graph = build_graph(&json!({ "home": { "id": "h" } })).unwrap();
        assert_eq!(graph.device_count() + graph.group_count() + graph.client_count(), 0);
    }
}
