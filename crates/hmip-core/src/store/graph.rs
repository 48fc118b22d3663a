// ── Home graph ──
//
// One consistent picture of the home: the home record plus insertion
// ordered, id-keyed collections of devices, groups and clients. Collections
// sit behind their own `Arc` so a write clones only what it touches.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::{Client, Device, Entity, Group, HomeState, Members};

#[derive(Debug, Clone, Default)]
pub struct HomeGraph {
    home: Option<Arc<HomeState>>,
    devices: Arc<IndexMap<String, Arc<Device>>>,
    groups: Arc<IndexMap<String, Arc<Group>>>,
    clients: Arc<IndexMap<String, Arc<Client>>>,
}

impl HomeGraph {
    pub(crate) fn new(
        home: HomeState,
        devices: IndexMap<String, Arc<Device>>,
        groups: IndexMap<String, Arc<Group>>,
        clients: IndexMap<String, Arc<Client>>,
    ) -> Self {
        Self {
            home: Some(Arc::new(home)),
            devices: Arc::new(devices),
            groups: Arc::new(groups),
            clients: Arc::new(clients),
        }
    }

    /// `false` until the first snapshot has been applied.
    pub fn is_ready(&self) -> bool {
        self.home.is_some()
    }

    pub fn home(&self) -> Option<&Arc<HomeState>> {
        self.home.as_ref()
    }

    // ── Collections ──────────────────────────────────────────────────

    pub fn devices(&self) -> impl ExactSizeIterator<Item = &Arc<Device>> {
        self.devices.values()
    }

    pub fn groups(&self) -> impl ExactSizeIterator<Item = &Arc<Group>> {
        self.groups.values()
    }

    pub fn clients(&self) -> impl ExactSizeIterator<Item = &Arc<Client>> {
        self.clients.values()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn search_device_by_id(&self, id: &str) -> Option<&Arc<Device>> {
        self.devices.get(id)
    }

    pub fn search_group_by_id(&self, id: &str) -> Option<&Arc<Group>> {
        self.groups.get(id)
    }

    pub fn search_client_by_id(&self, id: &str) -> Option<&Arc<Client>> {
        self.clients.get(id)
    }

    /// Any entity by id, the home record included.
    pub fn entity(&self, id: &str) -> Option<Entity> {
        if let Some(home) = self.home.as_ref().filter(|h| h.id == id) {
            return Some(Entity::Home(Arc::clone(home)));
        }
        self.devices
            .get(id)
            .map(|d| Entity::Device(Arc::clone(d)))
            .or_else(|| self.groups.get(id).map(|g| Entity::Group(Arc::clone(g))))
            .or_else(|| self.clients.get(id).map(|c| Entity::Client(Arc::clone(c))))
    }

    /// The devices `group` references, in member order.
    pub fn group_devices(&self, group: &Group) -> Vec<Arc<Device>> {
        group
            .device_ids
            .iter()
            .filter_map(|id| self.devices.get(id).cloned())
            .collect()
    }

    /// The groups a meta group references, in member order.
    pub fn meta_members(&self, group: &Group) -> Vec<Arc<Group>> {
        group
            .group_ids
            .iter()
            .filter_map(|id| self.groups.get(id).cloned())
            .collect()
    }

    /// `(group id, member id)` pairs that point at nothing. Always empty
    /// for a graph built or updated through this crate.
    pub fn dangling_references(&self) -> Vec<(String, String)> {
        self.groups
            .values()
            .flat_map(|g| {
                let devices = g
                    .device_ids
                    .iter()
                    .filter(|id| !self.devices.contains_key(*id));
                let groups = g
                    .group_ids
                    .iter()
                    .filter(|id| !self.groups.contains_key(*id));
                devices
                    .chain(groups)
                    .map(|id| (g.id.clone(), id.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub(crate) fn members(&self) -> Members<'_> {
        Members::new(&self.devices, &self.groups)
    }

    // ── Mutation (store writers only) ────────────────────────────────

    pub(crate) fn set_home(&mut self, home: Arc<HomeState>) {
        self.home = Some(home);
    }

    /// Insert or replace in place. Returns `true` if the id was new.
    pub(crate) fn upsert_device(&mut self, device: Arc<Device>) -> bool {
        Arc::make_mut(&mut self.devices)
            .insert(device.id.clone(), device)
            .is_none()
    }

    pub(crate) fn upsert_group(&mut self, group: Arc<Group>) -> bool {
        Arc::make_mut(&mut self.groups)
            .insert(group.id.clone(), group)
            .is_none()
    }

    pub(crate) fn upsert_client(&mut self, client: Arc<Client>) -> bool {
        Arc::make_mut(&mut self.clients)
            .insert(client.id.clone(), client)
            .is_none()
    }

    /// Remove a device and drop it from every group that referenced it.
    pub(crate) fn remove_device(&mut self, id: &str) -> Option<Arc<Device>> {
        if !self.devices.contains_key(id) {
            return None;
        }
        let removed = Arc::make_mut(&mut self.devices).shift_remove(id);
        self.prune_members(id, |g| &mut g.device_ids);
        removed
    }

    /// Remove a group and drop it from every meta group that referenced it.
    pub(crate) fn remove_group(&mut self, id: &str) -> Option<Arc<Group>> {
        if !self.groups.contains_key(id) {
            return None;
        }
        let removed = Arc::make_mut(&mut self.groups).shift_remove(id);
        self.prune_members(id, |g| &mut g.group_ids);
        removed
    }

    pub(crate) fn remove_client(&mut self, id: &str) -> Option<Arc<Client>> {
        if !self.clients.contains_key(id) {
            return None;
        }
        Arc::make_mut(&mut self.clients).shift_remove(id)
    }

    fn prune_members(&mut self, id: &str, refs: fn(&mut Group) -> &mut Vec<String>) {
        let affected: Vec<String> = self
            .groups
            .values()
            .filter(|g| g.device_ids.iter().chain(&g.group_ids).any(|m| m == id))
            .map(|g| g.id.clone())
            .collect();
        if affected.is_empty() {
            return;
        }
        let groups = Arc::make_mut(&mut self.groups);
        for group_id in affected {
            if let Some(group) = groups.get_mut(&group_id) {
                refs(Arc::make_mut(group)).retain(|m| m != id);
            }
        }
    }
}
