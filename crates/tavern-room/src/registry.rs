//! Room registry: creates rooms and answers "which room should I join?".
//!
//! The registry keeps a cache entry per live room. The cached member count
//! is only ever updated by [`PopulationChanged`] reports from the room
//! itself, so it may lag behind the room. That is fine: the room stays
//! authoritative and rejects a join that no longer fits.
//!
//! Rooms are watched. When a room's mailbox goes away (explicit stop, or
//! an ad hoc room closing itself when empty) the registry receives
//! [`Terminated`] and evicts the entry.

use std::collections::HashMap;

use tavern_mailbox::{ActorId, Addr, Mailbox, Terminated, Watch, mailbox, watch};
use tavern_protocol::{RoomCriteria, RoomId, RoomSummary};
use tokio::sync::oneshot;

use crate::room::spawn_room;
use crate::{PopulationChanged, RoomConfig, RoomDefaults, RoomError, RoomHandle, RoomSpec};

/// Messages processed by the registry actor.
pub enum RegistryMsg {
    CreateRoom {
        spec: RoomSpec,
        reply: oneshot::Sender<Result<RoomHandle, RoomError>>,
    },
    FindRoom {
        criteria: RoomCriteria,
        reply: oneshot::Sender<Result<RoomHandle, RoomError>>,
    },
    ListRooms {
        reply: oneshot::Sender<Vec<RoomSummary>>,
    },
    PopulationChanged(PopulationChanged),
    Terminated(Terminated),
    /// Stop every room, then the registry. Acknowledged once done.
    Stop { reply: oneshot::Sender<()> },
}

impl From<PopulationChanged> for RegistryMsg {
    fn from(msg: PopulationChanged) -> Self {
        Self::PopulationChanged(msg)
    }
}

impl From<Terminated> for RegistryMsg {
    fn from(msg: Terminated) -> Self {
        Self::Terminated(msg)
    }
}

// ---------------------------------------------------------------------------
// RoomRegistry (handle)
// ---------------------------------------------------------------------------

/// Handle to the running registry actor.
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    addr: Addr<RegistryMsg>,
}

impl RoomRegistry {
    /// Spawns the registry actor.
    ///
    /// The default room from `defaults`, if any, is created asynchronously
    /// as the registry's first message, so it exists before any request
    /// sent through the returned handle is processed.
    pub fn spawn(defaults: RoomDefaults) -> Self {
        let (addr, mailbox) = mailbox();

        if let Some(spec) = defaults.default_room.clone() {
            let (reply, reply_rx) = oneshot::channel();
            // The mailbox is still held here, so this cannot fail.
            let _ = addr.send(RegistryMsg::CreateRoom { spec, reply });
            tokio::spawn(async move {
                match reply_rx.await {
                    Ok(Ok(room)) => {
                        tracing::info!(room_id = %room.room_id(), "default room ready");
                    }
                    Ok(Err(e)) => tracing::error!(error = %e, "failed to create default room"),
                    Err(_) => tracing::error!("registry stopped before creating default room"),
                }
            });
        }

        let actor = RegistryActor {
            addr: addr.clone(),
            defaults,
            entries: HashMap::new(),
            by_actor: HashMap::new(),
            next_room_number: 1,
            next_seq: 0,
            mailbox,
        };
        tokio::spawn(actor.run());

        Self { addr }
    }

    /// Creates a room.
    ///
    /// # Errors
    /// [`RoomError::AlreadyExists`], [`RoomError::InvalidCapacity`], or
    /// [`RoomError::RegistryUnavailable`].
    pub async fn create_room(&self, spec: RoomSpec) -> Result<RoomHandle, RoomError> {
        self.addr
            .ask(|reply| RegistryMsg::CreateRoom { spec, reply })
            .await
            .map_err(|_| RoomError::RegistryUnavailable)?
    }

    /// Resolves join criteria to a room that (per the cache) has space.
    ///
    /// # Errors
    /// [`RoomError::NotFound`], [`RoomError::RoomFull`],
    /// [`RoomError::NoneAvailable`], or [`RoomError::RegistryUnavailable`].
    pub async fn find_room(&self, criteria: RoomCriteria) -> Result<RoomHandle, RoomError> {
        self.addr
            .ask(|reply| RegistryMsg::FindRoom { criteria, reply })
            .await
            .map_err(|_| RoomError::RegistryUnavailable)?
    }

    /// Lists cached room summaries in creation order.
    pub async fn list_rooms(&self) -> Result<Vec<RoomSummary>, RoomError> {
        self.addr
            .ask(|reply| RegistryMsg::ListRooms { reply })
            .await
            .map_err(|_| RoomError::RegistryUnavailable)
    }

    /// Stops every room and then the registry, waiting for the registry to
    /// acknowledge.
    pub async fn stop(&self) -> Result<(), RoomError> {
        self.addr
            .ask(|reply| RegistryMsg::Stop { reply })
            .await
            .map_err(|_| RoomError::RegistryUnavailable)
    }

    pub fn addr(&self) -> &Addr<RegistryMsg> {
        &self.addr
    }
}

// ---------------------------------------------------------------------------
// RegistryActor
// ---------------------------------------------------------------------------

struct Entry {
    handle: RoomHandle,
    name: String,
    capacity: usize,
    cached_members: usize,
    seq: u64,
    watch: Watch,
}

impl Entry {
    fn has_space(&self) -> bool {
        self.cached_members < self.capacity
    }

    fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.handle.room_id().clone(),
            name: self.name.clone(),
            members: self.cached_members,
            capacity: self.capacity,
        }
    }
}

struct RegistryActor {
    addr: Addr<RegistryMsg>,
    defaults: RoomDefaults,
    entries: HashMap<RoomId, Entry>,
    by_actor: HashMap<ActorId, RoomId>,
    next_room_number: u64,
    next_seq: u64,
    mailbox: Mailbox<RegistryMsg>,
}

impl RegistryActor {
    async fn run(mut self) {
        tracing::info!("room registry started");

        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                RegistryMsg::CreateRoom { spec, reply } => {
                    let _ = reply.send(self.handle_create(spec));
                }
                RegistryMsg::FindRoom { criteria, reply } => {
                    let _ = reply.send(self.handle_find(&criteria));
                }
                RegistryMsg::ListRooms { reply } => {
                    let _ = reply.send(self.list());
                }
                RegistryMsg::PopulationChanged(report) => {
                    self.handle_population(report);
                }
                RegistryMsg::Terminated(Terminated { id }) => {
                    self.handle_terminated(id);
                }
                RegistryMsg::Stop { reply } => {
                    self.stop_all();
                    let _ = reply.send(());
                    break;
                }
            }
        }

        tracing::info!("room registry stopped");
    }

    fn handle_create(&mut self, spec: RoomSpec) -> Result<RoomHandle, RoomError> {
        let capacity = spec.capacity.unwrap_or(self.defaults.capacity);
        if capacity == 0 {
            return Err(RoomError::InvalidCapacity(capacity));
        }

        let room_id = match spec.room_id.filter(|id| !id.as_str().is_empty()) {
            Some(id) if self.entries.contains_key(&id) => {
                return Err(RoomError::AlreadyExists(id));
            }
            Some(id) => id,
            None => self.allocate_id(),
        };
        let name = spec.name.unwrap_or_else(|| room_id.to_string());

        let config = RoomConfig {
            room_id: room_id.clone(),
            name: name.clone(),
            capacity,
            persistent: spec.persistent,
        };
        let handle = spawn_room(config, Some(self.addr.recipient()));
        let watch = watch(handle.addr(), self.addr.recipient());

        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_actor.insert(handle.id(), room_id.clone());
        self.entries.insert(
            room_id.clone(),
            Entry {
                handle: handle.clone(),
                name,
                capacity,
                cached_members: 0,
                seq,
                watch,
            },
        );

        tracing::info!(%room_id, capacity, persistent = spec.persistent, "room created");
        Ok(handle)
    }

    /// Next `room-<n>` not currently in use.
    fn allocate_id(&mut self) -> RoomId {
        loop {
            let id = RoomId::new(format!("room-{}", self.next_room_number));
            self.next_room_number += 1;
            if !self.entries.contains_key(&id) {
                return id;
            }
        }
    }

    fn handle_find(&self, criteria: &RoomCriteria) -> Result<RoomHandle, RoomError> {
        let name_matches =
            |entry: &Entry| criteria.name.as_ref().is_none_or(|name| *name == entry.name);

        if let Some(room_id) = &criteria.room_id {
            let entry = self
                .entries
                .get(room_id)
                .filter(|e| name_matches(*e))
                .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
            return if entry.has_space() {
                Ok(entry.handle.clone())
            } else {
                Err(RoomError::RoomFull(room_id.clone()))
            };
        }

        self.entries
            .values()
            .filter(|e| name_matches(*e) && e.has_space())
            .min_by_key(|e| e.seq)
            .map(|e| e.handle.clone())
            .ok_or(RoomError::NoneAvailable)
    }

    fn list(&self) -> Vec<RoomSummary> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(Entry::summary).collect()
    }

    fn handle_population(&mut self, report: PopulationChanged) {
        match self.entries.get_mut(&report.room_id) {
            Some(entry) if entry.handle.id() == report.room => {
                entry.cached_members = report.members;
            }
            _ => {
                tracing::debug!(room_id = %report.room_id, "population report from unknown room");
            }
        }
    }

    fn handle_terminated(&mut self, id: ActorId) {
        let Some(room_id) = self.by_actor.remove(&id) else {
            return;
        };
        if self
            .entries
            .get(&room_id)
            .is_some_and(|entry| entry.handle.id() == id)
        {
            self.entries.remove(&room_id);
            tracing::info!(%room_id, "room evicted");
        }
    }

    fn stop_all(&mut self) {
        for (room_id, entry) in self.entries.drain() {
            entry.watch.unwatch();
            if entry.handle.stop().is_err() {
                tracing::debug!(%room_id, "room already stopped");
            }
        }
        self.by_actor.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_defaults() -> RoomDefaults {
        RoomDefaults {
            capacity: 4,
            default_room: None,
        }
    }

    #[tokio::test]
    async fn test_default_room_exists_before_first_request() {
        let registry = RoomRegistry::spawn(RoomDefaults::default());
        let room = registry.find_room(RoomCriteria::room("lobby")).await.unwrap();
        assert_eq!(room.room_id(), &RoomId::new("lobby"));

        let info = room.info().await.unwrap();
        assert!(info.persistent);
        assert_eq!(info.name, "Lobby");
    }

    #[tokio::test]
    async fn test_create_allocates_sequential_ids() {
        let registry = RoomRegistry::spawn(empty_defaults());
        let a = registry.create_room(RoomSpec::ad_hoc()).await.unwrap();
        let b = registry.create_room(RoomSpec::ad_hoc()).await.unwrap();
        assert_eq!(a.room_id().as_str(), "room-1");
        assert_eq!(b.room_id().as_str(), "room-2");
    }

    #[tokio::test]
    async fn test_allocation_skips_live_ids() {
        let registry = RoomRegistry::spawn(empty_defaults());
        registry
            .create_room(RoomSpec::persistent("room-1"))
            .await
            .unwrap();
        let next = registry.create_room(RoomSpec::ad_hoc()).await.unwrap();
        assert_eq!(next.room_id().as_str(), "room-2");
    }

    #[tokio::test]
    async fn test_create_duplicate_id_rejected() {
        let registry = RoomRegistry::spawn(empty_defaults());
        registry.create_room(RoomSpec::persistent("x")).await.unwrap();
        let err = registry
            .create_room(RoomSpec::persistent("x"))
            .await
            .unwrap_err();
        assert_eq!(err, RoomError::AlreadyExists("x".into()));
    }

    #[tokio::test]
    async fn test_create_zero_capacity_rejected() {
        let registry = RoomRegistry::spawn(empty_defaults());
        let err = registry
            .create_room(RoomSpec::ad_hoc().with_capacity(0))
            .await
            .unwrap_err();
        assert_eq!(err, RoomError::InvalidCapacity(0));
    }

    #[tokio::test]
    async fn test_find_unknown_id_not_found() {
        let registry = RoomRegistry::spawn(empty_defaults());
        let err = registry
            .find_room(RoomCriteria::room("nowhere"))
            .await
            .unwrap_err();
        assert_eq!(err, RoomError::NotFound("nowhere".into()));
    }

    #[tokio::test]
    async fn test_find_any_with_no_rooms() {
        let registry = RoomRegistry::spawn(empty_defaults());
        let err = registry.find_room(RoomCriteria::any()).await.unwrap_err();
        assert_eq!(err, RoomError::NoneAvailable);
    }

    #[tokio::test]
    async fn test_find_any_prefers_earliest_created() {
        let registry = RoomRegistry::spawn(empty_defaults());
        let first = registry.create_room(RoomSpec::persistent("b")).await.unwrap();
        registry.create_room(RoomSpec::persistent("a")).await.unwrap();

        let found = registry.find_room(RoomCriteria::any()).await.unwrap();
        assert_eq!(found, first);
    }

    #[tokio::test]
    async fn test_find_by_name() {
        let registry = RoomRegistry::spawn(empty_defaults());
        registry
            .create_room(RoomSpec::persistent("one").with_name("arena"))
            .await
            .unwrap();
        let two = registry
            .create_room(RoomSpec::persistent("two").with_name("tavern"))
            .await
            .unwrap();

        let criteria = RoomCriteria {
            room_id: None,
            name: Some("tavern".into()),
        };
        assert_eq!(registry.find_room(criteria).await.unwrap(), two);
    }

    #[tokio::test]
    async fn test_list_rooms_in_creation_order() {
        let registry = RoomRegistry::spawn(RoomDefaults::default());
        registry
            .create_room(RoomSpec::persistent("zeta").with_capacity(2))
            .await
            .unwrap();

        let rooms = registry.list_rooms().await.unwrap();
        let ids: Vec<&str> = rooms.iter().map(|r| r.room_id.as_str()).collect();
        assert_eq!(ids, vec!["lobby", "zeta"]);
        assert_eq!(rooms[1].capacity, 2);
        assert_eq!(rooms[1].members, 0);
    }

    #[tokio::test]
    async fn test_stop_closes_rooms_and_registry() {
        let registry = RoomRegistry::spawn(empty_defaults());
        let room = registry.create_room(RoomSpec::persistent("x")).await.unwrap();

        registry.stop().await.unwrap();
        room.addr().closed().await;
        registry.addr().closed().await;
        assert_eq!(
            registry.list_rooms().await.unwrap_err(),
            RoomError::RegistryUnavailable
        );
    }
}
