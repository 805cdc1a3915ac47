//! Multicast group registry
//!
//! This module owns all group membership state. Groups are created lazily on
//! the first registration and dropped as soon as their last member leaves,
//! so an empty group never stays in the registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::address::{GroupAddress, StationAddress};
use crate::group::MulticastGroup;

/// Registry of multicast groups keyed by group address
#[derive(Debug, Clone, Default)]
pub struct GroupRegistry {
    groups: HashMap<GroupAddress, MulticastGroup>,
}

impl GroupRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member to a group, creating the group if needed.
    ///
    /// No duplicate check is performed; callers that need idempotence use
    /// [`GroupRegistry::add_member_unique`].
    pub fn add_member(&mut self, group: GroupAddress, member: StationAddress) {
        self.group_entry(group).add_member(member);
        log::trace!("Station {} joined group {}", member, group);
    }

    /// Add a member to a group unless it is already there. Returns whether it was added.
    pub fn add_member_unique(&mut self, group: GroupAddress, member: StationAddress) -> bool {
        let added = self.group_entry(group).add_member_unique(member);
        if added {
            log::trace!("Station {} joined group {}", member, group);
        } else {
            log::debug!("Station {} already in group {}", member, group);
        }
        added
    }

    /// Remove the first occurrence of a member from a group.
    ///
    /// The group is erased once it has no members left. Removing from an
    /// unknown group, or removing a station that is not a member, does
    /// nothing and returns `false`.
    pub fn remove_member(&mut self, group: GroupAddress, member: StationAddress) -> bool {
        let Some(entry) = self.groups.get_mut(&group) else {
            log::debug!("Ignoring removal of {} from unknown group {}", member, group);
            return false;
        };

        if !entry.remove_member(&member) {
            log::debug!("Station {} is not a member of group {}", member, group);
            return false;
        }
        log::trace!("Station {} left group {}", member, group);

        if entry.is_empty() {
            self.groups.remove(&group);
            log::debug!("Removed empty group {}", group);
        }
        true
    }

    /// Remove a station from every group it belongs to.
    ///
    /// Returns the addresses of the groups it was removed from. Groups left
    /// empty are erased.
    pub fn remove_station(&mut self, member: StationAddress) -> Vec<GroupAddress> {
        let mut affected = Vec::new();
        for (address, group) in self.groups.iter_mut() {
            if group.remove_all(&member) > 0 {
                affected.push(*address);
            }
        }

        self.groups.retain(|address, group| {
            if group.is_empty() {
                log::debug!("Removed empty group {}", address);
                false
            } else {
                true
            }
        });

        affected.sort();
        affected
    }

    /// Remove a whole group
    pub fn remove_group(&mut self, group: GroupAddress) -> Option<MulticastGroup> {
        self.groups.remove(&group)
    }

    /// Get a copy of the members of a group; empty if the group is unknown
    pub fn lookup(&self, group: GroupAddress) -> Vec<StationAddress> {
        self.groups
            .get(&group)
            .map(|g| g.members().to_vec())
            .unwrap_or_default()
    }

    /// Check if a group exists
    pub fn has_group(&self, group: GroupAddress) -> bool {
        self.groups.contains_key(&group)
    }

    /// Iterate over all groups
    pub fn groups(&self) -> impl Iterator<Item = &MulticastGroup> {
        self.groups.values()
    }

    /// Get all group addresses, sorted
    pub fn group_addresses(&self) -> Vec<GroupAddress> {
        let mut addresses: Vec<GroupAddress> = self.groups.keys().copied().collect();
        addresses.sort();
        addresses
    }

    /// Get group count
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Clear all groups
    pub fn clear(&mut self) {
        self.groups.clear();
    }

    fn group_entry(&mut self, group: GroupAddress) -> &mut MulticastGroup {
        self.groups.entry(group).or_insert_with(|| {
            log::debug!("Created multicast group {}", group);
            MulticastGroup::new(group)
        })
    }
}

/// Registry handle that can be shared between threads.
///
/// A single lock covers registration and lookup, so a transmitter calling
/// [`SharedGroupRegistry::lookup`] always gets a consistent copy of the
/// member list even while stations join or leave.
#[derive(Debug, Clone, Default)]
pub struct SharedGroupRegistry {
    inner: Arc<Mutex<GroupRegistry>>,
}

impl SharedGroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&self, group: GroupAddress, member: StationAddress) {
        self.lock().add_member(group, member);
    }

    pub fn add_member_unique(&self, group: GroupAddress, member: StationAddress) -> bool {
        self.lock().add_member_unique(group, member)
    }

    pub fn remove_member(&self, group: GroupAddress, member: StationAddress) -> bool {
        self.lock().remove_member(group, member)
    }

    pub fn remove_station(&self, member: StationAddress) -> Vec<GroupAddress> {
        self.lock().remove_station(member)
    }

    pub fn lookup(&self, group: GroupAddress) -> Vec<StationAddress> {
        self.lock().lookup(group)
    }

    pub fn has_group(&self, group: GroupAddress) -> bool {
        self.lock().has_group(group)
    }

    pub fn group_count(&self) -> usize {
        self.lock().group_count()
    }

    /// Copy of the whole registry taken under the lock
    pub fn snapshot(&self) -> GroupRegistry {
        self.lock().clone()
    }

    // Every mutation completes before the guard drops, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, GroupRegistry> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
