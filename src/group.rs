//! Multicast group membership
//!
//! A group is identified by its group address and holds the stations that
//! subscribed to it, in subscription order.

use crate::address::{GroupAddress, StationAddress};

/// Multicast group and its member stations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticastGroup {
    /// Group address that identifies the group
    group_address: GroupAddress,
    /// Member stations in insertion order
    members: Vec<StationAddress>,
}

impl MulticastGroup {
    /// Create empty group
    pub fn new(group_address: GroupAddress) -> Self {
        Self {
            group_address,
            members: Vec::new(),
        }
    }

    /// Get the group address
    pub fn group_address(&self) -> GroupAddress {
        self.group_address
    }

    /// Get the member stations
    pub fn members(&self) -> &[StationAddress] {
        &self.members
    }

    /// Append a member.
    ///
    /// Duplicates are not rejected: registering the same station twice
    /// yields two entries. Use [`MulticastGroup::add_member_unique`] when
    /// idempotent registration is needed.
    pub fn add_member(&mut self, member: StationAddress) {
        self.members.push(member);
    }

    /// Append a member unless already present. Returns whether it was added.
    pub fn add_member_unique(&mut self, member: StationAddress) -> bool {
        if self.contains(&member) {
            return false;
        }
        self.members.push(member);
        true
    }

    /// Remove the first occurrence of a member, keeping the order of the rest
    pub fn remove_member(&mut self, member: &StationAddress) -> bool {
        match self.members.iter().position(|m| m == member) {
            Some(index) => {
                self.members.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every occurrence of a member. Returns how many were removed.
    pub fn remove_all(&mut self, member: &StationAddress) -> usize {
        let before = self.members.len();
        self.members.retain(|m| m != member);
        before - self.members.len()
    }

    /// Check if a station is a member
    pub fn contains(&self, member: &StationAddress) -> bool {
        self.members.contains(member)
    }

    /// Number of member entries
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
