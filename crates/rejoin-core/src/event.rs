//! Inbound platform events

use rejoin_types::{CommunityId, MemberSnapshot};
use serde::{Deserialize, Serialize};

/// A member left a community
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDeparted {
    pub community_id: CommunityId,
    /// Roles and nickname held at departure
    pub member: MemberSnapshot,
}

/// A member joined a community
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberArrived {
    pub community_id: CommunityId,
    /// Roles the platform assigned on join
    pub member: MemberSnapshot,
}

/// Join or leave notification, as delivered by the platform client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemberEvent {
    Departed(MemberDeparted),
    Arrived(MemberArrived),
}

impl MemberEvent {
    /// Departure event
    #[must_use]
    pub fn departed(community_id: impl Into<CommunityId>, member: MemberSnapshot) -> Self {
        Self::Departed(MemberDeparted {
            community_id: community_id.into(),
            member,
        })
    }

    /// Arrival event
    #[must_use]
    pub fn arrived(community_id: impl Into<CommunityId>, member: MemberSnapshot) -> Self {
        Self::Arrived(MemberArrived {
            community_id: community_id.into(),
            member,
        })
    }

    /// Community the event belongs to
    #[inline]
    #[must_use]
    pub fn community_id(&self) -> &CommunityId {
        match self {
            Self::Departed(e) => &e.community_id,
            Self::Arrived(e) => &e.community_id,
        }
    }

    /// Member the event is about
    #[inline]
    #[must_use]
    pub fn member(&self) -> &MemberSnapshot {
        match self {
            Self::Departed(e) => &e.member,
            Self::Arrived(e) => &e.member,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rejoin_types::roles;

    #[test]
    fn event_json_shape() {
        let line = r#"{"kind":"departed","community_id":"g1","member":{"id":"m1","roles":["mod"],"nickname":"Al"}}"#;
        let event: MemberEvent = serde_json::from_str(line).unwrap();

        assert_eq!(event.community_id().as_str(), "g1");
        assert_eq!(event.member().roles, roles(["mod"]));
        assert!(matches!(event, MemberEvent::Departed(_)));
    }

    #[test]
    fn arrival_without_nickname() {
        let line = r#"{"kind":"arrived","community_id":"g1","member":{"id":"m1","roles":["member"]}}"#;
        let event: MemberEvent = serde_json::from_str(line).unwrap();
        assert_eq!(
            event,
            MemberEvent::arrived("g1", MemberSnapshot::new("m1").with_roles(roles(["member"])))
        );
    }
}
