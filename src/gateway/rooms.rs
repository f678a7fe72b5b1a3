use dashmap::DashMap;
use std::collections::HashSet;

/// Room id -> member connection ids. Rooms exist only while they have
/// members. Each room lives in one DashMap shard, so membership changes
/// are serialized per room without a registry-wide lock.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, HashSet<String>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when `connection_id` was not already a member.
    pub fn join(&self, room_id: &str, connection_id: &str) -> bool {
        self.rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(connection_id.to_string())
    }

    pub fn leave(&self, room_id: &str, connection_id: &str) {
        if let Some(mut members) = self.rooms.get_mut(room_id) {
            members.remove(connection_id);
        }
        self.rooms.remove_if(room_id, |_, members| members.is_empty());
    }

    pub fn members(&self, room_id: &str) -> Vec<String> {
        self.rooms
            .get(room_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, room_id: &str, connection_id: &str) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|members| members.contains(connection_id))
    }

    pub fn member_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map(|m| m.len()).unwrap_or(0)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_creates_room() {
        let rooms = RoomRegistry::new();
        assert!(rooms.join("r1", "a"));
        assert_eq!(rooms.room_count(), 1);
        assert!(rooms.contains("r1", "a"));
    }

    #[test]
    fn test_repeated_join_is_idempotent() {
        let rooms = RoomRegistry::new();
        assert!(rooms.join("r1", "a"));
        assert!(!rooms.join("r1", "a"));
        assert_eq!(rooms.member_count("r1"), 1);
    }

    #[test]
    fn test_last_leave_drops_room() {
        let rooms = RoomRegistry::new();
        rooms.join("r1", "a");
        rooms.join("r1", "b");
        rooms.leave("r1", "a");
        assert_eq!(rooms.room_count(), 1);
        assert_eq!(rooms.members("r1"), vec!["b".to_string()]);
        rooms.leave("r1", "b");
        assert_eq!(rooms.room_count(), 0);
        assert!(rooms.members("r1").is_empty());
    }

    #[test]
    fn test_leave_unknown_room_is_noop() {
        let rooms = RoomRegistry::new();
        rooms.leave("missing", "a");
        assert_eq!(rooms.room_count(), 0);
    }

    #[test]
    fn test_concurrent_joins_to_different_rooms() {
        let rooms = std::sync::Arc::new(RoomRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let rooms = rooms.clone();
                std::thread::spawn(move || {
                    for n in 0..100 {
                        rooms.join(&format!("room-{}", n % 4), &format!("conn-{i}-{n}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(rooms.room_count(), 4);
        let total: usize = (0..4).map(|r| rooms.member_count(&format!("room-{r}"))).sum();
        assert_eq!(total, 800);
    }
}
