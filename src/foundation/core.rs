/// Identifier of one encoding session, strictly monotonically increasing per controller.
///
/// Encoder events are tagged with the session that produced them; events carrying an id
/// other than the live session are discarded, which is the complete cancellation story.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct SessionId(pub u64);

/// Stable identity of one frame entry in a [`crate::frames::store::FrameStore`].
///
/// Identity survives reordering; only the sequence position changes.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameId(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_order_by_value() {
        assert!(SessionId(2) > SessionId(1));
        assert_eq!(SessionId(3), SessionId(3));
    }

    #[test]
    fn frame_id_serde_round_trip() {
        let id = FrameId(42);
        let json = serde_json::to_string(&id).unwrap();
        let back: FrameId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
