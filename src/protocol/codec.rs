//! Frame encoding and decoding
//!
//! This is the only place that knows frames travel as JSON objects with a
//! `type` discriminant. Decoding checks the discriminant before the payload
//! is interpreted, so an unknown tag never produces a partial frame.

use bytes::Bytes;
use serde_json::Value;

use super::frame::Frame;

/// Largest frame accepted by the decoder (1 MB). A full roster of a few
/// dozen participants is well under a kilobyte.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Frame decoding errors
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("empty frame")]
    Empty,

    #[error("frame too large: {len} bytes (max {MAX_FRAME_SIZE})")]
    TooLarge { len: usize },

    #[error("frame has no type discriminant")]
    MissingTag,

    #[error("unknown frame type: {0}")]
    UnknownTag(String),

    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Frame encoding errors
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// JSON has no NaN or infinity; such a frame would not decode
    #[error("{kind} frame contains a non-finite number")]
    NonFinite { kind: &'static str },

    #[error("failed to encode frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize a frame into a wire payload
pub fn encode(frame: &Frame) -> Result<Bytes, EncodeError> {
    if !is_finite(frame) {
        return Err(EncodeError::NonFinite { kind: frame.kind() });
    }
    Ok(Bytes::from(serde_json::to_vec(frame)?))
}

fn is_finite(frame: &Frame) -> bool {
    match frame {
        Frame::Positions(snapshot) => {
            snapshot.ball.x.is_finite()
                && snapshot.ball.y.is_finite()
                && snapshot
                    .positions
                    .values()
                    .all(|p| p.x.is_finite() && p.y.is_finite())
        }
        Frame::Input(input) => input.direction.iter().all(|d| d.is_finite()),
        Frame::Game(_) | Frame::PlayerJoinLeft(_) => true,
    }
}

/// Parse a wire payload into a frame
pub fn decode(bytes: &[u8]) -> Result<Frame, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    if bytes.len() > MAX_FRAME_SIZE {
        return Err(DecodeError::TooLarge { len: bytes.len() });
    }

    let value: Value = serde_json::from_slice(bytes)?;
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingTag)?;

    if !Frame::TAGS.contains(&tag) {
        return Err(DecodeError::UnknownTag(tag.to_string()));
    }

    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::{
        BallState, GameState, JoinLeft, Participant, PeerId, PositionRecord, PositionSnapshot,
        Team,
    };

    #[test]
    fn positions_use_compact_array_layout() {
        let mut snapshot = PositionSnapshot {
            ball: BallState { x: 15.0, y: 15.0 },
            ..Default::default()
        };
        snapshot.positions.insert(
            PeerId::from("A"),
            PositionRecord {
                x: 10.0,
                y: 10.0,
                shooting: false,
            },
        );

        let bytes = encode(&Frame::Positions(snapshot)).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["type"], "positions");
        assert_eq!(value["positions"]["A"], serde_json::json!([10.0, 10.0, false]));
        assert_eq!(value["ball"], serde_json::json!([15.0, 15.0]));
    }

    #[test]
    fn decodes_game_frame_from_wire_shape() {
        let raw = br#"{
            "type": "game",
            "host": "A",
            "participants": {
                "A": {"name": "Ann", "team": "red", "index": 0},
                "B": {"name": "Bob", "team": "spectator", "index": 0}
            }
        }"#;

        let Frame::Game(game) = decode(raw).unwrap() else {
            panic!("expected game frame");
        };
        assert_eq!(game.host_id, PeerId::from("A"));
        assert_eq!(
            game.participant(&PeerId::from("A")),
            Some(&Participant {
                name: "Ann".into(),
                team: Team::Red,
                index: 0,
            })
        );
        assert_eq!(game.team_of(&PeerId::from("B")), Some(Team::Spectator));
    }

    #[test]
    fn game_frame_survives_encode_decode() {
        let mut game = GameState::new(PeerId::from("host"));
        game.participants.insert(
            PeerId::from("host"),
            Participant {
                name: "Host".into(),
                team: Team::Blue,
                index: 2,
            },
        );
        let frame = Frame::Game(game);

        let decoded = decode(&encode(&frame).unwrap()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn decodes_join_left() {
        let raw = br#"{"type":"player_join_left","name":"Bob","joined":false}"#;
        assert_eq!(
            decode(raw).unwrap(),
            Frame::PlayerJoinLeft(JoinLeft {
                name: "Bob".into(),
                joined: false,
            })
        );
    }

    #[test]
    fn rejects_unknown_tag_before_payload() {
        // Payload would otherwise be a valid positions body.
        let raw = br#"{"type":"teleport","positions":{},"ball":[0,0]}"#;
        assert!(matches!(decode(raw), Err(DecodeError::UnknownTag(tag)) if tag == "teleport"));
    }

    #[test]
    fn rejects_missing_tag() {
        assert!(matches!(
            decode(br#"{"positions":{},"ball":[0,0]}"#),
            Err(DecodeError::MissingTag)
        ));
        assert!(matches!(decode(b"[1,2,3]"), Err(DecodeError::MissingTag)));
    }

    #[test]
    fn rejects_malformed_payload() {
        assert!(matches!(decode(b"{not json"), Err(DecodeError::Malformed(_))));
        // Right tag, wrong field shape.
        let raw = br#"{"type":"positions","positions":{"A":[1.0]},"ball":[0,0]}"#;
        assert!(matches!(decode(raw), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn refuses_to_encode_non_finite_numbers() {
        let mut snapshot = PositionSnapshot::default();
        snapshot.positions.insert(
            PeerId::from("A"),
            PositionRecord {
                x: f32::NAN,
                y: 247.0,
                shooting: false,
            },
        );
        assert!(matches!(
            encode(&Frame::Positions(snapshot)),
            Err(EncodeError::NonFinite { kind: "positions" })
        ));

        let ball = PositionSnapshot {
            ball: BallState {
                x: f32::INFINITY,
                y: 0.0,
            },
            ..Default::default()
        };
        assert!(encode(&Frame::Positions(ball)).is_err());

        let input = Frame::Input(crate::protocol::frame::PlayerInput {
            direction: [0.0, f32::NEG_INFINITY],
            shooting: false,
        });
        assert!(matches!(
            encode(&input),
            Err(EncodeError::NonFinite { kind: "input" })
        ));
    }

    #[test]
    fn rejects_empty_and_oversized() {
        assert!(matches!(decode(b""), Err(DecodeError::Empty)));
        let big = vec![b' '; MAX_FRAME_SIZE + 1];
        assert!(matches!(decode(&big), Err(DecodeError::TooLarge { .. })));
    }
}
