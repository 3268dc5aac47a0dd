use serde_json::{Map, Value};

use crate::types::{DesiredRole, Intent, MatchMode};

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Start {
        mode: MatchMode,
        role: DesiredRole,
        seed: Option<u32>,
    },
    Intent(Intent),
    Autopilot {
        enabled: bool,
    },
    Pause,
    Resume,
    Quit,
    Freeze,
    Ping {
        t: f64,
    },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "start" => {
            let mode = match object.get("mode") {
                None => MatchMode::Single,
                Some(value) => MatchMode::parse(value.as_str()?)?,
            };
            let role = match object.get("role") {
                None => DesiredRole::Random,
                Some(value) => DesiredRole::parse(value.as_str()?)?,
            };
            let seed = parse_optional_seed(object.get("seed"))?;
            Some(ParsedClientMessage::Start { mode, role, seed })
        }
        "intent" => Some(ParsedClientMessage::Intent(Intent {
            up: parse_flag(object, "up")?,
            down: parse_flag(object, "down")?,
            left: parse_flag(object, "left")?,
            right: parse_flag(object, "right")?,
        })),
        "autopilot" => {
            let enabled = object.get("enabled")?.as_bool()?;
            Some(ParsedClientMessage::Autopilot { enabled })
        }
        "pause" => Some(ParsedClientMessage::Pause),
        "resume" => Some(ParsedClientMessage::Resume),
        "quit" => Some(ParsedClientMessage::Quit),
        "freeze" => Some(ParsedClientMessage::Freeze),
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

/// Missing keys read as released; present keys must be booleans.
fn parse_flag(object: &Map<String, Value>, key: &str) -> Option<bool> {
    match object.get(key) {
        None => Some(false),
        Some(value) => value.as_bool(),
    }
}

fn parse_optional_seed(value: Option<&Value>) -> Option<Option<u32>> {
    let Some(value) = value else {
        return Some(None);
    };
    if value.is_null() {
        return Some(None);
    }
    if let Some(number) = value.as_u64() {
        return u32::try_from(number).ok().map(Some);
    }
    if let Some(number) = value.as_f64() {
        if number.is_finite() && number >= 0.0 {
            let floored = number.floor();
            if floored > u32::MAX as f64 {
                return None;
            }
            return Some(Some(floored as u32));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_start_message() {
        let parsed =
            parse_client_message(r#"{"type":"start","mode":"multi","role":"runner","seed":42}"#)
                .expect("start message should parse");
        assert_eq!(
            parsed,
            ParsedClientMessage::Start {
                mode: MatchMode::Multi,
                role: DesiredRole::Runner,
                seed: Some(42),
            }
        );
    }

    #[test]
    fn parse_start_defaults() {
        let parsed = parse_client_message(r#"{"type":"start"}"#).expect("start should parse");
        assert_eq!(
            parsed,
            ParsedClientMessage::Start {
                mode: MatchMode::Single,
                role: DesiredRole::Random,
                seed: None,
            }
        );
    }

    #[test]
    fn parse_start_rejects_unknown_mode_or_role() {
        assert!(parse_client_message(r#"{"type":"start","mode":"duo"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"start","role":"ghost"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"start","mode":3}"#).is_none());
    }

    #[test]
    fn parse_start_seed_bounds() {
        let parsed = parse_client_message(r#"{"type":"start","seed":7.9}"#);
        assert!(matches!(
            parsed,
            Some(ParsedClientMessage::Start { seed: Some(7), .. })
        ));
        assert!(parse_client_message(r#"{"type":"start","seed":4294967296}"#).is_none());
        assert!(parse_client_message(r#"{"type":"start","seed":-1}"#).is_none());
        assert!(parse_client_message(r#"{"type":"start","seed":"x"}"#).is_none());
    }

    #[test]
    fn parse_intent_treats_missing_keys_as_released() {
        let parsed = parse_client_message(r#"{"type":"intent","up":true,"left":true}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::Intent(Intent {
                up: true,
                down: false,
                left: true,
                right: false,
            }))
        );
    }

    #[test]
    fn parse_intent_rejects_non_boolean_keys() {
        assert!(parse_client_message(r#"{"type":"intent","up":1}"#).is_none());
    }

    #[test]
    fn parse_triggers() {
        assert_eq!(
            parse_client_message(r#"{"type":"pause"}"#),
            Some(ParsedClientMessage::Pause)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"resume"}"#),
            Some(ParsedClientMessage::Resume)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"quit"}"#),
            Some(ParsedClientMessage::Quit)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"freeze"}"#),
            Some(ParsedClientMessage::Freeze)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"autopilot","enabled":true}"#),
            Some(ParsedClientMessage::Autopilot { enabled: true })
        );
    }

    #[test]
    fn parse_ping_requires_finite_number() {
        let parsed = parse_client_message(r#"{"type":"ping","t":12.5}"#);
        assert!(matches!(parsed, Some(ParsedClientMessage::Ping { .. })));
        assert!(parse_client_message(r#"{"type":"ping","t":"soon"}"#).is_none());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_client_message("not json").is_none());
        assert!(parse_client_message(r#"[1,2]"#).is_none());
        assert!(parse_client_message(r#"{"type":"dance"}"#).is_none());
    }
}
