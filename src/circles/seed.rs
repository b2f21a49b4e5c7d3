//! Locally generated circles: offline fallbacks and seeded samples.

use chrono::{SecondsFormat, Utc};
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::invite;
use super::types::{Circle, CircleDraft, CircleType, Member, MemberRole, Privacy};

const FALLBACK_DESCRIPTION: &str = "A fallback (in-memory) circle created locally";
const SEED_DESCRIPTION: &str = "Seeded dummy circle";

fn random_suffix(len: usize) -> String {
  rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(len)
    .map(|b| (b as char).to_ascii_lowercase())
    .collect()
}

fn color_settings(color: &str) -> Map<String, Value> {
  let mut settings = Map::new();
  settings.insert("color".to_string(), json!(color));
  settings
}

/// `Circle-x3k9qa` style placeholder name.
pub fn random_name(prefix: &str) -> String {
  format!("{}-{}", prefix, random_suffix(6))
}

pub fn random_member() -> Member {
  let roles = [MemberRole::Admin, MemberRole::Member, MemberRole::Viewer];
  let role = roles
    .choose(&mut rand::thread_rng())
    .cloned()
    .unwrap_or(MemberRole::Member);

  Member {
    user_id: Uuid::new_v4().to_string(),
    user_name: format!("user_{}", random_suffix(8)),
    user_avatar: Some(format!(
      "https://picsum.photos/seed/{}/100/100",
      random_suffix(6)
    )),
    nickname: Some(format!("nick_{}", random_suffix(4))),
    role: Some(role),
  }
}

/// Fill every unset field of a seed request with sample values.
pub fn seed_draft(overrides: CircleDraft) -> CircleDraft {
  CircleDraft {
    name: if overrides.name.is_empty() {
      random_name("Circle")
    } else {
      overrides.name
    },
    description: overrides
      .description
      .or_else(|| Some(SEED_DESCRIPTION.to_string())),
    circle_type: overrides.circle_type.or(Some(CircleType::Hobby)),
    privacy: overrides.privacy.or(Some(Privacy::Private)),
    avatar_url: overrides.avatar_url.or_else(|| Some(String::new())),
    settings: overrides.settings.or_else(|| Some(color_settings("purple"))),
    members: overrides
      .members
      .or_else(|| Some(vec![random_member(), random_member()])),
  }
}

/// Build the complete local record for a draft the remote never accepted.
pub fn synthesize(draft: CircleDraft) -> Circle {
  Circle {
    id: Uuid::new_v4().to_string(),
    name: draft.name,
    description: draft
      .description
      .or_else(|| Some(FALLBACK_DESCRIPTION.to_string())),
    circle_type: draft.circle_type.or(Some(CircleType::Other)),
    privacy: draft.privacy.or(Some(Privacy::Public)),
    avatar_url: draft.avatar_url.or_else(|| Some(String::new())),
    settings: draft.settings.unwrap_or_else(|| color_settings("blue")),
    invite_code: Some(invite::generate()),
    members: draft.members.unwrap_or_else(|| vec![random_member()]),
    created_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::circles::validation::validate_create;

  #[test]
  fn test_synthesize_defaults() {
    let circle = synthesize(CircleDraft::named("Running"));
    assert!(Uuid::parse_str(&circle.id).is_ok());
    assert_eq!(circle.name, "Running");
    assert_eq!(circle.privacy, Some(Privacy::Public));
    assert_eq!(circle.circle_type, Some(CircleType::Other));
    assert_eq!(circle.settings["color"], "blue");
    assert_eq!(circle.members.len(), 1);
    assert!(invite::is_valid(circle.invite_code.as_deref().unwrap_or_default()));
    assert!(circle.created_at.is_some());
  }

  #[test]
  fn test_synthesize_keeps_supplied_fields() {
    let draft = CircleDraft {
      privacy: Some(Privacy::InviteOnly),
      members: Some(vec![]),
      ..CircleDraft::named("Quiet")
    };
    let circle = synthesize(draft);
    assert_eq!(circle.privacy, Some(Privacy::InviteOnly));
    assert!(circle.members.is_empty());
  }

  #[test]
  fn test_seed_draft_is_valid() {
    let draft = seed_draft(CircleDraft::default());
    assert!(draft.name.starts_with("Circle-"));
    assert_eq!(draft.circle_type, Some(CircleType::Hobby));
    assert_eq!(draft.privacy, Some(Privacy::Private));
    assert_eq!(draft.description.as_deref(), Some("Seeded dummy circle"));
    assert_eq!(draft.members.as_ref().map(Vec::len), Some(2));
    assert!(validate_create(&draft).is_ok());
  }

  #[test]
  fn test_seed_draft_respects_overrides() {
    let draft = seed_draft(CircleDraft::named("Chess"));
    assert_eq!(draft.name, "Chess");
  }
}
