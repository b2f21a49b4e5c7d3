use std::collections::HashSet;

use url::Url;

use crate::error::ValidationErrors;

use super::types::{CircleDraft, Member};

const MAX_NAME_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 1000;

/// Check a circle payload before it is sent anywhere.
pub fn validate_create(draft: &CircleDraft) -> Result<CircleDraft, ValidationErrors> {
  let mut errors = ValidationErrors::new();

  if draft.name.is_empty() {
    errors.push("name", "Circle name is required");
  } else if draft.name.chars().count() > MAX_NAME_LEN {
    errors.push(
      "name",
      format!("Circle name must be at most {} characters", MAX_NAME_LEN),
    );
  }

  if let Some(description) = draft.description.as_deref() {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
      errors.push(
        "description",
        format!("Description must be at most {} characters", MAX_DESCRIPTION_LEN),
      );
    }
  }

  if !is_url_or_empty(draft.avatar_url.as_deref()) {
    errors.push("avatarUrl", "Avatar URL must be a valid URL");
  }

  if let Some(members) = draft.members.as_deref() {
    let mut seen = HashSet::new();
    for (i, member) in members.iter().enumerate() {
      check_member(&mut errors, &format!("members[{}].", i), member);
      if !member.user_id.is_empty() && !seen.insert(member.user_id.as_str()) {
        errors.push(
          format!("members[{}].userId", i),
          format!("Duplicate member {}", member.user_id),
        );
      }
    }
  }

  errors.into_result(draft.clone())
}

/// Check one member about to join an existing circle.
pub fn validate_member(member: &Member) -> Result<Member, ValidationErrors> {
  let mut errors = ValidationErrors::new();
  check_member(&mut errors, "", member);
  errors.into_result(member.clone())
}

fn check_member(errors: &mut ValidationErrors, prefix: &str, member: &Member) {
  if member.user_id.is_empty() {
    errors.push(format!("{}userId", prefix), "User ID is required");
  }
  if member.user_name.is_empty() {
    errors.push(format!("{}userName", prefix), "User name is required");
  }
  if !is_url_or_empty(member.user_avatar.as_deref()) {
    errors.push(format!("{}userAvatar", prefix), "Avatar URL must be a valid URL");
  }
}

/// Absent, empty, or an absolute URL.
fn is_url_or_empty(value: Option<&str>) -> bool {
  match value {
    None | Some("") => true,
    Some(v) => Url::parse(v).is_ok(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_draft_passes() {
    assert!(validate_create(&CircleDraft::named("Book club")).is_ok());
  }

  #[test]
  fn test_name_bounds() {
    let errors = validate_create(&CircleDraft::named("")).unwrap_err();
    assert_eq!(errors.to_string(), "name: Circle name is required");

    assert!(validate_create(&CircleDraft::named(&"n".repeat(200))).is_ok());
    assert!(validate_create(&CircleDraft::named(&"n".repeat(201))).is_err());
  }

  #[test]
  fn test_reports_every_violation() {
    let draft = CircleDraft {
      name: String::new(),
      description: Some("d".repeat(1001)),
      avatar_url: Some("not a url".into()),
      members: Some(vec![
        Member::new("u1", "ana"),
        Member::new("u1", "ana again"),
        Member::new("", ""),
      ]),
      ..Default::default()
    };
    let errors = validate_create(&draft).unwrap_err();
    for field in [
      "name",
      "description",
      "avatarUrl",
      "members[1].userId",
      "members[2].userId",
      "members[2].userName",
    ] {
      assert!(errors.has(field), "missing violation for {}", field);
    }
  }

  #[test]
  fn test_empty_avatar_is_allowed() {
    let draft = CircleDraft {
      avatar_url: Some(String::new()),
      ..CircleDraft::named("Cycling")
    };
    assert!(validate_create(&draft).is_ok());
  }

  #[test]
  fn test_validate_member() {
    let mut member = Member::new("u9", "kai");
    member.user_avatar = Some("https://picsum.photos/200".into());
    assert!(validate_member(&member).is_ok());

    member.user_avatar = Some("picsum".into());
    let errors = validate_member(&member).unwrap_err();
    assert!(errors.has("userAvatar"));
  }
}
