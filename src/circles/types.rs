use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::cache::Cacheable;

/// String enumeration with a fallback for values this build does not know.
///
/// Unknown values survive a round trip unchanged instead of failing to
/// decode or being folded into a known variant.
macro_rules! open_enum {
  ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
    $(#[$meta])*
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub enum $name {
      $($variant,)+
      Unrecognized(String),
    }

    impl $name {
      pub fn as_str(&self) -> &str {
        match self {
          $($name::$variant => $value,)+
          $name::Unrecognized(raw) => raw.as_str(),
        }
      }
    }

    impl From<&str> for $name {
      fn from(raw: &str) -> Self {
        match raw {
          $($value => $name::$variant,)+
          other => $name::Unrecognized(other.to_string()),
        }
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
      }
    }

    impl Serialize for $name {
      fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
      }
    }

    impl<'de> Deserialize<'de> for $name {
      fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok($name::from(raw.as_str()))
      }
    }
  };
}

open_enum!(
  /// Who can see and join a circle.
  Privacy {
    Public => "PUBLIC",
    Private => "PRIVATE",
    InviteOnly => "INVITE_ONLY",
  }
);

open_enum!(
  CircleType {
    Family => "FAMILY",
    Friends => "FRIENDS",
    Work => "WORK",
    Hobby => "HOBBY",
    Community => "COMMUNITY",
    Other => "OTHER",
  }
);

open_enum!(
  /// A member's permissions within one circle.
  MemberRole {
    Admin => "ADMIN",
    Member => "MEMBER",
    Viewer => "VIEWER",
  }
);

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
  pub user_id: String,
  pub user_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_avatar: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub nickname: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub role: Option<MemberRole>,
}

impl Member {
  pub fn new(user_id: &str, user_name: &str) -> Self {
    Self {
      user_id: user_id.to_string(),
      user_name: user_name.to_string(),
      user_avatar: None,
      nickname: None,
      role: None,
    }
  }

  pub fn with_role(mut self, role: MemberRole) -> Self {
    self.role = Some(role);
    self
  }
}

/// A shared circle. The remote service owns it; locally it is a shadow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circle {
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub circle_type: Option<CircleType>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub privacy: Option<Privacy>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar_url: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub settings: Map<String, Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub invite_code: Option<String>,
  /// Join order.
  #[serde(default, deserialize_with = "null_as_default")]
  pub members: Vec<Member>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
}

impl Circle {
  pub fn member(&self, user_id: &str) -> Option<&Member> {
    self.members.iter().find(|m| m.user_id == user_id)
  }
}

impl Cacheable for Circle {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn entity_type() -> &'static str {
    "circle"
  }
}

/// Payload for creating a circle; the remote assigns id and invite code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleDraft {
  #[serde(default)]
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub circle_type: Option<CircleType>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub privacy: Option<Privacy>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub settings: Option<Map<String, Value>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub members: Option<Vec<Member>>,
}

impl CircleDraft {
  pub fn named(name: &str) -> Self {
    Self {
      name: name.to_string(),
      ..Default::default()
    }
  }
}
