/// Bridge channels and lookup/autocomplete logic

/// Operation a channel dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
  VehicleList,
  VehicleGet,
  VehicleCreate,
  VehicleUpdate,
  VehicleDelete,
  CircleCreate,
  CircleGet,
  CircleList,
  CircleSeed,
  CircleAddMember,
  CircleJoin,
}

#[derive(Debug, Clone)]
pub struct Channel {
  pub name: &'static str,
  pub op: Op,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  /// Positional argument names, optional ones in brackets
  pub args: &'static [&'static str],
}

/// All available channels
pub const CHANNELS: &[Channel] = &[
  Channel {
    name: "vehicle:getAll",
    op: Op::VehicleList,
    aliases: &["car:getAll", "vehicles"],
    description: "List vehicles, newest first",
    args: &[],
  },
  Channel {
    name: "vehicle:getById",
    op: Op::VehicleGet,
    aliases: &["car:getById"],
    description: "Fetch one vehicle",
    args: &["id"],
  },
  Channel {
    name: "vehicle:create",
    op: Op::VehicleCreate,
    aliases: &["car:create"],
    description: "Add a vehicle",
    args: &["vehicle"],
  },
  Channel {
    name: "vehicle:update",
    op: Op::VehicleUpdate,
    aliases: &["car:update"],
    description: "Change some fields of a vehicle",
    args: &["id", "fields"],
  },
  Channel {
    name: "vehicle:delete",
    op: Op::VehicleDelete,
    aliases: &["car:delete"],
    description: "Remove a vehicle",
    args: &["id"],
  },
  Channel {
    name: "circle:create",
    op: Op::CircleCreate,
    aliases: &[],
    description: "Create a circle (locally if the service is down)",
    args: &["circle"],
  },
  Channel {
    name: "circle:getById",
    op: Op::CircleGet,
    aliases: &[],
    description: "Fetch one circle",
    args: &["id"],
  },
  Channel {
    name: "circle:getAll",
    op: Op::CircleList,
    aliases: &["circles"],
    description: "List circles",
    args: &[],
  },
  Channel {
    name: "circle:seed",
    op: Op::CircleSeed,
    aliases: &["circle:seedOne"],
    description: "Add a sample circle",
    args: &["[overrides]"],
  },
  Channel {
    name: "circle:addMember",
    op: Op::CircleAddMember,
    aliases: &[],
    description: "Add a member to a circle",
    args: &["id", "member"],
  },
  Channel {
    name: "circle:join",
    op: Op::CircleJoin,
    aliases: &["circle:joinByCode"],
    description: "Join a circle with an invite code",
    args: &["code", "member"],
  },
];

impl Channel {
  /// `name <arg> [opt]` usage line
  pub fn usage(&self) -> String {
    let mut usage = self.name.to_string();
    for arg in self.args {
      if arg.starts_with('[') {
        usage.push_str(&format!(" {}", arg));
      } else {
        usage.push_str(&format!(" <{}>", arg));
      }
    }
    usage
  }
}

/// Exact lookup by name or alias, ignoring case
pub fn resolve(input: &str) -> Option<&'static Channel> {
  let input_lower = input.to_lowercase();
  CHANNELS.iter().find(|ch| {
    ch.name.to_lowercase() == input_lower
      || ch.aliases.iter().any(|a| a.to_lowercase() == input_lower)
  })
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Channel> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return CHANNELS.iter().collect();
  }

  let mut matches: Vec<(&Channel, u32)> = Vec::new();

  for ch in CHANNELS {
    let name = ch.name.to_lowercase();
    let aliases: Vec<String> = ch.aliases.iter().map(|a| a.to_lowercase()).collect();

    if name == input_lower {
      matches.push((ch, 0));
    } else if aliases.contains(&input_lower) {
      matches.push((ch, 1));
    } else if name.starts_with(&input_lower) {
      matches.push((ch, 2));
    } else if aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((ch, 3));
    } else if name.contains(&input_lower) {
      matches.push((ch, 4));
    } else if aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((ch, 5));
    }
  }

  // Stable sort keeps table order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(ch, _)| ch).collect()
}
