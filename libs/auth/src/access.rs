use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Operator,
    #[default]
    Viewer,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Operator => write!(f, "operator"),
            Role::Viewer => write!(f, "viewer"),
        }
    }
}

/// Look like Linux File-system permissions
/// r: allow play a stream
/// w: allow start / stop streams and recordings
/// x: reserved for account administration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub r: bool,
    pub w: bool,
    pub x: bool,
}

impl From<Role> for Access {
    fn from(role: Role) -> Access {
        match role {
            Role::Admin => Access {
                r: true,
                w: true,
                x: true,
            },
            Role::Operator => Access {
                r: true,
                w: true,
                x: false,
            },
            Role::Viewer => Access {
                r: true,
                w: false,
                x: false,
            },
        }
    }
}

impl Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.r { "r" } else { "-" },
            if self.w { "w" } else { "-" },
            if self.x { "x" } else { "-" },
        )
    }
}
