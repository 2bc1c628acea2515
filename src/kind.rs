// Request kinds supported by the lookup API

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which lookup to perform. Selects the query template and required fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Profile,
    FullProfile,
    Stories,
    Domain,
    Following,
    Comments,
    AccountInfo,
}

impl RequestKind {
    /// Every kind, in tab order
    pub const ALL: [RequestKind; 7] = [
        RequestKind::Profile,
        RequestKind::FullProfile,
        RequestKind::Stories,
        RequestKind::Domain,
        RequestKind::Following,
        RequestKind::Comments,
        RequestKind::AccountInfo,
    ];

    /// Canonical snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Profile => "profile",
            RequestKind::FullProfile => "full_profile",
            RequestKind::Stories => "stories",
            RequestKind::Domain => "domain",
            RequestKind::Following => "following",
            RequestKind::Comments => "comments",
            RequestKind::AccountInfo => "account_info",
        }
    }

    /// Short human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            RequestKind::Profile => "Profile",
            RequestKind::FullProfile => "Analytics",
            RequestKind::Stories => "Stories",
            RequestKind::Domain => "Domain",
            RequestKind::Following => "Following",
            RequestKind::Comments => "Comments",
            RequestKind::AccountInfo => "Security",
        }
    }

    /// Value of the `type` query parameter. `Profile` sends none.
    pub fn type_value(&self) -> Option<&'static str> {
        match self {
            RequestKind::Profile => None,
            RequestKind::FullProfile => Some("full"),
            RequestKind::Stories => Some("stories"),
            RequestKind::Domain => Some("domain"),
            RequestKind::Following => Some("following"),
            RequestKind::Comments => Some("comments"),
            RequestKind::AccountInfo => Some("account_info"),
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = String;

    /// Accepts canonical names (case-insensitive, `-` or `_`) and the
    /// `analytics` / `security` tab aliases
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "profile" => Ok(RequestKind::Profile),
            "full_profile" | "analytics" => Ok(RequestKind::FullProfile),
            "stories" => Ok(RequestKind::Stories),
            "domain" => Ok(RequestKind::Domain),
            "following" => Ok(RequestKind::Following),
            "comments" => Ok(RequestKind::Comments),
            "account_info" | "security" => Ok(RequestKind::AccountInfo),
            _ => Err(format!(
                "unknown request kind '{}' (expected one of: {})",
                s,
                RequestKind::ALL
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}
