//! Roles held inside an organization
//!
//! This module defines the role a member holds within an organization and
//! the type of a leadership tenure.

use serde::{Deserialize, Serialize};

/// Role of a person within an organization.
///
/// # Role Model
///
/// - **Member**: Regular member of the unit
/// - **Officer**: Holds a formal position
/// - **Acting**: Appointed acting official
/// - **ActingDaily**: Daily executive standing in for an absent official
/// - **Admin**: Manages the unit's membership records
///
/// # Examples
///
/// ```
/// use governance_org::MembershipRole;
///
/// let role = MembershipRole::parse("officer").unwrap_or_default();
/// assert_eq!(role, MembershipRole::Officer);
/// assert_eq!(role.as_str(), "OFFICER");
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipRole {
    /// Regular member
    #[default]
    Member,

    /// Holds a formal position
    Officer,

    /// Acting official
    Acting,

    /// Daily executive
    ActingDaily,

    /// Membership administrator
    Admin,
}

impl MembershipRole {
    /// Parse role from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use governance_org::MembershipRole;
    ///
    /// assert_eq!(MembershipRole::parse("officer"), Some(MembershipRole::Officer));
    /// assert_eq!(MembershipRole::parse("ACTING_DAILY"), Some(MembershipRole::ActingDaily));
    /// assert_eq!(MembershipRole::parse("invalid"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "MEMBER" => Some(Self::Member),
            "OFFICER" => Some(Self::Officer),
            "ACTING" => Some(Self::Acting),
            "ACTING_DAILY" => Some(Self::ActingDaily),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Get string representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "MEMBER",
            Self::Officer => "OFFICER",
            Self::Acting => "ACTING",
            Self::ActingDaily => "ACTING_DAILY",
            Self::Admin => "ADMIN",
        }
    }
}

/// Type of a leadership tenure.
///
/// All three types are retired the same way when a successor is assigned.
///
/// # Examples
///
/// ```
/// use governance_org::LeadershipType;
///
/// assert_eq!(LeadershipType::default(), LeadershipType::Definitive);
/// assert_eq!(LeadershipType::parse("acting_daily"), Some(LeadershipType::ActingDaily));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadershipType {
    /// Permanent appointment
    #[default]
    Definitive,

    /// Acting appointment
    Acting,

    /// Daily executive
    ActingDaily,
}

impl LeadershipType {
    /// Parse leadership type from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DEFINITIVE" => Some(Self::Definitive),
            "ACTING" => Some(Self::Acting),
            "ACTING_DAILY" => Some(Self::ActingDaily),
            _ => None,
        }
    }

    /// Get string representation of the leadership type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Definitive => "DEFINITIVE",
            Self::Acting => "ACTING",
            Self::ActingDaily => "ACTING_DAILY",
        }
    }
}
