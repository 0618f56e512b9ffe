//! # Records
//!
//! One JSON array file per entity, see [`crate::store::Collection`].
//!
//! Foreign keys (`Candidate::assigned_center_id`, `Candidate::sign_id`) are plain
//! identifiers. Nothing checks that they resolve and nothing cascades on delete,
//! so a dangling `sign_id` simply reads as "no symbol".
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::store::Collection;

pub const AVATAR_FALLBACK: &str = "https://ui-avatars.com/api/?name=";
pub const SYMBOLS_FOLDER: &str = "symbols";

/// Row stored in a [`Collection`] and addressed by an opaque string id.
pub trait Record: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync + 'static {
    type Draft: Send;
    type Patch: Send;

    const COLLECTION: Collection;

    fn id(&self) -> &str;

    fn from_draft(id: String, draft: Self::Draft) -> Self;

    fn apply(&mut self, patch: Self::Patch);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Superadmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::Superadmin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElectionCenter {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub area: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_bn: Option<String>,
    #[serde(
        default,
        deserialize_with = "opaque_optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub seat_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    #[serde(default)]
    pub total_voter: u64,
    #[serde(default)]
    pub male_voter: u64,
    #[serde(default)]
    pub female_voter: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transgender_voter: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CenterDraft {
    pub name: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub id_bn: Option<String>,
    #[serde(default, deserialize_with = "opaque_optional")]
    pub seat_number: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub total_voter: u64,
    #[serde(default)]
    pub male_voter: u64,
    #[serde(default)]
    pub female_voter: u64,
    #[serde(default)]
    pub transgender_voter: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CenterPatch {
    pub name: Option<String>,
    pub area: Option<String>,
    pub id_bn: Option<String>,
    #[serde(default, deserialize_with = "opaque_optional")]
    pub seat_number: Option<String>,
    pub district: Option<String>,
    pub division: Option<String>,
    pub total_voter: Option<u64>,
    pub male_voter: Option<u64>,
    pub female_voter: Option<u64>,
    pub transgender_voter: Option<u64>,
}

impl Record for ElectionCenter {
    type Draft = CenterDraft;
    type Patch = CenterPatch;

    const COLLECTION: Collection = Collection::Centers;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: CenterDraft) -> Self {
        Self {
            id,
            name: draft.name,
            area: draft.area,
            id_bn: draft.id_bn,
            seat_number: draft.seat_number,
            district: draft.district,
            division: draft.division,
            total_voter: draft.total_voter,
            male_voter: draft.male_voter,
            female_voter: draft.female_voter,
            transgender_voter: draft.transgender_voter,
        }
    }

    fn apply(&mut self, patch: CenterPatch) {
        merge(&mut self.name, patch.name);
        merge(&mut self.area, patch.area);
        merge(&mut self.total_voter, patch.total_voter);
        merge(&mut self.male_voter, patch.male_voter);
        merge(&mut self.female_voter, patch.female_voter);

        if patch.id_bn.is_some() {
            self.id_bn = patch.id_bn;
        }
        if patch.seat_number.is_some() {
            self.seat_number = patch.seat_number;
        }
        if patch.district.is_some() {
            self.district = patch.district;
        }
        if patch.division.is_some() {
            self.division = patch.division;
        }
        if patch.transgender_voter.is_some() {
            self.transgender_voter = patch.transgender_voter;
        }
    }
}

impl ElectionCenter {
    pub fn matches(&self, needle_lowercase: &str) -> bool {
        self.name.to_lowercase().contains(needle_lowercase)
            || self.area.to_lowercase().contains(needle_lowercase)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub party: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(deserialize_with = "opaque_id")]
    pub assigned_center_id: String,
    #[serde(
        default,
        deserialize_with = "opaque_optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub sign_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct CandidateDraft {
    pub name: String,
    pub party: String,
    pub photo_url: String,
    pub assigned_center_id: String,
    pub sign_id: Option<String>,
}

impl CandidateDraft {
    /// Blank photo urls fall back to a generated avatar carrying the name.
    pub fn new(
        name: impl Into<String>,
        party: impl Into<String>,
        photo_url: Option<String>,
        assigned_center_id: impl Into<String>,
        sign_id: Option<String>,
    ) -> Self {
        let name = name.into();
        let photo_url = photo_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| avatar_url(&name));

        Self {
            name,
            party: party.into(),
            photo_url,
            assigned_center_id: assigned_center_id.into(),
            sign_id: sign_id.filter(|id| !id.is_empty()),
        }
    }
}

/// The name is query-encoded, `Jane Doe` becomes `?name=Jane+Doe`.
pub fn avatar_url(name: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(name.as_bytes()).collect();

    format!("{AVATAR_FALLBACK}{encoded}")
}

/// `sign_id: Some(None)` clears the symbol.
#[derive(Clone, Debug, Default)]
pub struct CandidatePatch {
    pub name: Option<String>,
    pub party: Option<String>,
    pub photo_url: Option<String>,
    pub assigned_center_id: Option<String>,
    pub sign_id: Option<Option<String>>,
}

impl Record for Candidate {
    type Draft = CandidateDraft;
    type Patch = CandidatePatch;

    const COLLECTION: Collection = Collection::Candidates;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: CandidateDraft) -> Self {
        Self {
            id,
            name: draft.name,
            party: draft.party,
            photo_url: draft.photo_url,
            assigned_center_id: draft.assigned_center_id,
            sign_id: draft.sign_id,
        }
    }

    fn apply(&mut self, patch: CandidatePatch) {
        merge(&mut self.name, patch.name);
        merge(&mut self.party, patch.party);
        merge(&mut self.photo_url, patch.photo_url);
        merge(&mut self.assigned_center_id, patch.assigned_center_id);
        merge(&mut self.sign_id, patch.sign_id);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sign {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignDraft {
    pub name: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignPatch {
    pub name: Option<String>,
    pub image_url: Option<String>,
}

impl Record for Sign {
    type Draft = SignDraft;
    type Patch = SignPatch;

    const COLLECTION: Collection = Collection::Signs;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: SignDraft) -> Self {
        Self {
            id,
            name: draft.name,
            image_url: draft.image_url,
        }
    }

    fn apply(&mut self, patch: SignPatch) {
        merge(&mut self.name, patch.name);
        merge(&mut self.image_url, patch.image_url);
    }
}

impl Sign {
    /// Absolute and root-relative urls pass through, bare filenames live under `/symbols/`.
    pub fn resolved_image_url(&self) -> String {
        let url = self.image_url.trim();

        if url.is_empty()
            || url.starts_with("http://")
            || url.starts_with("https://")
            || url.starts_with('/')
        {
            url.to_string()
        } else {
            format!("/{SYMBOLS_FOLDER}/{url}")
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Clone, Debug)]
pub struct UserDraft {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Clone, Debug, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

impl Record for User {
    type Draft = UserDraft;
    type Patch = UserPatch;

    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(id: String, draft: UserDraft) -> Self {
        Self {
            id,
            username: draft.username,
            password_hash: draft.password_hash,
            role: draft.role,
        }
    }

    fn apply(&mut self, patch: UserPatch) {
        merge(&mut self.username, patch.username);
        merge(&mut self.password_hash, patch.password_hash);
        merge(&mut self.role, patch.role);
    }
}

/// User without the password hash, safe to hand to a client.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
        }
    }
}

fn merge<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

// Older dumps carry numeric ids.
fn opaque_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let id: String = StringOrNumber::deserialize(deserializer)?.into();

    if id.is_empty() {
        return Err(de::Error::custom("id must not be empty"));
    }

    Ok(id)
}

fn opaque_optional<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?
        .map(String::from)
        .filter(|s| !s.is_empty()))
}
