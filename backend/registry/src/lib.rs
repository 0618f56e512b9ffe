//! # Registry
//!
//! File-backed data layer of the election portal: centers, candidates, symbols
//! and admin users, each a JSON array in the data directory.
//!
//! ```text
//! data/
//!   centers.json  candidates.json  signs.json  users.json
//! public/
//!   candidates/<id>/profile_image.jpg, affidavit.pdf, nomination_paper.pdf, tax_return.pdf
//!   symbols/<file>
//! ```
//!
//! Repositories never cascade. Deleting a center orphans its candidates and
//! deleting a sign leaves `signId` pointing nowhere.
//!
//! Superadmin accounts are *not* protected here. `Repository::<User>::delete` and
//! `update` accept any id; the admin handlers decide what may be targeted.
pub mod credentials;
pub mod error;
pub mod models;
pub mod repository;
pub mod store;
pub mod upload;

pub use credentials::Credentials;
pub use error::StoreError;
pub use models::{
    Candidate, CandidateDraft, CandidatePatch, CenterDraft, CenterPatch, ElectionCenter, Record,
    Role, Sign, SignDraft, SignPatch, User, UserDraft, UserPatch, UserSummary,
};
pub use repository::{Registry, Repository};
pub use store::{Collection, RecordStore};
