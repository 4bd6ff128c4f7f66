//! Profile store
//!
//! Reads the cached profile of the signed-in identity and applies the
//! student's own edits. Lookups return a tagged result so callers can tell
//! "no such row" apart from "could not ask".

use crate::baas::{BaasClient, Profile, Query};
use crate::error::{AppError, StoreError};
use crate::util::{parse_positive_int, required_text};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

const PROFILES: &str = "profiles";

/// Outcome of a profile lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileLookup {
    Found(Profile),
    NotFound,
    TransientError(String),
}

impl ProfileLookup {
    pub fn into_option(self) -> Option<Profile> {
        match self {
            ProfileLookup::Found(profile) => Some(profile),
            _ => None,
        }
    }
}

/// Fields a user may change on their own profile
///
/// `role` and `approved` are deliberately absent: only privileged writers
/// touch them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileEdit {
    pub name: String,
    pub grade: u32,
    pub class_no: u32,
    pub student_no: u32,
}

impl ProfileEdit {
    /// Validate raw form input
    pub fn parse(
        name: &str,
        grade: &str,
        class_no: &str,
        student_no: &str,
    ) -> Result<Self, AppError> {
        Ok(Self {
            name: required_text("name", name)?,
            grade: parse_positive_int("grade", grade)?,
            class_no: parse_positive_int("class_no", class_no)?,
            student_no: parse_positive_int("student_no", student_no)?,
        })
    }
}

/// Read/write access to the profiles table
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Look up the profile of one identity
    async fn get_profile(&self, identity_id: &str) -> ProfileLookup;

    /// Apply the identity's own non-privileged edits
    async fn update_profile(
        &self,
        identity_id: &str,
        edit: &ProfileEdit,
    ) -> Result<Profile, StoreError>;
}

/// Profile store backed by the profiles table
pub struct BaasProfileStore {
    client: Arc<BaasClient>,
}

impl BaasProfileStore {
    pub fn new(client: Arc<BaasClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProfileStore for BaasProfileStore {
    #[instrument(skip(self))]
    async fn get_profile(&self, identity_id: &str) -> ProfileLookup {
        let query = Query::new()
            .select(Profile::COLUMNS)
            .eq("id", identity_id)
            .limit(1);

        match self.client.select::<Profile>(PROFILES, &query).await {
            Ok(rows) => match rows.into_iter().next() {
                Some(profile) => ProfileLookup::Found(profile),
                None => {
                    debug!("No profile row for identity");
                    ProfileLookup::NotFound
                }
            },
            Err(StoreError::NotFound { .. }) => ProfileLookup::NotFound,
            Err(e) => ProfileLookup::TransientError(e.to_string()),
        }
    }

    #[instrument(skip(self, edit))]
    async fn update_profile(
        &self,
        identity_id: &str,
        edit: &ProfileEdit,
    ) -> Result<Profile, StoreError> {
        let filter = Query::new().eq("id", identity_id).select(Profile::COLUMNS);

        self.client
            .update::<Profile, _>(PROFILES, &filter, edit)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                resource: format!("profile {}", identity_id),
            })
    }
}
