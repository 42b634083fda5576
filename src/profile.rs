//! Profile editor session — field-at-a-time edits with save/cancel.
//!
//! The profile screen edits one field at a time: beginning an edit copies
//! the current value into a draft, saving applies the draft, cancelling
//! discards it. Switching to another field abandons the previous draft.

use serde::{Deserialize, Serialize};

/// An editable profile field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    FullName,
    Address,
    ContactNumber,
    UnitId,
    Email,
    Password,
}

impl std::fmt::Display for ProfileField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::FullName => "full_name",
            Self::Address => "address",
            Self::ContactNumber => "contact_number",
            Self::UnitId => "unit_id",
            Self::Email => "email",
            Self::Password => "password",
        };
        write!(f, "{s}")
    }
}

/// The user's profile data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileData {
    pub full_name: String,
    pub address: String,
    pub contact_number: String,
    pub unit_id: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
}

impl ProfileData {
    fn get(&self, field: ProfileField) -> &str {
        match field {
            ProfileField::FullName => &self.full_name,
            ProfileField::Address => &self.address,
            ProfileField::ContactNumber => &self.contact_number,
            ProfileField::UnitId => &self.unit_id,
            ProfileField::Email => &self.email,
            ProfileField::Password => &self.password,
        }
    }

    fn set(&mut self, field: ProfileField, value: String) {
        match field {
            ProfileField::FullName => self.full_name = value,
            ProfileField::Address => self.address = value,
            ProfileField::ContactNumber => self.contact_number = value,
            ProfileField::UnitId => self.unit_id = value,
            ProfileField::Email => self.email = value,
            ProfileField::Password => self.password = value,
        }
    }
}

#[derive(Debug, Clone)]
struct EditSession {
    field: ProfileField,
    draft: String,
}

/// Field-at-a-time profile edit state.
#[derive(Debug, Clone)]
pub struct ProfileEditor {
    data: ProfileData,
    editing: Option<EditSession>,
}

impl ProfileEditor {
    pub fn new(data: ProfileData) -> Self {
        Self {
            data,
            editing: None,
        }
    }

    /// Begin editing a field; the draft starts as the current value.
    /// Returns that starting value.
    pub fn begin_edit(&mut self, field: ProfileField) -> String {
        let draft = self.data.get(field).to_string();
        self.editing = Some(EditSession {
            field,
            draft: draft.clone(),
        });
        draft
    }

    /// Update the draft of the field being edited. No-op when no edit is
    /// open.
    pub fn set_draft(&mut self, value: impl Into<String>) {
        if let Some(session) = &mut self.editing {
            session.draft = value.into();
        }
    }

    /// Apply the draft and close the session. Returns the saved field, or
    /// `None` when no edit was open.
    pub fn save(&mut self) -> Option<ProfileField> {
        let session = self.editing.take()?;
        self.data.set(session.field, session.draft);
        Some(session.field)
    }

    /// Discard the draft and close the session.
    pub fn cancel(&mut self) {
        self.editing = None;
    }

    pub fn editing_field(&self) -> Option<ProfileField> {
        self.editing.as_ref().map(|s| s.field)
    }

    pub fn data(&self) -> &ProfileData {
        &self.data
    }
}
