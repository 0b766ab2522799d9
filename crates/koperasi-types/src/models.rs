use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Privilege level of a user account. `High` is the administrative role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Low,
    High,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::High => "HIGH",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "HIGH" => Ok(Self::High),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval workflow state of a koperasi application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KoperasiStatus {
    /// Submitted, waiting for review.
    Diproses,
    /// Approved.
    Disetujui,
    /// Rejected. The only state in which a koperasi may be deleted.
    Ditolak,
}

impl KoperasiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diproses => "DIPROSES",
            Self::Disetujui => "DISETUJUI",
            Self::Ditolak => "DITOLAK",
        }
    }

    pub fn is_deletable(&self) -> bool {
        matches!(self, Self::Ditolak)
    }
}

impl FromStr for KoperasiStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DIPROSES" => Ok(Self::Diproses),
            "DISETUJUI" => Ok(Self::Disetujui),
            "DITOLAK" => Ok(Self::Ditolak),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for KoperasiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// Document type tag reserved for annual member meeting (RAT) reports.
pub const RAT_DOCUMENT_TYPE: &str = "RAT";

/// A user as exposed over the API. The password hash never leaves the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub email_verified: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Koperasi {
    pub id: String,
    pub name: String,
    pub address: String,
    pub contact_person: String,
    pub phone: String,
    pub email: Option<String>,
    pub regency_code: Option<String>,
    pub district_code: Option<String>,
    pub status: KoperasiStatus,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub koperasi_id: String,
    pub document_type: String,
    pub file_path: String,
    pub original_name: String,
    pub mime_type: String,
    pub file_size: u64,
    pub upload_date: DateTime<Utc>,
}

impl Document {
    pub fn is_rat(&self) -> bool {
        self.document_type == RAT_DOCUMENT_TYPE
    }
}
