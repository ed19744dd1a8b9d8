use serde::{Deserialize, Serialize};

/// Metadata sent with a software image upload.
///
/// Every attribute starts unset. `None` and `Some("")` are distinct: the
/// first means the client never sent the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareImageMeta {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  /// Build identifier of the image.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub yocto_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub device_type: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub checksum: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
  #[error("{0}: required field is missing")]
  Missing(&'static str),

  #[error("{0}: value must not be empty")]
  Empty(&'static str),
}

impl SoftwareImageMeta {
  /// Check the record before its image is accepted.
  ///
  /// `name`, `device_type` and `checksum` are required. `yocto_id` and
  /// `description` are optional but may not be empty when sent.
  pub fn validate(&self) -> Result<(), ValidationError> {
    required("name", &self.name)?;
    optional("yocto_id", &self.yocto_id)?;
    required("device_type", &self.device_type)?;
    required("checksum", &self.checksum)?;
    optional("description", &self.description)?;
    Ok(())
  }
}

fn required(field: &'static str, value: &Option<String>) -> Result<(), ValidationError> {
  match value {
    None => Err(ValidationError::Missing(field)),
    Some(v) if v.is_empty() => Err(ValidationError::Empty(field)),
    Some(_) => Ok(()),
  }
}

fn optional(field: &'static str, value: &Option<String>) -> Result<(), ValidationError> {
  match value {
    Some(v) if v.is_empty() => Err(ValidationError::Empty(field)),
    _ => Ok(()),
  }
}
