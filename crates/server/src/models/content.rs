//! Promotional content: homepage banners and feature icons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shoply_core::{BannerId, FeatureIconId};

use super::{optional_text, required_text};

/// A homepage banner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Banner {
    pub id: BannerId,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub button_text: Option<String>,
    pub position: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BannerInput {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub button_text: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl BannerInput {
    /// # Errors
    ///
    /// Returns a message suitable for a 400 response.
    pub fn validate(&mut self) -> Result<(), String> {
        self.title = required_text(&self.title, "title")?;
        self.image_url = required_text(&self.image_url, "image_url")?;
        self.subtitle = optional_text(self.subtitle.as_deref());
        self.link_url = optional_text(self.link_url.as_deref());
        self.button_text = optional_text(self.button_text.as_deref());
        Ok(())
    }
}

/// A small "why shop with us" icon with a caption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureIcon {
    pub id: FeatureIconId,
    pub title: String,
    pub description: Option<String>,
    /// Icon name or image URL.
    pub icon: String,
    pub position: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureIconInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub icon: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl FeatureIconInput {
    /// # Errors
    ///
    /// Returns a message suitable for a 400 response.
    pub fn validate(&mut self) -> Result<(), String> {
        self.title = required_text(&self.title, "title")?;
        self.icon = required_text(&self.icon, "icon")?;
        self.description = optional_text(self.description.as_deref());
        Ok(())
    }
}

const fn default_true() -> bool {
    true
}
