//! Pages and their publication state

use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::Ownership;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Section, SectionInput, UnknownVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageStatus {
    Draft,
    Published,
    Archived,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Draft => "DRAFT",
            PageStatus::Published => "PUBLISHED",
            PageStatus::Archived => "ARCHIVED",
        }
    }
}

impl FromStr for PageStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(PageStatus::Draft),
            "PUBLISHED" => Ok(PageStatus::Published),
            "ARCHIVED" => Ok(PageStatus::Archived),
            other => Err(UnknownVariant {
                kind: "page status",
                value: other.to_string(),
            }),
        }
    }
}

/// A page owned by one user. `is_published` mirrors `status` and is only
/// changed through the transition methods below.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub owner_id: Uuid,
    pub template_id: Option<Uuid>,
    pub status: PageStatus,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    pub fn new(owner_id: Uuid, name: String, slug: String, template_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            slug,
            owner_id,
            template_id,
            status: PageStatus::Draft,
            is_published: false,
            published_at: None,
            seo_title: None,
            seo_description: None,
            seo_keywords: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn ownership(&self) -> Ownership {
        Ownership::owned_by(self.owner_id)
    }

    /// Re-publishing refreshes `published_at`.
    pub fn publish(&mut self, now: DateTime<Utc>) {
        self.status = PageStatus::Published;
        self.is_published = true;
        self.published_at = Some(now);
        self.updated_at = now;
    }

    pub fn unpublish(&mut self, now: DateTime<Utc>) {
        self.set_status(PageStatus::Draft, now);
    }

    /// Move to any status, keeping `is_published` and `published_at` in step
    pub fn set_status(&mut self, status: PageStatus, now: DateTime<Utc>) {
        if status == PageStatus::Published {
            if self.status != PageStatus::Published {
                self.publish(now);
            }
            return;
        }
        self.status = status;
        self.is_published = false;
        self.published_at = None;
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePageRequest {
    pub name: String,
    pub slug: String,
    pub template_id: Option<Uuid>,
    /// Explicit sections; when absent the template's blueprint is used
    pub sections: Option<Vec<SectionInput>>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePageRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub status: Option<PageStatus>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageWithSections {
    #[serde(flatten)]
    pub page: Page,
    pub sections: Vec<Section>,
}
