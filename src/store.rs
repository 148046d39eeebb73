//! JSON document stores for the tag library, the gallery and the LLM config,
//! plus the image files backing gallery items.
//!
//! Each document is read whole and written whole. There is no locking: the
//! studio assumes a single writer.

use crate::config::LlmConfig;
use crate::error::TagError;
use crate::model::{
    generate_id, now, Category, GalleryItem, NewCategory, NewTag, Tag,
};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Image extensions accepted for gallery uploads
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Load/save a whole document
pub trait DocumentStore<D> {
    /// The stored document, or the default shape when absent or unreadable
    fn load(&self) -> D;

    fn save(&self, document: &D) -> Result<(), TagError>;
}

/// A document persisted as pretty-printed JSON
pub struct JsonFileStore<D> {
    path: PathBuf,
    _document: PhantomData<fn() -> D>,
}

impl<D> JsonFileStore<D> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore {
            path: path.into(),
            _document: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<D> DocumentStore<D> for JsonFileStore<D>
where
    D: Serialize + DeserializeOwned + Default,
{
    fn load(&self) -> D {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("{} not readable ({}), using defaults", self.path.display(), e);
                return D::default();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(
                "{} is corrupt ({}), using defaults",
                self.path.display(),
                e
            );
            D::default()
        })
    }

    fn save(&self, document: &D) -> Result<(), TagError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(document)?)?;
        Ok(())
    }
}

pub type TagStore = JsonFileStore<TagLibrary>;
pub type GalleryStore = JsonFileStore<Gallery>;
pub type ConfigStore = JsonFileStore<ConfigDocument>;

/// `{categories, tags}` document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagLibrary {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl TagLibrary {
    pub fn add_tag(&mut self, new_tag: NewTag) -> Tag {
        let tag = Tag {
            id: generate_id(),
            name_en: new_tag.name_en,
            name_zh: new_tag.name_zh,
            category_id: new_tag.category_id,
            weight: new_tag.weight,
            created_at: now(),
        };
        self.tags.push(tag.clone());
        tag
    }

    /// Replace a tag's fields, keeping its id and creation time
    pub fn update_tag(&mut self, id: &str, update: NewTag) -> Option<Tag> {
        let tag = self.tags.iter_mut().find(|t| t.id == id)?;
        tag.name_en = update.name_en;
        tag.name_zh = update.name_zh;
        tag.category_id = update.category_id;
        tag.weight = update.weight;
        Some(tag.clone())
    }

    pub fn remove_tag(&mut self, id: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t.id != id);
        self.tags.len() != before
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn add_category(&mut self, new_category: NewCategory) -> Category {
        let category = Category {
            id: generate_id(),
            name_en: new_category.name_en,
            name_zh: new_category.name_zh,
            color: new_category.color,
        };
        self.categories.push(category.clone());
        category
    }

    pub fn update_category(&mut self, id: &str, update: NewCategory) -> Option<Category> {
        let category = self.categories.iter_mut().find(|c| c.id == id)?;
        category.name_en = update.name_en;
        category.name_zh = update.name_zh;
        category.color = update.color;
        Some(category.clone())
    }

    /// Tags that pointed at the category keep their now-dangling id
    pub fn remove_category(&mut self, id: &str) -> bool {
        let before = self.categories.len();
        self.categories.retain(|c| c.id != id);
        self.categories.len() != before
    }
}

/// `{llm}` document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Text fields of a new gallery item
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewGalleryItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub positive_prompt: String,
    #[serde(default)]
    pub negative_prompt: String,
}

/// Text fields to change on a gallery item; absent fields are kept
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GalleryUpdate {
    pub title: Option<String>,
    pub positive_prompt: Option<String>,
    pub negative_prompt: Option<String>,
}

/// `{items}` document, newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gallery {
    #[serde(default)]
    pub items: Vec<GalleryItem>,
}

impl Gallery {
    /// Insert at the front; `image` is a name returned by [`ImageFiles::save`]
    pub fn add(&mut self, item: NewGalleryItem, image: String) -> GalleryItem {
        let item = GalleryItem {
            id: generate_id(),
            image,
            title: item.title,
            positive_prompt: item.positive_prompt,
            negative_prompt: item.negative_prompt,
            created_at: now(),
            updated_at: None,
        };
        self.items.insert(0, item.clone());
        item
    }

    /// Apply `update`; when `new_image` is given the previous file is deleted.
    pub async fn update(
        &mut self,
        id: &str,
        update: GalleryUpdate,
        new_image: Option<String>,
        files: &ImageFiles,
    ) -> Result<Option<GalleryItem>, TagError> {
        let Some(item) = self.items.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };

        if let Some(image) = new_image {
            files.delete(&item.image).await?;
            item.image = image;
        }
        if let Some(title) = update.title {
            item.title = title;
        }
        if let Some(positive) = update.positive_prompt {
            item.positive_prompt = positive;
        }
        if let Some(negative) = update.negative_prompt {
            item.negative_prompt = negative;
        }
        item.updated_at = Some(now());

        Ok(Some(item.clone()))
    }

    /// Remove the item and its image file
    pub async fn remove(&mut self, id: &str, files: &ImageFiles) -> Result<bool, TagError> {
        let Some(position) = self.items.iter().position(|i| i.id == id) else {
            return Ok(false);
        };
        let item = self.items.remove(position);
        files.delete(&item.image).await?;
        Ok(true)
    }
}

/// Gallery images on disk, one file per item
pub struct ImageFiles {
    dir: PathBuf,
}

impl ImageFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ImageFiles { dir: dir.into() }
    }

    /// Store an upload under a generated name and return that name
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, TagError> {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .filter(|e| ALLOWED_IMAGE_EXTENSIONS.contains(&e.as_str()))
            .ok_or_else(|| {
                TagError::InvalidInput(format!("Invalid file type: {}", original_name))
            })?;

        let name = format!("{}.{}", generate_id(), extension);
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&name), bytes).await?;
        debug!("Saved gallery image {}", name);
        Ok(name)
    }

    /// Delete a stored image; a file that is already gone is not an error
    pub async fn delete(&self, name: &str) -> Result<(), TagError> {
        // Only the final component is honoured so names cannot escape the directory
        let Some(file_name) = Path::new(name).file_name() else {
            return Ok(());
        };
        match tokio::fs::remove_file(self.dir.join(file_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}
